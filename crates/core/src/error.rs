//! Error types and recovery strategies for Tilawa
//!
//! Two families live here:
//! - [`CoreError`]: invalid input to the domain types (bad chapter, unknown narrator)
//! - [`PlaybackError`]: the playback failure taxonomy. Every variant knows its
//!   severity, the recovery the engine applies, and whether the user is told.

use std::fmt;
use thiserror::Error;

/// Result type for domain operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised when constructing or looking up domain values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Chapter number outside 1..=114
    #[error("Invalid chapter number: {0} (expected 1-114)")]
    InvalidChapter(u16),

    /// Verse number outside the chapter's range
    #[error("Invalid verse {verse} for chapter {chapter} (chapter has {count} verses)")]
    InvalidVerse { chapter: u16, verse: u16, count: u16 },

    /// Global verse number outside 1..=6236
    #[error("Invalid global verse number: {0} (expected 1-6236)")]
    InvalidGlobalVerse(u16),

    /// No narrator registered under this id
    #[error("Narrator not found: {0}")]
    NarratorNotFound(String),
}

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Handled locally, playback continues
    Recoverable,
    /// The current request could not be served
    Degraded,
    /// Systemic problem, the whole sequence was given up
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Recovery the playback engine applies for an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Substitute the default narrator
    UseDefaultNarrator,
    /// Try the next audio candidate
    NextCandidate,
    /// Skip to the next verse of the chapter
    SkipVerse,
    /// Show a one-time notice; the session is failed
    NotifyUser,
    /// Stop the chapter sequence and notify the user
    StopSequence,
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UseDefaultNarrator => write!(f, "Using default narrator"),
            Self::NextCandidate => write!(f, "Trying next candidate"),
            Self::SkipVerse => write!(f, "Skipping verse"),
            Self::NotifyUser => write!(f, "Notifying user"),
            Self::StopSequence => write!(f, "Stopping sequence"),
        }
    }
}

/// Playback failure taxonomy
///
/// Cloneable so it can ride along in broadcast playback events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// Requested narrator is missing or unknown; the default is used instead
    #[error("Narrator '{requested}' unavailable, using '{substitute}'")]
    NarratorUnresolvable { requested: String, substitute: String },

    /// A single audio candidate could not be used
    #[error("Candidate {index} unavailable: {reason}")]
    CandidateUnavailable { index: usize, reason: String },

    /// Every candidate failed for a verse or chapter
    #[error("No audio source available after {attempts} attempts for {subject}")]
    ResolutionExhausted { subject: String, attempts: usize },

    /// A resolved URI could not be loaded by the audio backend
    #[error("Failed to load audio from {uri}: {reason}")]
    LoadError { uri: String, reason: String },

    /// Too many consecutive verses failed during chapter playback
    #[error("Chapter {chapter} playback aborted after {failures} consecutive failures")]
    SequenceAborted { chapter: u16, failures: usize },

    /// Unexpected failure caught at the coordinator boundary
    #[error("Internal playback error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NarratorUnresolvable { .. } | Self::CandidateUnavailable { .. } => {
                ErrorSeverity::Recoverable
            }
            Self::ResolutionExhausted { .. } | Self::LoadError { .. } | Self::Internal(_) => {
                ErrorSeverity::Degraded
            }
            Self::SequenceAborted { .. } => ErrorSeverity::Fatal,
        }
    }

    /// Returns the recovery applied for this error in single-verse playback
    ///
    /// During chapter playback a degraded error on one verse becomes
    /// [`RecoveryAction::SkipVerse`] instead.
    pub fn recovery_action(&self) -> RecoveryAction {
        match self {
            Self::NarratorUnresolvable { .. } => RecoveryAction::UseDefaultNarrator,
            Self::CandidateUnavailable { .. } => RecoveryAction::NextCandidate,
            Self::ResolutionExhausted { .. } | Self::LoadError { .. } | Self::Internal(_) => {
                RecoveryAction::NotifyUser
            }
            Self::SequenceAborted { .. } => RecoveryAction::StopSequence,
        }
    }

    /// Returns true if this error is ever shown to the user
    pub fn is_user_visible(&self) -> bool {
        !matches!(
            self,
            Self::NarratorUnresolvable { .. } | Self::CandidateUnavailable { .. }
        )
    }

    /// Returns a message suitable for a one-time notice
    pub fn user_message(&self) -> String {
        match self {
            Self::NarratorUnresolvable { substitute, .. } => {
                format!("Selected reciter is unavailable, playing {} instead.", substitute)
            }
            Self::CandidateUnavailable { .. } => "Trying another audio source...".to_string(),
            Self::ResolutionExhausted { .. } => {
                "Audio for this verse is currently unavailable. Please check your connection."
                    .to_string()
            }
            Self::LoadError { .. } => "The recitation could not be played.".to_string(),
            Self::SequenceAborted { .. } => {
                "Recitation stopped: audio sources are not responding.".to_string()
            }
            Self::Internal(_) => "An unexpected error occurred during playback.".to_string(),
        }
    }
}
