// FILE: crates/media-engine/src/events.rs
//! Playback events and state snapshots exposed to the UI layer

use crate::session::{Generation, SessionState};
use tilawa_core::{PlaybackError, VerseRef};

/// Why a run ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Reached the end of the verse or chapter
    Completed,
    /// Replaced by a newer request
    Superseded,
    /// Stopped by the caller
    Requested,
    /// Ended by a user-visible failure
    Failed,
}

/// Notification broadcast by the coordinator
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Looking for audio for a verse
    Resolving {
        generation: Generation,
        verse: VerseRef,
    },
    /// One candidate failed; the next one is tried
    CandidateUnavailable {
        generation: Generation,
        verse: VerseRef,
        candidate_index: usize,
        reason: String,
    },
    /// Audio is playing
    NowPlaying {
        generation: Generation,
        verse: VerseRef,
        /// Cursor position in chapter mode
        index: Option<usize>,
        uri: String,
        candidate_index: usize,
        /// The URI covers the whole chapter
        whole_chapter: bool,
    },
    Paused {
        generation: Generation,
    },
    Resumed {
        generation: Generation,
    },
    /// A verse of a chapter run failed and was skipped
    VerseFailed {
        generation: Generation,
        verse: VerseRef,
        index: usize,
        error: PlaybackError,
    },
    /// A failure the user is told about, sent once per occurrence
    Failed {
        generation: Generation,
        error: PlaybackError,
    },
    Stopped {
        generation: Generation,
        reason: StopReason,
    },
}

impl PlaybackEvent {
    pub fn generation(&self) -> Generation {
        match self {
            PlaybackEvent::Resolving { generation, .. }
            | PlaybackEvent::CandidateUnavailable { generation, .. }
            | PlaybackEvent::NowPlaying { generation, .. }
            | PlaybackEvent::Paused { generation }
            | PlaybackEvent::Resumed { generation }
            | PlaybackEvent::VerseFailed { generation, .. }
            | PlaybackEvent::Failed { generation, .. }
            | PlaybackEvent::Stopped { generation, .. } => *generation,
        }
    }

    /// Verse the event is about, if any
    pub fn verse(&self) -> Option<VerseRef> {
        match self {
            PlaybackEvent::Resolving { verse, .. }
            | PlaybackEvent::CandidateUnavailable { verse, .. }
            | PlaybackEvent::NowPlaying { verse, .. }
            | PlaybackEvent::VerseFailed { verse, .. } => Some(*verse),
            _ => None,
        }
    }

    /// True for the event that closes a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackEvent::Stopped { .. })
    }
}

/// What is currently allowed to be audible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackKind {
    None,
    SingleVerse,
    ChapterSequence,
}

/// Point-in-time view of the coordinator
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub kind: PlaybackKind,
    pub generation: Generation,
    /// State of the most recent session, if any
    pub state: Option<SessionState>,
    pub chapter: Option<u16>,
    pub current_index: Option<usize>,
    pub current_verse: Option<VerseRef>,
}
