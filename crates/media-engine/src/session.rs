// FILE: crates/media-engine/src/session.rs
//! Single playback session and its state machine
//!
//! ```text
//! Idle -> Resolving -> Loading -> Loaded -> Playing <-> Paused
//!                                             |
//!                                 natural end / stop()
//!                                             v
//!                                          Stopped
//! any non-terminal state -- load error --> Failed
//! ```
//!
//! `Stopped` and `Failed` are terminal; playing again takes a new session
//! with a new generation.

use crate::backend::AudioHandle;
use crate::error::{EngineError, EngineResult};
use std::fmt;
use tilawa_core::VerseRef;

/// Monotonically increasing session tag
pub type Generation = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Resolving,
    Loading,
    Loaded,
    Playing,
    Paused,
    Stopped,
    Failed(String),
}

impl SessionState {
    /// Terminal states never transition again
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Stopped | SessionState::Failed(_))
    }

    /// True while the session is on its way to, or is, producing audio
    pub fn is_active(&self) -> bool {
        !matches!(
            self,
            SessionState::Idle | SessionState::Stopped | SessionState::Failed(_)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Resolving => write!(f, "resolving"),
            SessionState::Loading => write!(f, "loading"),
            SessionState::Loaded => write!(f, "loaded"),
            SessionState::Playing => write!(f, "playing"),
            SessionState::Paused => write!(f, "paused"),
            SessionState::Stopped => write!(f, "stopped"),
            SessionState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// What a session is playing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSubject {
    Verse(VerseRef),
    Chapter { chapter: u16, index: usize },
}

/// Owns at most one audio handle for one generation
pub struct PlaybackSession {
    generation: Generation,
    subject: SessionSubject,
    state: SessionState,
    uri: Option<String>,
    handle: Option<Box<dyn AudioHandle>>,
}

impl PlaybackSession {
    pub fn new(generation: Generation, subject: SessionSubject) -> Self {
        Self {
            generation,
            subject,
            state: SessionState::Idle,
            uri: None,
            handle: None,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn subject(&self) -> SessionSubject {
        self.subject
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// URI handed to `start`, if any
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn has_handle(&self) -> bool {
        self.handle.is_some()
    }

    /// Idle -> Resolving
    pub fn begin_resolving(&mut self) -> EngineResult<()> {
        match self.state {
            SessionState::Idle => {
                self.state = SessionState::Resolving;
                Ok(())
            }
            ref other => Err(EngineError::InvalidState(format!(
                "session {} cannot resolve while {}",
                self.generation, other
            ))),
        }
    }

    /// Begins loading `uri`
    ///
    /// Fails fast unless the session is fresh (Idle, or Resolving its own source).
    pub fn start(&mut self, uri: &str) -> EngineResult<()> {
        match self.state {
            SessionState::Idle | SessionState::Resolving => {
                self.uri = Some(uri.to_string());
                self.state = SessionState::Loading;
                Ok(())
            }
            ref other => Err(EngineError::InvalidState(format!(
                "session {} cannot start while {}",
                self.generation, other
            ))),
        }
    }

    /// Takes ownership of a loaded handle and starts it
    ///
    /// A handle arriving for a session that is no longer loading is released
    /// immediately.
    pub fn on_ready(&mut self, mut handle: Box<dyn AudioHandle>) -> EngineResult<()> {
        if self.state != SessionState::Loading {
            handle.release();
            return Err(EngineError::InvalidState(format!(
                "session {} received audio while {}",
                self.generation, self.state
            )));
        }

        self.state = SessionState::Loaded;
        if let Err(e) = handle.play() {
            handle.release();
            self.state = SessionState::Failed(e.to_string());
            return Err(e);
        }

        self.handle = Some(handle);
        self.state = SessionState::Playing;
        Ok(())
    }

    /// Any non-terminal state -> Failed
    pub fn on_load_error(&mut self, reason: &str) {
        if self.state.is_terminal() {
            return;
        }
        self.release_handle();
        self.state = SessionState::Failed(reason.to_string());
    }

    /// Playing | Paused -> Stopped, at the end of the audio
    pub fn on_natural_end(&mut self) -> bool {
        match self.state {
            SessionState::Playing | SessionState::Paused => {
                self.release_handle();
                self.state = SessionState::Stopped;
                true
            }
            _ => false,
        }
    }

    /// Playing -> Paused; a no-op from any other state
    pub fn pause(&mut self) -> bool {
        if self.state != SessionState::Playing {
            return false;
        }
        if let Some(handle) = self.handle.as_mut() {
            if let Err(e) = handle.pause() {
                log::warn!("Session {}: pause failed: {}", self.generation, e);
                return false;
            }
        }
        self.state = SessionState::Paused;
        true
    }

    /// Paused -> Playing; a no-op from any other state
    pub fn resume(&mut self) -> bool {
        if self.state != SessionState::Paused {
            return false;
        }
        if let Some(handle) = self.handle.as_mut() {
            if let Err(e) = handle.resume() {
                log::warn!("Session {}: resume failed: {}", self.generation, e);
                return false;
            }
        }
        self.state = SessionState::Playing;
        true
    }

    /// Releases the handle and moves to Stopped
    ///
    /// Idempotent: Idle, Stopped and Failed sessions are left untouched.
    pub fn stop(&mut self) -> bool {
        match self.state {
            SessionState::Idle | SessionState::Stopped | SessionState::Failed(_) => false,
            _ => {
                self.release_handle();
                self.state = SessionState::Stopped;
                true
            }
        }
    }

    fn release_handle(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.release();
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.release_handle();
    }
}

impl fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("generation", &self.generation)
            .field("subject", &self.subject)
            .field("state", &self.state)
            .field("uri", &self.uri)
            .field("has_handle", &self.handle.is_some())
            .finish()
    }
}
