// FILE: crates/media-engine/src/backend.rs
//! Audio backend seam
//!
//! The engine never touches an audio device directly. A backend turns a
//! resolved URI into an [`AudioHandle`]; the handle reports natural end and
//! mid-stream errors back through a [`SignalSender`], tagged with the
//! generation it was loaded for.

use crate::error::EngineResult;
use crate::session::Generation;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Asynchronous notification from a live audio handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    /// Playback reached the end of the audio
    Finished { generation: Generation },
    /// Playback broke off after a successful load
    Errored { generation: Generation, reason: String },
}

impl SessionSignal {
    pub fn generation(&self) -> Generation {
        match self {
            SessionSignal::Finished { generation } => *generation,
            SessionSignal::Errored { generation, .. } => *generation,
        }
    }
}

pub type SignalSender = mpsc::UnboundedSender<SessionSignal>;
pub type SignalReceiver = mpsc::UnboundedReceiver<SessionSignal>;

/// A loaded, playable piece of audio
///
/// `release` must be idempotent and must silence the audio.
pub trait AudioHandle: Send {
    fn play(&mut self) -> EngineResult<()>;
    fn pause(&mut self) -> EngineResult<()>;
    fn resume(&mut self) -> EngineResult<()>;
    fn release(&mut self);
}

/// Something that can load audio from a URI
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Loads `uri` for the session with the given generation
    ///
    /// The returned handle is paused; the session starts it.
    async fn load(
        &self,
        uri: &str,
        generation: Generation,
        signals: SignalSender,
    ) -> EngineResult<Box<dyn AudioHandle>>;
}
