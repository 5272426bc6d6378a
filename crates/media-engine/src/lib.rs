//! Media Engine - sequential recitation playback for Tilawa
//!
//! Resolves verse and chapter audio through an ordered fallback chain and
//! plays it under a [`PlaybackCoordinator`] that keeps at most one session
//! audible at a time.

mod backend;
mod coordinator;
mod error;
mod events;
mod resolver;
mod scroll;
mod sequence;
mod session;

#[cfg(feature = "device-output")]
pub mod device;

pub use backend::{AudioBackend, AudioHandle, SessionSignal, SignalReceiver, SignalSender};
pub use coordinator::{CoordinatorOptions, PlaybackCoordinator};
pub use error::{EngineError, EngineResult};
pub use events::{PlaybackEvent, PlaybackKind, PlaybackSnapshot, StopReason};
pub use resolver::{
    candidates_for_chapter, candidates_for_verse, AudioCandidate, AudioSourceResolver,
    CandidateFailure, CandidateProbe, DirectKind, HttpProbe, Resolution, ResolutionFailed,
    ResolveResult, ResolverOptions,
};
pub use scroll::{ScrollCommand, ScrollOptions, ScrollSyncController};
pub use sequence::SequentialChapterPlayer;
pub use session::{Generation, PlaybackSession, SessionState, SessionSubject};
