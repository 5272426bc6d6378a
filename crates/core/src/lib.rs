//! Domain types shared by every Tilawa crate
//!
//! - [`Narrator`] and the fixed [`NarratorCatalog`]
//! - [`VerseRef`] and the global verse numbering table
//! - [`PlaybackError`], the playback failure taxonomy with severity and recovery hints

pub mod error;
pub mod types;

pub use error::{CoreError, CoreResult, ErrorSeverity, PlaybackError, RecoveryAction};
pub use types::{
    chapter_verses, verse_count, Language, Narrator, NarratorCatalog, VerseRef, CHAPTER_COUNT,
    DEFAULT_NARRATOR_ID, TOTAL_VERSES,
};
