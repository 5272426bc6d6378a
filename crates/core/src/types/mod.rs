//! Domain types for Tilawa
//!
//! - `narrator`: narrators and the static catalog
//! - `verse`: verse references and global numbering

mod narrator;
mod verse;

pub use narrator::{Language, Narrator, NarratorCatalog, DEFAULT_NARRATOR_ID};
pub use verse::{chapter_verses, verse_count, VerseRef, CHAPTER_COUNT, TOTAL_VERSES};
