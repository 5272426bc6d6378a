// FILE: crates/media-engine/src/sequence.rs
//! Verse-by-verse chapter cursor

use crate::error::{EngineError, EngineResult};
use tilawa_core::{chapter_verses, VerseRef};

/// Walks a chapter's verses in ascending order, each at most once
///
/// The cursor only moves forward. Once it passes the last verse it is
/// cleared and the run is finished.
#[derive(Debug, Clone)]
pub struct SequentialChapterPlayer {
    chapter: u16,
    verses: Vec<VerseRef>,
    current_index: Option<usize>,
}

impl SequentialChapterPlayer {
    /// Creates a cursor at the first verse of `chapter`
    pub fn new(chapter: u16) -> EngineResult<Self> {
        Self::starting_at(chapter, 0)
    }

    /// Creates a cursor at `index` (0-based) within `chapter`
    pub fn starting_at(chapter: u16, index: usize) -> EngineResult<Self> {
        let verses = chapter_verses(chapter)?;
        Self::with_verses(chapter, verses, index)
    }

    /// Creates a cursor over an explicit verse list
    pub fn with_verses(chapter: u16, verses: Vec<VerseRef>, index: usize) -> EngineResult<Self> {
        if index >= verses.len() {
            return Err(EngineError::InvalidState(format!(
                "start index {} out of range for chapter {} ({} verses)",
                index,
                chapter,
                verses.len()
            )));
        }
        Ok(Self {
            chapter,
            verses,
            current_index: Some(index),
        })
    }

    pub fn chapter(&self) -> u16 {
        self.chapter
    }

    /// Returns the total number of verses in the run
    pub fn verse_count(&self) -> usize {
        self.verses.len()
    }

    pub fn verses(&self) -> &[VerseRef] {
        &self.verses
    }

    /// Index of the verse being played, `None` once finished
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_verse(&self) -> Option<VerseRef> {
        self.current_index.and_then(|idx| self.verses.get(idx).copied())
    }

    pub fn is_finished(&self) -> bool {
        self.current_index.is_none()
    }

    /// Moves to the next verse, returning it
    ///
    /// Past the last verse the cursor is cleared and `None` is returned.
    pub fn advance(&mut self) -> Option<VerseRef> {
        let next = self.current_index.map(|idx| idx + 1)?;
        if next < self.verses.len() {
            self.current_index = Some(next);
            self.verses.get(next).copied()
        } else {
            self.current_index = None;
            None
        }
    }

    /// Ends the run without visiting the remaining verses
    pub fn clear(&mut self) {
        self.current_index = None;
    }

    /// Returns formatted progress (e.g., "3/7")
    pub fn progress(&self) -> String {
        match self.current_index {
            Some(idx) => format!("{}/{}", idx + 1, self.verses.len()),
            None => format!("done/{}", self.verses.len()),
        }
    }
}
