//! Verse references and global verse numbering

use crate::error::{CoreError, CoreResult};
use serde::Serialize;
use std::fmt;

/// Number of chapters
pub const CHAPTER_COUNT: u16 = 114;

/// Number of verses across all chapters
pub const TOTAL_VERSES: u16 = 6236;

/// Global number of the first verse of each chapter, indexed by `chapter - 1`
///
/// Index 114 is a sentinel one past the last verse, so
/// `CHAPTER_OFFSETS[c] - CHAPTER_OFFSETS[c - 1]` is the verse count of chapter `c`.
const CHAPTER_OFFSETS: [u16; CHAPTER_COUNT as usize + 1] = [
    1, 8, 294, 494, 670, 790, 955, 1161, 1236, 1365,
    1474, 1597, 1708, 1751, 1803, 1902, 2030, 2141, 2251, 2349,
    2484, 2596, 2674, 2792, 2856, 2933, 3160, 3253, 3341, 3410,
    3470, 3504, 3534, 3607, 3661, 3706, 3789, 3971, 4059, 4134,
    4219, 4273, 4326, 4415, 4474, 4511, 4546, 4584, 4613, 4631,
    4676, 4736, 4785, 4847, 4902, 4980, 5076, 5105, 5127, 5151,
    5164, 5178, 5189, 5200, 5218, 5230, 5242, 5272, 5324, 5376,
    5420, 5448, 5476, 5496, 5552, 5592, 5623, 5673, 5713, 5759,
    5801, 5830, 5849, 5885, 5910, 5932, 5949, 5968, 5994, 6024,
    6044, 6059, 6080, 6091, 6099, 6107, 6126, 6131, 6139, 6147,
    6158, 6169, 6177, 6180, 6189, 6194, 6198, 6205, 6208, 6214,
    6217, 6222, 6226, 6231, 6237,
];

fn check_chapter(chapter: u16) -> CoreResult<usize> {
    if (1..=CHAPTER_COUNT).contains(&chapter) {
        Ok(chapter as usize)
    } else {
        Err(CoreError::InvalidChapter(chapter))
    }
}

/// Global number of the first verse of `chapter`
fn chapter_offset(chapter: u16) -> CoreResult<u16> {
    let idx = check_chapter(chapter)?;
    Ok(CHAPTER_OFFSETS[idx - 1])
}

/// Number of verses in a chapter
pub fn verse_count(chapter: u16) -> CoreResult<u16> {
    let idx = check_chapter(chapter)?;
    Ok(CHAPTER_OFFSETS[idx] - CHAPTER_OFFSETS[idx - 1])
}

/// All verses of a chapter, in ascending order
pub fn chapter_verses(chapter: u16) -> CoreResult<Vec<VerseRef>> {
    let count = verse_count(chapter)?;
    let offset = chapter_offset(chapter)?;
    Ok((1..=count)
        .map(|verse| VerseRef {
            chapter,
            verse,
            global: offset + verse - 1,
        })
        .collect())
}

/// A verse addressed both within its chapter and globally
///
/// Invariant: `offset(chapter) <= global < offset(chapter + 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VerseRef {
    chapter: u16,
    verse: u16,
    global: u16,
}

impl VerseRef {
    /// Creates a reference from chapter and verse-in-chapter numbers
    pub fn new(chapter: u16, verse: u16) -> CoreResult<Self> {
        let count = verse_count(chapter)?;
        if verse == 0 || verse > count {
            return Err(CoreError::InvalidVerse {
                chapter,
                verse,
                count,
            });
        }
        let global = chapter_offset(chapter)? + verse - 1;
        Ok(Self {
            chapter,
            verse,
            global,
        })
    }

    /// Creates a reference from a global verse number (1..=6236)
    pub fn from_global(global: u16) -> CoreResult<Self> {
        if global == 0 || global > TOTAL_VERSES {
            return Err(CoreError::InvalidGlobalVerse(global));
        }
        // Last chapter whose first verse is <= global
        let idx = CHAPTER_OFFSETS.partition_point(|&start| start <= global);
        let chapter = idx as u16;
        let verse = global - CHAPTER_OFFSETS[idx - 1] + 1;
        Ok(Self {
            chapter,
            verse,
            global,
        })
    }

    pub fn chapter(&self) -> u16 {
        self.chapter
    }

    /// Verse number within the chapter (1-based)
    pub fn verse(&self) -> u16 {
        self.verse
    }

    /// Verse number across the whole text (1..=6236)
    pub fn global(&self) -> u16 {
        self.global
    }
}

impl fmt::Display for VerseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chapter, self.verse)
    }
}
