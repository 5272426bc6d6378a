// FILE: crates/media-engine/src/scroll.rs
//! Verse-to-scroll-position synchronisation
//!
//! The UI reports where each verse was laid out; the controller turns "this
//! verse is current" into a scroll request plus a short-lived highlight. Until
//! a verse has been measured its position is estimated from its place in the
//! chapter.

use crate::error::EngineResult;
use crate::events::PlaybackEvent;
use std::collections::HashMap;
use std::time::Duration;
use tilawa_core::{verse_count, VerseRef};
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollOptions {
    /// How long a highlight stays on after a scroll
    pub highlight: Duration,
    /// Estimated height of the whole chapter, used before offsets are measured
    pub content_height_estimate: f64,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            highlight: Duration::from_millis(2000),
            content_height_estimate: 10_000.0,
        }
    }
}

/// Scroll request for the UI
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollCommand {
    /// Verse number within the chapter
    pub verse: u16,
    pub offset: f64,
    /// False when the offset is an estimate
    pub exact: bool,
}

#[derive(Debug)]
pub struct ScrollSyncController {
    chapter: u16,
    total_verses: u16,
    options: ScrollOptions,
    offsets: HashMap<u16, f64>,
    highlight: Option<(u16, Instant)>,
}

impl ScrollSyncController {
    pub fn new(chapter: u16, total_verses: u16, options: ScrollOptions) -> Self {
        Self {
            chapter,
            total_verses,
            options,
            offsets: HashMap::new(),
            highlight: None,
        }
    }

    /// Creates a controller sized from the chapter's verse count
    pub fn for_chapter(chapter: u16, options: ScrollOptions) -> EngineResult<Self> {
        let total = verse_count(chapter)?;
        Ok(Self::new(chapter, total, options))
    }

    pub fn chapter(&self) -> u16 {
        self.chapter
    }

    pub fn total_verses(&self) -> u16 {
        self.total_verses
    }

    /// Records a measured offset; the latest report for a verse wins
    pub fn record_position(&mut self, verse: u16, offset: f64) {
        if !offset.is_finite() {
            log::debug!("Ignoring non-finite offset for verse {}", verse);
            return;
        }
        self.offsets.insert(verse, offset);
    }

    pub fn known_offset(&self, verse: u16) -> Option<f64> {
        self.offsets.get(&verse).copied()
    }

    /// Scrolls to a verse of the current chapter and highlights it
    ///
    /// Returns `None` for verse numbers outside the chapter.
    pub fn scroll_to(&mut self, verse: u16) -> Option<ScrollCommand> {
        if verse == 0 || verse > self.total_verses {
            log::debug!(
                "Verse {} is outside chapter {} ({} verses)",
                verse,
                self.chapter,
                self.total_verses
            );
            return None;
        }

        let command = match self.known_offset(verse) {
            Some(offset) => ScrollCommand {
                verse,
                offset,
                exact: true,
            },
            None => ScrollCommand {
                verse,
                offset: f64::from(verse) / f64::from(self.total_verses)
                    * self.options.content_height_estimate,
                exact: false,
            },
        };

        self.highlight = Some((verse, Instant::now() + self.options.highlight));
        Some(command)
    }

    /// Verse currently highlighted, if the highlight has not expired
    pub fn highlighted(&self) -> Option<u16> {
        match self.highlight {
            Some((verse, until)) if Instant::now() < until => Some(verse),
            _ => None,
        }
    }

    pub fn clear_highlight(&mut self) {
        self.highlight = None;
    }

    /// Follows playback: scrolls when a verse of this chapter starts playing
    pub fn follow(&mut self, event: &PlaybackEvent) -> Option<ScrollCommand> {
        match event {
            PlaybackEvent::NowPlaying { verse, .. } if verse.chapter() == self.chapter => {
                self.scroll_to(verse.verse())
            }
            _ => None,
        }
    }

    /// Navigates to a bookmarked verse, switching chapter if needed
    pub fn deep_link(&mut self, verse: VerseRef) -> Option<ScrollCommand> {
        if verse.chapter() != self.chapter {
            let total = verse_count(verse.chapter()).ok()?;
            self.reset(verse.chapter(), total);
        }
        self.scroll_to(verse.verse())
    }

    /// Starts over for another chapter; measured offsets are dropped
    pub fn reset(&mut self, chapter: u16, total_verses: u16) {
        self.chapter = chapter;
        self.total_verses = total_verses;
        self.offsets.clear();
        self.highlight = None;
    }
}
