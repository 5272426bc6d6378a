//! Narrator domain model and the static catalog

use crate::error::{CoreError, CoreResult, PlaybackError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Id of the narrator substituted whenever the requested one is missing
pub const DEFAULT_NARRATOR_ID: &str = "alafasy";

/// Recitation language of a narrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Arabic,
    English,
}

impl Language {
    /// Edition prefix used by the audio services ("ar", "en")
    pub fn prefix(&self) -> &'static str {
        match self {
            Language::Arabic => "ar",
            Language::English => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Arabic => write!(f, "Arabic"),
            Language::English => write!(f, "English"),
        }
    }
}

/// A recitation voice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narrator {
    pub id: String,
    pub display_name: String,
    pub language: Language,
    /// Publishes one audio file per chapter in addition to per-verse files
    pub chapter_audio: bool,
}

impl Narrator {
    pub fn new(id: &str, display_name: &str, language: Language, chapter_audio: bool) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            language,
            chapter_audio,
        }
    }

    /// Canonical language-prefixed token, e.g. `ar.alafasy`
    pub fn audio_token(&self) -> String {
        Self::normalize_token(&self.id, self.language)
    }

    /// Normalizes a bare or prefixed token to the `<lang>.<id>` form
    ///
    /// A token that already carries a prefix is returned unchanged.
    pub fn normalize_token(token: &str, language: Language) -> String {
        let token = token.trim();
        match token.split_once('.') {
            Some((prefix, rest)) if !prefix.is_empty() && !rest.is_empty() => token.to_string(),
            _ => format!("{}.{}", language.prefix(), token.trim_matches('.')),
        }
    }
}

impl fmt::Display for Narrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.id)
    }
}

/// Static registry of narrators, loaded once and never mutated
#[derive(Debug, Clone)]
pub struct NarratorCatalog {
    narrators: Vec<Narrator>,
}

impl NarratorCatalog {
    /// Builds the catalog from the fixed narrator list
    pub fn new() -> Self {
        use Language::{Arabic, English};

        let narrators = vec![
            Narrator::new("alafasy", "Mishary Rashid Alafasy", Arabic, true),
            Narrator::new("abdulbasitmurattal", "Abdul Basit Murattal", Arabic, true),
            Narrator::new("abdurrahmaansudais", "Abdurrahmaan As-Sudais", Arabic, true),
            Narrator::new("ahmedajamy", "Ahmed ibn Ali al-Ajamy", Arabic, false),
            Narrator::new("hanirifai", "Hani Rifai", Arabic, false),
            Narrator::new("husary", "Mahmoud Khalil Al-Husary", Arabic, true),
            Narrator::new(
                "husarymujawwad",
                "Mahmoud Khalil Al-Husary (Mujawwad)",
                Arabic,
                false,
            ),
            Narrator::new("mahermuaiqly", "Maher Al Muaiqly", Arabic, true),
            Narrator::new("minshawi", "Mohamed Siddiq al-Minshawi", Arabic, true),
            Narrator::new(
                "minshawimujawwad",
                "Mohamed Siddiq al-Minshawi (Mujawwad)",
                Arabic,
                false,
            ),
            Narrator::new("muhammadayyoub", "Muhammad Ayyoub", Arabic, false),
            Narrator::new("muhammadjibreel", "Muhammad Jibreel", Arabic, false),
            Narrator::new("walk", "Ibrahim Walk", English, false),
        ];

        Self { narrators }
    }

    /// All narrators in display order
    pub fn list(&self) -> &[Narrator] {
        &self.narrators
    }

    /// Looks up a narrator by id
    ///
    /// Prefixed tokens (`ar.alafasy`) are accepted as well as bare ids.
    pub fn get(&self, id: &str) -> CoreResult<&Narrator> {
        let id = id.trim();
        let bare = id.split_once('.').map(|(_, rest)| rest).unwrap_or(id);
        self.narrators
            .iter()
            .find(|n| n.id == bare)
            .ok_or_else(|| CoreError::NarratorNotFound(id.to_string()))
    }

    /// The narrator used when none (or an unknown one) is selected
    pub fn default_narrator(&self) -> Narrator {
        self.get(DEFAULT_NARRATOR_ID).cloned().unwrap_or_else(|_| {
            Narrator::new(
                DEFAULT_NARRATOR_ID,
                "Mishary Rashid Alafasy",
                Language::Arabic,
                true,
            )
        })
    }

    /// Resolves an optional narrator id, substituting the default when missing
    ///
    /// Never fails: an unknown id yields the default narrator together with a
    /// `NarratorUnresolvable` notice for the caller to log.
    pub fn resolve(&self, id: Option<&str>) -> (Narrator, Option<PlaybackError>) {
        let fallback = self.default_narrator();

        match id.map(str::trim).filter(|s| !s.is_empty()) {
            None => (fallback, None),
            Some(requested) => match self.get(requested) {
                Ok(narrator) => (narrator.clone(), None),
                Err(_) => {
                    log::warn!(
                        "Unknown narrator '{}', falling back to '{}'",
                        requested,
                        fallback.id
                    );
                    let notice = PlaybackError::NarratorUnresolvable {
                        requested: requested.to_string(),
                        substitute: fallback.id.clone(),
                    };
                    (fallback, Some(notice))
                }
            },
        }
    }
}

impl Default for NarratorCatalog {
    fn default() -> Self {
        Self::new()
    }
}
