// FILE: crates/media-engine/src/resolver.rs
//! Audio source resolution
//!
//! A narrator and a verse (or chapter) expand into an ordered list of
//! [`AudioCandidate`]s. Candidates are tried one at a time, in order, each
//! under its own timeout; the first one that answers wins. A failed attempt
//! only moves on to the next candidate.

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tilawa_core::{chapter_verses, Narrator, PlaybackError, VerseRef};
use tilawa_network::{Client, NetworkError, NetworkResult};
use tilawa_resilience::with_timeout;

use crate::error::EngineResult;

/// Where candidate URIs point
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverOptions {
    pub metadata_endpoint: String,
    pub cdn_base: String,
    pub legacy_cdn_base: String,
    pub bitrate: u32,
    pub attempt_timeout: Duration,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            metadata_endpoint: "https://api.alquran.cloud/v1".to_string(),
            cdn_base: "https://cdn.islamic.network/quran".to_string(),
            legacy_cdn_base: "https://cdn.alquran.cloud".to_string(),
            bitrate: 128,
            attempt_timeout: Duration::from_secs(8),
        }
    }
}

/// Layout of a direct CDN candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectKind {
    /// `{cdn}/audio/{bitrate}/{token}/{global}.mp3`
    WithBitrate,
    /// `{cdn}/audio/{token}/{global}.mp3`
    WithoutBitrate,
    /// `{legacy}/media/audio/ayah/{token}/{global}`
    Legacy,
}

/// One place audio might be found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioCandidate {
    /// JSON endpoint that names the audio URL
    MetadataLookup { url: String },
    /// Audio file URL
    Direct { url: String, kind: DirectKind },
    /// Whole-chapter audio file
    ChapterFile { url: String },
}

impl AudioCandidate {
    pub fn url(&self) -> &str {
        match self {
            AudioCandidate::MetadataLookup { url }
            | AudioCandidate::Direct { url, .. }
            | AudioCandidate::ChapterFile { url } => url,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AudioCandidate::MetadataLookup { .. } => "metadata",
            AudioCandidate::Direct {
                kind: DirectKind::WithBitrate,
                ..
            } => "cdn",
            AudioCandidate::Direct {
                kind: DirectKind::WithoutBitrate,
                ..
            } => "cdn-no-bitrate",
            AudioCandidate::Direct {
                kind: DirectKind::Legacy,
                ..
            } => "legacy-cdn",
            AudioCandidate::ChapterFile { .. } => "chapter-file",
        }
    }

    pub fn is_chapter_file(&self) -> bool {
        matches!(self, AudioCandidate::ChapterFile { .. })
    }
}

impl fmt::Display for AudioCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.label(), self.url())
    }
}

fn trim_base(base: &str) -> &str {
    base.trim_end_matches('/')
}

/// Verse-level candidates in priority order
pub fn candidates_for_verse(
    options: &ResolverOptions,
    narrator: &Narrator,
    verse: VerseRef,
) -> Vec<AudioCandidate> {
    let token = narrator.audio_token();
    let global = verse.global();
    let cdn = trim_base(&options.cdn_base);

    vec![
        AudioCandidate::MetadataLookup {
            url: format!(
                "{}/ayah/{}/{}",
                trim_base(&options.metadata_endpoint),
                global,
                token
            ),
        },
        AudioCandidate::Direct {
            url: format!("{}/audio/{}/{}/{}.mp3", cdn, options.bitrate, token, global),
            kind: DirectKind::WithBitrate,
        },
        AudioCandidate::Direct {
            url: format!("{}/audio/{}/{}.mp3", cdn, token, global),
            kind: DirectKind::WithoutBitrate,
        },
        AudioCandidate::Direct {
            url: format!(
                "{}/media/audio/ayah/{}/{}",
                trim_base(&options.legacy_cdn_base),
                token,
                global
            ),
            kind: DirectKind::Legacy,
        },
    ]
}

/// Chapter-level candidates in priority order
///
/// Narrators that publish chapter files get that file first; every narrator
/// then falls back to the candidates for the chapter's first verse.
pub fn candidates_for_chapter(
    options: &ResolverOptions,
    narrator: &Narrator,
    chapter: u16,
) -> EngineResult<Vec<AudioCandidate>> {
    let first = chapter_verses(chapter)?
        .into_iter()
        .next()
        .ok_or(tilawa_core::CoreError::InvalidChapter(chapter))?;

    let mut candidates = Vec::with_capacity(5);
    if narrator.chapter_audio {
        candidates.push(AudioCandidate::ChapterFile {
            url: format!(
                "{}/audio-surah/{}/{}/{}.mp3",
                trim_base(&options.cdn_base),
                options.bitrate,
                narrator.audio_token(),
                chapter
            ),
        });
    }
    candidates.extend(candidates_for_verse(options, narrator, first));
    Ok(candidates)
}

/// Network operations the resolver needs
#[async_trait]
pub trait CandidateProbe: Send + Sync {
    /// Fetches a metadata document and returns the audio URL it names
    async fn lookup_audio_url(&self, url: &str) -> NetworkResult<String>;

    /// Confirms that `url` serves content
    async fn check(&self, url: &str) -> NetworkResult<()>;
}

#[derive(Debug, Deserialize)]
struct AyahEnvelope {
    data: Option<AyahData>,
}

#[derive(Debug, Deserialize)]
struct AyahData {
    audio: Option<String>,
}

/// Extracts `data.audio` from a metadata response body
fn audio_url_from(envelope: AyahEnvelope) -> NetworkResult<String> {
    envelope
        .data
        .and_then(|d| d.audio)
        .map(|url| url.trim().to_string())
        .filter(|url| url.starts_with("http://") || url.starts_with("https://"))
        .ok_or_else(|| NetworkError::InvalidResponse("no audio URL in response".to_string()))
}

/// Probe backed by the HTTP client
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CandidateProbe for HttpProbe {
    async fn lookup_audio_url(&self, url: &str) -> NetworkResult<String> {
        let envelope: AyahEnvelope = self.client.get_json(url).await?;
        audio_url_from(envelope)
    }

    async fn check(&self, url: &str) -> NetworkResult<()> {
        self.client.check(url).await
    }
}

/// A candidate that did not work out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFailure {
    pub index: usize,
    pub candidate: AudioCandidate,
    pub reason: String,
}

impl CandidateFailure {
    pub fn to_error(&self) -> PlaybackError {
        PlaybackError::CandidateUnavailable {
            index: self.index,
            reason: self.reason.clone(),
        }
    }
}

/// Successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Playable URI
    pub uri: String,
    /// Position of the winning candidate in the list
    pub candidate_index: usize,
    pub candidate: AudioCandidate,
    /// Attempts that failed before the winner, in order
    pub failures: Vec<CandidateFailure>,
}

impl Resolution {
    pub fn is_chapter_file(&self) -> bool {
        self.candidate.is_chapter_file()
    }
}

/// Every candidate failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFailed {
    pub subject: String,
    pub failures: Vec<CandidateFailure>,
}

impl ResolutionFailed {
    pub fn to_error(&self) -> PlaybackError {
        PlaybackError::ResolutionExhausted {
            subject: self.subject.clone(),
            attempts: self.failures.len(),
        }
    }
}

pub type ResolveResult = Result<Resolution, ResolutionFailed>;

/// Turns (narrator, subject) into a playable URI
#[derive(Clone)]
pub struct AudioSourceResolver {
    probe: Arc<dyn CandidateProbe>,
    options: ResolverOptions,
}

impl AudioSourceResolver {
    pub fn new(probe: Arc<dyn CandidateProbe>, options: ResolverOptions) -> Self {
        Self { probe, options }
    }

    /// Resolver that probes over HTTP
    pub fn with_client(client: Client, options: ResolverOptions) -> Self {
        Self::new(Arc::new(HttpProbe::new(client)), options)
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    pub fn candidates_for_verse(&self, narrator: &Narrator, verse: VerseRef) -> Vec<AudioCandidate> {
        candidates_for_verse(&self.options, narrator, verse)
    }

    pub fn candidates_for_chapter(
        &self,
        narrator: &Narrator,
        chapter: u16,
    ) -> EngineResult<Vec<AudioCandidate>> {
        candidates_for_chapter(&self.options, narrator, chapter)
    }

    pub async fn resolve_verse(&self, narrator: &Narrator, verse: VerseRef) -> ResolveResult {
        let candidates = self.candidates_for_verse(narrator, verse);
        self.resolve_candidates(&format!("{} ({})", verse, narrator.id), &candidates)
            .await
    }

    /// Resolves whole-chapter audio, falling back to the first verse
    ///
    /// When the result is not a chapter file the caller steps through the
    /// remaining verses itself.
    pub async fn resolve_chapter(&self, narrator: &Narrator, chapter: u16) -> ResolveResult {
        let subject = format!("chapter {} ({})", chapter, narrator.id);
        match self.candidates_for_chapter(narrator, chapter) {
            Ok(candidates) => self.resolve_candidates(&subject, &candidates).await,
            Err(e) => Err(ResolutionFailed {
                subject,
                failures: vec![CandidateFailure {
                    index: 0,
                    candidate: AudioCandidate::ChapterFile { url: String::new() },
                    reason: e.to_string(),
                }],
            }),
        }
    }

    /// Tries `candidates` strictly in order; the first success wins
    pub async fn resolve_candidates(
        &self,
        subject: &str,
        candidates: &[AudioCandidate],
    ) -> ResolveResult {
        let mut failures = Vec::new();

        for (index, candidate) in candidates.iter().enumerate() {
            log::debug!("Resolving {}: trying candidate {} {}", subject, index, candidate);

            let reason = match with_timeout(self.options.attempt_timeout, self.attempt(candidate))
                .await
            {
                Ok(Ok(uri)) => {
                    log::info!(
                        "Resolved {} via candidate {} ({})",
                        subject,
                        index,
                        candidate.label()
                    );
                    return Ok(Resolution {
                        uri,
                        candidate_index: index,
                        candidate: candidate.clone(),
                        failures,
                    });
                }
                Ok(Err(e)) => e.to_string(),
                Err(timeout) => timeout.to_string(),
            };

            log::warn!(
                "Candidate {} for {} unavailable ({}): {}",
                index,
                subject,
                candidate.label(),
                reason
            );
            failures.push(CandidateFailure {
                index,
                candidate: candidate.clone(),
                reason,
            });
        }

        log::warn!(
            "All {} candidates failed for {}",
            candidates.len(),
            subject
        );
        Err(ResolutionFailed {
            subject: subject.to_string(),
            failures,
        })
    }

    async fn attempt(&self, candidate: &AudioCandidate) -> NetworkResult<String> {
        match candidate {
            AudioCandidate::MetadataLookup { url } => self.probe.lookup_audio_url(url).await,
            AudioCandidate::Direct { url, .. } | AudioCandidate::ChapterFile { url } => {
                self.probe.check(url).await?;
                Ok(url.clone())
            }
        }
    }
}

impl fmt::Debug for AudioSourceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioSourceResolver")
            .field("options", &self.options)
            .finish()
    }
}
