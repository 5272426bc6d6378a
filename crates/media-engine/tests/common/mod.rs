// FILE: crates/media-engine/tests/common/mod.rs
//! Scripted probe and backend shared by the engine integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use media_engine::{
    AudioBackend, AudioHandle, AudioSourceResolver, CoordinatorOptions, EngineError, EngineResult,
    Generation, PlaybackCoordinator, PlaybackEvent, ResolverOptions, SessionSignal, SignalSender,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tilawa_core::NarratorCatalog;
use tilawa_network::{NetworkError, NetworkResult};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub const METADATA: &str = "https://meta.test/v1";
pub const CDN: &str = "https://cdn.test/quran";
pub const LEGACY: &str = "https://legacy.test";
pub const AUDIO: &str = "https://audio.test";

pub fn resolver_options() -> ResolverOptions {
    ResolverOptions {
        metadata_endpoint: METADATA.to_string(),
        cdn_base: CDN.to_string(),
        legacy_cdn_base: LEGACY.to_string(),
        bitrate: 128,
        attempt_timeout: Duration::from_secs(1),
    }
}

/// The four verse-level candidate URLs for the default narrator
pub fn verse_urls(global: u16) -> [String; 4] {
    [
        format!("{}/ayah/{}/ar.alafasy", METADATA, global),
        format!("{}/audio/128/ar.alafasy/{}.mp3", CDN, global),
        format!("{}/audio/ar.alafasy/{}.mp3", CDN, global),
        format!("{}/media/audio/ayah/ar.alafasy/{}", LEGACY, global),
    ]
}

/// Audio URL the metadata endpoint answers with
pub fn metadata_audio(global: u16) -> String {
    format!("{}/ayah/{}/ar.alafasy.mp3", AUDIO, global)
}

pub fn chapter_file_url(chapter: u16) -> String {
    format!("{}/audio-surah/128/ar.alafasy/{}.mp3", CDN, chapter)
}

/// Probe that fails the URLs it is told to and records every request in order
#[derive(Default)]
pub struct MockProbe {
    failing: HashSet<String>,
    panicking: HashSet<String>,
    requests: Mutex<Vec<String>>,
}

impl MockProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    /// Fails every candidate of a verse
    pub fn failing_verse(mut self, global: u16) -> Self {
        for url in verse_urls(global) {
            self.failing.insert(url);
        }
        self
    }

    pub fn panicking(mut self, url: impl Into<String>) -> Self {
        self.panicking.insert(url.into());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, url: &str) -> NetworkResult<()> {
        self.requests.lock().unwrap().push(url.to_string());
        if self.panicking.contains(url) {
            panic!("probe exploded on {}", url);
        }
        if self.failing.contains(url) {
            return Err(NetworkError::Status {
                status: 404,
                reason: "Not Found".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl media_engine::CandidateProbe for MockProbe {
    async fn lookup_audio_url(&self, url: &str) -> NetworkResult<String> {
        self.record(url)?;
        let path = url.trim_start_matches(METADATA);
        Ok(format!("{}{}.mp3", AUDIO, path))
    }

    async fn check(&self, url: &str) -> NetworkResult<()> {
        self.record(url)
    }
}

/// What the backend has seen
#[derive(Debug, Default)]
pub struct BackendLog {
    pub loaded: Vec<String>,
    pub audible: usize,
    pub max_audible: usize,
    pub released: usize,
}

/// Backend whose handles can finish on their own as soon as they start
#[derive(Default)]
pub struct MockBackend {
    auto_finish: bool,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    delays: HashMap<String, Duration>,
    log: Arc<Mutex<BackendLog>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles report natural end right after they start playing
    pub fn auto_finish(mut self) -> Self {
        self.auto_finish = true;
        self
    }

    pub fn failing(mut self, uri: impl Into<String>) -> Self {
        self.failing.insert(uri.into());
        self
    }

    pub fn panicking(mut self, uri: impl Into<String>) -> Self {
        self.panicking.insert(uri.into());
        self
    }

    pub fn delayed(mut self, uri: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(uri.into(), delay);
        self
    }

    pub fn log(&self) -> Arc<Mutex<BackendLog>> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl AudioBackend for MockBackend {
    async fn load(
        &self,
        uri: &str,
        generation: Generation,
        signals: SignalSender,
    ) -> EngineResult<Box<dyn AudioHandle>> {
        self.log.lock().unwrap().loaded.push(uri.to_string());

        if let Some(delay) = self.delays.get(uri) {
            tokio::time::sleep(*delay).await;
        }
        if self.panicking.contains(uri) {
            panic!("backend exploded on {}", uri);
        }
        if self.failing.contains(uri) {
            return Err(EngineError::LoadError(format!("cannot decode {}", uri)));
        }

        Ok(Box::new(MockHandle {
            generation,
            signals,
            auto_finish: self.auto_finish,
            audible: false,
            released: false,
            log: Arc::clone(&self.log),
        }))
    }
}

struct MockHandle {
    generation: Generation,
    signals: SignalSender,
    auto_finish: bool,
    audible: bool,
    released: bool,
    log: Arc<Mutex<BackendLog>>,
}

impl MockHandle {
    fn set_audible(&mut self, audible: bool) {
        if self.audible == audible {
            return;
        }
        self.audible = audible;
        let mut log = self.log.lock().unwrap();
        if audible {
            log.audible += 1;
            log.max_audible = log.max_audible.max(log.audible);
        } else {
            log.audible -= 1;
        }
    }
}

impl AudioHandle for MockHandle {
    fn play(&mut self) -> EngineResult<()> {
        self.set_audible(true);
        if self.auto_finish {
            let _ = self.signals.send(SessionSignal::Finished {
                generation: self.generation,
            });
        }
        Ok(())
    }

    fn pause(&mut self) -> EngineResult<()> {
        self.set_audible(false);
        Ok(())
    }

    fn resume(&mut self) -> EngineResult<()> {
        self.set_audible(true);
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.set_audible(false);
        self.log.lock().unwrap().released += 1;
    }
}

pub struct Harness {
    pub coordinator: PlaybackCoordinator,
    pub probe: Arc<MockProbe>,
    pub backend: Arc<Mutex<BackendLog>>,
    pub events: broadcast::Receiver<PlaybackEvent>,
    pub signal_loop: JoinHandle<()>,
}

impl Harness {
    pub fn new(probe: MockProbe, backend: MockBackend, options: CoordinatorOptions) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let probe = Arc::new(probe);
        let log = backend.log();
        let resolver = AudioSourceResolver::new(probe.clone(), resolver_options());
        let coordinator = PlaybackCoordinator::new(
            NarratorCatalog::new(),
            resolver,
            Arc::new(backend),
            options,
        );
        let events = coordinator.subscribe();
        let signal_loop = coordinator
            .spawn_signal_loop()
            .expect("signal loop starts once");

        Self {
            coordinator,
            probe,
            backend: log,
            events,
            signal_loop,
        }
    }

    pub fn with_defaults(probe: MockProbe, backend: MockBackend) -> Self {
        Self::new(probe, backend, CoordinatorOptions::default())
    }

    /// Collects events until `done` matches one, inclusive
    pub async fn collect_until(
        &mut self,
        done: impl Fn(&PlaybackEvent) -> bool,
    ) -> Vec<PlaybackEvent> {
        let mut seen = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(30), self.events.recv())
                .await
                .expect("timed out waiting for playback events")
                .expect("event channel closed");
            let finished = done(&event);
            seen.push(event);
            if finished {
                return seen;
            }
        }
    }

    /// Events already emitted, without waiting
    pub fn drain(&mut self) -> Vec<PlaybackEvent> {
        let mut seen = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            seen.push(event);
        }
        seen
    }

    pub fn backend_log<T>(&self, read: impl FnOnce(&BackendLog) -> T) -> T {
        read(&self.backend.lock().unwrap())
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.signal_loop.abort();
    }
}

pub fn is_stopped(event: &PlaybackEvent) -> bool {
    matches!(event, PlaybackEvent::Stopped { .. })
}

/// Verses of every `NowPlaying` event, in order
pub fn now_playing(events: &[PlaybackEvent]) -> Vec<(u16, u16)> {
    events
        .iter()
        .filter_map(|event| match event {
            PlaybackEvent::NowPlaying { verse, .. } => Some((verse.chapter(), verse.verse())),
            _ => None,
        })
        .collect()
}

pub fn count_failed(events: &[PlaybackEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, PlaybackEvent::Failed { .. }))
        .count()
}
