// FILE: crates/media-engine/src/coordinator.rs
//! Playback arbitration
//!
//! [`PlaybackCoordinator`] is the only owner of a [`PlaybackSession`]. It
//! guarantees that at most one session is ever audible:
//!
//! - every request stops the active session before a new one is created
//! - every session gets a fresh generation, including each verse of a chapter run
//! - every asynchronous result (resolution, load, natural end, stream error) is
//!   checked against the current generation after it arrives, and dropped if stale
//!
//! The state lock is never held across an await point.

use crate::backend::{AudioBackend, SessionSignal, SignalReceiver, SignalSender};
use crate::error::{EngineError, EngineResult};
use crate::events::{PlaybackEvent, PlaybackKind, PlaybackSnapshot, StopReason};
use crate::resolver::{AudioSourceResolver, ResolveResult};
use crate::sequence::SequentialChapterPlayer;
use crate::session::{Generation, PlaybackSession, SessionSubject};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tilawa_core::{Narrator, NarratorCatalog, PlaybackError, VerseRef};
use tilawa_resilience::{with_timeout, FailureStreak, StreakState};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// Consecutive failed verses that abort a chapter run
    pub consecutive_failure_limit: usize,
    /// Time allowed for the backend to load a resolved URI
    pub load_timeout: Duration,
    /// Try the narrator's whole-chapter file before stepping verse by verse
    pub prefer_chapter_audio: bool,
    /// Buffered events per subscriber
    pub event_capacity: usize,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            consecutive_failure_limit: 3,
            load_timeout: Duration::from_secs(15),
            prefer_chapter_audio: false,
            event_capacity: 256,
        }
    }
}

/// Cursor and policy for an active chapter run
struct ChapterRun {
    player: SequentialChapterPlayer,
    narrator: Narrator,
    streak: FailureStreak,
    /// The current session plays the whole chapter file
    whole_file: bool,
}

struct CoordinatorState {
    generation: Generation,
    kind: PlaybackKind,
    session: Option<PlaybackSession>,
    run: Option<ChapterRun>,
}

impl CoordinatorState {
    fn new() -> Self {
        Self {
            generation: 0,
            kind: PlaybackKind::None,
            session: None,
            run: None,
        }
    }

    fn is_current(&self, generation: Generation) -> bool {
        self.generation == generation
            && self
                .session
                .as_ref()
                .is_some_and(|s| s.generation() == generation && !s.state().is_terminal())
    }

    fn current_session(&mut self, generation: Generation) -> Option<&mut PlaybackSession> {
        if self.generation != generation {
            return None;
        }
        self.session
            .as_mut()
            .filter(|s| s.generation() == generation && !s.state().is_terminal())
    }

    /// Stops whatever is active, returning the stopped generation
    fn stop_active(&mut self) -> Option<Generation> {
        let stopped = match self.session.as_mut() {
            Some(session) if !session.state().is_terminal() => {
                session.stop();
                Some(session.generation())
            }
            _ => None,
        };
        self.kind = PlaybackKind::None;
        self.run = None;
        stopped
    }

    /// Replaces the session with a fresh one under a new generation
    fn next_session(&mut self, subject: SessionSubject) -> Generation {
        self.generation += 1;
        self.session = Some(PlaybackSession::new(self.generation, subject));
        self.generation
    }
}

/// What to do after an attempt has been settled
enum Step {
    Done,
    Continue(Generation),
}

struct Inner {
    catalog: NarratorCatalog,
    resolver: AudioSourceResolver,
    backend: Arc<dyn AudioBackend>,
    options: CoordinatorOptions,
    state: Mutex<CoordinatorState>,
    events: broadcast::Sender<PlaybackEvent>,
    signal_tx: SignalSender,
    signal_rx: Mutex<Option<SignalReceiver>>,
}

/// Single point of truth for what may be audible
#[derive(Clone)]
pub struct PlaybackCoordinator {
    inner: Arc<Inner>,
}

impl PlaybackCoordinator {
    pub fn new(
        catalog: NarratorCatalog,
        resolver: AudioSourceResolver,
        backend: Arc<dyn AudioBackend>,
        options: CoordinatorOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        Self {
            inner: Arc::new(Inner {
                catalog,
                resolver,
                backend,
                options,
                state: Mutex::new(CoordinatorState::new()),
                events,
                signal_tx,
                signal_rx: Mutex::new(Some(signal_rx)),
            }),
        }
    }

    pub fn catalog(&self) -> &NarratorCatalog {
        &self.inner.catalog
    }

    pub fn resolver(&self) -> &AudioSourceResolver {
        &self.inner.resolver
    }

    pub fn options(&self) -> &CoordinatorOptions {
        &self.inner.options
    }

    /// Receives every event emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.inner.events.subscribe()
    }

    /// Sender handed to backends; exposed for hosts that drive signals themselves
    pub fn signal_sender(&self) -> SignalSender {
        self.inner.signal_tx.clone()
    }

    pub fn current_generation(&self) -> Generation {
        self.lock().generation
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let state = self.lock();
        let (chapter, current_index, run_verse) = match &state.run {
            Some(run) => (
                Some(run.player.chapter()),
                run.player.current_index(),
                run.player.current_verse(),
            ),
            None => (None, None, None),
        };
        let current_verse = run_verse.or(match state.session.as_ref().map(|s| s.subject()) {
            Some(SessionSubject::Verse(verse)) => Some(verse),
            _ => None,
        });

        PlaybackSnapshot {
            kind: state.kind,
            generation: state.generation,
            state: state.session.as_ref().map(|s| s.state().clone()),
            chapter,
            current_index,
            current_verse,
        }
    }

    /// Plays one verse, stopping anything that is active first
    ///
    /// Returns once the verse is playing or has failed. Failures are reported
    /// through events.
    pub async fn request_single_verse(&self, verse: VerseRef, narrator: Option<&str>) -> Generation {
        let narrator = self.resolve_narrator(narrator);

        let generation = {
            let mut state = self.lock();
            if let Some(old) = state.stop_active() {
                log::info!("Session {} superseded by verse {}", old, verse);
                self.emit(PlaybackEvent::Stopped {
                    generation: old,
                    reason: StopReason::Superseded,
                });
            }
            let generation = state.next_session(SessionSubject::Verse(verse));
            state.kind = PlaybackKind::SingleVerse;
            generation
        };

        log::info!(
            "Session {}: playing verse {} by {}",
            generation,
            verse,
            narrator.id
        );
        self.attempt(generation, verse, None, &narrator, false).await;
        generation
    }

    /// Plays a whole chapter from its first verse
    pub async fn request_chapter_sequence(
        &self,
        chapter: u16,
        narrator: Option<&str>,
    ) -> EngineResult<Generation> {
        self.request_chapter_from(chapter, 1, narrator).await
    }

    /// Plays a chapter from `start_verse` to its end
    ///
    /// Returns once the first playable verse is playing, or the run has ended.
    pub async fn request_chapter_from(
        &self,
        chapter: u16,
        start_verse: u16,
        narrator: Option<&str>,
    ) -> EngineResult<Generation> {
        let start = VerseRef::new(chapter, start_verse)?;
        let player = SequentialChapterPlayer::starting_at(chapter, usize::from(start.verse()) - 1)?;
        let narrator = self.resolve_narrator(narrator);
        let whole_file =
            self.inner.options.prefer_chapter_audio && narrator.chapter_audio && start_verse == 1;

        let generation = {
            let mut state = self.lock();
            if let Some(old) = state.stop_active() {
                log::info!("Session {} superseded by chapter {}", old, chapter);
                self.emit(PlaybackEvent::Stopped {
                    generation: old,
                    reason: StopReason::Superseded,
                });
            }
            let index = player.current_index().unwrap_or_default();
            state.run = Some(ChapterRun {
                player,
                narrator,
                streak: FailureStreak::new(self.inner.options.consecutive_failure_limit),
                whole_file: false,
            });
            state.kind = PlaybackKind::ChapterSequence;
            state.next_session(SessionSubject::Chapter { chapter, index })
        };

        log::info!("Session {}: playing chapter {} from verse {}", generation, chapter, start_verse);
        self.drive_chapter(generation, whole_file).await;
        Ok(generation)
    }

    /// Stops whatever is active; safe to call when nothing is
    pub fn stop_all(&self) -> bool {
        let mut state = self.lock();
        let stopped = state.stop_active();
        // Anything still in flight now belongs to an older generation
        state.generation += 1;

        match stopped {
            Some(generation) => {
                log::info!("Session {} stopped on request", generation);
                self.emit(PlaybackEvent::Stopped {
                    generation,
                    reason: StopReason::Requested,
                });
                true
            }
            None => false,
        }
    }

    pub fn pause(&self) -> bool {
        let mut state = self.lock();
        let generation = state.generation;
        match state.current_session(generation) {
            Some(session) => {
                if session.pause() {
                    self.emit(PlaybackEvent::Paused { generation });
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }

    pub fn resume(&self) -> bool {
        let mut state = self.lock();
        let generation = state.generation;
        match state.current_session(generation) {
            Some(session) => {
                if session.resume() {
                    self.emit(PlaybackEvent::Resumed { generation });
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }

    /// Natural end of the session with `generation`
    pub async fn on_session_completed(&self, generation: Generation) {
        let step = {
            let mut state = self.lock();
            let Some(session) = state.current_session(generation) else {
                log::debug!("Ignoring completion from stale session {}", generation);
                return;
            };
            if !session.on_natural_end() {
                log::debug!("Ignoring completion for session {} that is not playing", generation);
                return;
            }

            match state.kind {
                PlaybackKind::SingleVerse => {
                    state.kind = PlaybackKind::None;
                    self.emit(PlaybackEvent::Stopped {
                        generation,
                        reason: StopReason::Completed,
                    });
                    Step::Done
                }
                PlaybackKind::ChapterSequence => {
                    if state.run.as_ref().is_some_and(|run| run.whole_file) {
                        self.finish_run(&mut state, generation);
                        Step::Done
                    } else {
                        self.advance_run(&mut state, generation)
                    }
                }
                PlaybackKind::None => Step::Done,
            }
        };

        if let Step::Continue(next) = step {
            self.drive_chapter(next, false).await;
        }
    }

    /// Playback of the session with `generation` broke off after loading
    pub async fn on_session_failed(&self, generation: Generation, reason: String) {
        let step = {
            let mut state = self.lock();
            let Some(session) = state.current_session(generation) else {
                log::debug!("Ignoring error from stale session {}: {}", generation, reason);
                return;
            };
            let error = PlaybackError::LoadError {
                uri: session.uri().unwrap_or_default().to_string(),
                reason,
            };
            if state.run.as_ref().is_some_and(|run| run.whole_file) {
                // A chapter file that breaks mid-stream ends the run
                if let Some(session) = state.current_session(generation) {
                    session.on_load_error(&error.to_string());
                }
                self.abort_run(&mut state, generation, error);
                Step::Done
            } else {
                self.handle_failure(&mut state, generation, error)
            }
        };

        if let Step::Continue(next) = step {
            self.drive_chapter(next, false).await;
        }
    }

    pub async fn handle_signal(&self, signal: SessionSignal) {
        match signal {
            SessionSignal::Finished { generation } => self.on_session_completed(generation).await,
            SessionSignal::Errored { generation, reason } => {
                self.on_session_failed(generation, reason).await
            }
        }
    }

    /// Spawns the task that feeds backend signals into the coordinator
    ///
    /// Can be called once; the task runs until its handle is aborted.
    pub fn spawn_signal_loop(&self) -> EngineResult<JoinHandle<()>> {
        let mut signals = self
            .inner
            .signal_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| EngineError::InvalidState("signal loop already running".to_string()))?;

        let coordinator = self.clone();
        Ok(tokio::spawn(async move {
            while let Some(signal) = signals.recv().await {
                coordinator.handle_signal(signal).await;
            }
        }))
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: PlaybackEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    fn resolve_narrator(&self, requested: Option<&str>) -> Narrator {
        let (narrator, notice) = self.inner.catalog.resolve(requested);
        if let Some(notice) = notice {
            log::debug!("{} ({})", notice, notice.recovery_action());
        }
        narrator
    }

    /// Plays the run's current verse, skipping failures, until one plays or the run ends
    async fn drive_chapter(&self, generation: Generation, whole_file: bool) {
        let mut generation = generation;
        let mut whole_file = whole_file;

        loop {
            let target = {
                let state = self.lock();
                if !state.is_current(generation) {
                    return;
                }
                state.run.as_ref().and_then(|run| {
                    Some((
                        run.player.current_verse()?,
                        run.player.current_index()?,
                        run.narrator.clone(),
                    ))
                })
            };
            let Some((verse, index, narrator)) = target else {
                return;
            };

            let step = self
                .attempt(generation, verse, Some(index), &narrator, whole_file)
                .await;
            whole_file = false;

            match step {
                Step::Done => return,
                Step::Continue(next) => generation = next,
            }
        }
    }

    /// Resolves and loads audio for the session with `generation`
    async fn attempt(
        &self,
        generation: Generation,
        verse: VerseRef,
        index: Option<usize>,
        narrator: &Narrator,
        whole_chapter: bool,
    ) -> Step {
        {
            let mut state = self.lock();
            let Some(session) = state.current_session(generation) else {
                return Step::Done;
            };
            if let Err(e) = session.begin_resolving() {
                let error = PlaybackError::Internal(e.to_string());
                return self.handle_failure(&mut state, generation, error);
            }
            self.emit(PlaybackEvent::Resolving { generation, verse });
        }

        let resolver = &self.inner.resolver;
        let resolved = if whole_chapter {
            guarded(resolver.resolve_chapter(narrator, verse.chapter())).await
        } else {
            guarded(resolver.resolve_verse(narrator, verse)).await
        };

        self.finish_attempt(generation, verse, index, resolved).await
    }

    async fn finish_attempt(
        &self,
        generation: Generation,
        verse: VerseRef,
        index: Option<usize>,
        resolved: Result<ResolveResult, PlaybackError>,
    ) -> Step {
        let resolution = {
            let mut state = self.lock();
            if !state.is_current(generation) {
                log::debug!("Discarding resolution for stale session {}", generation);
                return Step::Done;
            }

            let resolved = match resolved {
                Ok(resolved) => resolved,
                Err(internal) => return self.handle_failure(&mut state, generation, internal),
            };

            let failures = match &resolved {
                Ok(resolution) => &resolution.failures,
                Err(failed) => &failed.failures,
            };
            for failure in failures {
                self.emit(PlaybackEvent::CandidateUnavailable {
                    generation,
                    verse,
                    candidate_index: failure.index,
                    reason: failure.reason.clone(),
                });
            }

            let resolution = match resolved {
                Ok(resolution) => resolution,
                Err(failed) => return self.handle_failure(&mut state, generation, failed.to_error()),
            };

            let started = match state.current_session(generation) {
                Some(session) => session.start(&resolution.uri),
                None => return Step::Done,
            };
            if let Err(e) = started {
                let error = PlaybackError::Internal(e.to_string());
                return self.handle_failure(&mut state, generation, error);
            }
            resolution
        };

        let load = self.inner.backend.load(
            &resolution.uri,
            generation,
            self.inner.signal_tx.clone(),
        );
        let loaded = guarded(with_timeout(self.inner.options.load_timeout, load)).await;

        let mut state = self.lock();
        if !state.is_current(generation) {
            if let Ok(Ok(Ok(mut handle))) = loaded {
                handle.release();
            }
            log::debug!("Discarding audio loaded for stale session {}", generation);
            return Step::Done;
        }

        let load_error = |reason: String| PlaybackError::LoadError {
            uri: resolution.uri.clone(),
            reason,
        };
        let handle = match loaded {
            Ok(Ok(Ok(handle))) => handle,
            Ok(Ok(Err(e))) => {
                return self.handle_failure(&mut state, generation, load_error(e.to_string()))
            }
            Ok(Err(timeout)) => {
                return self.handle_failure(&mut state, generation, load_error(timeout.to_string()))
            }
            Err(internal) => return self.handle_failure(&mut state, generation, internal),
        };

        let Some(session) = state.current_session(generation) else {
            return Step::Done;
        };
        if let Err(e) = session.on_ready(handle) {
            return self.handle_failure(&mut state, generation, load_error(e.to_string()));
        }

        let whole_chapter = resolution.is_chapter_file();
        if let Some(run) = state.run.as_mut() {
            run.streak.record_success();
            run.whole_file = whole_chapter;
        }

        log::info!(
            "Session {}: now playing {} from candidate {}",
            generation,
            verse,
            resolution.candidate_index
        );
        self.emit(PlaybackEvent::NowPlaying {
            generation,
            verse,
            index,
            uri: resolution.uri,
            candidate_index: resolution.candidate_index,
            whole_chapter,
        });
        Step::Done
    }

    /// Settles a failed session under the lock
    fn handle_failure(
        &self,
        state: &mut CoordinatorState,
        generation: Generation,
        error: PlaybackError,
    ) -> Step {
        if let Some(session) = state
            .session
            .as_mut()
            .filter(|s| s.generation() == generation)
        {
            session.on_load_error(&error.to_string());
        }

        match state.kind {
            PlaybackKind::SingleVerse => {
                log::error!("Session {} failed: {}", generation, error);
                state.kind = PlaybackKind::None;
                self.emit(PlaybackEvent::Failed { generation, error });
                self.emit(PlaybackEvent::Stopped {
                    generation,
                    reason: StopReason::Failed,
                });
                Step::Done
            }
            PlaybackKind::ChapterSequence => self.skip_failed_verse(state, generation, error),
            PlaybackKind::None => Step::Done,
        }
    }

    fn skip_failed_verse(
        &self,
        state: &mut CoordinatorState,
        generation: Generation,
        error: PlaybackError,
    ) -> Step {
        let Some(run) = state.run.as_mut() else {
            return Step::Done;
        };
        let chapter = run.player.chapter();

        if let (Some(verse), Some(index)) = (run.player.current_verse(), run.player.current_index())
        {
            log::warn!("Skipping verse {}: {}", verse, error);
            self.emit(PlaybackEvent::VerseFailed {
                generation,
                verse,
                index,
                error,
            });
        }

        match run.streak.record_failure() {
            StreakState::Healthy => self.advance_run(state, generation),
            StreakState::Tripped => {
                let failures = run.streak.consecutive_failures();
                let error = PlaybackError::SequenceAborted { chapter, failures };
                self.abort_run(state, generation, error);
                Step::Done
            }
        }
    }

    /// Ends the chapter run with a user-visible failure
    fn abort_run(
        &self,
        state: &mut CoordinatorState,
        generation: Generation,
        error: PlaybackError,
    ) {
        log::error!("Session {}: {}", generation, error);
        state.kind = PlaybackKind::None;
        state.run = None;
        self.emit(PlaybackEvent::Failed { generation, error });
        self.emit(PlaybackEvent::Stopped {
            generation,
            reason: StopReason::Failed,
        });
    }

    /// Moves the run to its next verse under a new generation
    fn advance_run(&self, state: &mut CoordinatorState, generation: Generation) -> Step {
        let next = match state.run.as_mut() {
            Some(run) => {
                run.whole_file = false;
                run.player
                    .advance()
                    .and(run.player.current_index())
                    .map(|index| (run.player.chapter(), index))
            }
            None => return Step::Done,
        };

        match next {
            Some((chapter, index)) => {
                Step::Continue(state.next_session(SessionSubject::Chapter { chapter, index }))
            }
            None => {
                self.finish_run(state, generation);
                Step::Done
            }
        }
    }

    fn finish_run(&self, state: &mut CoordinatorState, generation: Generation) {
        if let Some(run) = state.run.as_mut() {
            log::info!("Chapter {} finished", run.player.chapter());
            run.player.clear();
        }
        state.kind = PlaybackKind::None;
        state.run = None;
        self.emit(PlaybackEvent::Stopped {
            generation,
            reason: StopReason::Completed,
        });
    }
}

impl std::fmt::Debug for PlaybackCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackCoordinator")
            .field("options", &self.inner.options)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

/// Runs `future`, turning a panic into [`PlaybackError::Internal`]
async fn guarded<F: Future>(future: F) -> Result<F::Output, PlaybackError> {
    AssertUnwindSafe(future).catch_unwind().await.map_err(|payload| {
        let message = panic_message(payload.as_ref());
        log::error!("Playback task panicked: {}", message);
        PlaybackError::Internal(message)
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
