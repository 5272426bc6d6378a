// FILE: crates/media-engine/tests/coordinator_tests.rs
//! Playback coordination scenarios against a scripted probe and backend

mod common;

use common::*;
use media_engine::{
    CoordinatorOptions, EngineError, PlaybackEvent, PlaybackKind, ScrollOptions,
    ScrollSyncController, SessionState, StopReason,
};
use std::time::Duration;
use tilawa_core::{PlaybackError, VerseRef};

fn verse(chapter: u16, verse: u16) -> VerseRef {
    VerseRef::new(chapter, verse).unwrap()
}

#[tokio::test]
async fn test_chapter_plays_every_verse_in_order() {
    let mut h = Harness::with_defaults(MockProbe::new(), MockBackend::new().auto_finish());

    let first = h.coordinator.request_chapter_sequence(1, None).await.unwrap();
    let events = h.collect_until(is_stopped).await;

    assert_eq!(
        now_playing(&events),
        (1..=7).map(|v| (1, v)).collect::<Vec<_>>()
    );
    let indices: Vec<Option<usize>> = events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::NowPlaying { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(indices, (0..7).map(Some).collect::<Vec<_>>());
    assert_eq!(count_failed(&events), 0);
    assert!(matches!(
        events.last(),
        Some(PlaybackEvent::Stopped {
            reason: StopReason::Completed,
            ..
        })
    ));

    // Every verse ran under its own, newer generation
    let generations: Vec<u64> = events
        .iter()
        .filter(|e| matches!(e, PlaybackEvent::NowPlaying { .. }))
        .map(|e| e.generation())
        .collect();
    assert_eq!(generations[0], first);
    assert!(generations.windows(2).all(|w| w[0] < w[1]));

    h.backend_log(|log| {
        assert_eq!(log.loaded, (1..=7).map(metadata_audio).collect::<Vec<_>>());
        assert_eq!(log.max_audible, 1);
        assert_eq!(log.audible, 0);
    });

    let snapshot = h.coordinator.snapshot();
    assert_eq!(snapshot.kind, PlaybackKind::None);
    assert_eq!(snapshot.current_index, None);
}

#[tokio::test]
async fn test_failed_candidates_fall_through_within_chapter() {
    let [metadata, cdn, plain, legacy] = verse_urls(5);
    let probe = MockProbe::new()
        .failing(metadata.clone())
        .failing(cdn.clone())
        .failing(plain.clone());
    let mut h = Harness::with_defaults(probe, MockBackend::new().auto_finish());

    h.coordinator.request_chapter_sequence(1, None).await.unwrap();
    let events = h.collect_until(is_stopped).await;

    let unavailable: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::CandidateUnavailable {
                verse: v,
                candidate_index,
                ..
            } => {
                assert_eq!(*v, verse(1, 5));
                Some(*candidate_index)
            }
            _ => None,
        })
        .collect();
    assert_eq!(unavailable, vec![0, 1, 2]);

    let fifth = events
        .iter()
        .find_map(|e| match e {
            PlaybackEvent::NowPlaying {
                verse: v,
                uri,
                candidate_index,
                ..
            } if *v == verse(1, 5) => Some((uri.clone(), *candidate_index)),
            _ => None,
        })
        .expect("verse 5 played");
    assert_eq!(fifth, (legacy.clone(), 3));
    assert_eq!(now_playing(&events).last(), Some(&(1, 7)));
    assert_eq!(count_failed(&events), 0);

    // Candidates are tried strictly in order, and only as far as needed
    let mut expected = Vec::new();
    for global in 1..=7 {
        if global == 5 {
            expected.extend([metadata.clone(), cdn.clone(), plain.clone(), legacy.clone()]);
        } else {
            expected.push(verse_urls(global)[0].clone());
        }
    }
    assert_eq!(h.probe.requests(), expected);
}

#[tokio::test]
async fn test_single_verse_supersedes_chapter() {
    let mut h = Harness::with_defaults(MockProbe::new(), MockBackend::new());

    let chapter = h.coordinator.request_chapter_sequence(1, None).await.unwrap();
    h.coordinator.on_session_completed(chapter).await;
    let second = h.coordinator.current_generation();
    h.coordinator.on_session_completed(second).await;
    let third = h.coordinator.current_generation();
    assert_eq!(h.coordinator.snapshot().current_index, Some(2));
    h.drain();

    let single = h.coordinator.request_single_verse(verse(2, 12), None).await;
    assert!(single > third);

    let events = h.drain();
    assert_eq!(
        events.first(),
        Some(&PlaybackEvent::Stopped {
            generation: third,
            reason: StopReason::Superseded,
        })
    );
    assert_eq!(now_playing(&events), vec![(2, 12)]);

    h.backend_log(|log| {
        assert_eq!(log.max_audible, 1);
        assert_eq!(log.audible, 1);
        assert_eq!(log.released, 3);
        assert_eq!(log.loaded.last(), Some(&metadata_audio(19)));
    });

    let snapshot = h.coordinator.snapshot();
    assert_eq!(snapshot.kind, PlaybackKind::SingleVerse);
    assert_eq!(snapshot.chapter, None);
    assert_eq!(snapshot.current_verse, Some(verse(2, 12)));

    // The interrupted chapter stays interrupted
    h.coordinator.on_session_completed(third).await;
    h.coordinator
        .on_session_failed(third, "late error".to_string())
        .await;
    assert!(h.drain().is_empty());
    assert_eq!(h.coordinator.snapshot(), snapshot);
}

#[tokio::test]
async fn test_exhausted_resolution_reported_once() {
    let mut h = Harness::with_defaults(MockProbe::new().failing_verse(262), MockBackend::new());

    let generation = h.coordinator.request_single_verse(verse(2, 255), None).await;
    let events = h.collect_until(is_stopped).await;

    assert_eq!(events.len(), 7);
    assert!(matches!(events[0], PlaybackEvent::Resolving { .. }));
    assert_eq!(
        events[5],
        PlaybackEvent::Failed {
            generation,
            error: PlaybackError::ResolutionExhausted {
                subject: "2:255 (alafasy)".to_string(),
                attempts: 4,
            },
        }
    );
    assert_eq!(
        events[6],
        PlaybackEvent::Stopped {
            generation,
            reason: StopReason::Failed,
        }
    );
    assert_eq!(h.probe.requests(), verse_urls(262).to_vec());
    h.backend_log(|log| assert!(log.loaded.is_empty()));
    assert!(matches!(
        h.coordinator.snapshot().state,
        Some(SessionState::Failed(_))
    ));

    // Late callbacks for the failed session change nothing
    h.coordinator
        .on_session_failed(generation, "late".to_string())
        .await;
    h.coordinator.on_session_completed(generation).await;
    assert!(h.drain().is_empty());
    assert_eq!(h.probe.requests().len(), 4);
}

#[tokio::test]
async fn test_stale_callbacks_never_advance() {
    let mut h = Harness::with_defaults(MockProbe::new(), MockBackend::new());

    let chapter = h.coordinator.request_chapter_sequence(1, None).await.unwrap();
    let single = h.coordinator.request_single_verse(verse(1, 4), None).await;
    h.drain();

    h.coordinator.on_session_completed(chapter).await;
    h.coordinator
        .on_session_failed(chapter, "stream reset".to_string())
        .await;

    assert!(h.drain().is_empty());
    let snapshot = h.coordinator.snapshot();
    assert_eq!(snapshot.generation, single);
    assert_eq!(snapshot.kind, PlaybackKind::SingleVerse);
    assert_eq!(snapshot.current_index, None);
    assert_eq!(snapshot.state, Some(SessionState::Playing));
    h.backend_log(|log| assert_eq!(log.loaded.len(), 2));
}

#[tokio::test]
async fn test_stop_all_is_idempotent() {
    let mut h = Harness::with_defaults(MockProbe::new(), MockBackend::new());
    assert!(!h.coordinator.stop_all());

    let generation = h.coordinator.request_single_verse(verse(1, 1), None).await;
    h.drain();

    assert!(h.coordinator.stop_all());
    assert!(!h.coordinator.stop_all());

    assert_eq!(
        h.drain(),
        vec![PlaybackEvent::Stopped {
            generation,
            reason: StopReason::Requested,
        }]
    );
    h.backend_log(|log| {
        assert_eq!(log.released, 1);
        assert_eq!(log.audible, 0);
    });

    h.coordinator.on_session_completed(generation).await;
    assert!(h.drain().is_empty());
    assert_eq!(h.coordinator.snapshot().kind, PlaybackKind::None);
}

#[tokio::test]
async fn test_consecutive_failures_abort_chapter() {
    let probe = MockProbe::new()
        .failing_verse(2)
        .failing_verse(3)
        .failing_verse(4);
    let mut h = Harness::with_defaults(probe, MockBackend::new().auto_finish());

    h.coordinator.request_chapter_sequence(1, None).await.unwrap();
    let events = h.collect_until(is_stopped).await;

    let skipped: Vec<VerseRef> = events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::VerseFailed { verse, .. } => Some(*verse),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, vec![verse(1, 2), verse(1, 3), verse(1, 4)]);
    assert_eq!(count_failed(&events), 1);
    assert!(events.iter().any(|e| matches!(
        e,
        PlaybackEvent::Failed {
            error: PlaybackError::SequenceAborted {
                chapter: 1,
                failures: 3
            },
            ..
        }
    )));
    assert!(matches!(
        events.last(),
        Some(PlaybackEvent::Stopped {
            reason: StopReason::Failed,
            ..
        })
    ));
    assert_eq!(now_playing(&events), vec![(1, 1)]);
    assert!(!h.probe.requests().contains(&verse_urls(5)[0]));
    assert_eq!(h.coordinator.snapshot().kind, PlaybackKind::None);
}

#[tokio::test]
async fn test_failure_streak_resets_on_success() {
    let probe = MockProbe::new()
        .failing_verse(2)
        .failing_verse(3)
        .failing_verse(5)
        .failing_verse(6);
    let mut h = Harness::with_defaults(probe, MockBackend::new().auto_finish());

    h.coordinator.request_chapter_sequence(1, None).await.unwrap();
    let events = h.collect_until(is_stopped).await;

    assert_eq!(now_playing(&events), vec![(1, 1), (1, 4), (1, 7)]);
    let skipped = events
        .iter()
        .filter(|e| matches!(e, PlaybackEvent::VerseFailed { .. }))
        .count();
    assert_eq!(skipped, 4);
    assert_eq!(count_failed(&events), 0);
    assert!(matches!(
        events.last(),
        Some(PlaybackEvent::Stopped {
            reason: StopReason::Completed,
            ..
        })
    ));
}

#[tokio::test]
async fn test_failure_limit_is_configurable() {
    let options = CoordinatorOptions {
        consecutive_failure_limit: 1,
        ..Default::default()
    };
    let mut h = Harness::new(
        MockProbe::new().failing_verse(3),
        MockBackend::new().auto_finish(),
        options,
    );

    h.coordinator.request_chapter_sequence(1, None).await.unwrap();
    let events = h.collect_until(is_stopped).await;

    assert_eq!(now_playing(&events), vec![(1, 1), (1, 2)]);
    assert!(events.iter().any(|e| matches!(
        e,
        PlaybackEvent::Failed {
            error: PlaybackError::SequenceAborted { failures: 1, .. },
            ..
        }
    )));
}

#[tokio::test]
async fn test_probe_panic_becomes_failure() {
    let [metadata, ..] = verse_urls(1);
    let mut h = Harness::with_defaults(MockProbe::new().panicking(metadata), MockBackend::new());

    let generation = h.coordinator.request_single_verse(verse(1, 1), None).await;
    let events = h.collect_until(is_stopped).await;

    assert_eq!(count_failed(&events), 1);
    assert!(events.iter().any(|e| matches!(
        e,
        PlaybackEvent::Failed {
            error: PlaybackError::Internal(message),
            generation: g,
        } if message.contains("probe exploded") && *g == generation
    )));

    // The coordinator keeps working
    h.coordinator.request_single_verse(verse(1, 2), None).await;
    let events = h.drain();
    assert_eq!(now_playing(&events), vec![(1, 2)]);
}

#[tokio::test]
async fn test_backend_panic_skips_verse() {
    let backend = MockBackend::new().auto_finish().panicking(metadata_audio(2));
    let mut h = Harness::with_defaults(MockProbe::new(), backend);

    h.coordinator.request_chapter_sequence(1, None).await.unwrap();
    let events = h.collect_until(is_stopped).await;

    assert!(events.iter().any(|e| matches!(
        e,
        PlaybackEvent::VerseFailed {
            index: 1,
            error: PlaybackError::Internal(_),
            ..
        }
    )));
    assert_eq!(now_playing(&events).len(), 6);
    assert_eq!(count_failed(&events), 0);
}

#[tokio::test]
async fn test_load_error_fails_single_verse() {
    let backend = MockBackend::new().failing(metadata_audio(1));
    let mut h = Harness::with_defaults(MockProbe::new(), backend);

    h.coordinator.request_single_verse(verse(1, 1), None).await;
    let events = h.collect_until(is_stopped).await;

    assert_eq!(count_failed(&events), 1);
    assert!(events.iter().any(|e| matches!(
        e,
        PlaybackEvent::Failed {
            error: PlaybackError::LoadError { uri, .. },
            ..
        } if *uri == metadata_audio(1)
    )));
    assert!(now_playing(&events).is_empty());
}

#[tokio::test]
async fn test_stream_error_moves_chapter_on() {
    let mut h = Harness::with_defaults(MockProbe::new(), MockBackend::new());

    let generation = h.coordinator.request_chapter_sequence(1, None).await.unwrap();
    h.drain();

    h.coordinator
        .on_session_failed(generation, "stream reset".to_string())
        .await;
    let events = h.drain();

    assert!(matches!(
        &events[0],
        PlaybackEvent::VerseFailed { index: 0, error: PlaybackError::LoadError { reason, .. }, .. }
            if reason == "stream reset"
    ));
    assert_eq!(now_playing(&events), vec![(1, 2)]);
    assert_eq!(h.coordinator.snapshot().current_index, Some(1));
    h.backend_log(|log| assert_eq!(log.max_audible, 1));
}

#[tokio::test]
async fn test_pause_and_resume() {
    let mut h = Harness::with_defaults(MockProbe::new(), MockBackend::new());
    assert!(!h.coordinator.pause());

    let generation = h.coordinator.request_single_verse(verse(36, 1), None).await;
    h.drain();

    assert!(h.coordinator.pause());
    assert!(!h.coordinator.pause());
    h.backend_log(|log| assert_eq!(log.audible, 0));
    assert_eq!(
        h.coordinator.snapshot().state,
        Some(SessionState::Paused)
    );

    assert!(h.coordinator.resume());
    assert!(!h.coordinator.resume());
    h.backend_log(|log| assert_eq!(log.audible, 1));

    assert_eq!(
        h.drain(),
        vec![
            PlaybackEvent::Paused { generation },
            PlaybackEvent::Resumed { generation },
        ]
    );
}

#[tokio::test]
async fn test_whole_chapter_file_preferred() {
    let options = CoordinatorOptions {
        prefer_chapter_audio: true,
        ..Default::default()
    };
    let mut h = Harness::new(MockProbe::new(), MockBackend::new().auto_finish(), options);

    h.coordinator.request_chapter_sequence(1, None).await.unwrap();
    let events = h.collect_until(is_stopped).await;

    assert!(matches!(
        &events[1],
        PlaybackEvent::NowPlaying { whole_chapter: true, uri, candidate_index: 0, .. }
            if *uri == chapter_file_url(1)
    ));
    assert_eq!(now_playing(&events).len(), 1);
    assert!(matches!(
        events.last(),
        Some(PlaybackEvent::Stopped {
            reason: StopReason::Completed,
            ..
        })
    ));
    assert_eq!(h.probe.requests(), vec![chapter_file_url(1)]);
    h.backend_log(|log| assert_eq!(log.loaded, vec![chapter_file_url(1)]));
}

#[tokio::test]
async fn test_broken_chapter_file_ends_run_without_replay() {
    let options = CoordinatorOptions {
        prefer_chapter_audio: true,
        ..Default::default()
    };
    let mut h = Harness::new(MockProbe::new(), MockBackend::new(), options);

    let generation = h.coordinator.request_chapter_sequence(1, None).await.unwrap();
    h.drain();

    h.coordinator
        .on_session_failed(generation, "connection reset".to_string())
        .await;
    let events = h.drain();

    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[0],
        PlaybackEvent::Failed { error: PlaybackError::LoadError { uri, reason }, .. }
            if *uri == chapter_file_url(1) && reason == "connection reset"
    ));
    assert_eq!(
        events[1],
        PlaybackEvent::Stopped {
            generation,
            reason: StopReason::Failed,
        }
    );
    assert!(now_playing(&events).is_empty());
    assert_eq!(h.coordinator.snapshot().kind, PlaybackKind::None);
    h.backend_log(|log| {
        assert_eq!(log.loaded, vec![chapter_file_url(1)]);
        assert_eq!(log.audible, 0);
    });

    h.coordinator.on_session_completed(generation).await;
    assert!(h.drain().is_empty());
}

#[tokio::test]
async fn test_missing_chapter_file_falls_back_to_verses() {
    let options = CoordinatorOptions {
        prefer_chapter_audio: true,
        ..Default::default()
    };
    let mut h = Harness::new(
        MockProbe::new().failing(chapter_file_url(1)),
        MockBackend::new().auto_finish(),
        options,
    );

    h.coordinator.request_chapter_sequence(1, None).await.unwrap();
    let events = h.collect_until(is_stopped).await;

    assert!(events.iter().any(|e| matches!(
        e,
        PlaybackEvent::CandidateUnavailable { candidate_index: 0, .. }
    )));
    assert_eq!(now_playing(&events).len(), 7);
    assert!(events.iter().all(|e| !matches!(
        e,
        PlaybackEvent::NowPlaying {
            whole_chapter: true,
            ..
        }
    )));
}

#[tokio::test]
async fn test_chapter_from_verse() {
    let mut h = Harness::with_defaults(MockProbe::new(), MockBackend::new().auto_finish());

    h.coordinator.request_chapter_from(1, 5, None).await.unwrap();
    let events = h.collect_until(is_stopped).await;
    assert_eq!(now_playing(&events), vec![(1, 5), (1, 6), (1, 7)]);

    assert!(matches!(
        h.coordinator.request_chapter_sequence(115, None).await,
        Err(EngineError::Domain(_))
    ));
    assert!(h.coordinator.request_chapter_from(1, 8, None).await.is_err());
}

#[tokio::test]
async fn test_unknown_narrator_uses_default() {
    let mut h = Harness::with_defaults(MockProbe::new(), MockBackend::new());

    h.coordinator
        .request_single_verse(verse(1, 1), Some("nobody"))
        .await;
    h.coordinator
        .request_single_verse(verse(1, 1), Some("husary"))
        .await;
    let events = h.drain();

    assert_eq!(count_failed(&events), 0);
    let requests = h.probe.requests();
    assert_eq!(requests[0], verse_urls(1)[0]);
    assert!(requests[1].ends_with("/ayah/1/ar.husary"));
}

#[tokio::test]
async fn test_signal_loop_starts_once() {
    let h = Harness::with_defaults(MockProbe::new(), MockBackend::new());
    assert!(matches!(
        h.coordinator.spawn_signal_loop(),
        Err(EngineError::InvalidState(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_slow_load_times_out() {
    let options = CoordinatorOptions {
        load_timeout: Duration::from_secs(15),
        ..Default::default()
    };
    let backend = MockBackend::new().delayed(metadata_audio(1), Duration::from_secs(60));
    let mut h = Harness::new(MockProbe::new(), backend, options);

    h.coordinator.request_single_verse(verse(1, 1), None).await;
    let events = h.collect_until(is_stopped).await;

    assert!(events.iter().any(|e| matches!(
        e,
        PlaybackEvent::Failed {
            error: PlaybackError::LoadError { reason, .. },
            ..
        } if reason.contains("timed out")
    )));
}

#[tokio::test(start_paused = true)]
async fn test_audio_loaded_for_superseded_request_is_discarded() {
    let backend = MockBackend::new().delayed(metadata_audio(1), Duration::from_secs(5));
    let mut h = Harness::with_defaults(MockProbe::new(), backend);

    let coordinator = h.coordinator.clone();
    let slow = tokio::spawn(async move { coordinator.request_single_verse(verse(1, 1), None).await });

    // Let the first request reach the backend
    tokio::time::sleep(Duration::from_millis(1)).await;
    let fast = h.coordinator.request_single_verse(verse(1, 2), None).await;
    let slow = slow.await.unwrap();
    assert!(slow < fast);

    let events = h.drain();
    assert_eq!(now_playing(&events), vec![(1, 2)]);
    assert!(events.contains(&PlaybackEvent::Stopped {
        generation: slow,
        reason: StopReason::Superseded,
    }));
    assert_eq!(count_failed(&events), 0);

    h.backend_log(|log| {
        assert_eq!(log.max_audible, 1);
        assert_eq!(log.audible, 1);
        assert_eq!(log.released, 1);
    });
    assert_eq!(h.coordinator.snapshot().current_verse, Some(verse(1, 2)));
}

#[tokio::test]
async fn test_scroll_follows_chapter_playback() {
    let mut h = Harness::with_defaults(MockProbe::new(), MockBackend::new().auto_finish());
    let mut scroll = ScrollSyncController::for_chapter(1, ScrollOptions::default()).unwrap();
    for v in 1..=7u16 {
        scroll.record_position(v, f64::from(v) * 100.0);
    }

    h.coordinator.request_chapter_sequence(1, None).await.unwrap();
    let events = h.collect_until(is_stopped).await;

    let commands: Vec<_> = events.iter().filter_map(|e| scroll.follow(e)).collect();
    assert_eq!(commands.len(), 7);
    assert!(commands.iter().all(|c| c.exact));
    assert_eq!(commands.last().map(|c| c.offset), Some(700.0));
    assert_eq!(scroll.highlighted(), Some(7));
}
