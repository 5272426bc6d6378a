// FILE: crates/cli/src/commands.rs

use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use console::style;
use media_engine::{
    AudioBackend, AudioSourceResolver, CoordinatorOptions, PlaybackCoordinator, PlaybackEvent,
    ResolverOptions, ScrollOptions, ScrollSyncController, StopReason,
};
use std::sync::Arc;
use std::time::Duration;
use tilawa_config::{Config, ConfigManager};
use tilawa_core::{Language, Narrator, NarratorCatalog, VerseRef};
use tilawa_network::{Client, ClientConfig};
use tokio::sync::broadcast::{self, error::RecvError};

/// Simulated length of each verse when no audio device is used
#[cfg(not(feature = "audio"))]
const PREVIEW_DURATION: Duration = Duration::from_secs(2);

pub fn resolver_options(config: &Config) -> ResolverOptions {
    ResolverOptions {
        metadata_endpoint: config.sources.metadata_endpoint.clone(),
        cdn_base: config.sources.cdn_base.clone(),
        legacy_cdn_base: config.sources.legacy_cdn_base.clone(),
        bitrate: config.sources.bitrate,
        attempt_timeout: Duration::from_millis(config.sources.attempt_timeout_ms),
    }
}

pub fn coordinator_options(config: &Config) -> CoordinatorOptions {
    CoordinatorOptions {
        consecutive_failure_limit: config.playback.consecutive_failure_limit,
        load_timeout: Duration::from_millis(config.playback.load_timeout_ms),
        prefer_chapter_audio: config.playback.prefer_chapter_audio,
        ..CoordinatorOptions::default()
    }
}

pub fn scroll_options(config: &Config) -> ScrollOptions {
    ScrollOptions {
        highlight: Duration::from_millis(config.scroll.highlight_ms),
        content_height_estimate: config.scroll.content_height_estimate,
    }
}

fn http_client(config: &Config) -> Result<Client> {
    let client_config = ClientConfig {
        user_agent: config.sources.user_agent.clone(),
        ..ClientConfig::default()
    };
    Client::with_config(client_config).context("Failed to create HTTP client")
}

#[cfg(feature = "audio")]
fn audio_backend(client: Client) -> Arc<dyn AudioBackend> {
    Arc::new(media_engine::device::DeviceBackend::new(client))
}

#[cfg(not(feature = "audio"))]
fn audio_backend(client: Client) -> Arc<dyn AudioBackend> {
    Arc::new(crate::preview::PreviewBackend::new(client, PREVIEW_DURATION))
}

fn build_coordinator(config: &Config) -> Result<PlaybackCoordinator> {
    let client = http_client(config)?;
    let resolver = AudioSourceResolver::with_client(client.clone(), resolver_options(config));
    Ok(PlaybackCoordinator::new(
        NarratorCatalog::new(),
        resolver,
        audio_backend(client),
        coordinator_options(config),
    ))
}

/// Narrator requested on the command line, else the configured default
fn narrator_id(config: &Config, matches: &ArgMatches) -> String {
    matches
        .get_one::<String>("narrator")
        .cloned()
        .unwrap_or_else(|| config.playback.default_narrator.clone())
}

fn narrator(config: &Config, matches: &ArgMatches) -> Narrator {
    let (narrator, notice) = NarratorCatalog::new().resolve(Some(&narrator_id(config, matches)));
    if let Some(notice) = notice {
        eprintln!("{} {}", style("!").yellow().bold(), notice.user_message());
    }
    narrator
}

fn verse_from(matches: &ArgMatches) -> Result<VerseRef> {
    let chapter = *matches
        .get_one::<u16>("chapter")
        .ok_or_else(|| anyhow!("Chapter is required"))?;
    let verse = *matches
        .get_one::<u16>("verse")
        .ok_or_else(|| anyhow!("Verse is required"))?;
    VerseRef::new(chapter, verse).context("Invalid verse reference")
}

/// List all narrators
pub fn list_narrators(config: &Config) -> Result<()> {
    let catalog = NarratorCatalog::new();

    println!("\n{} Narrators", style(catalog.list().len()).bold().cyan());
    println!("{}", "=".repeat(60));

    for narrator in catalog.list() {
        let marker = if narrator.id == config.playback.default_narrator {
            style("*").green().bold().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "{} {:<22} {:<42} {}{}",
            marker,
            narrator.id,
            narrator.display_name,
            language_label(narrator.language),
            if narrator.chapter_audio { ", chapter audio" } else { "" }
        );
    }

    Ok(())
}

fn language_label(language: Language) -> &'static str {
    match language {
        Language::Arabic => "Arabic",
        Language::English => "English",
    }
}

/// Print the candidate list for a verse without touching the network
pub fn show_candidates(config: &Config, matches: &ArgMatches) -> Result<()> {
    let verse = verse_from(matches)?;
    let narrator = narrator(config, matches);
    let options = resolver_options(config);

    println!(
        "\nCandidates for {} (global {}) by {}",
        style(verse).bold(),
        verse.global(),
        narrator.display_name
    );
    for (index, candidate) in media_engine::candidates_for_verse(&options, &narrator, verse)
        .iter()
        .enumerate()
    {
        println!("  {}. {}", index + 1, candidate);
    }

    if narrator.chapter_audio {
        let chapter = media_engine::candidates_for_chapter(&options, &narrator, verse.chapter())
            .context("Failed to build chapter candidates")?;
        if let Some(file) = chapter.first().filter(|c| c.is_chapter_file()) {
            println!("  chapter file: {}", file.url());
        }
    }

    Ok(())
}

/// Resolve a playable URL for a verse
pub async fn resolve(config: &Config, matches: &ArgMatches) -> Result<()> {
    let verse = verse_from(matches)?;
    let narrator = narrator(config, matches);
    let resolver = AudioSourceResolver::with_client(http_client(config)?, resolver_options(config));

    match resolver.resolve_verse(&narrator, verse).await {
        Ok(resolution) => {
            for failure in &resolution.failures {
                println!(
                    "  {} {} ({})",
                    style("✗").red(),
                    failure.candidate,
                    failure.reason
                );
            }
            println!(
                "  {} {} [candidate {}]",
                style("✓").green().bold(),
                resolution.uri,
                resolution.candidate_index + 1
            );
            Ok(())
        }
        Err(failed) => {
            for failure in &failed.failures {
                println!(
                    "  {} {} ({})",
                    style("✗").red(),
                    failure.candidate,
                    failure.reason
                );
            }
            Err(anyhow!(failed.to_error().user_message()))
        }
    }
}

/// Play one verse until it ends, fails or Ctrl-C
pub async fn play_verse(config: &Config, matches: &ArgMatches) -> Result<()> {
    let verse = verse_from(matches)?;
    let narrator = narrator_id(config, matches);
    let coordinator = build_coordinator(config)?;
    let events = coordinator.subscribe();
    let signals = coordinator
        .spawn_signal_loop()
        .context("Failed to start playback signal loop")?;

    let requester = coordinator.clone();
    tokio::spawn(async move {
        requester.request_single_verse(verse, Some(&narrator)).await;
    });

    let outcome = watch(&coordinator, events, None).await;
    signals.abort();
    outcome
}

/// Play a chapter verse by verse until it ends, aborts or Ctrl-C
pub async fn play_chapter(config: &Config, matches: &ArgMatches) -> Result<()> {
    let chapter = *matches
        .get_one::<u16>("chapter")
        .ok_or_else(|| anyhow!("Chapter is required"))?;
    let from = matches.get_one::<u16>("from").copied().unwrap_or(1);
    let start = VerseRef::new(chapter, from).context("Invalid starting verse")?;
    let narrator = narrator_id(config, matches);

    let coordinator = build_coordinator(config)?;
    let scroll = ScrollSyncController::for_chapter(chapter, scroll_options(config))
        .context("Invalid chapter")?;
    let events = coordinator.subscribe();
    let signals = coordinator
        .spawn_signal_loop()
        .context("Failed to start playback signal loop")?;

    coordinator
        .request_chapter_from(start.chapter(), start.verse(), Some(&narrator))
        .await
        .context("Failed to start chapter playback")?;

    let outcome = watch(&coordinator, events, Some(scroll)).await;
    signals.abort();
    outcome
}

/// Prints events until the run stops; Ctrl-C stops playback
async fn watch(
    coordinator: &PlaybackCoordinator,
    mut events: broadcast::Receiver<PlaybackEvent>,
    mut scroll: Option<ScrollSyncController>,
) -> Result<()> {
    let mut failure = None;

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    if let Some(line) = describe_event(&event) {
                        println!("{}", line);
                    }
                    if let Some(command) = scroll.as_mut().and_then(|s| s.follow(&event)) {
                        log::debug!(
                            "Scroll to verse {} at {:.0}{}",
                            command.verse,
                            command.offset,
                            if command.exact { "" } else { " (estimated)" }
                        );
                    }
                    if let PlaybackEvent::Failed { error, .. } = &event {
                        failure = Some(error.user_message());
                    }
                    if event.is_terminal() {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => log::warn!("Missed {} playback events", missed),
                Err(RecvError::Closed) => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                coordinator.stop_all();
                println!("\n{}", style("Stopped").yellow());
                return Ok(());
            }
        }
    }

    match failure {
        Some(message) => Err(anyhow!(message)),
        None => Ok(()),
    }
}

/// One line for an event, or `None` for events not worth printing
pub fn describe_event(event: &PlaybackEvent) -> Option<String> {
    match event {
        PlaybackEvent::Resolving { verse, .. } => Some(format!("  … {}", verse)),
        PlaybackEvent::CandidateUnavailable {
            candidate_index,
            reason,
            ..
        } => Some(format!(
            "    {} candidate {} unavailable: {}",
            style("✗").red(),
            candidate_index + 1,
            reason
        )),
        PlaybackEvent::NowPlaying {
            verse,
            uri,
            whole_chapter,
            ..
        } => Some(format!(
            "{} {}{}  {}",
            style("▶").green().bold(),
            style(verse).bold(),
            if *whole_chapter { " (whole chapter)" } else { "" },
            style(uri).dim()
        )),
        PlaybackEvent::Paused { .. } => Some(style("  paused").yellow().to_string()),
        PlaybackEvent::Resumed { .. } => Some(style("  resumed").green().to_string()),
        PlaybackEvent::VerseFailed { verse, error, .. } => Some(format!(
            "  {} skipped {}: {}",
            style("!").yellow().bold(),
            verse,
            error
        )),
        PlaybackEvent::Failed { error, .. } => Some(format!(
            "{} {}",
            style("✗").red().bold(),
            error.user_message()
        )),
        PlaybackEvent::Stopped {
            reason: StopReason::Completed,
            ..
        } => Some(style("Done").green().to_string()),
        PlaybackEvent::Stopped { .. } => None,
    }
}

/// Show the effective configuration, optionally writing a default file
pub fn show_config(manager: &ConfigManager, config: &Config, init: bool) -> Result<()> {
    if init {
        if manager.initialize().context("Failed to write default config")? {
            println!("{} Created {}", style("✓").green().bold(), manager.config_path().display());
        } else {
            println!("Config already exists at {}", manager.config_path().display());
        }
    }

    println!("# {}", manager.config_path().display());
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("{}", rendered);
    Ok(())
}
