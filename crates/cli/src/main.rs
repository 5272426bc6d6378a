// FILE: crates/cli/src/main.rs

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;
use tilawa_config::ConfigManager;

mod commands;
#[cfg_attr(feature = "audio", allow(dead_code))]
mod preview;

fn narrator_arg() -> Arg {
    Arg::new("narrator")
        .short('n')
        .long("narrator")
        .value_name("ID")
        .help("Narrator id (defaults to the configured narrator)")
}

fn chapter_arg() -> Arg {
    Arg::new("chapter")
        .required(true)
        .value_name("CHAPTER")
        .help("Chapter number (1-114)")
        .value_parser(value_parser!(u16))
}

fn verse_arg() -> Arg {
    Arg::new("verse")
        .required(true)
        .value_name("VERSE")
        .help("Verse number within the chapter")
        .value_parser(value_parser!(u16))
}

fn build_cli() -> Command {
    Command::new("tilawa")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Sequential Quran recitation player")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("DIR")
                .help("Configuration directory (defaults to the platform config dir)")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(Command::new("narrators").about("List available narrators"))
        .subcommand(
            Command::new("candidates")
                .about("Show the audio candidates for a verse, in the order they are tried")
                .arg(chapter_arg())
                .arg(verse_arg())
                .arg(narrator_arg()),
        )
        .subcommand(
            Command::new("resolve")
                .about("Resolve a playable audio URL for a verse")
                .arg(chapter_arg())
                .arg(verse_arg())
                .arg(narrator_arg()),
        )
        .subcommand(
            Command::new("play")
                .about("Play a single verse")
                .arg(chapter_arg())
                .arg(verse_arg())
                .arg(narrator_arg()),
        )
        .subcommand(
            Command::new("play-chapter")
                .about("Play a chapter verse by verse")
                .arg(chapter_arg())
                .arg(
                    Arg::new("from")
                        .short('f')
                        .long("from")
                        .value_name("VERSE")
                        .help("Verse to start from")
                        .default_value("1")
                        .value_parser(value_parser!(u16)),
                )
                .arg(narrator_arg()),
        )
        .subcommand(
            Command::new("config")
                .about("Show the effective configuration")
                .arg(
                    Arg::new("init")
                        .long("init")
                        .help("Write a default config file if none exists")
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn config_manager(dir: Option<&PathBuf>) -> Result<ConfigManager> {
    match dir {
        Some(dir) => Ok(ConfigManager::with_directory(dir)),
        None => ConfigManager::new().context("Failed to locate configuration directory"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    let manager = config_manager(matches.get_one::<PathBuf>("config"))?;
    let config = manager
        .load_with_env_overrides()
        .context("Failed to load configuration")?;

    let default_filter = config.app.log_level.to_string();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match matches.subcommand() {
        Some(("narrators", _)) => commands::list_narrators(&config),
        Some(("candidates", sub_matches)) => commands::show_candidates(&config, sub_matches),
        Some(("resolve", sub_matches)) => commands::resolve(&config, sub_matches).await,
        Some(("play", sub_matches)) => commands::play_verse(&config, sub_matches).await,
        Some(("play-chapter", sub_matches)) => commands::play_chapter(&config, sub_matches).await,
        Some(("config", sub_matches)) => {
            commands::show_config(&manager, &config, sub_matches.get_flag("init"))
        }
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}
