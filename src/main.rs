//! Prayer times companion - reminders and adhan playback for the desktop
//!
//! The companion watches the day's prayer times and:
//! - fires a desktop reminder a configurable number of minutes ahead
//! - plays the adhan (and optionally a closing invocation) at prayer time
//! - answers one-shot queries about the next and current prayer

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use chrono::Local;

pub mod audio;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod notify;
pub mod planner;
pub mod provider;
pub mod types;

use audio::{
    default_track_dir, AudioPlaybackController, PlaybackSettings, PlaybackState, RodioBackend,
};
use cli::{Cli, Commands, Display, RunArgs, TestAdhanArgs, TimesArgs};
use config::ConfigStore;
use daemon::PrayerService;
use notify::DesktopGateway;
use provider::{FileTimesProvider, TimesProvider};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging
    init_tracing();

    // Parse command line arguments
    let cli = Cli::parse();

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&e.to_string());
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    // Set verbose logging if requested
    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    match cli.command {
        Some(Commands::Run(args)) => run_service(args).await,
        Some(Commands::Next(args)) => {
            show_next(&args)?;
            Ok(())
        }
        Some(Commands::Current(args)) => {
            show_current(&args)?;
            Ok(())
        }
        Some(Commands::TestAdhan(args)) => test_adhan(args).await,
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
            Ok(())
        }
        None => {
            // No command provided, show help
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

/// Runs the reminder and adhan service until Ctrl+C.
async fn run_service(args: RunArgs) -> Result<()> {
    let store = match args.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::default_location(),
    };
    let config = store.load();

    let backend = RodioBackend::new().context("Could not open an audio output device")?;
    let gateway = DesktopGateway::new();
    let provider = FileTimesProvider::new(args.times);
    let track_dir = args.audio_dir.unwrap_or_else(default_track_dir);

    let mut service = PrayerService::new(backend, gateway, provider, config, track_dir);
    let handle = service.handle();

    // First Ctrl+C silences any playing adhan, second one exits.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.stop_adhan();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.shutdown();
        }
    });

    service.run().await
}

/// Prints the next upcoming prayer.
fn show_next(args: &TimesArgs) -> Result<()> {
    let now = Local::now().naive_local();
    let provider = FileTimesProvider::new(args.times.clone());
    let schedule = provider.times_for(now.date())?;

    Display::show_next(&schedule.next_prayer(now), now);
    Ok(())
}

/// Prints the prayer period the clock currently falls in.
fn show_current(args: &TimesArgs) -> Result<()> {
    let now = Local::now().naive_local();
    let provider = FileTimesProvider::new(args.times.clone());
    let schedule = provider.times_for(now.date())?;

    Display::show_current(schedule.current_prayer(now));
    Ok(())
}

/// Plays the configured adhan once so the user can check their setup.
async fn test_adhan(args: TestAdhanArgs) -> Result<()> {
    let store = match args.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::default_location(),
    };
    let config = store.load();

    let track_dir = args.audio_dir.unwrap_or_else(default_track_dir);
    let mut settings = PlaybackSettings::from_config(&config, track_dir);
    if let Some(volume) = args.volume {
        settings.volume = volume;
    }

    let reciter = settings
        .reciter
        .context("No reciter selected; set one in the settings file first")?;
    Display::show_test_playing(reciter.display_name(), settings.volume);

    let backend = RodioBackend::new().context("Could not open an audio output device")?;
    let (notice_tx, mut notice_rx) = tokio::sync::mpsc::unbounded_channel();
    let controller = AudioPlaybackController::new(backend, settings, notice_tx);

    controller.play();
    if let Ok(notice) = notice_rx.try_recv() {
        let audio::AudioNotice::PlaybackFailed { message } = notice;
        anyhow::bail!("Adhan playback failed: {}", message);
    }

    // Wait for the track to finish, or for Ctrl+C.
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                controller.stop();
                break;
            }
            _ = tokio::time::sleep(std::time::Duration::from_millis(250)) => {
                if controller.state() == PlaybackState::Idle {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
