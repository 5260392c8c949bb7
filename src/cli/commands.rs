//! Command definitions for the prayer companion CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// ============================================================================
// CLI Structure
// ============================================================================

/// Prayer times companion - reminders and adhan playback
#[derive(Parser, Debug)]
#[command(
    name = "muezzin",
    version,
    about = "Prayer reminders and adhan playback for the desktop",
    long_about = "Watches the day's prayer times and fires desktop reminders\n\
                  and adhan audio at the right moments. Runs as a foreground\n\
                  service or answers one-shot queries.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the reminder and adhan service in the foreground
    Run(RunArgs),

    /// Show the next upcoming prayer
    Next(TimesArgs),

    /// Show the current prayer period
    Current(TimesArgs),

    /// Play a short adhan sample to check the audio setup
    TestAdhan(TestAdhanArgs),

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Command Arguments
// ============================================================================

/// Arguments for the run command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to the prayer times JSON file
    #[arg(short, long)]
    pub times: PathBuf,

    /// Path to the settings file (defaults to the platform config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the adhan audio files
    #[arg(long)]
    pub audio_dir: Option<PathBuf>,
}

/// Arguments for the one-shot schedule queries
#[derive(Args, Debug, Clone)]
pub struct TimesArgs {
    /// Path to the prayer times JSON file
    #[arg(short, long)]
    pub times: PathBuf,
}

/// Arguments for the test-adhan command
#[derive(Args, Debug, Clone)]
pub struct TestAdhanArgs {
    /// Playback volume (0-100), overrides the configured volume
    #[arg(
        long,
        value_parser = clap::value_parser!(u8).range(0..=100)
    )]
    pub volume: Option<u8>,

    /// Directory holding the adhan audio files
    #[arg(long)]
    pub audio_dir: Option<PathBuf>,

    /// Path to the settings file (defaults to the platform config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

// ============================================================================
// Tests
// ============================================================================
