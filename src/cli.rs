//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `journey` binary.
//!
//! ## Commands
//!
//! - `import`: Load a JSON catalog into the SQLite catalog
//! - `export`: Write the SQLite catalog back out as JSON
//! - `stats`: Summarise the catalog
//! - `list`: Filter and print tracks
//! - `generate`: Plan a set and write the playlist
//! - `completion`: Print a shell completion script
//!
//! ## Examples
//!
//! ```bash
//! journey import ~/Music/analysis/catalog.json
//! journey generate 90 --key 8A --progression peak_and_descent --seed 7
//! journey --library catalog.json list --bpm 122 --energy 4
//! ```

use crate::energy::Progression;
use crate::track::{CamelotKey, Texture};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser, Debug)]
#[command(name = "journey")]
#[command(about = "Journey: offline DJ set planning - tempo, key and energy aware playlists")]
#[command(version)]
pub struct Args {
    /// Read tracks from a JSON catalog instead of the SQLite catalog
    #[arg(long, global = true, env = "JOURNEY_LIBRARY", value_hint = clap::ValueHint::FilePath)]
    pub library: Option<PathBuf>,

    /// Read planner defaults from this file instead of the standard location
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import a JSON catalog into the SQLite catalog
    ///
    /// Every record is validated first; one bad track rejects the file.
    Import {
        /// Catalog file: {"version": "...", "tracks": [...]}
        #[arg(value_hint = clap::ValueHint::FilePath)]
        catalog: PathBuf,

        /// Replace the existing catalog instead of appending to it
        #[arg(long)]
        force: bool,
    },

    /// Export the catalog as JSON
    Export {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        output: PathBuf,
    },

    /// Show catalog statistics
    Stats,

    /// List tracks, optionally filtered
    List {
        /// Tempo to match, within 2 BPM
        #[arg(long)]
        bpm: Option<f64>,

        /// Camelot key, e.g. 8A
        #[arg(short, long, value_parser = parse_key)]
        key: Option<CamelotKey>,

        /// Energy level to match, within one level
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=10))]
        energy: Option<u8>,

        #[arg(short, long, value_parser = parse_texture)]
        texture: Option<Texture>,

        /// Label name, case-insensitive substring
        #[arg(long)]
        label: Option<String>,

        /// Maximum number of tracks to print
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },

    /// Plan a DJ set
    ///
    /// Picks an opener near the start of the energy curve, then follows the
    /// curve with tempo- and key-compatible tracks. Unset options fall back
    /// to the config file, then to built-in defaults.
    Generate {
        /// Target length in minutes
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        minutes: u32,

        /// Key center, e.g. 8A
        #[arg(short, long, value_parser = parse_key)]
        key: Option<CamelotKey>,

        #[arg(long)]
        min_bpm: Option<f64>,

        #[arg(long)]
        max_bpm: Option<f64>,

        /// gradual_build, peak_and_descent or steady; anything else is flat
        #[arg(short, long, value_parser = parse_progression)]
        progression: Option<Progression>,

        /// Blend length in seconds
        #[arg(short, long)]
        blend: Option<u32>,

        /// Only accept harmonically compatible keys
        #[arg(long)]
        strict_key: bool,

        /// Do not favour the preferred labels
        #[arg(long)]
        no_label_preference: bool,

        /// Seed for reproducible plans
        #[arg(long)]
        seed: Option<u64>,

        /// Plan this many alternatives in parallel and keep the best
        #[arg(long)]
        alternatives: Option<usize>,

        /// Playlist JSON output path
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,

        /// Also write an annotated M3U next to the JSON
        #[arg(long)]
        m3u: bool,

        /// Also write the sequential playback export next to the JSON
        #[arg(long)]
        playback: bool,
    },

    /// Generate shell completions
    ///
    /// Usage: journey completion bash > ~/.local/share/bash-completion/completions/journey
    Completion {
        shell: Shell,
    },

    /// Bash completion that also completes Camelot keys and progressions
    CompletionEnhanced,

    /// List Camelot key codes for completion (hidden command)
    #[command(hide = true)]
    CompleteKeys,
}

fn parse_key(s: &str) -> Result<CamelotKey, String> {
    s.parse().map_err(|e: crate::error::JourneyError| e.to_string())
}

fn parse_texture(s: &str) -> Result<Texture, String> {
    s.parse().map_err(|e: crate::error::JourneyError| e.to_string())
}

fn parse_progression(s: &str) -> Result<Progression, String> {
    s.parse().map_err(|e: std::convert::Infallible| match e {})
}
