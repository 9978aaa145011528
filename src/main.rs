//! # Journey - DJ Set Planner
//!
//! Plans tempo-, key- and energy-aware DJ sets from an analysed track
//! catalog.
//!
//! ## Usage
//!
//! ```bash
//! # Load analysed tracks into the catalog
//! journey import catalog.json --force
//!
//! # Plan a 90 minute set around 8A
//! journey generate 90 --key 8A -o set.json --m3u
//!
//! # Browse
//! journey list --bpm 122 --energy 4
//! ```
//!
//! `RUST_LOG=debug journey generate 60` shows every narrowing step;
//! `RUST_LOG=journey::planner=trace` adds per-candidate scores.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use journey::cli::{self, Command};
use journey::config::{PlannerDefaults, RuntimeConfig};
use journey::journey::{ArcParams, PlanStatus, Playlist};
use journey::library::TrackLibrary;
use journey::planner::{self, JourneyPlanner, PlanOptions};
use journey::track::{CamelotKey, Texture};
use journey::{completion, db};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    let config = match &args.config {
        Some(path) => RuntimeConfig::load_from(path)?,
        None => RuntimeConfig::load()?,
    };
    debug!("Using catalog database {}", config.db_path.display());
    debug!("Planner defaults: {}", defaults_summary(&config.planner));

    match args.command {
        Command::Import { catalog, force } => import(&config, &catalog, force)?,
        Command::Export { output } => {
            let library = load_library(args.library.as_deref(), &config)?;
            library
                .save_json(&output)
                .with_context(|| format!("Failed to export catalog to {}", output.display()))?;
            println!("Exported {} tracks to {}", library.len(), output.display());
        }
        Command::Stats => {
            let library = load_library(args.library.as_deref(), &config)?;
            print_stats(&library);
        }
        Command::List {
            bpm,
            key,
            energy,
            texture,
            label,
            limit,
        } => {
            let library = load_library(args.library.as_deref(), &config)?;
            let filter = ListFilter {
                bpm,
                key,
                energy,
                texture,
                label,
            };
            list_tracks(&library, &filter, limit);
        }
        Command::Generate {
            minutes,
            key,
            min_bpm,
            max_bpm,
            progression,
            blend,
            strict_key,
            no_label_preference,
            seed,
            alternatives,
            output,
            m3u,
            playback,
        } => {
            let defaults = &config.planner;
            let request = GenerateRequest {
                params: ArcParams {
                    duration_minutes: minutes,
                    key_center: key,
                    bpm_range: (
                        min_bpm.unwrap_or(defaults.min_bpm),
                        max_bpm.unwrap_or(defaults.max_bpm),
                    ),
                    progression: progression.unwrap_or(defaults.progression),
                    blend_duration: blend.unwrap_or(defaults.blend_duration),
                },
                options: PlanOptions {
                    strict_key: strict_key || defaults.strict_key,
                    prefer_labels: !no_label_preference && defaults.prefer_labels,
                },
                seed: seed.or(defaults.seed),
                alternatives: alternatives.unwrap_or(defaults.alternatives).max(1),
            };
            let library = load_library(args.library.as_deref(), &config)?;
            let output = output.unwrap_or_else(|| default_output(minutes));
            generate(&library, &request, &output, m3u, playback)?;
        }
        Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(shell), &mut cmd);
        }
        Command::CompletionEnhanced => {
            print!("{}", completion::enhanced_bash_completion());
        }
        Command::CompleteKeys => {
            completion::print_key_completions(&mut io::stdout().lock())?;
        }
    }

    Ok(())
}

fn import(config: &RuntimeConfig, catalog: &Path, force: bool) -> Result<()> {
    info!("Importing catalog from: {}", catalog.display());
    let library = TrackLibrary::load_json(catalog)
        .with_context(|| format!("Failed to load catalog {}", catalog.display()))?;

    let mut conn = db::connect(&config.db_path)?;
    let existing = db::track_count(&conn)?;
    if existing > 0 && !force {
        info!("Appending to {existing} existing tracks; use --force to replace");
    }
    let stored = db::save_library(&mut conn, &library, force)
        .context("Failed to store tracks in the catalog database")?;

    println!(
        "Imported {stored} tracks into {} ({} total)",
        config.db_path.display(),
        db::track_count(&conn)?
    );
    Ok(())
}

fn load_library(json: Option<&Path>, config: &RuntimeConfig) -> Result<TrackLibrary> {
    let library = match json {
        Some(path) => TrackLibrary::load_json(path)
            .with_context(|| format!("Failed to load catalog {}", path.display()))?,
        None => db::load_library_from(&config.db_path).context("Failed to load catalog database")?,
    };
    if library.is_empty() {
        warn!("Catalog is empty");
    }
    Ok(library)
}

fn print_stats(library: &TrackLibrary) {
    let stats = library.stats();
    println!("Tracks:           {}", stats.total_tracks);
    if let (Some((lo, hi)), Some(avg)) = (stats.bpm_range, stats.bpm_average) {
        println!("BPM:              {lo:.1} - {hi:.1} (avg {avg:.1})");
    }
    if let (Some((lo, hi)), Some(avg)) = (stats.energy_range, stats.energy_average) {
        println!("Energy:           {lo} - {hi} (avg {avg:.1})");
    }
    println!("Keys represented: {}", stats.keys_represented);
    println!("Labels:           {}", stats.labels);
}

struct ListFilter {
    bpm: Option<f64>,
    key: Option<CamelotKey>,
    energy: Option<u8>,
    texture: Option<Texture>,
    label: Option<String>,
}

fn list_tracks(library: &TrackLibrary, filter: &ListFilter, limit: usize) {
    let mut tracks: Vec<_> = match filter.key {
        Some(key) => library.find_by_key(key),
        None => library.iter().cloned().collect(),
    };
    if let Some(bpm) = filter.bpm {
        tracks.retain(|t| (t.bpm - bpm).abs() <= 2.0);
    }
    if let Some(energy) = filter.energy {
        tracks.retain(|t| t.energy_level.abs_diff(energy) <= 1);
    }
    if let Some(texture) = filter.texture {
        tracks.retain(|t| t.has_texture(texture));
    }
    if let Some(label) = &filter.label {
        let needle = label.to_lowercase();
        tracks.retain(|t| {
            t.label
                .as_deref()
                .is_some_and(|l| l.to_lowercase().contains(&needle))
        });
    }

    println!("{} matching tracks", tracks.len());
    for track in tracks.iter().take(limit) {
        println!(
            "{:>6.1}  {:>3}  E{:<2}  {}",
            track.bpm,
            track.key.map_or_else(|| "-".to_string(), |k| k.code()),
            track.energy_level,
            track.display_name()
        );
    }
    if tracks.len() > limit {
        println!("... {} more", tracks.len() - limit);
    }
}

struct GenerateRequest {
    params: ArcParams,
    options: PlanOptions,
    seed: Option<u64>,
    alternatives: usize,
}

fn generate(
    library: &TrackLibrary,
    request: &GenerateRequest,
    output: &Path,
    m3u: bool,
    playback: bool,
) -> Result<()> {
    let base_seed = request.seed.unwrap_or_else(rand::random);
    info!("Planning with seed {base_seed}");

    let mut planner = JourneyPlanner::new(library, StdRng::seed_from_u64(base_seed));
    let arc = planner
        .create_journey_arc(&request.params)
        .context("Invalid journey parameters")?;

    let playlist = if request.alternatives > 1 {
        let seeds: Vec<u64> = (0..request.alternatives as u64)
            .map(|i| base_seed.wrapping_add(i))
            .collect();
        let alternatives = planner::plan_alternatives(library, &arc, request.options, &seeds)
            .context("Failed to plan journey")?;
        let best = planner::best_plan(&alternatives)
            .context("No alternative produced a plan")?;
        info!("Kept plan from seed {} of {}", best.seed, alternatives.len());
        best.playlist.clone()
    } else {
        planner
            .generate_playlist(&arc, request.options)
            .context("Failed to plan journey")?
    };

    playlist
        .save_json(output)
        .with_context(|| format!("Failed to write playlist {}", output.display()))?;

    if m3u {
        let path = output.with_extension("m3u");
        std::fs::write(&path, playlist.to_annotated_m3u())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("M3U:      {}", path.display());
    }
    if playback {
        let path = output.with_extension("playback.json");
        let json = serde_json::to_string_pretty(&playlist.playback_sequence())?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Playback: {}", path.display());
    }

    print_summary(&playlist, output);
    Ok(())
}

fn print_summary(playlist: &Playlist, output: &Path) {
    println!("{}", playlist.name);
    println!("{}", playlist.journey_arc.description);
    for (i, track) in playlist.tracks.iter().enumerate() {
        println!(
            "{:>3}. [{:>5.1} BPM  E{:<2}  {:>3}] {}",
            i + 1,
            track.bpm,
            track.energy_level,
            track.key.map_or_else(|| "-".to_string(), |k| k.code()),
            track.display_name()
        );
    }

    if let PlanStatus::Truncated {
        requested,
        achieved,
    } = playlist.status
    {
        eprintln!(
            "Warning: only {achieved} of {requested} tracks fit; widen the BPM range or add tracks"
        );
    }
    println!(
        "Total: {:.1} minutes, {} transitions -> {}",
        playlist.total_duration / 60.0,
        playlist.transitions.len(),
        output.display()
    );
}

fn default_output(minutes: u32) -> PathBuf {
    PathBuf::from(format!("journey-{minutes}min.json"))
}

fn defaults_summary(defaults: &PlannerDefaults) -> String {
    format!(
        "{}-{} BPM, {}s blends, {}",
        defaults.min_bpm, defaults.max_bpm, defaults.blend_duration, defaults.progression
    )
}
