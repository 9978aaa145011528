//! # Journey Model
//!
//! The planning template ([`JourneyArc`]), the joins between adjacent tracks
//! ([`Transition`]) and the finished [`Playlist`], with its JSON, M3U and
//! sequential-playback exports.
//!
//! Tracks are shared, never copied: a playlist and its transitions hold the
//! same `Arc<Track>` handles the library does.

use crate::compat;
use crate::energy::{self, Progression, FALLBACK_ENERGY};
use crate::error::{JourneyError, Result};
use crate::track::{CamelotKey, Texture, Track};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Assumed length of an average track, in minutes.
pub const AVERAGE_TRACK_MINUTES: f64 = 6.0;

pub const DEFAULT_BPM_RANGE: (f64, f64) = (118.0, 124.0);

pub const DEFAULT_BLEND_SECONDS: u32 = 60;

/// Mixing strategy recorded on every transition.
pub const TRANSITION_STRATEGY: &str = "extended_blend";

/// Textures every deep space house arc asks for.
pub const DEFAULT_REQUIRED_TEXTURES: [Texture; 4] = [
    Texture::Atmospheric,
    Texture::Hypnotic,
    Texture::Dub,
    Texture::Minimal,
];

/// Labels the planner leans toward when label preference is on.
pub const DEFAULT_PREFERRED_LABELS: [&str; 6] = [
    "Lucidflow",
    "Echocord",
    "Styrax",
    "MCDE",
    "Ostgut Ton",
    "Moodmusic",
];

/// Inputs for [`JourneyArc::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct ArcParams {
    pub duration_minutes: u32,
    pub key_center: Option<CamelotKey>,
    pub bpm_range: (f64, f64),
    pub progression: Progression,
    pub blend_duration: u32,
}

impl ArcParams {
    #[must_use]
    pub fn new(duration_minutes: u32) -> Self {
        Self {
            duration_minutes,
            key_center: None,
            bpm_range: DEFAULT_BPM_RANGE,
            progression: Progression::default(),
            blend_duration: DEFAULT_BLEND_SECONDS,
        }
    }
}

/// A planning template: how long, how fast, and how the energy should move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyArc {
    pub name: String,
    pub description: String,
    pub duration_minutes: u32,
    pub key_center: Option<CamelotKey>,
    pub bpm_range: (f64, f64),
    pub progression: Progression,
    pub energy_curve: Vec<u8>,
    pub num_tracks: usize,
    pub required_textures: Vec<Texture>,
    pub preferred_labels: Vec<String>,
    /// Seconds.
    pub blend_duration: u32,
}

impl JourneyArc {
    /// Build an arc, deriving the track count and energy curve.
    ///
    /// `num_tracks = floor(minutes / (6 - blend_minutes)) + 1`.
    ///
    /// # Errors
    ///
    /// [`JourneyError::Configuration`] for a zero duration, a blend as long
    /// as an average track, or an empty or non-positive tempo range.
    pub fn new(params: &ArcParams) -> Result<Self> {
        let ArcParams {
            duration_minutes,
            key_center,
            bpm_range,
            progression,
            blend_duration,
        } = *params;

        if duration_minutes == 0 {
            return Err(JourneyError::Configuration(
                "Duration must be at least one minute".into(),
            ));
        }
        let (min_bpm, max_bpm) = bpm_range;
        if !(min_bpm.is_finite() && max_bpm.is_finite() && min_bpm > 0.0 && min_bpm <= max_bpm) {
            return Err(JourneyError::Configuration(format!(
                "Invalid BPM range {min_bpm}-{max_bpm}"
            )));
        }
        let step_minutes = AVERAGE_TRACK_MINUTES - f64::from(blend_duration) / 60.0;
        if step_minutes <= 0.0 {
            return Err(JourneyError::Configuration(format!(
                "Blend of {blend_duration}s is not shorter than an average track"
            )));
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let num_tracks = (f64::from(duration_minutes) / step_minutes).floor() as usize + 1;

        Ok(Self {
            name: format!("Deep Space Journey - {duration_minutes}min"),
            description: format!("A {progression} journey through deep space house"),
            duration_minutes,
            key_center,
            bpm_range,
            progression,
            energy_curve: energy::generate_energy_curve(num_tracks, progression),
            num_tracks,
            required_textures: DEFAULT_REQUIRED_TEXTURES.to_vec(),
            preferred_labels: DEFAULT_PREFERRED_LABELS.iter().map(|l| (*l).to_string()).collect(),
            blend_duration,
        })
    }

    /// Target energy at `position`; past the end of the curve this is
    /// [`FALLBACK_ENERGY`].
    #[must_use]
    pub fn target_energy(&self, position: usize) -> u8 {
        self.energy_curve.get(position).copied().unwrap_or(FALLBACK_ENERGY)
    }

    #[must_use]
    pub fn contains_bpm(&self, bpm: f64) -> bool {
        self.bpm_range.0 <= bpm && bpm <= self.bpm_range.1
    }

    /// Case-sensitive: the track's label contains one of the preferred names.
    #[must_use]
    pub fn prefers_label(&self, label: Option<&str>) -> bool {
        label.is_some_and(|l| self.preferred_labels.iter().any(|p| l.contains(p.as_str())))
    }
}

/// The join between two adjacent tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub track_a: Arc<Track>,
    pub track_b: Arc<Track>,
    /// Fade-out start in the outgoing track, seconds.
    pub start_time_a: f64,
    /// Fade-in start in the incoming track, seconds.
    pub start_time_b: f64,
    pub blend_duration: f64,
    pub bpm_compatible: bool,
    pub key_compatible: bool,
    pub energy_compatible: bool,
    pub texture_compatible: bool,
    pub strategy: String,
    pub notes: String,
}

impl Transition {
    /// Work out timing and compatibility flags for `a` into `b`.
    #[must_use]
    pub fn between(a: &Arc<Track>, b: &Arc<Track>, blend_duration: f64) -> Self {
        let start_time_a = a
            .outro_start
            .unwrap_or_else(|| (a.duration - blend_duration).max(0.0));
        let start_time_b = b.intro_start.unwrap_or(0.0);

        let bpm_compatible = compat::transition_tempo_compatible(a.bpm, b.bpm);
        let key_compatible = match (a.key, b.key) {
            (Some(ka), Some(kb)) => compat::are_keys_compatible(ka, kb),
            _ => true,
        };
        let energy_compatible =
            compat::energy_distance(a.energy_level, b.energy_level) <= compat::TRANSITION_ENERGY_STEP;
        let texture_compatible = compat::textures_continue(&a.textures, &b.textures);

        let mut notes = format!("Blend from {} to {} over {blend_duration}s", a.title, b.title);
        if !bpm_compatible {
            notes.push_str(" | BPM adjustment needed");
        }
        if key_compatible {
            notes.push_str(" | Harmonic mix");
        }

        Self {
            track_a: Arc::clone(a),
            track_b: Arc::clone(b),
            start_time_a,
            start_time_b,
            blend_duration,
            bpm_compatible,
            key_compatible,
            energy_compatible,
            texture_compatible,
            strategy: TRANSITION_STRATEGY.to_string(),
            notes,
        }
    }

    /// How many of the four compatibility flags hold.
    #[must_use]
    pub fn satisfied_flags(&self) -> usize {
        [
            self.bpm_compatible,
            self.key_compatible,
            self.energy_compatible,
            self.texture_compatible,
        ]
        .into_iter()
        .filter(|&f| f)
        .count()
    }
}

/// How planning ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlanStatus {
    Complete,
    /// Ran out of candidates after `achieved` of `requested` tracks.
    Truncated { requested: usize, achieved: usize },
}

impl PlanStatus {
    #[must_use]
    pub fn is_truncated(self) -> bool {
        matches!(self, Self::Truncated { .. })
    }
}

/// One row of the sequential-playback export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackEntry {
    pub position: usize,
    pub file_path: PathBuf,
    pub artist: String,
    pub title: String,
    /// Whole seconds, as shown to a player.
    pub duration: u64,
    /// Absent for the last track.
    pub blend_to_next: Option<f64>,
}

/// The planner's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,
    pub journey_arc: JourneyArc,
    pub tracks: Vec<Arc<Track>>,
    pub transitions: Vec<Transition>,
    /// Seconds, counting each blend once.
    pub total_duration: f64,
    pub created_at: DateTime<Utc>,
    pub status: PlanStatus,
}

impl Playlist {
    /// Assemble a playlist and compute its duration.
    #[must_use]
    pub fn new(
        journey_arc: JourneyArc,
        tracks: Vec<Arc<Track>>,
        transitions: Vec<Transition>,
        status: PlanStatus,
    ) -> Self {
        let mut playlist = Self {
            name: journey_arc.name.clone(),
            journey_arc,
            tracks,
            transitions,
            total_duration: 0.0,
            created_at: Utc::now(),
            status,
        };
        playlist.total_duration = playlist.calculate_duration();
        playlist
    }

    /// First track's duration plus, per transition, the incoming duration
    /// minus the blend. Zero for an empty playlist.
    #[must_use]
    pub fn calculate_duration(&self) -> f64 {
        let Some(first) = self.tracks.first() else {
            return 0.0;
        };
        self.transitions
            .iter()
            .fold(first.duration, |total, t| total + t.track_b.duration - t.blend_duration)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Sum of [`Transition::satisfied_flags`] over the playlist.
    #[must_use]
    pub fn satisfied_flags(&self) -> usize {
        self.transitions.iter().map(Transition::satisfied_flags).sum()
    }

    /// # Errors
    ///
    /// Propagates serialization and I/O failures.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load a saved playlist. Transitions are re-pointed at the playlist's
    /// own track handles.
    ///
    /// # Errors
    ///
    /// [`JourneyError::Storage`] if the file is missing, not a playlist, holds
    /// an invalid track, or its transitions do not join adjacent tracks.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            JourneyError::Storage(format!("Cannot read playlist {}: {e}", path.display()))
        })?;
        let mut playlist: Self = serde_json::from_str(&content).map_err(|e| {
            JourneyError::Storage(format!("Malformed playlist {}: {e}", path.display()))
        })?;
        playlist.relink_transitions()?;
        Ok(playlist)
    }

    fn relink_transitions(&mut self) -> Result<()> {
        for track in &self.tracks {
            track.validate()?;
        }
        if self.transitions.len() != self.tracks.len().saturating_sub(1) {
            return Err(JourneyError::Storage(format!(
                "Playlist has {} tracks but {} transitions",
                self.tracks.len(),
                self.transitions.len()
            )));
        }

        for (i, (transition, pair)) in self
            .transitions
            .iter_mut()
            .zip(self.tracks.windows(2))
            .enumerate()
        {
            if transition.track_a.file_path != pair[0].file_path
                || transition.track_b.file_path != pair[1].file_path
            {
                return Err(JourneyError::Storage(format!(
                    "Transition {i} does not join tracks {i} and {}",
                    i + 1
                )));
            }
            transition.track_a = Arc::clone(&pair[0]);
            transition.track_b = Arc::clone(&pair[1]);
        }
        Ok(())
    }

    /// Plain extended M3U.
    #[must_use]
    pub fn to_m3u(&self) -> String {
        let mut out = format!("#EXTM3U\n#PLAYLIST:{}\n\n", self.name);
        for track in &self.tracks {
            push_extinf(&mut out, track);
        }
        out
    }

    /// M3U with per-track tempo, energy and blend comments for playback
    /// automation.
    #[must_use]
    pub fn to_annotated_m3u(&self) -> String {
        let mut out = format!("#EXTM3U\n#PLAYLIST:{}\n#AI_DJ_PLAYLIST:TRUE\n\n", self.name);
        for (i, track) in self.tracks.iter().enumerate() {
            out.push_str(&format!(
                "#TRACK_INDEX:{i}\n#BPM:{}\n#ENERGY:{}\n",
                track.bpm, track.energy_level
            ));
            if let Some(transition) = self.transitions.get(i) {
                out.push_str(&format!("#BLEND_DURATION:{}\n", transition.blend_duration));
            }
            push_extinf(&mut out, track);
            out.push('\n');
        }
        out
    }

    /// Ordered (track, display duration, blend to next) rows with no
    /// compatibility data.
    #[must_use]
    pub fn playback_sequence(&self) -> Vec<PlaybackEntry> {
        self.tracks
            .iter()
            .enumerate()
            .map(|(i, track)| PlaybackEntry {
                position: i,
                file_path: track.file_path.clone(),
                artist: track.artist.clone(),
                title: track.title.clone(),
                duration: display_seconds(track.duration),
                blend_to_next: self.transitions.get(i).map(|t| t.blend_duration),
            })
            .collect()
    }
}

fn push_extinf(out: &mut String, track: &Track) {
    out.push_str(&format!(
        "#EXTINF:{},{}\n{}\n",
        display_seconds(track.duration),
        track.display_name(),
        track.file_path.display()
    ));
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn display_seconds(duration: f64) -> u64 {
    duration.max(0.0) as u64
}
