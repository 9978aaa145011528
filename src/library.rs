//! # Track Library
//!
//! The indexed catalog the planner selects from. Tracks live in a primary
//! list with two derived indexes, by Camelot key and by rounded tempo.
//! [`TrackLibrary::add`] is the only way in and updates all three together,
//! so the indexes can never drift from the list.
//!
//! Queries never fail; an empty result is an empty `Vec`.
//!
//! ## Persisted form
//!
//! ```json
//! { "version": "0.3.0", "tracks": [ { "file_path": "...", "bpm": 122.0, ... } ] }
//! ```
//!
//! Loading validates every record and refuses the whole file on the first
//! bad one.

use crate::compat;
use crate::error::{JourneyError, Result};
use crate::track::{CamelotKey, JourneyPosition, Texture, Track};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Catalog format version written by [`TrackLibrary::save_json`].
pub const CATALOG_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    version: Option<String>,
    tracks: Vec<Track>,
}

/// Summary numbers for a library.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryStats {
    pub total_tracks: usize,
    pub bpm_range: Option<(f64, f64)>,
    pub bpm_average: Option<f64>,
    pub energy_range: Option<(u8, u8)>,
    pub energy_average: Option<f64>,
    pub keys_represented: usize,
    pub labels: usize,
}

/// Indexed, append-only track collection.
#[derive(Debug, Default, Clone)]
pub struct TrackLibrary {
    tracks: Vec<Arc<Track>>,
    by_key: HashMap<CamelotKey, Vec<Arc<Track>>>,
    by_bpm: HashMap<u32, Vec<Arc<Track>>>,
}

impl TrackLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a track and index it. Duplicates are allowed.
    pub fn add(&mut self, track: Track) -> Arc<Track> {
        let track = Arc::new(track);

        if let Some(key) = track.key {
            self.by_key.entry(key).or_default().push(Arc::clone(&track));
        }
        self.by_bpm
            .entry(bpm_bucket(track.bpm))
            .or_default()
            .push(Arc::clone(&track));
        self.tracks.push(Arc::clone(&track));

        track
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Track>> {
        self.tracks.iter()
    }

    /// Direct lookup in the key index.
    #[must_use]
    pub fn find_by_key(&self, key: CamelotKey) -> Vec<Arc<Track>> {
        self.by_key.get(&key).cloned().unwrap_or_default()
    }

    /// Direct lookup in the tempo index, by tempo rounded to the nearest BPM.
    #[must_use]
    pub fn find_by_bpm(&self, bpm: u32) -> Vec<Arc<Track>> {
        self.by_bpm.get(&bpm).cloned().unwrap_or_default()
    }

    /// Tracks with `min <= bpm <= max`.
    #[must_use]
    pub fn find_by_tempo_range(&self, min: f64, max: f64) -> Vec<Arc<Track>> {
        self.filter(|t| min <= t.bpm && t.bpm <= max)
    }

    /// Tracks within `tolerance` levels of `level`.
    #[must_use]
    pub fn find_by_energy(&self, level: u8, tolerance: u8) -> Vec<Arc<Track>> {
        self.filter(|t| compat::energy_distance(t.energy_level, level) <= tolerance)
    }

    #[must_use]
    pub fn find_by_texture(&self, texture: Texture) -> Vec<Arc<Track>> {
        self.filter(|t| t.has_texture(texture))
    }

    /// Tracks whose label contains `label`, ignoring case.
    #[must_use]
    pub fn find_by_label(&self, label: &str) -> Vec<Arc<Track>> {
        let needle = label.to_lowercase();
        self.filter(|t| {
            t.label
                .as_deref()
                .is_some_and(|l| l.to_lowercase().contains(&needle))
        })
    }

    #[must_use]
    pub fn find_by_journey_position(&self, position: JourneyPosition) -> Vec<Arc<Track>> {
        self.filter(|t| t.journey_position == Some(position))
    }

    /// Every other track that can be beatmatched with `reference`.
    ///
    /// The reference itself is excluded by identity, not by value. With
    /// `key_compatible_only`, tracks whose key clashes with the reference
    /// are dropped too; a missing key on either side never excludes.
    #[must_use]
    pub fn compatible_with(
        &self,
        reference: &Arc<Track>,
        tempo_tolerance_percent: f64,
        key_compatible_only: bool,
    ) -> Vec<Arc<Track>> {
        let compatible = self.filter_arcs(|t| {
            if Arc::ptr_eq(t, reference) {
                return false;
            }
            if !compat::is_tempo_compatible(t.bpm, reference.bpm, tempo_tolerance_percent) {
                return false;
            }
            match (key_compatible_only, reference.key, t.key) {
                (true, Some(a), Some(b)) => compat::are_keys_compatible(a, b),
                _ => true,
            }
        });
        debug!(
            "{} tracks compatible with {} at {:.1}%",
            compatible.len(),
            reference.display_name(),
            tempo_tolerance_percent
        );
        compatible
    }

    /// See [`compat::are_keys_compatible`].
    #[must_use]
    pub fn are_keys_compatible(a: CamelotKey, b: CamelotKey) -> bool {
        compat::are_keys_compatible(a, b)
    }

    #[must_use]
    pub fn stats(&self) -> LibraryStats {
        let total_tracks = self.tracks.len();
        let labels: HashSet<&str> = self.tracks.iter().filter_map(|t| t.label.as_deref()).collect();

        if total_tracks == 0 {
            return LibraryStats {
                total_tracks,
                bpm_range: None,
                bpm_average: None,
                energy_range: None,
                energy_average: None,
                keys_represented: 0,
                labels: 0,
            };
        }

        let bpm_min = self.tracks.iter().map(|t| t.bpm).fold(f64::INFINITY, f64::min);
        let bpm_max = self.tracks.iter().map(|t| t.bpm).fold(f64::NEG_INFINITY, f64::max);
        let energy_min = self.tracks.iter().map(|t| t.energy_level).min().unwrap_or(0);
        let energy_max = self.tracks.iter().map(|t| t.energy_level).max().unwrap_or(0);

        #[allow(clippy::cast_precision_loss)]
        let count = total_tracks as f64;

        LibraryStats {
            total_tracks,
            bpm_range: Some((bpm_min, bpm_max)),
            bpm_average: Some(self.tracks.iter().map(|t| t.bpm).sum::<f64>() / count),
            energy_range: Some((energy_min, energy_max)),
            energy_average: Some(
                self.tracks.iter().map(|t| f64::from(t.energy_level)).sum::<f64>() / count,
            ),
            keys_represented: self.by_key.len(),
            labels: labels.len(),
        }
    }

    /// Build a library from records, validating each one first.
    ///
    /// # Errors
    ///
    /// Returns [`JourneyError::Storage`] for the first invalid record.
    pub fn from_tracks(tracks: impl IntoIterator<Item = Track>) -> Result<Self> {
        let mut library = Self::new();
        for track in tracks {
            track.validate()?;
            library.add(track);
        }
        Ok(library)
    }

    /// Load a JSON catalog.
    ///
    /// # Errors
    ///
    /// Fails with a storage error if the file is missing, is not a catalog,
    /// or holds an invalid track.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            JourneyError::Storage(format!("Cannot read catalog {}: {e}", path.display()))
        })?;
        let catalog: CatalogFile = serde_json::from_str(&content).map_err(|e| {
            JourneyError::Storage(format!("Malformed catalog {}: {e}", path.display()))
        })?;

        let library = Self::from_tracks(catalog.tracks)?;
        info!(
            "Loaded {} tracks from {} (catalog version {})",
            library.len(),
            path.display(),
            catalog.version.as_deref().unwrap_or("unknown")
        );
        Ok(library)
    }

    /// Write the catalog as pretty JSON.
    ///
    /// # Errors
    ///
    /// Propagates serialization and I/O failures.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let catalog = CatalogFile {
            version: Some(CATALOG_VERSION.to_string()),
            tracks: self.tracks.iter().map(|t| Track::clone(t)).collect(),
        };
        let json = serde_json::to_string_pretty(&catalog)?;
        fs::write(path, json)?;
        info!("Saved {} tracks to {}", self.len(), path.display());
        Ok(())
    }

    fn filter(&self, predicate: impl Fn(&Track) -> bool) -> Vec<Arc<Track>> {
        self.filter_arcs(|t| predicate(t))
    }

    fn filter_arcs(&self, predicate: impl Fn(&Arc<Track>) -> bool) -> Vec<Arc<Track>> {
        self.tracks.iter().filter(|t| predicate(t)).cloned().collect()
    }
}

impl FromIterator<Track> for TrackLibrary {
    /// Unvalidated; use [`TrackLibrary::from_tracks`] for untrusted input.
    fn from_iter<I: IntoIterator<Item = Track>>(iter: I) -> Self {
        let mut library = Self::new();
        for track in iter {
            library.add(track);
        }
        library
    }
}

/// Tempo index bucket: nearest whole BPM.
fn bpm_bucket(bpm: f64) -> u32 {
    // `as` saturates, so NaN and negatives land in bucket 0
    bpm.round() as u32
}
