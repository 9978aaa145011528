//! Offline DJ set planner: picks and orders tracks so tempo, key and energy
//! flow from one record into the next.
//!
//! Core modules:
//! - [`library`] - Indexed track store
//! - [`compat`] - Tempo, Camelot key, energy and texture rules
//! - [`energy`] - Target energy curves
//! - [`algorithm`] - Candidate scoring
//! - [`planner`] - Greedy journey planning
//! - [`journey`] - Arcs, transitions, playlists and their exports
//!
//! ### Supporting Modules
//!
//! - [`track`] - Track records and the Camelot key type
//! - [`db`] - SQLite catalog storage
//! - [`config`] - Data directory and planner defaults
//! - [`cli`] / [`completion`] - Command-line definitions
//! - [`error`] - Error type
//!
//! ## Quick Start Example
//!
//! ```
//! use journey::journey::ArcParams;
//! use journey::library::TrackLibrary;
//! use journey::planner::{JourneyPlanner, PlanOptions};
//! use journey::track::Track;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let library: TrackLibrary = (0..30)
//!     .map(|i| Track {
//!         energy_level: (i % 8 + 1) as u8,
//!         duration: 380.0,
//!         ..Track::new(format!("/music/{i}.flac"), format!("Track {i}"), format!("Artist {i}"), 120.0 + (i % 4) as f64)
//!     })
//!     .collect();
//!
//! let mut planner = JourneyPlanner::new(&library, StdRng::seed_from_u64(7));
//! let arc = planner.create_journey_arc(&ArcParams::new(30))?;
//! let playlist = planner.generate_playlist(&arc, PlanOptions::default())?;
//!
//! assert_eq!(arc.num_tracks, 7);
//! assert_eq!(playlist.transitions.len(), playlist.tracks.len() - 1);
//! # Ok::<(), journey::error::JourneyError>(())
//! ```
//!
//! ## Planning
//!
//! 1. An arc fixes the track count from the target length and blend, and an
//!    energy curve with one target per position.
//! 2. The opener comes from the arc's tempo range within one energy level of
//!    the first target, preferring tracks tagged as openers, atmospheric or
//!    minimal textures, and preferred labels.
//! 3. Each successor must beatmatch the current track, sit within one level
//!    of its target energy and stay inside the tempo range. Harmonic keys and
//!    preferred labels narrow the pool when they can; the rest is scored and
//!    one of the top three is drawn.
//! 4. When nothing fits, the playlist ends early and is marked truncated.

pub mod algorithm;
pub mod cli;
pub mod compat;
pub mod completion;
pub mod config;
pub mod db;
pub mod energy;
pub mod error;
pub mod journey;
pub mod library;
pub mod planner;
pub mod track;

pub use error::{JourneyError, Result};
