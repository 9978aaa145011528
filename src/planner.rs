//! # Journey Planner
//!
//! Greedy, single pass: pick an opener that fits the start of the energy
//! curve, then repeatedly pick the best-scoring compatible successor until
//! the arc is full or nothing fits.
//!
//! ```text
//! Uninitialized -> OpenerSelected -> SelectingNext* -> Complete | Truncated
//! ```
//!
//! Every random choice goes through the planner's own [`Rng`], so a seeded
//! generator replays the same plan against the same library.
//!
//! Narrowing steps that would leave nothing are skipped, with one exception:
//! an empty opener pool after the tempo and energy filter fails the whole
//! call with [`JourneyError::NoOpenerFound`].

use crate::algorithm::{self, ScoringContext};
use crate::compat;
use crate::error::{JourneyError, Result};
use crate::journey::{ArcParams, JourneyArc, PlanStatus, Playlist, Transition};
use crate::library::TrackLibrary;
use crate::track::{JourneyPosition, Texture, Track};
use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::Arc;

/// Tempo tolerance used when looking for a successor, in percent.
pub const SUCCESSOR_TEMPO_TOLERANCE: f64 = compat::DEFAULT_TEMPO_TOLERANCE;

/// Energy levels a candidate may sit away from its target.
pub const ENERGY_TOLERANCE: u8 = 1;

/// Successors are drawn at random from this many top scorers.
pub const TOP_CANDIDATES: usize = 3;

/// Opener target when the curve is empty.
const DEFAULT_OPENER_ENERGY: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanState {
    Uninitialized,
    OpenerSelected,
    SelectingNext,
    Complete,
    Truncated,
}

/// Per-call switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanOptions {
    /// Only accept harmonically compatible keys.
    pub strict_key: bool,
    /// Narrow to preferred labels when any candidate has one.
    pub prefer_labels: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            strict_key: false,
            prefer_labels: true,
        }
    }
}

pub struct JourneyPlanner<'a, R: Rng> {
    library: &'a TrackLibrary,
    rng: R,
    scoring: ScoringContext,
    state: PlanState,
}

impl<'a, R: Rng> JourneyPlanner<'a, R> {
    pub fn new(library: &'a TrackLibrary, rng: R) -> Self {
        Self {
            library,
            rng,
            scoring: ScoringContext::default(),
            state: PlanState::Uninitialized,
        }
    }

    #[must_use]
    pub fn with_scoring(mut self, scoring: ScoringContext) -> Self {
        self.scoring = scoring;
        self
    }

    /// Where the last planning call got to.
    pub fn state(&self) -> PlanState {
        self.state
    }

    /// See [`JourneyArc::new`].
    ///
    /// # Errors
    ///
    /// [`JourneyError::Configuration`] for parameters that cannot plan.
    pub fn create_journey_arc(&self, params: &ArcParams) -> Result<JourneyArc> {
        let arc = JourneyArc::new(params)?;
        info!(
            "Created arc '{}': {} tracks, {}-{} BPM, curve {:?}",
            arc.name, arc.num_tracks, arc.bpm_range.0, arc.bpm_range.1, arc.energy_curve
        );
        Ok(arc)
    }

    /// Plan a full playlist along `arc`.
    ///
    /// Running out of successors is not an error: the playlist comes back
    /// shorter with [`PlanStatus::Truncated`].
    ///
    /// # Errors
    ///
    /// [`JourneyError::NoOpenerFound`] when nothing fits the arc's tempo
    /// range near the first target energy.
    pub fn generate_playlist(&mut self, arc: &JourneyArc, options: PlanOptions) -> Result<Playlist> {
        self.state = PlanState::Uninitialized;

        let opener = self.select_opener(arc, options)?;
        self.state = PlanState::OpenerSelected;
        info!("Opening with {} ({:.1} BPM)", opener.display_name(), opener.bpm);

        let mut tracks = vec![Arc::clone(&opener)];
        let mut transitions = Vec::with_capacity(arc.num_tracks.saturating_sub(1));
        let mut current = opener;

        for position in 1..arc.num_tracks {
            self.state = PlanState::SelectingNext;
            let target_energy = arc.target_energy(position);

            let Some(next) = self.select_next_track(&current, target_energy, arc, options, &tracks)
            else {
                warn!(
                    "No suitable track for position {}, stopping at {} tracks",
                    position + 1,
                    tracks.len()
                );
                break;
            };

            debug!(
                "Position {}: {} (energy {}, target {})",
                position + 1,
                next.display_name(),
                next.energy_level,
                target_energy
            );
            transitions.push(self.create_transition(&current, &next, arc));
            tracks.push(Arc::clone(&next));
            current = next;
        }

        let status = if tracks.len() < arc.num_tracks {
            self.state = PlanState::Truncated;
            PlanStatus::Truncated {
                requested: arc.num_tracks,
                achieved: tracks.len(),
            }
        } else {
            self.state = PlanState::Complete;
            PlanStatus::Complete
        };

        let playlist = Playlist::new(arc.clone(), tracks, transitions, status);
        info!(
            "Planned {} of {} tracks, {:.1} minutes",
            playlist.len(),
            arc.num_tracks,
            playlist.total_duration / 60.0
        );
        Ok(playlist)
    }

    /// Choose the first track.
    ///
    /// # Errors
    ///
    /// [`JourneyError::NoOpenerFound`] if no track in the tempo range sits
    /// within one level of the first target energy.
    pub fn select_opener(&mut self, arc: &JourneyArc, options: PlanOptions) -> Result<Arc<Track>> {
        let target_energy = arc.energy_curve.first().copied().unwrap_or(DEFAULT_OPENER_ENERGY);
        let (min_bpm, max_bpm) = arc.bpm_range;

        let candidates: Vec<Arc<Track>> = self
            .library
            .find_by_tempo_range(min_bpm, max_bpm)
            .into_iter()
            .filter(|t| compat::energy_distance(t.energy_level, target_energy) <= ENERGY_TOLERANCE)
            .collect();

        if candidates.is_empty() {
            return Err(JourneyError::NoOpenerFound {
                min_bpm,
                max_bpm,
                target_energy,
            });
        }
        debug!("{} opener candidates at energy {target_energy}", candidates.len());

        let mut candidates = candidates;
        if let (true, Some(center)) = (options.strict_key, arc.key_center) {
            candidates = narrow(candidates, "key center", |t| {
                t.key.is_some_and(|k| compat::are_keys_compatible(k, center))
            });
        }
        candidates = narrow(candidates, "opener position", |t| {
            t.journey_position == Some(JourneyPosition::Opener)
        });
        candidates = narrow(candidates, "opening texture", |t| {
            t.has_texture(Texture::Atmospheric) || t.has_texture(Texture::Minimal)
        });
        if options.prefer_labels && !arc.preferred_labels.is_empty() {
            candidates = narrow(candidates, "preferred label", |t| {
                arc.prefers_label(t.label.as_deref())
            });
        }

        candidates
            .choose(&mut self.rng)
            .cloned()
            .ok_or(JourneyError::NoOpenerFound {
                min_bpm,
                max_bpm,
                target_energy,
            })
    }

    /// Choose the successor of `current`, or `None` when nothing passes the
    /// energy and tempo filters.
    pub fn select_next_track(
        &mut self,
        current: &Arc<Track>,
        target_energy: u8,
        arc: &JourneyArc,
        options: PlanOptions,
        already_used: &[Arc<Track>],
    ) -> Option<Arc<Track>> {
        let mut candidates: Vec<Arc<Track>> = self
            .library
            .compatible_with(current, SUCCESSOR_TEMPO_TOLERANCE, options.strict_key)
            .into_iter()
            .filter(|t| !already_used.iter().any(|u| u.file_path == t.file_path))
            .filter(|t| compat::energy_distance(t.energy_level, target_energy) <= ENERGY_TOLERANCE)
            .filter(|t| arc.contains_bpm(t.bpm))
            .collect();

        if candidates.is_empty() {
            return None;
        }

        if let Some(key) = current.key {
            candidates = narrow(candidates, "harmonic key", |t| {
                t.key.is_some_and(|k| compat::are_keys_compatible(key, k))
            });
        }
        if options.prefer_labels && !arc.preferred_labels.is_empty() {
            candidates = narrow(candidates, "preferred label", |t| {
                arc.prefers_label(t.label.as_deref())
            });
        }

        let ranked = algorithm::rank_candidates(current, &candidates, target_energy, &self.scoring);
        for (track, score) in &ranked {
            trace!("  {:>6.1}  {}", score, track.display_name());
        }

        if ranked.len() <= TOP_CANDIDATES {
            return ranked.into_iter().next().map(|(t, _)| t);
        }
        ranked[..TOP_CANDIDATES]
            .choose(&mut self.rng)
            .map(|(t, _)| Arc::clone(t))
    }

    /// Join `a` into `b` with the arc's blend length.
    #[must_use]
    pub fn create_transition(&self, a: &Arc<Track>, b: &Arc<Track>, arc: &JourneyArc) -> Transition {
        Transition::between(a, b, f64::from(arc.blend_duration))
    }
}

/// Keep the tracks matching `predicate`, unless that would keep none.
fn narrow(
    candidates: Vec<Arc<Track>>,
    step: &str,
    predicate: impl Fn(&Track) -> bool,
) -> Vec<Arc<Track>> {
    let narrowed: Vec<Arc<Track>> = candidates.iter().filter(|t| predicate(t)).cloned().collect();
    if narrowed.is_empty() {
        debug!("No candidates match {step}, keeping {}", candidates.len());
        candidates
    } else {
        debug!("Narrowed by {step}: {} -> {}", candidates.len(), narrowed.len());
        narrowed
    }
}

/// One plan produced by [`plan_alternatives`].
#[derive(Debug, Clone)]
pub struct Alternative {
    pub seed: u64,
    pub playlist: Playlist,
}

/// Plan once per seed, in parallel, against the same library.
///
/// Each plan gets its own `StdRng` seeded from its seed. Results come back
/// in seed order.
///
/// # Errors
///
/// The first planning error, typically [`JourneyError::NoOpenerFound`],
/// which does not depend on the seed.
pub fn plan_alternatives(
    library: &TrackLibrary,
    arc: &JourneyArc,
    options: PlanOptions,
    seeds: &[u64],
) -> Result<Vec<Alternative>> {
    seeds
        .par_iter()
        .map(|&seed| {
            let mut planner = JourneyPlanner::new(library, StdRng::seed_from_u64(seed));
            planner
                .generate_playlist(arc, options)
                .map(|playlist| Alternative { seed, playlist })
        })
        .collect()
}

/// Longest plan, then most satisfied transition flags, then earliest seed.
#[must_use]
pub fn best_plan(alternatives: &[Alternative]) -> Option<&Alternative> {
    alternatives.iter().min_by(|a, b| {
        b.playlist
            .len()
            .cmp(&a.playlist.len())
            .then_with(|| b.playlist.satisfied_flags().cmp(&a.playlist.satisfied_flags()))
            .then_with(|| a.seed.cmp(&b.seed))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::CamelotKey;

    fn track(name: &str, bpm: f64, energy: u8) -> Track {
        Track {
            energy_level: energy,
            duration: 360.0,
            ..Track::new(format!("/music/{name}.flac"), name, name, bpm)
        }
    }

    fn arc(minutes: u32) -> JourneyArc {
        JourneyArc::new(&ArcParams::new(minutes)).unwrap()
    }

    /// Energies 1..=9 repeated, all inside 118-124 BPM.
    fn wide_library(n: usize) -> TrackLibrary {
        (0..n)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let bpm = 118.0 + (i % 7) as f64;
                #[allow(clippy::cast_possible_truncation)]
                let energy = (i % 9) as u8 + 1;
                track(&format!("t{i}"), bpm, energy)
            })
            .collect()
    }

    #[test]
    fn test_full_plan_reaches_complete() {
        let library = wide_library(60);
        let mut planner = JourneyPlanner::new(&library, StdRng::seed_from_u64(7));
        assert_eq!(planner.state(), PlanState::Uninitialized);

        let arc = arc(30);
        let playlist = planner.generate_playlist(&arc, PlanOptions::default()).unwrap();
        assert_eq!(playlist.len(), 7);
        assert_eq!(playlist.transitions.len(), 6);
        assert_eq!(playlist.status, PlanStatus::Complete);
        assert_eq!(planner.state(), PlanState::Complete);

        for (i, t) in playlist.tracks.iter().enumerate() {
            assert!(arc.contains_bpm(t.bpm));
            assert!(compat::energy_distance(t.energy_level, arc.target_energy(i)) <= 1);
        }
    }

    #[test]
    fn test_no_track_repeats() {
        let library = wide_library(60);
        let mut planner = JourneyPlanner::new(&library, StdRng::seed_from_u64(3));
        let playlist = planner.generate_playlist(&arc(90), PlanOptions::default()).unwrap();
        let mut paths: Vec<_> = playlist.tracks.iter().map(|t| t.file_path.clone()).collect();
        let before = paths.len();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), before);
    }

    #[test]
    fn test_no_opener_is_an_error() {
        let library: TrackLibrary = vec![track("fast", 140.0, 2), track("loud", 120.0, 9)]
            .into_iter()
            .collect();
        let mut planner = JourneyPlanner::new(&library, StdRng::seed_from_u64(1));
        let err = planner.generate_playlist(&arc(30), PlanOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            JourneyError::NoOpenerFound { target_energy: 2, .. }
        ));
        assert_eq!(planner.state(), PlanState::Uninitialized);
    }

    #[test]
    fn test_truncates_when_successors_run_out() {
        // Curve for 30 minutes starts 2,3,4; nothing sits near 4.
        let library: TrackLibrary = vec![track("a", 120.0, 2), track("b", 121.0, 2)]
            .into_iter()
            .collect();
        let mut planner = JourneyPlanner::new(&library, StdRng::seed_from_u64(1));
        let playlist = planner.generate_playlist(&arc(30), PlanOptions::default()).unwrap();
        assert_eq!(playlist.len(), 2);
        assert_eq!(
            playlist.status,
            PlanStatus::Truncated {
                requested: 7,
                achieved: 2
            }
        );
        assert_eq!(planner.state(), PlanState::Truncated);
    }

    #[test]
    fn test_opener_prefers_position_then_texture_then_label() {
        let tagged = Track {
            journey_position: Some(JourneyPosition::Opener),
            ..track("tagged", 120.0, 2)
        };
        let textured = Track {
            textures: vec![Texture::Atmospheric],
            ..track("textured", 120.0, 2)
        };
        let library: TrackLibrary = vec![track("plain", 120.0, 2), tagged, textured]
            .into_iter()
            .collect();
        for seed in 0..20 {
            let mut planner = JourneyPlanner::new(&library, StdRng::seed_from_u64(seed));
            let opener = planner.select_opener(&arc(30), PlanOptions::default()).unwrap();
            assert_eq!(opener.title, "tagged");
        }

        let labelled = Track {
            label: Some("Styrax Records".into()),
            ..track("labelled", 120.0, 3)
        };
        let library: TrackLibrary = vec![track("plain", 120.0, 2), labelled].into_iter().collect();
        let mut planner = JourneyPlanner::new(&library, StdRng::seed_from_u64(0));
        let opener = planner.select_opener(&arc(30), PlanOptions::default()).unwrap();
        assert_eq!(opener.title, "labelled");
    }

    #[test]
    fn test_strict_key_opener_narrowing_is_skipped_when_empty() {
        let library: TrackLibrary = vec![Track {
            key: Some(CamelotKey::DFlatMajor),
            ..track("only", 120.0, 2)
        }]
        .into_iter()
        .collect();
        let arc = JourneyArc::new(&ArcParams {
            key_center: Some(CamelotKey::AMinor),
            ..ArcParams::new(30)
        })
        .unwrap();
        let options = PlanOptions {
            strict_key: true,
            ..PlanOptions::default()
        };
        let mut planner = JourneyPlanner::new(&library, StdRng::seed_from_u64(0));
        assert_eq!(planner.select_opener(&arc, options).unwrap().title, "only");
    }

    #[test]
    fn test_successor_prefers_harmonic_keys() {
        let current = Arc::new(Track {
            key: Some(CamelotKey::AMinor),
            ..track("current", 120.0, 3)
        });
        let clash = Track {
            key: Some(CamelotKey::FMinor),
            ..track("clash", 120.5, 3)
        };
        let harmonic = Track {
            key: Some(CamelotKey::EMinor),
            ..track("harmonic", 123.0, 4)
        };
        let library: TrackLibrary = vec![clash, harmonic].into_iter().collect();
        let mut planner = JourneyPlanner::new(&library, StdRng::seed_from_u64(0));
        let next = planner
            .select_next_track(&current, 3, &arc(30), PlanOptions::default(), &[])
            .unwrap();
        assert_eq!(next.title, "harmonic");
    }

    #[test]
    fn test_successor_label_preference_narrows_when_enabled() {
        let current = Arc::new(track("current", 120.0, 3));
        let labelled = Track {
            label: Some("MCDE".to_string()),
            ..track("lab", 123.5, 3)
        };
        let library: TrackLibrary = vec![track("plain", 120.1, 3), labelled].into_iter().collect();

        let mut planner = JourneyPlanner::new(&library, StdRng::seed_from_u64(0));
        let next = planner
            .select_next_track(&current, 3, &arc(30), PlanOptions::default(), &[])
            .unwrap();
        assert_eq!(next.title, "lab");

        let options = PlanOptions {
            prefer_labels: false,
            ..PlanOptions::default()
        };
        let next = planner
            .select_next_track(&current, 3, &arc(30), options, &[])
            .unwrap();
        assert_eq!(next.title, "plain");
    }

    #[test]
    fn test_successor_must_stay_inside_arc_tempo_range() {
        let current = Arc::new(track("current", 120.0, 3));
        let library: TrackLibrary = vec![track("double", 240.0, 3)].into_iter().collect();
        assert_eq!(library.compatible_with(&current, SUCCESSOR_TEMPO_TOLERANCE, false).len(), 1);

        let mut planner = JourneyPlanner::new(&library, StdRng::seed_from_u64(0));
        let next = planner.select_next_track(&current, 3, &arc(30), PlanOptions::default(), &[]);
        assert!(next.is_none());
    }

    #[test]
    fn test_custom_scoring_changes_the_pick() {
        let current = Arc::new(track("current", 120.0, 3));
        let twin = Track {
            artist: "current".to_string(),
            ..track("twin", 120.2, 3)
        };
        let library: TrackLibrary = vec![twin, track("other", 120.3, 4)].into_iter().collect();

        let mut planner = JourneyPlanner::new(&library, StdRng::seed_from_u64(0));
        let next = planner
            .select_next_track(&current, 3, &arc(30), PlanOptions::default(), &[])
            .unwrap();
        assert_eq!(next.title, "twin");

        let scoring = ScoringContext {
            same_artist_penalty: 40.0,
            ..ScoringContext::default()
        };
        let mut planner = JourneyPlanner::new(&library, StdRng::seed_from_u64(0)).with_scoring(scoring);
        let next = planner
            .select_next_track(&current, 3, &arc(30), PlanOptions::default(), &[])
            .unwrap();
        assert_eq!(next.title, "other");
    }

    #[test]
    fn test_successor_takes_top_score_when_few_candidates() {
        let current = Arc::new(track("current", 120.0, 4));
        let library: TrackLibrary = vec![
            track("close", 120.5, 4),
            track("far", 123.5, 5),
            track("current", 120.0, 4),
        ]
        .into_iter()
        .collect();
        for seed in 0..10 {
            let mut planner = JourneyPlanner::new(&library, StdRng::seed_from_u64(seed));
            let next = planner
                .select_next_track(
                    &current,
                    4,
                    &arc(30),
                    PlanOptions::default(),
                    std::slice::from_ref(&current),
                )
                .unwrap();
            assert_eq!(next.title, "close");
        }
    }

    #[test]
    fn test_successor_draws_from_top_three() {
        let current = Arc::new(track("current", 120.0, 5));
        let library: TrackLibrary = vec![
            track("a", 120.1, 5),
            track("b", 120.2, 5),
            track("c", 120.3, 5),
            track("d", 124.0, 6),
            track("e", 124.0, 6),
        ]
        .into_iter()
        .collect();
        for seed in 0..30 {
            let mut planner = JourneyPlanner::new(&library, StdRng::seed_from_u64(seed));
            let next = planner
                .select_next_track(&current, 5, &arc(30), PlanOptions::default(), &[])
                .unwrap();
            assert!(["a", "b", "c"].contains(&next.title.as_str()), "{}", next.title);
        }
    }

    #[test]
    fn test_same_seed_same_plan() {
        let library = wide_library(80);
        let plan = |seed| {
            let mut planner = JourneyPlanner::new(&library, StdRng::seed_from_u64(seed));
            planner.generate_playlist(&arc(60), PlanOptions::default()).unwrap()
        };
        let titles = |p: &Playlist| p.tracks.iter().map(|t| t.title.clone()).collect::<Vec<_>>();
        assert_eq!(titles(&plan(42)), titles(&plan(42)));
    }

    #[test]
    fn test_alternatives_and_best_plan() {
        let library = wide_library(80);
        let arc = arc(60);
        let seeds = [5, 1, 9];
        let alternatives = plan_alternatives(&library, &arc, PlanOptions::default(), &seeds).unwrap();
        assert_eq!(
            alternatives.iter().map(|a| a.seed).collect::<Vec<_>>(),
            seeds.to_vec()
        );

        let best = best_plan(&alternatives).unwrap();
        for other in &alternatives {
            assert!(best.playlist.len() >= other.playlist.len());
        }
        assert!(best_plan(&[]).is_none());
    }

    #[test]
    fn test_best_plan_tie_breaks() {
        let library = wide_library(60);
        let arc = arc(30);
        let mut planner = JourneyPlanner::new(&library, StdRng::seed_from_u64(0));
        let playlist = planner.generate_playlist(&arc, PlanOptions::default()).unwrap();

        let mut shorter = playlist.clone();
        shorter.tracks.pop();
        shorter.transitions.pop();

        let alternatives = vec![
            Alternative { seed: 2, playlist: shorter },
            Alternative { seed: 8, playlist: playlist.clone() },
            Alternative { seed: 4, playlist },
        ];
        assert_eq!(best_plan(&alternatives).unwrap().seed, 4);
    }
}
