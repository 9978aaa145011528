//! Candidate scoring for the next track of a journey.
//!
//! A candidate is scored against the track currently playing and the energy
//! the curve asks for at its position. Higher is better; scores never go
//! below zero.

use crate::compat;
use crate::track::Track;
use std::cmp::Ordering;
use std::sync::Arc;

/// Scoring weights.
#[derive(Debug, Clone)]
pub struct ScoringContext {
    pub base_score: f64,
    /// Bonus when the candidate hits the target energy exactly.
    pub exact_energy_bonus: f64,
    /// Penalty per level away from the target otherwise.
    pub energy_penalty_per_level: f64,
    /// `(max_bpm_difference, bonus)` tiers, checked in order with a strict `<`.
    pub tempo_tiers: [(f64, f64); 3],
    pub key_bonus: f64,
    pub texture_bonus: f64,
    pub same_artist_penalty: f64,
}

impl Default for ScoringContext {
    fn default() -> Self {
        Self {
            base_score: 50.0,
            exact_energy_bonus: 20.0,
            energy_penalty_per_level: 5.0,
            tempo_tiers: [(2.0, 15.0), (4.0, 10.0), (6.0, 5.0)],
            key_bonus: 25.0,
            texture_bonus: 10.0,
            same_artist_penalty: 15.0,
        }
    }
}

/// Score `candidate` as the successor of `current`.
///
/// ```
/// use journey::algorithm::{score_candidate, ScoringContext};
/// use journey::track::Track;
///
/// let current = Track::new("/a.wav", "A", "One", 122.0);
/// let candidate = Track { energy_level: 4, ..Track::new("/b.wav", "B", "Two", 121.0) };
///
/// // base 50, exact energy +20, tempo within 2 BPM +15
/// let score = score_candidate(&current, &candidate, 4, &ScoringContext::default());
/// assert_eq!(score, 85.0);
/// ```
#[must_use]
pub fn score_candidate(
    current: &Track,
    candidate: &Track,
    target_energy: u8,
    context: &ScoringContext,
) -> f64 {
    let score = context.base_score
        + energy_component(candidate.energy_level, target_energy, context)
        + tempo_component((candidate.bpm - current.bpm).abs(), &context.tempo_tiers)
        + key_component(current, candidate, context.key_bonus)
        + texture_component(current, candidate, context.texture_bonus)
        - artist_penalty(current, candidate, context.same_artist_penalty);

    score.max(0.0)
}

#[inline]
fn energy_component(energy: u8, target: u8, context: &ScoringContext) -> f64 {
    match compat::energy_distance(energy, target) {
        0 => context.exact_energy_bonus,
        diff => -context.energy_penalty_per_level * f64::from(diff),
    }
}

#[inline]
fn tempo_component(bpm_diff: f64, tiers: &[(f64, f64)]) -> f64 {
    tiers
        .iter()
        .find(|(limit, _)| bpm_diff < *limit)
        .map_or(0.0, |&(_, bonus)| bonus)
}

#[inline]
fn key_component(current: &Track, candidate: &Track, bonus: f64) -> f64 {
    match (current.key, candidate.key) {
        (Some(a), Some(b)) if compat::are_keys_compatible(a, b) => bonus,
        _ => 0.0,
    }
}

#[inline]
fn texture_component(current: &Track, candidate: &Track, bonus: f64) -> f64 {
    if compat::is_partial_texture_overlap(&current.textures, &candidate.textures) {
        bonus
    } else {
        0.0
    }
}

#[inline]
fn artist_penalty(current: &Track, candidate: &Track, penalty: f64) -> f64 {
    if current.artist == candidate.artist {
        penalty
    } else {
        0.0
    }
}

/// Score every candidate lazily.
pub fn batch_score<'a>(
    current: &'a Track,
    candidates: &'a [Arc<Track>],
    target_energy: u8,
    context: &'a ScoringContext,
) -> impl Iterator<Item = (&'a Arc<Track>, f64)> + 'a {
    candidates
        .iter()
        .map(move |c| (c, score_candidate(current, c, target_energy, context)))
}

/// Score and sort candidates, best first.
///
/// The sort is stable: equal scores keep their input order.
#[must_use]
pub fn rank_candidates(
    current: &Track,
    candidates: &[Arc<Track>],
    target_energy: u8,
    context: &ScoringContext,
) -> Vec<(Arc<Track>, f64)> {
    let mut ranked: Vec<(Arc<Track>, f64)> =
        batch_score(current, candidates, target_energy, context)
            .map(|(c, score)| (Arc::clone(c), score))
            .collect();

    ranked.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{CamelotKey, Texture};

    fn track(artist: &str, bpm: f64, energy: u8) -> Track {
        Track {
            energy_level: energy,
            ..Track::new(format!("/music/{artist}-{bpm}.wav"), "Title", artist, bpm)
        }
    }

    #[test]
    fn test_exact_energy_close_tempo_compatible_key() {
        let ctx = ScoringContext::default();
        let current = Track {
            key: Some(CamelotKey::AMinor),
            ..track("One", 120.0, 4)
        };
        let candidate = Track {
            key: Some(CamelotKey::EMinor),
            ..track("Two", 121.0, 5)
        };
        // 50 + 20 + 15 + 25
        assert_eq!(score_candidate(&current, &candidate, 5, &ctx), 110.0);
    }

    #[test]
    fn test_energy_penalty_scales_with_distance() {
        let ctx = ScoringContext::default();
        let current = track("One", 120.0, 4);
        // 50 - 5*3 + 0 (10 BPM away)
        assert_eq!(score_candidate(&current, &track("Two", 130.0, 8), 5, &ctx), 35.0);
    }

    #[test]
    fn test_tempo_tiers_are_strict() {
        let tiers = ScoringContext::default().tempo_tiers;
        assert_eq!(tempo_component(1.99, &tiers), 15.0);
        assert_eq!(tempo_component(2.0, &tiers), 10.0);
        assert_eq!(tempo_component(3.5, &tiers), 10.0);
        assert_eq!(tempo_component(4.0, &tiers), 5.0);
        assert_eq!(tempo_component(6.0, &tiers), 0.0);
    }

    #[test]
    fn test_missing_key_gets_no_bonus() {
        let ctx = ScoringContext::default();
        let current = Track {
            key: Some(CamelotKey::AMinor),
            ..track("One", 120.0, 5)
        };
        let candidate = track("Two", 120.0, 5);
        assert_eq!(score_candidate(&current, &candidate, 5, &ctx), 85.0);
    }

    #[test]
    fn test_texture_bonus_only_for_partial_overlap() {
        let ctx = ScoringContext::default();
        let current = Track {
            textures: vec![Texture::Dub, Texture::Minimal],
            ..track("One", 130.0, 5)
        };
        let partial = Track {
            textures: vec![Texture::Minimal, Texture::Vocal],
            ..track("Two", 140.0, 5)
        };
        let full = Track {
            textures: vec![Texture::Minimal, Texture::Dub],
            ..track("Two", 140.0, 5)
        };
        let none = Track {
            textures: vec![Texture::Vocal],
            ..track("Two", 140.0, 5)
        };
        assert_eq!(score_candidate(&current, &partial, 5, &ctx), 80.0);
        assert_eq!(score_candidate(&current, &full, 5, &ctx), 70.0);
        assert_eq!(score_candidate(&current, &none, 5, &ctx), 70.0);
    }

    #[test]
    fn test_same_artist_penalty_is_exact_match() {
        let ctx = ScoringContext::default();
        let current = track("Deepchord", 130.0, 5);
        assert_eq!(score_candidate(&current, &track("Deepchord", 140.0, 5), 5, &ctx), 55.0);
        assert_eq!(score_candidate(&current, &track("deepchord", 140.0, 5), 5, &ctx), 70.0);
    }

    #[test]
    fn test_score_never_negative() {
        let ctx = ScoringContext::default();
        let current = track("Same", 120.0, 1);
        for energy in 1..=10 {
            for target in 1..=10 {
                let candidate = track("Same", 200.0, energy);
                let score = score_candidate(&current, &candidate, target, &ctx);
                assert!(score >= 0.0, "energy {energy} target {target} gave {score}");
                assert!(score.is_finite());
            }
        }
        // 50 - 45 - 15 clamps to zero
        assert_eq!(score_candidate(&current, &track("Same", 200.0, 10), 1, &ctx), 0.0);
    }

    #[test]
    fn test_rank_is_descending_and_stable() {
        let ctx = ScoringContext::default();
        let current = track("Current", 120.0, 5);
        let candidates: Vec<Arc<Track>> = vec![
            Arc::new(Track { title: "far".into(), ..track("A", 130.0, 5) }),
            Arc::new(Track { title: "first".into(), ..track("B", 121.0, 5) }),
            Arc::new(Track { title: "second".into(), ..track("C", 121.0, 5) }),
        ];
        let ranked = rank_candidates(&current, &candidates, 5, &ctx);
        let titles: Vec<&str> = ranked.iter().map(|(t, _)| t.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "far"]);
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn test_batch_matches_individual() {
        let ctx = ScoringContext::default();
        let current = track("Current", 120.0, 5);
        let candidates = vec![Arc::new(track("A", 123.0, 6)), Arc::new(track("B", 118.0, 3))];
        for (candidate, score) in batch_score(&current, &candidates, 5, &ctx) {
            assert_eq!(score, score_candidate(&current, candidate, 5, &ctx));
        }
    }
}
