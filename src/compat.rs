//! Pairwise compatibility rules: tempo ratio, Camelot key, energy and texture.
//!
//! Every function here is pure and total over its inputs.

use crate::track::{CamelotKey, Texture};
use std::collections::HashSet;

/// Default tempo tolerance, in percent.
pub const DEFAULT_TEMPO_TOLERANCE: f64 = 6.0;

/// Maximum energy step a transition may take and still be flagged compatible.
pub const TRANSITION_ENERGY_STEP: u8 = 2;

/// Beatmatching relationship between an outgoing and an incoming tempo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TempoBand {
    /// 1:1, direct beatmatch.
    Direct,
    /// 2:1, the outgoing track runs at double the incoming tempo.
    Double,
    /// 1:2, the incoming track runs at double the outgoing tempo.
    Half,
}

/// Which tempo bands a pair of tempos falls into. Bands are checked
/// independently, so more than one can match at wide tolerances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TempoMatch {
    pub direct: bool,
    pub double: bool,
    pub half: bool,
}

impl TempoMatch {
    #[must_use]
    pub fn any(self) -> bool {
        self.direct || self.double || self.half
    }

    /// The matching bands, in `Direct`, `Double`, `Half` order.
    #[must_use]
    pub fn bands(self) -> Vec<TempoBand> {
        [
            (self.direct, TempoBand::Direct),
            (self.double, TempoBand::Double),
            (self.half, TempoBand::Half),
        ]
        .into_iter()
        .filter_map(|(hit, band)| hit.then_some(band))
        .collect()
    }
}

/// Classify the ratio `t1 / t2` against the 1:1, 2:1 and 1:2 bands.
///
/// Tolerance is relative to each band's centre. The 1:2 band is the 2:1 band
/// measured on the inverted ratio, so `match_tempo(a, b).double` always
/// equals `match_tempo(b, a).half`.
#[must_use]
pub fn match_tempo(t1: f64, t2: f64, tolerance_percent: f64) -> TempoMatch {
    if !(t1 > 0.0 && t2 > 0.0) {
        return TempoMatch::default();
    }
    let tol = tolerance_percent / 100.0;
    let ratio = t1 / t2;
    let inverse = t2 / t1;

    TempoMatch {
        direct: (ratio - 1.0).abs() <= tol,
        double: (ratio - 2.0).abs() <= 2.0 * tol,
        half: (inverse - 2.0).abs() <= 2.0 * tol,
    }
}

/// True if the tempos mix in any band.
#[must_use]
pub fn is_tempo_compatible(t1: f64, t2: f64, tolerance_percent: f64) -> bool {
    match_tempo(t1, t2, tolerance_percent).any()
}

/// Tempo flag recorded on a transition.
///
/// Only the 1:1 and 2:1 bands count here; an incoming track at double the
/// outgoing tempo is flagged as needing adjustment.
#[must_use]
pub fn transition_tempo_compatible(outgoing_bpm: f64, incoming_bpm: f64) -> bool {
    let m = match_tempo(outgoing_bpm, incoming_bpm, DEFAULT_TEMPO_TOLERANCE);
    m.direct || m.double
}

/// Camelot mixing rule.
///
/// Compatible when the keys are identical, share a wheel number (relative
/// major/minor), or share a letter and sit next to each other on the wheel,
/// including the 12 to 1 wrap.
#[must_use]
pub fn are_keys_compatible(a: CamelotKey, b: CamelotKey) -> bool {
    if a == b || a.number() == b.number() {
        return true;
    }
    if a.mode() != b.mode() {
        return false;
    }
    let diff = a.number().abs_diff(b.number());
    diff == 1 || diff == 11
}

#[must_use]
pub fn energy_distance(a: u8, b: u8) -> u8 {
    a.abs_diff(b)
}

/// Distinct textures present on both sides.
#[must_use]
pub fn shared_textures(a: &[Texture], b: &[Texture]) -> HashSet<Texture> {
    let right: HashSet<Texture> = b.iter().copied().collect();
    a.iter().copied().filter(|t| right.contains(t)).collect()
}

/// Texture flag recorded on a transition: trivially true when either side
/// is untagged, otherwise true only with a shared texture.
#[must_use]
pub fn textures_continue(a: &[Texture], b: &[Texture]) -> bool {
    a.is_empty() || b.is_empty() || !shared_textures(a, b).is_empty()
}

/// Some but not all of `current`'s distinct textures reappear in `candidate`.
#[must_use]
pub fn is_partial_texture_overlap(current: &[Texture], candidate: &[Texture]) -> bool {
    let distinct: HashSet<Texture> = current.iter().copied().collect();
    let shared = shared_textures(current, candidate).len();
    shared > 0 && shared < distinct.len()
}
