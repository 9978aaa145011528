//! Target energy curves for a planned set.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Energy used when a curve has no entry for a position.
pub const FALLBACK_ENERGY: u8 = 5;

/// Shape of the energy trajectory across a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Progression {
    /// Low oscillating opening, steady build, peak easing back to 5.
    #[default]
    GradualBuild,
    /// Ramp from 2 to a peak of 8 at 65% of the set, then down to 3.
    PeakAndDescent,
    /// Alternating 5 and 6.
    Steady,
    /// Constant 5; what any unrecognised progression name maps to.
    Flat,
}

impl Progression {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GradualBuild => "gradual_build",
            Self::PeakAndDescent => "peak_and_descent",
            Self::Steady => "steady",
            Self::Flat => "flat",
        }
    }
}

impl fmt::Display for Progression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Progression {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "gradual_build" => Self::GradualBuild,
            "peak_and_descent" => Self::PeakAndDescent,
            "steady" => Self::Steady,
            _ => Self::Flat,
        })
    }
}

/// Produce one target energy per planned track.
///
/// Ramps truncate their linear interpolation toward zero, and every value
/// is clamped to 1..=10. The result always has exactly `num_tracks` entries.
#[must_use]
pub fn generate_energy_curve(num_tracks: usize, progression: Progression) -> Vec<u8> {
    let curve = match progression {
        Progression::GradualBuild => gradual_build(num_tracks),
        Progression::PeakAndDescent => peak_and_descent(num_tracks),
        Progression::Steady => (0..num_tracks).map(|i| 5 + (i % 2) as u8).collect(),
        Progression::Flat => vec![FALLBACK_ENERGY; num_tracks],
    };
    debug_assert_eq!(curve.len(), num_tracks);
    curve.into_iter().map(|e| e.clamp(1, 10)).collect()
}

/// Three phases: opening 2,3,4 repeating; build from 4 toward 7; peak at 7
/// easing down with a floor of 5. The last phase absorbs the remainder.
fn gradual_build(n: usize) -> Vec<u8> {
    let third = n / 3;
    let mut curve = Vec::with_capacity(n);

    curve.extend((0..third).map(|i| 2 + (i % 3) as u8));
    curve.extend((0..third).map(|i| 4 + (i * 3 / third) as u8));

    let rest = n - curve.len();
    curve.extend((0..rest).map(|i| {
        let drop = (i * 2 / rest) as u8;
        (7 - drop).max(5)
    }));
    curve
}

/// Ramp 2 to 8 up to the peak at 65%, then 8 down toward 3 with a floor of 3.
fn peak_and_descent(n: usize) -> Vec<u8> {
    // floor(n * 0.65) without float rounding surprises
    let peak_at = n * 65 / 100;
    let mut curve = Vec::with_capacity(n);

    curve.extend((0..peak_at).map(|i| 2 + (i * 6 / peak_at) as u8));

    let rest = n - peak_at;
    curve.extend((0..rest).map(|i| {
        let drop = (i * 5 / rest) as u8;
        8u8.saturating_sub(drop).max(3)
    }));
    curve
}
