//! Track records and the closed vocabularies they are tagged with.
//!
//! A [`Track`] is immutable once it enters the library. It is shared by
//! `Arc` between the library, playlists and transitions and never copied.

use crate::error::{JourneyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Position on the Camelot wheel.
///
/// `A` codes are minor keys, `B` codes are major keys. The number is the
/// position on the 12-step circle of fifths; same number means relative
/// major/minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CamelotKey {
    #[serde(rename = "1A")]
    AFlatMinor,
    #[serde(rename = "2A")]
    EFlatMinor,
    #[serde(rename = "3A")]
    BFlatMinor,
    #[serde(rename = "4A")]
    FMinor,
    #[serde(rename = "5A")]
    CMinor,
    #[serde(rename = "6A")]
    GMinor,
    #[serde(rename = "7A")]
    DMinor,
    #[serde(rename = "8A")]
    AMinor,
    #[serde(rename = "9A")]
    EMinor,
    #[serde(rename = "10A")]
    BMinor,
    #[serde(rename = "11A")]
    FSharpMinor,
    #[serde(rename = "12A")]
    CSharpMinor,
    #[serde(rename = "1B")]
    BMajor,
    #[serde(rename = "2B")]
    FSharpMajor,
    #[serde(rename = "3B")]
    DFlatMajor,
    #[serde(rename = "4B")]
    AFlatMajor,
    #[serde(rename = "5B")]
    EFlatMajor,
    #[serde(rename = "6B")]
    BFlatMajor,
    #[serde(rename = "7B")]
    FMajor,
    #[serde(rename = "8B")]
    CMajor,
    #[serde(rename = "9B")]
    GMajor,
    #[serde(rename = "10B")]
    DMajor,
    #[serde(rename = "11B")]
    AMajor,
    #[serde(rename = "12B")]
    EMajor,
}

/// Camelot letter: `A` for minor, `B` for major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Minor,
    Major,
}

impl Mode {
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Minor => 'A',
            Self::Major => 'B',
        }
    }
}

impl CamelotKey {
    /// All 24 keys, minor ring first, in wheel order.
    pub const ALL: [CamelotKey; 24] = [
        Self::AFlatMinor,
        Self::EFlatMinor,
        Self::BFlatMinor,
        Self::FMinor,
        Self::CMinor,
        Self::GMinor,
        Self::DMinor,
        Self::AMinor,
        Self::EMinor,
        Self::BMinor,
        Self::FSharpMinor,
        Self::CSharpMinor,
        Self::BMajor,
        Self::FSharpMajor,
        Self::DFlatMajor,
        Self::AFlatMajor,
        Self::EFlatMajor,
        Self::BFlatMajor,
        Self::FMajor,
        Self::CMajor,
        Self::GMajor,
        Self::DMajor,
        Self::AMajor,
        Self::EMajor,
    ];

    /// Wheel position, 1 through 12.
    #[must_use]
    pub fn number(self) -> u8 {
        // Discriminants run 0..24: the minor ring, then the major ring.
        self as u8 % 12 + 1
    }

    #[must_use]
    pub fn mode(self) -> Mode {
        match self as u8 {
            0..=11 => Mode::Minor,
            _ => Mode::Major,
        }
    }

    /// Build a key from its wheel position and mode.
    #[must_use]
    pub fn from_parts(number: u8, mode: Mode) -> Option<Self> {
        if !(1..=12).contains(&number) {
            return None;
        }
        let offset = match mode {
            Mode::Minor => 0,
            Mode::Major => 12,
        };
        Self::ALL.get(offset + usize::from(number) - 1).copied()
    }

    /// The Camelot code, e.g. `"8A"`.
    #[must_use]
    pub fn code(self) -> String {
        format!("{}{}", self.number(), self.mode().letter())
    }
}

impl fmt::Display for CamelotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number(), self.mode().letter())
    }
}

impl FromStr for CamelotKey {
    type Err = JourneyError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = || JourneyError::InvalidKey(s.to_string());

        let letter = trimmed.chars().last().ok_or_else(invalid)?;
        let mode = match letter.to_ascii_uppercase() {
            'A' => Mode::Minor,
            'B' => Mode::Major,
            _ => return Err(invalid()),
        };
        let number: u8 = trimmed[..trimmed.len() - letter.len_utf8()]
            .parse()
            .map_err(|_| invalid())?;

        Self::from_parts(number, mode).ok_or_else(invalid)
    }
}

/// Stylistic texture tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Texture {
    Atmospheric,
    Percussive,
    Vocal,
    Melodic,
    Minimal,
    Layered,
    Dub,
    Tribal,
    Hypnotic,
    Organic,
}

impl Texture {
    pub const ALL: [Texture; 10] = [
        Self::Atmospheric,
        Self::Percussive,
        Self::Vocal,
        Self::Melodic,
        Self::Minimal,
        Self::Layered,
        Self::Dub,
        Self::Tribal,
        Self::Hypnotic,
        Self::Organic,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Atmospheric => "atmospheric",
            Self::Percussive => "percussive",
            Self::Vocal => "vocal",
            Self::Melodic => "melodic",
            Self::Minimal => "minimal",
            Self::Layered => "layered",
            Self::Dub => "dub",
            Self::Tribal => "tribal",
            Self::Hypnotic => "hypnotic",
            Self::Organic => "organic",
        }
    }
}

impl fmt::Display for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Texture {
    type Err = JourneyError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| JourneyError::Configuration(format!("Unknown texture: {s}")))
    }
}

/// Where in a set a track works best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyPosition {
    Opener,
    WarmUp,
    Builder,
    Core,
    Peak,
    Bridge,
    WindDown,
    Closer,
}

/// A marked point inside a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuePoint {
    /// Seconds from the start of the track.
    pub time: f64,
    pub label: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    1.0
}

fn default_energy() -> u8 {
    5
}

/// An annotated track in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub file_path: PathBuf,
    pub title: String,
    pub artist: String,

    pub bpm: f64,
    #[serde(default)]
    pub key: Option<CamelotKey>,
    /// Seconds.
    #[serde(default)]
    pub duration: f64,

    /// 1 (beatless) through 10 (climax).
    #[serde(default = "default_energy")]
    pub energy_level: u8,
    #[serde(default)]
    pub textures: Vec<Texture>,
    #[serde(default)]
    pub journey_position: Option<JourneyPosition>,

    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub genre: Vec<String>,

    #[serde(default)]
    pub intro_start: Option<f64>,
    #[serde(default)]
    pub intro_end: Option<f64>,
    #[serde(default)]
    pub outro_start: Option<f64>,
    #[serde(default)]
    pub outro_end: Option<f64>,
    #[serde(default)]
    pub cue_points: Vec<CuePoint>,

    #[serde(default)]
    pub num_beats: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

impl Track {
    /// A track with only the required fields set; everything else absent.
    #[must_use]
    pub fn new(
        file_path: impl Into<PathBuf>,
        title: impl Into<String>,
        artist: impl Into<String>,
        bpm: f64,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            title: title.into(),
            artist: artist.into(),
            bpm,
            key: None,
            duration: 0.0,
            energy_level: default_energy(),
            textures: Vec::new(),
            journey_position: None,
            label: None,
            genre: Vec::new(),
            intro_start: None,
            intro_end: None,
            outro_start: None,
            outro_end: None,
            cue_points: Vec::new(),
            num_beats: None,
            year: None,
            tags: Vec::new(),
            notes: String::new(),
        }
    }

    /// Check the record invariants: energy in 1..=10, positive tempo,
    /// non-negative duration.
    ///
    /// # Errors
    ///
    /// Returns [`JourneyError::Storage`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if !(1..=10).contains(&self.energy_level) {
            return Err(JourneyError::Storage(format!(
                "Track {} has energy level {} outside 1-10",
                self.file_path.display(),
                self.energy_level
            )));
        }
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(JourneyError::Storage(format!(
                "Track {} has non-positive tempo {}",
                self.file_path.display(),
                self.bpm
            )));
        }
        if !(self.duration.is_finite() && self.duration >= 0.0) {
            return Err(JourneyError::Storage(format!(
                "Track {} has negative duration {}",
                self.file_path.display(),
                self.duration
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn has_texture(&self, texture: Texture) -> bool {
        self.textures.contains(&texture)
    }

    /// `"artist - title"`, the form used by playlist exports.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camelot_codes_round_trip_through_text() {
        for key in CamelotKey::ALL {
            let parsed: CamelotKey = key.code().parse().expect("own code should parse");
            assert_eq!(parsed, key);
        }
        assert_eq!(CamelotKey::AMinor.code(), "8A");
        assert_eq!(CamelotKey::CMajor.to_string(), "8B");
        assert_eq!(CamelotKey::EMajor.code(), "12B");
    }

    #[test]
    fn test_camelot_parse_is_lenient_on_case_and_whitespace() {
        assert_eq!(" 8a ".parse::<CamelotKey>().unwrap(), CamelotKey::AMinor);
        assert_eq!("12b".parse::<CamelotKey>().unwrap(), CamelotKey::EMajor);
    }

    #[test]
    fn test_camelot_parse_rejects_malformed_codes() {
        for bad in ["", "A", "0A", "13A", "8C", "eightA", "8AB", "-1B"] {
            let err = bad.parse::<CamelotKey>().unwrap_err();
            assert!(matches!(err, JourneyError::InvalidKey(_)), "{bad:?}");
        }
    }

    #[test]
    fn test_camelot_number_and_mode() {
        assert_eq!(CamelotKey::AFlatMinor.number(), 1);
        assert_eq!(CamelotKey::AFlatMinor.mode(), Mode::Minor);
        assert_eq!(CamelotKey::BMajor.number(), 1);
        assert_eq!(CamelotKey::BMajor.mode(), Mode::Major);
        assert_eq!(CamelotKey::from_parts(8, Mode::Major), Some(CamelotKey::CMajor));
        assert_eq!(CamelotKey::from_parts(0, Mode::Major), None);
    }

    #[test]
    fn test_key_serializes_as_camelot_code() {
        let json = serde_json::to_string(&CamelotKey::GMajor).unwrap();
        assert_eq!(json, "\"9B\"");
        let back: CamelotKey = serde_json::from_str("\"10A\"").unwrap();
        assert_eq!(back, CamelotKey::BMinor);
    }

    #[test]
    fn test_texture_and_position_wire_names() {
        assert_eq!(serde_json::to_string(&Texture::Dub).unwrap(), "\"dub\"");
        assert_eq!(
            serde_json::to_string(&JourneyPosition::WindDown).unwrap(),
            "\"wind_down\""
        );
        assert_eq!("Hypnotic".parse::<Texture>().unwrap(), Texture::Hypnotic);
        assert!("glitch".parse::<Texture>().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_fields() {
        let ok = Track::new("/m/a.wav", "A", "X", 122.0);
        assert!(ok.validate().is_ok());

        let loud = Track { energy_level: 11, ..ok.clone() };
        assert!(loud.validate().is_err());
        let silent = Track { energy_level: 0, ..ok.clone() };
        assert!(silent.validate().is_err());
        let stopped = Track { bpm: 0.0, ..ok.clone() };
        assert!(stopped.validate().is_err());
        let negative = Track { duration: -1.0, ..ok };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_absent_optionals_stay_absent_after_json() {
        let track = Track::new("/m/a.wav", "A", "X", 122.0);
        let json = serde_json::to_string(&track).unwrap();
        let back: Track = serde_json::from_str(&json).unwrap();
        assert_eq!(back, track);
        assert!(back.key.is_none());
        assert!(back.outro_start.is_none());
    }

    #[test]
    fn test_minimal_record_gets_defaults() {
        let json = r#"{"file_path":"/m/b.wav","title":"B","artist":"Y","bpm":120.0}"#;
        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.energy_level, 5);
        assert_eq!(track.duration, 0.0);
        assert!(track.textures.is_empty());
    }
}
