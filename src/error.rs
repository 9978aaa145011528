//! Error types for journey planning.
//!
//! Library code returns [`JourneyError`]; the binary wraps it in `anyhow`
//! for context. A short playlist is not an error, see
//! [`crate::journey::PlanStatus`].

use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, JourneyError>;

#[derive(Error, Debug)]
pub enum JourneyError {
    /// Arc parameters that can never produce a plan.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Text that is not one of the 24 Camelot codes.
    #[error("Invalid Camelot key: {0:?} (expected 1A-12A or 1B-12B)")]
    InvalidKey(String),

    /// Nothing in the library passed the opener's tempo and energy filter.
    #[error(
        "No suitable opener found: no track between {min_bpm:.1} and {max_bpm:.1} BPM \
         within one level of energy {target_energy}"
    )]
    NoOpenerFound {
        min_bpm: f64,
        max_bpm: f64,
        target_energy: u8,
    },

    /// The catalog could not be loaded or saved.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl JourneyError {
    /// True for every failure of the persisted catalog or playlist files.
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Io(_) | Self::Json(_) | Self::Database(_)
        )
    }
}
