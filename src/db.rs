//! SQLite catalog storage.
//!
//! One row per track. Scalar fields get their own columns so the catalog
//! stays queryable from the `sqlite3` shell; list fields are JSON text.
//! Row order is insertion order, so a save followed by a load rebuilds an
//! identical library.

use crate::error::{JourneyError, Result};
use crate::library::TrackLibrary;
use crate::track::{CamelotKey, JourneyPosition, Track};
use log::{debug, info, trace};
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Open (or create) the catalog database and make sure the schema exists.
///
/// # Errors
///
/// Returns a storage error if the file cannot be opened or the schema
/// cannot be created.
pub fn connect(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path).map_err(|e| {
        JourneyError::Storage(format!(
            "Cannot open catalog database {}: {e}",
            db_path.display()
        ))
    })?;
    init_schema(&conn)?;
    debug!("Opened catalog database {}", db_path.display());
    Ok(conn)
}

/// Create the `tracks` table if it is missing.
///
/// # Errors
///
/// Propagates SQL failures.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tracks (
            id               INTEGER PRIMARY KEY,
            file_path        TEXT    NOT NULL,
            title            TEXT    NOT NULL,
            artist           TEXT    NOT NULL,
            bpm              REAL    NOT NULL,
            camelot_key      TEXT,
            duration         REAL    NOT NULL,
            energy_level     INTEGER NOT NULL,
            textures         TEXT    NOT NULL,
            journey_position TEXT,
            label            TEXT,
            genre            TEXT    NOT NULL,
            intro_start      REAL,
            intro_end        REAL,
            outro_start      REAL,
            outro_end        REAL,
            cue_points       TEXT    NOT NULL,
            num_beats        INTEGER,
            year             INTEGER,
            tags             TEXT    NOT NULL,
            notes            TEXT    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tracks_bpm ON tracks(bpm);
        CREATE INDEX IF NOT EXISTS idx_tracks_key ON tracks(camelot_key);",
    )?;
    Ok(())
}

/// Number of stored tracks.
///
/// # Errors
///
/// Propagates SQL failures.
pub fn track_count(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))?;
    Ok(usize::try_from(count).unwrap_or_default())
}

/// Store every track of `library`.
///
/// With `replace`, the existing catalog is cleared first; otherwise tracks
/// are appended. Runs in a single transaction.
///
/// # Errors
///
/// Propagates SQL and serialization failures; nothing is written on error.
pub fn save_library(conn: &mut Connection, library: &TrackLibrary, replace: bool) -> Result<usize> {
    let tx = conn.transaction()?;

    if replace {
        let removed = tx.execute("DELETE FROM tracks", [])?;
        debug!("Cleared {removed} tracks from catalog");
    }

    {
        let mut stmt = tx.prepare(
            "INSERT INTO tracks (
                file_path, title, artist, bpm, camelot_key, duration, energy_level,
                textures, journey_position, label, genre,
                intro_start, intro_end, outro_start, outro_end,
                cue_points, num_beats, year, tags, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
        )?;

        for track in library.iter() {
            trace!("Storing {}", track.file_path.display());
            stmt.execute(params![
                track.file_path.to_string_lossy().into_owned(),
                track.title,
                track.artist,
                track.bpm,
                track.key.map(|k| k.code()),
                track.duration,
                track.energy_level,
                serde_json::to_string(&track.textures)?,
                track.journey_position.map(enum_to_text).transpose()?,
                track.label,
                serde_json::to_string(&track.genre)?,
                track.intro_start,
                track.intro_end,
                track.outro_start,
                track.outro_end,
                serde_json::to_string(&track.cue_points)?,
                track.num_beats,
                track.year,
                serde_json::to_string(&track.tags)?,
                track.notes,
            ])?;
        }
    }

    tx.commit()?;
    info!("Stored {} tracks in catalog", library.len());
    Ok(library.len())
}

/// Raw column values, converted to a [`Track`] outside the row callback so
/// JSON errors can surface as storage errors.
struct TrackRow {
    file_path: String,
    title: String,
    artist: String,
    bpm: f64,
    camelot_key: Option<String>,
    duration: f64,
    energy_level: u8,
    textures: String,
    journey_position: Option<String>,
    label: Option<String>,
    genre: String,
    intro_start: Option<f64>,
    intro_end: Option<f64>,
    outro_start: Option<f64>,
    outro_end: Option<f64>,
    cue_points: String,
    num_beats: Option<u32>,
    year: Option<i32>,
    tags: String,
    notes: String,
}

impl TrackRow {
    fn into_track(self) -> Result<Track> {
        let storage = |what: &str, e: &dyn std::fmt::Display| {
            JourneyError::Storage(format!("Bad {what} for {}: {e}", self.file_path))
        };

        let key = self
            .camelot_key
            .as_deref()
            .map(str::parse::<CamelotKey>)
            .transpose()
            .map_err(|e| storage("camelot_key", &e))?;
        let journey_position = self
            .journey_position
            .as_deref()
            .map(enum_from_text::<JourneyPosition>)
            .transpose()
            .map_err(|e| storage("journey_position", &e))?;
        let textures = serde_json::from_str(&self.textures).map_err(|e| storage("textures", &e))?;
        let genre = serde_json::from_str(&self.genre).map_err(|e| storage("genre", &e))?;
        let cue_points =
            serde_json::from_str(&self.cue_points).map_err(|e| storage("cue_points", &e))?;
        let tags = serde_json::from_str(&self.tags).map_err(|e| storage("tags", &e))?;

        Ok(Track {
            file_path: PathBuf::from(&self.file_path),
            title: self.title,
            artist: self.artist,
            bpm: self.bpm,
            key,
            duration: self.duration,
            energy_level: self.energy_level,
            textures,
            journey_position,
            label: self.label,
            genre,
            intro_start: self.intro_start,
            intro_end: self.intro_end,
            outro_start: self.outro_start,
            outro_end: self.outro_end,
            cue_points,
            num_beats: self.num_beats,
            year: self.year,
            tags,
            notes: self.notes,
        })
    }
}

/// Load the whole catalog into a fresh library.
///
/// # Errors
///
/// Returns a storage error on SQL failures or on any row that does not
/// decode into a valid track.
pub fn load_library(conn: &Connection) -> Result<TrackLibrary> {
    let mut stmt = conn.prepare(
        "SELECT file_path, title, artist, bpm, camelot_key, duration, energy_level,
                textures, journey_position, label, genre,
                intro_start, intro_end, outro_start, outro_end,
                cue_points, num_beats, year, tags, notes
         FROM tracks ORDER BY id",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(TrackRow {
            file_path: row.get(0)?,
            title: row.get(1)?,
            artist: row.get(2)?,
            bpm: row.get(3)?,
            camelot_key: row.get(4)?,
            duration: row.get(5)?,
            energy_level: row.get(6)?,
            textures: row.get(7)?,
            journey_position: row.get(8)?,
            label: row.get(9)?,
            genre: row.get(10)?,
            intro_start: row.get(11)?,
            intro_end: row.get(12)?,
            outro_start: row.get(13)?,
            outro_end: row.get(14)?,
            cue_points: row.get(15)?,
            num_beats: row.get(16)?,
            year: row.get(17)?,
            tags: row.get(18)?,
            notes: row.get(19)?,
        })
    })?;

    let mut tracks = Vec::new();
    for row in rows {
        tracks.push(row?.into_track()?);
    }

    let library = TrackLibrary::from_tracks(tracks)?;
    info!("Loaded {} tracks from catalog database", library.len());
    Ok(library)
}

/// Open the database at `db_path` and load it.
///
/// # Errors
///
/// See [`connect`] and [`load_library`].
pub fn load_library_from(db_path: &Path) -> Result<TrackLibrary> {
    if !db_path.exists() {
        return Err(JourneyError::Storage(format!(
            "Catalog database not found: {}. Run `journey import <catalog.json>` first.",
            db_path.display()
        )));
    }
    let conn = connect(db_path)?;
    load_library(&conn)
}

fn enum_to_text<T: Serialize>(value: T) -> Result<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(JourneyError::Storage(format!("Expected a name, got {other}"))),
    }
}

fn enum_from_text<T: DeserializeOwned>(text: &str) -> serde_json::Result<T> {
    serde_json::from_value(serde_json::Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{CuePoint, Texture};
    use tempfile::TempDir;

    fn full_track() -> Track {
        Track {
            key: Some(CamelotKey::FSharpMinor),
            duration: 412.5,
            energy_level: 6,
            textures: vec![Texture::Hypnotic, Texture::Dub],
            journey_position: Some(JourneyPosition::WindDown),
            label: Some("Styrax Records".into()),
            genre: vec!["Deep House".into()],
            intro_start: Some(0.0),
            intro_end: Some(31.2),
            outro_start: Some(380.0),
            outro_end: Some(412.5),
            cue_points: vec![CuePoint {
                time: 64.0,
                label: "Drop".into(),
                color: Some("#ff0000".into()),
                confidence: 0.8,
            }],
            num_beats: Some(840),
            year: Some(2009),
            tags: vec!["vinyl".into()],
            notes: "long intro".into(),
            ..Track::new("/music/deep/one.flac", "One", "Someone", 121.5)
        }
    }

    #[test]
    fn test_round_trip_preserves_every_field() -> Result<()> {
        let dir = TempDir::new()?;
        let mut conn = connect(&dir.path().join("library.db"))?;

        let bare = Track::new("/music/bare.wav", "Bare", "Nobody", 118.0);
        let library: TrackLibrary = vec![full_track(), bare].into_iter().collect();
        assert_eq!(save_library(&mut conn, &library, true)?, 2);

        let loaded = load_library(&conn)?;
        let before: Vec<&Track> = library.iter().map(|t| t.as_ref()).collect();
        let after: Vec<&Track> = loaded.iter().map(|t| t.as_ref()).collect();
        assert_eq!(before, after);
        assert!(after[1].key.is_none());
        assert!(after[1].journey_position.is_none());
        Ok(())
    }

    #[test]
    fn test_replace_versus_append() -> Result<()> {
        let dir = TempDir::new()?;
        let mut conn = connect(&dir.path().join("library.db"))?;
        let library: TrackLibrary = vec![full_track()].into_iter().collect();

        save_library(&mut conn, &library, false)?;
        save_library(&mut conn, &library, false)?;
        assert_eq!(track_count(&conn)?, 2);

        save_library(&mut conn, &library, true)?;
        assert_eq!(track_count(&conn)?, 1);
        Ok(())
    }

    #[test]
    fn test_corrupt_row_is_a_storage_error() -> Result<()> {
        let dir = TempDir::new()?;
        let mut conn = connect(&dir.path().join("library.db"))?;
        let library: TrackLibrary = vec![full_track()].into_iter().collect();
        save_library(&mut conn, &library, true)?;

        conn.execute("UPDATE tracks SET camelot_key = '14C'", [])?;
        assert!(load_library(&conn).unwrap_err().is_storage());

        conn.execute("UPDATE tracks SET camelot_key = NULL, energy_level = 0", [])?;
        assert!(load_library(&conn).unwrap_err().is_storage());
        Ok(())
    }

    #[test]
    fn test_missing_database_is_reported() {
        let err = load_library_from(Path::new("/nonexistent/journey/library.db")).unwrap_err();
        assert!(err.is_storage());
    }
}
