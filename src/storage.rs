use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use thiserror::Error;

use crate::domain::{Day, Itinerary, TripSettings};

const DAYS_MARKER: &str = "\n=== DAYS ===\n";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML header: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("failed to encode TOML header: {0}")]
    TomlEncode(#[from] toml::ser::Error),
    #[error("failed to parse day on line {line}: {source}")]
    JsonDecode { line: usize, source: serde_json::Error },
    #[error("failed to encode day: {0}")]
    JsonEncode(serde_json::Error),
}

/// Reads a trip file. A missing or blank file means no trip has been created yet.
pub fn load_itinerary(path: &Path) -> Result<Option<Itinerary>, StorageError> {
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(StorageError::Io(err)),
    };

    if raw.trim().is_empty() {
        return Ok(None);
    }

    let (header_blob, days_blob) = raw.split_once(DAYS_MARKER).unwrap_or((raw.as_str(), ""));

    let settings: TripSettings = toml::from_str(header_blob)?;
    let mut days: Vec<Day> = Vec::new();
    for (index, line) in days_blob.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let day = serde_json::from_str(line).map_err(|source| StorageError::JsonDecode {
            line: index + 1,
            source,
        })?;
        days.push(day);
    }
    days.sort_by_key(|day| day.date);

    tracing::debug!(path = %path.display(), days = days.len(), "trip loaded");
    Ok(Some(Itinerary { settings, days }))
}

pub fn save_itinerary(path: &Path, itinerary: &Itinerary) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let header = toml::to_string_pretty(&itinerary.settings)?;
    let mut file = fs::File::create(path)?;
    file.write_all(header.as_bytes())?;
    file.write_all(DAYS_MARKER.as_bytes())?;

    for day in &itinerary.days {
        let line = serde_json::to_string(day).map_err(StorageError::JsonEncode)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
    }

    tracing::debug!(path = %path.display(), "trip saved");
    Ok(())
}
