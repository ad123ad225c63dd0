use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const RECENT_TRIPS_FILE: &str = "recent_trips.toml";
const APP_DIR: &str = "trip_itinerary";
const FALLBACK_STATE_DIR: &str = ".trip_itinerary";

pub const TRIP_FILE_ENV: &str = "TRIP_ITINERARY_FILE";
pub const STATE_DIR_ENV: &str = "TRIP_ITINERARY_STATE_DIR";

#[derive(Debug, Error)]
pub enum TripsError {
	#[error("recent trips: {0}")]
	Io(#[from] std::io::Error),
	#[error("recent trips file is malformed: {0}")]
	Decode(#[from] toml::de::Error),
	#[error("failed to write recent trips: {0}")]
	Encode(#[from] toml::ser::Error),
	#[error("no trip selected: pass --trip <path>, set TRIP_ITINERARY_FILE, or set default_trip in config.toml")]
	NoTripSelected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentTrip {
	pub path: PathBuf,
	pub opened_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RecentTripsFile {
	#[serde(default, rename = "trip")]
	trips: Vec<RecentTrip>,
}

/// Where the trip file in use came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripSource {
	Flag,
	Env,
	Config,
	Recent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTrip {
	pub path: PathBuf,
	pub source: TripSource,
}

/// Most-recently-opened trips, newest first, capped at `limit`.
#[derive(Debug, Clone)]
pub struct RecentTrips {
	state_dir: PathBuf,
	limit: usize,
}

impl RecentTrips {
	pub fn new(state_dir: &Path, limit: usize) -> Self {
		Self {
			state_dir: state_dir.to_path_buf(),
			limit: limit.max(1),
		}
	}

	pub fn list(&self) -> Result<Vec<RecentTrip>, TripsError> {
		let raw = match fs::read_to_string(self.file()) {
			Ok(raw) => raw,
			Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
			Err(err) => return Err(err.into()),
		};

		let mut file: RecentTripsFile = toml::from_str(&raw)?;
		file.trips.truncate(self.limit);
		Ok(file.trips)
	}

	pub fn paths(&self) -> Result<Vec<PathBuf>, TripsError> {
		Ok(self.list()?.into_iter().map(|trip| trip.path).collect())
	}

	/// Moves `path` to the front with a fresh timestamp.
	pub fn remember(&self, path: &Path) -> Result<(), TripsError> {
		let path = absolutize(path);
		let mut trips = self.list().unwrap_or_else(|err| {
			tracing::warn!(%err, "discarding unreadable recent trips");
			Vec::new()
		});
		trips.retain(|trip| trip.path != path);
		trips.insert(
			0,
			RecentTrip {
				path,
				opened_at: Utc::now(),
			},
		);
		trips.truncate(self.limit);

		fs::create_dir_all(&self.state_dir)?;
		let encoded = toml::to_string_pretty(&RecentTripsFile { trips })?;
		fs::write(self.file(), encoded)?;
		Ok(())
	}

	fn file(&self) -> PathBuf {
		self.state_dir.join(RECENT_TRIPS_FILE)
	}
}

/// Picks the trip file: CLI flag, then `TRIP_ITINERARY_FILE`, then config, then the most recent one.
pub fn resolve_trip_path(
	cli_path: Option<PathBuf>,
	configured: Option<PathBuf>,
	recent: &RecentTrips,
) -> Result<ResolvedTrip, TripsError> {
	resolve_from(cli_path, env::var_os(TRIP_FILE_ENV), configured, recent)
}

fn resolve_from(
	cli_path: Option<PathBuf>,
	env_path: Option<OsString>,
	configured: Option<PathBuf>,
	recent: &RecentTrips,
) -> Result<ResolvedTrip, TripsError> {
	let env_path = env_path.filter(|raw| !raw.is_empty()).map(PathBuf::from);
	let explicit = [
		(cli_path, TripSource::Flag),
		(env_path, TripSource::Env),
		(configured, TripSource::Config),
	];
	if let Some((path, source)) = explicit
		.into_iter()
		.find_map(|(path, source)| path.map(|path| (path, source)))
	{
		return Ok(ResolvedTrip {
			path: absolutize(&path),
			source,
		});
	}

	match recent.paths() {
		Ok(paths) => paths
			.into_iter()
			.next()
			.map(|path| ResolvedTrip {
				path,
				source: TripSource::Recent,
			})
			.ok_or(TripsError::NoTripSelected),
		Err(err) => {
			tracing::warn!(%err, "recent trips unavailable");
			Err(TripsError::NoTripSelected)
		}
	}
}

/// `TRIP_ITINERARY_STATE_DIR`, else the platform state home, else `./.trip_itinerary`.
pub fn state_dir() -> PathBuf {
	env::var_os(STATE_DIR_ENV)
		.map(PathBuf::from)
		.or_else(platform_state_home)
		.unwrap_or_else(|| PathBuf::from(FALLBACK_STATE_DIR))
}

fn platform_state_home() -> Option<PathBuf> {
	let base = if cfg!(target_os = "windows") {
		env::var_os("LOCALAPPDATA").map(PathBuf::from)
	} else {
		env::var_os("XDG_STATE_HOME")
			.map(PathBuf::from)
			.or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("state")))
	};
	base.map(|base| base.join(APP_DIR))
}

fn absolutize(path: &Path) -> PathBuf {
	let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
	fs::canonicalize(&absolute).unwrap_or(absolute)
}

#[cfg(test)]
mod tests {
	use std::ffi::OsString;
	use std::fs;
	use std::path::PathBuf;

	use super::{RecentTrips, TripSource, TripsError, resolve_from};

	#[test]
	fn most_recent_trip_comes_first_without_duplicates() {
		let state = tempfile::tempdir().expect("temp dir");
		let recent = RecentTrips::new(state.path(), 10);
		let first = state.path().join("first.trip");
		let second = state.path().join("second.trip");

		recent.remember(&first).expect("remember");
		recent.remember(&second).expect("remember");
		recent.remember(&first).expect("remember");

		let rows = recent.list().expect("recent");
		assert_eq!(rows.len(), 2);
		assert_eq!(rows[0].path.file_name(), first.file_name());
		assert_eq!(rows[1].path.file_name(), second.file_name());
		assert!(rows[0].opened_at >= rows[1].opened_at);
	}

	#[test]
	fn recent_list_is_capped() {
		let state = tempfile::tempdir().expect("temp dir");
		let recent = RecentTrips::new(state.path(), 2);
		for name in ["a.trip", "b.trip", "c.trip"] {
			recent.remember(&state.path().join(name)).expect("remember");
		}

		let paths = recent.paths().expect("recent");
		assert_eq!(paths.len(), 2);
		assert_eq!(paths[0].file_name(), Some("c.trip".as_ref()));
	}

	#[test]
	fn no_recent_file_means_empty_list() {
		let state = tempfile::tempdir().expect("temp dir");
		assert!(RecentTrips::new(state.path(), 5).list().expect("recent").is_empty());
	}

	#[test]
	fn unreadable_recent_file_is_replaced_on_remember() {
		let state = tempfile::tempdir().expect("temp dir");
		fs::write(state.path().join("recent_trips.toml"), "trip = 3").expect("write");
		let recent = RecentTrips::new(state.path(), 5);
		assert!(matches!(recent.list(), Err(TripsError::Decode(_))));

		recent.remember(&state.path().join("kyoto.trip")).expect("remember");
		assert_eq!(recent.paths().expect("recent").len(), 1);
	}

	#[test]
	fn explicit_sources_win_in_order() {
		let state = tempfile::tempdir().expect("temp dir");
		let recent = RecentTrips::new(state.path(), 5);
		recent.remember(&state.path().join("recent.trip")).expect("remember");

		let flag = PathBuf::from("/trips/flag.trip");
		let env = OsString::from("/trips/env.trip");
		let configured = PathBuf::from("/trips/config.trip");

		let resolved = resolve_from(Some(flag), Some(env.clone()), Some(configured.clone()), &recent).expect("flag");
		assert_eq!(resolved.source, TripSource::Flag);

		let resolved = resolve_from(None, Some(env), Some(configured.clone()), &recent).expect("env");
		assert_eq!(resolved.source, TripSource::Env);

		let resolved = resolve_from(None, Some(OsString::new()), Some(configured), &recent).expect("config");
		assert_eq!(resolved.source, TripSource::Config);

		let resolved = resolve_from(None, None, None, &recent).expect("recent");
		assert_eq!(resolved.source, TripSource::Recent);
		assert_eq!(resolved.path.file_name(), Some("recent.trip".as_ref()));
	}

	#[test]
	fn nothing_to_resolve_is_an_error() {
		let state = tempfile::tempdir().expect("temp dir");
		let recent = RecentTrips::new(state.path(), 5);
		assert!(matches!(
			resolve_from(None, None, None, &recent),
			Err(TripsError::NoTripSelected)
		));
	}
}
