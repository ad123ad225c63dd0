use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "TRIP_ITINERARY_LOG";
const LOG_FILE: &str = "trip_itinerary.log";

/// Starts file logging under `state_dir` and returns the log path.
///
/// Output goes to a file so the dashboard owns the terminal. `TRIP_ITINERARY_LOG`
/// overrides `level`.
pub fn init_logging(state_dir: &Path, level: &str) -> Result<PathBuf, String> {
	fs::create_dir_all(state_dir)
		.map_err(|err| format!("failed to create log directory `{}`: {err}", state_dir.display()))?;

	let path = state_dir.join(LOG_FILE);
	let file = OpenOptions::new()
		.create(true)
		.append(true)
		.open(&path)
		.map_err(|err| format!("failed to open log file `{}`: {err}", path.display()))?;

	let filter = EnvFilter::try_from_env(LOG_ENV)
		.or_else(|_| EnvFilter::try_new(level))
		.map_err(|err| format!("invalid log level `{level}`: {err}"))?;

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(Mutex::new(file))
		.with_ansi(false)
		.with_target(false)
		.try_init()
		.map_err(|err| format!("failed to start logger: {err}"))?;

	tracing::info!(version = env!("CARGO_PKG_VERSION"), os = std::env::consts::OS, "app start");
	Ok(path)
}
