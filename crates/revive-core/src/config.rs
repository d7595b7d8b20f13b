use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "supervisor.conf";
pub const CONFIG_ENV: &str = "REVIVE_CONFIG";
pub const DEFAULT_OUTPUT_FILE: &str = "nohup.out";

pub const MAX_RETRY: i64 = 99_999;
pub const MAX_STEP: f64 = 1000.0;

/// Validated supervisor settings. Built once at startup and passed by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorConfig {
	/// Retries after the first attempt; the loop launches `retry_limit + 1` times.
	pub retry_limit: u32,
	pub base_delay_ms: u64,
	pub step_factor: f64,
	pub max_delay_ms: Option<u64>,
	pub sink_path: PathBuf,
	pub log_enabled: bool,
}

impl Default for SupervisorConfig {
	fn default() -> Self {
		Self {
			retry_limit: 0,
			base_delay_ms: 0,
			step_factor: 1.0,
			max_delay_ms: None,
			sink_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
			log_enabled: false,
		}
	}
}

#[derive(Debug)]
pub enum ConfigError {
	/// The config file could not be read (usually missing).
	Read(PathBuf, io::Error),
	/// The file is not valid TOML or a value has the wrong type.
	Parse(String),
	/// A value is outside its allowed range.
	Invalid { key: &'static str, reason: String },
}

impl std::fmt::Display for ConfigError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ConfigError::Read(path, e) => write!(f, "failed to read {}: {}", path.display(), e),
			ConfigError::Parse(e) => write!(f, "failed to parse config: {}", e),
			ConfigError::Invalid { key, reason } => write!(f, "invalid `{}`: {}", key, reason),
		}
	}
}

impl std::error::Error for ConfigError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			ConfigError::Read(_, e) => Some(e),
			_ => None,
		}
	}
}

// ── supervisor.conf format ──────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
	#[serde(default)]
	default: RawSettings,
}

/// Missing keys take their zero value, matching a lookup that ignores misses.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
	retry: i64,
	sleep: i64,
	step: f64,
	out: String,
	log: bool,
	max_sleep: Option<i64>,
}

/// Config file location: `$REVIVE_CONFIG`, else `supervisor.conf` in the working directory.
pub fn config_path() -> PathBuf {
	match std::env::var(CONFIG_ENV) {
		Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
		_ => PathBuf::from(DEFAULT_CONFIG_FILE),
	}
}

pub fn load(path: &Path) -> Result<SupervisorConfig, ConfigError> {
	let content =
		std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
	parse(&content).map_err(|e| match e {
		ConfigError::Parse(msg) => ConfigError::Parse(format!("{}: {}", path.display(), msg)),
		other => other,
	})
}

pub fn parse(content: &str) -> Result<SupervisorConfig, ConfigError> {
	let file: ConfigFile =
		toml::from_str(content).map_err(|e| ConfigError::Parse(e.message().to_string()))?;
	validate(file.default)
}

fn validate(raw: RawSettings) -> Result<SupervisorConfig, ConfigError> {
	if !(0..=MAX_RETRY).contains(&raw.retry) {
		return Err(ConfigError::Invalid {
			key: "retry",
			reason: format!("{} is outside 0-{}", raw.retry, MAX_RETRY),
		});
	}

	// NaN fails the range check too
	if !(0.0..=MAX_STEP).contains(&raw.step) {
		return Err(ConfigError::Invalid {
			key: "step",
			reason: format!("{} is outside 0-{}", raw.step, MAX_STEP),
		});
	}
	let step_factor = if raw.step == 0.0 { 1.0 } else { raw.step };

	if raw.sleep < 0 {
		return Err(ConfigError::Invalid {
			key: "sleep",
			reason: format!("{} is negative", raw.sleep),
		});
	}

	let max_delay_ms = match raw.max_sleep {
		Some(ms) if ms < 0 => {
			return Err(ConfigError::Invalid {
				key: "max_sleep",
				reason: format!("{} is negative", ms),
			});
		}
		Some(ms) => Some(ms as u64),
		None => None,
	};

	let out = raw.out.trim();
	let sink_path = if out.is_empty() {
		PathBuf::from(DEFAULT_OUTPUT_FILE)
	} else {
		PathBuf::from(out)
	};

	Ok(SupervisorConfig {
		retry_limit: raw.retry as u32,
		base_delay_ms: raw.sleep as u64,
		step_factor,
		max_delay_ms,
		sink_path,
		log_enabled: raw.log,
	})
}
