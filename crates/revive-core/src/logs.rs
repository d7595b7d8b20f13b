use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;

use crate::config::SupervisorConfig;

pub const LOG_FILE_NAME: &str = "supervisor.log";
pub const DEFAULT_MAX_LOG_SIZE: u64 = 500 * 1024 * 1024;
pub const LEVEL_ENV: &str = "REVIVE_LOG";

/// Installs the global subscriber: stderr always, plus `supervisor.log` when
/// the config enables logging to disk.
pub fn init(config: &SupervisorConfig) {
	let level = std::env::var(LEVEL_ENV)
		.ok()
		.and_then(|v| v.parse::<LevelFilter>().ok())
		.unwrap_or(LevelFilter::INFO);

	let file_layer = if config.log_enabled {
		match RotatingLog::open(LOG_FILE_NAME, DEFAULT_MAX_LOG_SIZE) {
			Ok(log) => Some(
				tracing_subscriber::fmt::layer()
					.with_ansi(false)
					.with_writer(log),
			),
			Err(e) => {
				eprintln!("warning: failed to open {}: {}", LOG_FILE_NAME, e);
				None
			}
		}
	} else {
		None
	};

	let _ = tracing_subscriber::registry()
		.with(level)
		.with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
		.with(file_layer)
		.try_init();
}

/// Append-only log file that rolls over once it grows past `max_size` bytes.
///
/// Cheap to clone; clones share the same file.
#[derive(Clone)]
pub struct RotatingLog {
	inner: Arc<Mutex<LogWriter>>,
}

struct LogWriter {
	file: Option<File>,
	path: PathBuf,
	bytes_written: u64,
	max_size: u64,
}

impl RotatingLog {
	pub fn open(path: impl Into<PathBuf>, max_size: u64) -> io::Result<Self> {
		let path = path.into();
		let file = open_append(&path)?;
		let bytes_written = file.metadata().map(|m| m.len()).unwrap_or(0);
		Ok(Self {
			inner: Arc::new(Mutex::new(LogWriter {
				file: Some(file),
				path,
				bytes_written,
				max_size,
			})),
		})
	}

	pub fn path(&self) -> PathBuf {
		self.lock().path.clone()
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, LogWriter> {
		self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}
}

impl Write for RotatingLog {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.lock().write(buf)?;
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		match self.lock().file.as_mut() {
			Some(file) => file.flush(),
			None => Ok(()),
		}
	}
}

impl<'a> MakeWriter<'a> for RotatingLog {
	type Writer = RotatingLog;

	fn make_writer(&'a self) -> Self::Writer {
		self.clone()
	}
}

impl LogWriter {
	fn write(&mut self, data: &[u8]) -> io::Result<()> {
		let Some(file) = self.file.as_mut() else {
			return Ok(());
		};
		file.write_all(data)?;
		self.bytes_written += data.len() as u64;

		if self.bytes_written >= self.max_size {
			self.rotate();
		}
		Ok(())
	}

	fn rotate(&mut self) {
		drop(self.file.take());

		let dir = match self.path.parent() {
			Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
			_ => PathBuf::from("."),
		};
		let stem = self
			.path
			.file_stem()
			.map(|s| s.to_string_lossy().into_owned())
			.unwrap_or_else(|| "supervisor".to_string());
		let rotated = dir.join(rotated_log_name(&dir, &stem));
		let _ = fs::rename(&self.path, &rotated);

		// A failed reopen leaves the writer discarding until the next start.
		self.file = open_append(&self.path).ok();
		self.bytes_written = 0;
	}
}

fn open_append(path: &Path) -> io::Result<File> {
	OpenOptions::new().create(true).append(true).open(path)
}

/// Name for a rolled-over log: `{stem} {yy-mmdd} {HH}.log`, falling back to
/// `{stem} {yy-mmdd} {HH}.{MM}.log` and then a counter when taken.
pub fn rotated_log_name(dir: &Path, stem: &str) -> String {
	let (y, m, d, hour, minute) = secs_to_datetime(now_secs());
	let date = format!("{:02}-{:02}{:02}", y % 100, m, d);

	let candidate = format!("{} {} {:02}.log", stem, date, hour);
	if !dir.join(&candidate).exists() {
		return candidate;
	}
	let candidate = format!("{} {} {:02}.{:02}.log", stem, date, hour, minute);
	if !dir.join(&candidate).exists() {
		return candidate;
	}
	let mut n = 1;
	loop {
		let candidate = format!("{} {} {:02}.{:02}-{}.log", stem, date, hour, minute, n);
		if !dir.join(&candidate).exists() {
			return candidate;
		}
		n += 1;
	}
}

fn now_secs() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}

/// Unix seconds to UTC `(year, month, day, hour, minute)`.
pub fn secs_to_datetime(secs: u64) -> (u32, u32, u32, u32, u32) {
	let days = (secs / 86_400) as i64;
	let rem = secs % 86_400;
	let hour = (rem / 3600) as u32;
	let minute = ((rem % 3600) / 60) as u32;

	// civil-from-days, shifted so the year starts in March
	let z = days + 719_468;
	let era = z.div_euclid(146_097);
	let doe = z.rem_euclid(146_097) as u32;
	let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
	let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
	let mp = (5 * doy + 2) / 153;
	let day = doy - (153 * mp + 2) / 5 + 1;
	let month = if mp < 10 { mp + 3 } else { mp - 9 };
	let year = yoe as i64 + era * 400 + if month <= 2 { 1 } else { 0 };

	(year as u32, month, day, hour, minute)
}
