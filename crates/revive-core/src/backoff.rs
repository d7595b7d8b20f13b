use std::time::Duration;

use crate::config::SupervisorConfig;

/// Milliseconds to wait before attempt `attempt`.
///
/// Attempt 0 never waits. Every later attempt waits
/// `base_ms * step^(attempt - 1)`, so the series runs 0, base, base·step,
/// base·step², ... Nothing here caps the result; large attempt indices with a
/// step above 1 grow without bound and may reach infinity.
pub fn delay_ms(attempt: u32, base_ms: u64, step: f64) -> f64 {
	if attempt == 0 {
		return 0.0;
	}
	let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
	base_ms as f64 * step.powi(exponent)
}

/// Converts a millisecond delay into a sleepable `Duration`.
///
/// Negative and NaN values become zero. Anything past the range of
/// `Duration` (including infinity) saturates to `Duration::MAX`.
pub fn to_duration(ms: f64) -> Duration {
	if ms.is_nan() || ms <= 0.0 {
		return Duration::ZERO;
	}
	let nanos = ms * 1_000_000.0;
	if nanos >= u64::MAX as f64 {
		return Duration::MAX;
	}
	Duration::from_nanos(nanos.round() as u64)
}

/// Delay schedule for one supervisor run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
	pub base_ms: u64,
	pub step: f64,
	/// Optional ceiling in milliseconds; `None` keeps the series unbounded.
	pub max_ms: Option<u64>,
}

impl Backoff {
	pub fn new(base_ms: u64, step: f64) -> Self {
		Self {
			base_ms,
			step,
			max_ms: None,
		}
	}

	pub fn from_config(config: &SupervisorConfig) -> Self {
		Self {
			base_ms: config.base_delay_ms,
			step: config.step_factor,
			max_ms: config.max_delay_ms,
		}
	}

	pub fn delay_ms(&self, attempt: u32) -> f64 {
		let ms = delay_ms(attempt, self.base_ms, self.step);
		match self.max_ms {
			Some(max) => ms.min(max as f64),
			None => ms,
		}
	}

	pub fn delay(&self, attempt: u32) -> Duration {
		to_duration(self.delay_ms(attempt))
	}
}
