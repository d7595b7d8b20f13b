use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use crate::launcher::LaunchError;

/// How a reaped child ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitKind {
	Code(i32),
	Signal(String),
	/// The wait itself failed, so the status was never collected.
	Unknown,
}

impl From<ExitStatus> for ExitKind {
	fn from(status: ExitStatus) -> Self {
		if let Some(code) = status.code() {
			return ExitKind::Code(code);
		}
		match status.signal() {
			Some(sig) => match nix::sys::signal::Signal::try_from(sig) {
				Ok(signal) => ExitKind::Signal(signal.as_str().to_string()),
				Err(_) => ExitKind::Signal(format!("signal {}", sig)),
			},
			None => ExitKind::Unknown,
		}
	}
}

impl std::fmt::Display for ExitKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ExitKind::Code(code) => write!(f, "exit {}", code),
			ExitKind::Signal(name) => write!(f, "killed by {}", name),
			ExitKind::Unknown => write!(f, "status unknown"),
		}
	}
}

/// Result of one attempt. Both variants consume the attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
	Exited {
		pid: u32,
		status: ExitKind,
		stdout_bytes: u64,
		stderr_bytes: u64,
	},
	LaunchFailed(LaunchError),
}

impl AttemptOutcome {
	pub fn is_launch_failure(&self) -> bool {
		matches!(self, AttemptOutcome::LaunchFailed(_))
	}
}

/// What the retry loop did before giving up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
	pub attempts: u32,
	pub launch_failures: u32,
}
