use std::io;
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::output::OutputSink;
use crate::types::{AttemptOutcome, ExitKind};

#[derive(Debug)]
pub enum LaunchError {
	/// No executable was given.
	EmptyCommand,
	/// The OS refused to start the child (not found, permission denied, ...).
	Spawn(io::Error),
}

impl std::fmt::Display for LaunchError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			LaunchError::EmptyCommand => write!(f, "no command to run"),
			LaunchError::Spawn(e) => write!(f, "spawn failed: {}", e),
		}
	}
}

impl std::error::Error for LaunchError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			LaunchError::Spawn(e) => Some(e),
			LaunchError::EmptyCommand => None,
		}
	}
}

/// Starts the supervised command, streams its output into the sink and reaps it.
///
/// The same argument vector is reused for every attempt. `argv[0]` is the
/// executable (resolved through `PATH`) and is also passed as the child's own
/// `argv[0]`.
#[derive(Debug, Clone)]
pub struct Launcher {
	argv: Vec<String>,
	sink: OutputSink,
}

impl Launcher {
	pub fn new(argv: Vec<String>, sink: OutputSink) -> Result<Self, LaunchError> {
		if argv.first().map_or(true, |cmd| cmd.is_empty()) {
			return Err(LaunchError::EmptyCommand);
		}
		Ok(Self { argv, sink })
	}

	pub fn argv(&self) -> &[String] {
		&self.argv
	}

	pub fn sink(&self) -> &OutputSink {
		&self.sink
	}

	pub fn command_line(&self) -> String {
		self.argv.join(" ")
	}

	/// Runs one attempt to completion.
	///
	/// Returns only after the child has been reaped and both stream copies
	/// have hit end-of-input, so every byte the child wrote is already in the
	/// sink.
	pub async fn launch(&self, attempt: u32) -> AttemptOutcome {
		let mut child = match self.spawn() {
			Ok(child) => child,
			Err(e) => {
				tracing::warn!(
					"command [{}] failed to start: {}, attempt {}",
					self.command_line(),
					e,
					attempt
				);
				return AttemptOutcome::LaunchFailed(e);
			}
		};

		let pid = child.id().unwrap_or(0);
		tracing::info!("command [{}] started, pid {}", self.command_line(), pid);

		let stdout = match child.stdout.take() {
			Some(stream) => Some(tokio::spawn(pipe_output(stream, self.sink.clone()))),
			None => {
				tracing::warn!("bind stdout failed for pid {}", pid);
				None
			}
		};
		let stderr = match child.stderr.take() {
			Some(stream) => Some(tokio::spawn(pipe_output(stream, self.sink.clone()))),
			None => {
				tracing::warn!("bind stderr failed for pid {}", pid);
				None
			}
		};

		let status = match child.wait().await {
			Ok(status) => ExitKind::from(status),
			Err(e) => {
				tracing::warn!("wait on pid {} failed: {}", pid, e);
				ExitKind::Unknown
			}
		};

		let stdout_bytes = join_pipe(stdout, "stdout").await;
		let stderr_bytes = join_pipe(stderr, "stderr").await;
		tracing::debug!(
			"pid {} wrote {} bytes to stdout, {} to stderr",
			pid,
			stdout_bytes,
			stderr_bytes
		);

		tracing::warn!("process {} died ({})", pid, status);

		AttemptOutcome::Exited {
			pid,
			status,
			stdout_bytes,
			stderr_bytes,
		}
	}

	fn spawn(&self) -> Result<Child, LaunchError> {
		let (program, args) = self.argv.split_first().ok_or(LaunchError::EmptyCommand)?;
		let mut cmd = Command::new(program);
		cmd.args(args)
			.stdout(Stdio::piped())
			.stderr(Stdio::piped());

		cmd.spawn().map_err(LaunchError::Spawn)
	}
}

/// Copies one stream into the sink until end-of-input. Returns the bytes read.
async fn pipe_output<R: AsyncRead + Unpin>(mut reader: R, sink: OutputSink) -> u64 {
	let mut buf = [0u8; 4096];
	let mut total = 0u64;
	loop {
		match reader.read(&mut buf).await {
			Ok(0) => break,
			Ok(n) => {
				if let Err(e) = sink.write(&buf[..n]) {
					tracing::debug!("write to {} failed: {}", sink.path().display(), e);
				}
				total += n as u64;
			}
			Err(e) => {
				tracing::debug!("read from child failed: {}", e);
				break;
			}
		}
	}
	total
}

async fn join_pipe(handle: Option<JoinHandle<u64>>, stream: &str) -> u64 {
	let Some(handle) = handle else {
		return 0;
	};
	match handle.await {
		Ok(bytes) => bytes,
		Err(e) => {
			tracing::warn!("{} copy task failed: {}", stream, e);
			0
		}
	}
}
