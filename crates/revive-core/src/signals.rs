use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};

/// Keeps the supervisor alive when its controlling terminal hangs up.
///
/// Only SIGHUP is intercepted. SIGINT, SIGTERM and the rest keep their
/// default dispositions.
#[derive(Debug, Clone)]
pub struct HangupShield {
	received: Arc<AtomicU64>,
}

impl HangupShield {
	/// Number of hangups swallowed so far.
	pub fn received(&self) -> u64 {
		self.received.load(Ordering::Relaxed)
	}
}

/// Installs the SIGHUP handler and spawns the task that drains it.
///
/// Must be called inside a tokio runtime. The handler stays installed for the
/// life of the process.
pub fn shield_hangup() -> io::Result<HangupShield> {
	let mut hangups = signal(SignalKind::hangup())?;
	let received = Arc::new(AtomicU64::new(0));
	let counter = Arc::clone(&received);

	tokio::spawn(async move {
		while hangups.recv().await.is_some() {
			let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
			tracing::debug!("ignored SIGHUP ({} so far)", n);
		}
	});

	Ok(HangupShield { received })
}
