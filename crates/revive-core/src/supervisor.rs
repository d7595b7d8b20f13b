use std::future::Future;

use crate::backoff::Backoff;
use crate::config::SupervisorConfig;
use crate::launcher::Launcher;
use crate::types::{AttemptOutcome, RunSummary};

/// Drives attempts `0..=retry_limit` through `attempt`, sleeping the backoff
/// delay before each one, and returns once the limit is exhausted.
///
/// Attempts are strictly sequential. Every outcome, clean exit and launch
/// failure alike, consumes one attempt.
pub async fn run<F, Fut>(config: &SupervisorConfig, mut attempt: F) -> RunSummary
where
	F: FnMut(u32) -> Fut,
	Fut: Future<Output = AttemptOutcome>,
{
	let backoff = Backoff::from_config(config);
	let mut summary = RunSummary::default();
	let mut index: u32 = 0;

	while index <= config.retry_limit {
		let delay = backoff.delay(index);
		tracing::info!("waiting {} ms before attempt {}", delay.as_millis(), index);
		if !delay.is_zero() {
			tokio::time::sleep(delay).await;
		}

		let outcome = attempt(index).await;
		if outcome.is_launch_failure() {
			summary.launch_failures += 1;
		}
		summary.attempts += 1;
		index += 1;
	}

	tracing::error!(
		"retry limit reached after {} attempts ({} failed to start)",
		summary.attempts,
		summary.launch_failures
	);
	summary
}

/// Keeps relaunching `launcher`'s command until the retry limit is exhausted.
pub async fn supervise(config: &SupervisorConfig, launcher: &Launcher) -> RunSummary {
	run(config, move |index| launcher.launch(index)).await
}
