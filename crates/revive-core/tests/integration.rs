use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use revive_core::config::{self, ConfigError, SupervisorConfig};
use revive_core::supervisor;
use revive_core::types::*;
use revive_core::{LaunchError, Launcher, OutputSink};

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

fn temp_dir(name: &str) -> std::path::PathBuf {
	let n = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
	let dir = std::env::temp_dir().join(format!("revive-test-{}-{}-{}", std::process::id(), n, name));
	let _ = std::fs::create_dir_all(&dir);
	dir
}

fn sh(script: &str) -> Vec<String> {
	vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

fn test_config(retry_limit: u32, base_delay_ms: u64, step_factor: f64) -> SupervisorConfig {
	SupervisorConfig {
		retry_limit,
		base_delay_ms,
		step_factor,
		..SupervisorConfig::default()
	}
}

fn exited() -> AttemptOutcome {
	AttemptOutcome::Exited {
		pid: 0,
		status: ExitKind::Code(0),
		stdout_bytes: 0,
		stderr_bytes: 0,
	}
}

// --- Retry loop ---

#[tokio::test(start_paused = true)]
async fn launches_retry_limit_plus_one_times() {
	for retry_limit in [0, 1, 2, 5, 17, 100] {
		let cfg = test_config(retry_limit, 10, 1.5);
		let mut seen = Vec::new();
		let summary = supervisor::run(&cfg, |i| {
			seen.push(i);
			async { exited() }
		})
		.await;

		assert_eq!(summary.attempts, retry_limit + 1);
		assert_eq!(summary.launch_failures, 0);
		assert_eq!(seen, (0..=retry_limit).collect::<Vec<_>>());
	}
}

#[tokio::test(start_paused = true)]
async fn single_attempt_without_delay() {
	// retry=0 sleep=1000 step=2
	let cfg = test_config(0, 1000, 2.0);
	let start = tokio::time::Instant::now();
	let mut launched_at = Vec::new();

	let summary = supervisor::run(&cfg, |_| {
		launched_at.push(tokio::time::Instant::now());
		async { exited() }
	})
	.await;

	assert_eq!(summary.attempts, 1);
	assert_eq!(launched_at.len(), 1);
	assert_eq!(launched_at[0] - start, Duration::ZERO);
	assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn delays_double_between_attempts() {
	// retry=3 sleep=100 step=2
	let cfg = test_config(3, 100, 2.0);
	let start = tokio::time::Instant::now();
	let mut launched_at = Vec::new();

	let summary = supervisor::run(&cfg, |_| {
		launched_at.push(tokio::time::Instant::now());
		async { exited() }
	})
	.await;

	assert_eq!(summary.attempts, 4);
	let gaps: Vec<Duration> = launched_at.windows(2).map(|w| w[1] - w[0]).collect();
	assert_eq!(launched_at[0] - start, Duration::ZERO);
	assert_eq!(
		gaps,
		vec![
			Duration::from_millis(100),
			Duration::from_millis(200),
			Duration::from_millis(400),
		]
	);
}

#[tokio::test(start_paused = true)]
async fn zero_step_gives_constant_delay() {
	let cfg = config::parse("[default]\nretry = 4\nsleep = 250\nstep = 0\n").unwrap();
	let mut launched_at = Vec::new();

	supervisor::run(&cfg, |_| {
		launched_at.push(tokio::time::Instant::now());
		async { exited() }
	})
	.await;

	let gaps: Vec<Duration> = launched_at.windows(2).map(|w| w[1] - w[0]).collect();
	assert_eq!(gaps, vec![Duration::from_millis(250); 4]);
}

#[tokio::test(start_paused = true)]
async fn ceiling_limits_delay() {
	let cfg = SupervisorConfig {
		max_delay_ms: Some(300),
		..test_config(4, 100, 3.0)
	};
	let mut launched_at = Vec::new();

	supervisor::run(&cfg, |_| {
		launched_at.push(tokio::time::Instant::now());
		async { exited() }
	})
	.await;

	let gaps: Vec<u128> = launched_at
		.windows(2)
		.map(|w| (w[1] - w[0]).as_millis())
		.collect();
	assert_eq!(gaps, vec![100, 300, 300, 300]);
}

#[tokio::test(start_paused = true)]
async fn launch_failures_consume_attempts() {
	let cfg = test_config(2, 50, 2.0);
	let summary = supervisor::run(&cfg, |i| async move {
		if i % 2 == 0 {
			AttemptOutcome::LaunchFailed(LaunchError::EmptyCommand)
		} else {
			exited()
		}
	})
	.await;

	assert_eq!(summary, RunSummary { attempts: 3, launch_failures: 2 });
}

// --- Launcher ---

#[test]
fn launcher_rejects_empty_command() {
	let sink = OutputSink::discard("unused.out".as_ref());
	assert!(matches!(Launcher::new(vec![], sink.clone()), Err(LaunchError::EmptyCommand)));
	assert!(matches!(Launcher::new(vec![String::new()], sink), Err(LaunchError::EmptyCommand)));
}

#[test]
fn launcher_command_line() {
	let sink = OutputSink::discard("unused.out".as_ref());
	let launcher = Launcher::new(sh("echo hi"), sink).unwrap();
	assert_eq!(launcher.command_line(), "sh -c echo hi");
	assert_eq!(launcher.argv().len(), 3);
}

#[tokio::test]
async fn launcher_captures_both_streams() {
	let dir = temp_dir("both-streams");
	let path = dir.join("nohup.out");
	let sink = OutputSink::open(&path).unwrap();

	let launcher = Launcher::new(sh("printf hello-out; printf hello-err >&2"), sink).unwrap();
	let outcome = launcher.launch(0).await;

	match outcome {
		AttemptOutcome::Exited { pid, status, stdout_bytes, stderr_bytes } => {
			assert!(pid > 0);
			assert_eq!(status, ExitKind::Code(0));
			assert_eq!(stdout_bytes, 9);
			assert_eq!(stderr_bytes, 9);
		}
		other => panic!("unexpected outcome: {:?}", other),
	}

	let text = std::fs::read_to_string(&path).unwrap();
	assert_eq!(text.len(), 18);
	assert!(text.contains("hello-out"), "output was: {}", text);
	assert!(text.contains("hello-err"), "output was: {}", text);

	let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn launcher_reports_exit_code() {
	let launcher = Launcher::new(sh("exit 3"), OutputSink::discard("unused.out".as_ref())).unwrap();
	match launcher.launch(0).await {
		AttemptOutcome::Exited { status, .. } => assert_eq!(status, ExitKind::Code(3)),
		other => panic!("unexpected outcome: {:?}", other),
	}
}

#[tokio::test]
async fn launcher_reports_signal() {
	let launcher =
		Launcher::new(sh("kill -9 $$"), OutputSink::discard("unused.out".as_ref())).unwrap();
	match launcher.launch(0).await {
		AttemptOutcome::Exited { status, .. } => {
			assert_eq!(status, ExitKind::Signal("SIGKILL".to_string()));
			assert_eq!(status.to_string(), "killed by SIGKILL");
		}
		other => panic!("unexpected outcome: {:?}", other),
	}
}

#[tokio::test]
async fn launcher_spawn_failure() {
	let launcher = Launcher::new(
		vec!["/nonexistent/revive-test-binary".to_string()],
		OutputSink::discard("unused.out".as_ref()),
	)
	.unwrap();
	let outcome = launcher.launch(4).await;
	assert!(outcome.is_launch_failure());
	assert!(matches!(outcome, AttemptOutcome::LaunchFailed(LaunchError::Spawn(_))));
}

#[tokio::test]
async fn launcher_drains_into_discarding_sink() {
	let dir = temp_dir("discard");
	let sink = OutputSink::open_or_discard(&dir);
	assert!(sink.is_discarding());

	// more than a pipe buffer, so the child would block if nobody read
	let launcher = Launcher::new(sh("head -c 200000 /dev/zero"), sink).unwrap();
	match launcher.launch(0).await {
		AttemptOutcome::Exited { status, stdout_bytes, .. } => {
			assert_eq!(status, ExitKind::Code(0));
			assert_eq!(stdout_bytes, 200_000);
		}
		other => panic!("unexpected outcome: {:?}", other),
	}

	let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn launcher_passes_arguments_verbatim() {
	let dir = temp_dir("argv");
	let path = dir.join("nohup.out");
	let sink = OutputSink::open(&path).unwrap();

	let argv = vec![
		"sh".to_string(),
		"-c".to_string(),
		"printf '%s|' \"$0\" \"$@\"".to_string(),
		"zero".to_string(),
		"a b".to_string(),
		"--flag".to_string(),
	];
	let launcher = Launcher::new(argv, sink).unwrap();
	launcher.launch(0).await;

	assert_eq!(std::fs::read_to_string(&path).unwrap(), "zero|a b|--flag|");
	let _ = std::fs::remove_dir_all(&dir);
}

// --- Full supervision ---

#[tokio::test]
async fn supervise_collects_every_attempt_output() {
	let dir = temp_dir("fifty");
	let path = dir.join("nohup.out");
	let sink = OutputSink::open(&path).unwrap();

	let launcher = Launcher::new(sh("printf A; printf B >&2"), sink).unwrap();
	let summary = supervisor::supervise(&test_config(49, 0, 1.0), &launcher).await;
	assert_eq!(summary, RunSummary { attempts: 50, launch_failures: 0 });

	let data = std::fs::read(&path).unwrap();
	assert_eq!(data.len(), 100);
	assert_eq!(data.iter().filter(|&&b| b == b'A').count(), 50);
	assert_eq!(data.iter().filter(|&&b| b == b'B').count(), 50);

	let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn supervise_relaunches_after_clean_exit() {
	let dir = temp_dir("clean");
	let path = dir.join("nohup.out");
	let sink = OutputSink::open(&path).unwrap();

	let launcher = Launcher::new(sh("echo run"), sink).unwrap();
	let summary = supervisor::supervise(&test_config(2, 1, 1.0), &launcher).await;
	assert_eq!(summary.attempts, 3);
	assert_eq!(std::fs::read_to_string(&path).unwrap(), "run\nrun\nrun\n");

	let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn supervise_keeps_going_when_command_missing() {
	let launcher = Launcher::new(
		vec!["revive-definitely-not-a-command".to_string()],
		OutputSink::discard("unused.out".as_ref()),
	)
	.unwrap();
	let summary = supervisor::supervise(&test_config(3, 0, 1.0), &launcher).await;
	assert_eq!(summary, RunSummary { attempts: 4, launch_failures: 4 });
}

#[tokio::test]
async fn sink_survives_across_supervisor_runs() {
	let dir = temp_dir("append-runs");
	let path = dir.join("worker.out");

	for _ in 0..2 {
		let sink = OutputSink::open(&path).unwrap();
		let launcher = Launcher::new(sh("printf x"), sink).unwrap();
		supervisor::supervise(&test_config(1, 0, 1.0), &launcher).await;
	}
	assert_eq!(std::fs::read_to_string(&path).unwrap(), "xxxx");

	let _ = std::fs::remove_dir_all(&dir);
}

// --- Config file ---

#[test]
fn config_file_round_trip() {
	let dir = temp_dir("config");
	let path = dir.join("supervisor.conf");
	std::fs::write(
		&path,
		"[default]\nretry = 10\nsleep = 2000\nstep = 1.5\nout = \"  \"\nlog = false\n",
	)
	.unwrap();

	let cfg = config::load(&path).unwrap();
	assert_eq!(cfg.retry_limit, 10);
	assert_eq!(cfg.base_delay_ms, 2000);
	assert_eq!(cfg.step_factor, 1.5);
	assert_eq!(cfg.sink_path, std::path::PathBuf::from(config::DEFAULT_OUTPUT_FILE));
	assert!(!cfg.log_enabled);

	let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn config_out_of_range_retry_prevents_launch() {
	let dir = temp_dir("config-bad");
	let path = dir.join("supervisor.conf");
	std::fs::write(&path, "[default]\nretry = 100000\n").unwrap();

	let err = config::load(&path).unwrap_err();
	assert!(matches!(err, ConfigError::Invalid { key: "retry", .. }));
	assert!(err.to_string().contains("retry"));

	let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn config_parse_error_names_file() {
	let dir = temp_dir("config-syntax");
	let path = dir.join("supervisor.conf");
	std::fs::write(&path, "[default]\nretry = = 3\n").unwrap();

	let err = config::load(&path).unwrap_err();
	assert!(matches!(err, ConfigError::Parse(_)));
	assert!(err.to_string().contains("supervisor.conf"));

	let _ = std::fs::remove_dir_all(&dir);
}
