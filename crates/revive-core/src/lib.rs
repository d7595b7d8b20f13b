//! # revive-core
//!
//! Keep one worker process alive across crashes.
//!
//! A [`Launcher`] starts the command and copies its stdout and stderr into a
//! shared [`OutputSink`]. It then waits for the child to exit. The retry loop
//! in [`supervisor`] relaunches it after a geometrically growing delay until
//! the configured retry limit is used up.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use revive_core::{config, signals, supervisor, Launcher, OutputSink};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cfg = config::load(&config::config_path()).unwrap();
//! let sink = OutputSink::open_or_discard(&cfg.sink_path);
//! let _shield = signals::shield_hangup().unwrap();
//!
//! let launcher = Launcher::new(vec!["my-worker".into(), "--port".into(), "8080".into()], sink)
//!     .unwrap();
//! let summary = supervisor::supervise(&cfg, &launcher).await;
//! assert_eq!(summary.attempts, cfg.retry_limit + 1);
//! # }
//! ```

pub mod backoff;
pub mod config;
pub mod launcher;
pub mod logs;
pub mod output;
pub mod signals;
pub mod supervisor;
pub mod types;

pub use backoff::Backoff;
pub use config::{ConfigError, SupervisorConfig};
pub use launcher::{LaunchError, Launcher};
pub use output::OutputSink;
pub use signals::HangupShield;
pub use types::*;
