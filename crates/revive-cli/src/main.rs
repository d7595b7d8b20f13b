use owo_colors::OwoColorize;
use revive_core::{config, logs, signals, supervisor, Launcher, OutputSink};

const EXIT_RETRY_EXHAUSTED: i32 = 1;
const EXIT_USAGE: i32 = 2;

#[tokio::main]
async fn main() {
	let args: Vec<String> = std::env::args().skip(1).collect();

	if args.len() == 1 {
		match args[0].as_str() {
			"-h" | "--help" => {
				print_usage();
				return;
			}
			"-V" | "--version" => {
				println!("revive {}", env!("CARGO_PKG_VERSION"));
				return;
			}
			_ => {}
		}
	}

	let config_path = config::config_path();
	let cfg = match config::load(&config_path) {
		Ok(cfg) => cfg,
		Err(e) => {
			eprintln!("{} {}", "error:".red().bold(), e);
			std::process::exit(EXIT_USAGE);
		}
	};

	logs::init(&cfg);

	if args.is_empty() {
		tracing::error!("no command to run");
		eprintln!();
		print_usage();
		std::process::exit(EXIT_USAGE);
	}

	let sink = OutputSink::open_or_discard(&cfg.sink_path);

	if let Err(e) = signals::shield_hangup() {
		tracing::warn!("could not install SIGHUP handler: {}", e);
	}

	let launcher = match Launcher::new(args, sink) {
		Ok(launcher) => launcher,
		Err(e) => {
			tracing::error!("{}", e);
			std::process::exit(EXIT_USAGE);
		}
	};

	supervisor::supervise(&cfg, &launcher).await;
	std::process::exit(EXIT_RETRY_EXHAUSTED);
}

fn print_usage() {
	eprintln!("{} {} — keep a command running", "revive".bold(), env!("CARGO_PKG_VERSION"));
	eprintln!();
	eprintln!("usage: {} <command> [args...]", "revive".bold());
	eprintln!();
	eprintln!("The command is relaunched every time it exits, waiting sleep * step^(n-1) ms");
	eprintln!("before retry n, until `retry` retries have been made. stdout and stderr of");
	eprintln!("every run are appended to the `out` file. SIGHUP is ignored.");
	eprintln!();
	eprintln!("{}", "config".cyan().bold());
	eprintln!(
		"  read from ./{} (override with ${}):",
		config::DEFAULT_CONFIG_FILE,
		config::CONFIG_ENV
	);
	eprintln!();
	eprintln!("  [default]");
	eprintln!("  retry = 5            # retries after the first run, 0-{}", config::MAX_RETRY);
	eprintln!("  sleep = 1000         # base delay in ms");
	eprintln!("  step = 2.0           # delay multiplier, 0-{} (0 means 1)", config::MAX_STEP);
	eprintln!("  out = \"{}\"      # output file", config::DEFAULT_OUTPUT_FILE);
	eprintln!("  log = false          # also write {}", logs::LOG_FILE_NAME);
	eprintln!("  # max_sleep = 60000  # optional delay ceiling in ms");
	eprintln!();
	eprintln!("{}", "environment".cyan().bold());
	eprintln!("  {}  log level (error, warn, info, debug, trace)", logs::LEVEL_ENV);
}
