use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use deltacov::cli::{self, Style};
use deltacov::pipeline::Config;

/// Measure how much coverage each Go test owns on its own.
///
/// Runs every test of a package in isolation and prints, per test, the
/// percentage of statements that no other test covers.
#[derive(Parser)]
#[command(name = "deltacov", version, about)]
struct Cli {
    /// Only print the delta coverage of this test.
    test: Option<String>,

    /// Directory of the Go package to analyse.
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// The `go` binary to invoke.
    #[arg(long, env = "DELTACOV_GO", default_value = "go")]
    go: PathBuf,

    /// Kill any single test run after this many seconds.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Keep the generated coverage profiles and log their location.
    #[arg(long)]
    keep_profiles: bool,

    /// Skip running tests; report from profiles already in this directory.
    #[arg(long, value_name = "DIR", conflicts_with_all = ["timeout", "keep_profiles"])]
    from_profiles: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Style::Text)]
    format: Style,

    /// Log each step to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(parse_exit_status(&e));
        }
    };
    init_logging(args.verbose);

    let result = match &args.from_profiles {
        Some(dir) => cli::cmd_from_profiles(dir, args.test.as_deref(), &args.format),
        None => {
            let config = Config {
                package_dir: args.dir.clone(),
                go: args.go.clone(),
                timeout: args.timeout.map(Duration::from_secs),
                keep_profiles: args.keep_profiles,
            };
            cli::cmd_run(&config, args.test.as_deref(), &args.format)
        }
    };

    match result {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout carries only the report.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// `--help` and `--version` succeed; every usage error exits 1.
fn parse_exit_status(e: &clap::Error) -> u8 {
    if e.use_stderr() {
        1
    } else {
        0
    }
}
