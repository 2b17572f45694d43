//! Dorbo Controller Tool
//!
//! Lists and updates the credentials stored on a Dorbo door access controller
//! attached to a serial port.

mod actions;
mod error;
mod fobs;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dorbo_protocol::Controller;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::actions::Action;
use crate::error::CliError;
use crate::settings::Overrides;

/// Manage credentials stored on a Dorbo door access controller
#[derive(Parser, Debug)]
#[command(name = "dorbo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Manage credentials stored on a Dorbo door access controller", long_about = None)]
struct Args {
    /// Serial device the controller is attached to (e.g. /dev/ttyACM0 or COM1)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate [default: 115200]
    #[arg(short, long)]
    baud: Option<u32>,

    /// Per-line read timeout in seconds [default: 5]
    #[arg(short, long, value_name = "SECS")]
    timeout: Option<f64>,

    /// YAML file with connection settings
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log every line sent and received
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    action: Action,
}

fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let overrides = Overrides {
        port: args.port.clone(),
        baud_rate: args.baud,
        read_timeout_secs: args.timeout,
    };
    let config = settings::load(args.config.as_deref(), &overrides)?;
    debug!(?config, "connecting");

    let mut controller = Controller::open(&config)?;
    let stdout = std::io::stdout();
    let result = actions::run(&mut controller, &args.action, &mut stdout.lock());
    controller.close();
    result
}

/// Setup logging with tracing
fn setup_logging(verbose: bool) {
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set() {
        let args = Args::try_parse_from(["dorbo", "--port", "/dev/ttyACM0", "set", "7", "44", "12312"]).unwrap();
        assert_eq!(args.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(args.action, Action::Set { index: 7, facility: 44, user: 12312 });
    }

    #[test]
    fn test_parse_rejects_out_of_range_facility() {
        assert!(Args::try_parse_from(["dorbo", "set", "7", "256", "1"]).is_err());
    }

    #[test]
    fn test_parse_list_json_with_config() {
        let args = Args::try_parse_from(["dorbo", "-c", "dorbo.yaml", "-v", "list", "--json"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("dorbo.yaml")));
        assert!(args.verbose);
        assert_eq!(args.action, Action::List { json: true });
    }

    #[test]
    fn test_command_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
