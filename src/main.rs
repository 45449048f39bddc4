//! Tape Bulk Eject
//!
//! Ejects the given tapes from a PowerVault 124T autoloader one at a time,
//! waiting for the operator to empty the mailslot between tapes.
//!
//! ```text
//! tape-bulk-eject 'A00001L3|A00002L3' A00003L3
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{fmt, fmt::writer::MakeWriterExt, prelude::*, EnvFilter};

use tape_bulk_eject::{
    default_config_path, parse_tape_list, DeviceClient, DeviceConfig, DeviceEndpoints,
    EjectOrchestrator, EjectSummary, PacedTransport, Result,
};

/// Exit code after Ctrl-C
const EXIT_INTERRUPTED: u8 = 130;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Eject multiple tapes from a PowerVault 124T autoloader
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Tapes to eject; each argument may list several separated by spaces or `|`
    #[arg(required = true, value_name = "TAPE")]
    tapes: Vec<String>,

    /// Debug output with timestamps
    #[arg(short, long)]
    verbose: bool,

    /// Config file with host, user and pass (default: ~/.pv124t.json)
    #[arg(long, env = "PV124T_CONFIG")]
    config: Option<PathBuf>,

    /// Give up on a tape after this many move attempts
    #[arg(long, env = "PV124T_MAX_EJECT_ATTEMPTS")]
    max_eject_attempts: Option<u32>,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(&args);
    debug!("{} {}", tape_bulk_eject::NAME, tape_bulk_eject::VERSION);

    tokio::select! {
        result = run(&args) => match result {
            Ok(summary) => {
                if let Ok(json) = serde_json::to_string(&summary) {
                    debug!("Summary: {}", json);
                }
                info!("Success.");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{}", e);
                error!("EXITING DUE TO ERROR!");
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted.");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

async fn run(args: &Args) -> Result<EjectSummary> {
    let tapes = parse_tape_list(&args.tapes)?;

    let path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let config = DeviceConfig::load(&path)?;

    let mut policy = config.eject_policy();
    if args.max_eject_attempts.is_some() {
        policy.max_attempts = args.max_eject_attempts;
    }

    let transport = PacedTransport::new(
        &config.host,
        &config.user,
        &config.pass,
        config.transport_config(),
    )?;
    info!("Autoloader: {}", transport.base_url());

    let client = DeviceClient::new(Arc::new(transport), DeviceEndpoints::default(), policy);
    EjectOrchestrator::new(client).run(tapes).await
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };

    let mut filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    for directive in ["hyper=warn", "reqwest=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    // warn and error on stderr, everything else on stdout
    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .or_else(std::io::stdout);

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(writer))
            .init();
    } else if args.verbose {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(writer))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .without_time()
                    .with_target(false)
                    .with_level(false)
                    .with_writer(writer),
            )
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_cli_parses_tapes_and_flags() {
        let args = Args::try_parse_from([
            "tape-bulk-eject",
            "-v",
            "--max-eject-attempts",
            "5",
            "A00001L3|A00002L3",
            "A00003L3",
        ])
        .unwrap();

        assert!(args.verbose);
        assert_eq!(args.max_eject_attempts, Some(5));
        assert_eq!(args.tapes, vec!["A00001L3|A00002L3", "A00003L3"]);
        assert_eq!(parse_tape_list(&args.tapes).unwrap().len(), 3);
    }

    #[test]
    fn test_cli_requires_a_tape() {
        assert!(Args::try_parse_from(["tape-bulk-eject"]).is_err());
    }
}
