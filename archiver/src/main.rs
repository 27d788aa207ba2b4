use archiver::Config;
use archiver::errors::RelayError;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "archiver", about = "Queue-to-object-store relay daemon")]
struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("archiver failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), RelayError> {
    let config = Config::from_file(&cli.config)?;

    // The guard flushes pending events on drop; it must outlive the runtime.
    let _sentry_guard = config.common.logging.as_ref().map(|logging| {
        sentry::init((
            logging.sentry_dsn.clone(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    if let Some(metrics_config) = &config.common.metrics {
        archiver::install_statsd_recorder(metrics_config)?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| RelayError::Runtime(e.to_string()))?;

    runtime.block_on(archiver::run_async(config))
}
