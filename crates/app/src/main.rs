//! Tokenrelay - keeps notebook connections supplied with a fresh token.
//!
//! Logs in against the configured identity provider, publishes the access
//! token to the notebook kernel and renews it on a fixed interval until
//! renewal fails or the process is interrupted.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokenrelay_application::{BridgeOutcome, Clock, CredentialProvider, RunBridge};
use tokenrelay_domain::Token;
use tokenrelay_infrastructure::{
    ConsoleNotifier, KernelExecRegistry, KeycloakProvider, SettingsLoader, StaticTokenProvider,
    SystemClock, redacted,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Identity-provider token bridge for notebook sessions
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to <config dir>/tokenrelay/config.toml)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Refresh interval in milliseconds, overriding the settings
    #[arg(long = "interval-ms")]
    interval_ms: Option<u64>,

    /// Print the effective settings (secrets masked) and exit
    #[arg(long)]
    print_config: bool,
}

/// How long shutdown waits for blocking tasks, such as a notice still
/// waiting for Enter.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    let outcome = runtime.block_on(run(cli));
    shutdown(runtime);
    outcome
}

/// Stops the runtime without waiting on blocking reads of stdin.
fn shutdown(runtime: tokio::runtime::Runtime) {
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
}

async fn run(cli: Cli) -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut loader = SettingsLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let mut settings = loader.load().context("failed to load settings")?;
    if let Some(interval_ms) = cli.interval_ms {
        settings.refresh.interval_ms = interval_ms;
        settings.validate().context("invalid --interval-ms")?;
    }

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&redacted(&settings))?);
        return Ok(ExitCode::SUCCESS);
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        realm = %settings.identity.realm,
        interval_ms = settings.refresh.interval_ms,
        "starting tokenrelay"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let provider: Arc<dyn CredentialProvider> = match &settings.identity.static_token {
        Some(raw) => Arc::new(StaticTokenProvider::new(
            Token::new(raw.as_str()).context("invalid static token")?,
        )),
        None => Arc::new(KeycloakProvider::new(
            settings.identity.clone(),
            Arc::clone(&clock),
        )),
    };
    let registry = Arc::new(
        KernelExecRegistry::new(&settings.session).context("invalid session settings")?,
    );
    let notifier = Arc::new(ConsoleNotifier::new(settings.notices));

    let outcome = RunBridge::new(provider, registry, notifier, clock)
        .execute(settings.refresh.interval())
        .await
        .context("token bridge failed")?;

    match outcome {
        BridgeOutcome::Running(handle) => {
            let run_id = handle.run_id();
            tokio::select! {
                status = handle.join() => {
                    error!(%run_id, status = %status.display_message(), "refresh cycle ended");
                    Ok(ExitCode::FAILURE)
                }
                signal = tokio::signal::ctrl_c() => {
                    signal.context("failed to listen for ctrl-c")?;
                    info!(%run_id, "interrupted, shutting down");
                    Ok(ExitCode::SUCCESS)
                }
            }
        }
        BridgeOutcome::Published(report) => {
            info!(
                matched = report.matched,
                updated = report.updated,
                "static token published"
            );
            Ok(ExitCode::SUCCESS)
        }
        BridgeOutcome::LoginFailed | BridgeOutcome::InitializationFailed => Ok(ExitCode::FAILURE),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Instant;

    #[test]
    fn test_shutdown_does_not_wait_for_blocking_reads() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let (release, blocked) = mpsc::channel::<()>();
        runtime.spawn_blocking(move || blocked.recv());
        let started = Instant::now();

        shutdown(runtime);

        assert!(started.elapsed() < Duration::from_secs(5));
        drop(release);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from(["tokenrelay", "--interval-ms", "60000", "--print-config"]);
        assert_eq!(cli.interval_ms, Some(60_000));
        assert!(cli.print_config);
        assert!(cli.config.is_none());
    }
}
