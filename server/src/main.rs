use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use ordarchive::config::{load_config, Config};
use ordarchive_server::{logging, router, AppState, ServeError};

/// HR order archive server.
#[derive(Parser, Debug)]
#[command(name = "ordarchive-server", version, about, long_about = None)]
struct Cli {
    /// Path to the JSON config file.
    #[arg(short, long, env = "ORDARCHIVE_CONFIG", default_value = "ordarchive.json")]
    config: PathBuf,

    /// Validate the config and exit.
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ordarchive: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.check_config {
        println!("ordarchive: config {} is valid", cli.config.display());
        return ExitCode::SUCCESS;
    }

    if let Err(e) = logging::init(&config.logging) {
        eprintln!("ordarchive: failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: Config) -> Result<(), ServeError> {
    info!("Starting ordarchive v{}", env!("CARGO_PKG_VERSION"));

    let state = AppState::from_config(&config)?;

    match state.intake.reconcile_orphans().await {
        Ok(report) if report.remaining > 0 => {
            warn!(remaining = report.remaining, "orphaned blobs still need removal")
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "orphan reconciliation skipped"),
    }

    let app = router(state, &config.server.cors_origins);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServeError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!("Listening on http://{}", addr);

    let (stop_tx, mut stop_rx) = tokio::sync::watch::channel(false);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = stop_rx.wait_for(|stop| *stop).await;
    });
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        finished = &mut server => {
            return finished?.map_err(ServeError::Server);
        }
        _ = shutdown_signal() => {}
    }

    let grace = Duration::from_secs(config.server.shutdown_grace_secs);
    info!(grace_secs = grace.as_secs(), "shutting down, draining requests");
    let _ = stop_tx.send(true);

    match tokio::time::timeout(grace, server).await {
        Ok(Ok(Ok(()))) => info!("shutdown complete"),
        Ok(Ok(Err(e))) => return Err(ServeError::Server(e)),
        Ok(Err(e)) => return Err(ServeError::Task(e)),
        Err(_) => warn!("grace period elapsed; dropping in-flight requests"),
    }
    Ok(())
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
                    _ = sigterm.recv() => info!("received SIGTERM"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "SIGTERM handler unavailable; only Ctrl-C stops the server"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("received Ctrl-C");
}
