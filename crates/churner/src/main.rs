//! Container churner
//!
//! Every tick, clones containers of one image and removes others according
//! to an up:down ratio, to exercise container lifecycle churn.

use anyhow::Result;
use churn_lib::{
    driver::DockerDriverConfig,
    health::{components, HealthRegistry},
    ChurnLogger, ChurnLoopBuilder, ChurnMetrics, DockerDriver,
};
use clap::{CommandFactory, Parser};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

use config::{ChurnerConfig, Cli, LogFormat};

const CHURNER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = ChurnerConfig::load(&cli)?;
    if config.missing_image() {
        error!("could not start application, image argument is empty.");
        // usage goes to stdout like --help; ignore a closed pipe
        let _ = Cli::command().print_help();
        std::process::exit(1);
    }
    info!(image = %config.image, ratio = %config.ratio, "Churner configured");

    let health_registry = HealthRegistry::new();
    health_registry.register(components::DRIVER).await;
    health_registry.register(components::SCHEDULER).await;
    let metrics = ChurnMetrics::new();
    let logger = ChurnLogger::new(&config.image);

    let driver = match DockerDriver::connect(&DockerDriverConfig {
        host: config.docker_host.clone(),
        ..Default::default()
    })
    .await
    {
        Ok(driver) => Arc::new(driver),
        Err(e) => {
            error!(error = ?e, "could not start docker client");
            return Err(e);
        }
    };

    if let Some(port) = config.api_port {
        let state = Arc::new(api::AppState::new(health_registry.clone(), metrics.clone()));
        tokio::spawn(async move {
            if let Err(e) = api::serve(port, state).await {
                error!(error = %e, "API server stopped");
            }
        });
    }

    let mut builder = ChurnLoopBuilder::new()
        .driver(driver.clone())
        .image(config.image.clone())
        .ratio(config.ratio)
        .frequency(config.freq)
        .sampling_mode(config.sampling)
        .metrics(metrics)
        .health(health_registry.clone());
    if let Some(seed) = config.seed {
        builder = builder.seed(seed);
    }
    if let Some(timeout) = config.stop_timeout {
        builder = builder.stop_timeout(timeout);
    }
    if let Some(timeout) = config.drain_timeout {
        builder = builder.drain_timeout(timeout);
    }
    let churn_loop = builder.build()?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let loop_handle = tokio::spawn(churn_loop.run(shutdown_rx));

    health_registry.set_ready(true).await;
    logger.log_startup(CHURNER_VERSION, &config.ratio.to_string(), config.freq);

    let reason = shutdown_signal().await?;
    logger.log_shutdown(reason);
    health_registry.set_ready(false).await;

    // a step in progress runs to completion before the loop sees this
    let _ = shutdown_tx.send(());
    if let Err(e) = loop_handle.await {
        error!(error = %e, "Churn loop task failed");
    }

    drop(driver);
    info!("Docker connection closed");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).init(),
    }
}

/// Wait for SIGINT or SIGTERM and name the one received
async fn shutdown_signal() -> Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res?;
                Ok("SIGINT received")
            }
            _ = terminate.recv() => Ok("SIGTERM received"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("Ctrl-C received")
    }
}
