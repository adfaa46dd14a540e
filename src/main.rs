//! # Job Pipeline - Entry Point
//! src/main.rs
//!
//! Parsea la configuración, arranca el pipeline y el endpoint HTTP, y
//! espera el pedido de apagado: SIGINT, SIGTERM o `POST /admin/shutdown`.

use job_pipeline::config::Config;
use job_pipeline::jobs::{JobManager, JobManagerConfig};
use job_pipeline::metrics::MetricsCollector;
use job_pipeline::server::{build_router, Server};
use job_pipeline::shutdown::ShutdownSignal;
use std::process;
use std::sync::Arc;
use std::thread;
use tracing_subscriber::EnvFilter;

fn main() {
    let config = Config::new();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_thread_names(true)
        .init();

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "invalid configuration");
        process::exit(1);
    }
    config.log_summary();

    let metrics = match MetricsCollector::new() {
        Ok(metrics) => metrics,
        Err(e) => {
            tracing::error!(error = %e, "failed to register metrics");
            process::exit(1);
        }
    };

    let manager = match JobManager::start(JobManagerConfig::from_config(&config), metrics) {
        Ok(manager) => Arc::new(manager),
        Err(e) => {
            tracing::error!(error = %e, "failed to start job pipeline");
            process::exit(1);
        }
    };

    let signal = ShutdownSignal::new();
    if let Err(e) = signal.listen_for_termination() {
        tracing::error!(error = %e, "failed to install signal handler");
        manager.shutdown(config.shutdown_timeout());
        process::exit(1);
    }

    let mut server = Server::new(config.address(), build_router(Arc::clone(&manager), signal.clone()));
    if let Err(e) = server.bind() {
        tracing::error!(error = %e, address = %config.address(), "failed to bind");
        manager.shutdown(config.shutdown_timeout());
        process::exit(1);
    }

    let spawned = thread::Builder::new()
        .name("http-server".to_string())
        .spawn(move || {
            if let Err(e) = server.run() {
                tracing::error!(error = %e, "HTTP server stopped");
            }
        });
    if let Err(e) = spawned {
        tracing::error!(error = %e, "failed to start HTTP server thread");
        manager.shutdown(config.shutdown_timeout());
        process::exit(1);
    }

    signal.wait();

    let report = manager.shutdown(config.shutdown_timeout());
    if report.is_clean() {
        tracing::info!(stopped = report.stopped.len(), "pipeline stopped cleanly");
    } else {
        tracing::warn!(
            stopped = report.stopped.len(),
            stragglers = ?report.stragglers,
            discarded = report.discarded,
            "pipeline stopped with stragglers"
        );
    }
}
