//! `schooldesk-worker` -- keeps one student's dashboard fresh.
//!
//! Loads the task, homework and attendance boards from the school API and
//! refreshes them on a fixed interval, logging the recomputed aggregates.
//!
//! # Environment variables
//!
//! | Variable                          | Required | Default | Description                         |
//! |-----------------------------------|----------|---------|-------------------------------------|
//! | `SCHOOLDESK_API_URL`              | yes      | --      | Base URL of the school REST API     |
//! | `SCHOOLDESK_API_TOKEN`            | no       | unset   | Bearer token                        |
//! | `SCHOOLDESK_REQUEST_TIMEOUT_SECS` | no       | `30`    | Per-request timeout                 |
//! | `STUDENT_ID`                      | yes      | --      | Student whose dashboard is loaded   |
//! | `REFRESH_INTERVAL_SECS`           | no       | `60`    | Seconds between refreshes           |
//! | `SCHOOLDESK_LOCALE`               | no       | `en`    | Locale for titles in log output     |

use schooldesk_client::api::SchoolApi;
use schooldesk_worker::config::WorkerConfig;
use schooldesk_worker::refresh;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "schooldesk_worker=info,schooldesk_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env()?;

    tracing::info!(
        student_id = config.student_id,
        api_url = %config.client.base_url,
        interval_secs = config.refresh_interval.as_secs(),
        locale = %config.locale,
        "Starting schooldesk-worker",
    );

    let api = SchoolApi::new(&config.client)?;
    refresh::run(&api, &config, shutdown_signal()).await?;

    tracing::info!("Worker stopped");
    Ok(())
}

/// Resolve on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
