use anyhow::Context;
use tokio::sync::watch;
use tracing::{info, warn};

use partyplanner_server::config::AppConfig;
use partyplanner_server::mail::{build_mailer, Notifier};
use partyplanner_server::{reminder, router, seed, storage, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "partyplanner_server=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env().context("loading configuration")?;
    info!("data directory: {}", config.data_dir.display());

    // Initialize database
    let db = storage::init_db(&config.data_dir)?;
    info!("database initialized");

    if config.jwt_secret.is_empty() {
        warn!("JWT_SECRET not set, login and authenticated routes will fail");
    }
    if let Some(admin) = &config.admin_seed {
        seed::seed_admin(&db, admin)?;
    }

    let notifier = Notifier::new(build_mailer(config.smtp.as_ref())?, config.base_url.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reminders = tokio::spawn(reminder::run_reminder_job(
        db.clone(),
        notifier.clone(),
        config.reminder,
        shutdown_rx,
    ));

    let port = config.port;
    let base_url = config.base_url.clone();
    let app = router(AppState {
        db,
        config,
        notifier,
    });

    info!("starting server at {base_url}");
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("binding port {port}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = reminders.await {
        warn!("reminder job ended abnormally: {e}");
    }

    info!("partyplanner-server stopped");
    Ok(())
}

/// Wait for SIGTERM or SIGINT
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                    _ = sigint.recv() => info!("Received SIGINT"),
                }
                return;
            }
            _ => warn!("failed to register signal handlers, falling back to Ctrl+C"),
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C"),
        Err(e) => {
            warn!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    }
}
