use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use patchwatch::catalog::load_catalog;
use patchwatch::config::AppConfig;
use patchwatch::dispatch::Dispatcher;
use patchwatch::enrich::Enricher;
use patchwatch::persistence::CheckpointStore;
use patchwatch::queue::PendingQueue;
use patchwatch::scan::Scanner;
use patchwatch::server::{AppState, build_router};
use patchwatch::shutdown::wait_for_signal;
use patchwatch::upstream::{SteamClient, build_http_client};
use patchwatch::webhook::DiscordWebhook;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "patchwatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let catalog = load_catalog(&config.catalog_path)?;
    let checkpoints = CheckpointStore::open(&config.checkpoint_path)?;
    info!(
        entities = catalog.len(),
        checkpoints = checkpoints.len().await,
        checkpoint_path = %checkpoints.path().display(),
        "Starting"
    );

    let http = build_http_client(config.upstream.request_timeout)?;
    let steam = Arc::new(SteamClient::with_client(
        http.clone(),
        config.upstream.api_base.clone(),
        config.upstream.store_base.clone(),
    ));
    let webhook = Arc::new(DiscordWebhook::new(http, config.webhook_url.clone()));

    let queue = PendingQueue::new();
    let scanner = Arc::new(Scanner::new(
        catalog,
        steam.clone(),
        checkpoints.clone(),
        queue.clone(),
        config.scan.clone(),
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        queue.clone(),
        Enricher::new(steam, config.enrich.clone()),
        webhook,
        config.dispatch.clone(),
    ));

    let shutdown = CancellationToken::new();

    let server_task = match config.status_addr {
        Some(addr) => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind status server on {addr}"))?;
            info!(%addr, "Status server listening");
            let app = build_router(AppState::new(
                queue.clone(),
                checkpoints.clone(),
                scanner.subscribe(),
            ));
            let stop = shutdown.clone();
            Some(tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move { stop.cancelled().await })
                    .await
            }))
        }
        None => None,
    };

    let scan_task = tokio::spawn({
        let scanner = scanner.clone();
        let shutdown = shutdown.clone();
        async move { scanner.run(shutdown).await }
    });
    let dispatch_task = tokio::spawn({
        let dispatcher = dispatcher.clone();
        let shutdown = shutdown.clone();
        async move { dispatcher.run(shutdown).await }
    });

    wait_for_signal().await;
    info!("Shutting down");
    shutdown.cancel();

    if let Err(e) = scan_task.await {
        error!(error = %e, "Scan task failed");
    }
    if let Err(e) = dispatch_task.await {
        error!(error = %e, "Dispatch task failed");
    }
    if let Some(task) = server_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Status server failed"),
            Err(e) => error!(error = %e, "Status server task failed"),
        }
    }

    checkpoints
        .flush()
        .await
        .context("final checkpoint flush failed")?;
    info!("Stopped");
    Ok(())
}
