use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

use workflow_reaper::{
    env::Config,
    framework::Debouncer,
    ingress::{AppState, build_router},
    reconcile::Reconciler,
    shutdown,
    workflow::runs::GitHubRunDirectory,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "workflow_reaper=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("failed to read configuration")?;
    info!("starting with {config:?}");

    let directory =
        GitHubRunDirectory::from_config(&config).context("failed to build GitHub client")?;
    let reconciler = Arc::new(Reconciler::new(directory));
    let debouncer = Debouncer::new(config.debounce_window, move || {
        let reconciler = reconciler.clone();
        Box::pin(async move { reconciler.reconcile().await })
    });

    let app = build_router(AppState::new(
        Arc::new(debouncer),
        config.webhook_secret.clone(),
    ));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::signal())
        .await
        .context("server error")?;

    info!("stopped");
    Ok(())
}
