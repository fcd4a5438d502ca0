use anyhow::Context;
use chirp_server::{
    config::Settings,
    db::Database,
    images::ImageStore,
    placeholder::PlaceholderClient,
    routes::create_router,
    state::AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chirp_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::new().context("Failed to load settings")?;

    let db = Database::new(&settings.database.path)
        .with_context(|| format!("Failed to open database at {}", settings.database.path))?;
    db.initialize()
        .context("Failed to initialize database schema")?;
    if settings.database.seed {
        db.seed_defaults().context("Failed to seed default data")?;
    }
    tracing::info!("Database initialized at {}", settings.database.path);

    let images = ImageStore::new(&settings.uploads.dir)?;
    tracing::info!("Storing uploads in {}", images.dir().display());

    let placeholder = if settings.placeholder.enabled {
        PlaceholderClient::new(
            settings.placeholder.url.clone(),
            Duration::from_secs(settings.placeholder.timeout_secs),
        )?
    } else {
        tracing::info!("Placeholder profile pictures disabled");
        PlaceholderClient::disabled()
    };

    let state = AppState::new(db, images, placeholder);

    match state.session_manager.cleanup_expired_sessions() {
        Ok(count) if count > 0 => {
            tracing::info!("Cleaned up {} expired sessions on startup", count)
        }
        Ok(_) => tracing::debug!("No expired sessions to clean up"),
        Err(e) => tracing::error!("Failed to cleanup expired sessions on startup: {:#}", e),
    }

    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        // First tick fires immediately; startup already ran a pass
        interval.tick().await;
        loop {
            interval.tick().await;
            match cleanup_state.session_manager.cleanup_expired_sessions() {
                Ok(count) if count > 0 => {
                    tracing::info!("Periodic cleanup: removed {} expired sessions", count)
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Periodic session cleanup failed: {:#}", e),
            }
        }
    });

    let app = create_router(state, settings.server.max_body_bytes);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Failed to parse server address")?;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install CTRL+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
