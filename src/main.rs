use anyhow::Context;
use souklou::{AppState, app, auth::JwtKeys, config::Config, store::Store};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.json_logs);

    if config.ephemeral_secret {
        tracing::warn!("JWT_SECRET is not set, using a random secret: tokens won't survive a restart");
    }

    let store = Store::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open {}", config.database_url))?;

    let state = AppState::new(
        store,
        JwtKeys::from_secret(&config.jwt_secret),
        config.session_mode,
        config.ping_interval,
    );
    let registry = state.registry.clone();

    let cors_origin = match config.frontend_url.parse() {
        Ok(origin) => Some(origin),
        Err(_) => {
            tracing::warn!(frontend_url = %config.frontend_url, "FRONTEND_URL is not a valid origin, CORS disabled");
            None
        }
    };

    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, session_mode = ?config.session_mode, "listening");

    axum::serve(listener, app(state, cors_origin))
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down");
            registry.shutdown();
        })
        .await?;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("souklou=info,tower_http=info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
