//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors; request errors are rendered by the
//! account crate.

use account::domain::gateway::GatewayFactory;
use account::infra::memory::MemoryIdentityDirectory;
use account::presentation::{AccountAppState, PageSessions, account_router_generic};
use account::{
    AccountConfig, IdentityToolkitClient, IdentityToolkitConfig, PgProfileRepository,
    account_router,
};
use anyhow::Context;
use axum::{
    Router, http,
    http::{Method, header},
};
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often idle page sessions are swept
const EVICTION_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                //.unwrap_or_else(|_| "api=debug,account=debug,tower_http=debug".into()),
                .unwrap_or_else(|_| "api=info,account=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database connection
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    let profiles = PgProfileRepository::new(pool.clone());
    let config = account_config()?;

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:40922,http://127.0.0.1:40922".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    let addr: SocketAddr = match env::var("LISTEN_ADDR") {
        Ok(addr) => addr.parse().context("LISTEN_ADDR must be host:port")?,
        Err(_) => SocketAddr::from(([0, 0, 0, 0], 31113)),
    };

    // Identity service
    match env::var("IDENTITY_API_KEY") {
        Ok(api_key) => {
            let project_id = env::var("IDENTITY_PROJECT_ID")
                .context("IDENTITY_PROJECT_ID must be set with IDENTITY_API_KEY")?;
            let mut identity_config = IdentityToolkitConfig::new(api_key, project_id);
            if let Ok(base_url) = env::var("IDENTITY_BASE_URL") {
                identity_config = identity_config.with_base_url(base_url);
            }
            tracing::info!(base_url = %identity_config.base_url, "Using identity service");

            let identity = IdentityToolkitClient::new(identity_config)?;
            let state = AccountAppState::new(identity, profiles, config);
            serve(account_router(state.clone()), state.sessions, cors, addr).await
        }
        Err(_) if cfg!(debug_assertions) => {
            tracing::warn!("IDENTITY_API_KEY not set, using in-memory identity directory");
            let identity = MemoryIdentityDirectory::new();
            let state = AccountAppState::new(identity, profiles, config);
            serve(account_router_generic(state.clone()), state.sessions, cors, addr).await
        }
        Err(_) => anyhow::bail!("IDENTITY_API_KEY must be set in production"),
    }
}

/// Account configuration from the environment
fn account_config() -> anyhow::Result<AccountConfig> {
    let secret = match env::var("PAGE_SESSION_SECRET") {
        Ok(secret_b64) => Some(
            platform::crypto::secret_from_base64(&secret_b64)
                .context("PAGE_SESSION_SECRET must be base64 of 32 bytes")?,
        ),
        Err(_) if cfg!(debug_assertions) => None,
        Err(_) => anyhow::bail!("PAGE_SESSION_SECRET must be set in production"),
    };

    let mut config = if cfg!(debug_assertions) {
        AccountConfig::development()
    } else {
        AccountConfig::default()
    };

    if let Some(secret) = secret {
        config.page_session_secret = secret;
    }
    if let Ok(origin) = env::var("PAGE_ORIGIN") {
        config.page_origin = origin;
    }
    if let Ok(path) = env::var("PAGE_PATH") {
        config.page_path = path;
    }
    if let Ok(url) = env::var("FIND_HOUSING_URL") {
        config.find_housing_url = url;
    }
    if let Ok(url) = env::var("LIST_HOUSING_URL") {
        config.list_housing_url = url;
    }

    Ok(config)
}

async fn serve<F>(
    account: Router,
    sessions: Arc<PageSessions<F, PgProfileRepository>>,
    cors: CorsLayer,
    addr: SocketAddr,
) -> anyhow::Result<()>
where
    F: GatewayFactory,
{
    // Periodic sweep of idle page sessions
    let sweep_sessions = sessions.clone();
    let sweeper = tokio::spawn(async move {
        let mut interval = tokio::time::interval(EVICTION_INTERVAL);
        loop {
            interval.tick().await;
            sweep_sessions.evict_idle().await;
        }
    });

    // Build router
    let app = Router::new()
        .nest("/api", account)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.abort();
    sessions.shutdown_all().await;

    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Keep serving; the process can still be killed
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
