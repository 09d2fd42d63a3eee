//! Favourites Backend
//!
//! A REST backend that keeps per-user favourite charts, insights and audiences,
//! with SQLite persistence and bearer-token authentication.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod middleware;
mod models;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{HeaderName, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch},
    Router,
};
use clap::{Parser, Subcommand};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::field::Empty;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::AuthGate;
use config::{Config, StoreKind};
use db::{FavouritesRepository, MemoryRepository, SqliteRepository};
use middleware::RateLimiter;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn FavouritesRepository>,
    pub auth: Arc<AuthGate>,
    pub limiter: Arc<RateLimiter>,
}

#[derive(Parser)]
#[command(name = "favourites-api", version, about = "Favourites REST backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print a bearer token for a user
    Token {
        /// User id placed in the `sub` claim
        #[arg(long)]
        user: String,
        /// HS256 secret; without one the token is unsigned
        #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
        secret: Option<String>,
        /// Lifetime in seconds
        #[arg(long, default_value_t = 86_400)]
        exp_secs: i64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Token {
            user,
            secret,
            exp_secs,
        } => {
            let secret = secret.filter(|s| !s.is_empty());
            if secret.is_none() {
                eprintln!("Warning: token is unsigned (alg=none); do not use in production");
            }
            let token = auth::issue_token(
                &user,
                secret.as_deref(),
                chrono::Duration::seconds(exp_secs),
            )?;
            println!("{}", token);
            Ok(())
        }
    }
}

async fn serve() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(env_filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Favourites Backend");
    tracing::info!("Bind address: {}", config.bind_addr);

    let auth = Arc::new(AuthGate::new(&config.auth));
    match auth.mode_name() {
        "locked" => tracing::error!(
            "No JWT_SECRET and ALLOW_UNSIGNED_TOKENS is not set; every request will be rejected"
        ),
        "unsigned" => {
            tracing::warn!("Accepting unsigned tokens (alg=none); for local development only")
        }
        mode => tracing::info!("Authentication mode: {}", mode),
    }

    let limiter = Arc::new(RateLimiter::new(config.rate_limit));
    if limiter.is_enabled() {
        tracing::info!(
            "Rate limit: {} requests per {:?} per user",
            config.rate_limit.requests,
            config.rate_limit.window
        );
    }

    let repo: Arc<dyn FavouritesRepository> = match config.store {
        StoreKind::Sqlite => {
            tracing::info!("Database path: {:?}", config.db.path);
            let pool = db::init_database(&config.db).await?;
            Arc::new(SqliteRepository::new(pool))
        }
        StoreKind::Memory => {
            tracing::warn!("Using the in-memory store; favourites are lost on restart");
            Arc::new(MemoryRepository::new())
        }
    };

    let state = AppState {
        repo,
        auth,
        limiter,
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static(auth::REQUEST_ID_HEADER);

    // Layers run outermost-last: auth, rate limit, Accept, Content-Type
    let favourites_routes = Router::new()
        .route(
            "/favourites",
            get(api::list_favourites).post(api::add_favourite),
        )
        .route(
            "/favourites/{asset_id}",
            patch(api::update_favourite).delete(api::remove_favourite),
        )
        .layer(from_fn(middleware::require_json_body))
        .layer(from_fn(middleware::require_json_accept))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::rate_limit_layer,
        ))
        .layer(from_fn_with_state(state.clone(), auth::auth_layer));

    // Health checks (no auth required)
    let health_routes = Router::new()
        .route("/health/live", get(api::live))
        .route("/health/ready", get(api::ready));

    let trace = TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
        let request_id = req
            .headers()
            .get(auth::REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("n/a");
        tracing::info_span!(
            "http_request",
            method = %req.method(),
            path = %req.uri().path(),
            request_id = %request_id,
            user_id = Empty,
        )
    });

    Router::new()
        .nest("/api/v1", favourites_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(trace)
                .layer(PropagateRequestIdLayer::new(x_request_id))
                .layer(cors),
        )
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

    tracing::info!("Shutdown signal received");
}
