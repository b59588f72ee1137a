mod auth;
mod batch;
mod cache;
mod config;
mod error;
mod models;
mod query;
mod recommend;
mod routes;
mod scanner;
mod tag_match;
mod thumbnails;
mod video;

use axum::extract::State;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::{Json, Router};
use cache::CacheBackend;
use config::Config;
use sqlx::PgPool;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub cache: CacheBackend,
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let db_ok = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();
    Json(serde_json::json!({ "status": "ok", "db": db_ok }))
}

async fn banner() -> &'static str {
    "media-catalog is running"
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    // Credentials (the token cookie) require echoing the request instead
    // of wildcards.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env();

    let db = PgPool::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    sqlx::migrate!()
        .run(&db)
        .await
        .expect("failed to run migrations");

    let cache = CacheBackend::new(config.cache_capacity);
    let cors = cors_layer(&config);
    // ServeDir resolves strictly inside the media root; `..` segments in
    // request paths cannot escape it.
    let files = ServeDir::new(&config.media_root);
    let addr = format!("{}:{}", config.host, config.port);

    let state = AppState { db, config, cache };

    let app = Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .merge(routes::api_router())
        .nest_service("/file", files)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listen address");
    axum::serve(listener, app).await.expect("server error");
}
