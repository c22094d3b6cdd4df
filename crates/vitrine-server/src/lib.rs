use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use vitrine_api::middleware::require_auth;
use vitrine_api::{AppState, AppStateInner, auth, products};
use vitrine_assets::ImageStore;
use vitrine_db::Database;

/// 10 MB cap on multipart bodies (product images).
const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub asset_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: std::env::var("VITRINE_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("VITRINE_PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()?,
            db_path: std::env::var("VITRINE_DB_PATH")
                .unwrap_or_else(|_| "vitrine.db".into())
                .into(),
            asset_dir: std::env::var("VITRINE_ASSET_DIR")
                .unwrap_or_else(|_| "./asset/products".into())
                .into(),
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

pub async fn init_state(config: &Config) -> anyhow::Result<AppState> {
    let db = Database::open(&config.db_path)?;
    let assets = ImageStore::new(config.asset_dir.clone()).await?;
    Ok(Arc::new(AppStateInner { db, assets }))
}

pub fn app(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/profile", get(auth::profile))
        .route("/logout", post(auth::logout))
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            get(products::show)
                .put(products::update)
                .patch(products::update)
                .delete(products::destroy),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
