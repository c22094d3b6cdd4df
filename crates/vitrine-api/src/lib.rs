pub mod auth;
pub mod error;
pub mod middleware;
pub mod products;
pub mod tokens;
pub mod validate;

use std::sync::Arc;

use vitrine_assets::ImageStore;
use vitrine_db::Database;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub assets: ImageStore,
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Try RFC 3339 first, then the naive form interpreted as UTC.
pub(crate) fn parse_sqlite_timestamp(raw: &str) -> chrono::DateTime<chrono::Utc> {
    raw.parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::warn!("Corrupt timestamp '{}': {}", raw, e);
            chrono::DateTime::default()
        })
}

/// Run a blocking DB closure off the async runtime, folding both the join
/// error and the closure's own failure into [`error::ApiError`].
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, error::ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| error::ApiError::Internal(anyhow::anyhow!("spawn_blocking join error: {}", e)))?
        .map_err(error::ApiError::Internal)
}
