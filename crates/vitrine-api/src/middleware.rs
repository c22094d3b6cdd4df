use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use vitrine_types::models::User;

use crate::error::ApiError;
use crate::{AppState, auth, blocking, tokens};

/// The authenticated caller, resolved once per request and passed to
/// handlers as a request extension — never read from ambient state.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Extract the bearer token from the Authorization header and resolve it
/// against the token table. Every owner-scoped route sits behind this.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthenticated)?
        .to_string();

    let db = state.clone();
    let row = blocking(move || tokens::resolve(&db.db, &token))
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    req.extensions_mut().insert(CurrentUser(auth::public_user(&row)));
    Ok(next.run(req).await)
}
