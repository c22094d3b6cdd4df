use std::sync::LazyLock;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State};
use tracing::warn;
use uuid::Uuid;

use vitrine_db::models::UserRow;
use vitrine_db::queries::NewUser;
use vitrine_types::api::{
    AuthResponse, LoginRequest, MessageResponse, ProfileResponse, RegisterRequest,
};
use vitrine_types::models::User;

use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::validate::{Validator, email_is_well_formed};
use crate::{AppState, blocking, tokens};

const MIN_PASSWORD_LEN: usize = 8;

/// Hash verified against when the email is unknown, so the failure path
/// costs the same as a wrong password and login stays enumeration-proof.
static DUMMY_HASH: LazyLock<String> = LazyLock::new(|| {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(b"placeholder-for-unknown-users", &salt)
        .map(|h| h.to_string())
        .unwrap_or_default()
});

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let mut v = Validator::new();
    v.require("name", !req.name.trim().is_empty(), "The name field is required");
    v.require(
        "email",
        email_is_well_formed(&req.email),
        "The email must be a valid email address",
    );
    v.require(
        "password",
        req.password.len() >= MIN_PASSWORD_LEN,
        "The password must be at least 8 characters",
    );
    v.require(
        "password",
        req.password == req.password_confirmation,
        "The password confirmation does not match",
    );
    v.finish()?;

    let db = state.clone();
    let (user, token) = blocking(move || {
        // Pre-check for a friendly error; the UNIQUE constraint still
        // decides the race between two concurrent registrations.
        if db.db.get_user_by_email(&req.email)?.is_some() {
            return Ok(Err(ApiError::Conflict("email")));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
            .to_string();

        let id = Uuid::new_v4().to_string();
        let insert = db.db.create_user(&NewUser {
            id: &id,
            name: req.name.trim(),
            email: &req.email,
            password_hash: &password_hash,
            phone: req.phone.as_deref(),
            street: req.street.as_deref(),
            zip: req.zip.as_deref(),
            city: req.city.as_deref(),
            country: req.country.as_deref(),
        });
        if let Err(e) = insert {
            if vitrine_db::is_unique_violation(&e) {
                return Ok(Err(ApiError::Conflict("email")));
            }
            return Err(e);
        }

        let row = db
            .db
            .get_user_by_id(&id)?
            .ok_or_else(|| anyhow::anyhow!("user {} vanished after insert", id))?;
        let token = tokens::issue(&db.db, &id)?;
        Ok(Ok((public_user(&row), token)))
    })
    .await??;

    Ok(Json(AuthResponse {
        status: true,
        user,
        access_token: token,
        message: "User created successfully".into(),
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let mut v = Validator::new();
    v.require(
        "email",
        email_is_well_formed(&req.email),
        "The email must be a valid email address",
    );
    v.require("password", !req.password.is_empty(), "The password field is required");
    v.finish()?;

    let db = state.clone();
    let (user, token) = blocking(move || {
        let row = db.db.get_user_by_email(&req.email)?;

        // Verify against the dummy hash when the email is unknown so both
        // failure modes take the same path and return the same error.
        let stored = row.as_ref().map_or(DUMMY_HASH.as_str(), |r| r.password.as_str());
        let verified = PasswordHash::new(stored)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(req.password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false);

        let Some(row) = row else {
            return Ok(Err(ApiError::InvalidCredentials));
        };
        if !verified {
            return Ok(Err(ApiError::InvalidCredentials));
        }

        let token = tokens::issue(&db.db, &row.id)?;
        Ok(Ok((public_user(&row), token)))
    })
    .await??;

    Ok(Json(AuthResponse {
        status: true,
        user,
        access_token: token,
        message: "User logged in successfully!".into(),
    }))
}

pub async fn profile(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        user,
        message: "User exists".into(),
    })
}

/// Logout revokes every token the user holds — all sessions end together.
pub async fn logout(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<MessageResponse>, ApiError> {
    let db = state.clone();
    blocking(move || tokens::revoke_all(&db.db, &user.id.to_string())).await?;

    Ok(Json(MessageResponse {
        message: "User logged out successfully".into(),
    }))
}

/// DB row to public user payload; the password hash stays behind.
pub(crate) fn public_user(row: &UserRow) -> User {
    User {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt user id '{}': {}", row.id, e);
            Uuid::default()
        }),
        name: row.name.clone(),
        email: row.email.clone(),
        phone: row.phone.clone(),
        street: row.street.clone(),
        zip: row.zip.clone(),
        city: row.city.clone(),
        country: row.country.clone(),
        created_at: crate::parse_sqlite_timestamp(&row.created_at),
    }
}
