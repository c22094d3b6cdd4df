use serde::{Deserialize, Serialize};

use crate::models::{Product, User};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub zip: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned by both register and login; registration auto-logs-in.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub status: bool,
    pub user: User,
    pub access_token: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// -- Products --

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<Product>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub product: Product,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ProductMutationResponse {
    pub status: bool,
    pub product: Product,
    pub message: String,
}
