/// Database row types — these map directly to SQLite rows.
/// Distinct from the vitrine-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub zip: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub created_at: String,
}

pub struct ProductRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub banner_image: Option<String>,
    pub created_at: String,
}
