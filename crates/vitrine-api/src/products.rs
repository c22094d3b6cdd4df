use axum::{
    Extension, Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
};
use tracing::warn;
use uuid::Uuid;

use vitrine_db::models::ProductRow;
use vitrine_types::api::{
    MessageResponse, ProductListResponse, ProductMutationResponse, ProductResponse,
};
use vitrine_types::models::Product;

use crate::error::{ApiError, FieldErrors};
use crate::middleware::CurrentUser;
use crate::validate::{Validator, parse_price};
use crate::{AppState, blocking};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

struct UploadedImage {
    content: Vec<u8>,
    extension: String,
}

/// Multipart form for create and update. Every field is optional at the
/// parse stage; create and update enforce their own requirements.
#[derive(Default)]
struct ProductForm {
    name: Option<String>,
    description: Option<String>,
    price: Option<String>,
    image: Option<UploadedImage>,
}

async fn read_form(mut multipart: Multipart) -> Result<ProductForm, ApiError> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed_body)? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("name") => form.name = Some(field.text().await.map_err(malformed_body)?),
            Some("description") => {
                form.description = Some(field.text().await.map_err(malformed_body)?);
            }
            Some("price") => form.price = Some(field.text().await.map_err(malformed_body)?),
            Some("banner_image") => {
                let extension = field
                    .file_name()
                    .map(extension_of)
                    .unwrap_or_default();
                let content = field.bytes().await.map_err(malformed_body)?.to_vec();
                form.image = Some(UploadedImage { content, extension });
            }
            // Unknown fields are ignored, matching lenient form handling.
            _ => {}
        }
    }

    Ok(form)
}

fn malformed_body(e: MultipartError) -> ApiError {
    let mut errors = FieldErrors::new();
    errors
        .entry("body")
        .or_default()
        .push(format!("Malformed multipart body: {}", e));
    ApiError::Validation(errors)
}

fn extension_of(file_name: &str) -> String {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

fn check_image(v: &mut Validator, image: Option<&UploadedImage>) {
    if let Some(image) = image {
        v.require(
            "banner_image",
            IMAGE_EXTENSIONS.contains(&image.extension.as_str()),
            "The banner image must be an image file",
        );
        v.require(
            "banner_image",
            !image.content.is_empty(),
            "The banner image is empty",
        );
    }
}

pub async fn list(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ProductListResponse>, ApiError> {
    let db = state.clone();
    let owner = user.id.to_string();
    let rows = blocking(move || db.db.list_products_for_user(&owner)).await?;

    Ok(Json(ProductListResponse {
        products: rows.into_iter().map(to_product).collect(),
        message: "Products fetched".into(),
    }))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<Json<ProductMutationResponse>, ApiError> {
    let form = read_form(multipart).await?;

    let name = form.name.as_deref().unwrap_or_default().trim().to_string();
    let description = form.description.as_deref().unwrap_or_default().trim().to_string();
    let price = form.price.as_deref().and_then(parse_price);

    let mut v = Validator::new();
    v.require("name", !name.is_empty(), "The name field is required");
    v.require(
        "description",
        !description.is_empty(),
        "The description field is required",
    );
    v.require(
        "price",
        price.is_some(),
        "The price must be a non-negative number",
    );
    check_image(&mut v, form.image.as_ref());
    v.finish()?;
    let price = price.unwrap_or_default();

    // Store the asset before the row commits; an image-store failure means
    // no product is created at all.
    let banner_image = match &form.image {
        Some(image) => Some(
            state
                .assets
                .store(&image.content, &image.extension)
                .await
                .map_err(ApiError::Internal)?,
        ),
        None => None,
    };

    let row = ProductRow {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.to_string(),
        name,
        description,
        price,
        banner_image: banner_image.clone(),
        created_at: String::new(),
    };

    let db = state.clone();
    let id = row.id.clone();
    let stored = blocking(move || {
        db.db.insert_product(&row)?;
        db.db.get_product(&id)
    })
    .await;

    let row = match stored {
        Ok(Some(row)) => row,
        other => {
            // Row never committed: release the asset stored above.
            if let Some(banner) = &banner_image {
                if let Err(e) = state.assets.delete(banner).await {
                    warn!("Failed to roll back asset {}: {}", banner, e);
                }
            }
            return match other {
                Err(e) => Err(e),
                _ => Err(ApiError::Internal(anyhow::anyhow!(
                    "product row missing after insert"
                ))),
            };
        }
    };

    Ok(Json(ProductMutationResponse {
        status: true,
        product: to_product(row),
        message: "Product created successfully".into(),
    }))
}

pub async fn show(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, ApiError> {
    let row = fetch_owned(&state, user.id, id).await?;

    Ok(Json(ProductResponse {
        product: to_product(row),
        message: "Product exists".into(),
    }))
}

/// Partial update: only supplied fields change. A supplied image replaces
/// the old asset store-new-then-delete-old; absent image leaves the
/// existing reference untouched.
pub async fn update(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<ProductMutationResponse>, ApiError> {
    let form = read_form(multipart).await?;

    let mut v = Validator::new();
    if let Some(name) = &form.name {
        v.require("name", !name.trim().is_empty(), "The name field is required");
    }
    if let Some(description) = &form.description {
        v.require(
            "description",
            !description.trim().is_empty(),
            "The description field is required",
        );
    }
    let price_override = match &form.price {
        Some(raw) => {
            let parsed = parse_price(raw);
            v.require(
                "price",
                parsed.is_some(),
                "The price must be a non-negative number",
            );
            parsed
        }
        None => None,
    };
    check_image(&mut v, form.image.as_ref());
    v.finish()?;

    // Ownership gate before any mutation.
    let existing = fetch_owned(&state, user.id, id).await?;

    let name = match form.name {
        Some(name) => name.trim().to_string(),
        None => existing.name.clone(),
    };
    let description = match form.description {
        Some(description) => description.trim().to_string(),
        None => existing.description.clone(),
    };
    let price = price_override.unwrap_or(existing.price);

    // New asset goes to disk before the row update so the row never points
    // at a filename that is not yet stored.
    let new_banner = match &form.image {
        Some(image) => Some(
            state
                .assets
                .store(&image.content, &image.extension)
                .await
                .map_err(ApiError::Internal)?,
        ),
        None => None,
    };
    let banner_after = new_banner.clone().or_else(|| existing.banner_image.clone());

    let db = state.clone();
    let pid = id.to_string();
    let banner_col = banner_after.clone();
    let stored = blocking(move || {
        let updated = db
            .db
            .update_product(&pid, &name, &description, price, banner_col.as_deref())?;
        anyhow::ensure!(updated, "product {} vanished during update", pid);
        db.db.get_product(&pid)
    })
    .await;

    let row = match stored {
        Ok(Some(row)) => row,
        other => {
            // Row update failed: the old asset stays live, the new one goes.
            if let Some(banner) = &new_banner {
                if let Err(e) = state.assets.delete(banner).await {
                    warn!("Failed to roll back asset {}: {}", banner, e);
                }
            }
            return match other {
                Err(e) => Err(e),
                _ => Err(ApiError::Internal(anyhow::anyhow!(
                    "product row missing after update"
                ))),
            };
        }
    };

    // Row committed with the new reference — now the old asset can go.
    if new_banner.is_some() {
        if let Some(old) = &existing.banner_image {
            if let Err(e) = state.assets.delete(old).await {
                warn!("Failed to delete replaced asset {}: {}", old, e);
            }
        }
    }

    Ok(Json(ProductMutationResponse {
        status: true,
        product: to_product(row),
        message: "Product updated successfully".into(),
    }))
}

/// Row deletion first — if it fails the asset is untouched, so no product
/// is ever left referencing a deleted image. Asset deletion failure after
/// a committed row delete is logged, not surfaced.
pub async fn destroy(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let existing = fetch_owned(&state, user.id, id).await?;

    let db = state.clone();
    let pid = id.to_string();
    let deleted = blocking(move || db.db.delete_product(&pid)).await?;
    if !deleted {
        return Err(ApiError::NotFound);
    }

    if let Some(banner) = &existing.banner_image {
        if let Err(e) = state.assets.delete(banner).await {
            warn!("Failed to delete asset {} for product {}: {}", banner, id, e);
        }
    }

    Ok(Json(MessageResponse {
        message: "Product deleted successfully".into(),
    }))
}

/// Fetch a product and enforce ownership: 404 when absent, 403 when the
/// caller is not the owner.
async fn fetch_owned(state: &AppState, user_id: Uuid, id: Uuid) -> Result<ProductRow, ApiError> {
    let db = state.clone();
    let pid = id.to_string();
    let row = blocking(move || db.db.get_product(&pid))
        .await?
        .ok_or(ApiError::NotFound)?;

    if row.user_id != user_id.to_string() {
        return Err(ApiError::Forbidden);
    }
    Ok(row)
}

fn to_product(row: ProductRow) -> Product {
    Product {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt product id '{}': {}", row.id, e);
            Uuid::default()
        }),
        user_id: row.user_id.parse().unwrap_or_else(|e| {
            warn!("Corrupt user_id '{}' on product '{}': {}", row.user_id, row.id, e);
            Uuid::default()
        }),
        name: row.name,
        description: row.description,
        price: row.price,
        banner_image: row.banner_image,
        created_at: crate::parse_sqlite_timestamp(&row.created_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_extraction() {
        assert_eq!(extension_of("cat.PNG"), "png");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("no-extension"), "");
    }

    #[test]
    fn image_extension_whitelist() {
        let good = UploadedImage {
            content: b"x".to_vec(),
            extension: "jpeg".into(),
        };
        let mut v = Validator::new();
        check_image(&mut v, Some(&good));
        assert!(v.finish().is_ok());

        let bad = UploadedImage {
            content: b"x".to_vec(),
            extension: "exe".into(),
        };
        let mut v = Validator::new();
        check_image(&mut v, Some(&bad));
        assert!(v.finish().is_err());
    }
}
