use std::collections::HashMap;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use uuid::Uuid;

use agora_db::models::SubRow;
use agora_types::api::{CreateSubRequest, SubResponse, TopSubEntry};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

/// Shown for subs without a custom image.
pub const DEFAULT_SUB_IMAGE_URL: &str = "https://www.gravatar.com/avatar?d=mp&f=y";

const TOP_SUBS_LIMIT: u32 = 5;

pub async fn create_sub(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateSubRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = HashMap::new();
    if req.name.is_empty() {
        errors.insert("name".to_string(), "Name must not be empty".to_string());
    }
    if req.title.is_empty() {
        errors.insert("title".to_string(), "Title must not be empty".to_string());
    }

    // Case-insensitive duplicate check so `Foo` and `foo` cannot coexist.
    // Check and insert are two round trips; the same-name race window is
    // accepted and the unique index backstops exact-case duplicates.
    if !req.name.is_empty() && state.db.get_sub_by_name_ci(&req.name)?.is_some() {
        errors.insert("name".to_string(), "Sub already exists".to_string());
    }

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let sub_id = Uuid::new_v4();
    state.db.create_sub(
        &sub_id.to_string(),
        &req.name,
        &req.title,
        &req.description,
        &user.username,
    )?;

    // Read the row back so the response carries the stored timestamp
    let sub = state
        .db
        .get_sub_by_name_ci(&req.name)?
        .ok_or_else(|| anyhow::anyhow!("sub row missing after insert"))?;

    Ok(Json(sub_response(&sub)))
}

fn sub_response(row: &SubRow) -> SubResponse {
    SubResponse {
        id: crate::parse_row_id(&row.id),
        name: row.name.clone(),
        title: row.title.clone(),
        description: row.description.clone(),
        owner: row.owner_username.clone(),
        image_url: row.image_url.clone(),
        created_at: crate::parse_created_at(&row.created_at),
    }
}

/// Post count per community, recomputed on every call. Zero-post subs are
/// included; missing images fall back to the default avatar.
pub async fn top_subs(State(state): State<AppState>) -> Result<Json<Vec<TopSubEntry>>, ApiError> {
    let rows = state.db.top_subs(TOP_SUBS_LIMIT)?;

    let entries = rows
        .into_iter()
        .map(|row| TopSubEntry {
            title: row.title,
            name: row.name,
            image_url: row
                .image_url
                .unwrap_or_else(|| DEFAULT_SUB_IMAGE_URL.to_string()),
            post_count: row.post_count,
        })
        .collect();

    Ok(Json(entries))
}
