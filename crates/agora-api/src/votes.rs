use axum::{Extension, Json, extract::State, response::IntoResponse};
use uuid::Uuid;

use agora_types::api::VoteRequest;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

/// Upsert the caller's vote on a post or comment. The handler persists
/// whatever value it receives — toggling an identical vote back to 0 is the
/// caller's concern. Scores are never maintained here; consumers sum the
/// vote rows on read.
pub async fn cast_vote(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !matches!(req.value, -1 | 0 | 1) {
        return Err(ApiError::field("value", "Value must be -1, 0 or 1"));
    }

    let vote_id = Uuid::new_v4();

    match (req.post_id, req.comment_id) {
        (Some(post_id), None) => {
            if !state.db.post_exists(&post_id.to_string())? {
                return Err(ApiError::NotFound("Post not found".to_string()));
            }
            state.db.upsert_post_vote(
                &vote_id.to_string(),
                &user.username,
                &post_id.to_string(),
                req.value,
            )?;
        }
        (None, Some(comment_id)) => {
            if !state.db.comment_exists(&comment_id.to_string())? {
                return Err(ApiError::NotFound("Comment not found".to_string()));
            }
            state.db.upsert_comment_vote(
                &vote_id.to_string(),
                &user.username,
                &comment_id.to_string(),
                req.value,
            )?;
        }
        _ => {
            return Err(ApiError::field(
                "target",
                "Exactly one of post_id or comment_id must be set",
            ));
        }
    }

    Ok(Json(serde_json::json!({ "value": req.value })))
}
