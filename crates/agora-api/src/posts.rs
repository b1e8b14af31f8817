use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use agora_db::Database;
use agora_db::models::{CommentRow, PostRow};
use agora_types::api::{
    CommentResponse, CreateCommentRequest, CreatePostRequest, PostDetailResponse, PostResponse,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::{CurrentUser, MaybeUser};

pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.is_empty() {
        return Err(ApiError::field("title", "Title must not be empty"));
    }

    let sub = state
        .db
        .get_sub_by_name_ci(&req.sub)?
        .ok_or_else(|| ApiError::NotFound("Sub not found".to_string()))?;

    let post_id = Uuid::new_v4();
    state.db.create_post(
        &post_id.to_string(),
        &req.title,
        req.body.as_deref(),
        // stored casing of the sub name, not whatever the request carried
        &sub.name,
        &user.username,
    )?;

    // Read the row back so the response carries the stored timestamp
    let row = state
        .db
        .get_post(&post_id.to_string())?
        .ok_or_else(|| anyhow::anyhow!("post row missing after insert"))?;

    Ok(Json(post_response(&row)))
}

pub async fn get_post(
    State(state): State<AppState>,
    Extension(MaybeUser(viewer)): Extension<MaybeUser>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<PostDetailResponse>, ApiError> {
    let row = state
        .db
        .get_post(&post_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    let comment_rows = state.db.get_comments_for_post(&row.id)?;

    let mut post = post_response(&row);
    let mut comments: Vec<CommentResponse> = comment_rows.iter().map(comment_response).collect();

    if let Some(viewer) = &viewer {
        set_user_vote_on_post(&state.db, &viewer.username, &mut post)?;
        for comment in &mut comments {
            set_user_vote_on_comment(&state.db, &viewer.username, comment)?;
        }
    }

    Ok(Json(PostDetailResponse { post, comments }))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.body.is_empty() {
        return Err(ApiError::field("body", "Body must not be empty"));
    }

    if !state.db.post_exists(&post_id.to_string())? {
        return Err(ApiError::NotFound("Post not found".to_string()));
    }

    let comment_id = Uuid::new_v4();
    state
        .db
        .create_comment(&comment_id.to_string(), &req.body, &post_id.to_string(), &user.username)?;

    let row = state
        .db
        .get_comment(&comment_id.to_string())?
        .ok_or_else(|| anyhow::anyhow!("comment row missing after insert"))?;

    Ok(Json(comment_response(&row)))
}

pub(crate) fn post_response(row: &PostRow) -> PostResponse {
    PostResponse {
        id: crate::parse_row_id(&row.id),
        title: row.title.clone(),
        body: row.body.clone(),
        sub: row.sub_name.clone(),
        username: row.username.clone(),
        created_at: crate::parse_created_at(&row.created_at),
        vote_score: row.vote_score,
        user_vote: None,
    }
}

pub(crate) fn comment_response(row: &CommentRow) -> CommentResponse {
    CommentResponse {
        id: crate::parse_row_id(&row.id),
        post_id: crate::parse_row_id(&row.post_id),
        body: row.body.clone(),
        username: row.username.clone(),
        created_at: crate::parse_created_at(&row.created_at),
        vote_score: row.vote_score,
        user_vote: None,
    }
}

pub(crate) fn set_user_vote_on_post(
    db: &Database,
    username: &str,
    post: &mut PostResponse,
) -> Result<(), ApiError> {
    post.user_vote = db.get_post_vote(username, &post.id.to_string())?;
    Ok(())
}

pub(crate) fn set_user_vote_on_comment(
    db: &Database,
    username: &str,
    comment: &mut CommentResponse,
) -> Result<(), ApiError> {
    comment.user_vote = db.get_comment_vote(username, &comment.id.to_string())?;
    Ok(())
}
