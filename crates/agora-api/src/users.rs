use axum::{
    Extension, Json,
    extract::{Path, State},
};

use agora_types::api::{
    ActivityItem, CommentResponse, PostResponse, UserActivityResponse, UserSummary,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::MaybeUser;
use crate::posts::{comment_response, post_response, set_user_vote_on_comment, set_user_vote_on_post};

/// Everything a user has written, merged into one feed. Anonymous viewers get
/// the same data without the per-item `user_vote`.
pub async fn get_user_activity(
    State(state): State<AppState>,
    Extension(MaybeUser(viewer)): Extension<MaybeUser>,
    Path(username): Path<String>,
) -> Result<Json<UserActivityResponse>, ApiError> {
    let user = state
        .db
        .get_user_by_username(&username)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let post_rows = state.db.get_posts_by_username(&user.username)?;
    let comment_rows = state.db.get_comments_by_username(&user.username)?;

    let mut posts: Vec<PostResponse> = post_rows.iter().map(post_response).collect();
    let mut comments: Vec<CommentResponse> = comment_rows.iter().map(comment_response).collect();

    if let Some(viewer) = &viewer {
        for post in &mut posts {
            set_user_vote_on_post(&state.db, &viewer.username, post)?;
        }
        for comment in &mut comments {
            set_user_vote_on_comment(&state.db, &viewer.username, comment)?;
        }
    }

    Ok(Json(UserActivityResponse {
        user: UserSummary {
            username: user.username,
            created_at: crate::parse_created_at(&user.created_at),
        },
        user_data: merge_activity(posts, comments),
    }))
}

/// Merge posts and comments into one tagged feed, newest first. `sort_by` is
/// stable, so entries with equal timestamps keep their relative order.
pub(crate) fn merge_activity(
    posts: Vec<PostResponse>,
    comments: Vec<CommentResponse>,
) -> Vec<ActivityItem> {
    let mut items: Vec<ActivityItem> = posts
        .into_iter()
        .map(ActivityItem::Post)
        .chain(comments.into_iter().map(ActivityItem::Comment))
        .collect();

    items.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    items
}
