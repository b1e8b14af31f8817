/// Database row types — these map directly to SQLite rows.
/// Distinct from agora-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct SubRow {
    pub id: String,
    pub name: String,
    pub title: String,
    pub description: String,
    pub owner_username: String,
    pub image_url: Option<String>,
    pub created_at: String,
}

/// `vote_score` is computed by a subquery at fetch time, not stored.
pub struct PostRow {
    pub id: String,
    pub title: String,
    pub body: Option<String>,
    pub sub_name: String,
    pub username: String,
    pub created_at: String,
    pub vote_score: i64,
}

pub struct CommentRow {
    pub id: String,
    pub body: String,
    pub post_id: String,
    pub username: String,
    pub created_at: String,
    pub vote_score: i64,
}

pub struct TopSubRow {
    pub title: String,
    pub name: String,
    pub image_url: Option<String>,
    pub post_count: i64,
}
