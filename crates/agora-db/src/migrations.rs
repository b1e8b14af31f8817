use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS subs (
            id              TEXT PRIMARY KEY,
            name            TEXT NOT NULL UNIQUE,
            title           TEXT NOT NULL,
            description     TEXT NOT NULL DEFAULT '',
            owner_username  TEXT NOT NULL REFERENCES users(username),
            image_url       TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS posts (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            body        TEXT,
            sub_name    TEXT NOT NULL REFERENCES subs(name),
            username    TEXT NOT NULL REFERENCES users(username),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_posts_sub
            ON posts(sub_name, created_at);
        CREATE INDEX IF NOT EXISTS idx_posts_username
            ON posts(username, created_at);

        CREATE TABLE IF NOT EXISTS comments (
            id          TEXT PRIMARY KEY,
            body        TEXT NOT NULL,
            post_id     TEXT NOT NULL REFERENCES posts(id),
            username    TEXT NOT NULL REFERENCES users(username),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_comments_post
            ON comments(post_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_comments_username
            ON comments(username, created_at);

        -- One vote row per (user, target); value 0 is a retraction.
        -- A vote references either a post or a comment, never both.
        CREATE TABLE IF NOT EXISTS votes (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL REFERENCES users(username),
            post_id     TEXT REFERENCES posts(id),
            comment_id  TEXT REFERENCES comments(id),
            value       INTEGER NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(username, post_id),
            UNIQUE(username, comment_id)
        );

        CREATE INDEX IF NOT EXISTS idx_votes_post
            ON votes(post_id);
        CREATE INDEX IF NOT EXISTS idx_votes_comment
            ON votes(comment_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
