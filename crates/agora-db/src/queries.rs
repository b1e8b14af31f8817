use crate::Database;
use crate::models::{CommentRow, PostRow, SubRow, TopSubRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password) VALUES (?1, ?2, ?3, ?4)",
                (id, username, email, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    // -- Subs --

    pub fn create_sub(
        &self,
        id: &str,
        name: &str,
        title: &str,
        description: &str,
        owner_username: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO subs (id, name, title, description, owner_username)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, name, title, description, owner_username),
            )?;
            Ok(())
        })
    }

    /// Case-insensitive lookup, used for the duplicate-name check so that
    /// `Foo` and `foo` cannot coexist.
    pub fn get_sub_by_name_ci(&self, name: &str) -> Result<Option<SubRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, title, description, owner_username, image_url, created_at
                 FROM subs WHERE lower(name) = lower(?1)",
            )?;

            let row = stmt
                .query_row([name], |row| {
                    Ok(SubRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        title: row.get(2)?,
                        description: row.get(3)?,
                        owner_username: row.get(4)?,
                        image_url: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })
                .optional()?;

            Ok(row)
        })
    }

    /// Post count per sub, zero-post subs included. Ordered by count
    /// descending with name as the tiebreak so results are deterministic.
    pub fn top_subs(&self, limit: u32) -> Result<Vec<TopSubRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT s.title, s.name, s.image_url, COUNT(p.id) AS post_count
                 FROM subs s
                 LEFT JOIN posts p ON p.sub_name = s.name
                 GROUP BY s.name
                 ORDER BY post_count DESC, s.name ASC
                 LIMIT ?1",
            )?;

            let rows = stmt
                .query_map([limit], |row| {
                    Ok(TopSubRow {
                        title: row.get(0)?,
                        name: row.get(1)?,
                        image_url: row.get(2)?,
                        post_count: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Posts --

    pub fn create_post(
        &self,
        id: &str,
        title: &str,
        body: Option<&str>,
        sub_name: &str,
        username: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, title, body, sub_name, username)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, title, body, sub_name, username),
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{POST_SELECT} WHERE p.id = ?1"
            ))?;
            let row = stmt.query_row([id], map_post_row).optional()?;
            Ok(row)
        })
    }

    pub fn get_posts_by_username(&self, username: &str) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{POST_SELECT} WHERE p.username = ?1 ORDER BY p.created_at DESC"
            ))?;
            let rows = stmt
                .query_map([username], map_post_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn post_exists(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT 1 FROM posts WHERE id = ?1", [id], |row| row.get(0))
                .optional()?;
            Ok(found.is_some())
        })
    }

    // -- Comments --

    pub fn create_comment(
        &self,
        id: &str,
        body: &str,
        post_id: &str,
        username: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, body, post_id, username)
                 VALUES (?1, ?2, ?3, ?4)",
                (id, body, post_id, username),
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{COMMENT_SELECT} WHERE c.id = ?1"))?;
            let row = stmt.query_row([id], map_comment_row).optional()?;
            Ok(row)
        })
    }

    pub fn get_comments_for_post(&self, post_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{COMMENT_SELECT} WHERE c.post_id = ?1 ORDER BY c.created_at DESC"
            ))?;
            let rows = stmt
                .query_map([post_id], map_comment_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_comments_by_username(&self, username: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{COMMENT_SELECT} WHERE c.username = ?1 ORDER BY c.created_at DESC"
            ))?;
            let rows = stmt
                .query_map([username], map_comment_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn comment_exists(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT 1 FROM comments WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(found.is_some())
        })
    }

    // -- Votes --

    /// Upsert the (user, post) vote: update the existing row's value in
    /// place if one exists, insert otherwise. Never leaves two rows for the
    /// same pair. Value 0 is stored as-is (a retraction, not a deletion).
    pub fn upsert_post_vote(
        &self,
        id: &str,
        username: &str,
        post_id: &str,
        value: i32,
    ) -> Result<()> {
        self.with_conn(|conn| upsert_vote(conn, "post_id", id, username, post_id, value))
    }

    /// Same contract as [`Database::upsert_post_vote`], keyed on the comment.
    pub fn upsert_comment_vote(
        &self,
        id: &str,
        username: &str,
        comment_id: &str,
        value: i32,
    ) -> Result<()> {
        self.with_conn(|conn| upsert_vote(conn, "comment_id", id, username, comment_id, value))
    }

    pub fn get_post_vote(&self, username: &str, post_id: &str) -> Result<Option<i32>> {
        self.with_conn(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM votes WHERE username = ?1 AND post_id = ?2",
                    (username, post_id),
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    pub fn get_comment_vote(&self, username: &str, comment_id: &str) -> Result<Option<i32>> {
        self.with_conn(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM votes WHERE username = ?1 AND comment_id = ?2",
                    (username, comment_id),
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }
}

// Vote scores are derived at fetch time by summing the vote rows; nothing in
// the schema stores a running counter.
const POST_SELECT: &str = "SELECT p.id, p.title, p.body, p.sub_name, p.username, p.created_at,
        COALESCE((SELECT SUM(v.value) FROM votes v WHERE v.post_id = p.id), 0) AS vote_score
 FROM posts p";

const COMMENT_SELECT: &str = "SELECT c.id, c.body, c.post_id, c.username, c.created_at,
        COALESCE((SELECT SUM(v.value) FROM votes v WHERE v.comment_id = c.id), 0) AS vote_score
 FROM comments c";

fn map_post_row(row: &rusqlite::Row<'_>) -> std::result::Result<PostRow, rusqlite::Error> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        sub_name: row.get(3)?,
        username: row.get(4)?,
        created_at: row.get(5)?,
        vote_score: row.get(6)?,
    })
}

fn map_comment_row(row: &rusqlite::Row<'_>) -> std::result::Result<CommentRow, rusqlite::Error> {
    Ok(CommentRow {
        id: row.get(0)?,
        body: row.get(1)?,
        post_id: row.get(2)?,
        username: row.get(3)?,
        created_at: row.get(4)?,
        vote_score: row.get(5)?,
    })
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is a code literal ("username" / "email"), never user input.
    let mut stmt = conn.prepare(&format!(
        "SELECT id, username, email, password, created_at FROM users WHERE {column} = ?1"
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn upsert_vote(
    conn: &Connection,
    column: &str,
    id: &str,
    username: &str,
    target_id: &str,
    value: i32,
) -> Result<()> {
    // Select-then-act; the UNIQUE(username, target) index backstops the
    // same-user race, which is last-write-wins by contract.
    let existing: Option<String> = conn
        .query_row(
            &format!("SELECT id FROM votes WHERE username = ?1 AND {column} = ?2"),
            (username, target_id),
            |row| row.get(0),
        )
        .optional()?;

    if let Some(existing_id) = existing {
        conn.execute(
            "UPDATE votes SET value = ?1 WHERE id = ?2",
            (value, existing_id),
        )?;
    } else {
        conn.execute(
            &format!("INSERT INTO votes (id, username, {column}, value) VALUES (?1, ?2, ?3, ?4)"),
            (id, username, target_id, value),
        )?;
    }

    Ok(())
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn seed_user(db: &Database, username: &str) {
        db.create_user(
            &Uuid::new_v4().to_string(),
            username,
            &format!("{username}@example.com"),
            "not-a-real-hash",
        )
        .unwrap();
    }

    fn seed_sub(db: &Database, name: &str, owner: &str) {
        db.create_sub(&Uuid::new_v4().to_string(), name, name, "", owner)
            .unwrap();
    }

    fn seed_post(db: &Database, sub: &str, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_post(&id, "a post", None, sub, username).unwrap();
        id
    }

    fn vote_row_count(db: &Database) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM votes", [], |row| row.get(0))?)
        })
        .unwrap()
    }

    #[test]
    fn duplicate_username_rejected_by_schema() {
        let db = test_db();
        seed_user(&db, "alice");
        let err = db.create_user(
            &Uuid::new_v4().to_string(),
            "alice",
            "other@example.com",
            "hash",
        );
        assert!(err.is_err());
    }

    #[test]
    fn sub_lookup_is_case_insensitive() {
        let db = test_db();
        seed_user(&db, "alice");
        seed_sub(&db, "Foo", "alice");

        assert!(db.get_sub_by_name_ci("foo").unwrap().is_some());
        assert!(db.get_sub_by_name_ci("FOO").unwrap().is_some());
        assert!(db.get_sub_by_name_ci("bar").unwrap().is_none());
    }

    #[test]
    fn vote_upsert_keeps_a_single_row() {
        let db = test_db();
        seed_user(&db, "alice");
        seed_sub(&db, "rust", "alice");
        let post = seed_post(&db, "rust", "alice");

        db.upsert_post_vote(&Uuid::new_v4().to_string(), "alice", &post, 1)
            .unwrap();
        db.upsert_post_vote(&Uuid::new_v4().to_string(), "alice", &post, -1)
            .unwrap();

        assert_eq!(vote_row_count(&db), 1);
        assert_eq!(db.get_post_vote("alice", &post).unwrap(), Some(-1));
        assert_eq!(db.get_post(&post).unwrap().unwrap().vote_score, -1);
    }

    #[test]
    fn votes_from_different_users_do_not_conflict() {
        let db = test_db();
        seed_user(&db, "alice");
        seed_user(&db, "bob");
        seed_sub(&db, "rust", "alice");
        let post = seed_post(&db, "rust", "alice");

        db.upsert_post_vote(&Uuid::new_v4().to_string(), "alice", &post, 1)
            .unwrap();
        db.upsert_post_vote(&Uuid::new_v4().to_string(), "bob", &post, 1)
            .unwrap();

        assert_eq!(vote_row_count(&db), 2);
        assert_eq!(db.get_post(&post).unwrap().unwrap().vote_score, 2);
    }

    #[test]
    fn retraction_keeps_the_row_with_value_zero() {
        let db = test_db();
        seed_user(&db, "alice");
        seed_sub(&db, "rust", "alice");
        let post = seed_post(&db, "rust", "alice");

        db.upsert_post_vote(&Uuid::new_v4().to_string(), "alice", &post, 1)
            .unwrap();
        db.upsert_post_vote(&Uuid::new_v4().to_string(), "alice", &post, 0)
            .unwrap();

        assert_eq!(vote_row_count(&db), 1);
        assert_eq!(db.get_post_vote("alice", &post).unwrap(), Some(0));
        assert_eq!(db.get_post(&post).unwrap().unwrap().vote_score, 0);
    }

    #[test]
    fn comment_votes_are_keyed_separately_from_post_votes() {
        let db = test_db();
        seed_user(&db, "alice");
        seed_sub(&db, "rust", "alice");
        let post = seed_post(&db, "rust", "alice");
        let comment = Uuid::new_v4().to_string();
        db.create_comment(&comment, "nice", &post, "alice").unwrap();

        db.upsert_post_vote(&Uuid::new_v4().to_string(), "alice", &post, 1)
            .unwrap();
        db.upsert_comment_vote(&Uuid::new_v4().to_string(), "alice", &comment, -1)
            .unwrap();

        assert_eq!(vote_row_count(&db), 2);
        assert_eq!(db.get_comment_vote("alice", &comment).unwrap(), Some(-1));
    }

    #[test]
    fn top_subs_orders_by_post_count_and_includes_empty_subs() {
        let db = test_db();
        seed_user(&db, "alice");
        for (name, posts) in [("a", 5), ("b", 3), ("c", 3), ("d", 0)] {
            seed_sub(&db, name, "alice");
            for _ in 0..posts {
                seed_post(&db, name, "alice");
            }
        }

        let top = db.top_subs(5).unwrap();
        let counts: Vec<i64> = top.iter().map(|s| s.post_count).collect();
        assert_eq!(counts, vec![5, 3, 3, 0]);
        // Ties and the zero-count sub resolve on the name tiebreak.
        assert_eq!(top[1].name, "b");
        assert_eq!(top[2].name, "c");
        assert_eq!(top[3].name, "d");
    }

    #[test]
    fn top_subs_caps_the_result() {
        let db = test_db();
        seed_user(&db, "alice");
        for name in ["a", "b", "c", "d", "e", "f", "g"] {
            seed_sub(&db, name, "alice");
        }

        assert_eq!(db.top_subs(5).unwrap().len(), 5);
    }

    #[test]
    fn user_posts_and_comments_come_back_newest_first() {
        let db = test_db();
        seed_user(&db, "alice");
        seed_sub(&db, "rust", "alice");
        let old = seed_post(&db, "rust", "alice");
        let new = seed_post(&db, "rust", "alice");

        // datetime('now') has one-second resolution; pin distinct times.
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE posts SET created_at = '2026-01-01 00:00:00' WHERE id = ?1",
                [&old],
            )?;
            conn.execute(
                "UPDATE posts SET created_at = '2026-01-02 00:00:00' WHERE id = ?1",
                [&new],
            )?;
            Ok(())
        })
        .unwrap();

        let posts = db.get_posts_by_username("alice").unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, new);
        assert_eq!(posts[1].id, old);
    }
}
