use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{OptionalExtension, Row};
use uuid::Uuid;

use chirp_types::{Author, Post};

use crate::db::{timestamp, timestamp_column, uuid_column, DbPool};

const POST_SELECT: &str = "SELECT p.id, p.text, p.image_url, p.author_id, p.created_at, u.name, u.username,
            (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
     FROM posts p
     JOIN users u ON p.author_id = u.id";

/// Newest first; rowid breaks ties between posts created in the same instant
const NEWEST_FIRST: &str = "ORDER BY p.created_at DESC, p.rowid DESC";

fn map_post(row: &Row<'_>) -> rusqlite::Result<Post> {
    let author_id = uuid_column(row, 3)?;
    Ok(Post {
        id: uuid_column(row, 0)?,
        text: row.get(1)?,
        image_url: row.get(2)?,
        user_id: author_id,
        created_at: timestamp_column(row, 4)?,
        author: Author {
            id: author_id,
            name: row.get(5)?,
            username: row.get(6)?,
        },
        comment_count: row.get(7)?,
    })
}

pub struct PostRepository {
    pool: DbPool,
}

impl PostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new post
    pub fn create(&self, author: &Author, text: &str, image_url: Option<&str>) -> Result<Post> {
        let conn = self.pool.get()?;
        let id = Uuid::new_v4();
        let now = timestamp(&Utc::now());

        conn.execute(
            "INSERT INTO posts (id, text, image_url, author_id, created_at) VALUES (?, ?, ?, ?, ?)",
            (id.to_string(), text, image_url, author.id.to_string(), &now),
        )
        .context("Failed to create post")?;

        Ok(Post {
            id,
            text: text.to_string(),
            image_url: image_url.map(str::to_string),
            user_id: author.id,
            created_at: now.parse().context("Failed to parse post timestamp")?,
            author: author.clone(),
            comment_count: 0,
        })
    }

    /// Get a single post by ID
    pub fn get_by_id(&self, post_id: &Uuid) -> Result<Option<Post>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!("{} WHERE p.id = ?", POST_SELECT))?;
        let post = stmt.query_row([post_id.to_string()], map_post).optional()?;
        Ok(post)
    }

    pub fn exists(&self, post_id: &Uuid) -> Result<bool> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE id = ?",
            [post_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Get posts by a specific user, newest first
    pub fn get_by_author(&self, author_id: &Uuid) -> Result<Vec<Post>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE p.author_id = ? {}",
            POST_SELECT, NEWEST_FIRST
        ))?;

        let posts = stmt
            .query_map([author_id.to_string()], map_post)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    /// Newest posts by `user_id` or anyone they follow
    ///
    /// The follow set is read by a subquery, so its size never reaches the
    /// bound-parameter limit.
    pub fn get_feed(&self, user_id: &Uuid, limit: i64) -> Result<Vec<Post>> {
        if limit <= 0 {
            return Ok(Vec::new());
        }

        let conn = self.pool.get()?;
        let query = format!(
            "{} WHERE p.author_id = ?1
                OR p.author_id IN (SELECT following_id FROM follows WHERE follower_id = ?1)
             {} LIMIT ?2",
            POST_SELECT, NEWEST_FIRST
        );

        let mut stmt = conn.prepare(&query)?;
        let posts = stmt
            .query_map((user_id.to_string(), limit), map_post)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to load feed")?;

        Ok(posts)
    }
}
