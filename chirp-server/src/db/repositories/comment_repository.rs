use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::Row;
use uuid::Uuid;

use chirp_types::{Author, Comment};

use crate::db::{timestamp, timestamp_column, uuid_column, DbPool};

fn map_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    let author_id = uuid_column(row, 4)?;
    Ok(Comment {
        id: uuid_column(row, 0)?,
        post_id: uuid_column(row, 1)?,
        text: row.get(2)?,
        image_url: row.get(3)?,
        user_id: author_id,
        created_at: timestamp_column(row, 5)?,
        author: Author {
            id: author_id,
            name: row.get(6)?,
            username: row.get(7)?,
        },
    })
}

pub struct CommentRepository {
    pool: DbPool,
}

impl CommentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a comment under an existing post
    pub fn create(
        &self,
        post_id: &Uuid,
        author: &Author,
        text: &str,
        image_url: Option<&str>,
    ) -> Result<Comment> {
        let conn = self.pool.get()?;
        let id = Uuid::new_v4();
        let now = timestamp(&Utc::now());

        conn.execute(
            "INSERT INTO comments (id, post_id, text, image_url, author_id, created_at) VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                post_id.to_string(),
                text,
                image_url,
                author.id.to_string(),
                &now,
            ),
        )
        .context("Failed to create comment")?;

        Ok(Comment {
            id,
            post_id: *post_id,
            text: text.to_string(),
            image_url: image_url.map(str::to_string),
            user_id: author.id,
            created_at: now.parse().context("Failed to parse comment timestamp")?,
            author: author.clone(),
        })
    }

    /// All comments on a post, newest first
    pub fn get_by_post(&self, post_id: &Uuid) -> Result<Vec<Comment>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.post_id, c.text, c.image_url, c.author_id, c.created_at, u.name, u.username
             FROM comments c
             JOIN users u ON c.author_id = u.id
             WHERE c.post_id = ?
             ORDER BY c.created_at DESC, c.rowid DESC",
        )?;

        let comments = stmt
            .query_map([post_id.to_string()], map_comment)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(comments)
    }
}
