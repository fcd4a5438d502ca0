use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row};
use uuid::Uuid;

use chirp_types::{User, UserProfile};

use crate::db::schema::SEED_USER_ID;
use crate::db::{timestamp, timestamp_column, uuid_column, DbPool};

const USER_COLUMNS: &str =
    "id, name, username, bio, profile_picture, mime_type, super_user, created_at";

/// Raw profile image as stored in the users table
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Input for signup
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub bio: Option<String>,
    pub profile_picture: Option<ProfileImage>,
    pub super_user: bool,
}

/// A freshly inserted user plus the follow edges seeded with it
#[derive(Debug)]
pub struct CreatedUser {
    pub user: User,
    /// Edges pointing at the new user
    pub followers_seeded: usize,
    /// Edges from the new user to existing superusers
    pub following_seeded: usize,
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let picture: Option<Vec<u8>> = row.get(4)?;
    Ok(User {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        username: row.get(2)?,
        bio: row.get(3)?,
        profile_picture: picture.map(|bytes| general_purpose::STANDARD.encode(bytes)),
        mime_type: row.get(5)?,
        super_user: row.get::<_, i32>(6)? == 1,
        created_at: timestamp_column(row, 7)?,
    })
}

fn map_profile(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    let picture: Option<Vec<u8>> = row.get(4)?;
    Ok(UserProfile {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        username: row.get(2)?,
        bio: row.get(3)?,
        profile_picture: picture.map(|bytes| general_purpose::STANDARD.encode(bytes)),
        mime_type: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
        follower_count: row.get(7)?,
        following_count: row.get(8)?,
        post_count: row.get(9)?,
        is_following: row.get::<_, i32>(10)? == 1,
    })
}

pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub fn get_by_id(&self, user_id: &Uuid) -> Result<Option<User>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))?;
        let user = stmt.query_row([user_id.to_string()], map_user).optional()?;
        Ok(user)
    }

    /// Get user by username
    pub fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.pool.get()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS))?;
        let user = stmt.query_row([username], map_user).optional()?;
        Ok(user)
    }

    pub fn exists(&self, user_id: &Uuid) -> Result<bool> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE id = ?",
            [user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Insert a user and seed its follow edges in one transaction
    ///
    /// - a superuser is followed by every existing user
    /// - an ordinary user is followed by the seed user, when present
    /// - every new user follows all existing superusers
    ///
    /// A taken username fails the insert with a UNIQUE violation and nothing
    /// is written.
    pub fn create_with_follows(&self, new_user: &NewUser) -> Result<CreatedUser> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let user_id = Uuid::new_v4();
        let created_at = Utc::now();
        let id = user_id.to_string();
        let now = timestamp(&created_at);

        tx.execute(
            "INSERT INTO users (id, name, username, bio, profile_picture, mime_type, super_user, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            (
                &id,
                &new_user.name,
                &new_user.username,
                &new_user.bio,
                new_user.profile_picture.as_ref().map(|p| p.bytes.as_slice()),
                new_user.profile_picture.as_ref().map(|p| p.mime_type.as_str()),
                if new_user.super_user { 1 } else { 0 },
                &now,
            ),
        )
        .context("Failed to create user")?;

        let followers_seeded = if new_user.super_user {
            tx.execute(
                "INSERT OR IGNORE INTO follows (follower_id, following_id, created_at)
                 SELECT id, ?1, ?2 FROM users WHERE id != ?1",
                (&id, &now),
            )
            .context("Failed to seed followers for superuser")?
        } else {
            tx.execute(
                "INSERT OR IGNORE INTO follows (follower_id, following_id, created_at)
                 SELECT id, ?1, ?2 FROM users WHERE id = ?3 AND id != ?1",
                (&id, &now, SEED_USER_ID),
            )
            .context("Failed to seed follow from seed user")?
        };

        let following_seeded = tx
            .execute(
                "INSERT OR IGNORE INTO follows (follower_id, following_id, created_at)
                 SELECT ?1, id, ?2 FROM users WHERE super_user = 1 AND id != ?1",
                (&id, &now),
            )
            .context("Failed to follow existing superusers")?;

        tx.commit().context("Failed to commit user creation")?;

        let user = User {
            id: user_id,
            name: new_user.name.clone(),
            username: new_user.username.clone(),
            bio: new_user.bio.clone(),
            profile_picture: new_user
                .profile_picture
                .as_ref()
                .map(|p| general_purpose::STANDARD.encode(&p.bytes)),
            mime_type: new_user.profile_picture.as_ref().map(|p| p.mime_type.clone()),
            super_user: new_user.super_user,
            created_at: parse_stored(&now)?,
        };

        Ok(CreatedUser {
            user,
            followers_seeded,
            following_seeded,
        })
    }

    /// Profile with counts, looked up by username
    pub fn get_profile_by_username(
        &self,
        username: &str,
        viewer_id: Option<&Uuid>,
    ) -> Result<Option<UserProfile>> {
        self.get_profile("u.username = ?1", username.to_string(), viewer_id)
    }

    /// Profile with counts, looked up by id
    pub fn get_profile_by_id(
        &self,
        user_id: &Uuid,
        viewer_id: Option<&Uuid>,
    ) -> Result<Option<UserProfile>> {
        self.get_profile("u.id = ?1", user_id.to_string(), viewer_id)
    }

    fn get_profile(
        &self,
        filter: &str,
        key: String,
        viewer_id: Option<&Uuid>,
    ) -> Result<Option<UserProfile>> {
        let conn = self.pool.get()?;
        let query = format!(
            "SELECT u.id, u.name, u.username, u.bio, u.profile_picture, u.mime_type, u.created_at,
                    (SELECT COUNT(*) FROM follows WHERE following_id = u.id) AS follower_count,
                    (SELECT COUNT(*) FROM follows WHERE follower_id = u.id) AS following_count,
                    (SELECT COUNT(*) FROM posts WHERE author_id = u.id) AS post_count,
                    EXISTS(SELECT 1 FROM follows WHERE follower_id = ?2 AND following_id = u.id) AS is_following
             FROM users u
             WHERE {}",
            filter
        );

        let mut stmt = conn.prepare(&query)?;
        let profile = stmt
            .query_row((key, viewer_id.map(|id| id.to_string())), map_profile)
            .optional()?;
        Ok(profile)
    }

    /// Ids of every user that is not a superuser
    pub fn list_ordinary_ids(&self) -> Result<Vec<Uuid>> {
        let conn = self.pool.get()?;
        let mut stmt =
            conn.prepare("SELECT id FROM users WHERE super_user = 0 ORDER BY created_at")?;
        let ids = stmt
            .query_map([], |row| uuid_column(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

fn parse_stored(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .context("Failed to parse stored timestamp")
}
