use crate::db::{timestamp, Database};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

/// How long a session token stays valid
pub const SESSION_TTL_DAYS: i64 = 30;

/// Database-backed session manager
///
/// Tokens are UUID v4 strings mapped to a user id with an expiry. Expired
/// tokens are rejected on validation and removed by periodic cleanup.
#[derive(Clone)]
pub struct SessionManager {
    db: Database,
}

impl SessionManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a new session for a user and return its token
    pub fn create_session(&self, user_id: Uuid) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let expires_at = created_at + Duration::days(SESSION_TTL_DAYS);

        let conn = self.db.connection()?;
        conn.execute(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                token,
                user_id.to_string(),
                timestamp(&created_at),
                timestamp(&expires_at),
            ],
        )
        .context("Failed to create session")?;

        tracing::info!("Created session for user {}", user_id);
        Ok(token)
    }

    /// Validate a session token and return the associated user ID
    ///
    /// Returns `Ok(None)` for unknown or expired tokens.
    pub fn validate_session(&self, token: &str) -> Result<Option<Uuid>> {
        let row: Option<(String, String)> = {
            let conn = self.db.connection()?;
            conn.query_row(
                "SELECT user_id, expires_at FROM sessions WHERE token = ?1",
                rusqlite::params![token],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("Failed to look up session")?
        };

        let Some((user_id_str, expires_at_str)) = row else {
            return Ok(None);
        };

        let expires_at = expires_at_str
            .parse::<DateTime<Utc>>()
            .context("Failed to parse expiry time")?;

        if Utc::now() > expires_at {
            self.delete_session(token)?;
            return Ok(None);
        }

        let user_id = Uuid::parse_str(&user_id_str).context("Failed to parse user ID")?;
        Ok(Some(user_id))
    }

    /// Delete a session (logout)
    pub fn delete_session(&self, token: &str) -> Result<bool> {
        let conn = self.db.connection()?;
        let rows_affected = conn
            .execute(
                "DELETE FROM sessions WHERE token = ?1",
                rusqlite::params![token],
            )
            .context("Failed to delete session")?;

        if rows_affected > 0 {
            tracing::info!("Deleted session");
        }

        Ok(rows_affected > 0)
    }

    /// Remove all sessions past their expiry time
    pub fn cleanup_expired_sessions(&self) -> Result<usize> {
        let conn = self.db.connection()?;
        let now = timestamp(&Utc::now());

        let rows_affected = conn
            .execute(
                "DELETE FROM sessions WHERE expires_at < ?1",
                rusqlite::params![now],
            )
            .context("Failed to cleanup expired sessions")?;

        if rows_affected > 0 {
            tracing::info!("Cleaned up {} expired sessions", rows_affected);
        }

        Ok(rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{NewUser, UserRepository};

    fn setup_test_db() -> (Database, Uuid) {
        let db = Database::in_memory().expect("Failed to create test database");
        db.initialize().expect("Failed to initialize database");

        let user = UserRepository::new(db.pool.clone())
            .create_with_follows(&NewUser {
                name: "Test User".to_string(),
                username: "testuser".to_string(),
                bio: None,
                profile_picture: None,
                super_user: false,
            })
            .expect("Failed to create test user")
            .user;

        (db, user.id)
    }

    #[test]
    fn test_create_and_validate_session() {
        let (db, user_id) = setup_test_db();
        let manager = SessionManager::new(db);

        let token = manager.create_session(user_id).expect("Failed to create session");
        assert!(Uuid::parse_str(&token).is_ok(), "Token should be a valid UUID");

        let validated = manager.validate_session(&token).expect("Failed to validate session");
        assert_eq!(validated, Some(user_id));
    }

    #[test]
    fn test_validate_invalid_session() {
        let (db, _user_id) = setup_test_db();
        let manager = SessionManager::new(db);

        assert_eq!(manager.validate_session("invalid-token").unwrap(), None);
    }

    #[test]
    fn test_delete_session() {
        let (db, user_id) = setup_test_db();
        let manager = SessionManager::new(db);

        let token = manager.create_session(user_id).expect("Failed to create session");
        assert!(manager.delete_session(&token).expect("Failed to delete session"));
        assert!(!manager.delete_session(&token).unwrap());

        assert_eq!(manager.validate_session(&token).unwrap(), None);
    }

    #[test]
    fn test_expired_session_is_rejected_and_cleaned() {
        let (db, user_id) = setup_test_db();
        let manager = SessionManager::new(db.clone());

        let expired = manager.create_session(user_id).unwrap();
        let live = manager.create_session(user_id).unwrap();

        {
            let conn = db.connection().unwrap();
            conn.execute(
                "UPDATE sessions SET expires_at = ?1 WHERE token = ?2",
                rusqlite::params![timestamp(&(Utc::now() - Duration::days(1))), expired],
            )
            .unwrap();
        }

        assert_eq!(manager.cleanup_expired_sessions().unwrap(), 1);
        assert_eq!(manager.validate_session(&expired).unwrap(), None);
        assert_eq!(manager.validate_session(&live).unwrap(), Some(user_id));
    }

    #[test]
    fn test_validate_removes_expired_session() {
        let (db, user_id) = setup_test_db();
        let manager = SessionManager::new(db.clone());
        let token = manager.create_session(user_id).unwrap();

        {
            let conn = db.connection().unwrap();
            conn.execute(
                "UPDATE sessions SET expires_at = ?1 WHERE token = ?2",
                rusqlite::params![timestamp(&(Utc::now() - Duration::seconds(1))), token],
            )
            .unwrap();
        }

        assert_eq!(manager.validate_session(&token).unwrap(), None);
        assert_eq!(manager.cleanup_expired_sessions().unwrap(), 0);
    }
}
