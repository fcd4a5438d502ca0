use anyhow::{Context, Result};
use chrono::Utc;
use uuid::Uuid;

use chirp_types::FollowAction;

use crate::db::{timestamp, DbPool};

pub struct FollowRepository {
    pool: DbPool,
}

impl FollowRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Remove the edge if it exists, otherwise create it
    ///
    /// The DELETE decides the outcome, so two toggles racing on the same pair
    /// cannot both insert.
    pub fn toggle(&self, follower_id: &Uuid, following_id: &Uuid) -> Result<FollowAction> {
        let conn = self.pool.get()?;
        let follower = follower_id.to_string();
        let following = following_id.to_string();

        let removed = conn
            .execute(
                "DELETE FROM follows WHERE follower_id = ? AND following_id = ?",
                (&follower, &following),
            )
            .context("Failed to unfollow user")?;

        if removed > 0 {
            return Ok(FollowAction::Unfollowed);
        }

        conn.execute(
            "INSERT OR IGNORE INTO follows (follower_id, following_id, created_at) VALUES (?, ?, ?)",
            (&follower, &following, timestamp(&Utc::now())),
        )
        .context("Failed to follow user")?;

        Ok(FollowAction::Followed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{NewUser, UserRepository};
    use crate::db::Database;

    fn setup_test_db() -> (Database, FollowRepository, Uuid, Uuid) {
        let db = Database::in_memory().expect("Failed to create test database");
        db.initialize().expect("Failed to initialize schema");
        let users = UserRepository::new(db.pool.clone());
        let mut ids = Vec::new();
        for username in ["alice", "bob"] {
            let created = users
                .create_with_follows(&NewUser {
                    name: username.to_string(),
                    username: username.to_string(),
                    bio: None,
                    profile_picture: None,
                    super_user: false,
                })
                .expect("Failed to create user");
            ids.push(created.user.id);
        }
        let repo = FollowRepository::new(db.pool.clone());
        (db, repo, ids[0], ids[1])
    }

    fn edge_exists(db: &Database, follower: &Uuid, following: &Uuid) -> bool {
        let conn = db.connection().unwrap();
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ? AND following_id = ?)",
            (follower.to_string(), following.to_string()),
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_toggle_twice_restores_state() {
        let (db, repo, alice, bob) = setup_test_db();
        assert!(!edge_exists(&db, &alice, &bob));

        assert_eq!(repo.toggle(&alice, &bob).unwrap(), FollowAction::Followed);
        assert!(edge_exists(&db, &alice, &bob));

        assert_eq!(repo.toggle(&alice, &bob).unwrap(), FollowAction::Unfollowed);
        assert!(!edge_exists(&db, &alice, &bob));
    }

    #[test]
    fn test_follow_is_directed() {
        let (db, repo, alice, bob) = setup_test_db();
        repo.toggle(&alice, &bob).unwrap();

        assert!(edge_exists(&db, &alice, &bob));
        assert!(!edge_exists(&db, &bob, &alice));
    }

    #[test]
    fn test_toggle_unknown_user_fails() {
        let (_db, repo, alice, _bob) = setup_test_db();
        assert!(repo.toggle(&Uuid::new_v4(), &alice).is_err());
    }
}
