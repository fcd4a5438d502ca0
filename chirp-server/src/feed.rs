use anyhow::Result;
use uuid::Uuid;

use chirp_types::Post;

use crate::db::repositories::PostRepository;
use crate::db::DbPool;

/// Maximum number of posts in a home feed
pub const FEED_LIMIT: i64 = 50;

/// Assemble the home feed for a user: their own posts plus those of everyone
/// they follow, newest first, capped at `limit`
pub fn assemble_feed(pool: &DbPool, user_id: &Uuid, limit: i64) -> Result<Vec<Post>> {
    tracing::debug!("Assembling feed for {}", user_id);
    PostRepository::new(pool.clone()).get_feed(user_id, limit)
}
