use anyhow::{Context, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

use super::schema::{SCHEMA, SEED_DATA};

/// SQLite in-memory database identifier
const MEMORY_DB_PATH: &str = ":memory:";

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Database wrapper with connection pooling support
#[derive(Clone)]
pub struct Database {
    pub pool: DbPool,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// Every in-memory connection is its own database, so a memory pool is
    /// pinned to a single connection. Callers must not hold two connections
    /// at once.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (manager, is_memory) = Self::create_connection_manager(path);
        let manager = manager.with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

        let mut builder = Pool::builder();
        if is_memory {
            // Recycling the only connection would discard the database
            builder = builder.max_size(1).idle_timeout(None).max_lifetime(None);
        }
        let pool = builder
            .build(manager)
            .context("Failed to create database connection pool")?;
        Ok(Self { pool })
    }

    /// Create appropriate connection manager based on path
    ///
    /// # Arguments
    /// * `path` - Database file path or ":memory:" for in-memory database
    fn create_connection_manager<P: AsRef<Path>>(path: P) -> (SqliteConnectionManager, bool) {
        let path_str = path.as_ref().to_string_lossy();
        let trimmed_path = path_str.trim();

        if trimmed_path.eq_ignore_ascii_case(MEMORY_DB_PATH) {
            (SqliteConnectionManager::memory(), true)
        } else {
            (SqliteConnectionManager::file(path), false)
        }
    }

    /// Create an in-memory database pool (useful for testing)
    pub fn in_memory() -> Result<Self> {
        Self::new(MEMORY_DB_PATH)
    }

    /// Initialize the database schema
    pub fn initialize(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize database schema")?;
        Ok(())
    }

    /// Insert the seed user
    pub fn seed_defaults(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(SEED_DATA)
            .context("Failed to seed default data")?;
        Ok(())
    }

    /// Get a connection from the pool
    pub fn connection(&self) -> Result<DbConnection> {
        self.pool
            .get()
            .context("Failed to get database connection from pool")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::SEED_USER_ID;

    #[test]
    fn test_database_creation() {
        let db = Database::in_memory().expect("Failed to create database");
        db.initialize().expect("Failed to initialize schema");

        let conn = db.connection().expect("Failed to get connection");
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .expect("Failed to prepare statement");

        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .expect("Failed to query tables")
            .collect::<Result<Vec<_>, _>>()
            .expect("Failed to collect tables");

        for table in ["users", "posts", "comments", "follows", "sessions"] {
            assert!(tables.contains(&table.to_string()), "missing table {}", table);
        }
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let db = Database::in_memory().expect("Failed to create database");
        db.initialize().expect("first initialize");
        db.initialize().expect("second initialize");
        db.seed_defaults().expect("first seed");
        db.seed_defaults().expect("second seed");

        let conn = db.connection().expect("Failed to get connection");
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users WHERE id = ?", [SEED_USER_ID], |row| {
                row.get(0)
            })
            .expect("Failed to count seed users");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let db = Database::in_memory().expect("Failed to create database");
        db.initialize().expect("Failed to initialize schema");

        let conn = db.connection().expect("Failed to get connection");
        let result = conn.execute(
            "INSERT INTO posts (id, text, author_id, created_at) VALUES ('p1', 'orphan', 'nobody', '2024-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err(), "post without author should be rejected");
    }

    #[test]
    fn test_memory_database_detection() {
        let memory_paths = [":memory:", " :memory: ", ":MEMORY:", " :Memory: "];

        for path in &memory_paths {
            let db = Database::new(path).expect("Failed to create memory database");
            db.initialize().expect("Failed to initialize schema");
            assert_eq!(db.pool.max_size(), 1);
        }

        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db = Database::new(dir.path().join("chirp.db")).expect("Failed to create file database");
        db.initialize().expect("Failed to initialize file schema");
        assert!(db.pool.max_size() > 1);
    }
}
