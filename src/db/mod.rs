pub mod models;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

use crate::state::DbPool;

pub const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_initial",
        include_str!("../../migrations/001_initial.sql"),
    ),
    ("002_blog", include_str!("../../migrations/002_blog.sql")),
];

const CONNECTION_PRAGMAS: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    PRAGMA foreign_keys = ON;
    PRAGMA busy_timeout = 5000;
";

pub fn create_pool(db_path: &Path) -> anyhow::Result<DbPool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // foreign_keys is per-connection in SQLite, so every pooled connection gets the pragmas
    let manager = SqliteConnectionManager::file(db_path)
        .with_init(|conn| conn.execute_batch(CONNECTION_PRAGMAS));
    let pool = Pool::builder().max_size(8).build(manager)?;

    Ok(pool)
}

/// Single-connection in-memory pool, used by tests.
pub fn memory_pool() -> anyhow::Result<DbPool> {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    let pool = Pool::builder().max_size(1).build(manager)?;
    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let conn = pool.get()?;

    // Create migrations tracking table
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM schema_version WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;

        if !already_applied {
            tracing::info!("Applying migration: {}", name);
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO schema_version (name) VALUES (?1)",
                params![name],
            )?;
        }
    }

    tracing::info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migrated_pool() -> DbPool {
        let pool = memory_pool().unwrap();
        run_migrations(&pool).unwrap();
        pool
    }

    #[test]
    fn create_pool_creates_db_file() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("sub/dir/test.db");
        let pool = create_pool(&db_path).unwrap();
        assert!(db_path.exists());

        let conn = pool.get().unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn migrations_run_successfully() {
        let pool = migrated_pool();
        let conn = pool.get().unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);

        let tables: Vec<String> = {
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .unwrap();
            stmt.query_map([], |row| row.get(0))
                .unwrap()
                .filter_map(|r| r.ok())
                .collect()
        };
        for table in [
            "user",
            "session",
            "account",
            "verification",
            "category",
            "tag",
            "post",
            "post_tag",
            "comment",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[test]
    fn migrations_are_idempotent() {
        let pool = migrated_pool();
        run_migrations(&pool).unwrap();

        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);
    }

    #[test]
    fn user_email_is_unique() {
        let pool = migrated_pool();
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO user (id, name, email) VALUES ('u1', 'Ada', 'ada@example.com')",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO user (id, name, email) VALUES ('u2', 'Ada 2', 'ada@example.com')",
            [],
        );
        assert!(dup.is_err());
    }

    #[test]
    fn foreign_keys_enforced() {
        let pool = migrated_pool();
        let conn = pool.get().unwrap();
        conn.execute("INSERT INTO category (id, name) VALUES ('c1', 'Rust')", [])
            .unwrap();

        let result = conn.execute(
            "INSERT INTO post (id, user_id, title, short_description, content, category_id)
             VALUES ('p1', 'nobody', 't', 's', 'c', 'c1')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn deleting_user_cascades_sessions() {
        let pool = migrated_pool();
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO user (id, name, email) VALUES ('u1', 'Ada', 'ada@example.com')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO session (id, token, expires_at, user_id)
             VALUES ('s1', 'tok', datetime('now', '+1 hours'), 'u1')",
            [],
        )
        .unwrap();
        conn.execute("DELETE FROM user WHERE id = 'u1'", []).unwrap();

        let sessions: i64 = conn
            .query_row("SELECT COUNT(*) FROM session", [], |row| row.get(0))
            .unwrap();
        assert_eq!(sessions, 0);
    }
}
