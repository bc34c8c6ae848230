use std::sync::Arc;

use stockpulse::adapter::outbound::sqlite::database::connection::{
    create_pool, enable_wal, run_migrations,
};
use stockpulse::adapter::outbound::sqlite::SqliteStore;
use tempfile::TempDir;

/// Temporary file-backed SQLite database for integration tests.
pub struct TempDb {
    _dir: TempDir,
    path: String,
    store: Arc<SqliteStore>,
}

impl TempDb {
    pub fn create(name: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join(format!("{name}.db")).display().to_string();

        let pool = create_pool(&path).expect("create sqlite pool");
        enable_wal(&pool).expect("enable WAL mode");
        run_migrations(&pool).expect("run migrations");

        Self {
            _dir: dir,
            path,
            store: Arc::new(SqliteStore::new(pool)),
        }
    }

    pub fn store(&self) -> Arc<SqliteStore> {
        Arc::clone(&self.store)
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}
