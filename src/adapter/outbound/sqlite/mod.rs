//! SQLite persistence adapter.
//!
//! A single [`SqliteStore`] implements every storage port; each port's
//! queries live in their own module.

pub mod database;

mod credential;
mod payment;
mod product;
mod record;
mod retention;
mod user;

use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::SqliteConnection;

use crate::error::{Error, Result};
use database::connection::DbPool;

/// SQLite-backed implementation of the storage ports.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    fn conn(&self) -> Result<PooledConnection<ConnectionManager<SqliteConnection>>> {
        self.pool.get().map_err(|e| Error::Connection(e.to_string()))
    }
}
