//! # Database State
//!
//! Wraps the `Database` handle owned by the session.
//!
//! The pool inside `Database` is thread-safe, so the cart store and the
//! checkout orchestrator each hold their own `LocalStateRepository` clone
//! without extra locking.

use revenda_db::{Database, LocalStateRepository};

/// Session-owned database handle.
#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Returns a reference to the inner Database.
    pub fn inner(&self) -> &Database {
        &self.db
    }

    /// Repository for the persisted cart and checkout keys.
    pub fn local_state(&self) -> LocalStateRepository {
        self.db.local_state()
    }
}
