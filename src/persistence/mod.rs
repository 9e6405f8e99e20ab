//! Persistence module for alert storage
//!
//! Alerts outlive the player connections that produced them, so every alert
//! the dispatcher sees is written to an [`AlertStore`] for later review.

pub mod sqlite_store;

pub use sqlite_store::SqliteAlertStore;

use crate::models::CheckAlert;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during persistence operations
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Evidence encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Invalid data in database: {0}")]
    InvalidData(String),
}

/// Trait for alert storage backends
pub trait AlertStore: Send + Sync {
    /// Store a check alert
    fn store_alert(&self, alert: &CheckAlert) -> Result<(), PersistenceError>;

    /// Most recent alerts, newest first
    fn get_recent_alerts(&self, limit: usize) -> Result<Vec<CheckAlert>, PersistenceError>;

    /// Most recent alerts of one player, newest first
    fn get_player_alerts(
        &self,
        player_id: &Uuid,
        limit: usize,
    ) -> Result<Vec<CheckAlert>, PersistenceError>;

    fn count_player_alerts(&self, player_id: &Uuid) -> Result<usize, PersistenceError>;

    /// Remove alerts raised before the timestamp (ms), returning how many
    fn prune_old_alerts(&self, before_timestamp: i64) -> Result<usize, PersistenceError>;

    /// Clear all data (useful for testing)
    fn clear_all(&self) -> Result<(), PersistenceError>;
}
