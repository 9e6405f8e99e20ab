pub mod alerting;
pub mod checks;
pub mod config;
pub mod engine;
pub mod input;
pub mod models;
pub mod output;
pub mod persistence;
pub mod player;
pub mod stats;

// Re-export commonly used types
pub use alerting::{AlertDispatcher, AlertQueue, AlertSink};
pub use config::{Config, ConfigHandle};
pub use engine::{spawn_config_watch, spawn_violation_reset, Engine};
pub use models::{CheckAlert, Evidence, PacketEvent, PlayerEvent, RecordedEvent};
pub use persistence::{AlertStore, SqliteAlertStore};
