//! SQLite implementation of the AlertStore trait

use super::{AlertStore, PersistenceError};
use crate::models::{CheckAlert, Evidence};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use uuid::Uuid;

const SELECT_ALERTS: &str = "SELECT check_name, description, experimental, player_id, player_name,
        violations, max_violations, punish, timestamp, evidence
     FROM check_alerts";

/// SQLite-based alert storage
pub struct SqliteAlertStore {
    conn: Mutex<Connection>,
}

/// Raw column values of one stored alert
struct AlertRow {
    check_name: String,
    description: String,
    experimental: bool,
    player_id: String,
    player_name: String,
    violations: u32,
    max_violations: u32,
    punish: bool,
    timestamp: i64,
    evidence: String,
}

impl AlertRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(AlertRow {
            check_name: row.get(0)?,
            description: row.get(1)?,
            experimental: row.get(2)?,
            player_id: row.get(3)?,
            player_name: row.get(4)?,
            violations: row.get(5)?,
            max_violations: row.get(6)?,
            punish: row.get(7)?,
            timestamp: row.get(8)?,
            evidence: row.get(9)?,
        })
    }

    fn into_alert(self) -> Result<CheckAlert, PersistenceError> {
        let player_id = Uuid::parse_str(&self.player_id).map_err(|_| {
            PersistenceError::InvalidData(format!("Invalid player id: {}", self.player_id))
        })?;
        let evidence: Evidence = serde_json::from_str(&self.evidence)?;

        Ok(CheckAlert {
            check_name: self.check_name,
            description: self.description,
            experimental: self.experimental,
            player_id,
            player_name: self.player_name,
            violations: self.violations,
            max_violations: self.max_violations,
            punish: self.punish,
            timestamp: self.timestamp,
            evidence,
        })
    }
}

impl SqliteAlertStore {
    /// Open (or create) the alert database at the specified path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, PersistenceError> {
        let conn = Connection::open(db_path)?;
        let store = SqliteAlertStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite database (useful for testing)
    pub fn in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteAlertStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), PersistenceError> {
        let conn = self.conn.lock();
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(())
    }

    fn query_alerts(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<CheckAlert>, PersistenceError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, AlertRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(AlertRow::into_alert).collect()
    }
}

impl AlertStore for SqliteAlertStore {
    fn store_alert(&self, alert: &CheckAlert) -> Result<(), PersistenceError> {
        let evidence = serde_json::to_string(&alert.evidence)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO check_alerts
             (check_name, description, experimental, player_id, player_name,
              violations, max_violations, punish, timestamp, evidence)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                alert.check_name,
                alert.description,
                alert.experimental,
                alert.player_id.to_string(),
                alert.player_name,
                alert.violations,
                alert.max_violations,
                alert.punish,
                alert.timestamp,
                evidence
            ],
        )?;
        Ok(())
    }

    fn get_recent_alerts(&self, limit: usize) -> Result<Vec<CheckAlert>, PersistenceError> {
        let sql = format!("{} ORDER BY timestamp DESC, id DESC LIMIT ?", SELECT_ALERTS);
        self.query_alerts(&sql, params![limit as i64])
    }

    fn get_player_alerts(
        &self,
        player_id: &Uuid,
        limit: usize,
    ) -> Result<Vec<CheckAlert>, PersistenceError> {
        let sql = format!(
            "{} WHERE player_id = ? ORDER BY timestamp DESC, id DESC LIMIT ?",
            SELECT_ALERTS
        );
        self.query_alerts(&sql, params![player_id.to_string(), limit as i64])
    }

    fn count_player_alerts(&self, player_id: &Uuid) -> Result<usize, PersistenceError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM check_alerts WHERE player_id = ?",
            params![player_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn prune_old_alerts(&self, before_timestamp: i64) -> Result<usize, PersistenceError> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM check_alerts WHERE timestamp < ?",
            params![before_timestamp],
        )?;
        Ok(deleted)
    }

    fn clear_all(&self) -> Result<(), PersistenceError> {
        let conn = self.conn.lock();
        conn.execute_batch("DELETE FROM check_alerts;")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteAlertStore {
        SqliteAlertStore::in_memory().expect("Failed to create in-memory store")
    }

    fn create_alert(player_id: Uuid, check_name: &str, timestamp: i64) -> CheckAlert {
        CheckAlert {
            check_name: check_name.to_string(),
            description: "Suspicious standard deviation".to_string(),
            experimental: false,
            player_id,
            player_name: "Steve".to_string(),
            violations: 3,
            max_violations: 6,
            punish: false,
            timestamp,
            evidence: Evidence::new()
                .number("Standard Deviation", 4.25)
                .number("Mean", 180.5),
        }
    }

    #[test]
    fn test_alert_roundtrip() {
        let store = create_test_store();
        let alert = create_alert(Uuid::new_v4(), "AutoTotemB", 1_700_000_000_000);

        store.store_alert(&alert).unwrap();

        let alerts = store.get_recent_alerts(10).unwrap();
        assert_eq!(alerts, vec![alert]);
    }

    #[test]
    fn test_recent_alerts_newest_first() {
        let store = create_test_store();
        let player = Uuid::new_v4();
        for (i, ts) in [100, 300, 200].into_iter().enumerate() {
            store
                .store_alert(&create_alert(player, &format!("AutoTotem{}", i), ts))
                .unwrap();
        }

        let alerts = store.get_recent_alerts(2).unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].timestamp, 300);
        assert_eq!(alerts[1].timestamp, 200);
    }

    #[test]
    fn test_player_alerts() {
        let store = create_test_store();
        let steve = Uuid::new_v4();
        let alex = Uuid::new_v4();

        store.store_alert(&create_alert(steve, "AutoTotemA", 1)).unwrap();
        store.store_alert(&create_alert(steve, "AutoTotemB", 2)).unwrap();
        store.store_alert(&create_alert(alex, "AutoTotemC", 3)).unwrap();

        assert_eq!(store.count_player_alerts(&steve).unwrap(), 2);
        assert_eq!(store.count_player_alerts(&alex).unwrap(), 1);
        assert_eq!(store.count_player_alerts(&Uuid::new_v4()).unwrap(), 0);

        let alerts = store.get_player_alerts(&steve, 10).unwrap();
        assert_eq!(alerts[0].check_name, "AutoTotemB");
        assert!(alerts.iter().all(|a| a.player_id == steve));
    }

    #[test]
    fn test_prune_old_alerts() {
        let store = create_test_store();
        let player = Uuid::new_v4();
        store.store_alert(&create_alert(player, "AutoTotemA", 1_000)).unwrap();
        store.store_alert(&create_alert(player, "AutoTotemA", 5_000)).unwrap();

        assert_eq!(store.prune_old_alerts(2_000).unwrap(), 1);
        assert_eq!(store.count_player_alerts(&player).unwrap(), 1);
    }

    #[test]
    fn test_clear_all() {
        let store = create_test_store();
        store
            .store_alert(&create_alert(Uuid::new_v4(), "AutoTotemE", 0))
            .unwrap();

        store.clear_all().unwrap();
        assert!(store.get_recent_alerts(10).unwrap().is_empty());
    }

    #[test]
    fn test_file_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.db");
        let player = Uuid::new_v4();

        {
            let store = SqliteAlertStore::new(&path).unwrap();
            store.store_alert(&create_alert(player, "AutoTotemD", 42)).unwrap();
        }

        let reopened = SqliteAlertStore::new(&path).unwrap();
        assert_eq!(reopened.count_player_alerts(&player).unwrap(), 1);
    }
}
