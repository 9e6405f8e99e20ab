//! Detection engine
//!
//! Owns the player registry and routes every incoming event to the player's
//! checks. Events for players that are not connected (or are exempt) are
//! dropped silently.

use crate::alerting::AlertSink;
use crate::checks::{CheckManager, Reporter};
use crate::config::{Config, ConfigError, ConfigHandle};
use crate::models::{PacketEvent, PlayerEvent, RecordedEvent};
use crate::player::{is_bedrock_player, PlayerState, TotemProcessor};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// One connected player: shared state plus the checks bound to it
pub struct PlayerSession {
    pub state: Arc<PlayerState>,
    pub checks: CheckManager,
}

impl PlayerSession {
    fn new(id: Uuid, name: &str, history_size: usize, reporter: Reporter) -> Self {
        let state = Arc::new(PlayerState::new(id, name, history_size));
        let checks = CheckManager::new(state.clone(), reporter);
        PlayerSession { state, checks }
    }

    fn teardown(&self) {
        self.checks.reset();
        self.state.reset();
    }
}

/// Connected players keyed by UUID
#[derive(Default)]
pub struct PlayerRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<PlayerSession>>>,
}

impl PlayerRegistry {
    pub fn insert(&self, session: PlayerSession) -> Arc<PlayerSession> {
        let id = session.state.id();
        let session = Arc::new(session);
        if let Some(previous) = self.sessions.write().insert(id, session.clone()) {
            previous.teardown();
        }
        session
    }

    pub fn remove(&self, player_id: &Uuid) -> Option<Arc<PlayerSession>> {
        let removed = self.sessions.write().remove(player_id);
        if let Some(session) = &removed {
            session.teardown();
        }
        removed
    }

    pub fn get(&self, player_id: &Uuid) -> Option<Arc<PlayerSession>> {
        self.sessions.read().get(player_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Snapshot of all sessions, taken without holding the lock afterwards
    pub fn sessions(&self) -> Vec<Arc<PlayerSession>> {
        self.sessions.read().values().cloned().collect()
    }
}

/// Entry point for platform events
pub struct Engine {
    config: ConfigHandle,
    reporter: Reporter,
    processor: TotemProcessor,
    players: PlayerRegistry,
}

impl Engine {
    pub fn new(config: ConfigHandle, sink: Arc<dyn AlertSink>) -> Self {
        Engine {
            reporter: Reporter::new(config.clone(), sink),
            config,
            processor: TotemProcessor::new(),
            players: PlayerRegistry::default(),
        }
    }

    pub fn config(&self) -> Arc<Config> {
        self.config.current()
    }

    /// Register a player; returns false when the player is exempt
    pub fn connect(&self, player_id: Uuid, name: &str) -> bool {
        let config = self.config.current();
        let settings = &config.settings;

        if settings.exempt_bedrock_players && is_bedrock_player(&player_id) {
            log::info!("{} is a Bedrock player, not checking", name);
            return false;
        }
        if settings.exempt_players.contains(&player_id) {
            log::info!("{} is exempt, not checking", name);
            return false;
        }

        let session = PlayerSession::new(
            player_id,
            name,
            settings.interval_history_size,
            self.reporter.clone(),
        );
        self.players.insert(session);
        log::info!("{} ({}) connected", name, player_id);
        true
    }

    /// Drop the player and all state recorded for them
    pub fn disconnect(&self, player_id: &Uuid) {
        if let Some(session) = self.players.remove(player_id) {
            log::info!("{} ({}) disconnected", session.state.name(), player_id);
        }
    }

    /// Game-thread events
    pub fn handle_event(&self, event: &PlayerEvent) {
        let Some(session) = self.players.get(&event.player_id) else {
            return;
        };

        session.checks.on_event(event);
        if let Some(cycle) = self.processor.process(&session.state, event) {
            session.checks.on_totem_cycle(&cycle);
        }
    }

    /// Network-thread packets
    pub fn handle_packet(&self, packet: &PacketEvent) {
        if let Some(session) = self.players.get(&packet.player_id) {
            session.checks.on_packet(packet);
        }
    }

    pub fn handle_recorded(&self, event: &RecordedEvent) {
        match event {
            RecordedEvent::Connect { player_id, name } => {
                self.connect(*player_id, name);
            }
            RecordedEvent::Disconnect { player_id } => self.disconnect(player_id),
            RecordedEvent::Player(event) => self.handle_event(event),
            RecordedEvent::Packet(packet) => self.handle_packet(packet),
        }
    }

    /// Zero the violation counters of every connected player
    pub fn reset_violations(&self) {
        let sessions = self.players.sessions();
        for session in &sessions {
            session.checks.reset_violations();
        }
        log::info!("Reset violations for {} players", sessions.len());
    }

    /// Swap in a new configuration; running checks pick it up on their
    /// next evaluation
    pub fn reload(&self, config: Config) -> Result<(), ConfigError> {
        config.validate()?;
        self.config.replace(config);
        log::info!("Configuration reloaded");
        Ok(())
    }

    /// Re-read a configuration file and apply it
    pub fn reload_from_file(&self, path: &Path) -> Result<(), ConfigError> {
        self.reload(Config::from_file(path)?)
    }

    pub fn player(&self, player_id: &Uuid) -> Option<Arc<PlayerSession>> {
        self.players.get(player_id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}

/// Reset violations every `reset_violations_interval_minutes`
///
/// The interval is re-read after every reset so a reload applies from the
/// next period on.
pub fn spawn_violation_reset(engine: Arc<Engine>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let minutes = engine.config().settings.reset_violations_interval_minutes.max(1);
            tokio::time::sleep(Duration::from_secs(minutes * 60)).await;
            engine.reset_violations();
        }
    })
}

/// Reload the configuration whenever the file at `path` is modified
///
/// An invalid file is logged and the running configuration kept.
pub fn spawn_config_watch(engine: Arc<Engine>, path: PathBuf, poll: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_modified = modified_at(&path).await;
        loop {
            tokio::time::sleep(poll).await;
            let modified = modified_at(&path).await;
            if modified.is_none() || modified == last_modified {
                continue;
            }
            last_modified = modified;

            if let Err(e) = engine.reload_from_file(&path) {
                log::error!("Failed to reload {:?}: {}", path, e);
            }
        }
    })
}

async fn modified_at(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::CollectingSink;
    use crate::checks::Check;
    use crate::models::{
        ClickType, DiggingAction, EvidenceValue, InventoryClick, InventoryKind, ItemKind,
        PacketKind, PlayerEventKind, PlayerSnapshot,
    };

    fn create_engine(config: Config) -> (Engine, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::default());
        (Engine::new(ConfigHandle::new(config), sink.clone()), sink)
    }

    fn create_event(player_id: Uuid, timestamp: i64, kind: PlayerEventKind) -> PlayerEvent {
        PlayerEvent {
            player_id,
            timestamp,
            snapshot: PlayerSnapshot {
                main_hand: ItemKind::Air,
                totem_count: 3,
                ping_ms: 25,
                ..Default::default()
            },
            kind,
        }
    }

    fn click(raw_slot: i32, current_item: Option<ItemKind>, cursor: Option<ItemKind>) -> PlayerEventKind {
        PlayerEventKind::InventoryClick(InventoryClick {
            raw_slot,
            click: ClickType::Left,
            inventory: InventoryKind::Player,
            current_item,
            cursor,
            hotbar_item: None,
        })
    }

    /// Pop at `start`, totem click at `start + click_at`, off-hand placement
    /// at `start + swap_at`
    fn reequip(engine: &Engine, player_id: Uuid, start: i64, click_at: i64, swap_at: i64) {
        engine.handle_event(&create_event(player_id, start, PlayerEventKind::Resurrect));
        engine.handle_event(&create_event(
            player_id,
            start + click_at,
            click(20, Some(ItemKind::TotemOfUndying), None),
        ));
        engine.handle_event(&create_event(
            player_id,
            start + swap_at,
            click(45, None, Some(ItemKind::TotemOfUndying)),
        ));
    }

    #[test]
    fn test_fast_reequip_end_to_end() {
        let (engine, sink) = create_engine(Config::default());
        let player_id = Uuid::new_v4();
        assert!(engine.connect(player_id, "Steve"));

        reequip(&engine, player_id, 0, 40, 90);

        let alerts = sink.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].check_name, "AutoTotemA");
        assert_eq!(alerts[0].player_name, "Steve");
        assert_eq!(alerts[0].evidence.get("Totem Time"), Some(&EvidenceValue::Millis(90)));
        assert_eq!(
            alerts[0].evidence.get("Click Difference"),
            Some(&EvidenceValue::Millis(50))
        );
    }

    #[test]
    fn test_slow_click_end_to_end() {
        let (engine, sink) = create_engine(Config::default());
        let player_id = Uuid::new_v4();
        engine.connect(player_id, "Steve");

        reequip(&engine, player_id, 0, 500, 900);

        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_processor_feeds_intervals() {
        let (engine, _sink) = create_engine(Config::default());
        let player_id = Uuid::new_v4();
        engine.connect(player_id, "Steve");

        reequip(&engine, player_id, 0, 200, 600);
        reequip(&engine, player_id, 10_000, 250, 700);

        let session = engine.player(&player_id).unwrap();
        assert_eq!(session.state.latest_intervals(10), vec![200, 250]);
    }

    #[test]
    fn test_consistent_cycles_trip_auto_totem_b() {
        let (engine, sink) = create_engine(Config::default());
        let player_id = Uuid::new_v4();
        engine.connect(player_id, "Steve");

        for i in 0..4 {
            reequip(&engine, player_id, i * 10_000, 120, 600);
        }

        assert!(sink.alerts().iter().any(|a| a.check_name == "AutoTotemB"));
    }

    #[test]
    fn test_packet_triad_end_to_end() {
        let (engine, sink) = create_engine(Config::default());
        let player_id = Uuid::new_v4();
        engine.connect(player_id, "Steve");

        engine.handle_event(&create_event(player_id, 1_000, PlayerEventKind::Resurrect));
        let packet = |timestamp, kind| PacketEvent {
            player_id,
            timestamp,
            kind,
        };
        let swap = PacketKind::Digging {
            action: DiggingAction::SwapItemWithOffhand,
        };
        engine.handle_packet(&packet(1_040, swap.clone()));
        engine.handle_packet(&packet(1_090, PacketKind::PickItem));
        engine.handle_packet(&packet(1_150, swap));

        let alerts = sink.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].check_name, "AutoTotemD");
    }

    #[test]
    fn test_concurrent_events_and_packets() {
        let (engine, sink) = create_engine(Config::default());
        let player_id = Uuid::new_v4();
        engine.connect(player_id, "Steve");

        std::thread::scope(|scope| {
            let engine = &engine;
            // game thread
            scope.spawn(move || {
                for i in 0..200 {
                    let start = i * 1_000;
                    reequip(engine, player_id, start, 40, 90);
                    engine.handle_event(&create_event(player_id, start + 95, PlayerEventKind::Resurrect));
                    engine.handle_event(&create_event(
                        player_id,
                        start + 150,
                        PlayerEventKind::SwapHand {
                            offhand_item: ItemKind::TotemOfUndying,
                        },
                    ));
                }
            });
            // network thread
            scope.spawn(move || {
                let swap = PacketKind::Digging {
                    action: DiggingAction::SwapItemWithOffhand,
                };
                for i in 0..200 {
                    let start = i * 1_000;
                    for (offset, kind) in [(40, swap.clone()), (90, PacketKind::PickItem), (150, swap.clone())] {
                        engine.handle_packet(&PacketEvent {
                            player_id,
                            timestamp: start + offset,
                            kind,
                        });
                    }
                }
            });
        });

        let session = engine.player(&player_id).unwrap();
        assert!(session.state.intervals.len() <= session.state.intervals.capacity());

        let violations: u32 = session
            .checks
            .checks()
            .iter()
            .map(|check| check.base().violations())
            .sum();
        assert!(sink.count() > 0);
        assert_eq!(violations as usize, sink.count());
    }

    #[test]
    fn test_exemptions() {
        let exempt = Uuid::new_v4();
        let mut config = Config::default();
        config.settings.exempt_players.push(exempt);
        let (engine, _sink) = create_engine(config);

        assert!(!engine.connect(Uuid::from_u64_pair(0, 42), "BedrockSteve"));
        assert!(!engine.connect(exempt, "Staff"));
        assert_eq!(engine.player_count(), 0);

        let mut config = Config::default();
        config.settings.exempt_bedrock_players = false;
        let (engine, _sink) = create_engine(config);
        assert!(engine.connect(Uuid::from_u64_pair(0, 42), "BedrockSteve"));
    }

    #[test]
    fn test_disconnect_drops_state() {
        let (engine, sink) = create_engine(Config::default());
        let player_id = Uuid::new_v4();
        engine.connect(player_id, "Steve");

        engine.handle_event(&create_event(player_id, 0, PlayerEventKind::Resurrect));
        engine.handle_recorded(&RecordedEvent::Disconnect { player_id });
        assert!(engine.player(&player_id).is_none());

        // events after disconnect are ignored
        reequip(&engine, player_id, 0, 40, 90);
        assert_eq!(sink.count(), 0);

        // a reconnect starts from scratch
        engine.handle_recorded(&RecordedEvent::Connect {
            player_id,
            name: "Steve".to_string(),
        });
        engine.handle_event(&create_event(
            player_id,
            40,
            click(20, Some(ItemKind::TotemOfUndying), None),
        ));
        engine.handle_event(&create_event(
            player_id,
            90,
            click(45, None, Some(ItemKind::TotemOfUndying)),
        ));
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_reset_violations() {
        let (engine, sink) = create_engine(Config::default());
        let player_id = Uuid::new_v4();
        engine.connect(player_id, "Steve");

        reequip(&engine, player_id, 0, 40, 90);
        engine.reset_violations();
        reequip(&engine, player_id, 10_000, 40, 90);

        let alerts: Vec<_> = sink
            .alerts()
            .into_iter()
            .filter(|a| a.check_name == "AutoTotemA")
            .collect();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[1].violations, 1);
        assert!(!alerts[1].punish);
    }

    #[test]
    fn test_reload_applies_to_connected_players() {
        let (engine, sink) = create_engine(Config::default());
        let player_id = Uuid::new_v4();
        engine.connect(player_id, "Steve");

        let mut config = Config::default();
        config.checks.auto_totem_a.click_time_difference_ms = 20;
        engine.reload(config).unwrap();

        reequip(&engine, player_id, 0, 40, 90);
        assert_eq!(sink.count(), 0);

        let mut invalid = Config::default();
        invalid.settings.interval_history_size = 0;
        assert!(engine.reload(invalid).is_err());
        assert_eq!(engine.config().checks.auto_totem_a.click_time_difference_ms, 20);
    }

    #[tokio::test]
    async fn test_config_watch_reloads_modified_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("totemwatch.toml");
        Config::default().to_file(&path).unwrap();

        let (engine, _sink) = create_engine(Config::default());
        let engine = Arc::new(engine);
        let watch = spawn_config_watch(engine.clone(), path.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(30)).await;

        let mut config = Config::default();
        config.checks.auto_totem_a.click_time_difference_ms = 20;
        config.to_file(&path).unwrap();
        std::fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(5))
            .unwrap();

        let reloaded = tokio::time::timeout(Duration::from_secs(2), async {
            while engine.config().checks.auto_totem_a.click_time_difference_ms != 20 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        watch.abort();

        assert!(reloaded.is_ok());
    }

    #[test]
    fn test_reload_from_invalid_file_keeps_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("totemwatch.toml");
        std::fs::write(&path, "[persistence]\nretention_days = 0\n").unwrap();

        let (engine, _sink) = create_engine(Config::default());
        assert!(matches!(
            engine.reload_from_file(&path),
            Err(ConfigError::Invalid(_))
        ));
        assert_eq!(engine.config().persistence.retention_days, 30);
    }

    #[tokio::test]
    async fn test_violation_reset_task_is_cancellable() {
        let (engine, _sink) = create_engine(Config::default());
        let handle = spawn_violation_reset(Arc::new(engine));

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
