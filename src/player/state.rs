use super::window::RollingWindow;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use uuid::Uuid;

/// An optional millisecond timestamp stored in a single atomic
#[derive(Debug)]
pub struct AtomicTimestamp(AtomicI64);

impl AtomicTimestamp {
    const UNSET: i64 = i64::MIN;

    pub fn new() -> Self {
        AtomicTimestamp(AtomicI64::new(Self::UNSET))
    }

    pub fn get(&self) -> Option<i64> {
        match self.0.load(Ordering::Acquire) {
            Self::UNSET => None,
            ts => Some(ts),
        }
    }

    pub fn set(&self, timestamp: i64) {
        self.0.store(timestamp, Ordering::Release);
    }

    pub fn clear(&self) {
        self.0.store(Self::UNSET, Ordering::Release);
    }

    /// Read and clear in one step
    pub fn take(&self) -> Option<i64> {
        match self.0.swap(Self::UNSET, Ordering::AcqRel) {
            Self::UNSET => None,
            ts => Some(ts),
        }
    }
}

impl Default for AtomicTimestamp {
    fn default() -> Self {
        Self::new()
    }
}

/// Stage of the digging -> pick-item -> digging packet sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DigPickStage {
    #[default]
    Idle,
    FirstDigging,
    PickItem,
}

/// Timestamps of a completed digging -> pick-item -> digging sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigPickSequence {
    pub first_digging_at: i64,
    pub pick_item_at: i64,
    pub last_digging_at: i64,
}

impl DigPickSequence {
    pub fn digging_to_pick(&self) -> i64 {
        self.pick_item_at - self.first_digging_at
    }

    pub fn pick_to_digging(&self) -> i64 {
        self.last_digging_at - self.pick_item_at
    }
}

/// Packet-sequence state machine re-armed on every totem use
///
/// A packet that does not fit the expected order drops the machine back to
/// idle; a repeated first digging packet restarts the sequence from it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DigPickState {
    stage: DigPickStage,
    first_digging_at: i64,
    pick_item_at: i64,
}

impl DigPickState {
    pub fn stage(&self) -> DigPickStage {
        self.stage
    }

    /// Returns the completed sequence on the second digging packet
    pub fn on_digging(&mut self, now: i64) -> Option<DigPickSequence> {
        match self.stage {
            DigPickStage::Idle | DigPickStage::FirstDigging => {
                self.stage = DigPickStage::FirstDigging;
                self.first_digging_at = now;
                self.pick_item_at = 0;
                None
            }
            DigPickStage::PickItem => {
                let sequence = DigPickSequence {
                    first_digging_at: self.first_digging_at,
                    pick_item_at: self.pick_item_at,
                    last_digging_at: now,
                };
                self.reset();
                Some(sequence)
            }
        }
    }

    pub fn on_pick_item(&mut self, now: i64) {
        match self.stage {
            DigPickStage::FirstDigging => {
                self.stage = DigPickStage::PickItem;
                self.pick_item_at = now;
            }
            DigPickStage::PickItem => self.reset(),
            DigPickStage::Idle => {}
        }
    }

    pub fn reset(&mut self) {
        *self = DigPickState::default();
    }
}

/// Per-connection totem state, shared by every check of one player
#[derive(Debug)]
pub struct PlayerState {
    id: Uuid,
    name: String,
    /// Recent activation -> re-equip intervals (ms)
    pub intervals: RollingWindow<i64>,
    /// Most recent valid totem activation
    pub last_totem_usage: AtomicTimestamp,
    /// Most recent inventory click on a totem
    pub last_totem_click: AtomicTimestamp,
    /// Armed by a totem pop, cleared by the first re-equip
    pub expecting_reequip: AtomicBool,
    pub dig_pick: Mutex<DigPickState>,
}

impl PlayerState {
    pub fn new(id: Uuid, name: impl Into<String>, history_size: usize) -> Self {
        PlayerState {
            id,
            name: name.into(),
            intervals: RollingWindow::new(history_size),
            last_totem_usage: AtomicTimestamp::new(),
            last_totem_click: AtomicTimestamp::new(),
            expecting_reequip: AtomicBool::new(false),
            dig_pick: Mutex::new(DigPickState::default()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record_interval(&self, interval_ms: i64) {
        self.intervals.push(interval_ms);
    }

    /// Up to `n` most recent intervals, oldest first
    pub fn latest_intervals(&self, n: usize) -> Vec<i64> {
        self.intervals.latest(n)
    }

    /// Forget everything recorded for this connection
    pub fn reset(&self) {
        self.intervals.clear();
        self.last_totem_usage.clear();
        self.last_totem_click.clear();
        self.expecting_reequip.store(false, Ordering::Release);
        self.dig_pick.lock().reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_timestamp() {
        let ts = AtomicTimestamp::new();
        assert_eq!(ts.get(), None);

        ts.set(0);
        assert_eq!(ts.get(), Some(0));
        assert_eq!(ts.take(), Some(0));
        assert_eq!(ts.get(), None);
        assert_eq!(ts.take(), None);
    }

    #[test]
    fn test_dig_pick_full_sequence() {
        let mut state = DigPickState::default();
        assert!(state.on_digging(100).is_none());
        assert_eq!(state.stage(), DigPickStage::FirstDigging);

        state.on_pick_item(130);
        assert_eq!(state.stage(), DigPickStage::PickItem);

        let sequence = state.on_digging(170).unwrap();
        assert_eq!(sequence.first_digging_at, 100);
        assert_eq!(sequence.digging_to_pick(), 30);
        assert_eq!(sequence.pick_to_digging(), 40);
        assert_eq!(state.stage(), DigPickStage::Idle);
    }

    #[test]
    fn test_dig_pick_out_of_order() {
        let mut state = DigPickState::default();

        // pick item without a digging packet is ignored
        state.on_pick_item(10);
        assert_eq!(state.stage(), DigPickStage::Idle);

        // a second pick item desynchronises the machine
        state.on_digging(20);
        state.on_pick_item(30);
        state.on_pick_item(40);
        assert_eq!(state.stage(), DigPickStage::Idle);

        // repeated digging restarts from the newest packet
        state.on_digging(50);
        state.on_digging(60);
        state.on_pick_item(70);
        assert_eq!(state.on_digging(80).unwrap().first_digging_at, 60);
    }

    #[test]
    fn test_player_state_reset() {
        let state = PlayerState::new(Uuid::new_v4(), "Steve", 4);
        state.record_interval(120);
        state.last_totem_usage.set(5);
        state.dig_pick.lock().on_digging(5);

        state.reset();

        assert!(state.latest_intervals(4).is_empty());
        assert_eq!(state.last_totem_usage.get(), None);
        assert_eq!(state.dig_pick.lock().stage(), DigPickStage::Idle);
    }
}
