//! Turns totem pops and re-equips into totem cycles

use super::state::PlayerState;
use crate::models::{is_totem, PlayerEvent, PlayerEventKind};
use std::sync::atomic::Ordering;

/// A completed activation -> re-equip cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotemCycle {
    /// Time between the totem pop and the re-equip (ms)
    pub interval_ms: i64,
    /// Time of the re-equip
    pub timestamp: i64,
}

/// Pairs each valid totem activation with the first re-equip that follows
#[derive(Debug, Default, Clone, Copy)]
pub struct TotemProcessor;

impl TotemProcessor {
    pub fn new() -> Self {
        TotemProcessor
    }

    /// Update the player's totem state, returning a cycle when a re-equip
    /// closes one
    pub fn process(&self, state: &PlayerState, event: &PlayerEvent) -> Option<TotemCycle> {
        let now = event.timestamp;

        match &event.kind {
            PlayerEventKind::Resurrect => {
                if !event.snapshot.is_valid_resurrection() {
                    return None;
                }
                state.last_totem_usage.set(now);
                state.expecting_reequip.store(true, Ordering::Release);
                state.dig_pick.lock().reset();
                None
            }
            PlayerEventKind::InventoryClick(click) => {
                if !is_totem(&click.current_item) {
                    return None;
                }
                state.last_totem_click.set(now);
                self.complete_cycle(state, now)
            }
            PlayerEventKind::SwapHand { offhand_item } if offhand_item.is_totem() => {
                self.complete_cycle(state, now)
            }
            PlayerEventKind::Death => {
                state.expecting_reequip.store(false, Ordering::Release);
                state.last_totem_usage.clear();
                state.dig_pick.lock().reset();
                None
            }
            _ => None,
        }
    }

    fn complete_cycle(&self, state: &PlayerState, now: i64) -> Option<TotemCycle> {
        // Only the first re-equip after a pop closes the cycle
        if !state.expecting_reequip.swap(false, Ordering::AcqRel) {
            return None;
        }
        let used_at = state.last_totem_usage.get()?;

        let interval_ms = (now - used_at).abs();
        state.record_interval(interval_ms);
        log::debug!(
            "{} - totem cycle {}ms, intervals: {:?}",
            state.name(),
            interval_ms,
            state.intervals.snapshot()
        );

        Some(TotemCycle {
            interval_ms,
            timestamp: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ClickType, InventoryClick, InventoryKind, ItemKind, PlayerSnapshot,
    };
    use uuid::Uuid;

    fn create_event(timestamp: i64, kind: PlayerEventKind) -> PlayerEvent {
        PlayerEvent {
            player_id: Uuid::nil(),
            timestamp,
            snapshot: PlayerSnapshot {
                totem_count: 3,
                ..Default::default()
            },
            kind,
        }
    }

    fn totem_click(slot: i32) -> PlayerEventKind {
        PlayerEventKind::InventoryClick(InventoryClick {
            raw_slot: slot,
            click: ClickType::Left,
            inventory: InventoryKind::Player,
            current_item: Some(ItemKind::TotemOfUndying),
            cursor: None,
            hotbar_item: None,
        })
    }

    #[test]
    fn test_cycle_after_pop_and_reequip() {
        let state = PlayerState::new(Uuid::nil(), "Alex", 30);
        let processor = TotemProcessor::new();

        assert!(processor
            .process(&state, &create_event(1_000, PlayerEventKind::Resurrect))
            .is_none());
        let cycle = processor
            .process(&state, &create_event(1_180, totem_click(20)))
            .unwrap();

        assert_eq!(cycle.interval_ms, 180);
        assert_eq!(state.latest_intervals(5), vec![180]);
        assert_eq!(state.last_totem_click.get(), Some(1_180));

        // a second click is not a new cycle
        assert!(processor
            .process(&state, &create_event(1_300, totem_click(45)))
            .is_none());
    }

    #[test]
    fn test_swap_hand_closes_cycle() {
        let state = PlayerState::new(Uuid::nil(), "Alex", 30);
        let processor = TotemProcessor::new();

        processor.process(&state, &create_event(0, PlayerEventKind::Resurrect));
        let swap = PlayerEventKind::SwapHand {
            offhand_item: ItemKind::TotemOfUndying,
        };
        assert_eq!(
            processor.process(&state, &create_event(250, swap)).map(|c| c.interval_ms),
            Some(250)
        );
    }

    #[test]
    fn test_invalid_resurrection_is_ignored() {
        let state = PlayerState::new(Uuid::nil(), "Alex", 30);
        let processor = TotemProcessor::new();

        let mut event = create_event(0, PlayerEventKind::Resurrect);
        event.snapshot.totem_count = 1;
        processor.process(&state, &event);

        assert!(processor.process(&state, &create_event(90, totem_click(45))).is_none());
        assert!(state.last_totem_usage.get().is_none());
    }

    #[test]
    fn test_death_disarms() {
        let state = PlayerState::new(Uuid::nil(), "Alex", 30);
        let processor = TotemProcessor::new();

        processor.process(&state, &create_event(0, PlayerEventKind::Resurrect));
        processor.process(&state, &create_event(50, PlayerEventKind::Death));

        assert!(processor.process(&state, &create_event(90, totem_click(45))).is_none());
        assert!(state.latest_intervals(5).is_empty());
    }
}
