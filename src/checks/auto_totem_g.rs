//! AutoTotemG: hotbar selection to swap-hand timing

use super::auto_totem_a::reequip_evidence;
use super::{Check, CheckBase, CheckInfo, EventCheck, Reporter};
use crate::models::{is_totem, ClickType, PlayerEvent, PlayerEventKind};
use crate::player::{AtomicTimestamp, PlayerState};
use std::sync::Arc;

/// Flags a swap-hand shortly after a hotbar totem selection following a pop
pub struct AutoTotemG {
    base: CheckBase,
    last_totem_use: AtomicTimestamp,
    last_click: AtomicTimestamp,
}

impl AutoTotemG {
    pub const INFO: CheckInfo = CheckInfo {
        name: "AutoTotemG",
        description: "Monitors swap-hand timings",
        experimental: false,
    };

    /// Build the check for one player
    pub fn new(player: Arc<PlayerState>, reporter: Reporter) -> Self {
        AutoTotemG {
            base: CheckBase::new(Self::INFO, player, reporter),
            last_totem_use: AtomicTimestamp::new(),
            last_click: AtomicTimestamp::new(),
        }
    }

    fn on_swap(&self, event: &PlayerEvent) {
        let Some(clicked_at) = self.last_click.get() else {
            return;
        };
        let Some(used_at) = self.last_totem_use.take() else {
            return;
        };

        let config = self.base.config();
        let settings = &config.checks.auto_totem_g;

        let now = event.timestamp;
        let totem_time = (now - used_at).abs();
        let click_difference = (now - clicked_at).abs();

        if click_difference <= settings.click_to_swap_time_difference_ms
            && totem_time <= settings.normal_check_time_ms
        {
            self.base.fail(
                reequip_evidence(totem_time, click_difference, &event.snapshot),
                now,
            );
        }
    }
}

impl Check for AutoTotemG {
    fn base(&self) -> &CheckBase {
        &self.base
    }

    fn reset(&self) {
        self.last_totem_use.clear();
        self.last_click.clear();
    }
}

impl EventCheck for AutoTotemG {
    fn on_event(&self, event: &PlayerEvent) {
        match &event.kind {
            PlayerEventKind::Resurrect if event.snapshot.is_valid_resurrection() => {
                self.last_totem_use.set(event.timestamp);
            }
            PlayerEventKind::InventoryClick(click) => {
                let moves_to_hotbar = matches!(
                    click.click,
                    ClickType::NumberKey | ClickType::ShiftLeft | ClickType::ShiftRight
                );
                if moves_to_hotbar && (is_totem(&click.current_item) || is_totem(&click.hotbar_item)) {
                    self.last_click.set(event.timestamp);
                }
            }
            PlayerEventKind::SwapHand { offhand_item } if offhand_item.is_totem() => {
                self.on_swap(event);
            }
            _ => {}
        }
    }
}
