//! AutoTotemF: world interaction while a totem click is still pending

use super::{Check, CheckBase, CheckInfo, EventCheck, Reporter};
use crate::models::{
    is_totem, Evidence, InteractAction, InventoryKind, PlayerEvent, PlayerEventKind,
};
use crate::player::{AtomicTimestamp, PlayerState};
use std::sync::Arc;

/// Flags a world interaction shortly after an inventory totem click
pub struct AutoTotemF {
    base: CheckBase,
    inventory_click: AtomicTimestamp,
}

impl AutoTotemF {
    pub const INFO: CheckInfo = CheckInfo {
        name: "AutoTotemF",
        description: "Invalid interaction",
        experimental: true,
    };

    /// Build the check for one player
    pub fn new(player: Arc<PlayerState>, reporter: Reporter) -> Self {
        AutoTotemF {
            base: CheckBase::new(Self::INFO, player, reporter),
            inventory_click: AtomicTimestamp::new(),
        }
    }

    fn on_interact(&self, event: &PlayerEvent, action: InteractAction) {
        if action == InteractAction::Physical {
            return;
        }
        let Some(clicked_at) = self.inventory_click.take() else {
            return;
        };

        let config = self.base.config();
        let time_difference = (event.timestamp - clicked_at).abs();

        if time_difference <= config.checks.auto_totem_f.time_difference_ms {
            let evidence = Evidence::new()
                .text("Type", action.as_str())
                .millis("Time Difference", time_difference)
                .text("Main Hand", event.snapshot.main_hand.display_name())
                .text("States", event.snapshot.states());
            self.base.fail(evidence, event.timestamp);
        }
    }
}

impl Check for AutoTotemF {
    fn base(&self) -> &CheckBase {
        &self.base
    }

    fn reset(&self) {
        self.inventory_click.clear();
    }
}

impl EventCheck for AutoTotemF {
    fn on_event(&self, event: &PlayerEvent) {
        match &event.kind {
            PlayerEventKind::InventoryClick(click) => {
                let config = self.base.config();
                if click.inventory == InventoryKind::Player
                    && config.checks.auto_totem_f.valid_click_types.contains(&click.click)
                    && is_totem(&click.current_item)
                {
                    self.inventory_click.set(event.timestamp);
                }
            }
            PlayerEventKind::Interact { action } => self.on_interact(event, *action),
            PlayerEventKind::InventoryClose | PlayerEventKind::Death => {
                self.inventory_click.clear();
            }
            _ => {}
        }
    }
}
