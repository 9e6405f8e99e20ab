//! AutoTotemA: time between the totem pop and the off-hand placement click

use super::{Check, CheckBase, CheckInfo, EventCheck, Reporter};
use crate::models::{is_totem, Evidence, InventoryClick, PlayerEvent, PlayerEventKind, PlayerSnapshot};
use crate::player::{AtomicTimestamp, PlayerState};
use std::sync::Arc;

pub struct AutoTotemA {
    base: CheckBase,
    last_totem_use: AtomicTimestamp,
    last_click: AtomicTimestamp,
}

impl AutoTotemA {
    pub const INFO: CheckInfo = CheckInfo {
        name: "AutoTotemA",
        description: "Click time difference",
        experimental: false,
    };

    pub fn new(player: Arc<PlayerState>, reporter: Reporter) -> Self {
        AutoTotemA {
            base: CheckBase::new(Self::INFO, player, reporter),
            last_totem_use: AtomicTimestamp::new(),
            last_click: AtomicTimestamp::new(),
        }
    }

    fn on_click(&self, event: &PlayerEvent, click: &InventoryClick) {
        let config = self.base.config();
        let settings = &config.checks.auto_totem_a;

        if click.raw_slot == settings.offhand_slot && is_totem(&click.cursor) {
            let Some(clicked_at) = self.last_click.get() else {
                return;
            };
            // One evaluation per totem use
            if let Some(used_at) = self.last_totem_use.take() {
                let now = event.timestamp;
                let totem_time = (now - used_at).abs();
                let click_difference = (now - clicked_at).abs();

                log::debug!(
                    "{} - AutoTotemA totem time {}ms, click difference {}ms",
                    self.base.player().name(),
                    totem_time,
                    click_difference
                );

                if click_difference <= settings.click_time_difference_ms
                    && totem_time <= settings.normal_check_time_ms
                {
                    self.base.fail(
                        reequip_evidence(totem_time, click_difference, &event.snapshot),
                        now,
                    );
                }
            }
            return;
        }

        if is_totem(&click.current_item) {
            self.last_click.set(event.timestamp);
        }
    }
}

/// Evidence shared by the click-to-swap checks
pub(crate) fn reequip_evidence(
    totem_time: i64,
    click_difference: i64,
    snapshot: &PlayerSnapshot,
) -> Evidence {
    Evidence::new()
        .millis("Totem Time", totem_time)
        .millis("Real Totem Time", (totem_time - snapshot.ping_ms).abs())
        .millis("Click Difference", click_difference)
        .text("Main Hand", snapshot.main_hand.display_name())
        .text("States", snapshot.states())
}

impl Check for AutoTotemA {
    fn base(&self) -> &CheckBase {
        &self.base
    }

    fn reset(&self) {
        self.last_totem_use.clear();
        self.last_click.clear();
    }
}

impl EventCheck for AutoTotemA {
    fn on_event(&self, event: &PlayerEvent) {
        match &event.kind {
            PlayerEventKind::Resurrect if event.snapshot.is_valid_resurrection() => {
                self.last_totem_use.set(event.timestamp);
            }
            PlayerEventKind::InventoryClick(click) => self.on_click(event, click),
            _ => {}
        }
    }
}
