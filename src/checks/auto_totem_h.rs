//! AutoTotemH: consistent click-to-placement differences across re-equips

use super::{below_both, Check, CheckBase, CheckInfo, ConsecutiveCounter, EventCheck, Reporter};
use crate::models::{is_totem, Evidence, InventoryClick, PlayerEvent, PlayerEventKind};
use crate::player::{AtomicTimestamp, PlayerState, RollingWindow};
use crate::stats;
use std::sync::Arc;

const CLICK_HISTORY: usize = 20;
const MIN_SAMPLES: usize = 5;

pub struct AutoTotemH {
    base: CheckBase,
    last_totem_use: AtomicTimestamp,
    last_click: AtomicTimestamp,
    click_differences: RollingWindow<i64>,
    low_sd_count: ConsecutiveCounter,
}

impl AutoTotemH {
    pub const INFO: CheckInfo = CheckInfo {
        name: "AutoTotemH",
        description: "Consistent click standard deviation",
        experimental: false,
    };

    pub fn new(player: Arc<PlayerState>, reporter: Reporter) -> Self {
        AutoTotemH {
            base: CheckBase::new(Self::INFO, player, reporter),
            last_totem_use: AtomicTimestamp::new(),
            last_click: AtomicTimestamp::new(),
            click_differences: RollingWindow::new(CLICK_HISTORY),
            low_sd_count: ConsecutiveCounter::new(),
        }
    }

    fn on_click(&self, event: &PlayerEvent, click: &InventoryClick) {
        let config = self.base.config();
        let settings = &config.checks.auto_totem_h;
        let now = event.timestamp;

        if click.raw_slot == settings.offhand_slot && is_totem(&click.cursor) {
            let Some(clicked_at) = self.last_click.get() else {
                return;
            };
            if let Some(used_at) = self.last_totem_use.take() {
                if now - used_at < settings.min_check_time_ms {
                    let differences = self
                        .click_differences
                        .push_and_snapshot((now - clicked_at).abs());
                    self.evaluate(&differences, now);
                }
            }
            return;
        }

        if is_totem(&click.current_item) {
            self.last_click.set(now);
        }
    }

    fn evaluate(&self, differences: &[i64], timestamp: i64) {
        if differences.len() < MIN_SAMPLES {
            return;
        }

        let sd = stats::std_dev(differences);
        let mean = stats::mean(differences);

        let config = self.base.config();
        let settings = &config.checks.auto_totem_h;

        if !below_both(sd, settings.standard_deviation_threshold, mean, settings.mean_threshold) {
            self.low_sd_count.reset();
            return;
        }

        if self.low_sd_count.hit(settings.consecutive_low_sd_count) {
            let evidence = Evidence::new().number("Click SD", sd).number("Mean", mean);
            self.base.fail(evidence, timestamp);
        }
    }
}

impl Check for AutoTotemH {
    fn base(&self) -> &CheckBase {
        &self.base
    }

    fn reset(&self) {
        self.last_totem_use.clear();
        self.last_click.clear();
        self.click_differences.clear();
        self.low_sd_count.reset();
    }
}

impl EventCheck for AutoTotemH {
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
