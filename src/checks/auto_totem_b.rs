//! AutoTotemB: consistently low standard deviation of totem intervals

use super::{below_both, Check, CheckBase, CheckInfo, ConsecutiveCounter, CycleCheck, Reporter};
use crate::models::Evidence;
use crate::player::{PlayerState, TotemCycle};
use crate::stats;
use std::sync::Arc;

/// Flags back-to-back totem cycles whose interval deviation and mean are both low
pub struct AutoTotemB {
    base: CheckBase,
    low_sd_count: ConsecutiveCounter,
}

impl AutoTotemB {
    pub const INFO: CheckInfo = CheckInfo {
        name: "AutoTotemB",
        description: "Suspicious standard deviation",
        experimental: false,
    };

    /// Build the check for one player
    pub fn new(player: Arc<PlayerState>, reporter: Reporter) -> Self {
        AutoTotemB {
            base: CheckBase::new(Self::INFO, player, reporter),
            low_sd_count: ConsecutiveCounter::new(),
        }
    }

    pub fn low_sd_count(&self) -> u32 {
        self.low_sd_count.get()
    }
}

impl Check for AutoTotemB {
    fn base(&self) -> &CheckBase {
        &self.base
    }

    fn reset(&self) {
        self.low_sd_count.reset();
    }
}

impl CycleCheck for AutoTotemB {
    fn on_totem_cycle(&self, cycle: &TotemCycle) {
        let intervals = self.base.player().latest_intervals(2);
        if intervals.len() < 2 {
            return;
        }

        let sd = stats::std_dev(&intervals);
        let mean = stats::mean(&intervals);

        let config = self.base.config();
        let settings = &config.checks.auto_totem_b;

        if !below_both(sd, settings.standard_deviation_threshold, mean, settings.mean_threshold) {
            self.low_sd_count.reset();
            return;
        }

        if self.low_sd_count.hit(settings.consecutive_low_sd_count) {
            let evidence = Evidence::new()
                .number("Standard Deviation", sd)
                .number("Mean", mean);
            self.base.fail(evidence, cycle.timestamp);
        }
    }
}
