//! AutoTotemC: second-order consistency of the interval standard deviation

use super::{Check, CheckBase, CheckInfo, ConsecutiveCounter, CycleCheck, Reporter};
use crate::models::Evidence;
use crate::player::{PlayerState, RollingWindow, TotemCycle};
use crate::stats;
use std::sync::Arc;

const INTERVAL_SAMPLE: usize = 4;
const SD_HISTORY: usize = 4;

/// Flags a standard deviation that keeps changing by the same small amount
pub struct AutoTotemC {
    base: CheckBase,
    standard_deviations: RollingWindow<f64>,
    consistent_count: ConsecutiveCounter,
}

impl AutoTotemC {
    pub const INFO: CheckInfo = CheckInfo {
        name: "AutoTotemC",
        description: "Suspicious average standard deviation",
        experimental: false,
    };

    /// Build the check for one player
    pub fn new(player: Arc<PlayerState>, reporter: Reporter) -> Self {
        AutoTotemC {
            base: CheckBase::new(Self::INFO, player, reporter),
            standard_deviations: RollingWindow::new(SD_HISTORY),
            consistent_count: ConsecutiveCounter::new(),
        }
    }
}

impl Check for AutoTotemC {
    fn base(&self) -> &CheckBase {
        &self.base
    }

    fn reset(&self) {
        self.standard_deviations.clear();
        self.consistent_count.reset();
    }
}

impl CycleCheck for AutoTotemC {
    fn on_totem_cycle(&self, cycle: &TotemCycle) {
        let intervals = self.base.player().latest_intervals(INTERVAL_SAMPLE);
        if intervals.len() < INTERVAL_SAMPLE {
            return;
        }

        let history = self
            .standard_deviations
            .push_and_snapshot(stats::std_dev(&intervals));
        if history.len() < 2 {
            return;
        }

        let differences: Vec<f64> = history.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
        let average_difference = stats::mean(&differences);
        log::debug!(
            "{} - AutoTotemC average sd difference {:.2}",
            self.base.player().name(),
            average_difference
        );

        let config = self.base.config();
        let settings = &config.checks.auto_totem_c;

        if average_difference < settings.consistent_sd_range {
            if self.consistent_count.hit(settings.consecutive_violations) {
                self.standard_deviations.clear();
                self.base.fail(
                    Evidence::new().number("Average SD Difference", average_difference),
                    cycle.timestamp,
                );
            }
        } else {
            self.consistent_count.reset();
        }
    }
}
