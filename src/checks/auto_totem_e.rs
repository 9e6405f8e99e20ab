//! AutoTotemE: suspiciously uniform low outliers

use super::{below_both, Check, CheckBase, CheckInfo, CycleCheck, Reporter};
use crate::models::Evidence;
use crate::player::{PlayerState, RollingWindow, TotemCycle};
use crate::stats;
use std::sync::Arc;

const INTERVAL_SAMPLE: usize = 15;
const MIN_INTERVALS: usize = 4;
const OUTLIER_POOL: usize = 30;
const MIN_POOL: usize = 15;
const SD_HISTORY: usize = 10;

/// Flags low interval outliers that are themselves too uniform
pub struct AutoTotemE {
    base: CheckBase,
    low_outliers: RollingWindow<f64>,
    standard_deviations: RollingWindow<f64>,
}

impl AutoTotemE {
    pub const INFO: CheckInfo = CheckInfo {
        name: "AutoTotemE",
        description: "Suspicious low outliers",
        experimental: false,
    };

    /// Build the check for one player
    pub fn new(player: Arc<PlayerState>, reporter: Reporter) -> Self {
        AutoTotemE {
            base: CheckBase::new(Self::INFO, player, reporter),
            low_outliers: RollingWindow::new(OUTLIER_POOL),
            standard_deviations: RollingWindow::new(SD_HISTORY),
        }
    }
}

impl Check for AutoTotemE {
    fn base(&self) -> &CheckBase {
        &self.base
    }

    fn reset(&self) {
        self.low_outliers.clear();
        self.standard_deviations.clear();
    }
}

impl CycleCheck for AutoTotemE {
    fn on_totem_cycle(&self, cycle: &TotemCycle) {
        let intervals = self.base.player().latest_intervals(INTERVAL_SAMPLE);
        if intervals.len() < MIN_INTERVALS {
            return;
        }

        self.low_outliers.extend(stats::tukey_outliers(&intervals).low);

        let pool = self.low_outliers.snapshot();
        if pool.len() < MIN_POOL {
            return;
        }

        let sd = stats::std_dev(&pool);
        let history = self.standard_deviations.push_and_snapshot(sd);
        let average_sd = stats::mean(&history);

        let config = self.base.config();
        let settings = &config.checks.auto_totem_e;

        if below_both(
            sd,
            settings.standard_deviation_threshold,
            average_sd,
            settings.average_standard_deviation_threshold,
        ) {
            let evidence = Evidence::new()
                .number("Standard Deviation", sd)
                .number("Average Stdev Mean", average_sd);
            self.base.fail(evidence, cycle.timestamp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::*;
    use crate::config::Config;

    fn feed(check: &AutoTotemE, player: &PlayerState, interval: i64) {
        player.record_interval(interval);
        check.on_totem_cycle(&cycle(interval));
    }

    #[test]
    fn test_uniform_outliers_flag_once_pool_fills() {
        let player = create_player();
        let (reporter, sink) = create_reporter(Config::default());
        let check = AutoTotemE::new(player.clone(), reporter);

        for _ in 0..10 {
            feed(&check, &player, 200);
        }
        // the lone fast cycle stays a low outlier for the next 15 cycles
        feed(&check, &player, 50);
        for _ in 0..13 {
            feed(&check, &player, 200);
        }
        assert_eq!(check.low_outliers.len(), 14);
        assert_eq!(sink.count(), 0);

        feed(&check, &player, 200);
        assert_eq!(sink.count(), 1);
        assert_eq!(check.standard_deviations.len(), 1);
    }

    #[test]
    fn test_no_outliers_never_flags() {
        let player = create_player();
        let (reporter, sink) = create_reporter(Config::default());
        let check = AutoTotemE::new(player.clone(), reporter);

        for i in 0..60 {
            feed(&check, &player, 300 + (i % 7) * 10);
        }
        assert!(check.low_outliers.is_empty());
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_too_few_intervals() {
        let player = create_player();
        let (reporter, _sink) = create_reporter(Config::default());
        let check = AutoTotemE::new(player.clone(), reporter);

        for interval in [500, 500, 10] {
            feed(&check, &player, interval);
        }
        assert!(check.low_outliers.is_empty());
    }
}
