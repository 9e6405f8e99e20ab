//! Per-player check registry and dispatch

use super::{
    AutoTotemA, AutoTotemB, AutoTotemC, AutoTotemD, AutoTotemE, AutoTotemF, AutoTotemG,
    AutoTotemH, Check, CheckBase, CycleCheck, EventCheck, PacketCheck, Reporter,
};
use crate::models::{PacketEvent, PlayerEvent};
use crate::player::{PlayerState, TotemCycle};
use std::sync::Arc;

/// Owns one player's checks, grouped by what they consume
pub struct CheckManager {
    checks: Vec<Arc<dyn Check>>,
    event_checks: Vec<Arc<dyn EventCheck>>,
    packet_checks: Vec<Arc<dyn PacketCheck>>,
    cycle_checks: Vec<Arc<dyn CycleCheck>>,
}

impl CheckManager {
    /// Build every AutoTotem check for a player
    pub fn new(player: Arc<PlayerState>, reporter: Reporter) -> Self {
        let a = Arc::new(AutoTotemA::new(player.clone(), reporter.clone()));
        let b = Arc::new(AutoTotemB::new(player.clone(), reporter.clone()));
        let c = Arc::new(AutoTotemC::new(player.clone(), reporter.clone()));
        let d = Arc::new(AutoTotemD::new(player.clone(), reporter.clone()));
        let e = Arc::new(AutoTotemE::new(player.clone(), reporter.clone()));
        let f = Arc::new(AutoTotemF::new(player.clone(), reporter.clone()));
        let g = Arc::new(AutoTotemG::new(player.clone(), reporter.clone()));
        let h = Arc::new(AutoTotemH::new(player, reporter));

        CheckManager {
            checks: vec![
                a.clone() as Arc<dyn Check>,
                b.clone(),
                c.clone(),
                d.clone(),
                e.clone(),
                f.clone(),
                g.clone(),
                h.clone(),
            ],
            event_checks: vec![a as Arc<dyn EventCheck>, f, g, h],
            packet_checks: vec![d as Arc<dyn PacketCheck>],
            cycle_checks: vec![b as Arc<dyn CycleCheck>, c, e],
        }
    }

    pub fn on_event(&self, event: &PlayerEvent) {
        for check in self.event_checks.iter().filter(|c| is_enabled(c.base())) {
            check.on_event(event);
        }
    }

    pub fn on_packet(&self, packet: &PacketEvent) {
        for check in self.packet_checks.iter().filter(|c| is_enabled(c.base())) {
            check.on_packet(packet);
        }
    }

    pub fn on_totem_cycle(&self, cycle: &TotemCycle) {
        for check in self.cycle_checks.iter().filter(|c| is_enabled(c.base())) {
            check.on_totem_cycle(cycle);
        }
    }

    /// Zero every violation counter, keeping rolling state
    pub fn reset_violations(&self) {
        for check in &self.checks {
            check.base().reset_violations();
        }
    }

    /// Zero violations and drop all detector state
    pub fn reset(&self) {
        for check in &self.checks {
            check.base().reset_violations();
            check.reset();
        }
    }

    pub fn check_named(&self, name: &str) -> Option<&Arc<dyn Check>> {
        self.checks.iter().find(|c| c.name() == name)
    }

    pub fn checks(&self) -> &[Arc<dyn Check>] {
        &self.checks
    }
}

fn is_enabled(base: &CheckBase) -> bool {
    base.settings().enabled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::*;
    use crate::config::Config;
    use crate::models::PlayerEventKind;

    #[test]
    fn test_registers_all_checks() {
        let (reporter, _sink) = create_reporter(Config::default());
        let manager = CheckManager::new(create_player(), reporter);

        let names: Vec<_> = manager.checks().iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec![
                "AutoTotemA", "AutoTotemB", "AutoTotemC", "AutoTotemD", "AutoTotemE",
                "AutoTotemF", "AutoTotemG", "AutoTotemH"
            ]
        );
        assert!(manager.check_named("AutoTotemD").is_some());
        assert!(manager.check_named("AutoTotemZ").is_none());
    }

    #[test]
    fn test_disabled_check_is_skipped() {
        let mut config = Config::default();
        config.checks.auto_totem_a.enabled = false;
        let player = create_player();
        let (reporter, sink) = create_reporter(config);
        let manager = CheckManager::new(player.clone(), reporter);

        manager.on_event(&create_event(&player, 0, PlayerEventKind::Resurrect));
        manager.on_event(&create_event(&player, 40, totem_click(20)));
        manager.on_event(&create_event(&player, 90, totem_placement(45)));

        assert!(sink.alerts().iter().all(|a| a.check_name != "AutoTotemA"));
    }

    #[test]
    fn test_reset_violations() {
        let player = create_player();
        let (reporter, _sink) = create_reporter(Config::default());
        let manager = CheckManager::new(player.clone(), reporter);

        manager.on_event(&create_event(&player, 0, PlayerEventKind::Resurrect));
        manager.on_event(&create_event(&player, 40, totem_click(20)));
        manager.on_event(&create_event(&player, 90, totem_placement(45)));

        let a = manager.check_named("AutoTotemA").unwrap();
        assert_eq!(a.base().violations(), 1);

        manager.reset_violations();
        assert_eq!(a.base().violations(), 0);
    }
}
