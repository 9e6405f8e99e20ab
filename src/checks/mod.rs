//! AutoTotem checks
//!
//! Every check is a small reactive state machine bound to one player. Checks
//! declare what they consume through the [`EventCheck`], [`PacketCheck`] and
//! [`CycleCheck`] capability traits and the [`CheckManager`] dispatches to
//! each list directly.

pub mod auto_totem_a;
pub mod auto_totem_b;
pub mod auto_totem_c;
pub mod auto_totem_d;
pub mod auto_totem_e;
pub mod auto_totem_f;
pub mod auto_totem_g;
pub mod auto_totem_h;
pub mod manager;

pub use auto_totem_a::AutoTotemA;
pub use auto_totem_b::AutoTotemB;
pub use auto_totem_c::AutoTotemC;
pub use auto_totem_d::AutoTotemD;
pub use auto_totem_e::AutoTotemE;
pub use auto_totem_f::AutoTotemF;
pub use auto_totem_g::AutoTotemG;
pub use auto_totem_h::AutoTotemH;
pub use manager::CheckManager;

use crate::alerting::AlertSink;
use crate::config::{CheckSettings, Config, ConfigHandle};
use crate::models::{CheckAlert, Evidence, PacketEvent, PlayerEvent};
use crate::player::{PlayerState, TotemCycle};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Static description of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub experimental: bool,
}

/// Shared collaborators handed to every check
#[derive(Clone)]
pub struct Reporter {
    config: ConfigHandle,
    sink: Arc<dyn AlertSink>,
}

impl Reporter {
    pub fn new(config: ConfigHandle, sink: Arc<dyn AlertSink>) -> Self {
        Reporter { config, sink }
    }

    pub fn config(&self) -> Arc<Config> {
        self.config.current()
    }
}

/// Identity, player binding and violation counter common to all checks
pub struct CheckBase {
    info: CheckInfo,
    player: Arc<PlayerState>,
    reporter: Reporter,
    violations: AtomicU32,
}

impl CheckBase {
    pub fn new(info: CheckInfo, player: Arc<PlayerState>, reporter: Reporter) -> Self {
        CheckBase {
            info,
            player,
            reporter,
            violations: AtomicU32::new(0),
        }
    }

    pub fn info(&self) -> &CheckInfo {
        &self.info
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    /// Current configuration snapshot
    pub fn config(&self) -> Arc<Config> {
        self.reporter.config()
    }

    pub fn settings(&self) -> CheckSettings {
        self.config()
            .checks
            .check_settings(self.info.name)
            .unwrap_or(CheckSettings {
                enabled: true,
                punishable: false,
                max_violations: u32::MAX,
            })
    }

    pub fn violations(&self) -> u32 {
        self.violations.load(Ordering::Acquire)
    }

    pub fn reset_violations(&self) {
        self.violations.store(0, Ordering::Release);
    }

    /// Count a violation and hand the alert to the sink
    pub fn fail(&self, evidence: Evidence, timestamp: i64) -> CheckAlert {
        let violations = self.violations.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        let settings = self.settings();
        let punish = settings.punishable && violations >= settings.max_violations;

        let alert = CheckAlert {
            check_name: self.info.name.to_string(),
            description: self.info.description.to_string(),
            experimental: self.info.experimental,
            player_id: self.player.id(),
            player_name: self.player.name().to_string(),
            violations,
            max_violations: settings.max_violations,
            punish,
            timestamp,
            evidence,
        };

        log::debug!(
            "{} failed {} ({}/{}): {}",
            alert.player_name,
            alert.check_name,
            violations,
            settings.max_violations,
            alert.evidence
        );
        if punish {
            log::warn!(
                "{} reached max violations for {}",
                alert.player_name,
                alert.check_name
            );
        }

        self.reporter.sink.dispatch(alert.clone());
        alert
    }
}

/// Base behaviour of every check
pub trait Check: Send + Sync {
    fn base(&self) -> &CheckBase;

    /// Clear detector-specific rolling state
    fn reset(&self) {}

    fn name(&self) -> &'static str {
        self.base().info().name
    }
}

/// Consumes game-thread player events
pub trait EventCheck: Check {
    fn on_event(&self, event: &PlayerEvent);
}

/// Consumes network-thread packets
pub trait PacketCheck: Check {
    fn on_packet(&self, packet: &PacketEvent);
}

/// Consumes completed totem cycles
pub trait CycleCheck: Check {
    fn on_totem_cycle(&self, cycle: &TotemCycle);
}

/// Counter that needs back-to-back qualifying observations and drops to
/// zero on the first one that does not qualify
#[derive(Debug, Default)]
pub struct ConsecutiveCounter(AtomicU32);

impl ConsecutiveCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a qualifying observation, returns true once `threshold` is
    /// reached and starts over
    pub fn hit(&self, threshold: u32) -> bool {
        let count = self.0.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        if count >= threshold {
            self.0.store(0, Ordering::Release);
            true
        } else {
            false
        }
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Release);
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }
}

/// Flag when both values are below their thresholds; NaN never qualifies
pub(crate) fn below_both(sd: f64, sd_threshold: f64, mean: f64, mean_threshold: f64) -> bool {
    sd < sd_threshold && mean < mean_threshold
}
