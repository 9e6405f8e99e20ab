//! AutoTotemD: timing fingerprint of the swap -> pick item -> swap packet triad

use super::{Check, CheckBase, CheckInfo, PacketCheck, Reporter};
use crate::models::{DiggingAction, Evidence, PacketEvent, PacketKind};
use crate::player::{DigPickSequence, PlayerState};
use std::sync::Arc;

pub struct AutoTotemD {
    base: CheckBase,
}

impl AutoTotemD {
    pub const INFO: CheckInfo = CheckInfo {
        name: "AutoTotemD",
        description: "Suspicious re-totem packet sequence",
        experimental: false,
    };

    pub fn new(player: Arc<PlayerState>, reporter: Reporter) -> Self {
        AutoTotemD {
            base: CheckBase::new(Self::INFO, player, reporter),
        }
    }

    fn evaluate(&self, totem_pop: i64, sequence: DigPickSequence) {
        let config = self.base.config();
        let settings = &config.checks.auto_totem_d;

        let total_time = sequence.last_digging_at - totem_pop;
        let average_per_packet = total_time / 3;
        log::debug!(
            "{} - AutoTotemD total {}ms, average {}ms",
            self.base.player().name(),
            total_time,
            average_per_packet
        );

        if (average_per_packet - settings.expected_average_ms).abs() <= settings.acceptable_variation_ms {
            let evidence = Evidence::new()
                .millis("Total Time", total_time)
                .millis("Average Time Per Packet", average_per_packet)
                .millis("Time To First Swap", sequence.first_digging_at - totem_pop)
                .millis("Swap To Pick Up", sequence.digging_to_pick())
                .millis("Pick Up To Digging", sequence.pick_to_digging());
            self.base.fail(evidence, sequence.last_digging_at);
        }
    }
}

impl Check for AutoTotemD {
    fn base(&self) -> &CheckBase {
        &self.base
    }

    fn reset(&self) {
        self.base.player().dig_pick.lock().reset();
    }
}

impl PacketCheck for AutoTotemD {
    fn on_packet(&self, packet: &PacketEvent) {
        let player = self.base.player();

        match packet.kind {
            PacketKind::Digging {
                action: DiggingAction::SwapItemWithOffhand,
            } => {
                let Some(totem_pop) = player.last_totem_usage.get() else {
                    return;
                };
                // Release the lock before reporting
                let completed = player.dig_pick.lock().on_digging(packet.timestamp);
                if let Some(sequence) = completed {
                    self.evaluate(totem_pop, sequence);
                }
            }
            PacketKind::PickItem => player.dig_pick.lock().on_pick_item(packet.timestamp),
            PacketKind::Digging { .. } => {}
        }
    }
}
