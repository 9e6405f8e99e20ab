//! Per-player rolling state
//!
//! Each connected player owns one [`PlayerState`] that the totem processor
//! and all checks share. Fields are updated from both the game thread and
//! the network thread, so everything is atomic or behind a short lock.

pub mod processor;
pub mod state;
pub mod window;

pub use processor::{TotemCycle, TotemProcessor};
pub use state::{AtomicTimestamp, DigPickSequence, DigPickStage, DigPickState, PlayerState};
pub use window::RollingWindow;

use uuid::Uuid;

/// Bedrock players joining through Geyser carry a UUID whose most
/// significant 64 bits are zero
pub fn is_bedrock_player(player_id: &Uuid) -> bool {
    player_id.as_u64_pair().0 == 0
}
