use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Item held in a slot, hand or cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    #[default]
    Air,
    TotemOfUndying,
    Other(String),
}

impl ItemKind {
    pub fn is_totem(&self) -> bool {
        matches!(self, ItemKind::TotemOfUndying)
    }

    /// Display name used in evidence
    pub fn display_name(&self) -> String {
        match self {
            ItemKind::Air => "Empty Hand".to_string(),
            ItemKind::TotemOfUndying => "TOTEM_OF_UNDYING".to_string(),
            ItemKind::Other(name) => name.to_uppercase(),
        }
    }
}

/// Returns true if the optional item is a totem
pub fn is_totem(item: &Option<ItemKind>) -> bool {
    item.as_ref().map(ItemKind::is_totem).unwrap_or(false)
}

/// Click type reported for an inventory click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickType {
    Left,
    Right,
    ShiftLeft,
    ShiftRight,
    NumberKey,
    SwapOffhand,
    Middle,
    Drop,
    ControlDrop,
    DoubleClick,
    Creative,
    Unknown,
}

/// Kind of inventory the click landed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InventoryKind {
    #[default]
    Player,
    Container,
    Crafting,
    Other,
}

/// Interaction action of a player-interact event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractAction {
    LeftClickAir,
    LeftClickBlock,
    RightClickAir,
    RightClickBlock,
    Physical,
}

impl InteractAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractAction::LeftClickAir => "LEFT_CLICK_AIR",
            InteractAction::LeftClickBlock => "LEFT_CLICK_BLOCK",
            InteractAction::RightClickAir => "RIGHT_CLICK_AIR",
            InteractAction::RightClickBlock => "RIGHT_CLICK_BLOCK",
            InteractAction::Physical => "PHYSICAL",
        }
    }
}

/// Player state captured by the platform when the event was delivered
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSnapshot {
    pub main_hand: ItemKind,
    pub totem_count: u32,
    pub ping_ms: i64,
    pub sprinting: bool,
    pub sneaking: bool,
    pub blocking: bool,
}

impl PlayerSnapshot {
    /// Active movement states, comma separated, or "None"
    pub fn states(&self) -> String {
        let mut states = Vec::new();
        if self.sprinting {
            states.push("Sprinting");
        }
        if self.sneaking {
            states.push("Sneaking");
        }
        if self.blocking {
            states.push("Blocking");
        }

        if states.is_empty() {
            "None".to_string()
        } else {
            states.join(", ")
        }
    }

    /// A resurrection only counts when the main hand is free of totems and
    /// at least two totems were held before the pop
    pub fn is_valid_resurrection(&self) -> bool {
        !self.main_hand.is_totem() && self.totem_count >= 2
    }
}

/// An inventory click
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryClick {
    pub raw_slot: i32,
    pub click: ClickType,
    #[serde(default)]
    pub inventory: InventoryKind,
    #[serde(default)]
    pub current_item: Option<ItemKind>,
    #[serde(default)]
    pub cursor: Option<ItemKind>,
    #[serde(default)]
    pub hotbar_item: Option<ItemKind>,
}

/// Game-thread events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerEventKind {
    Resurrect,
    InventoryClick(InventoryClick),
    SwapHand { offhand_item: ItemKind },
    Interact { action: InteractAction },
    InventoryClose,
    Death,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerEvent {
    pub player_id: Uuid,
    pub timestamp: i64,
    #[serde(default)]
    pub snapshot: PlayerSnapshot,
    pub kind: PlayerEventKind,
}

/// Digging packet actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiggingAction {
    StartDigging,
    CancelledDigging,
    FinishedDigging,
    DropItemStack,
    DropItem,
    ReleaseUseItem,
    SwapItemWithOffhand,
}

/// Network-thread packets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PacketKind {
    Digging { action: DiggingAction },
    PickItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketEvent {
    pub player_id: Uuid,
    pub timestamp: i64,
    pub kind: PacketKind,
}

/// One line of a recorded event stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RecordedEvent {
    Connect { player_id: Uuid, name: String },
    Disconnect { player_id: Uuid },
    Player(PlayerEvent),
    Packet(PacketEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_string() {
        let mut snapshot = PlayerSnapshot::default();
        assert_eq!(snapshot.states(), "None");

        snapshot.sprinting = true;
        snapshot.blocking = true;
        assert_eq!(snapshot.states(), "Sprinting, Blocking");
    }

    #[test]
    fn test_valid_resurrection() {
        let mut snapshot = PlayerSnapshot {
            totem_count: 2,
            ..Default::default()
        };
        assert!(snapshot.is_valid_resurrection());

        snapshot.totem_count = 1;
        assert!(!snapshot.is_valid_resurrection());

        snapshot.totem_count = 5;
        snapshot.main_hand = ItemKind::TotemOfUndying;
        assert!(!snapshot.is_valid_resurrection());
    }

    #[test]
    fn test_recorded_event_json() {
        let line = r#"{"event":"packet","player_id":"6f0b1d4e-3f7a-4a55-9a6e-2b8d0c1e9f10","timestamp":1700000000000,"kind":{"type":"digging","action":"swap_item_with_offhand"}}"#;
        let event: RecordedEvent = serde_json::from_str(line).unwrap();

        match event {
            RecordedEvent::Packet(packet) => {
                assert_eq!(packet.timestamp, 1700000000000);
                assert_eq!(
                    packet.kind,
                    PacketKind::Digging { action: DiggingAction::SwapItemWithOffhand }
                );
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_inventory_click_json() {
        let line = r#"{"event":"player","player_id":"6f0b1d4e-3f7a-4a55-9a6e-2b8d0c1e9f10","timestamp":5,
            "kind":{"type":"inventory_click","raw_slot":45,"click":"left","cursor":"totem_of_undying"}}"#;
        let event: RecordedEvent = serde_json::from_str(line).unwrap();

        let RecordedEvent::Player(event) = event else {
            panic!("expected player event");
        };
        let PlayerEventKind::InventoryClick(click) = event.kind else {
            panic!("expected inventory click");
        };
        assert_eq!(click.raw_slot, 45);
        assert!(is_totem(&click.cursor));
        assert!(!is_totem(&click.current_item));
        assert_eq!(click.inventory, InventoryKind::Player);
    }
}
