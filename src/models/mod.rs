pub mod alert;
pub mod event;

pub use alert::{CheckAlert, Evidence, EvidenceField, EvidenceValue};
pub use event::{
    is_totem, now_millis, ClickType, DiggingAction, InteractAction, InventoryClick,
    InventoryKind, ItemKind, PacketEvent, PacketKind, PlayerEvent, PlayerEventKind,
    PlayerSnapshot, RecordedEvent,
};
