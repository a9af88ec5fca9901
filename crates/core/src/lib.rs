pub mod context;
pub mod entities;
pub mod formatter;
pub mod intent;
pub mod models;
pub mod slots;

pub use context::{merge_entities, ConversationContext};
pub use entities::{currency_code, extract_entities};
pub use intent::{classify_intent, normalize_text, score_intents, select_intent};
pub use models::*;
pub use slots::{
    missing_labels, missing_slots, parse_amount, required_slots, resolve_request, RequiredSlot,
    SlotResolution,
};
