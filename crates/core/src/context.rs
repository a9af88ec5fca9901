use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{EntityKey, EntitySet, IntentName, Message, Role};

/// Per-conversation memory. One instance per session; the orchestrator is the
/// only writer and history is append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationContext {
    session_id: String,
    last_intent: IntentName,
    last_entities: EntitySet,
    missing_fields: Vec<EntityKey>,
    history: Vec<Message>,
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationContext {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            last_intent: IntentName::Unknown,
            last_entities: EntitySet::default(),
            missing_fields: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn last_intent(&self) -> IntentName {
        self.last_intent
    }

    pub fn last_entities(&self) -> &EntitySet {
        &self.last_entities
    }

    pub fn missing_fields(&self) -> &[EntityKey] {
        &self.missing_fields
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn awaiting_slots(&self) -> bool {
        !self.missing_fields.is_empty()
    }

    pub fn record(&mut self, role: Role, content: impl Into<String>) {
        self.history.push(Message::new(role, content));
    }

    pub fn resolve(&mut self, intent: IntentName, entities: EntitySet) {
        self.last_intent = intent;
        self.last_entities = entities;
    }

    pub fn set_missing(&mut self, missing: Vec<EntityKey>) {
        self.missing_fields = missing;
    }

    pub fn clear_missing(&mut self) {
        self.missing_fields.clear();
    }

    /// Drops everything remembered so far but keeps the session id.
    pub fn reset(&mut self) {
        self.last_intent = IntentName::Unknown;
        self.last_entities = EntitySet::default();
        self.missing_fields.clear();
        self.history.clear();
    }
}

pub fn merge_entities(new_entities: &EntitySet, context: &ConversationContext) -> EntitySet {
    new_entities.merged_over(context.last_entities())
}
