//! Session store: durable checkpointing of conversation state.
//!
//! State is keyed by session id and overwritten wholesale each turn;
//! there are no partial or field-level writes. Loading an unknown id
//! yields fresh empty state — the store never fails on a missing key.

use crate::error::StoreError;
use crate::state::ConversationState;
use async_trait::async_trait;
use garnet_porter_core::SessionId;
use std::collections::HashMap;
use std::sync::Mutex;

/// Trait for conversation state persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the state for a session, or fresh empty state if the id is
    /// unknown.
    async fn load(&self, session_id: &SessionId) -> Result<ConversationState, StoreError>;

    /// Persists the state for a session, replacing any previous value.
    async fn save(
        &self,
        session_id: &SessionId,
        state: &ConversationState,
    ) -> Result<(), StoreError>;
}

/// In-memory reference store.
///
/// Saves for the same session serialize through the map lock, so a save
/// can never be torn by a concurrent save for the same id. Durable
/// deployments implement [`SessionStore`] against an external database.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<SessionId, ConversationState>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of checkpointed sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().map_or(0, |sessions| sessions.len())
    }

    /// Returns whether the store holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, session_id: &SessionId) -> Result<ConversationState, StoreError> {
        let sessions = self.sessions.lock().map_err(|_| StoreError::Backend {
            reason: "store lock poisoned".to_string(),
        })?;
        Ok(sessions
            .get(session_id)
            .cloned()
            .unwrap_or_else(|| ConversationState::new(session_id.clone())))
    }

    async fn save(
        &self,
        session_id: &SessionId,
        state: &ConversationState,
    ) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().map_err(|_| StoreError::Backend {
            reason: "store lock poisoned".to_string(),
        })?;
        sessions.insert(session_id.clone(), state.clone());
        Ok(())
    }
}
