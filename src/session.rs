//! Session records for multi-turn clarification.
//!
//! A clarification suspension is a first-class state transition, not a
//! paused call stack: the session record holds everything needed to resume
//! — the append-only turn sequence and the clarification-round counter —
//! keyed by a session id the caller carries across turns.

use crate::types::{DelverError, Message, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// One suspended or active conversation with the engine.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub turns: Vec<Message>,
    pub clarification_rounds: u8,
}

/// In-memory session store. Sessions live for the lifetime of the store;
/// run-scoped data (assignments, findings) never enters it.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session seeded with the first user turn.
    pub fn create(&self, first_turn: Message) -> Uuid {
        let id = Uuid::new_v4();
        let session = Session {
            id,
            turns: vec![first_turn],
            clarification_rounds: 0,
        };
        self.sessions.write().insert(id, session);
        id
    }

    pub fn append_turn(&self, id: Uuid, turn: Message) -> Result<()> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| DelverError::SessionNotFound(id.to_string()))?;
        session.turns.push(turn);
        Ok(())
    }

    /// Snapshot of the conversation so far.
    pub fn conversation(&self, id: Uuid) -> Result<Vec<Message>> {
        self.sessions
            .read()
            .get(&id)
            .map(|s| s.turns.clone())
            .ok_or_else(|| DelverError::SessionNotFound(id.to_string()))
    }

    /// Record one more clarification round and return the new count.
    pub fn bump_clarification_rounds(&self, id: Uuid) -> Result<u8> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| DelverError::SessionNotFound(id.to_string()))?;
        session.clarification_rounds = session.clarification_rounds.saturating_add(1);
        Ok(session.clarification_rounds)
    }

    pub fn exists(&self, id: Uuid) -> bool {
        self.sessions.read().contains_key(&id)
    }
}
