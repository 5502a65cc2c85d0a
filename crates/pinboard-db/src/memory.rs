use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::info;

use pinboard_types::ValidationError;
use pinboard_types::models::Message;

use crate::{StoreError, StoreResult};

/// In-memory message board.
///
/// The map and the id counter live behind one mutex: every operation,
/// reads included, takes it exclusively, so two creates can never hand out
/// the same id. Clones share the same board.
#[derive(Clone, Default)]
pub struct MessageStore {
    inner: Arc<Mutex<BoardInner>>,
}

#[derive(Default)]
struct BoardInner {
    /// Keyed by id; ids are issued in increasing order, so iteration order
    /// is insertion order.
    messages: BTreeMap<i64, Message>,
    last_id: i64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    // No operation can leave the board half-updated, so a poisoned lock
    // still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, BoardInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create(&self, username: &str, content: &str) -> StoreResult<Message> {
        if username.is_empty() {
            return Err(ValidationError::Empty { field: "username" }.into());
        }
        if content.is_empty() {
            return Err(ValidationError::Empty { field: "content" }.into());
        }

        let now = Utc::now();
        let mut board = self.lock();
        board.last_id += 1;
        let message = Message {
            id: board.last_id,
            username: username.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        board.messages.insert(message.id, message.clone());
        drop(board);

        info!("Message {} created by {}", message.id, message.username);
        Ok(message)
    }

    pub fn get_all(&self) -> Vec<Message> {
        self.lock().messages.values().cloned().collect()
    }

    pub fn get(&self, id: i64) -> StoreResult<Message> {
        self.lock()
            .messages
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("message", id))
    }

    pub fn update(&self, id: i64, content: &str) -> StoreResult<Message> {
        if content.is_empty() {
            return Err(ValidationError::Empty { field: "content" }.into());
        }

        let mut board = self.lock();
        let message = board
            .messages
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("message", id))?;
        message.content = content.to_string();
        message.updated_at = Utc::now();
        let updated = message.clone();
        drop(board);

        info!("Message {} updated", id);
        Ok(updated)
    }

    pub fn delete(&self, id: i64) -> StoreResult<()> {
        let removed = self.lock().messages.remove(&id);
        if removed.is_none() {
            return Err(StoreError::not_found("message", id));
        }
        info!("Message {} deleted", id);
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.lock().messages.len()
    }
}
