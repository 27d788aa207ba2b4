use crate::queue::{QueueClient, QueueError, QueueMessage};
use crate::store::{ObjectStore, StoreError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

pub fn message(id: &str, body: &str) -> QueueMessage {
    QueueMessage {
        id: id.into(),
        body: body.into(),
        receipt_handle: format!("rh-{id}"),
        attributes: HashMap::new(),
    }
}

/// In-memory queue with injectable receive/delete failures.
#[derive(Default)]
pub struct InMemoryQueue {
    pending: Mutex<Vec<QueueMessage>>,
    deleted: Mutex<Vec<String>>,
    fail_receive: AtomicBool,
    fail_delete: AtomicBool,
}

impl InMemoryQueue {
    pub fn with_messages(messages: Vec<QueueMessage>) -> Self {
        InMemoryQueue {
            pending: Mutex::new(messages),
            ..Default::default()
        }
    }

    pub fn set_fail_receive(&self, fail: bool) {
        self.fail_receive.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn deleted_handles(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueueClient for InMemoryQueue {
    async fn receive(
        &self,
        max_messages: i32,
        _wait_secs: i32,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        if self.fail_receive.load(Ordering::SeqCst) {
            return Err(QueueError::Receive("injected receive failure".into()));
        }
        let mut pending = self.pending.lock().unwrap();
        let take = (max_messages.max(0) as usize).min(pending.len());
        Ok(pending.drain(..take).collect())
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(QueueError::Delete("injected delete failure".into()));
        }
        self.deleted.lock().unwrap().push(receipt_handle.to_string());
        Ok(())
    }
}

pub struct StoredObject {
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
    pub metadata: HashMap<String, String>,
}

/// In-memory object store that records every put. Writes can be made to
/// fail per message id, matched through the `message-id` metadata tag.
#[derive(Default)]
pub struct InMemoryStore {
    stored: Mutex<Vec<StoredObject>>,
    fail_message_ids: Mutex<HashSet<String>>,
}

impl InMemoryStore {
    pub fn fail_for_message(&self, id: &str) {
        self.fail_message_ids.lock().unwrap().insert(id.to_string());
    }

    /// Snapshot of everything written so far, in insertion order.
    pub fn objects(&self) -> Vec<StoredObject> {
        self.stored
            .lock()
            .unwrap()
            .iter()
            .map(|o| StoredObject {
                key: o.key.clone(),
                body: o.body.clone(),
                content_type: o.content_type.clone(),
                metadata: o.metadata.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), StoreError> {
        let should_fail = metadata
            .get("message-id")
            .is_some_and(|id| self.fail_message_ids.lock().unwrap().contains(id));
        if should_fail {
            return Err(StoreError::Write("injected write failure".into()));
        }

        self.stored.lock().unwrap().push(StoredObject {
            key: key.to_string(),
            body,
            content_type: content_type.to_string(),
            metadata,
        });
        Ok(())
    }
}
