use crate::metrics_defs;
use crate::queue::{QueueClient, QueueMessage};
use crate::store::ObjectStore;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

const KEY_PREFIX: &str = "messages/";
const CONTENT_TYPE_JSON: &str = "application/json";

/// Outcome of one processing attempt. A failed queue delete after a
/// successful write still counts as `Archived`; the archive exists and a
/// redelivery only produces an acceptable duplicate.
#[derive(Clone, Debug, PartialEq)]
pub enum MessageStatus {
    Archived { key: String },
    Failed { error: String },
}

/// The object derived from one queue message. Immutable once written; the
/// relay holds no reference to it after the put.
pub struct ArchiveRecord {
    pub key: String,
    pub body: Value,
    pub metadata: HashMap<String, String>,
}

impl ArchiveRecord {
    pub fn build(message: &QueueMessage, processor_id: &str, received_at: DateTime<Utc>) -> Self {
        let processed_at = received_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        let body = json!({
            "message_id": message.id,
            "received_at": processed_at,
            "payload": parse_payload(&message.body),
            "processor": processor_id,
            "attributes": message.attributes,
        });
        let metadata = HashMap::from([
            ("message-id".to_string(), message.id.clone()),
            ("processed-at".to_string(), processed_at),
            ("processor".to_string(), processor_id.to_string()),
        ]);

        ArchiveRecord {
            key: derive_key(received_at),
            body,
            metadata,
        }
    }
}

/// Archives one queue message as a JSON object and removes it from the
/// queue once the write is durable.
pub struct Archiver {
    store: Arc<dyn ObjectStore>,
    queue: Arc<dyn QueueClient>,
    processor_id: String,
}

impl Archiver {
    pub fn new(store: Arc<dyn ObjectStore>, queue: Arc<dyn QueueClient>) -> Self {
        Archiver {
            store,
            queue,
            processor_id: format!("archiver-{}", Uuid::new_v4()),
        }
    }

    pub fn processor_id(&self) -> &str {
        &self.processor_id
    }

    /// Write first, delete second. A message is only ever deleted after its
    /// archive write succeeded; a failed write leaves it on the queue for
    /// redelivery.
    pub async fn process(&self, message: QueueMessage) -> MessageStatus {
        let record = ArchiveRecord::build(&message, &self.processor_id, Utc::now());
        let body = match serde_json::to_vec(&record.body) {
            Ok(bytes) => bytes,
            // Unreachable for the record shape above, but not worth a panic.
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "could not serialize archive record");
                return MessageStatus::Failed {
                    error: e.to_string(),
                };
            }
        };

        if let Err(e) = self
            .store
            .put(&record.key, body, CONTENT_TYPE_JSON, record.metadata.clone())
            .await
        {
            warn!(
                message_id = %message.id,
                error = %e,
                "archive write failed, message stays queued"
            );
            return MessageStatus::Failed {
                error: e.to_string(),
            };
        }

        if let Err(e) = self.queue.delete(&message.receipt_handle).await {
            warn!(
                message_id = %message.id,
                key = %record.key,
                error = %e,
                "archived but not removed from queue, redelivery will duplicate the archive"
            );
            shared::counter!(metrics_defs::DELETE_FAILURES).increment(1);
        }

        MessageStatus::Archived { key: record.key }
    }
}

/// Keys sort chronologically by timestamp prefix; the uuid suffix keeps
/// concurrent writers collision-free without coordination. Colons are
/// replaced so keys stay URL- and filesystem-friendly.
fn derive_key(at: DateTime<Utc>) -> String {
    let stamp = at.format("%Y-%m-%dT%H-%M-%S%.3fZ");
    format!("{KEY_PREFIX}{stamp}-{}.json", Uuid::new_v4())
}

/// Best-effort JSON parse. A malformed body must never block archiving, so
/// it is wrapped verbatim as a JSON string instead.
fn parse_payload(raw: &str) -> Value {
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "payload is not valid JSON, archiving it verbatim");
            Value::String(raw.to_string())
        }
    }
}
