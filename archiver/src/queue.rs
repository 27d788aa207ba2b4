use crate::config::QueueConfig;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_sqs::config::Region;
use aws_sdk_sqs::types::MessageSystemAttributeName;
use std::collections::HashMap;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum QueueError {
    #[error("receive failed: {0}")]
    Receive(String),

    #[error("delete failed: {0}")]
    Delete(String),
}

/// One received message instance. The receipt handle is only valid for the
/// queue's visibility window; a message that is not deleted in time is
/// redelivered with a fresh handle.
#[derive(Clone, Debug, PartialEq)]
pub struct QueueMessage {
    pub id: String,
    pub body: String,
    pub receipt_handle: String,
    pub attributes: HashMap<String, String>,
}

/// Receive/delete contract against the remote queue.
///
/// An empty batch from `receive` means the long poll timed out without
/// messages and is not an error. All calls are independent, so one client
/// can serve any number of in-flight processing tasks.
#[async_trait]
pub trait QueueClient: Send + Sync {
    async fn receive(
        &self,
        max_messages: i32,
        wait_secs: i32,
    ) -> Result<Vec<QueueMessage>, QueueError>;

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError>;
}

pub struct SqsQueue {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl SqsQueue {
    pub async fn new(config: &QueueConfig, request_timeout: Duration) -> Self {
        // The operation timeout has to outlast the server-side long-poll
        // wait, otherwise every quiet receive would count as a failure.
        let long_poll = Duration::from_secs(config.wait_time_secs.max(0) as u64);
        let timeouts = TimeoutConfig::builder()
            .operation_timeout(request_timeout + long_poll)
            .build();

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).timeout_config(timeouts);
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        SqsQueue {
            client: aws_sdk_sqs::Client::new(&sdk_config),
            queue_url: config.url.clone(),
        }
    }
}

#[async_trait]
impl QueueClient for SqsQueue {
    async fn receive(
        &self,
        max_messages: i32,
        wait_secs: i32,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_secs)
            // Both attribute classes travel into the archive record.
            .message_system_attribute_names(MessageSystemAttributeName::All)
            .message_attribute_names("All")
            .send()
            .await
            .map_err(|e| QueueError::Receive(e.to_string()))?;

        Ok(output
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(QueueMessage::from)
            .collect())
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| QueueError::Delete(e.to_string()))?;
        Ok(())
    }
}

impl From<aws_sdk_sqs::types::Message> for QueueMessage {
    fn from(msg: aws_sdk_sqs::types::Message) -> Self {
        let mut attributes = HashMap::new();
        if let Some(attrs) = msg.attributes() {
            for (key, value) in attrs {
                attributes.insert(key.as_str().to_string(), value.clone());
            }
        }
        // Sender-supplied message attributes share the map; their names
        // cannot collide with the reserved system attribute names.
        if let Some(attrs) = msg.message_attributes() {
            for (key, value) in attrs {
                if let Some(string_value) = value.string_value() {
                    attributes.insert(key.clone(), string_value.to_string());
                }
            }
        }

        QueueMessage {
            id: msg.message_id().unwrap_or_default().to_string(),
            body: msg.body().unwrap_or_default().to_string(),
            receipt_handle: msg.receipt_handle().unwrap_or_default().to_string(),
            attributes,
        }
    }
}
