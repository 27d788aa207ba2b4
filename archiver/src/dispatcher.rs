use crate::archive::{Archiver, MessageStatus};
use crate::metrics_defs;
use crate::queue::QueueMessage;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// Per-cycle record of every message's result. Only used for the cycle
/// summary log and metrics; never persisted.
#[derive(Debug)]
pub struct BatchOutcome {
    pub results: Vec<MessageResult>,
}

#[derive(Debug)]
pub struct MessageResult {
    pub message_id: String,
    pub status: MessageStatus,
}

impl BatchOutcome {
    pub fn archived_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.status, MessageStatus::Archived { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.archived_count()
    }
}

/// Process a whole batch concurrently and wait for every attempt to finish.
///
/// One slow or failing message must not stall or abort its siblings, so
/// there is no short-circuit: every spawned task runs to completion and
/// contributes a result.
pub async fn dispatch(archiver: &Arc<Archiver>, batch: Vec<QueueMessage>) -> BatchOutcome {
    let started = Instant::now();
    let mut join_set = JoinSet::new();

    for message in batch {
        let archiver = Arc::clone(archiver);
        join_set.spawn(async move {
            let message_id = message.id.clone();
            let status = archiver.process(message).await;
            MessageResult { message_id, status }
        });
    }

    let mut results = Vec::new();
    while let Some(join_result) = join_set.join_next().await {
        match join_result {
            Ok(result) => results.push(result),
            Err(e) => tracing::error!("Processing task panicked: {e}"),
        }
    }

    shared::histogram!(metrics_defs::DISPATCH_DURATION).record(started.elapsed().as_secs_f64());

    BatchOutcome { results }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{InMemoryQueue, InMemoryStore, message};

    #[tokio::test]
    async fn empty_batch_yields_empty_outcome() {
        let queue = Arc::new(InMemoryQueue::default());
        let store = Arc::new(InMemoryStore::default());
        let archiver = Arc::new(Archiver::new(store.clone(), queue));

        let outcome = dispatch(&archiver, Vec::new()).await;

        assert!(outcome.results.is_empty());
        assert!(store.objects().is_empty());
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_siblings() {
        let queue = Arc::new(InMemoryQueue::default());
        let store = Arc::new(InMemoryStore::default());
        store.fail_for_message("m-2");
        let archiver = Arc::new(Archiver::new(store.clone(), queue.clone()));

        let batch = vec![
            message("m-1", "one"),
            message("m-2", "two"),
            message("m-3", "three"),
        ];
        let outcome = dispatch(&archiver, batch).await;

        assert_eq!(outcome.results.len(), 3);
        assert_eq!(outcome.archived_count(), 2);
        assert_eq!(outcome.failed_count(), 1);

        let failed: Vec<&str> = outcome
            .results
            .iter()
            .filter(|r| matches!(r.status, MessageStatus::Failed { .. }))
            .map(|r| r.message_id.as_str())
            .collect();
        assert_eq!(failed, vec!["m-2"]);

        // m-1 and m-3 archived and deleted; m-2 left on the queue.
        assert_eq!(store.objects().len(), 2);
        let mut deleted = queue.deleted_handles();
        deleted.sort();
        assert_eq!(deleted, vec!["rh-m-1".to_string(), "rh-m-3".to_string()]);
    }

    #[tokio::test]
    async fn all_messages_get_a_result() {
        let queue = Arc::new(InMemoryQueue::default());
        let store = Arc::new(InMemoryStore::default());
        let archiver = Arc::new(Archiver::new(store.clone(), queue));

        let batch: Vec<_> = (0..10)
            .map(|i| message(&format!("m-{i}"), &format!(r#"{{"n":{i}}}"#)))
            .collect();
        let outcome = dispatch(&archiver, batch).await;

        assert_eq!(outcome.results.len(), 10);
        assert_eq!(outcome.archived_count(), 10);
        assert_eq!(store.objects().len(), 10);
    }
}
