use crate::archive::Archiver;
use crate::dispatcher::dispatch;
use crate::lifecycle::Lifecycle;
use crate::metrics_defs;
use crate::queue::{QueueClient, QueueMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Poll loop states. The loop is an infinite
/// `Polling -> Dispatching -> Sleeping` cycle with a single exit into
/// `Stopped`; modelling it explicitly lets tests step transitions without
/// running a process.
#[derive(Debug)]
pub enum State {
    Idle,
    Polling,
    Dispatching(Vec<QueueMessage>),
    Sleeping,
    Stopped,
}

/// Drives receive/dispatch cycles on a fixed cadence until the lifecycle
/// requests a stop.
pub struct PollLoop {
    queue: Arc<dyn QueueClient>,
    archiver: Arc<Archiver>,
    lifecycle: Lifecycle,
    poll_interval: Duration,
    max_messages: i32,
    wait_time_secs: i32,
}

impl PollLoop {
    pub fn new(
        queue: Arc<dyn QueueClient>,
        archiver: Arc<Archiver>,
        lifecycle: Lifecycle,
        poll_interval: Duration,
        max_messages: i32,
        wait_time_secs: i32,
    ) -> Self {
        PollLoop {
            queue,
            archiver,
            lifecycle,
            poll_interval,
            max_messages,
            wait_time_secs,
        }
    }

    /// Take one state transition. Receive failures and empty batches both
    /// land in `Sleeping`; nothing short of a stop request leaves the cycle.
    pub async fn advance(&self, state: State) -> State {
        match state {
            State::Idle => State::Polling,

            State::Polling => {
                if self.lifecycle.is_stop_requested() {
                    return State::Stopped;
                }
                shared::counter!(metrics_defs::POLL_CYCLES).increment(1);
                match self
                    .queue
                    .receive(self.max_messages, self.wait_time_secs)
                    .await
                {
                    Ok(batch) if batch.is_empty() => {
                        debug!("queue empty, sleeping");
                        shared::counter!(metrics_defs::POLL_EMPTY).increment(1);
                        State::Sleeping
                    }
                    Ok(batch) => State::Dispatching(batch),
                    Err(e) => {
                        warn!(error = %e, "receive failed, sleeping before retry");
                        shared::counter!(metrics_defs::RECEIVE_ERRORS).increment(1);
                        State::Sleeping
                    }
                }
            }

            State::Dispatching(batch) => {
                let batch_size = batch.len();
                let outcome = dispatch(&self.archiver, batch).await;
                let archived = outcome.archived_count();
                let failed = outcome.failed_count();
                info!(batch_size, archived, failed, "poll cycle dispatched");
                shared::counter!(metrics_defs::MESSAGES_ARCHIVED).increment(archived as u64);
                shared::counter!(metrics_defs::MESSAGES_FAILED).increment(failed as u64);
                State::Sleeping
            }

            State::Sleeping => {
                tokio::select! {
                    _ = sleep(self.poll_interval) => {}
                    _ = self.lifecycle.stopped() => {}
                }
                if self.lifecycle.is_stop_requested() {
                    State::Stopped
                } else {
                    State::Polling
                }
            }

            State::Stopped => State::Stopped,
        }
    }

    pub async fn run(&self) {
        let mut state = State::Idle;
        while !matches!(state, State::Stopped) {
            state = self.advance(state).await;
        }
        info!("poll loop stopped");
    }
}
