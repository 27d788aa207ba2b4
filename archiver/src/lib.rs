pub mod archive;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod lifecycle;
pub mod metrics_defs;
pub mod poller;
pub mod queue;
pub mod store;
#[cfg(test)]
pub(crate) mod testutils;

use crate::archive::Archiver;
use crate::errors::RelayError;
use crate::lifecycle::Lifecycle;
use crate::poller::PollLoop;
use crate::queue::{QueueClient, SqsQueue};
use crate::store::{ObjectStore, S3Store};
use metrics_exporter_statsd::StatsdBuilder;
use std::sync::Arc;
use tracing::info;

pub use crate::config::Config;

/// Install a statsd recorder for the `metrics` facade. Must run before the
/// first metric is emitted; metrics recorded earlier are silently dropped.
pub fn install_statsd_recorder(config: &config::MetricsConfig) -> Result<(), RelayError> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some("archiver"))
        .map_err(|e| RelayError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| RelayError::Metrics(e.to_string()))?;

    Ok(())
}

/// Build the clients and drive the poll loop until a termination signal
/// requests a stop. Per-message failures never return through here; only
/// startup problems are fatal.
pub async fn run_async(config: Config) -> Result<(), RelayError> {
    shared::metrics_defs::register_metrics(metrics_defs::ALL_METRICS);

    let request_timeout = config.relay.request_timeout();
    let queue: Arc<dyn QueueClient> =
        Arc::new(SqsQueue::new(&config.queue, request_timeout).await);
    let store: Arc<dyn ObjectStore> = Arc::new(S3Store::new(&config.store, request_timeout).await);

    let lifecycle = Lifecycle::new();
    lifecycle.spawn_signal_listener();

    let archiver = Arc::new(Archiver::new(store, queue.clone()));
    info!(
        queue_url = %config.queue.url,
        bucket = %config.store.bucket,
        processor = archiver.processor_id(),
        "relay started"
    );

    let poll_loop = PollLoop::new(
        queue,
        archiver,
        lifecycle,
        config.relay.poll_interval(),
        config.queue.max_messages,
        config.queue.wait_time_secs,
    );
    poll_loop.run().await;

    info!("relay stopped cleanly");
    Ok(())
}
