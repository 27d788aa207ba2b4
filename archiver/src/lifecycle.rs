use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::{error, info};

/// Process-wide run state. The flag only ever transitions from running to
/// stop-requested, so a single atomic plus a notify is all the coordination
/// the poll loop needs.
#[derive(Clone)]
pub struct Lifecycle {
    inner: Arc<Inner>,
}

struct Inner {
    stop: AtomicBool,
    notify: Notify,
}

impl Lifecycle {
    pub fn new() -> Self {
        Lifecycle {
            inner: Arc::new(Inner {
                stop: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    pub fn request_stop(&self) {
        if !self.inner.stop.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_stop_requested(&self) -> bool {
        self.inner.stop.load(Ordering::SeqCst)
    }

    /// Completes once a stop has been requested, immediately if it already
    /// was.
    pub async fn stopped(&self) {
        // Register before checking the flag so a concurrent request_stop
        // cannot slip between the check and the wait.
        let notified = self.inner.notify.notified();
        if self.is_stop_requested() {
            return;
        }
        notified.await;
    }

    /// Converts SIGTERM/SIGINT into a cooperative stop request. In-flight
    /// work is never interrupted; the poll loop observes the flag at its
    /// next state boundary.
    pub fn spawn_signal_listener(&self) {
        let lifecycle = self.clone();
        tokio::spawn(async move {
            wait_for_termination().await;
            info!("termination signal received, stopping after the current batch");
            lifecycle.request_stop();
        });
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            error!("could not register SIGTERM handler: {e}");
            wait_for_ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {}
        _ = wait_for_ctrl_c() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("could not listen for ctrl-c: {e}");
        // With no signal stream there is nothing left to wait for.
        std::future::pending::<()>().await;
    }
}
