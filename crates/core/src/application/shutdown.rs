// Shutdown signalling for background jobs

use tokio::sync::watch;

/// Receiving side of a shutdown signal
///
/// Cloneable; every clone observes the same signal. A dropped sender
/// counts as shutdown.
#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// True once shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolve when shutdown is requested (immediately if it already was)
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|requested| *requested).await;
    }
}

/// Sending side of a shutdown signal
pub struct ShutdownSender {
    tx: watch::Sender<bool>,
}

impl ShutdownSender {
    /// Request shutdown of every job holding a token
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }
}

/// Create a connected sender/token pair
pub fn shutdown_channel() -> (ShutdownSender, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSender { tx }, ShutdownToken { rx })
}
