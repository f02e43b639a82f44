//! Provides a shutdown signal to gracefully stop the webhook server.
//!
//! See: [`signal`], [`stop`]

#![cfg(feature = "shutdown")]

use crate::static_lazy_lock;

use tokio::{signal, sync::broadcast};
use tracing::{error, info};

static_lazy_lock! {
    /// The broadcast sender to shut down the process.
    pub SHUTDOWN: broadcast::Sender<()> = {
        let (tx, _) = broadcast::channel::<()>(1);
        tx
    };
}

/// Resolves once the process is asked to stop, either by Ctrl + C or by [`stop`].
///
/// If the Ctrl + C handler cannot be installed, only [`stop`] ends the wait.
pub async fn signal() {
    let mut shutdown = SHUTDOWN.subscribe();

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to install Ctrl + C signal handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl + C, shutting down…"),
        _ = shutdown.recv() => info!("shutdown requested, shutting down…"),
    }
}

/// Asks every pending [`signal`] to resolve.
pub fn stop() {
    // No receivers means nothing is waiting, which is fine.
    drop(SHUTDOWN.send(()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn stop_resolves_pending_signal() {
        let waiting = tokio::spawn(signal());
        // Let the waiter subscribe before stopping
        tokio::task::yield_now().await;
        while SHUTDOWN.receiver_count() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        stop();

        tokio::time::timeout(Duration::from_secs(5), waiting)
            .await
            .unwrap()
            .unwrap();
    }
}
