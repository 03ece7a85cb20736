//! Signal handling for graceful shutdown

use std::future::Future;

use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, error};

/// Handles shutdown signals (SIGTERM, SIGINT)
pub struct ShutdownSignal;

impl ShutdownSignal {
    /// Create a new shutdown signal handler
    pub fn new() -> Self {
        Self
    }

    /// Wait for a shutdown signal
    ///
    /// Fails only if the handlers cannot be registered.
    pub async fn wait(&self) -> std::io::Result<()> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                debug!("received SIGTERM");
            }
            _ = sigint.recv() => {
                debug!("received SIGINT");
            }
        }

        Ok(())
    }

    /// Wait for a shutdown signal, never completing if handlers cannot be
    /// registered; the app then runs until another exit path fires
    pub async fn wait_or_pending(&self) {
        settle(self.wait()).await
    }
}

async fn settle(wait: impl Future<Output = std::io::Result<()>>) {
    if let Err(e) = wait.await {
        error!(?e, "failed to register shutdown signal handlers");
        std::future::pending::<()>().await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
