//! Graceful shutdown coordinator. Narrowed from
//! `rustpress_server::shutdown::ShutdownController` /
//! `listen_for_shutdown_signals` — same broadcast-channel signal, generalized
//! to gate a consume loop or a tick loop instead of an HTTP accept loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct ShutdownController {
    sender: broadcast::Sender<()>,
    is_shutting_down: Arc<AtomicBool>,
    timeout: Duration,
}

impl ShutdownController {
    /// `timeout` bounds how long a `run()` loop elsewhere gives its
    /// in-flight work to drain once shutdown fires (spec §7).
    pub fn new(timeout: Duration) -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender,
            is_shutting_down: Arc::new(AtomicBool::new(false)),
            timeout,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn shutdown(&self) {
        if self
            .is_shutting_down
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            tracing::info!("initiating graceful shutdown");
            let _ = self.sender.send(());
        }
    }
}

/// Wait for SIGINT or SIGTERM, then signal shutdown.
pub async fn listen_for_shutdown_signals(controller: ShutdownController) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }

    controller.shutdown();
}
