//! Process-wide cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// Sending side of the stop notification. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
    tx: broadcast::Sender<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel::<()>(1);
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            tx,
        }
    }

    /// Ask every listener to stop. Idempotent.
    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            // Fails only when nobody is listening yet; the flag covers late subscribers
            let _ = self.tx.send(());
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            triggered: self.triggered.clone(),
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side held by each task.
#[derive(Debug)]
pub struct ShutdownListener {
    triggered: Arc<AtomicBool>,
    rx: broadcast::Receiver<()>,
}

impl ShutdownListener {
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolve once the signal has fired. Cancel-safe.
    pub async fn recv(&mut self) {
        if self.is_triggered() {
            return;
        }
        // Lagged or closed both mean the sender is done with us
        let _ = self.rx.recv().await;
    }
}
