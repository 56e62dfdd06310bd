use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::warn;

/// Coarse hit-test result for a pointer press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    NotificationBell,
    NotificationDropdown,
    Elsewhere,
}

impl Region {
    /// Presses inside the bell or the open dropdown do not count as outside
    /// clicks.
    pub fn is_notifications(self) -> bool {
        matches!(self, Self::NotificationBell | Self::NotificationDropdown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerDown {
    pub region: Region,
}

/// Page-wide event bus. Every subscriber sees every pointer press.
#[derive(Clone)]
pub struct Document {
    inner: Arc<DocumentInner>,
}

struct DocumentInner {
    pointer_tx: broadcast::Sender<PointerDown>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let (pointer_tx, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(DocumentInner { pointer_tx }),
        }
    }

    /// Dispatch a press to all registered listeners. Returns how many saw it.
    pub fn pointer_down(&self, region: Region) -> usize {
        self.inner.pointer_tx.send(PointerDown { region }).unwrap_or(0)
    }

    /// Register a listener. It is deregistered when dropped.
    pub fn subscribe(&self) -> ClickListener {
        ClickListener {
            rx: self.inner.pointer_tx.subscribe(),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.pointer_tx.receiver_count()
    }
}

pub struct ClickListener {
    rx: broadcast::Receiver<PointerDown>,
}

impl ClickListener {
    /// Next queued press, if any. Skips over presses lost to lag.
    pub fn try_next(&mut self) -> Option<PointerDown> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(n)) => warn!("Click listener lagged, skipped {} events", n),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Wait for the next press. `None` once the document is gone.
    pub async fn recv(&mut self) -> Option<PointerDown> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(n)) => warn!("Click listener lagged, skipped {} events", n),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Drain everything queued and report whether any press landed outside
    /// the notifications region.
    pub fn drain_outside(&mut self) -> bool {
        let mut outside = false;
        while let Some(event) = self.try_next() {
            outside |= !event.region.is_notifications();
        }
        outside
    }
}
