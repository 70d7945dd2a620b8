use crate::commands::ViewCommand;
use crate::snapshot::ViewSnapshot;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Cloneable front end for one view actor.
#[derive(Clone)]
pub struct ViewHandle {
    tx: mpsc::Sender<ViewCommand>,
    snapshot_rx: watch::Receiver<Arc<ViewSnapshot>>,
}

impl ViewHandle {
    #[must_use]
    pub const fn new(
        tx: mpsc::Sender<ViewCommand>,
        snapshot_rx: watch::Receiver<Arc<ViewSnapshot>>,
    ) -> Self {
        Self { tx, snapshot_rx }
    }

    /// Requests an immediate refresh cycle. Suppressed by the actor if one
    /// is already in flight.
    ///
    /// # Errors
    /// Returns an error if the command cannot be sent to the view actor.
    pub async fn refresh(&self) -> Result<()> {
        self.tx.send(ViewCommand::Refresh).await?;
        Ok(())
    }

    /// Fetches the current snapshot through the actor.
    ///
    /// # Errors
    /// Returns an error if the command cannot be sent or the response cannot
    /// be received.
    pub async fn snapshot(&self) -> Result<Arc<ViewSnapshot>> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(ViewCommand::GetSnapshot(tx)).await?;
        let snapshot = rx.await?;
        Ok(snapshot)
    }

    /// The latest published snapshot, without going through the actor.
    #[must_use]
    pub fn current(&self) -> Arc<ViewSnapshot> {
        Arc::clone(&self.snapshot_rx.borrow())
    }

    /// A receiver that observes every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<ViewSnapshot>> {
        self.snapshot_rx.clone()
    }

    /// Stops the view's timer and actor; any in-flight fetch result is
    /// discarded on arrival.
    ///
    /// # Errors
    /// Returns an error if the command cannot be sent to the view actor.
    pub async fn shutdown(&self) -> Result<()> {
        self.tx.send(ViewCommand::Shutdown).await?;
        Ok(())
    }
}
