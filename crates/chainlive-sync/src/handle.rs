//! Single-writer store handle.
//!
//! [`spawn_store`] moves a [`Reducer`] into its own task. Commands go in
//! over an unbounded `mpsc` channel and are applied strictly in order;
//! after each command that changed state, a fresh `Arc<State>` snapshot is
//! published on a `watch` channel for readers.
//!
//! The command queue is unbounded so that [`StoreHandle::send`] never
//! blocks and never drops a subscription message. Its depth is bounded by
//! how far the feed runs ahead of a writer whose commands are O(capacity)
//! in-memory updates. Producers that need to throttle call
//! [`StoreHandle::flush`] to wait for the writer to catch up, and
//! [`StoreHandle::queued`] reports the current backlog.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use chainlive_store::Reducer;

use crate::error::SyncError;

enum Envelope<C> {
    Apply(C),
    Flush(oneshot::Sender<()>),
}

/// Cloneable handle to a store running in its own writer task.
pub struct StoreHandle<R: Reducer> {
    commands: mpsc::UnboundedSender<Envelope<R::Command>>,
    snapshots: watch::Receiver<Arc<R::State>>,
    backlog: Arc<AtomicUsize>,
}

impl<R: Reducer> Clone for StoreHandle<R> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            snapshots: self.snapshots.clone(),
            backlog: self.backlog.clone(),
        }
    }
}

/// Start the writer task for `reducer`.
///
/// The task stops once every handle is dropped and hands the reducer back
/// through the returned `JoinHandle`.
pub fn spawn_store<R: Reducer>(mut reducer: R) -> (StoreHandle<R>, JoinHandle<R>) {
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Envelope<R::Command>>();
    let (snap_tx, snap_rx) = watch::channel(Arc::new(reducer.state().clone()));
    let backlog = Arc::new(AtomicUsize::new(0));
    let taken = backlog.clone();

    let task = tokio::spawn(async move {
        while let Some(envelope) = cmd_rx.recv().await {
            match envelope {
                Envelope::Apply(command) => {
                    taken.fetch_sub(1, Ordering::AcqRel);
                    tracing::trace!(?command, "applying store command");
                    if reducer.apply(command) {
                        snap_tx.send_replace(Arc::new(reducer.state().clone()));
                    }
                }
                Envelope::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        tracing::debug!("store writer stopped");
        reducer
    });

    (
        StoreHandle {
            commands: cmd_tx,
            snapshots: snap_rx,
            backlog,
        },
        task,
    )
}

impl<R: Reducer> StoreHandle<R> {
    /// Queue a command. Never blocks.
    pub fn send(&self, command: R::Command) -> Result<(), SyncError> {
        self.backlog.fetch_add(1, Ordering::AcqRel);
        self.commands.send(Envelope::Apply(command)).map_err(|_| {
            self.backlog.fetch_sub(1, Ordering::AcqRel);
            SyncError::StoreClosed
        })
    }

    /// Commands sent but not yet taken by the writer.
    pub fn queued(&self) -> usize {
        self.backlog.load(Ordering::Acquire)
    }

    /// Wait until every command sent before this call has been applied.
    pub async fn flush(&self) -> Result<(), SyncError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Envelope::Flush(tx))
            .map_err(|_| SyncError::StoreClosed)?;
        rx.await.map_err(|_| SyncError::StoreClosed)
    }

    /// The most recently published state.
    pub fn snapshot(&self) -> Arc<R::State> {
        self.snapshots.borrow().clone()
    }

    /// Wait for the next published state and return it.
    ///
    /// Each handle tracks what it has already seen, so clones wait independently.
    pub async fn changed(&mut self) -> Result<Arc<R::State>, SyncError> {
        self.snapshots
            .changed()
            .await
            .map_err(|_| SyncError::StoreClosed)?;
        Ok(self.snapshots.borrow_and_update().clone())
    }

    /// A receiver that wakes on every published state.
    pub fn subscribe(&self) -> watch::Receiver<Arc<R::State>> {
        self.snapshots.clone()
    }
}
