/*!
 * Ordered application of novel list reorderings.
 *
 * Every submission is a complete new order for the novel list. Submissions
 * go through one command channel and are applied by a single consumer task
 * in submission order, so two reorders can never interleave. Each submitter
 * gets its own result; a failed batch is reported to its submitter and
 * dropped without retry.
 */

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, oneshot};

use crate::database::Repository;
use crate::errors::TranslationError;

const COMMAND_CAPACITY: usize = 64;

/// Storage that can rewrite the novel list order in one step
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn apply_order(&self, novel_ids: Vec<String>) -> Result<()>;
}

#[async_trait]
impl OrderStore for Repository {
    async fn apply_order(&self, novel_ids: Vec<String>) -> Result<()> {
        self.apply_novel_order(novel_ids).await
    }
}

enum ReorderCommand {
    Apply {
        novel_ids: Vec<String>,
        reply: oneshot::Sender<Result<(), TranslationError>>,
    },
    Shutdown,
}

/// Pending result of a submitted reorder
#[derive(Debug)]
pub struct ReorderTicket {
    reply_rx: oneshot::Receiver<Result<(), TranslationError>>,
}

impl ReorderTicket {
    /// Wait for the batch to be applied
    ///
    /// Resolves to `Cancelled` if the queue stopped before the batch ran.
    pub async fn wait(self) -> Result<(), TranslationError> {
        self.reply_rx.await.unwrap_or(Err(TranslationError::Cancelled))
    }
}

/// Handle to the reorder consumer; clones share the same queue
#[derive(Clone)]
pub struct ReorderQueue {
    inner: Arc<ReorderQueueInner>,
}

struct ReorderQueueInner {
    command_tx: mpsc::Sender<ReorderCommand>,
    stopping: Arc<AtomicBool>,
}

impl ReorderQueue {
    /// Spawn the consumer task on the current runtime
    pub fn start(store: Arc<dyn OrderStore>) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let stopping = Arc::new(AtomicBool::new(false));

        spawn_reorder_loop(store, command_rx, stopping.clone());

        Self {
            inner: Arc::new(ReorderQueueInner {
                command_tx,
                stopping,
            }),
        }
    }

    /// Queue a new order without waiting for it to be applied
    pub async fn enqueue(&self, novel_ids: Vec<String>) -> Result<ReorderTicket, TranslationError> {
        if self.inner.stopping.load(Ordering::SeqCst) {
            return Err(TranslationError::Cancelled);
        }
        let (reply, reply_rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(ReorderCommand::Apply { novel_ids, reply })
            .await
            .map_err(|_| TranslationError::Cancelled)?;
        Ok(ReorderTicket { reply_rx })
    }

    /// Queue a new order and wait for its result
    pub async fn submit(&self, novel_ids: Vec<String>) -> Result<(), TranslationError> {
        self.enqueue(novel_ids).await?.wait().await
    }

    /// Ask the consumer to stop before the next queued batch
    ///
    /// A batch already being applied still completes.
    pub fn stop(&self) {
        self.inner.stopping.store(true, Ordering::SeqCst);
        let _ = self.inner.command_tx.try_send(ReorderCommand::Shutdown);
    }

    /// Stop the consumer and wait until it has exited
    pub async fn shutdown(&self) {
        self.stop();
        self.inner.command_tx.closed().await;
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.command_tx.is_closed()
    }
}

impl Drop for ReorderQueue {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 {
            let _ = self.inner.command_tx.try_send(ReorderCommand::Shutdown);
        }
    }
}

fn spawn_reorder_loop(
    store: Arc<dyn OrderStore>,
    mut command_rx: mpsc::Receiver<ReorderCommand>,
    stopping: Arc<AtomicBool>,
) {
    tokio::spawn(async move {
        while let Some(command) = command_rx.recv().await {
            if stopping.load(Ordering::SeqCst) {
                break;
            }
            match command {
                ReorderCommand::Apply { novel_ids, reply } => {
                    let count = novel_ids.len();
                    let result = store
                        .apply_order(novel_ids)
                        .await
                        .map_err(TranslationError::repository);
                    match &result {
                        Ok(()) => debug!("Applied reorder of {} novels", count),
                        Err(e) => warn!("Dropping failed reorder batch: {}", e),
                    }
                    let _ = reply.send(result);
                }
                ReorderCommand::Shutdown => break,
            }
        }
        // Queued replies are dropped with the receiver, their tickets see Cancelled
        debug!("Reorder queue stopped");
    });
}
