use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, Semaphore};
use tracing::debug;

/// Concurrency-bounded job queue.
///
/// Jobs are admitted in submission (FIFO) order and at most
/// `max_concurrency` run at once; completion order is whatever the network
/// makes of it. Every job runs in its own task, so a panicking job releases
/// its slot and never stops the queue from draining.
///
/// Dropping the queue lets already-submitted jobs finish but accepts no more.
pub struct JobQueue {
    tx: mpsc::UnboundedSender<BoxFuture<'static, ()>>,
}

impl JobQueue {
    pub fn new(max_concurrency: usize) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<BoxFuture<'static, ()>>();
        let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));

        // Dispatcher: pulls jobs in channel order, waits for a free slot,
        // then hands the job its own task. Exits when all senders are gone.
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    break;
                };
                tokio::spawn(async move {
                    job.await;
                    drop(permit);
                });
            }
            debug!("Job queue dispatcher shutting down");
        });

        Self { tx }
    }

    /// Enqueue a job. Fire-and-forget: the caller gets no completion handle.
    pub fn submit<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // Send fails only after the dispatcher task is gone, i.e. the
        // runtime is shutting down; the job is dropped with it.
        let _ = self.tx.send(job.boxed());
    }
}
