//! Shared job queue and result buffer.
//!
//! [`JobQueue`] composes two independently locked containers: the pending
//! FIFO of [`Job`]s fed by the RPC gateway and drained by the dispatcher, and
//! the buffer of translated lines filled by workers and drained by polling
//! clients. Each container is guarded by its own [`Mutex`] covering the whole
//! read-modify-write sequence.

use crate::{Error, Job, Result};
use core::sync::atomic::{AtomicBool, Ordering};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;

#[derive(Default)]
pub struct JobQueue {
    pending: Mutex<VecDeque<Job>>,
    results: Mutex<Vec<String>>,
    job_ready: Notify,
    closed: AtomicBool,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a job to the back of the pending FIFO without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueClosed`] once [`JobQueue::close`] has been called.
    pub fn enqueue(&self, job: Job) -> Result<()> {
        if self.is_closed() {
            return Err(Error::QueueClosed);
        }
        self.pending.lock().push_back(job);
        self.job_ready.notify_one();
        Ok(())
    }

    /// Non-blocking check for pending jobs.
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    pub fn pending_jobs(&self) -> usize {
        self.pending.lock().len()
    }

    /// Pops the oldest pending job without waiting.
    pub fn try_dequeue(&self) -> Option<Job> {
        self.pending.lock().pop_front()
    }

    /// Waits for and pops the oldest pending job.
    ///
    /// Jobs still pending when the queue is closed are handed out before the
    /// closed state is reported.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueClosed`] once the queue is closed and empty.
    pub async fn dequeue(&self) -> Result<Job> {
        loop {
            // Register interest before checking so a concurrent enqueue between
            // the check and the await is not missed.
            let notified = self.job_ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(job) = self.try_dequeue() {
                return Ok(job);
            }
            if self.is_closed() {
                return Err(Error::QueueClosed);
            }

            notified.await;
        }
    }

    /// Appends one translated line to the result buffer.
    pub fn record_result(&self, text: String) {
        self.results.lock().push(text);
    }

    /// Atomically removes and returns every buffered result. Returns an empty
    /// vector when nothing is ready.
    pub fn drain_results(&self) -> Vec<String> {
        core::mem::take(&mut *self.results.lock())
    }

    pub fn pending_result_count(&self) -> usize {
        self.results.lock().len()
    }

    /// Tears the queue down: further [`enqueue`](Self::enqueue) calls fail and
    /// waiting [`dequeue`](Self::dequeue) calls return once the backlog is
    /// empty. Buffered results stay drainable. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.job_ready.notify_waiters();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
