//! # Bounded Task Queue
//!
//! Admission control for requests against shared remote resources. The chain node
//! starts answering with internal lookup errors ("missing trie node") once too many
//! queries are in flight, so every stage pushes its remote calls through a
//! [`BoundedQueue`] with its own ceiling instead of fanning out freely.
//!
//! ## Core Components
//!
//! - [`TaskUnit`]: a labelled, re-runnable async operation with a retry budget.
//! - [`BoundedQueue`]: runs queued units with at most `limit` in flight, re-queues
//!   failed units while they have retries left, and resolves to a [`QueueReport`]
//!   once every unit has settled.
//! - [`QueueHandle`]: a clonable sender for adding units while the queue is consuming.
//!
//! All in-flight operations are polled by the task that awaits [`BoundedQueue::consume`];
//! nothing is spawned. Admission is FIFO among pending units; completion order is not.

use futures::{future::BoxFuture, stream::FuturesUnordered, StreamExt};
use std::{collections::VecDeque, fmt, future::Future};
use tokio::sync::mpsc::{self, error::TryRecvError};

type Operation<T> = Box<dyn Fn() -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;
type FinishCallback<T> = Box<dyn FnOnce(&QueueReport<T>) + Send>;

/// A deferred unit of asynchronous work.
///
/// The wrapped operation takes no arguments; it captures whatever context it needs.
/// Every call to [`run`](TaskUnit::run) executes it again from scratch, so side
/// effects of a failed attempt are repeated on retry.
pub struct TaskUnit<T> {
    label: String,
    operation: Operation<T>,
    retries_remaining: usize,
    attempts: usize,
}

impl<T> TaskUnit<T> {
    pub fn new<F, Fut>(label: impl Into<String>, operation: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            label: label.into(),
            operation: Box::new(move || Box::pin(operation())),
            retries_remaining: 0,
            attempts: 0,
        }
    }

    /// Sets the retry budget used by [`settle`](TaskUnit::settle).
    ///
    /// A queue overrides this with its own toleration when the unit is added.
    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries_remaining = retries;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of times the operation has been started.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn retries_remaining(&self) -> usize {
        self.retries_remaining
    }

    /// Starts one attempt of the operation.
    pub fn run(&mut self) -> BoxFuture<'static, anyhow::Result<T>> {
        self.attempts += 1;
        (self.operation)()
    }

    /// Runs the operation to a terminal outcome on the current task, retrying
    /// failures while the budget lasts.
    pub async fn settle(&mut self) -> anyhow::Result<T> {
        loop {
            match self.run().await {
                Ok(value) => return Ok(value),
                Err(error) if self.retries_remaining > 0 => {
                    self.retries_remaining -= 1;
                    tracing::debug!(
                        task = %self.label,
                        attempt = self.attempts,
                        "Attempt failed, retrying: {:#}",
                        error
                    );
                }
                Err(error) => return Err(error),
            }
        }
    }
}

impl<T> fmt::Debug for TaskUnit<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskUnit")
            .field("label", &self.label)
            .field("retries_remaining", &self.retries_remaining)
            .field("attempts", &self.attempts)
            .finish()
    }
}

/// A unit that exhausted its retries.
#[derive(Debug)]
pub struct TaskFailure {
    pub label: String,
    pub attempts: usize,
    pub error: anyhow::Error,
}

/// Aggregate outcome of one queue.
#[derive(Debug)]
pub struct QueueReport<T> {
    /// Successful results, in completion order.
    pub outputs: Vec<T>,
    pub failures: Vec<TaskFailure>,
    /// Number of distinct units admitted (retries are not counted twice).
    pub total: usize,
    /// Highest number of operations that were in flight at once.
    pub peak_in_flight: usize,
}

impl<T> QueueReport<T> {
    fn new() -> Self {
        Self {
            outputs: Vec::new(),
            failures: Vec::new(),
            total: 0,
            peak_in_flight: 0,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.outputs.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn settled(&self) -> usize {
        self.succeeded() + self.failed()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A clonable handle for adding units to a queue, including while it is consuming.
///
/// A consuming queue only finishes once every handle has been dropped.
pub struct QueueHandle<T> {
    intake: mpsc::UnboundedSender<TaskUnit<T>>,
}

impl<T> Clone for QueueHandle<T> {
    fn clone(&self) -> Self {
        Self {
            intake: self.intake.clone(),
        }
    }
}

impl<T> QueueHandle<T> {
    /// Queues a unit. Returns `false` if the queue has already finished.
    pub fn add(&self, task: TaskUnit<T>) -> bool {
        self.intake.send(task).is_ok()
    }
}

/// Runs [`TaskUnit`]s under a concurrency ceiling and a per-unit retry budget.
pub struct BoundedQueue<T> {
    name: String,
    limit: usize,
    toleration: usize,
    pending: VecDeque<TaskUnit<T>>,
    total: usize,
    intake_tx: mpsc::UnboundedSender<TaskUnit<T>>,
    intake_rx: mpsc::UnboundedReceiver<TaskUnit<T>>,
    on_finished: Option<FinishCallback<T>>,
}

impl<T: Send + 'static> BoundedQueue<T> {
    /// Creates an empty queue.
    ///
    /// # Arguments
    ///
    /// * `name` - Used in log lines.
    /// * `limit` - Maximum number of units in flight; values below 1 are raised to 1.
    /// * `toleration` - Extra attempts granted to each unit after its first failure.
    pub fn new(name: impl Into<String>, limit: usize, toleration: usize) -> Self {
        let (intake_tx, intake_rx) = mpsc::unbounded_channel();
        Self {
            name: name.into(),
            limit: limit.max(1),
            toleration,
            pending: VecDeque::new(),
            total: 0,
            intake_tx,
            intake_rx,
            on_finished: None,
        }
    }

    /// Registers a callback invoked exactly once, after every unit is terminal.
    pub fn on_finished(mut self, callback: impl FnOnce(&QueueReport<T>) + Send + 'static) -> Self {
        self.on_finished = Some(Box::new(callback));
        self
    }

    pub fn handle(&self) -> QueueHandle<T> {
        QueueHandle {
            intake: self.intake_tx.clone(),
        }
    }

    pub fn add(&mut self, task: TaskUnit<T>) {
        self.total += 1;
        self.pending.push_back(self.prepare(task));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn prepare(&self, task: TaskUnit<T>) -> TaskUnit<T> {
        task.with_retries(self.toleration)
    }

    /// Admits and drives units until all of them have settled.
    ///
    /// Resolves once the pending FIFO is empty, nothing is in flight and no
    /// [`QueueHandle`] is left that could add more work.
    pub async fn consume(mut self) -> QueueReport<T> {
        let mut report = QueueReport::new();
        let mut in_flight = FuturesUnordered::new();
        let mut intake_open = true;

        // From here on only outstanding handles keep the intake open.
        let (closed_tx, _) = mpsc::unbounded_channel();
        drop(std::mem::replace(&mut self.intake_tx, closed_tx));

        loop {
            if intake_open {
                intake_open = self.drain_intake();
            }

            while in_flight.len() < self.limit {
                let Some(task) = self.pending.pop_front() else {
                    break;
                };
                in_flight.push(launch(task));
            }
            report.peak_in_flight = report.peak_in_flight.max(in_flight.len());

            if in_flight.is_empty() {
                if !intake_open {
                    break;
                }
                match self.intake_rx.recv().await {
                    Some(task) => self.add(task),
                    None => intake_open = false,
                }
                continue;
            }

            tokio::select! {
                Some((task, outcome)) = in_flight.next() => {
                    self.settle_attempt(task, outcome, &mut report);
                }
                received = self.intake_rx.recv(), if intake_open => match received {
                    Some(task) => self.add(task),
                    None => intake_open = false,
                },
            }
        }

        report.total = self.total;
        tracing::debug!(
            queue = %self.name,
            total = report.total,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Queue drained."
        );
        if let Some(callback) = self.on_finished.take() {
            callback(&report);
        }
        report
    }

    /// Moves everything sent through handles into the pending FIFO.
    /// Returns `false` once every handle is gone.
    fn drain_intake(&mut self) -> bool {
        loop {
            match self.intake_rx.try_recv() {
                Ok(task) => self.add(task),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn settle_attempt(
        &mut self,
        mut task: TaskUnit<T>,
        outcome: anyhow::Result<T>,
        report: &mut QueueReport<T>,
    ) {
        match outcome {
            Ok(value) => report.outputs.push(value),
            Err(error) if task.retries_remaining > 0 => {
                task.retries_remaining -= 1;
                tracing::debug!(
                    queue = %self.name,
                    task = %task.label,
                    attempt = task.attempts,
                    "Task failed, re-queued: {:#}",
                    error
                );
                self.pending.push_back(task);
            }
            Err(error) => {
                tracing::warn!(
                    queue = %self.name,
                    task = %task.label,
                    attempts = task.attempts,
                    "Task failed permanently: {:#}",
                    error
                );
                report.failures.push(TaskFailure {
                    label: task.label,
                    attempts: task.attempts,
                    error,
                });
            }
        }
    }
}

fn launch<T: Send + 'static>(
    mut task: TaskUnit<T>,
) -> BoxFuture<'static, (TaskUnit<T>, anyhow::Result<T>)> {
    Box::pin(async move {
        let outcome = task.run().await;
        (task, outcome)
    })
}
