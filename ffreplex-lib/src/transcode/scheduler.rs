//! Round-robin batch scheduler
//!
//! Jobs are dealt to `W` worker slots up front (`job i -> slot i mod W`). Each
//! slot runs its queue in order, one child process at a time. A single
//! dispatcher task owns every slot and reacts to completions one by one, so
//! the "all done" event fires exactly once.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::transcode::command::Job;
use crate::transcode::process::{ProcessLauncher, ProcessOutcome};

pub const MIN_WORKERS: usize = 1;
pub const MAX_WORKERS: usize = 12;
pub const DEFAULT_WORKERS: usize = 4;

/// What happens to a slot after one of its jobs fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Report the failure and carry on with the slot's next job
    #[default]
    Continue,
    /// Skip everything still queued on the failing slot
    HaltSlot,
    /// Re-run the failed job on the same slot, up to `attempts` more times
    Retry { attempts: u32, backoff_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    pub workers: usize,
    pub failure_policy: FailurePolicy,
}

impl BatchOptions {
    /// Options with `workers` clamped to the supported range
    pub fn new(workers: usize, failure_policy: FailurePolicy) -> Self {
        Self {
            workers: workers.clamp(MIN_WORKERS, MAX_WORKERS),
            failure_policy,
        }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS, FailurePolicy::default())
    }
}

/// Deal `jobs` indices round-robin over `workers` queues
pub fn distribute(jobs: usize, workers: usize) -> Vec<VecDeque<usize>> {
    let workers = workers.max(1);
    let mut queues = vec![VecDeque::new(); workers];
    for job in 0..jobs {
        queues[job % workers].push_back(job);
    }
    queues
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    Running { job: usize, attempt: u32 },
    /// Waiting out the retry backoff before `attempt` launches
    Backoff { job: usize, attempt: u32 },
    Drained,
}

#[derive(Debug)]
pub struct WorkerSlot {
    pub id: usize,
    pub queue: VecDeque<usize>,
    pub state: SlotState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The batch was cancelled before the job finished
    Cancelled,
    /// An earlier job on the same slot failed under `FailurePolicy::HaltSlot`
    SlotHalted { failed_job: usize },
}

/// Result of one finished job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub job: usize,
    pub slot: usize,
    pub input: PathBuf,
    pub exit_code: Option<i32>,
    pub success: bool,
    pub output: String,
    /// Number of launches, including the successful one
    pub attempts: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: Vec<usize>,
    pub skipped: Vec<usize>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    Started { job: usize, slot: usize, attempt: u32 },
    /// A failed job will be launched again as `attempt` after `backoff_ms`
    Retrying { job: usize, slot: usize, attempt: u32, backoff_ms: u64 },
    Completed(JobReport),
    Skipped { job: usize, slot: usize, reason: SkipReason },
    /// Every job has completed or been skipped
    Drained(BatchSummary),
    /// The batch was cancelled
    Aborted(BatchSummary),
}

impl BatchEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchEvent::Drained(_) | BatchEvent::Aborted(_))
    }
}

/// Cancels a running batch; cheap to clone into a signal handler
#[derive(Debug, Clone)]
pub struct BatchCanceller {
    tx: Arc<watch::Sender<bool>>,
}

impl BatchCanceller {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Handle to a running batch
#[derive(Debug)]
pub struct BatchHandle {
    id: Uuid,
    events: mpsc::UnboundedReceiver<BatchEvent>,
    canceller: BatchCanceller,
}

impl BatchHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Next batch event; `None` once the terminal event has been consumed
    pub async fn next_event(&mut self) -> Option<BatchEvent> {
        self.events.recv().await
    }

    /// Kill running jobs and skip queued ones
    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    pub fn canceller(&self) -> BatchCanceller {
        self.canceller.clone()
    }

    /// Consume events up to the terminal summary
    pub async fn wait(mut self) -> Option<BatchSummary> {
        while let Some(event) = self.next_event().await {
            match event {
                BatchEvent::Drained(summary) | BatchEvent::Aborted(summary) => return Some(summary),
                _ => {}
            }
        }
        None
    }
}

/// Start running `jobs` in the background. Must be called inside a tokio runtime.
pub fn start_batch<L: ProcessLauncher>(
    jobs: Vec<Job>,
    options: BatchOptions,
    launcher: L,
) -> BatchHandle {
    let id = Uuid::new_v4();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (cancel_tx, cancel_rx) = watch::channel(false);

    let dispatcher = Dispatcher::new(id, jobs, options, Arc::new(launcher), events_tx);
    tokio::spawn(dispatcher.run(cancel_rx));

    BatchHandle {
        id,
        events: events_rx,
        canceller: BatchCanceller {
            tx: Arc::new(cancel_tx),
        },
    }
}

struct Finished {
    slot: usize,
    job: usize,
    attempt: u32,
    outcome: ProcessOutcome,
}

/// Output of a task in the dispatcher's `JoinSet`
enum Wake {
    Finished(Finished),
    BackoffElapsed { slot: usize, job: usize, attempt: u32 },
}

struct Dispatcher<L> {
    id: Uuid,
    jobs: Vec<Job>,
    policy: FailurePolicy,
    launcher: Arc<L>,
    slots: Vec<WorkerSlot>,
    remaining: usize,
    summary: BatchSummary,
    running: JoinSet<Wake>,
    events: mpsc::UnboundedSender<BatchEvent>,
}

impl<L: ProcessLauncher> Dispatcher<L> {
    fn new(
        id: Uuid,
        jobs: Vec<Job>,
        options: BatchOptions,
        launcher: Arc<L>,
        events: mpsc::UnboundedSender<BatchEvent>,
    ) -> Self {
        let workers = options.workers.clamp(MIN_WORKERS, MAX_WORKERS);
        let slots = distribute(jobs.len(), workers)
            .into_iter()
            .enumerate()
            .map(|(id, queue)| WorkerSlot {
                id,
                queue,
                state: SlotState::Idle,
            })
            .collect();

        Self {
            id,
            remaining: jobs.len(),
            summary: BatchSummary {
                total: jobs.len(),
                ..Default::default()
            },
            jobs,
            policy: options.failure_policy,
            launcher,
            slots,
            running: JoinSet::new(),
            events,
        }
    }

    fn emit(&self, event: BatchEvent) {
        // The receiver may be gone; the batch still runs to completion
        let _ = self.events.send(event);
    }

    async fn run(mut self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            batch = %self.id,
            "Starting batch: {} jobs on {} slots",
            self.jobs.len(),
            self.slots.len()
        );

        if self.remaining == 0 {
            self.drain();
            return;
        }

        for slot in 0..self.slots.len() {
            self.launch_next(slot);
        }

        // Only an explicit cancel stops the batch. Once every sender is
        // dropped nobody can cancel any more and the branch is disabled.
        let mut cancel_open = true;

        loop {
            tokio::select! {
                joined = self.running.join_next() => match joined {
                    Some(Ok(Wake::Finished(finished))) => {
                        if self.on_finished(finished) {
                            return;
                        }
                    }
                    Some(Ok(Wake::BackoffElapsed { slot, job, attempt })) => {
                        self.launch(slot, job, attempt);
                    }
                    Some(Err(e)) => {
                        tracing::error!(batch = %self.id, "Job task failed: {}", e);
                        self.abort().await;
                        return;
                    }
                    None => {
                        tracing::error!(batch = %self.id, "No running jobs but {} remaining", self.remaining);
                        self.abort().await;
                        return;
                    }
                },
                changed = cancel.changed(), if cancel_open => {
                    if changed.is_err() {
                        tracing::debug!(batch = %self.id, "Batch handle dropped, running to completion");
                        cancel_open = false;
                    } else if *cancel.borrow() {
                        tracing::info!(batch = %self.id, "Batch cancelled");
                        self.abort().await;
                        return;
                    }
                }
            }
        }
    }

    /// Launch the head of the slot's queue, or mark the slot drained
    fn launch_next(&mut self, slot: usize) {
        match self.slots[slot].queue.pop_front() {
            Some(job) => self.launch(slot, job, 1),
            None => self.slots[slot].state = SlotState::Drained,
        }
    }

    fn launch(&mut self, slot: usize, job: usize, attempt: u32) {
        tracing::debug!(
            batch = %self.id,
            "slot {}: starting job {} ({}) attempt {}",
            slot,
            job,
            self.jobs[job].input.display(),
            attempt
        );

        self.slots[slot].state = SlotState::Running { job, attempt };
        self.emit(BatchEvent::Started { job, slot, attempt });

        let process = self.launcher.launch(&self.jobs[job].command);
        self.running.spawn(async move {
            Wake::Finished(Finished {
                slot,
                job,
                attempt,
                outcome: process.await,
            })
        });
    }

    /// Park the slot for `backoff_ms`, then launch `attempt`
    fn retry_later(&mut self, slot: usize, job: usize, attempt: u32, backoff_ms: u64) {
        self.slots[slot].state = SlotState::Backoff { job, attempt };
        self.emit(BatchEvent::Retrying {
            job,
            slot,
            attempt,
            backoff_ms,
        });
        self.running.spawn(async move {
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            Wake::BackoffElapsed { slot, job, attempt }
        });
    }

    /// React to one completion. Returns true once the batch is drained.
    fn on_finished(&mut self, finished: Finished) -> bool {
        let (slot, job, attempt) = (finished.slot, finished.job, finished.attempt);

        if !finished.outcome.success {
            if let FailurePolicy::Retry {
                attempts,
                backoff_ms,
            } = self.policy
            {
                if attempt <= attempts {
                    tracing::warn!(
                        batch = %self.id,
                        "Job {} failed (exit code {:?}), retrying in {} ms",
                        job,
                        finished.outcome.exit_code,
                        backoff_ms
                    );
                    self.retry_later(slot, job, attempt + 1, backoff_ms);
                    return false;
                }
            }
        }

        let success = self.record(finished);

        if !success && self.policy == FailurePolicy::HaltSlot {
            let skipped: Vec<usize> = self.slots[slot].queue.drain(..).collect();
            for skipped_job in skipped {
                self.skip(skipped_job, slot, SkipReason::SlotHalted { failed_job: job });
            }
        }

        if self.remaining == 0 {
            self.drain();
            return true;
        }

        self.launch_next(slot);
        false
    }

    /// Count a final outcome and report it. Returns the job's success.
    fn record(&mut self, finished: Finished) -> bool {
        let Finished {
            slot,
            job,
            attempt,
            outcome,
        } = finished;
        self.slots[slot].state = SlotState::Idle;

        if outcome.success {
            tracing::info!(batch = %self.id, "Finished {}", self.jobs[job].input.display());
            self.summary.succeeded += 1;
        } else {
            tracing::warn!(
                batch = %self.id,
                "Failed {} (exit code {:?})",
                self.jobs[job].input.display(),
                outcome.exit_code
            );
            self.summary.failed.push(job);
        }

        self.emit(BatchEvent::Completed(JobReport {
            job,
            slot,
            input: self.jobs[job].input.clone(),
            exit_code: outcome.exit_code,
            success: outcome.success,
            output: outcome.output,
            attempts: attempt,
        }));
        self.remaining -= 1;
        outcome.success
    }

    fn skip(&mut self, job: usize, slot: usize, reason: SkipReason) {
        tracing::debug!(batch = %self.id, "slot {}: skipping job {} ({:?})", slot, job, reason);
        self.summary.skipped.push(job);
        self.remaining -= 1;
        self.emit(BatchEvent::Skipped { job, slot, reason });
    }

    fn drain(&mut self) {
        for slot in &mut self.slots {
            slot.state = SlotState::Drained;
        }
        tracing::info!(
            batch = %self.id,
            "Batch drained: {} succeeded, {} failed, {} skipped",
            self.summary.succeeded,
            self.summary.failed.len(),
            self.summary.skipped.len()
        );
        self.emit(BatchEvent::Drained(self.summary.clone()));
    }

    async fn abort(&mut self) {
        // Dropping the process futures kills their children
        self.running.abort_all();
        while let Some(joined) = self.running.join_next().await {
            // Processes that exited before the abort keep their result
            if let Ok(Wake::Finished(finished)) = joined {
                self.record(finished);
            }
        }

        for slot in 0..self.slots.len() {
            let mut unfinished: Vec<usize> = Vec::new();
            if let SlotState::Running { job, .. } | SlotState::Backoff { job, .. } =
                self.slots[slot].state
            {
                unfinished.push(job);
            }
            unfinished.extend(self.slots[slot].queue.drain(..));
            for job in unfinished {
                self.skip(job, slot, SkipReason::Cancelled);
            }
            self.slots[slot].state = SlotState::Drained;
        }

        tracing::info!(
            batch = %self.id,
            "Batch aborted: {} succeeded, {} failed, {} skipped",
            self.summary.succeeded,
            self.summary.failed.len(),
            self.summary.skipped.len()
        );
        self.emit(BatchEvent::Aborted(self.summary.clone()));
    }
}
