//! Bounded worker pool with priority dispatch.

use std::any::Any;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use super::config::SchedulerConfig;
use super::types::{
    Priority, QueuedTask, SchedulerStatus, TaskId, TaskOutcome, TaskResult, TaskSpec, TaskState,
};
use crate::collaborators::{Evaluator, TaskDescriptor};
use crate::error::{EvaluationError, SchedulerError};
use crate::population::CandidateId;

/// Concurrent evaluation scheduler.
///
/// At most `max_concurrent` evaluator calls run at once, each in its own
/// Tokio task. Pending tasks wait in a priority heap. A panic or timeout in
/// one evaluator is recorded as a failed [`TaskResult`] and never affects
/// other tasks.
///
/// All mutations go through one mutex; it is never held across an await.
/// Cloning a `Scheduler` yields another handle to the same pool.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

struct Shared {
    config: SchedulerConfig,
    runtime: Handle,
    started_at: Instant,
    state: Mutex<State>,
    /// Bumped on every terminal transition; waiters re-check on change.
    changes: watch::Sender<u64>,
}

#[derive(Default)]
struct State {
    next_seq: u64,
    queue: BinaryHeap<QueuedTask>,
    pending: HashMap<TaskId, Job>,
    /// Abort handles of the worker tasks currently evaluating.
    running: HashMap<TaskId, AbortHandle>,
    results: HashMap<TaskId, TaskResult>,
    cancelled: HashSet<TaskId>,
    stopped: bool,
    total_submitted: u64,
    total_completed: u64,
    total_failed: u64,
    total_cancelled: u64,
    total_aborted: u64,
}

struct Job {
    candidate_id: CandidateId,
    prompt: String,
    task: TaskDescriptor,
    evaluator: Arc<dyn Evaluator>,
    timeout: Duration,
    submitted_at: DateTime<Utc>,
    metadata: BTreeMap<String, String>,
}

impl Scheduler {
    /// Creates a scheduler bound to the current Tokio runtime.
    pub fn start(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;
        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        let (changes, _) = watch::channel(0);
        debug!(
            max_concurrent = config.max_concurrent,
            max_queue_size = config.max_queue_size,
            priorities = config.enable_priorities,
            "scheduler started"
        );
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                runtime,
                started_at: Instant::now(),
                state: Mutex::new(State::default()),
                changes,
            }),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Queues a task and returns its id. Dispatch happens immediately if a
    /// worker slot is free.
    pub fn submit_task(&self, spec: TaskSpec) -> Result<TaskId, SchedulerError> {
        let candidate_id = spec.candidate_id.ok_or(SchedulerError::MissingCandidateId)?;
        let evaluator = spec.evaluator.ok_or(SchedulerError::MissingEvaluator)?;
        let config = &self.shared.config;

        let id = TaskId::generate();
        {
            let mut state = self.shared.state.lock();
            if state.stopped {
                return Err(SchedulerError::Stopped);
            }
            if state.pending.len() + state.running.len() >= config.max_queue_size {
                return Err(SchedulerError::QueueFull {
                    limit: config.max_queue_size,
                });
            }

            let priority = if config.enable_priorities {
                spec.priority
            } else {
                Priority::Normal
            };
            let seq = state.next_seq;
            state.next_seq += 1;
            state.queue.push(QueuedTask { id, priority, seq });
            state.pending.insert(
                id,
                Job {
                    candidate_id,
                    prompt: spec.prompt,
                    task: spec.task,
                    evaluator,
                    timeout: spec.timeout.unwrap_or(config.default_timeout),
                    submitted_at: Utc::now(),
                    metadata: spec.metadata,
                },
            );
            state.total_submitted += 1;
            debug!(task = %id, ?priority, "task submitted");
        }

        Shared::dispatch(&self.shared);
        Ok(id)
    }

    pub fn status(&self) -> SchedulerStatus {
        let state = self.shared.state.lock();
        let uptime = self.shared.started_at.elapsed();
        let finished_total = state.total_completed + state.total_failed;
        let throughput = if uptime.as_secs_f64() > 0.0 {
            finished_total as f64 / uptime.as_secs_f64()
        } else {
            0.0
        };
        SchedulerStatus {
            running: state.running.len(),
            pending: state.pending.len(),
            finished: state.results.len(),
            max_concurrent: self.shared.config.max_concurrent,
            utilization: state.running.len() as f64 / self.shared.config.max_concurrent as f64,
            throughput,
            uptime,
            total_submitted: state.total_submitted,
            total_completed: state.total_completed,
            total_failed: state.total_failed,
            total_cancelled: state.total_cancelled,
            total_aborted: state.total_aborted,
            stopped: state.stopped,
        }
    }

    /// Current lifecycle state, or `None` for an unknown id.
    pub fn task_state(&self, id: TaskId) -> Option<TaskState> {
        self.shared.state.lock().lookup(id)
    }

    /// Returns the stored result of a finished task.
    pub fn get_result(&self, id: TaskId) -> Result<TaskResult, SchedulerError> {
        self.shared.state.lock().result(id)
    }

    /// Removes a task that has not started yet.
    pub fn cancel_task(&self, id: TaskId) -> Result<(), SchedulerError> {
        {
            let mut state = self.shared.state.lock();
            if state.pending.remove(&id).is_none() {
                return Err(SchedulerError::NotFound(id));
            }
            state.queue.retain(|queued| queued.id != id);
            state.cancelled.insert(id);
            state.total_cancelled += 1;
        }
        debug!(task = %id, "task cancelled");
        self.shared.notify();
        Ok(())
    }

    /// Waits until the task finishes and returns its result.
    ///
    /// Fails with `NotFound` for unknown, cancelled or pruned tasks.
    pub async fn wait_for(&self, id: TaskId) -> Result<TaskResult, SchedulerError> {
        let mut changes = self.shared.changes.subscribe();
        loop {
            {
                let state = self.shared.state.lock();
                match state.lookup(id) {
                    Some(current) if !current.is_terminal() => {}
                    _ => return state.result(id),
                }
            }
            changes
                .changed()
                .await
                .map_err(|_| SchedulerError::Stopped)?;
        }
    }

    /// Cancels all pending tasks, rejects further submissions and waits for
    /// running tasks to finish.
    pub async fn stop(&self) {
        let cancelled = {
            let mut state = self.shared.state.lock();
            state.stopped = true;
            state.cancel_pending()
        };
        self.shared.notify();
        info!(cancelled, "scheduler stopping");

        let mut changes = self.shared.changes.subscribe();
        loop {
            let idle = self.shared.state.lock().running.is_empty();
            if idle {
                break;
            }
            if changes.changed().await.is_err() {
                break;
            }
        }
        debug!("scheduler drained");
    }

    /// Stops without waiting: cancels pending tasks, aborts every running
    /// evaluator call and rejects further submissions.
    ///
    /// Aborted tasks report [`TaskState::Cancelled`] and never produce a
    /// result. Returns the number of aborted calls.
    pub fn abort(&self) -> usize {
        let (cancelled, aborted) = {
            let mut state = self.shared.state.lock();
            state.stopped = true;
            let cancelled = state.cancel_pending();
            let running: Vec<(TaskId, AbortHandle)> = state.running.drain().collect();
            for (id, handle) in &running {
                handle.abort();
                state.cancelled.insert(*id);
            }
            state.total_aborted += running.len() as u64;
            (cancelled, running.len())
        };
        self.shared.notify();
        if cancelled + aborted > 0 {
            warn!(cancelled, aborted, "scheduler aborted");
        }
        aborted
    }

    /// Forgets finished and cancelled tasks and returns how many were
    /// dropped. Their ids become unknown; cumulative counters are kept.
    pub fn prune(&self) -> usize {
        let mut state = self.shared.state.lock();
        let pruned = state.results.len() + state.cancelled.len();
        state.results.clear();
        state.cancelled.clear();
        pruned
    }
}

impl State {
    /// Moves every pending task to the cancelled set.
    fn cancel_pending(&mut self) -> usize {
        let ids: Vec<TaskId> = self.pending.keys().copied().collect();
        self.pending.clear();
        self.queue.clear();
        self.total_cancelled += ids.len() as u64;
        self.cancelled.extend(ids.iter().copied());
        ids.len()
    }

    fn lookup(&self, id: TaskId) -> Option<TaskState> {
        if let Some(result) = self.results.get(&id) {
            Some(result.state())
        } else if self.running.contains_key(&id) {
            Some(TaskState::Running)
        } else if self.pending.contains_key(&id) {
            Some(TaskState::Pending)
        } else if self.cancelled.contains(&id) {
            Some(TaskState::Cancelled)
        } else {
            None
        }
    }

    fn result(&self, id: TaskId) -> Result<TaskResult, SchedulerError> {
        if let Some(result) = self.results.get(&id) {
            return Ok(result.clone());
        }
        if self.running.contains_key(&id) {
            return Err(SchedulerError::TaskRunning(id));
        }
        if self.pending.contains_key(&id) {
            return Err(SchedulerError::TaskPending(id));
        }
        Err(SchedulerError::NotFound(id))
    }
}

impl Shared {
    fn notify(&self) {
        self.changes.send_modify(|n| *n = n.wrapping_add(1));
    }

    /// Moves pending tasks into free worker slots.
    fn dispatch(shared: &Arc<Shared>) {
        let mut state = shared.state.lock();
        while !state.stopped && state.running.len() < shared.config.max_concurrent {
            let Some(next) = state.queue.pop() else {
                break;
            };
            let Some(job) = state.pending.remove(&next.id) else {
                continue;
            };
            debug!(task = %next.id, candidate = %job.candidate_id, "task dispatched");

            let worker = Arc::clone(shared);
            let handle = shared.runtime.spawn(async move {
                let result = run_job(next.id, job).await;
                Shared::finish(&worker, result);
            });
            // The worker blocks on this lock in `finish`, so the entry is
            // always in place before it can be removed.
            state.running.insert(next.id, handle.abort_handle());
        }
    }

    fn finish(shared: &Arc<Shared>, result: TaskResult) {
        {
            let mut state = shared.state.lock();
            if state.running.remove(&result.task_id).is_none() {
                debug!(task = %result.task_id, "discarding result of aborted task");
                return;
            }
            match &result.outcome {
                TaskOutcome::Completed(evaluation) => {
                    state.total_completed += 1;
                    debug!(
                        task = %result.task_id,
                        fitness = evaluation.fitness,
                        elapsed_ms = result.duration.as_millis() as u64,
                        "task completed"
                    );
                }
                TaskOutcome::Failed(err) => {
                    state.total_failed += 1;
                    warn!(task = %result.task_id, error = %err, "task failed");
                }
            }
            state.results.insert(result.task_id, result);
        }
        shared.notify();
        Shared::dispatch(shared);
    }
}

/// Aborts the evaluator task when the worker finishes, times out or is
/// itself aborted.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Runs the evaluator in its own task so a panic surfaces as a `JoinError`.
async fn run_job(id: TaskId, job: Job) -> TaskResult {
    let Job {
        candidate_id,
        prompt,
        task,
        evaluator,
        timeout,
        submitted_at,
        metadata,
    } = job;

    let started = Instant::now();
    let handle = tokio::spawn(async move { evaluator.evaluate(&prompt, &task, timeout).await });
    let _abort = AbortOnDrop(handle.abort_handle());

    let outcome = match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(Ok(evaluation))) => TaskOutcome::Completed(evaluation),
        Ok(Ok(Err(err))) => TaskOutcome::Failed(err),
        Ok(Err(join_err)) => {
            let message = if join_err.is_panic() {
                panic_message(join_err.into_panic())
            } else {
                "evaluation task was cancelled".to_string()
            };
            TaskOutcome::Failed(EvaluationError::Panicked(message))
        }
        Err(_) => TaskOutcome::Failed(EvaluationError::Timeout(timeout)),
    };

    TaskResult {
        task_id: id,
        candidate_id,
        outcome,
        submitted_at,
        finished_at: Utc::now(),
        duration: started.elapsed(),
        metadata,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
