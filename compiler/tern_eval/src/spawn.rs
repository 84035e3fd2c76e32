//! Task scheduling for `spawn` statements.
//!
//! A spawn statement hands a prepared call to the [`TaskScheduler`] and moves
//! on without waiting. The scheduler tracks a [`TaskHandle`] per live task so
//! the host (never the script) can observe, join or cancel it. A task leaves
//! the table once it has run, so long-lived hosts that spawn in a loop do not
//! accumulate handles.
//!
//! Strategies (enum dispatch):
//! - `Threads`: one named OS thread per task
//! - `Pool`: a shared `rayon` pool
//! - `Deferred`: queued until the host calls [`TaskScheduler::run_pending`]
//!
//! Cancellation is cooperative. A task cancelled before it starts never runs.
//! A running task sees the request at the next statement boundary of any body
//! it executes, through the thread-local token installed while it runs.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use tern_ir::Position;

use crate::error_sink::{ErrorSinkImpl, SharedErrorSink, SpawnFailure};
use crate::errors::{invalid_operation, ErrorKind, RuntimeError};
use crate::evaluator::PendingCall;
use crate::Raise;

/// Stack size for task threads, matching what deep script recursion needs
/// before `ensure_sufficient_stack` takes over.
const TASK_STACK_SIZE: usize = 8 * 1024 * 1024;

/// Identifier of a spawned task, unique per scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub const fn new(raw: u64) -> Self {
        TaskId(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Lifecycle of a spawned task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    /// Ended with an uncaught throw, a structural error or a panic.
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

#[derive(Clone, Default)]
struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

thread_local! {
    static CURRENT_TOKEN: RefCell<Option<CancelToken>> = const { RefCell::new(None) };
}

/// Whether the task running on this thread has been asked to stop.
///
/// Always `false` outside a spawned task.
pub fn cancellation_requested() -> bool {
    CURRENT_TOKEN.with(|current| {
        current
            .borrow()
            .as_ref()
            .is_some_and(CancelToken::is_cancelled)
    })
}

/// Installs a task's token for the duration of its run, restoring the
/// previous one on drop (deferred tasks may run inside another task).
struct TokenGuard {
    previous: Option<CancelToken>,
}

impl TokenGuard {
    fn install(token: CancelToken) -> Self {
        let previous = CURRENT_TOKEN.with(|current| current.borrow_mut().replace(token));
        TokenGuard { previous }
    }
}

impl Drop for TokenGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_TOKEN.with(|current| *current.borrow_mut() = previous);
    }
}

struct TaskState {
    id: TaskId,
    position: Position,
    status: Mutex<TaskStatus>,
    finished: Condvar,
    token: CancelToken,
}

/// Host-side handle to a spawned task. Clones refer to the same task.
#[derive(Clone)]
pub struct TaskHandle(Arc<TaskState>);

impl TaskHandle {
    fn new(id: TaskId, position: Position) -> Self {
        TaskHandle(Arc::new(TaskState {
            id,
            position,
            status: Mutex::new(TaskStatus::Pending),
            finished: Condvar::new(),
            token: CancelToken::default(),
        }))
    }

    pub fn id(&self) -> TaskId {
        self.0.id
    }

    /// Position of the spawn statement.
    pub fn position(&self) -> Position {
        self.0.position
    }

    pub fn status(&self) -> TaskStatus {
        *self.0.status.lock()
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_terminal()
    }

    /// Request cancellation. A task that has not started is cancelled at once.
    pub fn cancel(&self) {
        self.0.token.cancel();
        let mut status = self.0.status.lock();
        if *status == TaskStatus::Pending {
            *status = TaskStatus::Cancelled;
            self.0.finished.notify_all();
        }
    }

    /// Block until the task reaches a terminal status.
    ///
    /// A `Deferred` task only progresses when the host runs pending tasks.
    pub fn join(&self) -> TaskStatus {
        let mut status = self.0.status.lock();
        while !status.is_terminal() {
            self.0.finished.wait(&mut status);
        }
        *status
    }

    /// Like [`join`](Self::join), giving up after `timeout`.
    pub fn join_timeout(&self, timeout: Duration) -> Option<TaskStatus> {
        let mut status = self.0.status.lock();
        while !status.is_terminal() {
            if self.0.finished.wait_for(&mut status, timeout).timed_out() {
                return status.is_terminal().then_some(*status);
            }
        }
        Some(*status)
    }

    /// Move to `Running` unless cancelled first.
    fn begin(&self) -> bool {
        let mut status = self.0.status.lock();
        if *status != TaskStatus::Pending {
            return false;
        }
        if self.0.token.is_cancelled() {
            *status = TaskStatus::Cancelled;
            self.0.finished.notify_all();
            return false;
        }
        *status = TaskStatus::Running;
        true
    }

    fn finish(&self, outcome: TaskStatus) {
        *self.0.status.lock() = outcome;
        self.0.finished.notify_all();
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.0.id)
            .field("position", &self.0.position)
            .field("status", &self.status())
            .finish()
    }
}

/// Run one task to completion, routing failures to `sink`.
fn run_task(handle: &TaskHandle, call: PendingCall, sink: &ErrorSinkImpl) {
    if !handle.begin() {
        tracing::debug!(task = %handle.id(), "task cancelled before start");
        return;
    }
    let _token = TokenGuard::install(handle.0.token.clone());

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| call.invoke()));
    let status = match outcome {
        Ok(Ok(_)) => TaskStatus::Completed,
        Ok(Err(Raise::Error(RuntimeError {
            kind: ErrorKind::Cancelled,
            ..
        }))) => {
            tracing::debug!(task = %handle.id(), "task observed cancellation");
            TaskStatus::Cancelled
        }
        Ok(Err(raise)) => {
            report(sink, handle, raise);
            TaskStatus::Failed
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            report(
                sink,
                handle,
                invalid_operation(format!("task panicked: {message}")).into(),
            );
            TaskStatus::Failed
        }
    };
    handle.finish(status);
}

fn report(sink: &ErrorSinkImpl, handle: &TaskHandle, raise: Raise) {
    sink.report(SpawnFailure {
        task: handle.id(),
        position: handle.position(),
        raise,
    });
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

type Job = Box<dyn FnOnce() + Send>;

/// Live tasks by id.
type TaskTable = Arc<Mutex<FxHashMap<TaskId, TaskHandle>>>;

/// How spawned tasks are executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SpawnStrategy {
    /// One OS thread per task.
    #[default]
    Threads,
    /// A shared `rayon` pool with this many workers (0 lets rayon decide).
    Pool { threads: usize },
    /// Queue tasks until the host calls `run_pending`.
    Deferred,
}

enum Executor {
    Threads,
    Pool(rayon::ThreadPool),
    Deferred(Mutex<VecDeque<Job>>),
}

/// Runs spawned tasks and tracks the handles of those not yet run.
pub struct TaskScheduler {
    executor: Executor,
    next_id: AtomicU64,
    tasks: TaskTable,
}

/// Shared scheduler that can be passed around.
pub type SharedScheduler = Arc<TaskScheduler>;

impl TaskScheduler {
    pub fn new(strategy: SpawnStrategy) -> Self {
        let executor = match strategy {
            SpawnStrategy::Threads => Executor::Threads,
            SpawnStrategy::Pool { threads } => build_pool(threads),
            SpawnStrategy::Deferred => Executor::Deferred(Mutex::new(VecDeque::new())),
        };
        TaskScheduler {
            executor,
            next_id: AtomicU64::new(1),
            tasks: TaskTable::default(),
        }
    }

    pub fn threads() -> Self {
        Self::new(SpawnStrategy::Threads)
    }

    pub fn pool(threads: usize) -> Self {
        Self::new(SpawnStrategy::Pool { threads })
    }

    pub fn deferred() -> Self {
        Self::new(SpawnStrategy::Deferred)
    }

    /// The strategy actually in use (a pool that failed to build reports `Threads`).
    pub fn strategy(&self) -> SpawnStrategy {
        match &self.executor {
            Executor::Threads => SpawnStrategy::Threads,
            Executor::Pool(pool) => SpawnStrategy::Pool {
                threads: pool.current_num_threads(),
            },
            Executor::Deferred(_) => SpawnStrategy::Deferred,
        }
    }

    /// Schedule `call` and return immediately.
    pub fn spawn(&self, call: PendingCall, position: Position, sink: SharedErrorSink) -> TaskHandle {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handle = TaskHandle::new(id, position);
        self.tasks.lock().insert(id, handle.clone());
        tracing::debug!(task = %id, %position, callee = call.callee.name(), "task spawned");

        let task = handle.clone();
        let task_sink = Arc::clone(&sink);
        let table = Arc::clone(&self.tasks);
        let job: Job = Box::new(move || {
            run_task(&task, call, &task_sink);
            table.lock().remove(&task.id());
        });

        match &self.executor {
            Executor::Threads => {
                if !spawn_thread(&handle, job, &sink) {
                    self.tasks.lock().remove(&id);
                }
            }
            Executor::Pool(pool) => pool.spawn(job),
            Executor::Deferred(queue) => queue.lock().push_back(job),
        }
        handle
    }

    /// Handle of a task that has not finished running yet.
    pub fn handle(&self, id: TaskId) -> Option<TaskHandle> {
        self.tasks.lock().get(&id).cloned()
    }

    /// Handles of every task not yet run to the end, in spawn order.
    pub fn tasks(&self) -> Vec<TaskHandle> {
        let mut tasks: Vec<TaskHandle> = self.tasks.lock().values().cloned().collect();
        tasks.sort_unstable_by_key(TaskHandle::id);
        tasks
    }

    /// Number of tasks not yet run to the end.
    pub fn live_tasks(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Run queued `Deferred` tasks on the calling thread, including tasks they
    /// spawn. Returns how many jobs ran. No-op for other strategies.
    pub fn run_pending(&self) -> usize {
        let Executor::Deferred(queue) = &self.executor else {
            return 0;
        };
        let mut ran = 0;
        loop {
            // Lock released before the job runs; jobs may spawn more jobs.
            let next = queue.lock().pop_front();
            let Some(job) = next else {
                return ran;
            };
            job();
            ran += 1;
        }
    }

    /// Block until every tracked task is terminal.
    ///
    /// With `Threads` or `Pool`, a task can be terminal a moment before it
    /// leaves the table.
    ///
    /// For `Deferred`, pending tasks are run on the calling thread first.
    pub fn join_all(&self) {
        self.run_pending();
        loop {
            // Tasks may spawn more tasks while we wait.
            let unfinished: Vec<TaskHandle> = self
                .tasks
                .lock()
                .values()
                .filter(|h| !h.is_finished())
                .cloned()
                .collect();
            if unfinished.is_empty() {
                return;
            }
            for handle in unfinished {
                handle.join();
            }
            self.run_pending();
        }
    }

    /// Request cancellation of every tracked task.
    pub fn cancel_all(&self) {
        for handle in self.tasks() {
            handle.cancel();
        }
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::threads()
    }
}

impl fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("strategy", &self.strategy())
            .field("tasks", &self.tasks.lock().len())
            .finish()
    }
}

fn build_pool(threads: usize) -> Executor {
    let built = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .stack_size(TASK_STACK_SIZE)
        .thread_name(|index| format!("tern-pool-{index}"))
        .build();
    match built {
        Ok(pool) => Executor::Pool(pool),
        Err(e) => {
            tracing::warn!("failed to create task pool ({e}), spawning a thread per task");
            Executor::Threads
        }
    }
}

/// Start `job` on its own thread. Returns `false` when the thread could not
/// be created; the task is then already marked failed.
fn spawn_thread(handle: &TaskHandle, job: Job, sink: &ErrorSinkImpl) -> bool {
    let spawned = std::thread::Builder::new()
        .name(format!("tern-{}", handle.id()))
        .stack_size(TASK_STACK_SIZE)
        .spawn(job);
    match spawned {
        Ok(_) => true,
        Err(e) => {
            report(
                sink,
                handle,
                invalid_operation(format!("failed to start task thread: {e}")).into(),
            );
            handle.finish(TaskStatus::Failed);
            false
        }
    }
}
