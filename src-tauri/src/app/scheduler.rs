use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::app::adb::runner::{execute_invocation, RawOutput};
use crate::app::error::AppError;
use crate::app::invocation::Invocation;

pub const BUSY_MESSAGE: &str = "Another command is running. Please wait.";

/// Completions waiting for the next drain. The worker blocks on a full queue while still
/// holding the gate, so an undrained result keeps new submissions out.
const HANDOFF_CAPACITY: usize = 1;

pub type Executor = Arc<dyn Fn(&Invocation, Duration, &str) -> RawOutput + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    #[default]
    Idle,
    Running { ticket: u64, started: Instant },
}

impl TaskState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

/// A finished invocation together with whatever the submitter attached to it.
#[derive(Debug)]
pub struct Completion<C> {
    pub ticket: u64,
    pub context: C,
    pub output: RawOutput,
    pub elapsed: Duration,
}

/// Runs one invocation at a time on a background worker. Results travel back over a bounded
/// channel that the owner drains from its own loop; the worker never calls back into the owner.
pub struct CommandRunner<C> {
    state: Arc<Mutex<TaskState>>,
    sender: SyncSender<Completion<C>>,
    receiver: Mutex<Receiver<Completion<C>>>,
    executor: Executor,
    timeout: Duration,
    next_ticket: AtomicU64,
}

impl<C: Send + 'static> CommandRunner<C> {
    pub fn new(timeout: Duration) -> Self {
        Self::with_executor(timeout, Arc::new(execute_invocation))
    }

    pub fn with_executor(timeout: Duration, executor: Executor) -> Self {
        let (sender, receiver) = sync_channel(HANDOFF_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(TaskState::Idle)),
            sender,
            receiver: Mutex::new(receiver),
            executor,
            timeout,
            next_ticket: AtomicU64::new(1),
        }
    }

    pub fn state(&self) -> TaskState {
        *lock(&self.state)
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// Rejects with `ERR_BUSY` while another invocation is in flight; the running task is left
    /// untouched. Otherwise returns the ticket of the newly started task.
    pub fn submit(&self, invocation: Invocation, context: C, trace_id: &str) -> Result<u64, AppError> {
        let ticket = {
            let mut state = lock(&self.state);
            if state.is_running() {
                return Err(AppError::busy(BUSY_MESSAGE, trace_id));
            }
            let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
            *state = TaskState::Running {
                ticket,
                started: Instant::now(),
            };
            ticket
        };

        let state = Arc::clone(&self.state);
        let sender = self.sender.clone();
        let executor = Arc::clone(&self.executor);
        let timeout = self.timeout;
        let worker_trace_id = trace_id.to_string();
        info!(trace_id = %trace_id, ticket, command = %invocation, "command started");

        let spawned = thread::Builder::new()
            .name(format!("command-{ticket}"))
            .spawn(move || {
                let started = Instant::now();
                let output = executor(&invocation, timeout, &worker_trace_id);
                let elapsed = started.elapsed();
                info!(
                    trace_id = %worker_trace_id,
                    ticket,
                    exit_code = ?output.exit_code,
                    failed = output.error.is_some(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "command finished"
                );
                let completion = Completion {
                    ticket,
                    context,
                    output,
                    elapsed,
                };
                if sender.send(completion).is_err() {
                    warn!(trace_id = %worker_trace_id, ticket, "runner dropped before completion was delivered");
                }
                release(&state, ticket);
            });

        if let Err(err) = spawned {
            release(&self.state, ticket);
            return Err(AppError::system(
                format!("Failed to start worker thread: {err}"),
                trace_id,
            ));
        }
        Ok(ticket)
    }

    /// Non-blocking. Every completion returned here has already released the gate.
    pub fn drain(&self) -> Vec<Completion<C>> {
        let receiver = lock(&self.receiver);
        let mut completions = Vec::new();
        loop {
            match receiver.try_recv() {
                Ok(completion) => {
                    release(&self.state, completion.ticket);
                    completions.push(completion);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        completions
    }

    /// Time spent on the in-flight task, `None` once the gate is open again.
    pub fn progress_tick(&self) -> Option<Duration> {
        match self.state() {
            TaskState::Running { started, .. } => Some(started.elapsed()),
            TaskState::Idle => None,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Only the task that holds the gate may open it.
fn release(state: &Mutex<TaskState>, ticket: u64) {
    let mut guard = lock(state);
    if matches!(*guard, TaskState::Running { ticket: current, .. } if current == ticket) {
        *guard = TaskState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc::{channel, Sender};

    fn wait_for<C: Send + 'static>(runner: &CommandRunner<C>) -> Vec<Completion<C>> {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let completions = runner.drain();
            if !completions.is_empty() {
                return completions;
            }
            assert!(Instant::now() < deadline, "timed out waiting for completion");
            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Executor that blocks until the test sends on the returned channel.
    fn gated_executor(calls: Arc<AtomicUsize>) -> (Executor, Sender<String>) {
        let (release_tx, release_rx) = channel::<String>();
        let release_rx = Mutex::new(release_rx);
        let executor: Executor = Arc::new(move |_: &Invocation, _: Duration, _: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            let text = release_rx
                .lock()
                .expect("gate lock")
                .recv()
                .unwrap_or_default();
            RawOutput::from_text(text)
        });
        (executor, release_tx)
    }

    fn echo() -> Invocation {
        Invocation::captured("adb", ["devices"])
    }

    #[test]
    fn second_submit_is_rejected_while_running() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (executor, release_tx) = gated_executor(Arc::clone(&calls));
        let runner = CommandRunner::with_executor(Duration::from_secs(5), executor);

        let first = runner.submit(echo(), "first", "trace-1").expect("first submit");
        let before = runner.state();
        assert!(before.is_running());

        let err = runner.submit(echo(), "second", "trace-2").unwrap_err();
        assert!(err.is_busy());
        assert_eq!(err.error, BUSY_MESSAGE);
        assert_eq!(err.trace_id, "trace-2");
        assert_eq!(runner.state(), before);

        release_tx.send("List of devices attached\n".to_string()).expect("release");
        let completions = wait_for(&runner);
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].ticket, first);
        assert_eq!(completions[0].context, "first");
        assert_eq!(completions[0].output.text, "List of devices attached\n");
        assert!(!runner.is_running());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn gate_reopens_after_drain() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (executor, release_tx) = gated_executor(Arc::clone(&calls));
        let runner = CommandRunner::with_executor(Duration::from_secs(5), executor);

        for round in 0..3 {
            let ticket = runner.submit(echo(), round, "trace").expect("submit");
            release_tx.send(format!("round {round}")).expect("release");
            let completions = wait_for(&runner);
            assert_eq!(completions[0].ticket, ticket);
            assert_eq!(completions[0].context, round);
            assert!(!runner.is_running());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn drain_is_empty_when_nothing_finished() {
        let runner: CommandRunner<()> = CommandRunner::new(Duration::from_secs(5));
        assert!(runner.drain().is_empty());
        assert_eq!(runner.state(), TaskState::Idle);
    }

    #[test]
    fn progress_is_reported_only_while_running() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (executor, release_tx) = gated_executor(calls);
        let runner = CommandRunner::with_executor(Duration::from_secs(5), executor);
        assert_eq!(runner.progress_tick(), None);

        runner.submit(echo(), (), "trace").expect("submit");
        thread::sleep(Duration::from_millis(20));
        let elapsed = runner.progress_tick().expect("running");
        assert!(elapsed >= Duration::from_millis(20));

        release_tx.send(String::new()).expect("release");
        wait_for(&runner);
        assert_eq!(runner.progress_tick(), None);
    }

    #[test]
    fn tickets_increase_across_tasks() {
        let executor: Executor = Arc::new(|_: &Invocation, _: Duration, _: &str| RawOutput::from_text("ok"));
        let runner = CommandRunner::with_executor(Duration::from_secs(5), executor);
        let first = runner.submit(echo(), (), "trace").expect("submit");
        wait_for(&runner);
        let second = runner.submit(echo(), (), "trace").expect("submit");
        wait_for(&runner);
        assert!(second > first);
    }

    #[test]
    fn worker_runs_under_the_submitters_trace_id() {
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let recorder = Arc::clone(&seen);
        let executor: Executor = Arc::new(move |_: &Invocation, _: Duration, trace_id: &str| {
            recorder.lock().expect("record").push(trace_id.to_string());
            RawOutput::from_text("ok")
        });
        let runner = CommandRunner::with_executor(Duration::from_secs(5), executor);
        runner.submit(echo(), (), "trace-worker").expect("submit");
        wait_for(&runner);
        assert_eq!(*seen.lock().expect("seen"), vec!["trace-worker".to_string()]);
    }

    #[test]
    fn runs_a_real_process() {
        if cfg!(windows) {
            return;
        }
        let runner = CommandRunner::new(Duration::from_secs(5));
        let invocation = Invocation::captured("sh", ["-c", "printf hello; printf oops >&2; exit 4"]);
        runner.submit(invocation, (), "trace-real").expect("submit");
        let completions = wait_for(&runner);
        let output = &completions[0].output;
        assert_eq!(output.text, "hellooops");
        assert_eq!(output.exit_code, Some(4));
        assert!(output.error.is_none());
    }

    #[test]
    fn launch_failure_is_delivered_as_output() {
        let runner = CommandRunner::new(Duration::from_secs(5));
        let invocation = Invocation::captured("/this/path/should/not/exist/adb", ["devices"]);
        runner.submit(invocation, (), "trace-missing").expect("submit");
        let completions = wait_for(&runner);
        assert!(completions[0].output.error.is_some());
        assert!(!runner.is_running());
    }
}
