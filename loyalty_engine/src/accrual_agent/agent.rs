use std::{fmt::Display, sync::Arc, time::Duration};

use log::*;
use tokio::{
    sync::{mpsc, watch, Mutex},
    task::{JoinError, JoinHandle},
};

use crate::{
    accrual_agent::{
        dispatcher::Dispatcher,
        worker::{SharedOrderQueue, Worker},
        cancelled,
        AccrualProvider,
        AgentError,
        RateLimiter,
    },
    db::traits::AccrualLedger,
    db_types::Order,
};

pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_DISPATCH_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Stopped,
    Starting,
    Running,
    /// A task hit an unrecoverable error and every other task has been told to stop. Call `stop` to clean up.
    Failed,
    Stopping,
}

impl Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentState::Stopped => write!(f, "stopped"),
            AgentState::Starting => write!(f, "starting"),
            AgentState::Running => write!(f, "running"),
            AgentState::Failed => write!(f, "failed"),
            AgentState::Stopping => write!(f, "stopping"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// The number of workers, which is also the capacity of the work channel.
    pub workers: usize,
    /// The time between dispatch cycles.
    pub dispatch_interval: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { workers: DEFAULT_WORKERS, dispatch_interval: DEFAULT_DISPATCH_INTERVAL }
    }
}

/// Handles to everything spawned by a call to `start`.
struct AgentTasks {
    cancel: Arc<watch::Sender<bool>>,
    orders: Option<mpsc::Sender<Order>>,
    dispatcher: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<Result<(), AgentError>>>,
}

/// The order reconciliation agent.
///
/// `start` spawns the dispatch loop and the worker pool onto the current tokio runtime and returns immediately.
/// `stop` signals cancellation, closes the work channel and waits for every task to finish. Once `stop` has returned,
/// nothing spawned by the agent is left running, and the agent can be started again.
///
/// A worker that hits an unrecoverable error (a poisoned rate limiter) cancels every other task, after which the agent
/// reports [`AgentState::Failed`] and [`AccrualAgent::failed`] resolves.
///
/// Dropping a running agent signals cancellation, but does not wait for the tasks to exit.
pub struct AccrualAgent<L, P> {
    ledger: Arc<L>,
    provider: Arc<P>,
    limiter: Arc<RateLimiter>,
    config: AgentConfig,
    state: AgentState,
    tasks: Option<AgentTasks>,
}

impl<L, P> AccrualAgent<L, P>
where
    L: AccrualLedger,
    P: AccrualProvider,
{
    pub fn new(ledger: L, provider: P, config: AgentConfig) -> Self {
        Self {
            ledger: Arc::new(ledger),
            provider: Arc::new(provider),
            limiter: Arc::new(RateLimiter::new()),
            config,
            state: AgentState::Stopped,
            tasks: None,
        }
    }

    /// Use the given rate limiter instead of a private one. Agents that talk to the same accrual service should share
    /// a limiter.
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn state(&self) -> AgentState {
        match &self.tasks {
            // Only a failing task raises the cancel flag while the agent is running.
            Some(tasks) if self.state == AgentState::Running && *tasks.cancel.borrow() => AgentState::Failed,
            _ => self.state,
        }
    }

    /// Resolves once the agent has cancelled itself after a fatal error. Never resolves for an agent that is not
    /// running.
    pub async fn failed(&self) {
        match &self.tasks {
            Some(tasks) if self.state == AgentState::Running => {
                let mut signal = tasks.cancel.subscribe();
                cancelled(&mut signal).await;
            },
            _ => std::future::pending().await,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Spawns the dispatch loop and the worker pool. Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<(), AgentError> {
        if self.state != AgentState::Stopped {
            return Err(AgentError::AlreadyRunning(self.state()));
        }
        self.state = AgentState::Starting;
        let workers = self.config.workers.max(1);
        info!("🤖️ Starting accrual agent with {workers} workers");
        let (cancel, signal) = watch::channel(false);
        let cancel = Arc::new(cancel);
        let (sender, receiver) = mpsc::channel::<Order>(workers);
        let queue: SharedOrderQueue = Arc::new(Mutex::new(receiver));

        let workers = (0..workers)
            .map(|id| {
                let worker = Worker::new(
                    id,
                    Arc::clone(&self.ledger),
                    Arc::clone(&self.provider),
                    Arc::clone(&self.limiter),
                    Arc::clone(&queue),
                    signal.clone(),
                );
                let abort = Arc::clone(&cancel);
                tokio::spawn(async move {
                    let result = worker.run().await;
                    if let Err(e) = &result {
                        error!("🤖️ Worker {id} cannot continue. Shutting down the accrual agent. {e}");
                        abort.send_replace(true);
                    }
                    result
                })
            })
            .collect::<Vec<_>>();
        let dispatcher =
            Dispatcher::new(Arc::clone(&self.ledger), sender.clone(), self.config.dispatch_interval, signal);
        let dispatcher = tokio::spawn(dispatcher.run());

        self.tasks = Some(AgentTasks { cancel, orders: Some(sender), dispatcher: Some(dispatcher), workers });
        self.state = AgentState::Running;
        info!("🤖️ Accrual agent is running");
        Ok(())
    }

    /// Stops the agent and waits for the dispatch loop and all workers to exit. Calling `stop` on an agent that is not
    /// running does nothing.
    ///
    /// Work that is in progress is abandoned, unless its verdict has already been received, in which case it is
    /// written to the ledger first. Abandoned orders are picked up again the next time the agent runs.
    pub async fn stop(&mut self) {
        let Some(tasks) = self.tasks.as_mut() else {
            trace!("🤖️ Accrual agent is not running. Nothing to stop");
            return;
        };
        self.state = AgentState::Stopping;
        info!("🤖️ Stopping accrual agent");
        tasks.cancel.send_replace(true);
        // The dispatcher holds the only other sender, so the channel is closed once it has exited.
        tasks.orders.take();
        if let Some(dispatcher) = tasks.dispatcher.as_mut() {
            report_exit("Dispatch loop", dispatcher.await.map(Ok));
            tasks.dispatcher = None;
        }
        // Handles are only removed once they have resolved, so a `stop` that was itself interrupted can be resumed.
        while let Some(worker) = tasks.workers.last_mut() {
            let result = worker.await;
            let id = tasks.workers.len() - 1;
            tasks.workers.pop();
            report_exit(&format!("Worker {id}"), result);
        }
        self.tasks = None;
        self.state = AgentState::Stopped;
        info!("🤖️ Accrual agent stopped");
    }
}

fn report_exit(task: &str, result: Result<Result<(), AgentError>, JoinError>) {
    match result {
        Ok(Ok(())) => trace!("🤖️ {task} exited cleanly"),
        Ok(Err(e)) => error!("🤖️ {task} failed. {e}"),
        Err(e) if e.is_panic() => error!("🤖️ {task} panicked"),
        Err(e) => error!("🤖️ {task} did not complete. {e}"),
    }
}

impl<L, P> Drop for AccrualAgent<L, P> {
    fn drop(&mut self) {
        if let Some(tasks) = &self.tasks {
            warn!("🤖️ Accrual agent dropped while {}. Signalling its tasks to stop", self.state);
            tasks.cancel.send_replace(true);
        }
    }
}
