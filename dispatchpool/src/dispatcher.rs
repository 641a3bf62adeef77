// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use async_channel::{Receiver, Sender, TrySendError};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::DispatcherConfig;
use crate::error::{DispatchError, TrySubmitError};
use crate::job::Job;
use crate::pending::PendingWork;
use crate::stats::{DispatchStats, StatsSnapshot};
use crate::worker::{Slot, Worker};

/// A job on its way through the backlog.
struct Envelope {
    job: Box<dyn Job>,
    /// Set for zero-capacity backlogs: the submitter blocks until the routing
    /// loop has taken the job.
    handoff: Option<Sender<()>>,
}

enum State {
    Constructed {
        backlog: Receiver<Envelope>,
        pool_tx: Sender<Slot>,
        pool_rx: Receiver<Slot>,
    },
    Running {
        router: JoinHandle<()>,
        workers: Vec<JoinHandle<()>>,
    },
    Stopped,
}

/// Routes submitted jobs to a fixed set of worker threads.
///
/// `Dispatcher` is `Sync`; share it between producer threads with an `Arc`.
pub struct Dispatcher {
    config: DispatcherConfig,
    backlog: Sender<Envelope>,
    pending: Arc<PendingWork>,
    stats: Arc<DispatchStats>,
    state: Mutex<State>,
}

impl Dispatcher {
    /// Allocates the backlog and the worker pool. No thread runs before
    /// [`Dispatcher::start`].
    pub fn new(max_workers: usize, queue_capacity: usize) -> Result<Self, DispatchError> {
        Self::with_config(DispatcherConfig::new(max_workers, queue_capacity))
    }

    pub fn with_config(config: DispatcherConfig) -> Result<Self, DispatchError> {
        config.validate()?;

        // async-channel has no zero-capacity channel, a rendezvous is emulated
        // with a one-element buffer plus a per-job handoff signal
        let (backlog_tx, backlog_rx) = async_channel::bounded(config.queue_capacity.max(1));
        let (pool_tx, pool_rx) = async_channel::bounded(config.max_workers);

        Ok(Self {
            config,
            backlog: backlog_tx,
            pending: Arc::new(PendingWork::new()),
            stats: Arc::new(DispatchStats::default()),
            state: Mutex::new(State::Constructed {
                backlog: backlog_rx,
                pool_tx,
                pool_rx,
            }),
        })
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Spawns the workers and the routing loop.
    pub fn start(&self) -> Result<(), DispatchError> {
        let mut state = self.lock_state();
        let (backlog, pool_tx, pool_rx) = match &*state {
            State::Constructed {
                backlog,
                pool_tx,
                pool_rx,
            } => (backlog.clone(), pool_tx.clone(), pool_rx.clone()),
            State::Running { .. } => return Err(DispatchError::AlreadyStarted),
            State::Stopped => return Err(DispatchError::Closed),
        };

        let mut workers = Vec::with_capacity(self.config.max_workers);
        for id in 0..self.config.max_workers {
            let worker = Worker::new(
                format!("{}-worker-{}", self.config.thread_name, id),
                pool_tx.clone(),
                self.pending.clone(),
                self.stats.clone(),
            );
            match worker.start() {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // retire what is already running before giving up
                    retire_workers(&pool_rx, workers.len());
                    return Err(e);
                }
            }
        }

        let name = format!("{}-router", self.config.thread_name);
        let worker_count = self.config.max_workers;
        let router_pool = pool_rx.clone();
        let router = thread::Builder::new()
            .name(name.clone())
            .spawn(move || route_jobs(backlog, router_pool, worker_count))
            .map_err(|source| DispatchError::Spawn { name, source });
        let router = match router {
            Ok(router) => router,
            Err(e) => {
                retire_workers(&pool_rx, workers.len());
                return Err(e);
            }
        };

        info!(
            "Started dispatcher with {} workers and a backlog of {}",
            self.config.max_workers, self.config.queue_capacity
        );
        *state = State::Running { router, workers };
        Ok(())
    }

    /// Queues a job, blocking while the backlog is full.
    pub fn submit(&self, job: Box<dyn Job>) -> Result<(), DispatchError> {
        // count first: a concurrent wait() must not see zero while this job
        // is on its way into the backlog
        self.pending.add();
        debug!("Submitting job: {}", job.desc());

        let (handoff, handoff_rx) = if self.config.queue_capacity == 0 {
            let (tx, rx) = async_channel::bounded(1);
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        if self.backlog.send_blocking(Envelope { job, handoff }).is_err() {
            self.reject();
            return Err(DispatchError::Closed);
        }
        if let Some(rx) = handoff_rx {
            // an error means the envelope was dropped unrun by a shutdown
            // before start, which already rolled the counter back
            if rx.recv_blocking().is_err() {
                self.stats.record_rejected();
                return Err(DispatchError::Closed);
            }
        }
        self.stats.record_submitted();
        Ok(())
    }

    /// Queues a job if there is room right now and hands it back otherwise.
    ///
    /// With a zero-capacity backlog there is never room without waiting, so
    /// the job always comes back as [`TrySubmitError::Full`].
    pub fn try_submit(&self, job: Box<dyn Job>) -> Result<(), TrySubmitError> {
        if self.backlog.is_closed() {
            self.stats.record_rejected();
            return Err(TrySubmitError::Closed(job));
        }
        if self.config.queue_capacity == 0 {
            return Err(TrySubmitError::Full(job));
        }

        self.pending.add();
        match self.backlog.try_send(Envelope { job, handoff: None }) {
            Ok(()) => {
                self.stats.record_submitted();
                Ok(())
            }
            Err(TrySendError::Full(envelope)) => {
                self.pending.done();
                Err(TrySubmitError::Full(envelope.job))
            }
            Err(TrySendError::Closed(envelope)) => {
                self.reject();
                Err(TrySubmitError::Closed(envelope.job))
            }
        }
    }

    /// Number of jobs waiting in the backlog.
    ///
    /// Jobs already taken by the routing loop but still waiting for an idle
    /// worker are not counted, neither are running jobs. Use
    /// [`Dispatcher::outstanding`] for everything that is not finished.
    pub fn queued_count(&self) -> usize {
        self.backlog.len().min(self.config.queue_capacity)
    }

    /// Jobs accepted and not yet finished, including queued ones.
    pub fn outstanding(&self) -> usize {
        self.pending.count()
    }

    /// Blocks until every submitted job has finished.
    ///
    /// Calling this from inside a job of the same dispatcher never returns,
    /// the calling job itself is still outstanding.
    pub fn wait(&self) {
        self.pending.wait();
    }

    /// Returns `true` if all submitted jobs finished within `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.pending.wait_timeout(timeout)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stops accepting jobs, runs everything already accepted, then joins
    /// the routing loop and all workers.
    ///
    /// Jobs buffered in a dispatcher that was never started are dropped.
    /// Calling it from a job running on this dispatcher is refused with
    /// [`DispatchError::ShutdownFromWorker`], since the worker would have to
    /// join itself.
    pub fn shutdown(&self) -> Result<(), DispatchError> {
        let previous = {
            let mut state = self.lock_state();
            if let State::Running { workers, .. } = &*state {
                let current = thread::current();
                if workers.iter().any(|w| w.thread().id() == current.id()) {
                    let name = current.name().unwrap_or("unnamed").to_string();
                    return Err(DispatchError::ShutdownFromWorker(name));
                }
            }
            self.backlog.close();
            std::mem::replace(&mut *state, State::Stopped)
        };
        match previous {
            State::Constructed { backlog, .. } => {
                let mut dropped = 0;
                while let Ok(envelope) = backlog.try_recv() {
                    debug!("Dropping unstarted job: {}", envelope.job.desc());
                    self.pending.done();
                    dropped += 1;
                }
                if dropped > 0 {
                    warn!("Dispatcher shut down before start, dropped {dropped} queued jobs");
                }
                Ok(())
            }
            State::Running { router, workers } => {
                debug!("Waiting for the routing loop to drain the backlog");
                let mut result = join_thread(router);
                for worker in workers {
                    let joined = join_thread(worker);
                    if result.is_ok() {
                        result = joined;
                    }
                }
                info!("Dispatcher shut down");
                result
            }
            State::Stopped => Ok(()),
        }
    }

    fn reject(&self) {
        self.pending.done();
        self.stats.record_rejected();
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // the routing loop drains what is left and retires the workers on its own
        self.backlog.close();
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("queued", &self.queued_count())
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

/// The routing loop: backlog -> idle worker, in submission order.
fn route_jobs(backlog: Receiver<Envelope>, pool: Receiver<Slot>, worker_count: usize) {
    info!("Routing loop started");
    while let Ok(Envelope { job, handoff }) = backlog.recv_blocking() {
        if let Some(handoff) = handoff {
            let _ = handoff.try_send(());
        }
        if !deliver(&pool, job) {
            break;
        }
    }
    debug!("Backlog closed and drained, retiring workers");
    retire_workers(&pool, worker_count);
    info!("Routing loop ended");
}

/// Hands `job` to the next idle worker. Returns `false` if no worker is left.
fn deliver(pool: &Receiver<Slot>, mut job: Box<dyn Job>) -> bool {
    loop {
        let slot = match pool.recv_blocking() {
            Ok(slot) => slot,
            Err(_) => {
                warn!("No worker left, dropping job: {}", job.desc());
                return false;
            }
        };
        debug!("Routing job to worker: {}", job.desc());
        match slot.send_blocking(job) {
            Ok(()) => return true,
            Err(async_channel::SendError(returned)) => {
                warn!("Worker slot closed, redelivering job: {}", returned.desc());
                job = returned;
            }
        }
    }
}

/// Waits for `count` workers to become idle and closes their slots.
fn retire_workers(pool: &Receiver<Slot>, count: usize) {
    for _ in 0..count {
        match pool.recv_blocking() {
            Ok(slot) => {
                slot.close();
            }
            Err(_) => break,
        }
    }
}

fn join_thread(handle: JoinHandle<()>) -> Result<(), DispatchError> {
    let name = handle.thread().name().unwrap_or("unnamed").to_string();
    handle
        .join()
        .map_err(|_| DispatchError::ThreadPanicked(name))
}
