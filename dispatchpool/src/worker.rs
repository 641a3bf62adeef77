// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use async_channel::{Receiver, Sender};
use log::{debug, error, info};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::DispatchError;
use crate::job::Job;
use crate::pending::PendingWork;
use crate::stats::DispatchStats;

/// Inbound slot of a single worker. Sitting in the pool means "idle".
pub(crate) type Slot = Sender<Box<dyn Job>>;

/// Runs jobs handed to its private slot, one at a time.
pub(crate) struct Worker {
    name: String,
    slot_tx: Slot,
    slot_rx: Receiver<Box<dyn Job>>,
    pool: Sender<Slot>,
    pending: Arc<PendingWork>,
    stats: Arc<DispatchStats>,
}

impl Worker {
    pub(crate) fn new(
        name: String,
        pool: Sender<Slot>,
        pending: Arc<PendingWork>,
        stats: Arc<DispatchStats>,
    ) -> Self {
        // the slot is only published while the worker is idle, so one job fits
        let (slot_tx, slot_rx) = async_channel::bounded(1);
        Self {
            name,
            slot_tx,
            slot_rx,
            pool,
            pending,
            stats,
        }
    }

    /// Spawns the worker loop on its own thread.
    pub(crate) fn start(self) -> Result<JoinHandle<()>, DispatchError> {
        let name = self.name.clone();
        thread::Builder::new()
            .name(name.clone())
            .spawn(move || self.run())
            .map_err(|source| DispatchError::Spawn { name, source })
    }

    fn run(self) {
        debug!("{} started", self.name);
        loop {
            // publish the slot: this worker is idle now
            if self.pool.send_blocking(self.slot_tx.clone()).is_err() {
                break;
            }
            match self.slot_rx.recv_blocking() {
                Ok(job) => self.handle_job(job),
                // the routing loop closes the slot when retiring the worker
                Err(_) => break,
            }
        }
        info!("{} retired", self.name);
    }

    fn handle_job(&self, job: Box<dyn Job>) {
        let desc = job.desc().to_string();
        debug!("{}: executing job: {}", self.name, desc);

        let outcome = panic::catch_unwind(AssertUnwindSafe(move || job.execute()));
        if let Err(payload) = &outcome {
            error!(
                "{}: job '{}' panicked: {}",
                self.name,
                desc,
                panic_message(payload.as_ref())
            );
        }

        self.stats.record_finished(outcome.is_err());
        self.pending.done();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
