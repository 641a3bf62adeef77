// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use dispatchpool::Job;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Default)]
struct ProbeState {
    started: AtomicU32,
    finished: AtomicU32,
}

/// A job that sleeps for a fixed time and remembers whether it ran.
///
/// The job itself is consumed by the dispatcher; keep the [`Probe`] to ask
/// about it afterwards.
pub struct ProbeJob {
    desc: String,
    delay: Duration,
    state: Arc<ProbeState>,
}

/// Observer side of a [`ProbeJob`].
#[derive(Debug, Clone)]
pub struct Probe {
    state: Arc<ProbeState>,
}

impl ProbeJob {
    pub fn new(desc: impl Into<String>, delay: Duration) -> (Box<dyn Job>, Probe) {
        let state = Arc::new(ProbeState::default());
        let job: Box<dyn Job> = Box::new(Self {
            desc: desc.into(),
            delay,
            state: state.clone(),
        });
        (job, Probe { state })
    }
}

impl Job for ProbeJob {
    fn desc(&self) -> &str {
        &self.desc
    }

    fn execute(self: Box<Self>) {
        self.state.started.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.state.finished.fetch_add(1, Ordering::SeqCst);
    }
}

impl Probe {
    /// The job has begun executing (it may still be running).
    pub fn was_called(&self) -> bool {
        self.started() > 0
    }

    pub fn is_finished(&self) -> bool {
        self.state.finished.load(Ordering::SeqCst) > 0
    }

    pub fn started(&self) -> u32 {
        self.state.started.load(Ordering::SeqCst)
    }
}
