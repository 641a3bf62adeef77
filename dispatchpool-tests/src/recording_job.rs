// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use dispatchpool::Job;
use std::sync::{Arc, Mutex};

/// Shared, append-only log of job sequence numbers.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<usize>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job(&self, seq: usize) -> Box<dyn Job> {
        Box::new(RecordingJob {
            desc: format!("record {seq}"),
            seq,
            seen: self.seen.clone(),
        })
    }

    pub fn recorded(&self) -> Vec<usize> {
        self.seen.lock().unwrap().clone()
    }
}

/// Appends its sequence number to the recorder when executed.
pub struct RecordingJob {
    desc: String,
    seq: usize,
    seen: Arc<Mutex<Vec<usize>>>,
}

impl Job for RecordingJob {
    fn desc(&self) -> &str {
        &self.desc
    }

    fn execute(self: Box<Self>) {
        self.seen.lock().unwrap().push(self.seq);
    }
}
