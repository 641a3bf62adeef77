// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use dispatchpool::StatsSnapshot;
use serde::{Deserialize, Serialize};

/// One observation of the dispatcher taken during a timed test.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Observation {
    pub label: String,

    pub elapsed_ms: u128,

    pub queued: usize,

    pub outstanding: usize,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct TestLog {
    pub observations: Vec<Observation>,

    pub stats: Option<StatsSnapshot>,
}

impl TestLog {
    pub fn observe(&mut self, label: &str, elapsed_ms: u128, queued: usize, outstanding: usize) {
        self.observations.push(Observation {
            label: label.to_string(),
            elapsed_ms,
            queued,
            outstanding,
        });
    }

    /// Dumps the log at debug level, helpful when a timing assertion fails.
    pub fn dump(&self) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => log::debug!("{json}"),
            Err(e) => log::warn!("could not serialize test log: {e}"),
        }
    }
}
