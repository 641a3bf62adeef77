// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Sizing of a [`crate::Dispatcher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Number of worker threads, fixed for the dispatcher's lifetime.
    pub max_workers: usize,
    /// Jobs that may wait in the backlog before `submit` blocks.
    /// Zero makes every submission a rendezvous with the routing loop.
    pub queue_capacity: usize,
    /// Prefix for the names of the spawned threads.
    pub thread_name: String,
}

impl DispatcherConfig {
    pub fn new(max_workers: usize, queue_capacity: usize) -> Self {
        Self {
            max_workers,
            queue_capacity,
            ..Self::default()
        }
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.max_workers == 0 {
            return Err(DispatchError::InvalidWorkerCount(self.max_workers));
        }
        // std panics when spawning a thread with such a name
        if self.thread_name.contains('\0') {
            return Err(DispatchError::InvalidThreadName(self.thread_name.clone()));
        }
        Ok(())
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            queue_capacity: 64,
            thread_name: "dispatchpool".to_string(),
        }
    }
}
