// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use crate::job::Job;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("max_workers must be at least 1, got {0}")]
    InvalidWorkerCount(usize),

    #[error("thread name must not contain NUL bytes: {0:?}")]
    InvalidThreadName(String),

    #[error("dispatcher has already been started")]
    AlreadyStarted,

    #[error("dispatcher is shut down and no longer accepts jobs")]
    Closed,

    #[error("failed to spawn thread {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("thread {0} panicked")]
    ThreadPanicked(String),

    #[error("shutdown called from worker thread {0}, which would wait for itself")]
    ShutdownFromWorker(String),
}

/// Returned by `Dispatcher::try_submit`; hands the rejected job back.
#[derive(Debug, thiserror::Error)]
pub enum TrySubmitError {
    #[error("backlog is full")]
    Full(Box<dyn Job>),

    #[error("dispatcher is shut down and no longer accepts jobs")]
    Closed(Box<dyn Job>),
}

impl TrySubmitError {
    pub fn into_job(self) -> Box<dyn Job> {
        match self {
            TrySubmitError::Full(job) | TrySubmitError::Closed(job) => job,
        }
    }
}
