// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use crate::job::Job;

/// Wraps a closure so it can be submitted as a [`Job`].
pub struct ClosureJob {
    desc: String,
    task: Box<dyn FnOnce() + Send + 'static>,
}

impl ClosureJob {
    pub fn new<F>(desc: impl Into<String>, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            desc: desc.into(),
            task: Box::new(f),
        }
    }

    /// Same as [`ClosureJob::new`], already boxed for `Dispatcher::submit`.
    pub fn boxed<F>(desc: impl Into<String>, f: F) -> Box<dyn Job>
    where
        F: FnOnce() + Send + 'static,
    {
        Box::new(Self::new(desc, f))
    }
}

impl Job for ClosureJob {
    fn desc(&self) -> &str {
        &self.desc
    }

    fn execute(self: Box<Self>) {
        (self.task)()
    }
}
