// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

/// A unit of work handed to the dispatcher.
///
/// The dispatcher never looks inside a job. It only moves it from the backlog
/// to an idle worker, which calls [`Job::execute`] exactly once. Errors are the
/// job's own business: write them into a channel or a shared buffer the job
/// owns. A panic inside `execute` is caught by the worker and logged.
pub trait Job: Send + 'static {
    /// Free-form description, used for logging or debugging
    fn desc(&self) -> &str {
        "anonymous job"
    }

    /// Runs the job to completion on the calling worker thread.
    fn execute(self: Box<Self>);
}

impl std::fmt::Debug for dyn Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job").field("desc", &self.desc()).finish()
    }
}
