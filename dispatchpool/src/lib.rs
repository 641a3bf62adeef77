// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>
//! # Design: Bounded Job Dispatcher (OS threads)
//!
//! ## Overview
//! Caps how many jobs run at the same time while letting producers submit
//! at their own pace.
//!
//! - Submitted jobs wait in a bounded FIFO backlog. A full backlog blocks the
//!   submitter (backpressure), nothing is dropped.
//! - A fixed number of workers, each on its own thread, advertise themselves
//!   as idle by putting their private slot into a shared pool.
//! - The routing loop takes the next job and the next idle slot and moves the
//!   job into that slot.
//! - A pending-work counter is raised before a job enters the backlog and
//!   lowered after it ran, so `wait()` returns once everything finished.
//! - `shutdown()` closes the backlog; the routing loop drains it, then closes
//!   every worker's slot and the threads exit.
//!
//! ```text
//!         submit()                     +-------------------+
//!            |                         |   idle pool (W)   |
//!            v                         | slot slot ...     |
//!   +------------------+   job    +----+----+--------------+
//!   |  backlog (N)     +--------->+ routing |
//!   +------------------+          |  loop   |
//!                                 +----+----+
//!                                      | job into slot
//!                      +---------------+---------------+
//!                      v               v               v
//!                 +---------+     +---------+     +---------+
//!                 | worker0 |     | worker1 |     | worker2 |
//!                 +---------+     +---------+     +---------+
//!                      \  done() -> pending-work counter  /
//! ```
//!
//! ## Example
//! ```no_run
//! use dispatchpool::{ClosureJob, Dispatcher};
//!
//! let dispatcher = Dispatcher::new(4, 16).unwrap();
//! dispatcher.start().unwrap();
//! for i in 0..100 {
//!     dispatcher
//!         .submit(ClosureJob::boxed(format!("job {i}"), move || println!("{i}")))
//!         .unwrap();
//! }
//! dispatcher.wait();
//! dispatcher.shutdown().unwrap();
//! ```

pub mod closure_job;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod pending;
pub mod stats;
mod worker;

pub use closure_job::ClosureJob;
pub use config::DispatcherConfig;
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, TrySubmitError};
pub use job::Job;
pub use pending::PendingWork;
pub use stats::StatsSnapshot;
