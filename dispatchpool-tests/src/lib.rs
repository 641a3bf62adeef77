// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

pub mod probe_job;
pub mod recording_job;
pub mod test_log;
