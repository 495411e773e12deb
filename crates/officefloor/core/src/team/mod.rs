// OfficeFloor Execution
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Teams and jobs
//!
//! A team owns zero or more worker threads and drives the jobs assigned to
//! it until they report completion or the team stops working:
//! - `ExecutorTeam`: fixed pool or single dedicated worker
//! - `WorkerPerJobTeam`: one managed thread per job
//! - `PassiveTeam`: the assigning thread does the work
//! - `ProcessContextTeam`: work re-enters the triggering thread

pub mod executor;
pub mod job;
pub mod lifecycle;
pub mod passive;
pub mod process_context;
pub mod queue;
mod runner;
pub mod worker_per_job;

pub use executor::ExecutorTeam;
pub use job::{Job, JobContext, JobPoll};
pub use lifecycle::{TeamLifecycle, TeamState};
pub use passive::PassiveTeam;
pub use process_context::ProcessContextTeam;
pub use queue::JobQueue;
pub use runner::JobOutcome;
pub use worker_per_job::WorkerPerJobTeam;

use crate::execution::ExecutionContext;
use officefloor_common::{TeamError, TeamId};
use std::thread::{self, JoinHandle};
use tracing::{error, trace};

/// Execution strategy that drives jobs to completion.
///
/// # Lifecycle
/// `start_working` once, then any number of `assign_job` calls, then
/// `stop_working`. Stopping clears the team's continue flag before the
/// workers are shut down, so a pending job is not invoked again.
pub trait Team: Send + Sync {
    fn id(&self) -> TeamId;

    fn name(&self) -> &str;

    fn state(&self) -> TeamState;

    fn start_working(&self) -> Result<(), TeamError>;

    /// Submit a job. `assigner` is the team whose job made the assignment,
    /// if any.
    fn assign_job(&self, job: Box<dyn Job>, assigner: Option<TeamId>) -> Result<(), TeamError>;

    /// Submit a job from a thread that already carries an execution context.
    /// Teams that run work on the calling thread reuse `ctx`.
    fn assign_job_in(&self, _ctx: &mut ExecutionContext, job: Box<dyn Job>, assigner: Option<TeamId>) -> Result<(), TeamError> {
        self.assign_job(job, assigner)
    }

    /// Stop the team and wait for its workers. Calling it again is a no-op.
    fn stop_working(&self) -> Result<(), TeamError>;
}

/// Join worker threads, skipping the calling thread when a worker stops its
/// own team
pub(crate) fn join_workers(team: TeamId, name: &str, handles: Vec<JoinHandle<()>>) -> Result<(), TeamError> {
    let current = thread::current().id();
    let mut panicked = 0usize;

    for handle in handles {
        if handle.thread().id() == current {
            trace!(team = name, "Worker stopping its own team, not joining itself");
            continue;
        }
        if handle.join().is_err() {
            panicked += 1;
        }
    }

    if panicked > 0 {
        error!(team = name, workers = panicked, "Worker threads panicked");
        return Err(TeamError::WorkerPanicked(team));
    }
    Ok(())
}
