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

use super::Team;
use super::job::Job;
use super::lifecycle::{TeamLifecycle, TeamState};
use super::runner::{JobOutcome, JobRunner};
use crate::execution::ExecutionContext;
use officefloor_common::{RetryPolicy, TeamError, TeamId};

/// Team without threads of its own: every job runs to completion on the
/// thread that assigns it
#[derive(Debug)]
pub struct PassiveTeam {
    lifecycle: TeamLifecycle,
    retry: RetryPolicy,
}

impl PassiveTeam {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            lifecycle: TeamLifecycle::new(name),
            retry: RetryPolicy::Spin,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Drive `job` on the calling thread and report how it ended
    pub fn run_job(&self, ctx: &mut ExecutionContext, job: &mut dyn Job) -> Result<JobOutcome, TeamError> {
        self.lifecycle.ensure_working()?;
        let continue_working = self.lifecycle.continue_flag();
        let runner = JobRunner::new(self.lifecycle.id(), self.lifecycle.name(), &continue_working, self.retry);
        Ok(runner.run(job, ctx))
    }
}

impl Team for PassiveTeam {
    fn id(&self) -> TeamId {
        self.lifecycle.id()
    }

    fn name(&self) -> &str {
        self.lifecycle.name()
    }

    fn state(&self) -> TeamState {
        self.lifecycle.state()
    }

    fn start_working(&self) -> Result<(), TeamError> {
        self.lifecycle.start()
    }

    fn assign_job(&self, job: Box<dyn Job>, assigner: Option<TeamId>) -> Result<(), TeamError> {
        let mut ctx = ExecutionContext::new();
        self.assign_job_in(&mut ctx, job, assigner)
    }

    fn assign_job_in(&self, ctx: &mut ExecutionContext, mut job: Box<dyn Job>, _assigner: Option<TeamId>) -> Result<(), TeamError> {
        self.run_job(ctx, job.as_mut()).map(|_| ())
    }

    fn stop_working(&self) -> Result<(), TeamError> {
        self.lifecycle.stop();
        Ok(())
    }
}
