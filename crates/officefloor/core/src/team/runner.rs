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

use super::job::{InvocationContext, Job, JobPoll};
use crate::execution::ExecutionContext;
use metrics::counter;
use officefloor_common::{RetryPolicy, TeamId};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

/// How a job left the worker loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobOutcome {
    Completed { invocations: u32 },
    /// The team stopped while the job was still pending
    Abandoned { invocations: u32 },
}

impl JobOutcome {
    pub fn invocations(&self) -> u32 {
        match *self {
            Self::Completed { invocations } | Self::Abandoned { invocations } => invocations,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Drives a job until it completes or its team stops working.
///
/// The continue flag is read between invocations only; an invocation in
/// progress is never interrupted.
pub(crate) struct JobRunner<'a> {
    team: TeamId,
    team_name: &'a str,
    continue_working: &'a AtomicBool,
    retry: RetryPolicy,
}

impl<'a> JobRunner<'a> {
    pub(crate) fn new(team: TeamId, team_name: &'a str, continue_working: &'a AtomicBool, retry: RetryPolicy) -> Self {
        Self {
            team,
            team_name,
            continue_working,
            retry,
        }
    }

    pub(crate) fn run(&self, job: &mut dyn Job, ctx: &mut ExecutionContext) -> JobOutcome {
        let continue_working = || self.continue_working.load(Ordering::Acquire);
        let mut context = InvocationContext::new(self.team, &continue_working, ctx);
        let mut invocations: u32 = 0;

        while continue_working() {
            invocations = invocations.saturating_add(1);
            context.reset();
            if job.do_job(&mut context) == JobPoll::Complete {
                trace!(team = self.team_name, invocations, "Job complete");
                counter!("officefloor_jobs_completed", 1, "team" => self.team_name.to_string());
                return JobOutcome::Completed { invocations };
            }
            self.retry.pause(invocations);
        }

        debug!(team = self.team_name, invocations, "Team stopped, abandoning pending job");
        counter!("officefloor_jobs_abandoned", 1, "team" => self.team_name.to_string());
        JobOutcome::Abandoned { invocations }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::job::JobContext;

    #[test]
    fn test_pending_once_then_complete_invoked_twice() {
        let flag = AtomicBool::new(true);
        let runner = JobRunner::new(TeamId::new(), "test", &flag, RetryPolicy::Spin);
        let mut ctx = ExecutionContext::new();

        let mut calls = 0;
        let mut job = |_: &mut dyn JobContext| {
            calls += 1;
            JobPoll::from(calls == 2)
        };

        let outcome = runner.run(&mut job, &mut ctx);
        assert_eq!(outcome, JobOutcome::Completed { invocations: 2 });
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_flag_cleared_during_invocation_stops_retry() {
        let flag = AtomicBool::new(true);
        let runner = JobRunner::new(TeamId::new(), "test", &flag, RetryPolicy::Yield);
        let mut ctx = ExecutionContext::new();

        let mut calls = 0;
        let mut job = |_: &mut dyn JobContext| {
            calls += 1;
            flag.store(false, Ordering::Release);
            JobPoll::Pending
        };

        let outcome = runner.run(&mut job, &mut ctx);
        assert_eq!(outcome, JobOutcome::Abandoned { invocations: 1 });
        assert!(!outcome.is_completed());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_stopped_team_never_invokes() {
        let flag = AtomicBool::new(false);
        let runner = JobRunner::new(TeamId::new(), "test", &flag, RetryPolicy::Spin);
        let mut ctx = ExecutionContext::new();

        let mut job = |_: &mut dyn JobContext| -> JobPoll { panic!("must not run") };
        assert_eq!(runner.run(&mut job, &mut ctx).invocations(), 0);
    }

    #[test]
    fn test_job_sees_team_and_execution_context() {
        let flag = AtomicBool::new(true);
        let team = TeamId::new();
        let runner = JobRunner::new(team, "test", &flag, RetryPolicy::Spin);
        let mut ctx = ExecutionContext::new();

        let mut job = move |context: &mut dyn JobContext| {
            assert_eq!(context.current_team(), team);
            assert!(context.continue_execution());
            assert!(!context.execution_context().is_managed());
            JobPoll::Complete
        };
        assert!(runner.run(&mut job, &mut ctx).is_completed());
    }
}
