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

use crate::execution::ExecutionContext;
use officefloor_common::TeamId;
use serde::Serialize;
use std::time::Instant;

/// Result of one invocation of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JobPoll {
    /// Not finished, re-drive the job on the same team
    Pending,
    Complete,
}

impl JobPoll {
    pub fn is_complete(self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl From<bool> for JobPoll {
    fn from(complete: bool) -> Self {
        if complete { Self::Complete } else { Self::Pending }
    }
}

/// View a job has of the worker driving it
pub trait JobContext {
    /// Whether the team is still working. A job that loops internally
    /// should stop once this is `false`.
    fn continue_execution(&self) -> bool;

    fn current_team(&self) -> TeamId;

    /// Time of the current invocation, captured on first use and reused for
    /// the rest of the invocation
    fn time(&mut self) -> Instant;

    fn execution_context(&mut self) -> &mut ExecutionContext;
}

/// Unit of schedulable work
pub trait Job: Send {
    fn do_job(&mut self, context: &mut dyn JobContext) -> JobPoll;
}

impl<F> Job for F
where
    F: FnMut(&mut dyn JobContext) -> JobPoll + Send,
{
    fn do_job(&mut self, context: &mut dyn JobContext) -> JobPoll {
        self(context)
    }
}

/// Job context of a single job invocation
pub(crate) struct InvocationContext<'a> {
    team: TeamId,
    continue_working: &'a dyn Fn() -> bool,
    ctx: &'a mut ExecutionContext,
    time: Option<Instant>,
}

impl<'a> InvocationContext<'a> {
    pub(crate) fn new(team: TeamId, continue_working: &'a dyn Fn() -> bool, ctx: &'a mut ExecutionContext) -> Self {
        Self {
            team,
            continue_working,
            ctx,
            time: None,
        }
    }

    /// Start the next invocation of the job
    pub(crate) fn reset(&mut self) {
        self.time = None;
    }
}

impl JobContext for InvocationContext<'_> {
    fn continue_execution(&self) -> bool {
        (self.continue_working)()
    }

    fn current_team(&self) -> TeamId {
        self.team
    }

    fn time(&mut self) -> Instant {
        *self.time.get_or_insert_with(Instant::now)
    }

    fn execution_context(&mut self) -> &mut ExecutionContext {
        &mut *self.ctx
    }
}
