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

use super::context::ExecutionContext;

/// Runs managed executions on behalf of the runtime.
///
/// An implementation may wrap the execution (accounting, isolation) but must
/// invoke it at most once, on the calling thread, with the context it is
/// given.
pub trait Executive: Send + Sync {
    fn manage_execution(&self, ctx: &mut ExecutionContext, execution: &mut dyn FnMut(&mut ExecutionContext));
}

/// Executive that invokes the execution immediately
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectExecutive;

impl Executive for DirectExecutive {
    fn manage_execution(&self, ctx: &mut ExecutionContext, execution: &mut dyn FnMut(&mut ExecutionContext)) {
        execution(ctx);
    }
}
