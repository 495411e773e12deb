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

/// State of the execution running on one thread.
///
/// Passed by `&mut` through every managed execution, team worker loop and
/// job, so nested executions on the same thread observe the frame that is
/// already managing it.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    managed: bool,
    completed_frames: u64,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an outer managed execution frame is active
    pub fn is_managed(&self) -> bool {
        self.managed
    }

    /// Number of outermost managed frames completed on this context
    pub fn completed_frames(&self) -> u64 {
        self.completed_frames
    }

    pub(crate) fn enter_frame(&mut self) {
        self.managed = true;
    }

    pub(crate) fn leave_frame(&mut self) {
        self.managed = false;
        self.completed_frames += 1;
    }
}
