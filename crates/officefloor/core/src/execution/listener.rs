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

use thiserror::Error;

/// Notified once per outermost managed execution on a thread, e.g. to return
/// thread-bound managed objects to their pools.
#[cfg_attr(test, mockall::automock)]
pub trait ThreadCompletionListener: Send + Sync {
    fn thread_complete(&self) -> anyhow::Result<()>;
}

/// A listener that failed while a managed frame completed
#[derive(Error, Debug)]
#[error("Thread completion listener {index} failed: {error}")]
pub struct ListenerFailure {
    /// Position of the listener in the factory's registration order
    pub index: usize,
    pub error: anyhow::Error,
}
