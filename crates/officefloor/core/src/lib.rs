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

//! OfficeFloor execution core
//!
//! This crate provides the cooperative multi-threaded execution model:
//! - Owner-checked linked list sets for bookkeeping of owned entries
//! - Managed executions that fire thread completion listeners exactly once
//!   per outermost frame
//! - Thread factories that route every spawned thread through a managed
//!   execution
//! - Teams that drive jobs to completion (thread pool, dedicated thread,
//!   thread per job, caller thread and process context)

pub mod execution; // Managed execution and completion listeners
pub mod list; // Owner-checked linked list sets
pub mod team; // Teams, jobs and the worker loop
pub mod thread; // Managed thread factories

pub use officefloor_common::{ConfigError, ExecutionConfig, ListError, OwnerId, RetryPolicy, TeamError, TeamId};

pub use execution::{
    DirectExecutive, ExecutionContext, Executive, ListenerFailure, ManagedExecution, ManagedExecutionFactory, ManagedFailure,
    ThreadCompletionListener,
};
pub use list::{ComparatorLinkedListSet, EntryComparator, EntryKey, LinkedListSet, ListEntry};
pub use team::{
    ExecutorTeam, Job, JobContext, JobOutcome, JobPoll, JobQueue, PassiveTeam, ProcessContextTeam, Team, TeamLifecycle, TeamState,
    WorkerPerJobTeam,
};
pub use thread::{ThreadDecorator, ThreadFactory, ThreadFactoryManufacturer, ThreadSettings};
