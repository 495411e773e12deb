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

//! Managed execution
//!
//! Tracks execution frames on a thread so that thread completion listeners
//! fire exactly once per outermost frame:
//! - Explicit per-thread execution context
//! - Executive hook that runs managed executions
//! - Factory and managed execution with the re-entrancy guard

pub mod context;
pub mod executive;
pub mod factory;
pub mod listener;
pub mod managed;

pub use context::ExecutionContext;
pub use executive::{DirectExecutive, Executive};
pub use factory::ManagedExecutionFactory;
pub use listener::{ListenerFailure, ThreadCompletionListener};
pub use managed::{ManagedExecution, ManagedFailure};
