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

use crate::ids::{OwnerId, TeamId};
use thiserror::Error;

/// Misuse of a linked list set.
///
/// Every variant is a programming error in the caller. None of them is
/// retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListError {
    #[error("Entry owned by {entry_owner} used with list owned by {list_owner}")]
    WrongOwner { list_owner: OwnerId, entry_owner: OwnerId },
    #[error("Entry {0} is already in the list")]
    AlreadyInList(usize),
    #[error("Entry {0} is not in the list")]
    NotInList(usize),
    #[error("Entry {0} is stale or unknown to the list")]
    UnknownEntry(usize),
}

/// Errors raised by team lifecycle and job assignment
#[derive(Error, Debug)]
pub enum TeamError {
    #[error("{0} has not started working")]
    NotStarted(TeamId),
    #[error("{0} is already working")]
    AlreadyStarted(TeamId),
    #[error("{0} has stopped working")]
    Stopped(TeamId),
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Worker thread of {0} panicked")]
    WorkerPanicked(TeamId),
}

/// Invalid execution configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue { key: &'static str, value: String, reason: String },
}
