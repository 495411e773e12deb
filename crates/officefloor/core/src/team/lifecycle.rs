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

use officefloor_common::{TeamError, TeamId};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Team lifecycle states. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TeamState {
    Unstarted,
    Working,
    Stopped,
}

impl fmt::Display for TeamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamState::Unstarted => write!(f, "Unstarted"),
            TeamState::Working => write!(f, "Working"),
            TeamState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Lifecycle shared by every team implementation.
///
/// Holds the state machine and the `continue_working` flag that worker loops
/// read between job invocations.
#[derive(Debug)]
pub struct TeamLifecycle {
    id: TeamId,
    name: String,
    state: Mutex<TeamState>,
    continue_working: Arc<AtomicBool>,
}

impl TeamLifecycle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TeamId::new(),
            name: name.into(),
            state: Mutex::new(TeamState::Unstarted),
            continue_working: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> TeamId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> TeamState {
        *self.state.lock()
    }

    /// Move from `Unstarted` to `Working`
    pub fn start(&self) -> Result<(), TeamError> {
        let mut state = self.state.lock();
        match *state {
            TeamState::Unstarted => {
                self.continue_working.store(true, Ordering::Release);
                *state = TeamState::Working;
                info!(team = %self.name, id = %self.id, "Team started working");
                Ok(())
            }
            TeamState::Working => Err(TeamError::AlreadyStarted(self.id)),
            TeamState::Stopped => Err(TeamError::Stopped(self.id)),
        }
    }

    /// Error unless the team accepts jobs
    pub fn ensure_working(&self) -> Result<(), TeamError> {
        match *self.state.lock() {
            TeamState::Working => Ok(()),
            TeamState::Unstarted => Err(TeamError::NotStarted(self.id)),
            TeamState::Stopped => Err(TeamError::Stopped(self.id)),
        }
    }

    /// Clear the continue flag, then mark the team stopped.
    ///
    /// Returns `false` when the team had already stopped.
    pub fn stop(&self) -> bool {
        let mut state = self.state.lock();
        if *state == TeamState::Stopped {
            return false;
        }
        self.continue_working.store(false, Ordering::Release);
        *state = TeamState::Stopped;
        info!(team = %self.name, id = %self.id, "Team stopped working");
        true
    }

    pub fn is_continue_working(&self) -> bool {
        self.continue_working.load(Ordering::Acquire)
    }

    pub fn continue_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.continue_working)
    }
}
