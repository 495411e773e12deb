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
use super::executive::Executive;
use super::listener::ThreadCompletionListener;
use super::managed::ManagedExecution;
use std::fmt;
use std::sync::Arc;

/// Creates managed executions that share one set of completion listeners
#[derive(Clone)]
pub struct ManagedExecutionFactory {
    listeners: Arc<[Arc<dyn ThreadCompletionListener>]>,
}

impl fmt::Debug for ManagedExecutionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedExecutionFactory").field("listeners", &self.listeners.len()).finish()
    }
}

impl Default for ManagedExecutionFactory {
    fn default() -> Self {
        Self::without_listeners()
    }
}

impl ManagedExecutionFactory {
    /// Listeners are notified in the given order
    pub fn new(listeners: Vec<Arc<dyn ThreadCompletionListener>>) -> Self {
        Self { listeners: listeners.into() }
    }

    pub fn without_listeners() -> Self {
        Self::new(Vec::new())
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Wrap `execution` so that running it through `executive` takes part in
    /// the thread completion protocol
    pub fn create_managed_execution<R, E, F>(&self, executive: Arc<dyn Executive>, execution: F) -> ManagedExecution<R, E>
    where
        F: FnOnce(&mut ExecutionContext) -> Result<R, E> + Send + 'static,
    {
        ManagedExecution::new(Box::new(execution), executive, Arc::clone(&self.listeners))
    }
}
