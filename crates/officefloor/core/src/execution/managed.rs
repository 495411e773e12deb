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
use super::listener::{ListenerFailure, ThreadCompletionListener};
use metrics::counter;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, warn};

type BoxedExecution<R, E> = Box<dyn FnOnce(&mut ExecutionContext) -> Result<R, E> + Send>;

/// Outcome of a managed execution that did not succeed cleanly.
///
/// The execution's own error always wins over listener failures; failures of
/// listeners that ran after it are carried alongside.
#[derive(Error, Debug)]
pub enum ManagedFailure<E> {
    #[error("Managed execution failed: {error}")]
    Execution {
        #[source]
        error: E,
        listener_failures: Vec<ListenerFailure>,
    },
    #[error("{} thread completion listener(s) failed", .0.len())]
    Listeners(Vec<ListenerFailure>),
    #[error("Executive did not run the managed execution")]
    NotExecuted,
}

impl<E> ManagedFailure<E> {
    /// The execution's own error, if it failed
    pub fn into_execution_error(self) -> Option<E> {
        match self {
            Self::Execution { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn listener_failures(&self) -> &[ListenerFailure] {
        match self {
            Self::Execution { listener_failures, .. } => listener_failures.as_slice(),
            Self::Listeners(failures) => failures.as_slice(),
            Self::NotExecuted => &[],
        }
    }
}

/// Unit of work that participates in the thread completion protocol.
///
/// # Lifecycle
/// 1. Created by a `ManagedExecutionFactory`
/// 2. Handed to the `Executive` through `managed_execute`
/// 3. Run by `execute`, which notifies the listeners when it is the
///    outermost managed frame on the context
pub struct ManagedExecution<R, E> {
    execution: BoxedExecution<R, E>,
    executive: Arc<dyn Executive>,
    listeners: Arc<[Arc<dyn ThreadCompletionListener>]>,
}

impl<R, E> fmt::Debug for ManagedExecution<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedExecution").field("listeners", &self.listeners.len()).finish()
    }
}

impl<R, E> ManagedExecution<R, E> {
    pub(crate) fn new(execution: BoxedExecution<R, E>, executive: Arc<dyn Executive>, listeners: Arc<[Arc<dyn ThreadCompletionListener>]>) -> Self {
        Self {
            execution,
            executive,
            listeners,
        }
    }

    /// Run through the executive.
    ///
    /// # Errors
    /// * `NotExecuted` - the executive returned without invoking the execution
    /// * otherwise as for [`execute`](Self::execute)
    pub fn managed_execute(self, ctx: &mut ExecutionContext) -> Result<R, ManagedFailure<E>> {
        let executive = Arc::clone(&self.executive);
        let mut pending = Some(self);
        let mut outcome = None;

        executive.manage_execution(ctx, &mut |inner: &mut ExecutionContext| {
            if let Some(execution) = pending.take() {
                outcome = Some(execution.execute(inner));
            }
        });

        outcome.unwrap_or(Err(ManagedFailure::NotExecuted))
    }

    /// Run the wrapped execution on the calling thread.
    ///
    /// When `ctx` is not yet managed this call becomes the outermost frame:
    /// it marks the context, runs the execution and then notifies every
    /// listener and clears the mark, also while unwinding from a panic.
    /// Nested calls on a managed context only run the execution.
    pub fn execute(self, ctx: &mut ExecutionContext) -> Result<R, ManagedFailure<E>> {
        let Self { execution, listeners, .. } = self;

        if ctx.is_managed() {
            return execution(ctx).map_err(|error| ManagedFailure::Execution {
                error,
                listener_failures: Vec::new(),
            });
        }

        let mut frame = ManagedFrame::enter(ctx, &listeners);
        let result = execution(frame.context());
        let listener_failures = frame.complete();

        match result {
            Ok(value) if listener_failures.is_empty() => Ok(value),
            Ok(_) => Err(ManagedFailure::Listeners(listener_failures)),
            Err(error) => Err(ManagedFailure::Execution { error, listener_failures }),
        }
    }
}

/// Outermost managed frame on a context
struct ManagedFrame<'a> {
    ctx: &'a mut ExecutionContext,
    listeners: &'a [Arc<dyn ThreadCompletionListener>],
    notified: bool,
}

impl<'a> ManagedFrame<'a> {
    fn enter(ctx: &'a mut ExecutionContext, listeners: &'a [Arc<dyn ThreadCompletionListener>]) -> Self {
        ctx.enter_frame();
        Self {
            ctx,
            listeners,
            notified: false,
        }
    }

    fn context(&mut self) -> &mut ExecutionContext {
        &mut *self.ctx
    }

    fn complete(mut self) -> Vec<ListenerFailure> {
        self.notify()
    }

    // Every listener runs even if an earlier one fails
    fn notify(&mut self) -> Vec<ListenerFailure> {
        self.notified = true;
        let mut failures = Vec::new();
        for (index, listener) in self.listeners.iter().enumerate() {
            if let Err(error) = listener.thread_complete() {
                warn!(listener = index, error = %error, "Thread completion listener failed");
                counter!("officefloor_listener_failures", 1);
                failures.push(ListenerFailure { index, error });
            }
        }
        self.ctx.leave_frame();
        failures
    }
}

impl Drop for ManagedFrame<'_> {
    fn drop(&mut self) {
        if !self.notified {
            let failures = self.notify();
            if !failures.is_empty() {
                error!(failures = failures.len(), "Thread completion listeners failed while unwinding");
            }
        }
    }
}
