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

use super::Team;
use super::job::Job;
use super::lifecycle::{TeamLifecycle, TeamState};
use super::runner::JobRunner;
use crate::execution::ExecutionContext;
use officefloor_common::{RetryPolicy, TeamError, TeamId};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, trace};

/// Team that executes work on the thread of the process that triggered it.
///
/// A thread becomes a process context thread for the duration of
/// [`run_in_context`](ProcessContextTeam::run_in_context). Jobs assigned to
/// the team from that thread are queued against it and run inline, with the
/// same `ExecutionContext`, before `run_in_context` returns. No thread hop
/// takes place.
///
/// Assignments from any other thread go to the delegate team, or run
/// passively on the assigning thread when there is no delegate.
pub struct ProcessContextTeam {
    lifecycle: TeamLifecycle,
    retry: RetryPolicy,
    bindings: Mutex<HashMap<ThreadId, VecDeque<Box<dyn Job>>>>,
    delegate: Option<Arc<dyn Team>>,
}

impl fmt::Debug for ProcessContextTeam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessContextTeam")
            .field("lifecycle", &self.lifecycle)
            .field("bound_threads", &self.bound_threads())
            .field("delegate", &self.delegate.as_ref().map(|team| team.id()))
            .finish()
    }
}

impl ProcessContextTeam {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            lifecycle: TeamLifecycle::new(name),
            retry: RetryPolicy::Spin,
            bindings: Mutex::new(HashMap::new()),
            delegate: None,
        }
    }

    /// Team that hands jobs from unbound threads to `delegate`
    pub fn with_delegate(name: impl Into<String>, delegate: Arc<dyn Team>) -> Self {
        Self {
            delegate: Some(delegate),
            ..Self::new(name)
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Whether the calling thread is currently bound as a process context
    /// thread of this team
    pub fn is_context_thread(&self) -> bool {
        self.bindings.lock().contains_key(&thread::current().id())
    }

    pub fn bound_threads(&self) -> usize {
        self.bindings.lock().len()
    }

    /// Run `process` with the calling thread bound as a process context
    /// thread, then drain the jobs it assigned to this team.
    ///
    /// A nested call on an already bound thread just runs `process`; the
    /// outermost call drains. The binding is released on return and while
    /// unwinding.
    pub fn run_in_context<R, F>(&self, ctx: &mut ExecutionContext, process: F) -> Result<R, TeamError>
    where
        F: FnOnce(&mut ExecutionContext) -> R,
    {
        self.lifecycle.ensure_working()?;
        let thread = thread::current().id();

        {
            let mut bindings = self.bindings.lock();
            if bindings.contains_key(&thread) {
                drop(bindings);
                trace!(team = %self.name(), "Nested process context, running inline");
                return Ok(process(ctx));
            }
            bindings.insert(thread, VecDeque::new());
        }
        let _binding = Binding { team: self, thread };

        let result = process(ctx);
        self.drain(thread, ctx);
        Ok(result)
    }

    fn drain(&self, thread: ThreadId, ctx: &mut ExecutionContext) {
        let continue_working = self.lifecycle.continue_flag();
        let runner = JobRunner::new(self.id(), self.name(), &continue_working, self.retry);

        let mut drained = 0usize;
        loop {
            // Lock released before the job runs so it may assign further jobs
            let next = self.bindings.lock().get_mut(&thread).and_then(VecDeque::pop_front);
            let Some(mut job) = next else {
                break;
            };
            runner.run(job.as_mut(), ctx);
            drained += 1;
        }
        if drained > 0 {
            trace!(team = %self.name(), jobs = drained, "Drained process context jobs");
        }
    }

    /// Queue against the calling thread's binding, handing the job back when
    /// the thread is not bound
    fn queue_if_bound(&self, job: Box<dyn Job>) -> Result<(), Box<dyn Job>> {
        match self.bindings.lock().get_mut(&thread::current().id()) {
            Some(jobs) => {
                jobs.push_back(job);
                Ok(())
            }
            None => Err(job),
        }
    }

    fn run_passively(&self, ctx: &mut ExecutionContext, mut job: Box<dyn Job>) {
        let continue_working = self.lifecycle.continue_flag();
        JobRunner::new(self.id(), self.name(), &continue_working, self.retry).run(job.as_mut(), ctx);
    }
}

impl Team for ProcessContextTeam {
    fn id(&self) -> TeamId {
        self.lifecycle.id()
    }

    fn name(&self) -> &str {
        self.lifecycle.name()
    }

    fn state(&self) -> TeamState {
        self.lifecycle.state()
    }

    fn start_working(&self) -> Result<(), TeamError> {
        self.lifecycle.start()
    }

    fn assign_job(&self, job: Box<dyn Job>, assigner: Option<TeamId>) -> Result<(), TeamError> {
        self.lifecycle.ensure_working()?;
        let job = match self.queue_if_bound(job) {
            Ok(()) => return Ok(()),
            Err(job) => job,
        };
        match &self.delegate {
            Some(delegate) => delegate.assign_job(job, assigner),
            None => {
                let mut ctx = ExecutionContext::new();
                self.run_passively(&mut ctx, job);
                Ok(())
            }
        }
    }

    fn assign_job_in(&self, ctx: &mut ExecutionContext, job: Box<dyn Job>, assigner: Option<TeamId>) -> Result<(), TeamError> {
        self.lifecycle.ensure_working()?;
        let job = match self.queue_if_bound(job) {
            Ok(()) => return Ok(()),
            Err(job) => job,
        };
        match &self.delegate {
            Some(delegate) => delegate.assign_job_in(ctx, job, assigner),
            None => {
                self.run_passively(ctx, job);
                Ok(())
            }
        }
    }

    fn stop_working(&self) -> Result<(), TeamError> {
        self.lifecycle.stop();
        Ok(())
    }
}

/// Releases a thread's binding, discarding jobs that were never drained
struct Binding<'a> {
    team: &'a ProcessContextTeam,
    thread: ThreadId,
}

impl Drop for Binding<'_> {
    fn drop(&mut self) {
        if let Some(jobs) = self.team.bindings.lock().remove(&self.thread)
            && !jobs.is_empty()
        {
            debug!(team = %self.team.name(), jobs = jobs.len(), "Discarding undrained process context jobs");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::job::{JobContext, JobPoll};
    use crate::team::passive::PassiveTeam;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    fn working(team: ProcessContextTeam) -> Arc<ProcessContextTeam> {
        team.start_working().unwrap();
        Arc::new(team)
    }

    fn recording_job(tx: mpsc::Sender<ThreadId>) -> Box<dyn Job> {
        Box::new(move |_: &mut dyn JobContext| {
            let _ = tx.send(thread::current().id());
            JobPoll::Complete
        })
    }

    #[test]
    fn test_jobs_run_on_context_thread_after_process() {
        let team = working(ProcessContextTeam::new("context"));
        let (tx, rx) = mpsc::channel();
        let mut ctx = ExecutionContext::new();

        let value = team
            .run_in_context(&mut ctx, |_| {
                assert!(team.is_context_thread());
                team.assign_job(recording_job(tx.clone()), None).unwrap();
                // Queued until the process returns
                assert!(rx.try_recv().is_err());
                42
            })
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(rx.try_recv().unwrap(), thread::current().id());
        assert!(!team.is_context_thread());
        assert_eq!(team.bound_threads(), 0);
    }

    #[test]
    fn test_foreign_thread_is_not_context_thread() {
        let team = working(ProcessContextTeam::new("context"));
        let mut ctx = ExecutionContext::new();

        team.run_in_context(&mut ctx, |_| {
            let other = Arc::clone(&team);
            let seen = thread::spawn(move || other.is_context_thread()).join().unwrap();
            assert!(!seen);
            assert_eq!(team.bound_threads(), 1);
        })
        .unwrap();
    }

    #[test]
    fn test_nested_context_drains_once_at_outermost() {
        let team = working(ProcessContextTeam::new("context"));
        let count = Arc::new(AtomicUsize::new(0));
        let mut ctx = ExecutionContext::new();

        team.run_in_context(&mut ctx, |ctx| {
            team.run_in_context(ctx, |_| {
                let count = count.clone();
                let job = Box::new(move |_: &mut dyn JobContext| {
                    count.fetch_add(1, Ordering::SeqCst);
                    JobPoll::Complete
                });
                team.assign_job(job, None).unwrap();
            })
            .unwrap();
            assert_eq!(count.load(Ordering::SeqCst), 0);
            assert!(team.is_context_thread());
        })
        .unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_job_assigned_while_draining_runs_inline() {
        let team = working(ProcessContextTeam::new("context"));
        let (tx, rx) = mpsc::channel();
        let mut ctx = ExecutionContext::new();

        team.run_in_context(&mut ctx, |_| {
            let inner_team = Arc::clone(&team);
            let tx = tx.clone();
            let job = Box::new(move |_: &mut dyn JobContext| {
                inner_team.assign_job(recording_job(tx.clone()), None).unwrap();
                JobPoll::Complete
            });
            team.assign_job(job, None).unwrap();
        })
        .unwrap();

        assert_eq!(rx.try_recv().unwrap(), thread::current().id());
    }

    #[test]
    fn test_unbound_thread_without_delegate_runs_passively() {
        let team = working(ProcessContextTeam::new("context"));
        let (tx, rx) = mpsc::channel();
        team.assign_job(recording_job(tx), None).unwrap();
        assert_eq!(rx.try_recv().unwrap(), thread::current().id());
    }

    #[test]
    fn test_unbound_thread_forwards_to_delegate() {
        let delegate = Arc::new(PassiveTeam::new("delegate"));
        let team = working(ProcessContextTeam::with_delegate("context", delegate.clone()));

        // The delegate has not started, so forwarding surfaces its error
        let (tx, _rx) = mpsc::channel();
        assert!(matches!(team.assign_job(recording_job(tx.clone()), None), Err(TeamError::NotStarted(id)) if id == delegate.id()));

        delegate.start_working().unwrap();
        team.assign_job(recording_job(tx), None).unwrap();
    }

    #[test]
    fn test_run_in_context_requires_working_team() {
        let team = ProcessContextTeam::new("context");
        let mut ctx = ExecutionContext::new();
        assert!(matches!(team.run_in_context(&mut ctx, |_| ()), Err(TeamError::NotStarted(_))));
    }

    #[test]
    fn test_binding_released_on_panic() {
        let team = working(ProcessContextTeam::new("context"));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut ctx = ExecutionContext::new();
            let _ = team.run_in_context::<(), _>(&mut ctx, |_| panic!("process failed"));
        }));
        assert!(result.is_err());
        assert_eq!(team.bound_threads(), 0);
    }
}
