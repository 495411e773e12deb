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

use super::job::Job;
use super::lifecycle::{TeamLifecycle, TeamState};
use super::queue::JobQueue;
use super::runner::JobRunner;
use super::{Team, join_workers};
use crate::execution::{ExecutionContext, Executive};
use crate::thread::{ThreadFactory, ThreadFactoryManufacturer};
use officefloor_common::{ExecutionConfig, RetryPolicy, TeamError, TeamId};
use metrics::counter;
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Team backed by a fixed pool of worker threads pulling from one queue.
///
/// Workers are created by the team's `ThreadFactory`, so each of them runs
/// inside a managed execution and fires the completion listeners when it
/// exits. A job that panics is dropped and its worker moves on to the next
/// job; the panic is reported when the team stops.
#[derive(Debug)]
pub struct ExecutorTeam {
    lifecycle: TeamLifecycle,
    size: usize,
    thread_factory: ThreadFactory,
    queue: Arc<JobQueue>,
    idle_wait: Duration,
    retry: RetryPolicy,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_threads: Mutex<Vec<ThreadId>>,
    job_panics: Arc<AtomicUsize>,
}

impl ExecutorTeam {
    /// Team with `size` workers
    pub fn fixed(name: impl Into<String>, size: usize, thread_factory: ThreadFactory, config: &ExecutionConfig) -> Self {
        let name = name.into();
        let size = if size == 0 {
            warn!(team = %name, "Executor team requires at least one worker, using 1");
            1
        } else {
            size
        };

        Self {
            lifecycle: TeamLifecycle::new(name),
            size,
            thread_factory,
            queue: Arc::new(JobQueue::new()),
            idle_wait: config.idle_wait(),
            retry: config.retry,
            workers: Mutex::new(Vec::new()),
            worker_threads: Mutex::new(Vec::new()),
            job_panics: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Team with a single dedicated worker
    pub fn one_person(name: impl Into<String>, thread_factory: ThreadFactory, config: &ExecutionConfig) -> Self {
        Self::fixed(name, 1, thread_factory, config)
    }

    /// Team of `config.team_size` workers named after the configured thread
    /// group of `name`
    pub fn from_config(
        name: &str,
        manufacturer: &ThreadFactoryManufacturer,
        executive: Arc<dyn Executive>,
        config: &ExecutionConfig,
    ) -> Self {
        let thread_factory = manufacturer.manufacture_thread_factory(&config.thread_group(name), executive);
        Self::fixed(name, config.team_size, thread_factory, config)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Jobs waiting for a worker
    pub fn pending_jobs(&self) -> usize {
        self.queue.len()
    }

    fn is_worker_thread(&self) -> bool {
        self.worker_threads.lock().contains(&thread::current().id())
    }

    fn spawn_worker(&self) -> Result<JoinHandle<()>, TeamError> {
        let queue = Arc::clone(&self.queue);
        let job_panics = Arc::clone(&self.job_panics);
        let continue_working = self.lifecycle.continue_flag();
        let team = self.lifecycle.id();
        let name = self.lifecycle.name().to_string();
        let idle_wait = self.idle_wait;
        let retry = self.retry;

        let handle = self.thread_factory.new_thread(move |ctx: &mut ExecutionContext| {
            let runner = JobRunner::new(team, &name, &continue_working, retry);
            debug!(team = %name, "Worker started");
            while continue_working.load(Ordering::Acquire) {
                match queue.dequeue(idle_wait) {
                    Some(mut job) => {
                        let ran = panic::catch_unwind(AssertUnwindSafe(|| runner.run(job.as_mut(), ctx)));
                        if ran.is_err() {
                            job_panics.fetch_add(1, Ordering::AcqRel);
                            error!(team = %name, "Job panicked, worker continues with the next job");
                            counter!("officefloor_job_panics", 1, "team" => name.clone());
                        }
                    }
                    None if queue.is_closed() => break,
                    None => {}
                }
            }
            debug!(team = %name, "Worker exiting");
        })?;
        Ok(handle)
    }
}

impl Team for ExecutorTeam {
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
        // Held across spawning so a concurrent stop joins every worker
        let mut workers = self.workers.lock();
        self.lifecycle.start()?;

        for _ in 0..self.size {
            match self.spawn_worker() {
                Ok(handle) => {
                    self.worker_threads.lock().push(handle.thread().id());
                    workers.push(handle);
                }
                Err(err) => {
                    warn!(team = %self.name(), error = %err, "Failed to spawn worker, stopping team");
                    drop(workers);
                    // The spawn failure is reported, not a worker panic
                    let _ = self.stop_working();
                    return Err(err);
                }
            }
        }
        debug!(team = %self.name(), workers = self.size, "Executor team workers spawned");
        Ok(())
    }

    fn assign_job(&self, job: Box<dyn Job>, assigner: Option<TeamId>) -> Result<(), TeamError> {
        self.lifecycle.ensure_working()?;
        if let Some(assigner) = assigner {
            debug!(team = %self.name(), assigner = %assigner, "Job assigned by team");
        }
        self.queue.enqueue(job).map_err(|_| TeamError::Stopped(self.id()))
    }

    fn stop_working(&self) -> Result<(), TeamError> {
        if self.lifecycle.stop() {
            let discarded = self.queue.close();
            if discarded > 0 {
                debug!(team = %self.name(), jobs = discarded, "Discarded pending jobs");
            }
        }

        // Held across the join so every caller returns after the workers exit
        let mut workers = match self.workers.try_lock() {
            Some(workers) => workers,
            // A worker stopping its own team cannot wait on its own join
            None if self.is_worker_thread() => return Ok(()),
            None => self.workers.lock(),
        };
        let handles = std::mem::take(&mut *workers);
        let joined = join_workers(self.id(), self.name(), handles);

        let panics = self.job_panics.swap(0, Ordering::AcqRel);
        joined?;
        if panics > 0 {
            error!(team = %self.name(), jobs = panics, "Jobs panicked on team workers");
            return Err(TeamError::WorkerPanicked(self.id()));
        }
        Ok(())
    }
}

impl Drop for ExecutorTeam {
    fn drop(&mut self) {
        if let Err(err) = self.stop_working() {
            warn!(team = %self.name(), error = %err, "Executor team stopped with errors on drop");
        }
    }
}
