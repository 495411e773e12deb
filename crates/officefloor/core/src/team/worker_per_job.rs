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
use super::runner::JobRunner;
use super::{Team, join_workers};
use crate::execution::ExecutionContext;
use crate::list::{EntryKey, LinkedListSet};
use crate::thread::ThreadFactory;
use officefloor_common::{OwnerId, RetryPolicy, TeamError, TeamId};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, trace, warn};

type Workers = Arc<Mutex<LinkedListSet<Option<JoinHandle<()>>>>>;

/// Team that spawns a new managed thread for every assigned job.
///
/// Live workers are tracked in a linked list set guarded by the team's
/// lock. A worker removes its own entry when its job is done; stopping the
/// team purges the set and joins whatever is still running.
#[derive(Debug)]
pub struct WorkerPerJobTeam {
    lifecycle: TeamLifecycle,
    thread_factory: ThreadFactory,
    retry: RetryPolicy,
    workers: Workers,
}

impl WorkerPerJobTeam {
    pub fn new(name: impl Into<String>, thread_factory: ThreadFactory) -> Self {
        Self {
            lifecycle: TeamLifecycle::new(name),
            thread_factory,
            retry: RetryPolicy::Spin,
            workers: Arc::new(Mutex::new(LinkedListSet::new(OwnerId::new()))),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Workers whose job has not finished yet
    pub fn active_workers(&self) -> usize {
        self.workers.lock().len()
    }
}

impl Team for WorkerPerJobTeam {
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

    fn assign_job(&self, mut job: Box<dyn Job>, _assigner: Option<TeamId>) -> Result<(), TeamError> {
        let mut workers = self.workers.lock();
        self.lifecycle.ensure_working()?;
        let key = workers.push(None);

        let registry = Arc::clone(&self.workers);
        let continue_working = self.lifecycle.continue_flag();
        let team = self.lifecycle.id();
        let name = self.lifecycle.name().to_string();
        let retry = self.retry;

        let spawned = self.thread_factory.new_thread(move |ctx: &mut ExecutionContext| {
            let runner = JobRunner::new(team, &name, &continue_working, retry);
            runner.run(job.as_mut(), ctx);
            release_worker(&registry, key);
        });

        match spawned {
            Ok(handle) => {
                // The worker may already have released its entry
                if let Some(slot) = workers.get_mut(key) {
                    *slot = Some(handle);
                }
                Ok(())
            }
            Err(err) => {
                let _ = workers.take_entry(key);
                Err(TeamError::Spawn(err))
            }
        }
    }

    fn stop_working(&self) -> Result<(), TeamError> {
        self.lifecycle.stop();

        let handles: Vec<JoinHandle<()>> = {
            let mut workers = self.workers.lock();
            let head = workers.purge_entries();
            let keys: Vec<EntryKey> = workers.chain(head).map(|(key, _)| key).collect();
            keys.into_iter().filter_map(|key| workers.take_entry(key).ok().flatten()).collect()
        };
        if !handles.is_empty() {
            debug!(team = %self.name(), workers = handles.len(), "Joining job workers");
        }
        join_workers(self.id(), self.name(), handles)
    }
}

impl Drop for WorkerPerJobTeam {
    fn drop(&mut self) {
        if let Err(err) = self.stop_working() {
            warn!(team = %self.name(), error = %err, "Worker per job team stopped with errors on drop");
        }
    }
}

fn release_worker(workers: &Mutex<LinkedListSet<Option<JoinHandle<()>>>>, key: EntryKey) {
    // Dropping our own handle detaches the finished thread
    if let Err(err) = workers.lock().take_entry(key) {
        trace!(entry = %key, error = %err, "Worker entry already released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{DirectExecutive, ManagedExecutionFactory};
    use crate::team::job::{JobContext, JobPoll};
    use crate::thread::ThreadFactoryManufacturer;
    use std::sync::mpsc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn team() -> WorkerPerJobTeam {
        let factory = ThreadFactoryManufacturer::new(ManagedExecutionFactory::without_listeners(), None)
            .manufacture_thread_factory("per-job", Arc::new(DirectExecutive));
        WorkerPerJobTeam::new("per-job", factory)
    }

    fn wait_until(condition: impl Fn() -> bool) -> bool {
        let start = Instant::now();
        while !condition() {
            if start.elapsed() > Duration::from_secs(5) {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    #[test]
    fn test_each_job_gets_its_own_thread() {
        let team = team();
        team.start_working().unwrap();

        let (tx, rx) = mpsc::channel();
        for _ in 0..3 {
            let tx = tx.clone();
            let job = Box::new(move |_: &mut dyn JobContext| {
                let _ = tx.send(thread::current().name().map(str::to_string));
                JobPoll::Complete
            });
            team.assign_job(job, None).unwrap();
        }

        let mut names: Vec<String> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["per-job-1", "per-job-2", "per-job-3"]);

        assert!(wait_until(|| team.active_workers() == 0));
        team.stop_working().unwrap();
    }

    #[test]
    fn test_stop_joins_running_workers() {
        let team = team();
        team.start_working().unwrap();

        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let job = Box::new(move |_: &mut dyn JobContext| {
            let _ = started_tx.send(());
            let _ = release_rx.recv_timeout(Duration::from_secs(5));
            JobPoll::Pending
        });
        team.assign_job(job, None).unwrap();
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(team.active_workers(), 1);

        let stopper = thread::spawn({
            let release_tx = release_tx.clone();
            move || {
                thread::sleep(Duration::from_millis(20));
                let _ = release_tx.send(());
            }
        });
        team.stop_working().unwrap();
        stopper.join().unwrap();

        assert_eq!(team.active_workers(), 0);
        assert_eq!(team.state(), TeamState::Stopped);
    }

    #[test]
    fn test_panicked_worker_reported_on_stop() {
        let team = team();
        team.start_working().unwrap();

        let (tx, rx) = mpsc::channel();
        let job = Box::new(move |_: &mut dyn JobContext| -> JobPoll {
            let _ = tx.send(());
            panic!("job failure")
        });
        team.assign_job(job, None).unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        assert!(matches!(team.stop_working(), Err(TeamError::WorkerPanicked(_))));
        team.stop_working().unwrap();
    }

    #[test]
    fn test_drop_with_panicked_worker_does_not_propagate() {
        let team = team();
        team.start_working().unwrap();

        let (tx, rx) = mpsc::channel();
        let job = Box::new(move |_: &mut dyn JobContext| -> JobPoll {
            let _ = tx.send(());
            panic!("job failure")
        });
        team.assign_job(job, None).unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        drop(team);
    }

    #[test]
    fn test_assign_requires_working_team() {
        let team = team();
        let job = Box::new(|_: &mut dyn JobContext| JobPoll::Complete);
        assert!(matches!(team.assign_job(job, None), Err(TeamError::NotStarted(_))));
    }
}
