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
use crossbeam_deque::{Injector, Steal};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// FIFO job queue shared by the workers of a team.
///
/// Jobs are pushed to a global injector and taken by whichever idle worker
/// steals first. Workers with nothing to do park on a condition variable for
/// at most the idle wait. Once closed the queue rejects new jobs and never
/// hands out another one.
pub struct JobQueue {
    injector: Injector<Box<dyn Job>>,
    lock: Mutex<()>,
    available: Condvar,
    closed: AtomicBool,
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue")
            .field("pending", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            injector: Injector::new(),
            lock: Mutex::new(()),
            available: Condvar::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.injector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.injector.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Queue a job and wake one idle worker. The job is handed back when the
    /// queue is closed.
    pub fn enqueue(&self, job: Box<dyn Job>) -> Result<(), Box<dyn Job>> {
        let _guard = self.lock.lock();
        if self.is_closed() {
            return Err(job);
        }
        self.injector.push(job);
        self.available.notify_one();
        Ok(())
    }

    /// Take the oldest job, waiting up to `wait` for one to arrive.
    ///
    /// `None` means the wait elapsed or the queue is closed.
    pub fn dequeue(&self, wait: Duration) -> Option<Box<dyn Job>> {
        if let Some(job) = self.steal() {
            return Some(job);
        }

        let mut guard = self.lock.lock();
        // Re-check under the lock so a concurrent enqueue cannot be missed
        if let Some(job) = self.steal() {
            return Some(job);
        }
        if self.is_closed() {
            return None;
        }
        self.available.wait_for(&mut guard, wait);
        drop(guard);

        self.steal()
    }

    /// Close the queue, discarding pending jobs and waking every waiting
    /// worker. Returns the number of discarded jobs.
    pub fn close(&self) -> usize {
        let _guard = self.lock.lock();
        self.closed.store(true, Ordering::Release);

        let mut discarded = 0;
        while self.take().is_some() {
            discarded += 1;
        }
        self.available.notify_all();
        discarded
    }

    fn steal(&self) -> Option<Box<dyn Job>> {
        if self.is_closed() {
            return None;
        }
        self.take()
    }

    fn take(&self) -> Option<Box<dyn Job>> {
        loop {
            match self.injector.steal() {
                Steal::Success(job) => return Some(job),
                Steal::Empty => return None,
                Steal::Retry => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ExecutionContext;
    use crate::team::job::{InvocationContext, JobContext, JobPoll};
    use officefloor_common::TeamId;
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Instant;

    fn tagged(tag: usize, seen: mpsc::Sender<usize>) -> Box<dyn Job> {
        Box::new(move |_: &mut dyn JobContext| {
            let _ = seen.send(tag);
            JobPoll::Complete
        })
    }

    fn run(mut job: Box<dyn Job>) {
        let mut ctx = ExecutionContext::new();
        let working = || true;
        let mut context = InvocationContext::new(TeamId::new(), &working, &mut ctx);
        job.do_job(&mut context);
    }

    #[test]
    fn test_fifo_order() {
        let queue = JobQueue::new();
        let (tx, rx) = mpsc::channel();
        for tag in 0..5 {
            queue.enqueue(tagged(tag, tx.clone())).ok().unwrap();
        }
        assert_eq!(queue.len(), 5);

        while let Some(job) = queue.dequeue(Duration::ZERO) {
            run(job);
        }
        let order: Vec<usize> = rx.try_iter().collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dequeue_times_out_when_empty() {
        let queue = JobQueue::new();
        let start = Instant::now();
        assert!(queue.dequeue(Duration::from_millis(20)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn test_close_discards_and_rejects() {
        let queue = JobQueue::new();
        let (tx, _rx) = mpsc::channel();
        queue.enqueue(tagged(1, tx.clone())).ok().unwrap();
        queue.enqueue(tagged(2, tx.clone())).ok().unwrap();

        assert_eq!(queue.close(), 2);
        assert!(queue.is_closed());
        assert!(queue.enqueue(tagged(3, tx)).is_err());
        assert!(queue.dequeue(Duration::from_millis(1)).is_none());
    }

    #[test]
    fn test_enqueue_wakes_waiting_worker() {
        let queue = Arc::new(JobQueue::new());
        let (tx, rx) = mpsc::channel();

        let worker = {
            let queue = queue.clone();
            thread::spawn(move || queue.dequeue(Duration::from_secs(5)).map(run).is_some())
        };

        thread::sleep(Duration::from_millis(20));
        queue.enqueue(tagged(7, tx)).ok().unwrap();

        assert!(worker.join().unwrap());
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), 7);
    }

    #[test]
    fn test_close_wakes_waiting_worker() {
        let queue = Arc::new(JobQueue::new());
        let worker = {
            let queue = queue.clone();
            thread::spawn(move || {
                let start = Instant::now();
                let job = queue.dequeue(Duration::from_secs(5));
                (job.is_none(), start.elapsed())
            })
        };

        thread::sleep(Duration::from_millis(20));
        queue.close();

        let (empty, waited) = worker.join().unwrap();
        assert!(empty);
        assert!(waited < Duration::from_secs(5));
    }
}
