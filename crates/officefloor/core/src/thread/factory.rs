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

use crate::execution::{ExecutionContext, Executive, ManagedExecutionFactory};
use std::convert::Infallible;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{trace, warn};

/// Settings of a thread about to be spawned, open to the decorator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSettings {
    pub name: String,
    pub stack_size: Option<usize>,
}

/// Hook applied to every thread a factory creates
pub type ThreadDecorator = Arc<dyn Fn(&mut ThreadSettings) + Send + Sync>;

/// Produces thread factories bound to an executive
#[derive(Clone)]
pub struct ThreadFactoryManufacturer {
    factory: ManagedExecutionFactory,
    decorator: Option<ThreadDecorator>,
}

impl fmt::Debug for ThreadFactoryManufacturer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadFactoryManufacturer")
            .field("factory", &self.factory)
            .field("decorated", &self.decorator.is_some())
            .finish()
    }
}

impl ThreadFactoryManufacturer {
    pub fn new(factory: ManagedExecutionFactory, decorator: Option<ThreadDecorator>) -> Self {
        Self { factory, decorator }
    }

    /// Thread factory for the thread group `name`
    pub fn manufacture_thread_factory(&self, name: &str, executive: Arc<dyn Executive>) -> ThreadFactory {
        ThreadFactory {
            group: Arc::from(name),
            next_index: Arc::new(AtomicUsize::new(0)),
            executive,
            factory: self.factory.clone(),
            decorator: self.decorator.clone(),
        }
    }
}

/// Spawns named threads whose body runs as a managed execution.
///
/// Threads are named `<group>-<n>`. Indices come from an atomic counter, so
/// names are unique but concurrent callers may observe them out of creation
/// order. The spawned thread owns one `ExecutionContext` for its lifetime.
///
/// Rust threads have no daemon flag; callers keep the returned handles and
/// join them so the process does not outlive its workers unnoticed.
#[derive(Clone)]
pub struct ThreadFactory {
    group: Arc<str>,
    next_index: Arc<AtomicUsize>,
    executive: Arc<dyn Executive>,
    factory: ManagedExecutionFactory,
    decorator: Option<ThreadDecorator>,
}

impl fmt::Debug for ThreadFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadFactory")
            .field("group", &self.group)
            .field("created", &self.threads_created())
            .finish()
    }
}

impl ThreadFactory {
    pub fn group_name(&self) -> &str {
        &self.group
    }

    pub fn threads_created(&self) -> usize {
        self.next_index.load(Ordering::Relaxed)
    }

    /// Spawn a thread running `runnable` inside a managed execution
    pub fn new_thread<F>(&self, runnable: F) -> io::Result<JoinHandle<()>>
    where
        F: FnOnce(&mut ExecutionContext) + Send + 'static,
    {
        let index = self.next_index.fetch_add(1, Ordering::Relaxed) + 1;
        let mut settings = ThreadSettings {
            name: format!("{}-{}", self.group, index),
            stack_size: None,
        };
        if let Some(decorator) = &self.decorator {
            decorator(&mut settings);
        }

        let execution = self.factory.create_managed_execution(Arc::clone(&self.executive), move |ctx| {
            runnable(ctx);
            Ok::<(), Infallible>(())
        });

        let mut builder = thread::Builder::new().name(settings.name.clone());
        if let Some(stack_size) = settings.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let name = settings.name;
        builder.spawn(move || {
            let mut ctx = ExecutionContext::new();
            trace!(thread = %name, "Managed thread started");
            if let Err(failure) = execution.managed_execute(&mut ctx) {
                warn!(thread = %name, error = %failure, "Managed thread completed with failures");
            }
            trace!(thread = %name, "Managed thread finished");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{DirectExecutive, ThreadCompletionListener};
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingListener(AtomicUsize);

    impl ThreadCompletionListener for CountingListener {
        fn thread_complete(&self) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn manufacturer(listener: Arc<CountingListener>, decorator: Option<ThreadDecorator>) -> ThreadFactoryManufacturer {
        let listener: Arc<dyn ThreadCompletionListener> = listener;
        ThreadFactoryManufacturer::new(ManagedExecutionFactory::new(vec![listener]), decorator)
    }

    #[test]
    fn test_threads_named_with_increasing_suffix() {
        let listener = Arc::new(CountingListener::default());
        let factory = manufacturer(listener, None).manufacture_thread_factory("officefloor-io", Arc::new(DirectExecutive));

        let names = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..3 {
            let names = names.clone();
            let handle = factory
                .new_thread(move |_| {
                    let name = thread::current().name().map(str::to_string);
                    names.lock().unwrap().push(name);
                })
                .unwrap();
            handle.join().unwrap();
        }

        let names = names.lock().unwrap().clone();
        assert_eq!(
            names,
            vec![
                Some("officefloor-io-1".to_string()),
                Some("officefloor-io-2".to_string()),
                Some("officefloor-io-3".to_string()),
            ]
        );
        assert_eq!(factory.threads_created(), 3);
        assert_eq!(factory.group_name(), "officefloor-io");
    }

    #[test]
    fn test_thread_body_runs_managed_and_notifies_once() {
        let listener = Arc::new(CountingListener::default());
        let factory = manufacturer(listener.clone(), None).manufacture_thread_factory("worker", Arc::new(DirectExecutive));

        let handle = factory
            .new_thread(|ctx| {
                assert!(ctx.is_managed());
            })
            .unwrap();
        handle.join().unwrap();

        assert_eq!(listener.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_decorator_applied_before_spawn() {
        let decorator: ThreadDecorator = Arc::new(|settings: &mut ThreadSettings| {
            settings.name = format!("decorated-{}", settings.name);
            settings.stack_size = Some(256 * 1024);
        });
        let listener = Arc::new(CountingListener::default());
        let factory = manufacturer(listener, Some(decorator)).manufacture_thread_factory("team", Arc::new(DirectExecutive));

        let handle = factory.new_thread(|_| {}).unwrap();
        assert_eq!(handle.thread().name(), Some("decorated-team-1"));
        handle.join().unwrap();
    }

    #[test]
    fn test_factories_count_independently() {
        let listener = Arc::new(CountingListener::default());
        let manufacturer = manufacturer(listener, None);
        let first = manufacturer.manufacture_thread_factory("a", Arc::new(DirectExecutive));
        let second = manufacturer.manufacture_thread_factory("b", Arc::new(DirectExecutive));

        first.new_thread(|_| {}).unwrap().join().unwrap();
        first.new_thread(|_| {}).unwrap().join().unwrap();
        let handle = second.new_thread(|_| {}).unwrap();
        assert_eq!(handle.thread().name(), Some("b-1"));
        handle.join().unwrap();
    }
}
