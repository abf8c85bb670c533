// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Management of the server's threads.
//!
//! Every long-running thread of the server (I/O workers and the zone
//! loader) belongs to a [`ThreadGroup`], which restarts threads that
//! die and lets the daemon shut them all down together. Work is handed
//! between threads through [`WorkQueue`]s.

use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use log::{error, info};
use slab::Slab;

////////////////////////////////////////////////////////////////////////
// THREAD GROUPS                                                      //
////////////////////////////////////////////////////////////////////////

/// A group of respawnable threads managed together.
///
/// Threads are started with [`ThreadGroup::start_respawnable`]. Once
/// [`ThreadGroup::shut_down`] is called, no new threads start, threads
/// that exit are not restarted, and every [`WorkQueue`] of the group is
/// closed. Long-running tasks are expected to poll
/// [`ThreadGroup::is_shutting_down`] and return when it is set;
/// [`ThreadGroup::await_shutdown`] waits until all of them have.
pub struct ThreadGroup {
    records: Mutex<GroupRecords>,

    /// Notified when shutdown begins and when the last thread exits.
    shutdown_wakeup: Condvar,
}

#[derive(Default)]
struct GroupRecords {
    thread_count: usize,
    queues: Slab<Arc<dyn Close>>,
    shutting_down: bool,
}

impl ThreadGroup {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(GroupRecords::default()),
            shutdown_wakeup: Condvar::new(),
        })
    }

    /// Starts a thread running `task`. Whenever `task` returns or
    /// panics while the group is not shutting down, it is run again on
    /// a new thread, at most once per [`RESPAWN_DELAY`].
    pub fn start_respawnable<F>(self: &Arc<Self>, name: String, task: F) -> Result<(), Error>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut records = self.lock();
        if records.shutting_down {
            return Err(Error::ShuttingDown);
        }
        spawn(self.clone(), &mut records, name, Arc::new(task)).map_err(Into::into)
    }

    /// Creates a [`WorkQueue`] holding at most `capacity` items. The
    /// queue is closed when the group shuts down.
    pub fn start_queue<T>(self: &Arc<Self>, capacity: usize) -> Result<Arc<WorkQueue<T>>, Error>
    where
        T: Send + 'static,
    {
        let mut records = self.lock();
        if records.shutting_down {
            return Err(Error::ShuttingDown);
        }
        let queue = Arc::new(WorkQueue::new(capacity));
        records.queues.insert(queue.clone());
        Ok(queue)
    }

    /// Begins shutting down the group.
    pub fn shut_down(&self) {
        let mut records = self.lock();
        records.shutting_down = true;
        for queue in records.queues.drain() {
            queue.close();
        }
        self.shutdown_wakeup.notify_all();
    }

    /// Waits until shutdown has begun and every thread has exited. This
    /// deadlocks if called from a thread of the group.
    pub fn await_shutdown(&self) {
        let records = self.lock();
        let _records = self
            .shutdown_wakeup
            .wait_while(records, |r| !r.shutting_down || r.thread_count > 0)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
    }

    pub fn is_shutting_down(&self) -> bool {
        self.lock().shutting_down
    }

    fn lock(&self) -> MutexGuard<GroupRecords> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// The minimum time between two starts of the same respawnable thread.
pub const RESPAWN_DELAY: Duration = Duration::from_secs(1);

/// Owned by a running respawnable thread; dropping it (when the task
/// returns or unwinds) does the bookkeeping and the respawn.
struct Lifeline<F>
where
    F: Fn() + Send + Sync + 'static,
{
    group: Arc<ThreadGroup>,
    parent: ThreadId,
    name: String,
    task: Arc<F>,
    started: Instant,
}

fn spawn<F>(
    group: Arc<ThreadGroup>,
    records: &mut GroupRecords,
    name: String,
    task: Arc<F>,
) -> io::Result<()>
where
    F: Fn() + Send + Sync + 'static,
{
    let lifeline = Lifeline {
        group,
        parent: thread::current().id(),
        name: name.clone(),
        task,
        started: Instant::now(),
    };
    thread::Builder::new().name(name).spawn(move || {
        (lifeline.task)();
        drop(lifeline);
    })?;
    records.thread_count += 1;
    Ok(())
}

impl<F> Drop for Lifeline<F>
where
    F: Fn() + Send + Sync + 'static,
{
    fn drop(&mut self) {
        // A lifeline whose thread never started is dropped by the
        // spawning thread, which did not count it.
        if thread::current().id() == self.parent {
            return;
        }
        if thread::panicking() {
            error!("Thread {} panicked.", self.name);
        }

        let mut records = self.group.lock();
        if !records.shutting_down {
            if !thread::panicking() {
                error!("Thread {} exited prematurely.", self.name);
            }
            let elapsed = self.started.elapsed();
            if elapsed < RESPAWN_DELAY {
                let wait = RESPAWN_DELAY - elapsed;
                info!(
                    "Delaying the respawn of thread {} by {} ms.",
                    self.name,
                    wait.as_millis()
                );
                // Shutdown cuts the delay short.
                records = self
                    .group
                    .shutdown_wakeup
                    .wait_timeout(records, wait)
                    .map(|(records, _)| records)
                    .unwrap_or_else(|poisoned| poisoned.into_inner().0);
            }
            if !records.shutting_down {
                let respawned = spawn(
                    self.group.clone(),
                    &mut records,
                    self.name.clone(),
                    self.task.clone(),
                );
                if let Err(e) = respawned {
                    error!("Failed to respawn thread {}: {}", self.name, e);
                }
            }
        }

        records.thread_count -= 1;
        if records.shutting_down && records.thread_count == 0 {
            self.group.shutdown_wakeup.notify_all();
        }
    }
}

////////////////////////////////////////////////////////////////////////
// WORK QUEUES                                                        //
////////////////////////////////////////////////////////////////////////

/// A bounded queue handing items (such as accepted connections) from
/// one thread to a set of workers.
///
/// A `WorkQueue` is always created within a [`ThreadGroup`] through
/// [`ThreadGroup::start_queue`] and is closed when the group shuts
/// down. Items still queued at that point are dropped.
pub struct WorkQueue<T> {
    records: Mutex<QueueRecords<T>>,
    capacity: usize,
    wakeup: Condvar,
}

struct QueueRecords<T> {
    items: VecDeque<T>,
    closed: bool,
}

impl<T> WorkQueue<T> {
    fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(QueueRecords {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            capacity,
            wakeup: Condvar::new(),
        }
    }

    /// Adds an item for the next available worker. Fails without
    /// waiting if the queue is full or closed; the item is handed back
    /// in the error.
    pub fn push(&self, item: T) -> Result<(), PushError<T>> {
        let mut records = self.lock();
        if records.closed {
            Err(PushError::Closed(item))
        } else if records.items.len() >= self.capacity {
            Err(PushError::Full(item))
        } else {
            records.items.push_back(item);
            self.wakeup.notify_one();
            Ok(())
        }
    }

    /// Takes the next item, waiting for one to arrive. Returns `None`
    /// once the queue is closed.
    pub fn pop(&self) -> Option<T> {
        let mut records = self.lock();
        loop {
            if records.closed {
                records.items.clear();
                return None;
            } else if let Some(item) = records.items.pop_front() {
                return Some(item);
            }
            records = self
                .wakeup
                .wait(records)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<QueueRecords<T>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Type-erased access to [`WorkQueue::close`] for [`ThreadGroup`].
trait Close: Send + Sync {
    fn close(&self);
}

impl<T: Send> Close for WorkQueue<T> {
    fn close(&self) {
        self.lock().closed = true;
        self.wakeup.notify_all();
    }
}

/// The error returned by [`WorkQueue::push`].
#[derive(Debug)]
pub enum PushError<T> {
    Full(T),
    Closed(T),
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error type for [`ThreadGroup`] operations.
#[derive(Debug)]
pub enum Error {
    /// The operating system failed to create a thread.
    Io(io::Error),

    /// The [`ThreadGroup`] is shutting down.
    ShuttingDown,
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(err) => err.fmt(f),
            Self::ShuttingDown => f.write_str("thread group is shutting down"),
        }
    }
}

impl std::error::Error for Error {}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
