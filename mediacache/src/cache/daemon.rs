//! Background worker that physically deletes evicted cache files.
//!
//! Eviction removes entries from the index synchronously and hands the
//! file names to this worker, so callers never wait on unlink latency.
//! The worker runs on one dedicated thread and processes tasks FIFO.
//!
//! A queued task can be retracted before the worker reaches it. Retraction
//! and the worker's dequeue happen under the same lock, so a retracted task
//! is never executed. A task the worker is already unlinking cannot be
//! withdrawn; retracting it waits for the unlink to finish instead, so the
//! caller can recreate the file afterwards.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use super::path::DirectoryResolver;
use super::types::DeletionTask;

#[derive(Default)]
struct QueueState {
    tasks: VecDeque<DeletionTask>,
    /// Tasks popped by the worker but not yet unlinked.
    in_flight: Vec<DeletionTask>,
    closed: bool,
}

impl QueueState {
    fn retract(&mut self, task: &DeletionTask) -> bool {
        match self.tasks.iter().position(|queued| queued == task) {
            Some(position) => {
                self.tasks.remove(position);
                true
            }
            None => false,
        }
    }

    fn is_in_flight(&self, task: &DeletionTask) -> bool {
        self.in_flight.contains(task)
    }

    fn is_idle(&self) -> bool {
        self.tasks.is_empty() && self.in_flight.is_empty()
    }
}

/// Shared FIFO of pending deletions.
#[derive(Default)]
struct DeletionQueue {
    state: Mutex<QueueState>,
    /// Signalled when tasks arrive or the queue closes.
    available: Condvar,
    /// Signalled whenever the worker finishes a task.
    completed: Condvar,
    /// Signalled when the queue becomes empty with nothing in flight.
    idle: Condvar,
}

impl DeletionQueue {
    /// Block until a task is available; `None` once closed and drained.
    fn pop(&self) -> Option<DeletionTask> {
        let mut state = self.state.lock();
        loop {
            if let Some(task) = state.tasks.pop_front() {
                state.in_flight.push(task.clone());
                return Some(task);
            }
            if state.closed {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    fn complete(&self, task: &DeletionTask) {
        let mut state = self.state.lock();
        if let Some(position) = state.in_flight.iter().position(|t| t == task) {
            state.in_flight.swap_remove(position);
        }
        self.completed.notify_all();
        if state.is_idle() {
            self.idle.notify_all();
        }
    }
}

/// Handle to the deletion thread.
///
/// Dropping the worker closes the queue, lets the thread drain any
/// remaining tasks and joins it.
pub struct DeletionWorker {
    queue: Arc<DeletionQueue>,
    thread_handle: Option<JoinHandle<()>>,
}

impl DeletionWorker {
    /// Spawn the worker thread.
    pub fn start(resolver: Arc<DirectoryResolver>) -> std::io::Result<Self> {
        let queue = Arc::new(DeletionQueue::default());
        let worker_queue = Arc::clone(&queue);

        let thread_handle = thread::Builder::new()
            .name("cache-deletion".to_string())
            .spawn(move || Self::run_loop(&worker_queue, &resolver))?;

        debug!("Cache deletion worker started");

        Ok(Self {
            queue,
            thread_handle: Some(thread_handle),
        })
    }

    fn run_loop(queue: &DeletionQueue, resolver: &DirectoryResolver) {
        let mut deleted = 0u64;
        while let Some(task) = queue.pop() {
            if delete_task_file(resolver, &task) {
                deleted += 1;
            }
            queue.complete(&task);
        }
        debug!(files_deleted = deleted, "Cache deletion worker stopped");
    }

    /// Queue tasks for deletion.
    ///
    /// Tasks submitted after shutdown are dropped; their files become
    /// orphans that the next scan picks up again.
    pub fn submit(&self, tasks: impl IntoIterator<Item = DeletionTask>) {
        let mut state = self.queue.state.lock();
        if state.closed {
            warn!("Deletion worker is shut down, dropping tasks");
            return;
        }
        let before = state.tasks.len();
        state.tasks.extend(tasks);
        if state.tasks.len() > before {
            self.queue.available.notify_one();
        }
    }

    /// Remove the first queued task equal to `task`.
    ///
    /// If the worker is unlinking an equal task right now, this blocks until
    /// that unlink is done. Returns `true` if a queued task was removed; the
    /// worker will not run it.
    pub fn retract(&self, task: &DeletionTask) -> bool {
        let mut state = self.queue.state.lock();
        while state.is_in_flight(task) {
            self.queue.completed.wait(&mut state);
        }
        let retracted = state.retract(task);
        if retracted && state.is_idle() {
            self.queue.idle.notify_all();
        }
        retracted
    }

    /// Number of tasks waiting or being processed.
    pub fn pending(&self) -> usize {
        let state = self.queue.state.lock();
        state.tasks.len() + state.in_flight.len()
    }

    /// Block until every queued task has been processed.
    pub fn wait_until_idle(&self) {
        let mut state = self.queue.state.lock();
        while !state.is_idle() {
            self.queue.idle.wait(&mut state);
        }
    }

    /// Close the queue and wait for the worker to drain it.
    pub fn shutdown(&mut self) {
        {
            let mut state = self.queue.state.lock();
            if !state.closed {
                state.closed = true;
                info!(
                    remaining = state.tasks.len(),
                    "Shutting down cache deletion worker"
                );
            }
            self.queue.available.notify_all();
        }
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!("Cache deletion worker thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for DeletionWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Unlink the file for a task. Failures are logged and otherwise ignored.
pub(crate) fn delete_task_file(resolver: &DirectoryResolver, task: &DeletionTask) -> bool {
    let Some(dir) = resolver.resolve(task.partition) else {
        debug!(
            partition = %task.partition,
            name = %task.name,
            "Storage unavailable, leaving evicted file in place"
        );
        return false;
    };
    let path = dir.join(&task.name);
    match std::fs::remove_file(&path) {
        Ok(()) => true,
        Err(e) => {
            debug!(
                path = %path.display(),
                error = %e,
                "Failed to delete evicted cache file"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::path::LocalStorage;
    use crate::cache::types::Partition;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<DirectoryResolver>) {
        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp.path());
        let resolver = Arc::new(DirectoryResolver::new(Arc::new(storage)));
        (temp, resolver)
    }

    fn create_file(
        resolver: &DirectoryResolver,
        partition: Partition,
        name: &str,
    ) -> std::path::PathBuf {
        let path = resolver.resolve(partition).unwrap().join(name);
        std::fs::write(&path, b"data").unwrap();
        path
    }

    #[test]
    fn test_worker_deletes_submitted_files() {
        let (_temp, resolver) = setup();
        let a = create_file(&resolver, Partition::Media, "a");
        let b = create_file(&resolver, Partition::Thumbnails, "b");

        let worker = DeletionWorker::start(Arc::clone(&resolver)).unwrap();

        worker.submit(vec![
            DeletionTask::new(Partition::Media, "a"),
            DeletionTask::new(Partition::Thumbnails, "b"),
        ]);
        worker.wait_until_idle();

        assert!(!a.exists());
        assert!(!b.exists());
        assert_eq!(worker.pending(), 0);
    }

    #[test]
    fn test_worker_ignores_missing_files() {
        let (_temp, resolver) = setup();
        let worker = DeletionWorker::start(Arc::clone(&resolver)).unwrap();

        worker.submit(vec![DeletionTask::new(Partition::Media, "missing")]);
        worker.wait_until_idle();

        assert_eq!(worker.pending(), 0);
    }

    #[test]
    fn test_retract_removes_queued_task() {
        let (_temp, resolver) = setup();
        let kept = create_file(&resolver, Partition::Media, "kept");

        let mut worker = DeletionWorker::start(Arc::clone(&resolver)).unwrap();
        // Holding the lock keeps the worker from dequeuing before the retract.
        {
            let mut state = worker.queue.state.lock();
            state.tasks.push_back(DeletionTask::new(Partition::Media, "KEPT"));
            assert!(state.retract(&DeletionTask::new(Partition::Media, "kept")));
            assert!(!state.retract(&DeletionTask::new(Partition::Media, "kept")));
        }

        worker.shutdown();
        assert!(kept.exists());
    }

    #[test]
    fn test_retract_only_removes_first_match() {
        let mut state = QueueState::default();
        state.tasks.push_back(DeletionTask::new(Partition::Media, "dup"));
        state.tasks.push_back(DeletionTask::new(Partition::Thumbnails, "other"));
        state.tasks.push_back(DeletionTask::new(Partition::Media, "dup"));

        assert!(state.retract(&DeletionTask::new(Partition::Media, "dup")));
        assert_eq!(state.tasks.len(), 2);
        assert_eq!(state.tasks[0].name, "other");
        assert_eq!(state.tasks[1].name, "dup");
    }

    #[test]
    fn test_retract_waits_for_in_flight_unlink() {
        let (_temp, resolver) = setup();
        let worker = DeletionWorker::start(Arc::clone(&resolver)).unwrap();
        let task = DeletionTask::new(Partition::Media, "busy");
        worker.queue.state.lock().in_flight.push(task.clone());

        let queue = Arc::clone(&worker.queue);
        let finisher = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            queue.complete(&DeletionTask::new(Partition::Media, "BUSY"));
        });

        let started = Instant::now();
        assert!(!worker.retract(&task));
        assert!(started.elapsed() >= Duration::from_millis(40));
        assert_eq!(worker.pending(), 0);
        finisher.join().unwrap();
    }

    #[test]
    fn test_retract_missing_task_returns_false() {
        let (_temp, resolver) = setup();
        let worker = DeletionWorker::start(Arc::clone(&resolver)).unwrap();
        assert!(!worker.retract(&DeletionTask::new(Partition::Media, "never-queued")));
    }

    #[test]
    fn test_shutdown_drains_queue() {
        let (_temp, resolver) = setup();
        let paths: Vec<_> = (0..20)
            .map(|i| create_file(&resolver, Partition::Media, &format!("file{}", i)))
            .collect();

        let mut worker = DeletionWorker::start(Arc::clone(&resolver)).unwrap();
        worker.submit((0..20).map(|i| DeletionTask::new(Partition::Media, format!("file{}", i))));
        worker.shutdown();

        assert!(worker.thread_handle.is_none());
        assert!(paths.iter().all(|p| !p.exists()));
    }

    #[test]
    fn test_submit_after_shutdown_is_dropped() {
        let (_temp, resolver) = setup();
        let path = create_file(&resolver, Partition::Media, "late");

        let mut worker = DeletionWorker::start(Arc::clone(&resolver)).unwrap();
        worker.shutdown();
        worker.submit(vec![DeletionTask::new(Partition::Media, "late")]);

        assert_eq!(worker.pending(), 0);
        assert!(path.exists());
    }

    #[test]
    fn test_drop_stops_worker() {
        let (_temp, resolver) = setup();
        let path = create_file(&resolver, Partition::Thumbnails, "t");
        {
            let worker = DeletionWorker::start(Arc::clone(&resolver)).unwrap();
            worker.submit(vec![DeletionTask::new(Partition::Thumbnails, "t")]);
        }
        assert!(!path.exists());
    }
}
