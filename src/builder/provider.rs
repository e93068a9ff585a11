//! Routes `NodesBuilder::add_node` calls to local workers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::ThreadId;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::builder::context::NodesBuilderContext;
use crate::builder::local::LocalNodesBuilder;
use crate::collections::{lock, read, write};
use crate::config::ProviderMode;
use crate::error::{GraphError, Result};

pub enum LocalBuilderProvider {
    ThreadLocal(ThreadBoundLanes),
    Pooled(WorkerPool),
}

impl LocalBuilderProvider {
    pub fn new(
        mode: ProviderMode,
        context: &Arc<NodesBuilderContext>,
        concurrency: usize,
        batch_capacity: usize,
    ) -> Self {
        match mode {
            ProviderMode::ThreadLocal => LocalBuilderProvider::ThreadLocal(ThreadBoundLanes::new(
                context,
                concurrency,
                batch_capacity,
            )),
            ProviderMode::Pooled => LocalBuilderProvider::Pooled(WorkerPool::new(
                context,
                concurrency,
                batch_capacity,
            )),
        }
    }

    /// Run `f` on the worker serving the calling thread.
    pub fn with<R>(&self, f: impl FnOnce(&mut LocalNodesBuilder) -> Result<R>) -> Result<R> {
        match self {
            LocalBuilderProvider::ThreadLocal(lanes) => lanes.with(f),
            LocalBuilderProvider::Pooled(pool) => pool.with(f),
        }
    }

    /// Close every worker. All are closed even if one fails; the first
    /// error is returned.
    pub fn close_all(&self) -> Result<()> {
        match self {
            LocalBuilderProvider::ThreadLocal(lanes) => lanes.close_all(),
            LocalBuilderProvider::Pooled(pool) => pool.close_all(),
        }
    }
}

fn first_error(results: impl Iterator<Item = Result<()>>) -> Result<()> {
    let mut first = Ok(());
    for result in results {
        if let Err(e) = result {
            if first.is_ok() {
                first = Err(e);
            }
        }
    }
    first
}

// ── Thread-bound lanes ─────────────────────────────────────────────

/// `concurrency` workers created up front. Each calling thread is bound
/// to one lane on first use, round-robin. With no more producer threads
/// than lanes every lane mutex stays uncontended.
pub struct ThreadBoundLanes {
    lanes: Box<[Mutex<LocalNodesBuilder>]>,
    assignments: RwLock<HashMap<ThreadId, usize>>,
}

impl ThreadBoundLanes {
    fn new(context: &Arc<NodesBuilderContext>, concurrency: usize, batch_capacity: usize) -> Self {
        Self {
            lanes: (0..concurrency)
                .map(|_| Mutex::new(LocalNodesBuilder::new(Arc::clone(context), batch_capacity)))
                .collect(),
            assignments: RwLock::new(HashMap::new()),
        }
    }

    fn lane_index(&self) -> usize {
        let thread = std::thread::current().id();
        if let Some(&index) = read(&self.assignments).get(&thread) {
            return index;
        }
        let mut assignments = write(&self.assignments);
        let next = assignments.len() % self.lanes.len();
        *assignments.entry(thread).or_insert(next)
    }

    fn with<R>(&self, f: impl FnOnce(&mut LocalNodesBuilder) -> Result<R>) -> Result<R> {
        let mut worker = lock(&self.lanes[self.lane_index()]);
        f(&mut worker)
    }

    fn close_all(&self) -> Result<()> {
        first_error(self.lanes.iter().map(|lane| lock(lane).close()))
    }
}

// ── Pooled workers ─────────────────────────────────────────────────

/// Workers created on demand, up to `max_workers`, and recycled through
/// a bounded channel. A call borrows an idle worker, or creates one while
/// under the cap, or waits for one to be returned.
pub struct WorkerPool {
    context: Arc<NodesBuilderContext>,
    batch_capacity: usize,
    max_workers: usize,
    created: AtomicUsize,
    idle_tx: Sender<LocalNodesBuilder>,
    idle_rx: Receiver<LocalNodesBuilder>,
}

impl WorkerPool {
    fn new(context: &Arc<NodesBuilderContext>, max_workers: usize, batch_capacity: usize) -> Self {
        let (idle_tx, idle_rx) = bounded(max_workers);
        Self {
            context: Arc::clone(context),
            batch_capacity,
            max_workers,
            created: AtomicUsize::new(0),
            idle_tx,
            idle_rx,
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::Acquire)
    }

    fn acquire(&self) -> Result<LocalNodesBuilder> {
        if let Ok(worker) = self.idle_rx.try_recv() {
            return Ok(worker);
        }
        let mut created = self.created.load(Ordering::Acquire);
        while created < self.max_workers {
            match self.created.compare_exchange_weak(
                created,
                created + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Ok(LocalNodesBuilder::new(
                        Arc::clone(&self.context),
                        self.batch_capacity,
                    ))
                }
                Err(actual) => created = actual,
            }
        }
        self.idle_rx
            .recv()
            .map_err(|e| GraphError::Pool(format!("worker pool: {e}")))
    }

    fn release(&self, worker: LocalNodesBuilder) {
        // At most `max_workers` exist, so the channel never fills up.
        if let Err(e) = self.idle_tx.try_send(worker) {
            tracing::warn!(lane = e.into_inner().lane(), "Worker pool rejected a returned worker");
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut LocalNodesBuilder) -> Result<R>) -> Result<R> {
        let mut borrowed = Borrowed {
            pool: self,
            worker: Some(self.acquire()?),
        };
        match borrowed.worker.as_mut() {
            Some(worker) => f(worker),
            None => Err(GraphError::Pool("worker pool: borrowed worker missing".to_string())),
        }
    }

    fn close_all(&self) -> Result<()> {
        first_error(self.idle_rx.try_iter().map(|mut worker| worker.close()))
    }
}

/// Returns the worker to the pool when the call ends, also on unwind.
struct Borrowed<'a> {
    pool: &'a WorkerPool,
    worker: Option<LocalNodesBuilder>,
}

impl Drop for Borrowed<'_> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.pool.release(worker);
        }
    }
}
