/// TaskManager - routes tasks to worker pools and collects completions
///
/// Workers are grouped by a task kind, any `'static` marker type chosen by
/// the caller. Each kind owns a pool of workers fed round-robin and a frame
/// scheduler. Kinds without a pool are served by the default worker.
///
/// The owning thread never blocks on a full worker queue without also
/// draining the completion channel: while every queue of a pool is full,
/// pending completion messages are run in place, since a worker may itself be
/// waiting for room in that channel.
///
/// # Example
///
/// ```no_run
/// use starlight_engine::starlight::task::{Task, TaskManager, TaskManagerConfig};
///
/// struct ShaderCompile;
///
/// let mut manager = TaskManager::new(TaskManagerConfig::default());
/// manager.register_worker::<ShaderCompile>(2).unwrap();
/// manager.start_all().unwrap();
///
/// manager.submit_task::<ShaderCompile>(Task::from_fn(|| { /* compile */ }).unwrap());
/// manager.run_completions();
/// ```

use std::any::{type_name, TypeId};
use crossbeam_channel::{Receiver, Sender};
use crossbeam_utils::Backoff;
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::{engine_debug, engine_info};
use super::complete_task::CompleteTask;
use super::frame_scheduler::FrameScheduler;
use super::task::Task;
use super::worker::{TaskWorker, Worker, WorkerConfig};

/// Task manager configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskManagerConfig {
    /// Configuration of every worker created by the manager
    pub worker: WorkerConfig,

    /// Capacity of the completion channel shared by all workers
    pub complete_capacity: usize,
}

impl Default for TaskManagerConfig {
    fn default() -> Self {
        Self {
            worker: WorkerConfig::default(),
            complete_capacity: 256,
        }
    }
}

/// Workers and scheduled tasks of one task kind
struct WorkerPool {
    kind: &'static str,
    workers: Vec<Box<dyn TaskWorker>>,
    next: usize,
    scheduler: FrameScheduler,
}

impl WorkerPool {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            workers: Vec::new(),
            next: 0,
            scheduler: FrameScheduler::new(),
        }
    }

    /// Queue on the next worker with room, or give the task back if the pool is empty
    ///
    /// While every queue is full, messages waiting in `completions` are run on
    /// the calling thread; `ran` counts them.
    fn queue_task(
        &mut self,
        task: Task,
        completions: &Receiver<CompleteTask>,
        ran: &mut usize,
    ) -> std::result::Result<(), Task> {
        if self.workers.is_empty() {
            return Err(task);
        }

        let backoff = Backoff::new();
        let mut task = task;
        loop {
            for _ in 0..self.workers.len() {
                let index = self.next % self.workers.len();
                self.next = (index + 1) % self.workers.len();
                match self.workers[index].try_queue_task(task) {
                    Ok(()) => return Ok(()),
                    Err(rejected) => task = rejected,
                }
            }

            let mut drained = 0;
            while let Ok(mut message) = completions.try_recv() {
                message.run();
                drained += 1;
            }
            *ran += drained;
            if drained == 0 {
                backoff.snooze();
            }
        }
    }
}

/// Owning-thread view of the completion channel
pub struct CompleteMessages<'a> {
    receiver: &'a Receiver<CompleteTask>,
}

impl CompleteMessages<'_> {
    /// Pop one completed message, if any
    pub fn try_pop(&self) -> Option<CompleteTask> {
        self.receiver.try_recv().ok()
    }

    /// Hand every currently available message to `f`; returns how many were handled
    pub fn drain<F: FnMut(CompleteTask)>(&self, mut f: F) -> usize {
        let mut count = 0;
        while let Some(message) = self.try_pop() {
            f(message);
            count += 1;
        }
        count
    }

    /// Run every currently available message on the calling thread
    pub fn run_all(&self) -> usize {
        self.drain(|mut message| message.run())
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

pub struct TaskManager {
    config: TaskManagerConfig,
    pools: FxHashMap<TypeId, WorkerPool>,
    default_pool: WorkerPool,
    complete_sender: Sender<CompleteTask>,
    complete_receiver: Receiver<CompleteTask>,
    // Completion messages already run while a queue was full
    completed_while_queueing: usize,
    started: bool,
}

impl TaskManager {
    /// Create a manager with a stopped default worker
    pub fn new(config: TaskManagerConfig) -> Self {
        let (complete_sender, complete_receiver) =
            crossbeam_channel::bounded(config.complete_capacity.max(1));

        let mut default_pool = WorkerPool::new("default");
        default_pool.workers.push(Box::new(Worker::new(
            "starlight-default-worker",
            config.worker,
            complete_sender.clone(),
        )));

        Self {
            config,
            pools: FxHashMap::default(),
            default_pool,
            complete_sender,
            complete_receiver,
            completed_while_queueing: 0,
            started: false,
        }
    }

    /// Create `count` workers for task kind `K`
    ///
    /// Calling it again for the same kind grows the pool. Workers registered
    /// after `start_all` are started right away.
    pub fn register_worker<K: 'static>(&mut self, count: usize) -> Result<()> {
        let kind = short_type_name::<K>();
        let mut created: Vec<Box<dyn TaskWorker>> = Vec::with_capacity(count);
        let first_index = self.worker_count::<K>();

        for index in first_index..first_index + count {
            let mut worker = Worker::new(
                format!("starlight-{}-{}", kind, index),
                self.config.worker,
                self.complete_sender.clone(),
            );
            if self.started {
                worker.start()?;
            }
            created.push(Box::new(worker));
        }

        self.pool_for::<K>().workers.extend(created);
        engine_debug!("starlight::TaskManager", "Registered {} workers for '{}'", count, kind);
        Ok(())
    }

    /// Add a custom worker to the pool of task kind `K`
    pub fn add_worker<K: 'static>(&mut self, mut worker: Box<dyn TaskWorker>) -> Result<()> {
        if self.started {
            worker.start()?;
        }
        engine_debug!(
            "starlight::TaskManager",
            "Added worker '{}' for '{}'",
            worker.name(),
            short_type_name::<K>()
        );
        self.pool_for::<K>().workers.push(worker);
        Ok(())
    }

    /// Number of workers serving task kind `K`
    pub fn worker_count<K: 'static>(&self) -> usize {
        self.pools.get(&TypeId::of::<K>()).map_or(0, |pool| pool.workers.len())
    }

    /// Queue `task` on the next worker of kind `K`, or on the default worker
    ///
    /// Waits while every queue of the pool is full, running completion
    /// messages on the calling thread in the meantime.
    pub fn submit_task<K: 'static>(&mut self, task: Task) {
        let task = match self.pools.get_mut(&TypeId::of::<K>()) {
            Some(pool) => match pool.queue_task(task, &self.complete_receiver, &mut self.completed_while_queueing) {
                Ok(()) => return,
                Err(task) => task,
            },
            None => task,
        };
        self.submit_to_default(task);
    }

    /// Defer `task` of kind `K` until `dispatch_tasks_for_frame(frame_index)`
    pub fn schedule_task_for_frame<K: 'static>(&mut self, frame_index: u64, task: Task) {
        match self.pools.get_mut(&TypeId::of::<K>()) {
            Some(pool) => pool.scheduler.schedule(frame_index, task),
            None => self.default_pool.scheduler.schedule(frame_index, task),
        }
    }

    /// Queue every task scheduled for `frame_index`; returns how many were dispatched
    pub fn dispatch_tasks_for_frame(&mut self, frame_index: u64) -> usize {
        let mut dispatched = 0;
        let mut orphans = Vec::new();

        for pool in self.pools.values_mut() {
            for task in pool.scheduler.fetch_tasks_for_frame(frame_index) {
                if let Err(task) = pool.queue_task(task, &self.complete_receiver, &mut self.completed_while_queueing) {
                    orphans.push(task);
                }
                dispatched += 1;
            }
        }
        let default_tasks = self.default_pool.scheduler.fetch_tasks_for_frame(frame_index);
        dispatched += default_tasks.len();
        orphans.extend(default_tasks);

        for task in orphans.drain(..) {
            self.submit_to_default(task);
        }
        dispatched
    }

    /// Number of tasks still waiting for their frame
    pub fn scheduled_task_count(&self) -> usize {
        self.default_pool.scheduler.len()
            + self.pools.values().map(|pool| pool.scheduler.len()).sum::<usize>()
    }

    /// Run every waiting completion message on the calling thread
    ///
    /// Returns how many ran, including those already run by `submit_task` or
    /// `dispatch_tasks_for_frame` since the previous call.
    pub fn run_completions(&mut self) -> usize {
        let already_ran = std::mem::take(&mut self.completed_while_queueing);
        already_ran + self.complete_messages().run_all()
    }

    /// Completed messages waiting for the owning thread
    pub fn complete_messages(&self) -> CompleteMessages<'_> {
        CompleteMessages { receiver: &self.complete_receiver }
    }

    /// Sender side of the completion channel, for custom workers
    pub fn complete_sender(&self) -> Sender<CompleteTask> {
        self.complete_sender.clone()
    }

    /// Start the default worker and every registered worker
    pub fn start_all(&mut self) -> Result<()> {
        for worker in self.all_workers_mut() {
            worker.start()?;
        }
        self.started = true;
        engine_info!(
            "starlight::TaskManager",
            "Started {} workers",
            1 + self.pools.values().map(|pool| pool.workers.len()).sum::<usize>()
        );
        Ok(())
    }

    /// Stop every worker; queued tasks are kept until the next `start_all`
    pub fn stop_all(&mut self) {
        if !self.started {
            return;
        }
        for worker in self.all_workers_mut() {
            worker.stop();
        }
        self.started = false;
        engine_info!("starlight::TaskManager", "Stopped all workers");
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    fn submit_to_default(&mut self, task: Task) {
        // The default pool always holds its worker
        let _ = self.default_pool.queue_task(task, &self.complete_receiver, &mut self.completed_while_queueing);
    }

    fn pool_for<K: 'static>(&mut self) -> &mut WorkerPool {
        self.pools
            .entry(TypeId::of::<K>())
            .or_insert_with(|| WorkerPool::new(short_type_name::<K>()))
    }

    fn all_workers_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn TaskWorker>> {
        self.default_pool
            .workers
            .iter_mut()
            .chain(self.pools.values_mut().flat_map(|pool| pool.workers.iter_mut()))
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.stop_all();
    }
}

impl std::fmt::Debug for TaskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<(&str, usize)> = self.pools
            .values()
            .map(|pool| (pool.kind, pool.workers.len()))
            .collect();
        f.debug_struct("TaskManager")
            .field("pools", &kinds)
            .field("scheduled", &self.scheduled_task_count())
            .field("started", &self.started)
            .finish()
    }
}

/// Last path segment of a type name, used for worker thread names
fn short_type_name<K>() -> &'static str {
    let name = type_name::<K>();
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
#[path = "task_manager_tests.rs"]
mod tests;
