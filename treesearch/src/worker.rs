use std::{
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

use log::{debug, info, warn};

use crate::{
    node::NodeRef,
    sampler::{PassOutcome, Ucb},
    sim::Simulation,
};

/// Counters a worker thread publishes while it runs.
#[derive(Debug, Default)]
pub struct WorkerStats {
    passes: AtomicU64,
    sim_errors: AtomicU64,
    consecutive_errors: AtomicU32,
}

impl WorkerStats {
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    pub fn sim_errors(&self) -> u64 {
        self.sim_errors.load(Ordering::Relaxed)
    }

    /// Errors since the last successful pass. A health signal: a large
    /// value means the simulation is stuck, not merely flaky.
    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors.load(Ordering::Relaxed)
    }
}

/// One search thread. Owns a private simulation and sampler and runs
/// passes against the shared tree until told to stop or until the tree
/// is exhausted. The stop flag is only checked between passes, so a
/// pass in flight always completes its backpropagation.
pub struct TreeWorker {
    index: usize,
    running: Arc<AtomicBool>,
    stats: Arc<WorkerStats>,
    handle: Option<JoinHandle<()>>,
}

impl TreeWorker {
    pub fn spawn<G>(
        index: usize,
        root: NodeRef<G::Command, G::State>,
        mut sim: G,
        mut sampler: Ucb<G>,
    ) -> Self
    where
        G: Simulation + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(WorkerStats::default());
        let handle = {
            let running = running.clone();
            let stats = stats.clone();
            std::thread::Builder::new()
                .name(format!("tree-worker-{index}"))
                .spawn(move || {
                    debug!(
                        "worker {index} started, exploration {:.3}",
                        sampler.exploration()
                    );
                    while running.load(Ordering::Relaxed) {
                        match sampler.run_pass(&root, &mut sim) {
                            Ok(PassOutcome::Expanded(_)) => {
                                stats.passes.fetch_add(1, Ordering::Relaxed);
                                stats.consecutive_errors.store(0, Ordering::Relaxed);
                            }
                            Ok(PassOutcome::Exhausted) => {
                                if root.is_fully_explored() {
                                    debug!("worker {index}: tree fully explored");
                                    break;
                                }
                                // A branch closed under us; try again
                                // from the root.
                            }
                            Err(error) => {
                                warn!("worker {index}: simulation failed the pass: {error}");
                                stats.sim_errors.fetch_add(1, Ordering::Relaxed);
                                stats.consecutive_errors.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                })
                .expect("failed to spawn worker thread")
        };
        TreeWorker {
            index,
            running,
            stats,
            handle: Some(handle),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Whether the worker thread is still making passes.
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Ask the worker to stop after its current pass. Returns without
    /// waiting.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Stop and wait for the in-flight pass to finish.
    pub fn join(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("worker {} panicked", self.index);
            }
        }
        info!(
            "worker {} finished: {} passes, {} simulation errors",
            self.index,
            self.stats.passes(),
            self.stats.sim_errors(),
        );
    }
}

impl Drop for TreeWorker {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
