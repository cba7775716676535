use std::{
    cmp::Ordering as CmpOrdering,
    thread::JoinHandle,
    time::{Duration, Instant},
};

use log::{debug, info};

use crate::{
    action::Command,
    error::ConfigError,
    node::NodeRef,
    sampler::Ucb,
    sim::{Simulation, State},
    worker::TreeWorker,
};

/// Lifecycle of a [`TreeStage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageState {
    Initializing,
    Running,
    Terminating,
    Finished,
}

/// When a stage is done, and which nodes it reports as its result.
#[derive(Clone, Copy, Debug)]
pub enum Termination {
    /// Stop after this many completed search passes across all workers.
    FixedPasses(u64),
    /// Stop once any node reaches this tree depth. Results are the path
    /// to the deepest node.
    MaxDepth(u32),
    /// Stop after this much wall-clock time.
    WallClock(Duration),
    /// Run until the root is fully explored. The exhaustive option for
    /// small trees.
    SearchForever,
}

impl Termination {
    fn met<C: Command, S: State>(
        &self,
        root: &NodeRef<C, S>,
        passes: u64,
        started: Instant,
    ) -> bool {
        match self {
            Termination::FixedPasses(limit) => passes >= *limit,
            Termination::MaxDepth(depth) => root.max_depth() >= *depth,
            Termination::WallClock(limit) => started.elapsed() >= *limit,
            Termination::SearchForever => root.is_fully_explored(),
        }
    }

    fn results<C: Command, S: State>(&self, root: &NodeRef<C, S>) -> Vec<NodeRef<C, S>> {
        match self {
            Termination::MaxDepth(_) => root.deepest_descendant().path_from_root(),
            Termination::SearchForever => vec![root.clone()],
            Termination::FixedPasses(_) | Termination::WallClock(_) => best_path(root),
        }
    }
}

/// Greedy walk from the root along the highest-valued visited child.
fn best_path<C: Command, S: State>(root: &NodeRef<C, S>) -> Vec<NodeRef<C, S>> {
    let mut path = vec![root.clone()];
    let mut current = root.clone();
    loop {
        let next = current
            .children()
            .into_iter()
            .map(|(_, child)| child)
            .filter(|child| child.visits() > 0)
            .max_by(|a, b| {
                a.value()
                    .partial_cmp(&b.value())
                    .unwrap_or(CmpOrdering::Equal)
            });
        match next {
            Some(child) => {
                path.push(child.clone());
                current = child;
            }
            None => break,
        }
    }
    path
}

/// What a finished stage hands back.
pub struct StageOutcome<C: Command, S: State> {
    pub root: NodeRef<C, S>,
    /// Nodes the termination condition singles out, e.g. the best path
    /// found.
    pub results: Vec<NodeRef<C, S>>,
    pub passes: u64,
    pub sim_errors: u64,
    pub elapsed: Duration,
}

/// One phase of a search: a set of workers attacking a shared tree
/// until a termination condition is met. The stage thread only
/// monitors; all tree work happens on the workers.
pub struct TreeStage<G: Simulation> {
    root: NodeRef<G::Command, G::State>,
    termination: Termination,
    tick: Duration,
    state: StageState,
    workers: Vec<TreeWorker>,
}

impl<G: Simulation + Send + 'static> TreeStage<G> {
    pub fn new(root: NodeRef<G::Command, G::State>, termination: Termination) -> Self {
        TreeStage {
            root,
            termination,
            tick: Duration::from_millis(500),
            state: StageState::Initializing,
            workers: Vec::new(),
        }
    }

    /// How often the monitor polls the termination condition.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Start the workers and block until the stage finishes. Each
    /// worker gets its own simulation and sampler.
    pub fn run(
        mut self,
        bindings: Vec<(G, Ucb<G>)>,
    ) -> Result<StageOutcome<G::Command, G::State>, ConfigError> {
        self.start(bindings)?;
        Ok(self.monitor())
    }

    /// Start the workers and monitor them from a separate thread.
    pub fn spawn(
        mut self,
        bindings: Vec<(G, Ucb<G>)>,
    ) -> Result<StageHandle<G::Command, G::State>, ConfigError> {
        self.start(bindings)?;
        Ok(StageHandle {
            handle: std::thread::spawn(move || self.monitor()),
        })
    }

    fn start(&mut self, bindings: Vec<(G, Ucb<G>)>) -> Result<(), ConfigError> {
        if bindings.is_empty() {
            return Err(ConfigError::ZeroWorkers);
        }
        info!(
            "stage starting: {} workers, termination {:?}",
            bindings.len(),
            self.termination
        );
        self.workers = bindings
            .into_iter()
            .enumerate()
            .map(|(index, (sim, sampler))| {
                TreeWorker::spawn(index, self.root.clone(), sim, sampler)
            })
            .collect();
        self.state = StageState::Running;
        Ok(())
    }

    fn passes(&self) -> u64 {
        self.workers.iter().map(|w| w.stats().passes()).sum()
    }

    fn sim_errors(&self) -> u64 {
        self.workers.iter().map(|w| w.stats().sim_errors()).sum()
    }

    fn monitor(mut self) -> StageOutcome<G::Command, G::State> {
        let started = Instant::now();
        loop {
            if self.termination.met(&self.root, self.passes(), started) {
                debug!("stage termination condition met");
                break;
            }
            if !self.workers.iter().any(|w| w.is_running()) {
                debug!("stage workers all stopped on their own");
                break;
            }
            std::thread::sleep(self.tick);
        }

        self.state = StageState::Terminating;
        for worker in &mut self.workers {
            worker.join();
        }

        let outcome = StageOutcome {
            results: self.termination.results(&self.root),
            passes: self.passes(),
            sim_errors: self.sim_errors(),
            elapsed: started.elapsed(),
            root: self.root.clone(),
        };
        self.state = StageState::Finished;
        info!(
            "stage {:?}: {} passes, {} sim errors, {} nodes, {:.1?} elapsed",
            self.state,
            outcome.passes,
            outcome.sim_errors,
            outcome.root.count_descendants() + 1,
            outcome.elapsed,
        );
        outcome
    }
}

/// Running stage spawned off-thread. Poll or block for the outcome.
pub struct StageHandle<C: Command, S: State> {
    handle: JoinHandle<StageOutcome<C, S>>,
}

impl<C: Command, S: State> StageHandle<C, S> {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the stage completes.
    pub fn wait(self) -> StageOutcome<C, S> {
        self.handle.join().expect("stage monitor thread panicked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::{
        evaluate::ProgressEvaluator,
        node::{testing::*, Node},
        rollout::{testing::LineSim, JustEvaluate},
        update::Average,
    };

    fn bindings(n: usize, goal: Option<f32>) -> Vec<(LineSim, Ucb<LineSim>)> {
        (0..n)
            .map(|_| {
                let mut sampler = Ucb::new(
                    Box::new(ProgressEvaluator::default()),
                    Box::new(JustEvaluate::new(Box::new(ProgressEvaluator::default()))),
                    Arc::new(Average),
                    1.0,
                    0.1,
                );
                if let Some(goal) = goal {
                    sampler = sampler.with_goal(goal);
                }
                (LineSim::new(), sampler)
            })
            .collect()
    }

    #[test]
    fn stages_require_at_least_one_worker() {
        let root = Node::new_root(Flat::at(0.0), generator(1..3));
        let stage = TreeStage::<LineSim>::new(root, Termination::FixedPasses(1));
        assert!(matches!(
            stage.run(Vec::new()),
            Err(ConfigError::ZeroWorkers)
        ));
    }

    #[test]
    fn fixed_pass_stages_stop_and_report_a_path() {
        let root = Node::new_root(Flat::at(0.0), generator(1..4));
        let stage = TreeStage::new(root.clone(), Termination::FixedPasses(40))
            .with_tick(Duration::from_millis(1));
        let outcome = stage.run(bindings(2, None)).unwrap();
        assert!(outcome.passes >= 40);
        // The result path starts at the root and follows tree edges.
        assert!(Arc::ptr_eq(&outcome.results[0], &root));
        assert!(outcome.results.len() > 1);
    }

    #[test]
    fn search_forever_finishes_when_the_tree_is_exhausted() {
        let root = Node::new_root(Flat::at(0.0), generator(1..2));
        let stage = TreeStage::new(root.clone(), Termination::SearchForever)
            .with_tick(Duration::from_millis(1));
        let outcome = stage.run(bindings(2, Some(2.0))).unwrap();
        assert!(root.is_fully_explored());
        assert_eq!(outcome.results.len(), 1);
    }

    #[test]
    fn max_depth_stages_return_the_deepest_path() {
        let root = Node::new_root(Flat::at(0.0), generator(1..3));
        let stage = TreeStage::new(root.clone(), Termination::MaxDepth(4))
            .with_tick(Duration::from_millis(1));
        let outcome = stage.run(bindings(2, None)).unwrap();
        assert!(outcome.root.max_depth() >= 4);
        assert!(outcome.results.len() >= 5);
        assert!(Arc::ptr_eq(&outcome.results[0], &root));
    }

    #[test]
    fn spawned_stages_report_through_the_handle() {
        let root = Node::new_root(Flat::at(0.0), generator(1..3));
        let stage = TreeStage::new(root, Termination::WallClock(Duration::from_millis(20)))
            .with_tick(Duration::from_millis(1));
        let handle = stage.spawn(bindings(1, None)).unwrap();
        let outcome = handle.wait();
        assert!(outcome.elapsed >= Duration::from_millis(20));
        assert!(outcome.passes > 0);
    }
}
