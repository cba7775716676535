use std::{
    collections::VecDeque,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, Weak,
    },
};

use rand::Rng;

use crate::{
    action::{Action, ActionList, Command},
    generator::ActionGenerator,
    sim::State,
    update::ValueUpdater,
};

pub type NodeRef<C, S> = Arc<Node<C, S>>;

/// One vertex of the shared search tree.
///
/// The node graph is the only mutable resource shared between workers.
/// Mutation is guarded per node: the child table and untried actions
/// share one lock, the visit/value statistics another, and the
/// fully-explored flag is a monotonic atomic. Locks are only ever
/// nested as stats-then-links within one node or parent-then-child
/// across levels, so concurrent passes cannot deadlock.
pub struct Node<C: Command, S: State> {
    /// Action that produced this node. `None` only at the tree root.
    action: Option<Action<C>>,
    state: S,
    depth: u32,
    parent: Weak<Node<C, S>>,
    generator: Arc<dyn ActionGenerator<C>>,
    links: Mutex<Links<C, S>>,
    stats: Mutex<Stats>,
    fully_explored: AtomicBool,
}

struct Links<C: Command, S: State> {
    children: Vec<(Action<C>, NodeRef<C, S>)>,
    untried: ActionList<C>,
}

#[derive(Clone, Copy, Default)]
struct Stats {
    visits: u32,
    value: f32,
}

impl<C: Command, S: State> Node<C, S> {
    /// Create the root of a new search tree from an externally supplied
    /// initial state.
    pub fn new_root(state: S, generator: Arc<dyn ActionGenerator<C>>) -> NodeRef<C, S> {
        let untried = Self::initial_untried(&state, &generator, 0);
        let failed = state.is_failed();
        Arc::new(Node {
            action: None,
            state,
            depth: 0,
            parent: Weak::new(),
            generator,
            links: Mutex::new(Links { children: Vec::new(), untried }),
            stats: Mutex::new(Stats::default()),
            fully_explored: AtomicBool::new(failed),
        })
    }

    fn initial_untried(
        state: &S,
        generator: &Arc<dyn ActionGenerator<C>>,
        depth: u32,
    ) -> ActionList<C> {
        if state.is_failed() {
            ActionList::empty()
        } else {
            generator.candidate_actions(depth)
        }
    }

    fn child(
        parent: &NodeRef<C, S>,
        action: Action<C>,
        state: S,
        generator: Arc<dyn ActionGenerator<C>>,
    ) -> NodeRef<C, S> {
        let depth = parent.depth + 1;
        let untried = Self::initial_untried(&state, &generator, depth);
        let failed = state.is_failed();
        Arc::new(Node {
            action: Some(action),
            state,
            depth,
            parent: Arc::downgrade(parent),
            generator,
            links: Mutex::new(Links { children: Vec::new(), untried }),
            stats: Mutex::new(Stats::default()),
            fully_explored: AtomicBool::new(failed),
        })
    }

    /// Insert a child for `action`, or return the existing one when a
    /// concurrent worker expanded the same action first. The check and
    /// the insert happen under one lock, so a node can never hold two
    /// children for the same action. Returns the child and whether it
    /// was created by this call.
    pub fn expand_child(
        self: &NodeRef<C, S>,
        action: Action<C>,
        state: S,
        generator: Option<Arc<dyn ActionGenerator<C>>>,
    ) -> (NodeRef<C, S>, bool) {
        let generator = generator.unwrap_or_else(|| self.generator.clone());
        let mut links = self.links.lock().unwrap();
        if let Some((_, existing)) = links.children.iter().find(|(a, _)| *a == action) {
            return (existing.clone(), false);
        }
        let child = Self::child(self, action, state, generator);
        links.untried.remove(&action);
        links.children.push((action, child.clone()));
        (child, true)
    }

    /// Create a child that knows its parent but is not inserted into
    /// the parent's child table. Used for transient rollout chains and
    /// window probes that must not become part of the tree.
    pub fn detached_child(
        self: &NodeRef<C, S>,
        action: Action<C>,
        state: S,
        generator: Option<Arc<dyn ActionGenerator<C>>>,
    ) -> NodeRef<C, S> {
        let generator = generator.unwrap_or_else(|| self.generator.clone());
        Self::child(self, action, state, generator)
    }

    pub fn action(&self) -> Option<Action<C>> {
        self.action
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn parent(&self) -> Option<NodeRef<C, S>> {
        self.parent.upgrade()
    }

    pub fn generator(&self) -> &Arc<dyn ActionGenerator<C>> {
        &self.generator
    }

    pub fn visits(&self) -> u32 {
        self.stats.lock().unwrap().visits
    }

    pub fn value(&self) -> f32 {
        self.stats.lock().unwrap().value
    }

    pub fn is_fully_explored(&self) -> bool {
        self.fully_explored.load(Ordering::Acquire)
    }

    pub fn child_count(&self) -> usize {
        self.links.lock().unwrap().children.len()
    }

    /// Snapshot of the current children. Safe to iterate without
    /// holding any lock.
    pub fn children(&self) -> Vec<(Action<C>, NodeRef<C, S>)> {
        self.links.lock().unwrap().children.clone()
    }

    pub fn untried_count(&self) -> usize {
        self.links.lock().unwrap().untried.len()
    }

    pub fn untried_actions(&self) -> Vec<Action<C>> {
        self.links.lock().unwrap().untried.actions().to_vec()
    }

    /// Pick one untried action on the candidate list's duration
    /// distribution. The action stays untried until a child for it is
    /// actually inserted; concurrent picks of the same action merge at
    /// insertion time.
    pub fn sample_untried<R: Rng>(&self, rng: &mut R) -> Option<Action<C>> {
        self.links.lock().unwrap().untried.sample(rng)
    }

    /// Candidate actions this node was assigned at creation.
    pub fn candidate_actions(&self) -> ActionList<C> {
        self.generator.candidate_actions(self.depth)
    }

    /// Apply one backpropagation sample. The updater receives the
    /// node's current statistics as arguments; it must not read
    /// `visits()` or `value()` on the node itself, since their lock is
    /// held for the duration of the update.
    pub fn update_value(&self, sample: f32, updater: &dyn ValueUpdater<C, S>) {
        let mut stats = self.stats.lock().unwrap();
        stats.value = updater.update(stats.value, stats.visits, sample, self);
        stats.visits += 1;
    }

    fn is_exhausted(&self) -> bool {
        if self.state.is_failed() {
            return true;
        }
        let links = self.links.lock().unwrap();
        links.untried.is_empty() && links.children.iter().all(|(_, c)| c.is_fully_explored())
    }

    /// Re-check the fully-explored flag here and propagate upward as
    /// far as the flag keeps flipping. The flag is monotonic: it is
    /// only ever set, never cleared.
    pub fn recheck_fully_explored(self: &NodeRef<C, S>) {
        let mut current = self.clone();
        loop {
            if !current.is_exhausted() {
                break;
            }
            current.fully_explored.store(true, Ordering::Release);
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
    }

    /// Close this node for further expansion regardless of remaining
    /// untried actions, then propagate upward. Used when a node reaches
    /// a terminal condition other than failure, e.g. a goal threshold.
    pub fn close(self: &NodeRef<C, S>) {
        self.fully_explored.store(true, Ordering::Release);
        if let Some(parent) = self.parent() {
            parent.recheck_fully_explored();
        }
    }

    /// Actions from the root to this node, in replay order.
    pub fn action_sequence(&self) -> Vec<Action<C>> {
        let mut sequence = Vec::with_capacity(self.depth as usize);
        if let Some(action) = self.action {
            sequence.push(action);
        }
        let mut current = self.parent();
        while let Some(node) = current {
            if let Some(action) = node.action {
                sequence.push(action);
            }
            current = node.parent();
        }
        sequence.reverse();
        sequence
    }

    /// Nodes from the root down to this one, inclusive.
    pub fn path_from_root(self: &NodeRef<C, S>) -> Vec<NodeRef<C, S>> {
        let mut path = vec![self.clone()];
        let mut current = self.parent();
        while let Some(node) = current {
            current = node.parent();
            path.push(node);
        }
        path.reverse();
        path
    }

    pub fn iter_depth_first(self: &NodeRef<C, S>) -> DepthFirst<C, S> {
        DepthFirst { stack: vec![self.clone()] }
    }

    pub fn iter_breadth_first(self: &NodeRef<C, S>) -> BreadthFirst<C, S> {
        BreadthFirst {
            queue: VecDeque::from([self.clone()]),
        }
    }

    /// Number of nodes below this one (not counting this one).
    pub fn count_descendants(self: &NodeRef<C, S>) -> usize {
        self.iter_depth_first().count() - 1
    }

    /// The deepest node in this subtree; first-encountered wins ties.
    pub fn deepest_descendant(self: &NodeRef<C, S>) -> NodeRef<C, S> {
        let mut deepest = self.clone();
        for node in self.iter_depth_first() {
            if node.depth > deepest.depth {
                deepest = node;
            }
        }
        deepest
    }

    /// Greatest tree depth reached anywhere in this subtree.
    pub fn max_depth(self: &NodeRef<C, S>) -> u32 {
        self.iter_depth_first().map(|n| n.depth).max().unwrap_or(self.depth)
    }
}

impl<C: Command, S: State + fmt::Debug> fmt::Debug for Node<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("action", &self.action)
            .field("depth", &self.depth)
            .field("visits", &self.visits())
            .field("value", &self.value())
            .field("fully_explored", &self.is_fully_explored())
            .field("state", &self.state)
            .finish()
    }
}

pub struct DepthFirst<C: Command, S: State> {
    stack: Vec<NodeRef<C, S>>,
}

impl<C: Command, S: State> Iterator for DepthFirst<C, S> {
    type Item = NodeRef<C, S>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().into_iter().map(|(_, c)| c));
        Some(node)
    }
}

pub struct BreadthFirst<C: Command, S: State> {
    queue: VecDeque<NodeRef<C, S>>,
}

impl<C: Command, S: State> Iterator for BreadthFirst<C, S> {
    type Item = NodeRef<C, S>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;
        self.queue.extend(node.children().into_iter().map(|(_, c)| c));
        Some(node)
    }
}
