use std::sync::Arc;

use rand::{thread_rng, Rng};

use crate::{
    action::Command,
    evaluate::Evaluator,
    node::{Node, NodeRef},
    rollout::RolloutPolicy,
    sim::{run_action, Simulation, State},
    update::ValueUpdater,
};

/// Upper confidence bound for one child under its parent.
/// Unvisited children always win the comparison.
pub fn ucb_score(value: f32, exploration: f32, parent_visits: u32, child_visits: u32) -> f32 {
    if child_visits == 0 {
        return f32::INFINITY;
    }
    value + exploration * ((parent_visits.max(1) as f32).ln() / child_visits as f32).sqrt()
}

/// The not fully explored child with the highest upper confidence
/// bound, or `None` when every child is fully explored.
pub(crate) fn best_child<C: Command, S: State>(
    exploration: f32,
    node: &Node<C, S>,
) -> Option<NodeRef<C, S>> {
    let parent_visits = node.visits();
    let mut best: Option<NodeRef<C, S>> = None;
    let mut best_score = f32::NEG_INFINITY;
    for (_, child) in node.children() {
        if child.is_fully_explored() {
            continue;
        }
        let score = ucb_score(child.value(), exploration, parent_visits, child.visits());
        if score > best_score {
            best_score = score;
            best = Some(child);
        }
    }
    best
}

/// What one search pass did to the tree.
pub enum PassOutcome<C: Command, S: State> {
    /// A new frontier node was added (or an existing one re-sampled
    /// after losing an expansion race) and its score backpropagated.
    Expanded(NodeRef<C, S>),
    /// Selection found nothing left to try below the root. Definitive
    /// once the root's fully-explored flag is set.
    Exhausted,
}

/// One worker's sampling strategy: upper-confidence-bound selection,
/// single-node expansion, a rollout for the score, and
/// backpropagation through the chosen path.
///
/// The exploration constant is randomized per instance within
/// `[exploration_constant, exploration_constant +
/// exploration_random_factor)`, so parallel workers do not all chase
/// the same branch.
pub struct Ucb<G: Simulation> {
    exploration_constant: f32,
    exploration_random_factor: f32,
    exploration: f32,
    evaluator: Box<dyn Evaluator<G::Command, G::State>>,
    rollout: Box<dyn RolloutPolicy<G>>,
    updater: Arc<dyn ValueUpdater<G::Command, G::State>>,
    goal_progress: f32,
}

impl<G: Simulation> Ucb<G> {
    pub fn new(
        evaluator: Box<dyn Evaluator<G::Command, G::State>>,
        rollout: Box<dyn RolloutPolicy<G>>,
        updater: Arc<dyn ValueUpdater<G::Command, G::State>>,
        exploration_constant: f32,
        exploration_random_factor: f32,
    ) -> Self {
        let exploration =
            exploration_constant + exploration_random_factor * thread_rng().gen::<f32>();
        Ucb {
            exploration_constant,
            exploration_random_factor,
            exploration,
            evaluator,
            rollout,
            updater,
            goal_progress: f32::INFINITY,
        }
    }

    /// Progress at which a frontier node counts as terminal and is
    /// scored directly instead of rolled out.
    pub fn with_goal(mut self, goal_progress: f32) -> Self {
        self.goal_progress = goal_progress;
        self
    }

    pub fn exploration(&self) -> f32 {
        self.exploration
    }

    /// Copy for another worker. Re-rolls the randomized exploration
    /// constant.
    pub fn worker_copy(&self) -> Self {
        Ucb::new(
            self.evaluator.clone(),
            self.rollout.clone(),
            self.updater.clone(),
            self.exploration_constant,
            self.exploration_random_factor,
        )
        .with_goal(self.goal_progress)
    }

    fn is_terminal(&self, node: &Node<G::Command, G::State>) -> bool {
        node.state().is_failed() || node.state().progress() >= self.goal_progress
    }

    /// Run one full select-expand-evaluate-backpropagate pass from the
    /// root. A simulation error abandons the pass without touching any
    /// statistics; the tree is left structurally intact.
    pub fn run_pass(
        &mut self,
        root: &NodeRef<G::Command, G::State>,
        sim: &mut G,
    ) -> Result<PassOutcome<G::Command, G::State>, G::Error> {
        sim.reset();
        sim.set_state(root.state());

        // Selection: walk down by upper confidence bound until a node
        // with untried actions turns up.
        let mut current = root.clone();
        let (frontier, action) = loop {
            if current.is_fully_explored() {
                return Ok(PassOutcome::Exhausted);
            }
            if self.is_terminal(&current) {
                current.close();
                return Ok(PassOutcome::Exhausted);
            }
            if let Some(action) = current.sample_untried(&mut thread_rng()) {
                break (current, action);
            }
            match best_child(self.exploration, &current) {
                Some(child) => {
                    let step = child
                        .action()
                        .expect("selected child below the root carries an action");
                    run_action(sim, step)?;
                    current = child;
                }
                None => {
                    // Every child became fully explored since we
                    // descended into this node.
                    current.recheck_fully_explored();
                    return Ok(PassOutcome::Exhausted);
                }
            }
        };

        // Expansion. Losing the insertion race is fine: the extra
        // sample is scored against the existing child.
        let state = run_action(sim, action)?;
        let (child, _created) = frontier.expand_child(action, state, None);

        let score = if self.is_terminal(&child) {
            // Terminal nodes are leaves; nothing below them is worth
            // expanding.
            child.close();
            self.evaluator.evaluate(&child)
        } else {
            self.rollout.rollout(&child, sim)?
        };

        // Backpropagation covers the full path, root included. A pass
        // in flight always completes its backpropagation, even when a
        // stop was requested meanwhile.
        for node in child.path_from_root().iter().rev() {
            node.update_value(score, &*self.updater);
        }
        child.recheck_fully_explored();
        Ok(PassOutcome::Expanded(child))
    }
}
