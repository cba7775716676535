use rand::thread_rng;

use crate::{
    action::{Action, Command},
    evaluate::ValueFunction,
    node::Node,
    sim::State,
};

/// Chooses the next action during a rollout. Anything that can produce
/// actions qualifies: random choice among a node's candidates, a
/// learned evaluator, a scripted policy.
pub trait Controller<C: Command, S: State>: Send {
    /// The next action to take from this node, or `None` when the node
    /// offers no candidates.
    fn policy(&mut self, node: &Node<C, S>) -> Option<Action<C>>;

    fn boxed_clone(&self) -> Box<dyn Controller<C, S>>;
}

impl<C: Command, S: State> Clone for Box<dyn Controller<C, S>> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// Samples the node's candidate actions on their duration distribution.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomController;

impl<C: Command, S: State> Controller<C, S> for RandomController {
    fn policy(&mut self, node: &Node<C, S>) -> Option<Action<C>> {
        let mut rng = thread_rng();
        node.sample_untried(&mut rng)
            .or_else(|| node.candidate_actions().sample(&mut rng))
    }

    fn boxed_clone(&self) -> Box<dyn Controller<C, S>> {
        Box::new(*self)
    }
}

/// Asks a learned value function for its preferred action.
pub struct ValueController<C: Command, S: State> {
    value_function: Box<dyn ValueFunction<C, S>>,
}

impl<C: Command, S: State> ValueController<C, S> {
    pub fn new(value_function: Box<dyn ValueFunction<C, S>>) -> Self {
        ValueController { value_function }
    }
}

impl<C: Command, S: State> Controller<C, S> for ValueController<C, S> {
    fn policy(&mut self, node: &Node<C, S>) -> Option<Action<C>> {
        self.value_function.best_action(node)
    }

    fn boxed_clone(&self) -> Box<dyn Controller<C, S>> {
        Box::new(ValueController {
            value_function: self.value_function.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{testing::*, Node};

    #[test]
    fn random_controller_stays_within_candidates() {
        let root = Node::new_root(Flat::at(0.0), generator(1..4));
        let mut controller = RandomController;
        for _ in 0..20 {
            let action = Controller::<u8, Flat>::policy(&mut controller, &root).unwrap();
            assert!(action.duration >= 1 && action.duration < 4);
        }
    }
}
