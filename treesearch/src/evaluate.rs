use crate::{
    action::{Action, Command},
    node::Node,
    sim::State,
};

/// Scores a single node. Used to value frontier and terminal nodes
/// after rollouts are done.
pub trait Evaluator<C: Command, S: State>: Send {
    fn evaluate(&self, node: &Node<C, S>) -> f32;

    /// Human-readable breakdown of the score, for inspection tooling.
    fn value_string(&self, node: &Node<C, S>) -> String {
        format!("{}", self.evaluate(node))
    }

    fn boxed_clone(&self) -> Box<dyn Evaluator<C, S>>;
}

impl<C: Command, S: State> Clone for Box<dyn Evaluator<C, S>> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// Evaluation based strictly on the state's progress quantity.
#[derive(Clone, Copy, Debug)]
pub struct ProgressEvaluator {
    pub scaling_factor: f32,
}

impl Default for ProgressEvaluator {
    fn default() -> Self {
        ProgressEvaluator { scaling_factor: 1.0 }
    }
}

impl<C: Command, S: State> Evaluator<C, S> for ProgressEvaluator {
    fn evaluate(&self, node: &Node<C, S>) -> f32 {
        node.state().progress() * self.scaling_factor
    }

    fn value_string(&self, node: &Node<C, S>) -> String {
        format!(
            "progress {} x {} = {}",
            node.state().progress(),
            self.scaling_factor,
            self.evaluate(node)
        )
    }

    fn boxed_clone(&self) -> Box<dyn Evaluator<C, S>> {
        Box::new(*self)
    }
}

/// Fixed value regardless of the node. A sanity-check evaluator.
#[derive(Clone, Copy, Debug)]
pub struct ConstantEvaluator {
    pub value: f32,
}

impl<C: Command, S: State> Evaluator<C, S> for ConstantEvaluator {
    fn evaluate(&self, _node: &Node<C, S>) -> f32 {
        self.value
    }

    fn value_string(&self, _node: &Node<C, S>) -> String {
        format!("constant {}", self.value)
    }

    fn boxed_clone(&self) -> Box<dyn Evaluator<C, S>> {
        Box::new(*self)
    }
}

/// The seam for learned evaluators. How an implementation is trained or
/// loaded is none of the search's business; the search only asks for
/// scalar values and, optionally, a preferred action.
pub trait ValueFunction<C: Command, S: State>: Send {
    fn evaluate(&self, node: &Node<C, S>) -> f32;

    /// The action this function would take from the node, if it has an
    /// opinion. Used by value-guided rollout controllers.
    fn best_action(&self, node: &Node<C, S>) -> Option<Action<C>>;

    fn boxed_clone(&self) -> Box<dyn ValueFunction<C, S>>;
}

impl<C: Command, S: State> Clone for Box<dyn ValueFunction<C, S>> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}
