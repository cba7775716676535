use crate::{evaluate::Evaluator, node::NodeRef, rollout::RolloutPolicy, sim::Simulation};

/// No simulation at all: the rollout score is the evaluator applied to
/// the frontier. The degenerate baseline, and the natural leaf for
/// composed rollouts.
pub struct JustEvaluate<G: Simulation> {
    evaluator: Box<dyn Evaluator<G::Command, G::State>>,
}

impl<G: Simulation> JustEvaluate<G> {
    pub fn new(evaluator: Box<dyn Evaluator<G::Command, G::State>>) -> Self {
        JustEvaluate { evaluator }
    }
}

impl<G: Simulation + 'static> RolloutPolicy<G> for JustEvaluate<G> {
    fn rollout(
        &mut self,
        frontier: &NodeRef<G::Command, G::State>,
        _sim: &mut G,
    ) -> Result<f32, G::Error> {
        Ok(self.evaluator.evaluate(frontier))
    }

    fn boxed_clone(&self) -> Box<dyn RolloutPolicy<G>> {
        Box::new(JustEvaluate {
            evaluator: self.evaluator.clone(),
        })
    }
}
