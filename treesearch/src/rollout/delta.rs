use std::sync::Arc;

use crate::{
    controller::Controller,
    evaluate::Evaluator,
    generator::ActionGenerator,
    node::NodeRef,
    rollout::{drive, RolloutLimits, RolloutPolicy},
    sim::{Simulation, State},
};

/// Scores a rollout by how much the evaluation improved between the
/// frontier and wherever the rollout ended. Rollouts that end in
/// failure have their score scaled by `failure_multiplier`, usually to
/// discount them.
pub struct DeltaScoreRollout<G: Simulation> {
    evaluator: Box<dyn Evaluator<G::Command, G::State>>,
    controller: Box<dyn Controller<G::Command, G::State>>,
    generator: Arc<dyn ActionGenerator<G::Command>>,
    limits: RolloutLimits,
    pub failure_multiplier: f32,
}

impl<G: Simulation> DeltaScoreRollout<G> {
    pub fn new(
        evaluator: Box<dyn Evaluator<G::Command, G::State>>,
        controller: Box<dyn Controller<G::Command, G::State>>,
        generator: Arc<dyn ActionGenerator<G::Command>>,
        limits: RolloutLimits,
    ) -> Self {
        DeltaScoreRollout {
            evaluator,
            controller,
            generator,
            limits,
            failure_multiplier: 1.0,
        }
    }

    pub fn with_failure_multiplier(mut self, failure_multiplier: f32) -> Self {
        self.failure_multiplier = failure_multiplier;
        self
    }
}

impl<G: Simulation + 'static> RolloutPolicy<G> for DeltaScoreRollout<G> {
    fn rollout(
        &mut self,
        frontier: &NodeRef<G::Command, G::State>,
        sim: &mut G,
    ) -> Result<f32, G::Error> {
        let start = -self.evaluator.evaluate(frontier);
        let (terminal, _) = drive(
            frontier,
            sim,
            &mut *self.controller,
            Some(&self.generator),
            &self.limits,
            |_, _, _| {},
        )?;
        let total = start + self.evaluator.evaluate(&terminal);
        Ok(if terminal.state().is_failed() {
            total * self.failure_multiplier
        } else {
            total
        })
    }

    fn boxed_clone(&self) -> Box<dyn RolloutPolicy<G>> {
        Box::new(DeltaScoreRollout {
            evaluator: self.evaluator.clone(),
            controller: self.controller.clone(),
            generator: self.generator.clone(),
            limits: self.limits,
            failure_multiplier: self.failure_multiplier,
        })
    }
}
