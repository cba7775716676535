use std::sync::Arc;

use crate::{
    controller::Controller,
    generator::ActionGenerator,
    node::NodeRef,
    rollout::{drive, RolloutLimits, RolloutPolicy},
    sim::{Simulation, State},
};

pub const KERNEL_CENTER: f32 = 0.5;
pub const KERNEL_STEEPNESS: f32 = 5.0;

/// S-curve weight for a timestep at normalized position `t` in `[0,
/// 1]`. Near one at the start of the rollout, near zero at the end,
/// exactly one half at the center.
pub fn horizon_kernel(t: f32) -> f32 {
    -0.5 * (KERNEL_STEEPNESS * (t - KERNEL_CENTER)).tanh() + 0.5
}

/// Accumulates per-timestep progress gains weighted by how early in
/// the rollout they happen. Gains far in the future count for almost
/// nothing, which keeps the score honest about horizon uncertainty.
pub struct DecayingHorizonRollout<G: Simulation> {
    controller: Box<dyn Controller<G::Command, G::State>>,
    generator: Arc<dyn ActionGenerator<G::Command>>,
    limits: RolloutLimits,
}

impl<G: Simulation> DecayingHorizonRollout<G> {
    pub fn new(
        controller: Box<dyn Controller<G::Command, G::State>>,
        generator: Arc<dyn ActionGenerator<G::Command>>,
        limits: RolloutLimits,
    ) -> Self {
        DecayingHorizonRollout {
            controller,
            generator,
            limits,
        }
    }
}

impl<G: Simulation + 'static> RolloutPolicy<G> for DecayingHorizonRollout<G> {
    fn rollout(
        &mut self,
        frontier: &NodeRef<G::Command, G::State>,
        sim: &mut G,
    ) -> Result<f32, G::Error> {
        let horizon = self.limits.max_timesteps() as f32;
        let mut total = 0.0;
        drive(
            frontier,
            sim,
            &mut *self.controller,
            Some(&self.generator),
            &self.limits,
            |step, before, after| {
                let weight = horizon_kernel(step as f32 / horizon);
                total += weight * (after.progress() - before.progress());
            },
        )?;
        Ok(total)
    }

    fn boxed_clone(&self) -> Box<dyn RolloutPolicy<G>> {
        Box::new(DecayingHorizonRollout {
            controller: self.controller.clone(),
            generator: self.generator.clone(),
            limits: self.limits,
        })
    }
}
