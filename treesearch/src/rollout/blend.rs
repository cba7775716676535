use crate::{
    error::ConfigError,
    evaluate::ValueFunction,
    node::NodeRef,
    rollout::RolloutPolicy,
    sim::Simulation,
};

/// Linear blend of a simulated rollout and a learned value estimate of
/// the frontier. `weight` is the share given to the value function.
pub struct BlendRollout<G: Simulation> {
    inner: Box<dyn RolloutPolicy<G>>,
    value_function: Box<dyn ValueFunction<G::Command, G::State>>,
    weight: f32,
}

impl<G: Simulation> BlendRollout<G> {
    pub fn new(
        inner: Box<dyn RolloutPolicy<G>>,
        value_function: Box<dyn ValueFunction<G::Command, G::State>>,
        weight: f32,
    ) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&weight) {
            return Err(ConfigError::WeightOutOfRange(weight));
        }
        Ok(BlendRollout {
            inner,
            value_function,
            weight,
        })
    }
}

impl<G: Simulation + 'static> RolloutPolicy<G> for BlendRollout<G> {
    fn rollout(
        &mut self,
        frontier: &NodeRef<G::Command, G::State>,
        sim: &mut G,
    ) -> Result<f32, G::Error> {
        let estimated = self.value_function.evaluate(frontier);
        let simulated = self.inner.rollout(frontier, sim)?;
        Ok((1.0 - self.weight) * simulated + self.weight * estimated)
    }

    fn boxed_clone(&self) -> Box<dyn RolloutPolicy<G>> {
        Box::new(BlendRollout {
            inner: self.inner.clone(),
            value_function: self.value_function.clone(),
            weight: self.weight,
        })
    }
}
