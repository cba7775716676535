use crate::{
    error::ConfigError,
    node::NodeRef,
    rollout::{cold_start_to_node, sim_to_node, RolloutPolicy},
    sim::{run_action, Simulation},
};

/// Averages the inner rollout over several of the frontier's untried
/// actions instead of just one, sampling them evenly across the
/// candidate list. Smooths the estimate for nodes with wide fan-out.
pub struct MultiChildrenRollout<G: Simulation> {
    inner: Box<dyn RolloutPolicy<G>>,
    max_rollouts: usize,
    /// Reposition by force-setting state rather than replaying the
    /// action sequence. Faster, but skips simulation warm-up.
    pub cold_start: bool,
}

impl<G: Simulation> MultiChildrenRollout<G> {
    pub fn new(
        inner: Box<dyn RolloutPolicy<G>>,
        max_rollouts: usize,
    ) -> Result<Self, ConfigError> {
        if max_rollouts == 0 {
            return Err(ConfigError::ZeroRollouts);
        }
        Ok(MultiChildrenRollout {
            inner,
            max_rollouts,
            cold_start: false,
        })
    }

    pub fn with_cold_start(mut self, cold_start: bool) -> Self {
        self.cold_start = cold_start;
        self
    }
}

impl<G: Simulation + 'static> RolloutPolicy<G> for MultiChildrenRollout<G> {
    fn rollout(
        &mut self,
        frontier: &NodeRef<G::Command, G::State>,
        sim: &mut G,
    ) -> Result<f32, G::Error> {
        let untried = frontier.untried_actions();
        if untried.is_empty() {
            return self.inner.rollout(frontier, sim);
        }

        // Evenly spaced indices over the untried list, at most
        // `max_rollouts` of them.
        let advancement = if untried.len() > self.max_rollouts {
            untried.len() as f32 / self.max_rollouts as f32
        } else {
            1.0
        };

        let mut total = 0.0;
        let mut count = 0u32;
        let mut cursor = 0.0f32;
        while (cursor as usize) < untried.len() {
            if count > 0 {
                if self.cold_start {
                    cold_start_to_node(frontier, sim);
                } else {
                    sim_to_node(frontier, sim)?;
                }
            }
            let action = untried[cursor as usize];
            let state = run_action(sim, action)?;
            let child = frontier.detached_child(action, state, None);
            total += self.inner.rollout(&child, sim)?;
            count += 1;
            cursor += advancement;
        }
        Ok(total / count as f32)
    }

    fn boxed_clone(&self) -> Box<dyn RolloutPolicy<G>> {
        Box::new(MultiChildrenRollout {
            inner: self.inner.clone(),
            max_rollouts: self.max_rollouts,
            cold_start: self.cold_start,
        })
    }
}
