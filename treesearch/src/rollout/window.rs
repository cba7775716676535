use crate::{
    action::Action,
    error::ConfigError,
    evaluate::Evaluator,
    node::NodeRef,
    rollout::{sim_to_node, RolloutPolicy},
    sim::{run_action, Simulation},
};

/// How a [`WindowRollout`] folds the frontier score and its duration
/// neighbors into one number.
#[derive(Clone, Copy, Debug)]
pub enum WindowAggregation {
    Best,
    Worst,
    Average,
    /// Weighted mean with separate weights for the middle action and
    /// its neighbors. Missing neighbors drop out and the remaining
    /// weights renormalize.
    Weighted { middle: f32, adjacent: f32 },
}

impl Default for WindowAggregation {
    fn default() -> Self {
        WindowAggregation::Weighted {
            middle: 0.6,
            adjacent: 0.2,
        }
    }
}

/// Runs the inner rollout for the frontier's action and for the same
/// command at one timestep more and one timestep less, then aggregates.
/// A score that collapses when the duration is off by one was luck,
/// not a plan.
pub struct WindowRollout<G: Simulation> {
    inner: Box<dyn RolloutPolicy<G>>,
    evaluator: Box<dyn Evaluator<G::Command, G::State>>,
    aggregation: WindowAggregation,
}

impl<G: Simulation> WindowRollout<G> {
    pub fn new(
        inner: Box<dyn RolloutPolicy<G>>,
        evaluator: Box<dyn Evaluator<G::Command, G::State>>,
        aggregation: WindowAggregation,
    ) -> Result<Self, ConfigError> {
        if let WindowAggregation::Weighted { middle, adjacent } = aggregation {
            if middle < 0.0 || middle + 2.0 * adjacent <= 0.0 {
                return Err(ConfigError::WeightOutOfRange(middle));
            }
            if adjacent < 0.0 {
                return Err(ConfigError::WeightOutOfRange(adjacent));
            }
        }
        Ok(WindowRollout {
            inner,
            evaluator,
            aggregation,
        })
    }

    fn aggregate(&self, middle_score: f32, neighbors: &[f32]) -> f32 {
        let all = std::iter::once(middle_score).chain(neighbors.iter().copied());
        match self.aggregation {
            WindowAggregation::Best => all.fold(f32::MIN, f32::max),
            WindowAggregation::Worst => all.fold(f32::MAX, f32::min),
            WindowAggregation::Average => {
                all.sum::<f32>() / (1 + neighbors.len()) as f32
            }
            WindowAggregation::Weighted { middle, adjacent } => {
                let mut numerator = middle * middle_score;
                let mut denominator = middle;
                for score in neighbors {
                    numerator += adjacent * score;
                    denominator += adjacent;
                }
                numerator / denominator
            }
        }
    }
}

impl<G: Simulation + 'static> RolloutPolicy<G> for WindowRollout<G> {
    fn rollout(
        &mut self,
        frontier: &NodeRef<G::Command, G::State>,
        sim: &mut G,
    ) -> Result<f32, G::Error> {
        // Only non-root nodes have an action to vary.
        let (Some(action), Some(parent)) = (frontier.action(), frontier.parent()) else {
            return self.inner.rollout(frontier, sim);
        };
        let frontier_value = self.evaluator.evaluate(frontier);
        let middle_score = self.inner.rollout(frontier, sim)?;

        let mut neighbors = Vec::with_capacity(2);
        for offset in [-1i64, 1] {
            let duration = action.duration as i64 + offset;
            if duration < 1 {
                continue;
            }
            let probe_action = Action::new(action.command, duration as u32);
            sim_to_node(&parent, sim)?;
            let state = run_action(sim, probe_action)?;
            let probe = parent.detached_child(probe_action, state, None);
            // Re-base the neighbor's score to the frontier's evaluation
            // so all three scores measure gains from the same origin.
            let score = self.inner.rollout(&probe, sim)?
                + self.evaluator.evaluate(&probe)
                - frontier_value;
            neighbors.push(score);
        }
        Ok(self.aggregate(middle_score, &neighbors))
    }

    fn boxed_clone(&self) -> Box<dyn RolloutPolicy<G>> {
        Box::new(WindowRollout {
            inner: self.inner.clone(),
            evaluator: self.evaluator.clone(),
            aggregation: self.aggregation,
        })
    }
}
