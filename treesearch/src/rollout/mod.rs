mod blend;
mod delta;
mod horizon;
mod just;
mod multi;
mod window;

pub use blend::BlendRollout;
pub use delta::DeltaScoreRollout;
pub use horizon::{horizon_kernel, DecayingHorizonRollout};
pub use just::JustEvaluate;
pub use multi::MultiChildrenRollout;
pub use window::{WindowAggregation, WindowRollout};

use std::sync::Arc;

use crate::{
    action::ActionQueue,
    controller::Controller,
    error::ConfigError,
    generator::ActionGenerator,
    node::{Node, NodeRef},
    sim::{Simulation, State},
};

/// Estimates the value of a frontier node by simulating forward from
/// it. The simulation is already positioned at the frontier's state
/// when `rollout` is called.
///
/// Policies are copied per worker; a copy must be functionally
/// identical and independently stateful.
pub trait RolloutPolicy<G: Simulation>: Send {
    fn rollout(
        &mut self,
        frontier: &NodeRef<G::Command, G::State>,
        sim: &mut G,
    ) -> Result<f32, G::Error>;

    fn boxed_clone(&self) -> Box<dyn RolloutPolicy<G>>;
}

impl<G: Simulation> Clone for Box<dyn RolloutPolicy<G>> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// When a rollout stops: failure, the timestep budget, or a goal
/// progress threshold.
#[derive(Clone, Copy, Debug)]
pub struct RolloutLimits {
    max_timesteps: u32,
    pub goal_progress: f32,
}

impl RolloutLimits {
    pub fn new(max_timesteps: u32) -> Result<Self, ConfigError> {
        if max_timesteps < 1 {
            return Err(ConfigError::InvalidMaxTimesteps(max_timesteps));
        }
        Ok(RolloutLimits {
            max_timesteps,
            goal_progress: f32::INFINITY,
        })
    }

    pub fn with_goal(mut self, goal_progress: f32) -> Self {
        self.goal_progress = goal_progress;
        self
    }

    pub fn max_timesteps(&self) -> u32 {
        self.max_timesteps
    }
}

/// Reset the simulation and replay the action sequence leading to a
/// node. The slow but exact way to reposition.
pub fn sim_to_node<G: Simulation>(
    node: &NodeRef<G::Command, G::State>,
    sim: &mut G,
) -> Result<(), G::Error> {
    sim.reset();
    let mut queue = ActionQueue::new();
    queue.push_sequence(node.action_sequence());
    while let Some(command) = queue.poll_command() {
        if sim.is_failed() {
            break;
        }
        sim.step(command)?;
    }
    Ok(())
}

/// Force-set the simulation to a node's state without simulating to
/// it. Faster than replay for deep trees; warm-start internals of the
/// simulation are not reproduced.
pub fn cold_start_to_node<G: Simulation>(node: &NodeRef<G::Command, G::State>, sim: &mut G) {
    sim.reset();
    sim.set_state(node.state());
}

/// The shared rollout loop: ask the controller for actions and step
/// the simulation until failure, the timestep budget, or the goal.
/// Builds a detached node chain so controllers see proper nodes, and
/// calls `on_step` once per simulated timestep with the states before
/// and after it. Returns the terminal node and the number of timesteps
/// simulated.
pub(crate) fn drive<G, F>(
    frontier: &NodeRef<G::Command, G::State>,
    sim: &mut G,
    controller: &mut dyn Controller<G::Command, G::State>,
    generator: Option<&Arc<dyn ActionGenerator<G::Command>>>,
    limits: &RolloutLimits,
    mut on_step: F,
) -> Result<(NodeRef<G::Command, G::State>, u32), G::Error>
where
    G: Simulation,
    F: FnMut(u32, &G::State, &G::State),
{
    // Re-frame the frontier under the rollout's own action generator so
    // the controller picks from the rollout repertoire, not the tree's.
    let mut node = match generator {
        Some(generator) => match (frontier.parent(), frontier.action()) {
            (Some(parent), Some(action)) => {
                parent.detached_child(action, frontier.state().clone(), Some(generator.clone()))
            }
            _ => Node::new_root(frontier.state().clone(), generator.clone()),
        },
        None => frontier.clone(),
    };

    let mut steps = 0u32;
    loop {
        let state = node.state();
        if state.is_failed()
            || steps >= limits.max_timesteps
            || state.progress() >= limits.goal_progress
        {
            break;
        }
        let Some(action) = controller.policy(&node) else {
            break;
        };

        let mut before = sim.current_state();
        let mut executed = 0;
        while executed < action.duration && steps < limits.max_timesteps && !sim.is_failed() {
            let after = sim.step(action.command)?;
            on_step(steps, &before, &after);
            before = after;
            steps += 1;
            executed += 1;
        }
        node = node.detached_child(action, sim.current_state(), None);
    }
    Ok((node, steps))
}

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests;
