use std::error::Error;

use crate::action::{Action, Command};

/// A snapshot of the simulated world. Treated as immutable once it is
/// attached to a node.
pub trait State: Clone + PartialEq + Send + Sync + 'static {
    /// Scalar progress quantity, e.g. horizontal distance covered.
    fn progress(&self) -> f32;

    /// Whether the run has failed in this state.
    fn is_failed(&self) -> bool;
}

/// The external simulation engine, used single-threaded by exactly one
/// worker. The search never inspects its internals; it only drives it
/// through this interface.
pub trait Simulation {
    type Command: Command;
    type State: State;
    /// A degenerate simulation step (e.g. a numerically broken physics
    /// update). Fails the current search pass; the worker logs it and
    /// moves on to its next pass.
    type Error: Error + Send + Sync + 'static;

    /// Return to the initial state.
    fn reset(&mut self);

    /// Advance exactly one timestep under the given command.
    fn step(&mut self, command: Self::Command) -> Result<Self::State, Self::Error>;

    fn current_state(&self) -> Self::State;

    fn is_failed(&self) -> bool;

    /// Force a state without simulating to it.
    fn set_state(&mut self, state: &Self::State);
}

/// Step the simulation through one full timed action, stopping early on
/// failure. Returns the state after the last executed timestep.
pub fn run_action<G: Simulation>(
    sim: &mut G,
    action: Action<G::Command>,
) -> Result<G::State, G::Error> {
    let mut state = sim.current_state();
    for _ in 0..action.duration {
        if state.is_failed() {
            break;
        }
        state = sim.step(action.command)?;
    }
    Ok(state)
}
