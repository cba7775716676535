use std::{collections::VecDeque, convert::Infallible};

use crate::{
    action::Action,
    controller::Controller,
    evaluate::ValueFunction,
    node::{testing::Flat, Node},
    sim::Simulation,
};

/// One-dimensional simulation for rollout tests. Command 0 advances a
/// full unit per timestep, 1 a half unit, 9 fails the run, anything
/// else coasts.
pub(crate) struct LineSim {
    state: Flat,
}

impl LineSim {
    pub fn new() -> Self {
        LineSim { state: Flat::at(0.0) }
    }
}

impl Simulation for LineSim {
    type Command = u8;
    type State = Flat;
    type Error = Infallible;

    fn reset(&mut self) {
        self.state = Flat::at(0.0);
    }

    fn step(&mut self, command: u8) -> Result<Flat, Infallible> {
        match command {
            0 => self.state.x += 1.0,
            1 => self.state.x += 0.5,
            9 => self.state.failed = true,
            _ => {}
        }
        Ok(self.state.clone())
    }

    fn current_state(&self) -> Flat {
        self.state.clone()
    }

    fn is_failed(&self) -> bool {
        self.state.failed
    }

    fn set_state(&mut self, state: &Flat) {
        self.state = state.clone();
    }
}

/// Plays back a fixed list of actions, then reports no candidates.
#[derive(Clone)]
pub(crate) struct ScriptController {
    script: VecDeque<Action<u8>>,
}

impl ScriptController {
    pub fn new(actions: impl IntoIterator<Item = Action<u8>>) -> Self {
        ScriptController {
            script: actions.into_iter().collect(),
        }
    }
}

impl Controller<u8, Flat> for ScriptController {
    fn policy(&mut self, _node: &Node<u8, Flat>) -> Option<Action<u8>> {
        self.script.pop_front()
    }

    fn boxed_clone(&self) -> Box<dyn Controller<u8, Flat>> {
        Box::new(self.clone())
    }
}

/// Always returns the same value and never suggests an action.
#[derive(Clone, Copy)]
pub(crate) struct FixedValueFunction(pub f32);

impl ValueFunction<u8, Flat> for FixedValueFunction {
    fn evaluate(&self, _node: &Node<u8, Flat>) -> f32 {
        self.0
    }

    fn best_action(&self, _node: &Node<u8, Flat>) -> Option<Action<u8>> {
        None
    }

    fn boxed_clone(&self) -> Box<dyn ValueFunction<u8, Flat>> {
        Box::new(*self)
    }
}
