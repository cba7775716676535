use std::collections::{HashMap, HashSet};

use crate::{
    action::{Action, ActionList, Command},
    error::ConfigError,
};

/// Produces the legal candidate actions for a node. Must be a pure
/// function of tree depth so that replaying an action sequence always
/// reconstructs the same candidate sets.
pub trait ActionGenerator<C: Command>: Send + Sync {
    fn candidate_actions(&self, depth: u32) -> ActionList<C>;

    /// Union over all depths and exceptions. Used to validate that any
    /// action seen in a rollout is one this generator could produce.
    fn all_possible_actions(&self) -> HashSet<Action<C>>;
}

/// A fixed cyclic sequence of per-depth action lists, indexed by
/// `depth % cycle_length`, with optional depth-keyed exceptions that
/// substitute a different list at specific depths. Exceptions are
/// usually placed at the first few depths to give early moves a
/// different repertoire than steady-state moves.
pub struct FixedSequenceGenerator<C: Command> {
    cycle: Vec<ActionList<C>>,
    exceptions: HashMap<u32, ActionList<C>>,
}

impl<C: Command> FixedSequenceGenerator<C> {
    pub fn new(
        cycle: Vec<ActionList<C>>,
        exceptions: HashMap<u32, ActionList<C>>,
    ) -> Result<Self, ConfigError> {
        if cycle.is_empty() {
            return Err(ConfigError::EmptyActionCycle);
        }
        if cycle.iter().chain(exceptions.values()).any(ActionList::is_empty) {
            return Err(ConfigError::EmptyActionList);
        }
        Ok(FixedSequenceGenerator { cycle, exceptions })
    }

    pub fn cycle_length(&self) -> usize {
        self.cycle.len()
    }
}

impl<C: Command> ActionGenerator<C> for FixedSequenceGenerator<C> {
    fn candidate_actions(&self, depth: u32) -> ActionList<C> {
        if let Some(exception) = self.exceptions.get(&depth) {
            return exception.clone();
        }
        self.cycle[depth as usize % self.cycle.len()].clone()
    }

    fn all_possible_actions(&self) -> HashSet<Action<C>> {
        self.cycle
            .iter()
            .chain(self.exceptions.values())
            .flat_map(|list| list.actions().iter().copied())
            .collect()
    }
}

/// The same action list at every depth.
pub struct FixedActionsGenerator<C: Command> {
    actions: ActionList<C>,
}

impl<C: Command> FixedActionsGenerator<C> {
    pub fn new(actions: ActionList<C>) -> Result<Self, ConfigError> {
        if actions.is_empty() {
            return Err(ConfigError::EmptyActionList);
        }
        Ok(FixedActionsGenerator { actions })
    }
}

impl<C: Command> ActionGenerator<C> for FixedActionsGenerator<C> {
    fn candidate_actions(&self, _depth: u32) -> ActionList<C> {
        self.actions.clone()
    }

    fn all_possible_actions(&self) -> HashSet<Action<C>> {
        self.actions.actions().iter().copied().collect()
    }
}

/// No candidate actions at any depth. Assigned to nodes that must not
/// be expanded.
pub struct NullGenerator;

impl<C: Command> ActionGenerator<C> for NullGenerator {
    fn candidate_actions(&self, _depth: u32) -> ActionList<C> {
        ActionList::empty()
    }

    fn all_possible_actions(&self) -> HashSet<Action<C>> {
        HashSet::new()
    }
}
