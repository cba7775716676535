use std::{cmp::Ordering, collections::VecDeque, fmt::Debug, hash::Hash};

use rand::Rng;
use rand_distr::{Distribution, WeightedIndex};

use crate::error::ConfigError;

/// An opaque discrete command understood by the simulation.
/// The search never inspects commands; it only stores, compares, and
/// hands them back to the simulation.
pub trait Command: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static {}

impl<T: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static> Command for T {}

/// A command held for a fixed number of simulated timesteps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Action<C> {
    pub command: C,
    pub duration: u32,
}

impl<C: Command> Action<C> {
    pub fn new(command: C, duration: u32) -> Self {
        assert!(duration >= 1, "action duration must be at least one timestep");
        Action { command, duration }
    }
}

// Sorted by duration first so that window-based value updaters can find
// runs of the same command at neighboring durations.
impl<C: Command> Ord for Action<C> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.duration
            .cmp(&other.duration)
            .then_with(|| self.command.cmp(&other.command))
    }
}

impl<C: Command> PartialOrd for Action<C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// How an [`ActionList`] picks among its actions when one is requested
/// at random (e.g. when the sampler expands an untried action).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DurationSampling {
    /// Every action is equally likely.
    Uniform,
    /// Actions are weighted by a normal kernel over their duration,
    /// favoring durations near `mean`.
    Normal { mean: f32, stdev: f32 },
}

impl DurationSampling {
    fn validate(&self) -> Result<(), ConfigError> {
        if let DurationSampling::Normal { stdev, .. } = self {
            if *stdev < 0.0 {
                return Err(ConfigError::NegativeStdDev(*stdev));
            }
        }
        Ok(())
    }
}

/// A set of candidate actions together with the distribution used to
/// sample from it. Actions are unique within a list.
#[derive(Clone, Debug)]
pub struct ActionList<C: Command> {
    actions: Vec<Action<C>>,
    sampling: DurationSampling,
}

impl<C: Command> ActionList<C> {
    pub fn new(actions: Vec<Action<C>>, sampling: DurationSampling) -> Result<Self, ConfigError> {
        if actions.is_empty() {
            return Err(ConfigError::EmptyActionList);
        }
        if actions.iter().any(|a| a.duration == 0) {
            return Err(ConfigError::ZeroDuration);
        }
        for (i, action) in actions.iter().enumerate() {
            if actions[..i].contains(action) {
                return Err(ConfigError::DuplicateAction);
            }
        }
        sampling.validate()?;
        Ok(ActionList { actions, sampling })
    }

    /// One command over a contiguous range of durations, the usual way
    /// repertoires are written down.
    pub fn from_durations(
        command: C,
        durations: std::ops::Range<u32>,
        sampling: DurationSampling,
    ) -> Result<Self, ConfigError> {
        Self::new(
            durations.map(|d| Action { command, duration: d }).collect(),
            sampling,
        )
    }

    /// The empty list, assigned to nodes which must never be expanded
    /// (failed states, null generators).
    pub fn empty() -> Self {
        ActionList {
            actions: Vec::new(),
            sampling: DurationSampling::Uniform,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn actions(&self) -> &[Action<C>] {
        &self.actions
    }

    pub fn contains(&self, action: &Action<C>) -> bool {
        self.actions.contains(action)
    }

    /// Remove one action. Returns whether it was present.
    pub fn remove(&mut self, action: &Action<C>) -> bool {
        match self.actions.iter().position(|a| a == action) {
            Some(i) => {
                self.actions.remove(i);
                true
            }
            None => false,
        }
    }

    /// Sample one action on the list's duration distribution.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Option<Action<C>> {
        if self.actions.is_empty() {
            return None;
        }
        match self.sampling {
            DurationSampling::Uniform => {
                Some(self.actions[rng.gen_range(0..self.actions.len())])
            }
            DurationSampling::Normal { mean, stdev } => {
                if stdev < f32::EPSILON {
                    // Degenerate spread: always the duration closest to the mean.
                    return self
                        .actions
                        .iter()
                        .min_by(|a, b| {
                            let da = (a.duration as f32 - mean).abs();
                            let db = (b.duration as f32 - mean).abs();
                            da.partial_cmp(&db).unwrap_or(Ordering::Equal)
                        })
                        .copied();
                }
                let weights: Vec<f32> = self
                    .actions
                    .iter()
                    .map(|a| {
                        let z = (a.duration as f32 - mean) / stdev;
                        (-0.5 * z * z).exp()
                    })
                    .collect();
                match WeightedIndex::new(&weights) {
                    Ok(distr) => Some(self.actions[distr.sample(rng)]),
                    // All weights vanished (mean far outside the range).
                    Err(_) => Some(self.actions[rng.gen_range(0..self.actions.len())]),
                }
            }
        }
    }
}

/// Flattens timed actions into the per-timestep commands the simulation
/// consumes. Workers keep one of these per rollout.
#[derive(Clone, Debug, Default)]
pub struct ActionQueue<C: Command> {
    pending: VecDeque<Action<C>>,
    current: Option<(C, u32)>,
}

impl<C: Command> ActionQueue<C> {
    pub fn new() -> Self {
        ActionQueue {
            pending: VecDeque::new(),
            current: None,
        }
    }

    pub fn push(&mut self, action: Action<C>) {
        self.pending.push_back(action);
    }

    pub fn push_sequence(&mut self, actions: impl IntoIterator<Item = Action<C>>) {
        self.pending.extend(actions);
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.current = None;
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.pending.is_empty()
    }

    /// The command for the next timestep, or `None` when drained.
    pub fn poll_command(&mut self) -> Option<C> {
        if self.current.is_none() {
            let next = self.pending.pop_front()?;
            self.current = Some((next.command, next.duration));
        }
        let (command, remaining) = self.current.take()?;
        if remaining > 1 {
            self.current = Some((command, remaining - 1));
        }
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use rand::thread_rng;

    use super::*;

    #[test]
    fn action_ordering_is_duration_then_command() {
        let a = Action::new(2u8, 3);
        let b = Action::new(1u8, 4);
        let c = Action::new(2u8, 4);
        let mut actions = vec![c, a, b];
        actions.sort();
        assert_eq!(actions, vec![a, b, c]);
    }

    #[test]
    fn list_rejects_duplicates_and_zero_durations() {
        let dup = vec![Action::new(0u8, 5), Action::new(0u8, 5)];
        assert!(matches!(
            ActionList::new(dup, DurationSampling::Uniform),
            Err(ConfigError::DuplicateAction)
        ));
        let zero = vec![Action { command: 0u8, duration: 0 }];
        assert!(matches!(
            ActionList::new(zero, DurationSampling::Uniform),
            Err(ConfigError::ZeroDuration)
        ));
        assert!(matches!(
            ActionList::<u8>::new(vec![], DurationSampling::Uniform),
            Err(ConfigError::EmptyActionList)
        ));
    }

    #[test]
    fn negative_spread_is_fatal() {
        let result = ActionList::from_durations(
            0u8,
            1..5,
            DurationSampling::Normal { mean: 3.0, stdev: -1.0 },
        );
        assert!(matches!(result, Err(ConfigError::NegativeStdDev(_))));
    }

    #[test]
    fn zero_spread_picks_the_mean_duration() {
        let list = ActionList::from_durations(
            0u8,
            1..10,
            DurationSampling::Normal { mean: 4.2, stdev: 0.0 },
        )
        .unwrap();
        for _ in 0..20 {
            assert_eq!(list.sample(&mut thread_rng()).unwrap().duration, 4);
        }
    }

    #[test]
    fn queue_flattens_durations() {
        let mut queue = ActionQueue::new();
        queue.push(Action::new(7u8, 3));
        queue.push(Action::new(9u8, 1));
        let mut commands = Vec::new();
        while let Some(c) = queue.poll_command() {
            commands.push(c);
        }
        assert_eq!(commands, vec![7, 7, 7, 9]);
        assert!(queue.is_empty());
    }
}
