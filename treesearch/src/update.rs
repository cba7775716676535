use crate::{
    action::{Action, Command},
    error::ConfigError,
    node::Node,
    sim::State,
};

/// A rule for folding one backpropagation sample into a node's stored
/// value. The node's current statistics are passed in as plain numbers;
/// strategies are stateless and pure. Strategies that look at children
/// may read the node's child snapshot, never its own statistics.
pub trait ValueUpdater<C: Command, S: State>: Send + Sync {
    fn update(&self, current: f32, visits: u32, sample: f32, node: &Node<C, S>) -> f32;
}

/// Running average of all samples seen. The default in most
/// upper-confidence-bound implementations.
#[derive(Clone, Copy, Debug, Default)]
pub struct Average;

impl<C: Command, S: State> ValueUpdater<C, S> for Average {
    fn update(&self, current: f32, visits: u32, sample: f32, _node: &Node<C, S>) -> f32 {
        (current * visits as f32 + sample) / (visits as f32 + 1.0)
    }
}

/// The newest sample always wins. Useful for deterministic backtests
/// where history carries no information.
#[derive(Clone, Copy, Debug, Default)]
pub struct HardSet;

impl<C: Command, S: State> ValueUpdater<C, S> for HardSet {
    fn update(&self, _current: f32, _visits: u32, sample: f32, _node: &Node<C, S>) -> f32 {
        sample
    }
}

/// Mean of the best `n` child values. Optimistic: the node is worth
/// what its best options are worth.
#[derive(Clone, Copy, Debug)]
pub struct TopNChildren {
    count: usize,
}

impl TopNChildren {
    pub fn new(count: usize) -> Result<Self, ConfigError> {
        if count == 0 {
            return Err(ConfigError::ZeroChildCount);
        }
        Ok(TopNChildren { count })
    }
}

impl<C: Command, S: State> ValueUpdater<C, S> for TopNChildren {
    fn update(&self, _current: f32, _visits: u32, sample: f32, node: &Node<C, S>) -> f32 {
        let mut values: Vec<f32> = node.children().iter().map(|(_, c)| c.value()).collect();
        if values.is_empty() {
            return sample;
        }
        values.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        let taken = values.len().min(self.count);
        values[..taken].iter().sum::<f32>() / taken as f32
    }
}

/// Mean child value plus a multiple of the standard deviation across
/// children. An optimistic bound on what the subtree might hold.
#[derive(Clone, Copy, Debug)]
pub struct StdDevAbove {
    factor: f32,
}

impl StdDevAbove {
    pub fn new(factor: f32) -> Result<Self, ConfigError> {
        if factor < 0.0 {
            return Err(ConfigError::NegativeDeviationFactor(factor));
        }
        Ok(StdDevAbove { factor })
    }
}

impl<C: Command, S: State> ValueUpdater<C, S> for StdDevAbove {
    fn update(&self, _current: f32, _visits: u32, sample: f32, node: &Node<C, S>) -> f32 {
        let values: Vec<f32> = node.children().iter().map(|(_, c)| c.value()).collect();
        if values.is_empty() {
            return sample;
        }
        let mean = values.iter().sum::<f32>() / values.len() as f32;
        let variance =
            values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / values.len() as f32;
        mean + self.factor * variance.sqrt()
    }
}

/// How a [`TopWindow`] scores one window of a cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowCriterion {
    /// The worst value in the window. Robust against isolated lucky
    /// children.
    Worst,
    /// Mean over the nodes actually present in the window.
    AverageOptimistic,
    /// Mean over the configured window size; missing nodes count as
    /// zero.
    AveragePessimistic,
}

/// Clusters same-command sibling actions by contiguous duration and
/// scores the node by the best sliding window found within any
/// cluster. A robustness heuristic: a good action should stay good
/// when its duration is off by a timestep.
#[derive(Clone, Copy, Debug)]
pub struct TopWindow {
    window: usize,
    pub criterion: WindowCriterion,
}

impl TopWindow {
    pub fn new(window: usize, criterion: WindowCriterion) -> Result<Self, ConfigError> {
        if window == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(TopWindow { window, criterion })
    }

    fn window_score(&self, window: &[f32], effective: usize) -> f32 {
        match self.criterion {
            WindowCriterion::Worst => {
                window.iter().copied().fold(f32::MAX, f32::min)
            }
            WindowCriterion::AverageOptimistic => {
                window.iter().sum::<f32>() / effective as f32
            }
            WindowCriterion::AveragePessimistic => {
                window.iter().sum::<f32>() / self.window as f32
            }
        }
    }
}

impl<C: Command, S: State> ValueUpdater<C, S> for TopWindow {
    fn update(&self, _current: f32, _visits: u32, sample: f32, node: &Node<C, S>) -> f32 {
        let mut children: Vec<(Action<C>, f32)> = node
            .children()
            .iter()
            .map(|(action, child)| (*action, child.value()))
            .collect();
        if children.is_empty() {
            return sample;
        }
        children.sort_by(|(a, _), (b, _)| a.cmp(b));
        let clusters = cluster_runs(&children);

        // Start with windows of the configured size and shrink until
        // some cluster is wide enough to hold one.
        let mut effective = self.window;
        while effective > 0 {
            let mut best = f32::MIN;
            let mut found = false;
            for cluster in &clusters {
                if cluster.len() < effective {
                    continue;
                }
                let values: Vec<f32> = cluster.iter().map(|(_, v)| *v).collect();
                for window in values.windows(effective) {
                    found = true;
                    best = best.max(self.window_score(window, effective));
                }
            }
            if found {
                return best;
            }
            effective -= 1;
        }
        sample
    }
}

/// Group a `(duration, command)`-sorted action list into runs of the
/// same command at consecutive durations.
pub(crate) fn cluster_runs<C: Command>(
    sorted: &[(Action<C>, f32)],
) -> Vec<Vec<(Action<C>, f32)>> {
    let mut clusters: Vec<Vec<(Action<C>, f32)>> = Vec::new();
    for entry in sorted {
        if let Some(cluster) = clusters.last_mut() {
            let (last, _) = cluster[cluster.len() - 1];
            if last.command == entry.0.command && entry.0.duration == last.duration + 1 {
                cluster.push(*entry);
                continue;
            }
        }
        clusters.push(vec![*entry]);
    }
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{testing::*, Node, NodeRef};

    fn tree_with_children(values: &[(u32, f32)]) -> NodeRef<u8, Flat> {
        let root = Node::new_root(Flat::at(0.0), generator(1..30));
        for (duration, value) in values {
            let (child, _) =
                root.expand_child(Action::new(0u8, *duration), Flat::at(*value), None);
            child.update_value(*value, &HardSet);
        }
        root
    }

    #[test]
    fn average_matches_the_arithmetic() {
        let root = Node::new_root(Flat::at(0.0), generator(1..2));
        let updated = ValueUpdater::<u8, Flat>::update(&Average, 3.0, 2, 6.0, &root);
        assert!((updated - 4.0).abs() < 1e-6);
    }

    #[test]
    fn hard_set_ignores_history() {
        let root = Node::new_root(Flat::at(0.0), generator(1..2));
        assert_eq!(ValueUpdater::<u8, Flat>::update(&HardSet, 100.0, 50, 7.5, &root), 7.5);
    }

    #[test]
    fn clustering_splits_on_duration_gaps() {
        let actions: Vec<(Action<u8>, f32)> = [3, 4, 5, 9]
            .iter()
            .map(|d| (Action::new(0u8, *d), 0.0))
            .collect();
        let clusters = cluster_runs(&actions);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].len(), 3);
        assert_eq!(clusters[1].len(), 1);
    }

    #[test]
    fn clustering_splits_on_command_changes() {
        let actions = vec![
            (Action::new(0u8, 3), 0.0),
            (Action::new(1u8, 4), 0.0),
            (Action::new(1u8, 5), 0.0),
        ];
        let clusters = cluster_runs(&actions);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[1].len(), 2);
    }

    #[test]
    fn top_window_takes_the_best_worst_case_window() {
        // Cluster [3,4,5] with values [1, 5, 2] and lone [9] at 10.
        let root = tree_with_children(&[(3, 1.0), (4, 5.0), (5, 2.0), (9, 10.0)]);
        let updater = TopWindow::new(2, WindowCriterion::Worst).unwrap();
        // Windows: [1,5] -> 1, [5,2] -> 2. The lone cluster is too
        // narrow for a window of two. Best worst-case is 2.
        let value = ValueUpdater::<u8, Flat>::update(&updater, 0.0, 0, 0.0, &root);
        assert!((value - 2.0).abs() < 1e-6);
    }

    #[test]
    fn top_window_shrinks_when_no_cluster_fits() {
        let root = tree_with_children(&[(3, 4.0), (9, 10.0)]);
        let updater = TopWindow::new(3, WindowCriterion::Worst).unwrap();
        // Only singleton clusters exist, so the window shrinks to one
        // and the best single value wins.
        let value = ValueUpdater::<u8, Flat>::update(&updater, 0.0, 0, 0.0, &root);
        assert!((value - 10.0).abs() < 1e-6);
    }

    #[test]
    fn pessimistic_average_divides_by_the_configured_window() {
        let root = tree_with_children(&[(3, 4.0), (4, 6.0)]);
        let updater = TopWindow::new(4, WindowCriterion::AveragePessimistic).unwrap();
        // Widest cluster holds two nodes; effective window is two but
        // the divisor stays at four.
        let value = ValueUpdater::<u8, Flat>::update(&updater, 0.0, 0, 0.0, &root);
        assert!((value - 2.5).abs() < 1e-6);
    }

    #[test]
    fn top_n_children_averages_the_best() {
        let root = tree_with_children(&[(3, 1.0), (5, 7.0), (9, 5.0)]);
        let updater = TopNChildren::new(2).unwrap();
        let value = ValueUpdater::<u8, Flat>::update(&updater, 0.0, 0, 0.0, &root);
        assert!((value - 6.0).abs() < 1e-6);
    }

    #[test]
    fn std_dev_above_mean_is_an_optimistic_bound() {
        let root = tree_with_children(&[(3, 2.0), (5, 4.0)]);
        let updater = StdDevAbove::new(1.0).unwrap();
        // mean 3, stddev 1.
        let value = ValueUpdater::<u8, Flat>::update(&updater, 0.0, 0, 0.0, &root);
        assert!((value - 4.0).abs() < 1e-6);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(StdDevAbove::new(-0.5).is_err());
        assert!(TopWindow::new(0, WindowCriterion::Worst).is_err());
        assert!(TopNChildren::new(0).is_err());
    }

    #[test]
    fn childless_nodes_fall_back_to_the_sample() {
        let root = Node::new_root(Flat::at(0.0), generator(1..2));
        let top = TopWindow::new(2, WindowCriterion::Worst).unwrap();
        assert_eq!(ValueUpdater::<u8, Flat>::update(&top, 0.0, 0, 3.25, &root), 3.25);
        let std = StdDevAbove::new(1.0).unwrap();
        assert_eq!(ValueUpdater::<u8, Flat>::update(&std, 0.0, 0, 3.25, &root), 3.25);
    }
}
