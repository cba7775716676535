use super::{testing::*, *};
use crate::{
    action::Action,
    evaluate::ProgressEvaluator,
    node::{testing::*, Node},
    rollout::{
        BlendRollout, DeltaScoreRollout, DecayingHorizonRollout, JustEvaluate,
        MultiChildrenRollout, WindowAggregation, WindowRollout,
    },
};

fn delta(script: Vec<Action<u8>>, limits: RolloutLimits) -> DeltaScoreRollout<LineSim> {
    DeltaScoreRollout::new(
        Box::new(ProgressEvaluator::default()),
        Box::new(ScriptController::new(script)),
        generator(1..4),
        limits,
    )
}

#[test]
fn delta_score_measures_evaluation_gain() {
    let frontier = Node::new_root(Flat::at(5.0), generator(1..4));
    let mut sim = LineSim::new();
    sim.set_state(frontier.state());
    let mut policy = delta(vec![Action::new(0u8, 7)], RolloutLimits::new(100).unwrap());
    let score = policy.rollout(&frontier, &mut sim).unwrap();
    assert!((score - 7.0).abs() < 1e-6);
}

#[test]
fn delta_score_discounts_failures() {
    let frontier = Node::new_root(Flat::at(5.0), generator(1..4));
    let mut sim = LineSim::new();
    sim.set_state(frontier.state());
    let mut policy = delta(
        vec![Action::new(0u8, 7), Action::new(9u8, 1)],
        RolloutLimits::new(100).unwrap(),
    )
    .with_failure_multiplier(0.5);
    let score = policy.rollout(&frontier, &mut sim).unwrap();
    assert!((score - 3.5).abs() < 1e-6);
}

#[test]
fn rollouts_stop_at_the_timestep_budget() {
    let frontier = Node::new_root(Flat::at(0.0), generator(1..4));
    let mut sim = LineSim::new();
    let mut policy = delta(vec![Action::new(0u8, 10)], RolloutLimits::new(3).unwrap());
    let score = policy.rollout(&frontier, &mut sim).unwrap();
    assert!((score - 3.0).abs() < 1e-6);
}

#[test]
fn rollouts_stop_at_the_goal_progress() {
    let frontier = Node::new_root(Flat::at(0.0), generator(1..4));
    let mut sim = LineSim::new();
    let script = vec![Action::new(0u8, 2), Action::new(0u8, 2), Action::new(0u8, 2)];
    let mut policy = delta(script, RolloutLimits::new(100).unwrap().with_goal(3.0));
    let score = policy.rollout(&frontier, &mut sim).unwrap();
    // The goal check happens at action boundaries, so the rollout
    // overshoots to 4 and stops there without taking the third action.
    assert!((score - 4.0).abs() < 1e-6);
}

#[test]
fn zero_timestep_budgets_are_rejected() {
    assert!(RolloutLimits::new(0).is_err());
    assert!(RolloutLimits::new(1).is_ok());
}

#[test]
fn kernel_decays_from_one_to_zero() {
    assert!((horizon_kernel(0.5) - 0.5).abs() < 1e-6);
    assert!(horizon_kernel(0.0) > 0.95);
    assert!(horizon_kernel(1.0) < 0.05);
    // Symmetric around the center.
    assert!((horizon_kernel(0.2) + horizon_kernel(0.8) - 1.0).abs() < 1e-6);
}

#[test]
fn decaying_horizon_weights_early_gains() {
    let frontier = Node::new_root(Flat::at(0.0), generator(1..4));
    let mut sim = LineSim::new();
    let limits = RolloutLimits::new(4).unwrap();
    let mut policy = DecayingHorizonRollout::<LineSim>::new(
        Box::new(ScriptController::new(vec![Action::new(0u8, 4)])),
        generator(1..4),
        limits,
    );
    let score = policy.rollout(&frontier, &mut sim).unwrap();
    let expected: f32 = (0..4).map(|t| horizon_kernel(t as f32 / 4.0)).sum();
    assert!((score - expected).abs() < 1e-5);
    // Early unit gains dominate; the tail is worth almost nothing.
    assert!(expected > 2.0 && expected < 3.0);
}

fn window_fixture() -> (
    crate::node::NodeRef<u8, Flat>,
    crate::node::NodeRef<u8, Flat>,
    LineSim,
) {
    let root = Node::new_root(Flat::at(0.0), generator(1..6));
    let (frontier, _) = root.expand_child(Action::new(0u8, 3), Flat::at(3.0), None);
    let mut sim = LineSim::new();
    sim.set_state(frontier.state());
    // The root must outlive the frontier: parent links are weak.
    (root, frontier, sim)
}

fn empty_delta() -> Box<dyn RolloutPolicy<LineSim>> {
    Box::new(delta(vec![], RolloutLimits::new(100).unwrap()))
}

#[test]
fn window_rollout_probes_neighboring_durations() {
    // The inner rollout scores zero gain everywhere, so the window
    // scores reduce to the neighbors' evaluation offsets: -1 and +1.
    let (_root, frontier, mut sim) = window_fixture();
    let mut best = WindowRollout::new(
        empty_delta(),
        Box::new(ProgressEvaluator::default()),
        WindowAggregation::Best,
    )
    .unwrap();
    assert!((best.rollout(&frontier, &mut sim).unwrap() - 1.0).abs() < 1e-6);

    let (_root, frontier, mut sim) = window_fixture();
    let mut worst = WindowRollout::new(
        empty_delta(),
        Box::new(ProgressEvaluator::default()),
        WindowAggregation::Worst,
    )
    .unwrap();
    assert!((worst.rollout(&frontier, &mut sim).unwrap() + 1.0).abs() < 1e-6);

    let (_root, frontier, mut sim) = window_fixture();
    let mut weighted = WindowRollout::new(
        empty_delta(),
        Box::new(ProgressEvaluator::default()),
        WindowAggregation::default(),
    )
    .unwrap();
    assert!(weighted.rollout(&frontier, &mut sim).unwrap().abs() < 1e-6);
}

#[test]
fn window_rollout_skips_impossible_durations() {
    let root = Node::new_root(Flat::at(0.0), generator(1..6));
    let (frontier, _) = root.expand_child(Action::new(0u8, 1), Flat::at(1.0), None);
    let mut sim = LineSim::new();
    sim.set_state(frontier.state());
    let mut policy = WindowRollout::new(
        empty_delta(),
        Box::new(ProgressEvaluator::default()),
        WindowAggregation::Average,
    )
    .unwrap();
    // Duration zero does not exist, so only the longer neighbor is
    // probed: mean of 0 and +1.
    let score = policy.rollout(&frontier, &mut sim).unwrap();
    assert!((score - 0.5).abs() < 1e-6);
}

#[test]
fn multi_children_averages_over_untried_actions() {
    let frontier = Node::new_root(Flat::at(0.0), generator(1..4));
    let mut sim = LineSim::new();
    let inner = JustEvaluate::<LineSim>::new(Box::new(ProgressEvaluator::default()));
    let mut policy = MultiChildrenRollout::new(Box::new(inner), 3).unwrap();
    // Untried durations 1, 2 and 3 reach 1, 2 and 3.
    let score = policy.rollout(&frontier, &mut sim).unwrap();
    assert!((score - 2.0).abs() < 1e-6);
}

#[test]
fn multi_children_subsamples_wide_fanouts() {
    let frontier = Node::new_root(Flat::at(0.0), generator(1..4));
    let mut sim = LineSim::new();
    let inner = JustEvaluate::<LineSim>::new(Box::new(ProgressEvaluator::default()));
    let mut policy = MultiChildrenRollout::new(Box::new(inner), 2)
        .unwrap()
        .with_cold_start(true);
    // Advancement 1.5 picks durations 1 and 2 out of three candidates.
    let score = policy.rollout(&frontier, &mut sim).unwrap();
    assert!((score - 1.5).abs() < 1e-6);
}

#[test]
fn blend_mixes_simulation_and_estimate() {
    let frontier = Node::new_root(Flat::at(4.0), generator(1..4));
    let mut sim = LineSim::new();
    sim.set_state(frontier.state());
    let inner = JustEvaluate::<LineSim>::new(Box::new(ProgressEvaluator::default()));
    let mut policy =
        BlendRollout::new(Box::new(inner), Box::new(FixedValueFunction(10.0)), 0.25).unwrap();
    let score = policy.rollout(&frontier, &mut sim).unwrap();
    assert!((score - 5.5).abs() < 1e-6);
}

#[test]
fn invalid_compositions_are_rejected() {
    let inner = || Box::new(JustEvaluate::<LineSim>::new(Box::new(ProgressEvaluator::default())));
    assert!(BlendRollout::new(inner(), Box::new(FixedValueFunction(0.0)), 1.5).is_err());
    assert!(BlendRollout::new(inner(), Box::new(FixedValueFunction(0.0)), -0.1).is_err());
    assert!(MultiChildrenRollout::new(inner(), 0).is_err());
    assert!(WindowRollout::new(
        inner(),
        Box::new(ProgressEvaluator::default()),
        WindowAggregation::Weighted { middle: -1.0, adjacent: 0.2 },
    )
    .is_err());
}
