//! Parallel upper-confidence-bound tree search over timed-action
//! simulations.
//!
//! The search explores a deterministic, single-agent decision process:
//! each tree edge is a command held for a number of timesteps, each
//! node a simulation state reached by replaying the edge sequence from
//! the root. Worker threads share one tree and run
//! select-expand-rollout-backpropagate passes against it until a stage
//! termination condition fires.

pub mod action;
pub mod controller;
pub mod error;
pub mod evaluate;
pub mod generator;
pub mod node;
pub mod rollout;
pub mod sampler;
pub mod sim;
pub mod stage;
pub mod update;
pub mod worker;

pub use action::{Action, ActionList, ActionQueue, Command, DurationSampling};
pub use controller::{Controller, RandomController, ValueController};
pub use error::ConfigError;
pub use evaluate::{ConstantEvaluator, Evaluator, ProgressEvaluator, ValueFunction};
pub use generator::{ActionGenerator, FixedActionsGenerator, FixedSequenceGenerator, NullGenerator};
pub use node::{Node, NodeRef};
pub use rollout::{
    BlendRollout, DecayingHorizonRollout, DeltaScoreRollout, JustEvaluate, MultiChildrenRollout,
    RolloutLimits, RolloutPolicy, WindowAggregation, WindowRollout,
};
pub use sampler::{ucb_score, PassOutcome, Ucb};
pub use sim::{run_action, Simulation, State};
pub use stage::{StageHandle, StageOutcome, StageState, Termination, TreeStage};
pub use update::{
    Average, HardSet, StdDevAbove, TopNChildren, TopWindow, ValueUpdater, WindowCriterion,
};
pub use worker::{TreeWorker, WorkerStats};
