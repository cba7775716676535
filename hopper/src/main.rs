use std::{sync::Arc, time::Duration};

use clap::Parser;
use hopper::{standard_generator, Hopper, HopperState};
use log::{info, LevelFilter};
use mimalloc::MiMalloc;
use treesearch::{
    DeltaScoreRollout, Node, ProgressEvaluator, RandomController, RolloutLimits, Termination,
    TopWindow, TreeStage, Ucb, WindowCriterion,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser, Debug)]
#[clap(about = "Search for a fast run of the hopper simulation")]
struct Args {
    /// Number of search threads.
    #[clap(long, default_value_t = 4)]
    workers: usize,
    /// Stop after this many search passes (unless --seconds is given).
    #[clap(long, default_value_t = 50_000)]
    passes: u64,
    /// Stop after this many seconds of wall-clock time instead.
    #[clap(long)]
    seconds: Option<u64>,
    /// Base exploration constant.
    #[clap(long, default_value_t = 1.0)]
    exploration: f32,
    /// Per-worker random addition to the exploration constant.
    #[clap(long, default_value_t = 0.5)]
    exploration_spread: f32,
    /// Timestep budget for each rollout.
    #[clap(long, default_value_t = 120)]
    rollout_timesteps: u32,
    /// Discount applied to rollouts that end in a fall.
    #[clap(long, default_value_t = 0.5)]
    failure_multiplier: f32,
    /// Write the log to this file instead of standard error.
    #[clap(long)]
    log_file: Option<String>,
}

fn main() {
    let args = Args::parse();
    match &args.log_file {
        Some(path) => simple_logging::log_to_file(path, LevelFilter::Debug)
            .expect("could not open log file"),
        None => simple_logging::log_to_stderr(LevelFilter::Info),
    }

    let generator = Arc::new(standard_generator().expect("invalid repertoire"));
    let limits = RolloutLimits::new(args.rollout_timesteps).expect("invalid rollout budget");
    let updater = Arc::new(
        TopWindow::new(3, WindowCriterion::AverageOptimistic).expect("invalid window"),
    );

    let base = Ucb::new(
        Box::new(ProgressEvaluator::default()),
        Box::new(
            DeltaScoreRollout::new(
                Box::new(ProgressEvaluator::default()),
                Box::new(RandomController),
                generator.clone(),
                limits,
            )
            .with_failure_multiplier(args.failure_multiplier),
        ),
        updater,
        args.exploration,
        args.exploration_spread,
    );

    let root = Node::new_root(HopperState::initial(), generator);
    let termination = match args.seconds {
        Some(seconds) => Termination::WallClock(Duration::from_secs(seconds)),
        None => Termination::FixedPasses(args.passes),
    };
    let bindings = (0..args.workers)
        .map(|_| (Hopper::new(), base.worker_copy()))
        .collect();

    info!("searching with {} workers", args.workers);
    let outcome = TreeStage::new(root, termination)
        .run(bindings)
        .expect("stage configuration rejected");

    println!(
        "{} passes, {} nodes, {} simulation errors, {:.1?}",
        outcome.passes,
        outcome.root.count_descendants() + 1,
        outcome.sim_errors,
        outcome.elapsed,
    );
    println!("best line found:");
    for node in &outcome.results {
        match node.action() {
            Some(action) => println!(
                "  {:>8} x{:<3}  x = {:6.2}  value = {:6.2}",
                format!("{:?}", action.command),
                action.duration,
                node.state().x,
                node.value(),
            ),
            None => println!("  start         x = {:6.2}", node.state().x),
        }
    }
}
