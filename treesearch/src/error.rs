use std::{error::Error, fmt::Display};

/// Construction-time configuration problems. All of these are fatal: a
/// search is never started with a silently corrected configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConfigError {
    /// An action list was created with no actions in it.
    EmptyActionList,
    /// The same action appeared twice in one action list.
    DuplicateAction,
    /// An action was given a duration of zero timesteps.
    ZeroDuration,
    /// A fixed-sequence generator was given an empty cycle.
    EmptyActionCycle,
    /// A duration sampling distribution was given a negative spread.
    NegativeStdDev(f32),
    /// Rollouts must be allowed to simulate at least one timestep.
    InvalidMaxTimesteps(u32),
    /// A stage was initialized without any workers.
    ZeroWorkers,
    /// A window-based strategy needs a window of at least one node.
    ZeroWindow,
    /// Top-N strategies need at least one child to look at.
    ZeroChildCount,
    /// Standard-deviation factors must be non-negative.
    NegativeDeviationFactor(f32),
    /// Blend weights must lie in [0, 1].
    WeightOutOfRange(f32),
    /// Multi-children rollouts need at least one rollout.
    ZeroRollouts,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ConfigError::*;
        match self {
            EmptyActionList => write!(f, "action list must contain at least one action"),
            DuplicateAction => write!(f, "action list contains the same action twice"),
            ZeroDuration => write!(f, "action duration must be at least one timestep"),
            EmptyActionCycle => {
                write!(f, "fixed-sequence generator needs at least one action list in its cycle")
            }
            NegativeStdDev(s) => {
                write!(f, "duration sampling spread must be non-negative (was {s})")
            }
            InvalidMaxTimesteps(t) => {
                write!(f, "rollouts must be allowed at least one timestep (was {t})")
            }
            ZeroWorkers => write!(f, "a tree stage needs at least one worker"),
            ZeroWindow => write!(f, "window size must be at least one"),
            ZeroChildCount => write!(f, "child count must be at least one"),
            NegativeDeviationFactor(v) => {
                write!(f, "standard-deviation factor must be non-negative (was {v})")
            }
            WeightOutOfRange(w) => write!(f, "blend weight must lie in [0, 1] (was {w})"),
            ZeroRollouts => write!(f, "multi-children rollout needs at least one rollout"),
        }
    }
}

impl Error for ConfigError {}
