//! A deterministic one-legged runner. Small enough to verify by hand,
//! rich enough to make the tree search earn its keep: driving builds
//! speed but also lean, and a runner past its tipping point is lost.

use std::{error::Error, fmt};

use treesearch::{ActionList, DurationSampling, FixedSequenceGenerator, Simulation, State};

const DT: f32 = 0.1;
const TIP_OVER_LEAN: f32 = 1.0;

/// Input held during a timestep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    /// No input. Speed bleeds off slowly and lean relaxes.
    Coast,
    /// Steady acceleration at the cost of growing lean.
    Drive,
    /// Sheds speed and actively rights the runner.
    Brake,
    /// A burst of speed and a lot of lean at once.
    Leap,
}

/// Full pose of the runner. Snapshots compare exactly; the physics is
/// deterministic, so replaying a command sequence reproduces states
/// bit for bit.
#[derive(Clone, Debug, PartialEq)]
pub struct HopperState {
    pub x: f32,
    pub vel: f32,
    pub lean: f32,
    pub timestep: u32,
    pub failed: bool,
}

impl HopperState {
    pub fn initial() -> Self {
        HopperState {
            x: 0.0,
            vel: 0.0,
            lean: 0.0,
            timestep: 0,
            failed: false,
        }
    }
}

impl State for HopperState {
    fn progress(&self) -> f32 {
        self.x
    }

    fn is_failed(&self) -> bool {
        self.failed
    }
}

/// The physics got a non-finite number, usually from a forced state
/// that was already broken.
#[derive(Debug)]
pub enum StepError {
    NonFinite { timestep: u32 },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepError::NonFinite { timestep } => {
                write!(f, "non-finite state at timestep {timestep}")
            }
        }
    }
}

impl Error for StepError {}

/// The simulation engine. One per worker thread.
#[derive(Clone, Debug, Default)]
pub struct Hopper {
    state: HopperState,
}

impl Default for HopperState {
    fn default() -> Self {
        HopperState::initial()
    }
}

impl Hopper {
    pub fn new() -> Self {
        Hopper {
            state: HopperState::initial(),
        }
    }
}

impl Simulation for Hopper {
    type Command = Key;
    type State = HopperState;
    type Error = StepError;

    fn reset(&mut self) {
        self.state = HopperState::initial();
    }

    fn step(&mut self, key: Key) -> Result<HopperState, StepError> {
        let s = &mut self.state;
        if !s.failed {
            match key {
                Key::Coast => {
                    s.vel *= 0.995;
                    s.lean *= 0.8;
                }
                Key::Drive => {
                    s.lean += 0.04 + 0.02 * s.vel;
                    s.vel += 0.05;
                }
                Key::Brake => {
                    s.vel *= 0.9;
                    s.lean -= 0.08;
                }
                Key::Leap => {
                    s.lean += 0.12;
                    s.vel += 0.2;
                }
            }
            s.x += s.vel * DT;
            s.timestep += 1;
            if !(s.x.is_finite() && s.vel.is_finite() && s.lean.is_finite()) {
                return Err(StepError::NonFinite { timestep: s.timestep });
            }
            if s.lean.abs() > TIP_OVER_LEAN {
                s.failed = true;
            }
        }
        Ok(s.clone())
    }

    fn current_state(&self) -> HopperState {
        self.state.clone()
    }

    fn is_failed(&self) -> bool {
        self.state.failed
    }

    fn set_state(&mut self, state: &HopperState) {
        self.state = state.clone();
    }
}

/// The default repertoire: alternate driving and recovering, with a
/// cautious first move.
pub fn standard_generator() -> Result<FixedSequenceGenerator<Key>, treesearch::ConfigError> {
    let drive = ActionList::from_durations(
        Key::Drive,
        1..8,
        DurationSampling::Normal { mean: 4.0, stdev: 2.0 },
    )?;
    let recover = ActionList::new(
        (1..6)
            .map(|d| treesearch::Action::new(Key::Coast, d))
            .chain((1..4).map(|d| treesearch::Action::new(Key::Brake, d)))
            .collect(),
        DurationSampling::Uniform,
    )?;
    let opening = ActionList::from_durations(Key::Drive, 1..4, DurationSampling::Uniform)?;
    let mut exceptions = std::collections::HashMap::new();
    exceptions.insert(0, opening);
    FixedSequenceGenerator::new(vec![drive, recover], exceptions)
}
