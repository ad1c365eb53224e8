//! Calibration and scroll control state machine.
//!
//! The first [`CALIBRATION_SAMPLES`] accepted poses are averaged into a
//! neutral [`Baseline`]. After that, every pose is compared against the
//! baseline roll and turned into a [`ScrollIntent`]:
//!
//! - `delta < -10` or `delta > 300` scrolls up (the second branch catches
//!   readings that wrapped across the 0/360 seam),
//! - `delta > 10` scrolls down,
//! - anything in `[-10, 10]` is the dead zone.
//!
//! Pitch and yaw are averaged and reported, but only roll drives scrolling.

use crate::{
    constants::{CALIBRATION_SAMPLES, DEAD_ZONE_DEGREES, SCROLL_STEP, WRAPAROUND_DEGREES},
    pose_estimation::HeadPose,
};
use std::fmt;

/// Scroll decision for a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollIntent {
    /// No scrolling
    #[default]
    None,
    /// Scroll towards the top of the page
    Up,
    /// Scroll towards the bottom of the page
    Down,
}

impl ScrollIntent {
    /// Classify a roll deviation from the baseline, in degrees
    #[must_use]
    pub fn from_roll_delta(delta: f64) -> Self {
        if delta < -DEAD_ZONE_DEGREES || delta > WRAPAROUND_DEGREES {
            Self::Up
        } else if delta > DEAD_ZONE_DEGREES {
            Self::Down
        } else {
            Self::None
        }
    }

    /// Signed wheel amount for this intent; positive scrolls up
    #[must_use]
    pub fn scroll_amount(self) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Up => SCROLL_STEP,
            Self::Down => -SCROLL_STEP,
        }
    }
}

impl fmt::Display for ScrollIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "None",
            Self::Up => "Up",
            Self::Down => "Down",
        };
        f.write_str(label)
    }
}

/// Neutral head orientation: per-angle mean of the calibration samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    /// Mean pitch in degrees
    pub pitch: f64,
    /// Mean yaw in degrees
    pub yaw: f64,
    /// Mean roll in degrees
    pub roll: f64,
}

/// Angle samples collected while calibrating, one sequence per angle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseSamples {
    pitch: Vec<f64>,
    yaw: Vec<f64>,
    roll: Vec<f64>,
}

impl PoseSamples {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            pitch: Vec::with_capacity(capacity),
            yaw: Vec::with_capacity(capacity),
            roll: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, pose: &HeadPose) {
        self.pitch.push(pose.pitch);
        self.yaw.push(pose.yaw);
        self.roll.push(pose.roll);
    }

    /// Number of samples collected
    #[must_use]
    pub fn len(&self) -> usize {
        self.roll.len()
    }

    /// Whether no sample has been collected yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roll.is_empty()
    }

    fn baseline(&self) -> Baseline {
        Baseline {
            pitch: mean(&self.pitch),
            yaw: mean(&self.yaw),
            roll: mean(&self.roll),
        }
    }
}

#[allow(clippy::cast_precision_loss)] // Sample counts are tiny
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Where the calibrator is in its single transition
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationState {
    /// Still collecting samples for the baseline
    Accumulating(PoseSamples),
    /// Baseline frozen; scroll decisions are being made
    Calibrated(Baseline),
}

/// Owns calibration progress and turns poses into scroll intents
#[derive(Debug, Clone)]
pub struct Calibrator {
    state: CalibrationState,
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Calibrator {
    /// Start a fresh calibration
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: CalibrationState::Accumulating(PoseSamples::with_capacity(CALIBRATION_SAMPLES)),
        }
    }

    /// Feed one successfully estimated pose and get the scroll decision
    ///
    /// Always `ScrollIntent::None` while calibrating, including on the sample
    /// that completes calibration.
    pub fn observe(&mut self, pose: &HeadPose) -> ScrollIntent {
        match &mut self.state {
            CalibrationState::Accumulating(samples) => {
                samples.push(pose);
                if samples.len() == CALIBRATION_SAMPLES {
                    let baseline = samples.baseline();
                    log::info!(
                        "Calibration complete: pitch {:.2}, yaw {:.2}, roll {:.2}",
                        baseline.pitch,
                        baseline.yaw,
                        baseline.roll
                    );
                    self.state = CalibrationState::Calibrated(baseline);
                }
                ScrollIntent::None
            }
            CalibrationState::Calibrated(baseline) => {
                let delta = pose.roll - baseline.roll;
                let intent = ScrollIntent::from_roll_delta(delta);
                log::debug!("Roll delta {:.2} -> {}", delta, intent);
                intent
            }
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> &CalibrationState {
        &self.state
    }

    /// Frozen baseline, once calibrated
    #[must_use]
    pub fn baseline(&self) -> Option<Baseline> {
        match &self.state {
            CalibrationState::Calibrated(baseline) => Some(*baseline),
            CalibrationState::Accumulating(_) => None,
        }
    }

    /// Whether the baseline has been frozen
    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        matches!(self.state, CalibrationState::Calibrated(_))
    }

    /// Number of samples counted towards the baseline so far
    #[must_use]
    pub fn samples_collected(&self) -> usize {
        match &self.state {
            CalibrationState::Accumulating(samples) => samples.len(),
            CalibrationState::Calibrated(_) => CALIBRATION_SAMPLES,
        }
    }
}
