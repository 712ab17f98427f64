//! Calibration record and timing/limit constants.
//!
//! Everything here is immutable configuration: it is read once at startup, validated
//! with [`Calibration::validate`] and only ever borrowed afterwards.
use embassy_time::Duration;
use thiserror::Error;

use super::joint::{JointCalibration, JointId, NeutralAngle};
use super::leg::{Axis, Leg, LEG_COUNT};

pub const JOINT_COUNT: usize = 8;

/// Period of the control loop (one controller sample per period).
pub const CONTROL_PERIOD: Duration = Duration::from_millis(20);
/// Minimum time between two gait phase advances.
pub const GAIT_TICK: Duration = Duration::from_millis(50);
/// Minimum time between two accepted mode or sub-mode changes.
pub const MODE_DEBOUNCE: Duration = Duration::from_millis(300);

/// Per-axis stick deadzone, as a fraction of full scale.
pub const DEADZONE: f32 = 0.2;
/// Stick deflection needed to select a gait.
pub const STICK_THRESHOLD: f32 = 0.5;

/// Vertical joint angle at zero stance height.
pub const STANCE_BASE: f32 = 90.0;
pub const STANCE_HEIGHT_DEFAULT: f32 = 20.0;
pub const STANCE_HEIGHT_STEP: f32 = 5.0;
pub const STANCE_HEIGHT_MIN: f32 = 0.0;
pub const STANCE_HEIGHT_MAX: f32 = 50.0;

pub const CYCLE_DEFAULT: Duration = Duration::from_millis(1500);
pub const CYCLE_STEP: Duration = Duration::from_millis(1000);
pub const CYCLE_MIN: Duration = Duration::from_millis(1500);
pub const CYCLE_MAX: Duration = Duration::from_millis(4500);

/// Body pitch/roll range of the tilt mode, degrees at full stick.
pub const TILT_GAIN: f32 = 20.0;
/// Extra crouch of the tilt mode, degrees at full trigger.
pub const CROUCH_GAIN: f32 = 15.0;
/// Hip yaw of the tilt mode, degrees at full stick.
pub const TWIST_GAIN: f32 = 25.0;

// Motion profiles of the STS servos
pub const NORMAL_SPEED: u16 = 4000;
pub const NORMAL_ACC: u8 = 250;
pub const SMOOTH_SPEED: u16 = 500;
pub const SMOOTH_ACC: u8 = 50;

/// Stance sign of a vertical joint: the neutral angle is `STANCE_BASE + sign * h`.
const fn stance(sign: f32) -> NeutralAngle {
    NeutralAngle::Stance {
        base: STANCE_BASE,
        sign,
    }
}

const fn joint(id: u8, trim: i32, min: f32, max: f32, neutral: NeutralAngle) -> JointCalibration {
    JointCalibration {
        id: JointId(id),
        trim,
        min,
        max,
        neutral,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalibrationError {
    #[error("{0}: empty clamp range")]
    EmptyRange(JointId),
    #[error("{0}: neutral angle outside the clamp range")]
    NeutralOutOfRange(JointId),
    #[error("{0} is listed twice")]
    DuplicateJoint(JointId),
    #[error("leg table references unknown {0}")]
    UnknownLegJoint(JointId),
}

/// Declarative calibration of the whole robot.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub joints: [JointCalibration; JOINT_COUNT],
    /// Joint pair of every leg, `[lateral, vertical]`.
    pub legs: [[JointId; 2]; LEG_COUNT],
}

impl Calibration {
    pub fn joint(&self, id: JointId) -> Option<&JointCalibration> {
        self.joints.iter().find(|joint| joint.id == id)
    }

    pub fn index_of(&self, id: JointId) -> Option<usize> {
        self.joints.iter().position(|joint| joint.id == id)
    }

    pub fn leg_joint(&self, leg: Leg, axis: Axis) -> JointId {
        self.legs[leg][axis]
    }

    /// Checks ranges, neutral angles over the whole stance height range and the leg table.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        for (i, joint) in self.joints.iter().enumerate() {
            if joint.min > joint.max {
                return Err(CalibrationError::EmptyRange(joint.id));
            }
            if self.joints[..i].iter().any(|other| other.id == joint.id) {
                return Err(CalibrationError::DuplicateJoint(joint.id));
            }
            let lowest = joint.neutral.resolve(STANCE_HEIGHT_MIN);
            let highest = joint.neutral.resolve(STANCE_HEIGHT_MAX);
            if !joint.contains(lowest) || !joint.contains(highest) {
                return Err(CalibrationError::NeutralOutOfRange(joint.id));
            }
        }
        for pair in self.legs.iter() {
            for id in pair {
                if self.joint(*id).is_none() {
                    return Err(CalibrationError::UnknownLegJoint(*id));
                }
            }
        }
        Ok(())
    }
}

pub static CALIBRATION: Calibration = Calibration {
    joints: [
        joint(1, -25, 0.0, 90.0, NeutralAngle::Fixed(45.0)), // front left, lateral
        joint(2, 10, 30.0, 140.0, stance(-1.0)),             // front left, vertical
        joint(3, 30, 90.0, 180.0, NeutralAngle::Fixed(135.0)), // front right, lateral
        joint(4, -5, 40.0, 150.0, stance(1.0)),              // front right, vertical
        joint(5, -15, 90.0, 180.0, NeutralAngle::Fixed(135.0)), // rear left, lateral
        joint(6, -5, 40.0, 150.0, stance(1.0)),              // rear left, vertical
        joint(7, -10, 0.0, 90.0, NeutralAngle::Fixed(45.0)), // rear right, lateral
        joint(8, 60, 30.0, 140.0, stance(-1.0)),             // rear right, vertical
    ],
    legs: [
        [JointId(1), JointId(2)],
        [JointId(3), JointId(4)],
        [JointId(5), JointId(6)],
        [JointId(7), JointId(8)],
    ],
};
