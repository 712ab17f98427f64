//! Joint ids and per-joint calibration.
//!
//! A joint is addressed by its bus id ([`JointId`]). Its calibration is immutable
//! and comes from [`crate::robot::config::CALIBRATION`]; the only mutable per-joint
//! data (the last commanded angle) lives in the command pipeline.
use core::fmt::Display;

/// Bus id of a joint actuator, `1..=JOINT_COUNT` on the stock robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct JointId(pub u8);

impl Display for JointId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "joint {}", self.0)
    }
}

/// Resting angle of a joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NeutralAngle {
    /// Fixed angle in degrees.
    Fixed(f32),
    /// `base + sign * h`: follows the stance height `h`.
    Stance { base: f32, sign: f32 },
}

impl NeutralAngle {
    pub fn resolve(self, stance_height: f32) -> f32 {
        match self {
            NeutralAngle::Fixed(angle) => angle,
            NeutralAngle::Stance { base, sign } => base + sign * stance_height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointCalibration {
    pub id: JointId,
    /// Assembly trim added to the native position.
    pub trim: i32,
    /// Lowest allowed angle in degrees.
    pub min: f32,
    /// Highest allowed angle in degrees.
    pub max: f32,
    pub neutral: NeutralAngle,
}

impl JointCalibration {
    pub fn midpoint(&self) -> f32 {
        (self.min + self.max) / 2.0
    }

    pub fn contains(&self, angle: f32) -> bool {
        angle >= self.min && angle <= self.max
    }
}
