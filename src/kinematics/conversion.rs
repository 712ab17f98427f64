//! Joint angle safety clamp and servo position conversion.
//!
//! Maps an abstract joint angle in degrees to the native position units of the STS
//! servos. Used by the joint command pipeline for every dispatched command.
use core::f32::consts::PI;
use micromath::F32Ext;

use crate::robot::joint::JointCalibration;

// --- Servo Configuration ---
/// Native position of 0 rad.
const NATIVE_CENTER: f32 = 2048.0;
/// Native units per radian (4096 per revolution).
const NATIVE_PER_RAD: f32 = 2048.0 / PI;
/// Native positions are mirrored around this value.
const NATIVE_FLIP: i32 = 4095;

/// Outcome of clamping a requested angle to a joint range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Clamped {
    Within(f32),
    Clipped { requested: f32, applied: f32 },
}

impl Clamped {
    pub fn angle(self) -> f32 {
        match self {
            Clamped::Within(angle) => angle,
            Clamped::Clipped { applied, .. } => applied,
        }
    }
}

/// Clips `angle` to the nearest bound of the joint range.
pub fn clamp_angle(joint: &JointCalibration, angle: f32) -> Clamped {
    if angle < joint.min {
        Clamped::Clipped {
            requested: angle,
            applied: joint.min,
        }
    } else if angle > joint.max {
        Clamped::Clipped {
            requested: angle,
            applied: joint.max,
        }
    } else {
        Clamped::Within(angle)
    }
}

/// Degrees to native servo position. Increasing angles decrease the native
/// position; the existing trims depend on that convention.
pub fn angle_to_native(angle: f32) -> i32 {
    let rad = angle.to_radians();
    NATIVE_FLIP - (rad * NATIVE_PER_RAD + NATIVE_CENTER).round() as i32
}

/// Clamp, convert and trim: the native position dispatched for `angle`.
pub fn joint_position(joint: &JointCalibration, angle: f32) -> i32 {
    angle_to_native(clamp_angle(joint, angle).angle()) + joint.trim
}
