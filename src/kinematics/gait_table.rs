//! Static per-gait parameters.
//!
//! One row per [`GaitMode`]: per-leg sweep amplitude, lift amplitude, sweep center and
//! phase lag. The vertical center of every leg is not stored here; it follows the
//! stance height through [`GaitTable::stance_offsets`].
use super::gait_engine::GaitMode;
use crate::robot::config::STANCE_BASE;
use crate::robot::leg::{Leg, LEG_COUNT};

/// Hip sweep amplitude, degrees.
pub const X_AMP: f32 = 20.0;
/// Foot lift amplitude, degrees.
pub const Z_AMP: f32 = 15.0;
/// Forward bias of the front hips while creeping.
pub const OFFSET_FRONT: f32 = 35.0;
/// Backward bias of the rear hips while creeping.
pub const OFFSET_BACK: f32 = 55.0;

/// Quarter-cycle stagger, one leg airborne at a time.
const CREEP_PHASES: [f32; LEG_COUNT] = [0.00, 0.50, 0.25, 0.75];
/// Diagonal pairs share a phase.
const TROT_PHASES: [f32; LEG_COUNT] = [0.50, 0.00, 0.00, 0.50];
/// The foot of a mirrored leg lifts towards decreasing angles.
const LIFT: [f32; LEG_COUNT] = [Z_AMP, -Z_AMP, -Z_AMP, Z_AMP];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaitParams {
    pub x_amps: [f32; LEG_COUNT],
    pub z_amps: [f32; LEG_COUNT],
    pub x_offsets: [f32; LEG_COUNT],
    /// Fraction of a cycle, `[0, 1)`.
    pub phase_offsets: [f32; LEG_COUNT],
}

#[derive(Debug, Clone, PartialEq)]
pub struct GaitTable {
    pub rows: [GaitParams; GaitMode::COUNT],
    /// Sign of the stance height in the vertical center of each leg.
    pub stance_signs: [f32; LEG_COUNT],
}

impl GaitTable {
    pub fn params(&self, mode: GaitMode) -> &GaitParams {
        &self.rows[mode as usize]
    }

    /// Vertical center of every leg at stance height `h`: front and rear of a side
    /// are biased in opposite directions.
    pub fn stance_offsets(&self, stance_height: f32) -> [f32; LEG_COUNT] {
        let mut offsets = [STANCE_BASE; LEG_COUNT];
        for leg in Leg::ALL {
            offsets[leg] += self.stance_signs[leg] * stance_height;
        }
        offsets
    }
}

const fn row(
    x_amps: [f32; LEG_COUNT],
    x_offsets: [f32; LEG_COUNT],
    phase_offsets: [f32; LEG_COUNT],
) -> GaitParams {
    GaitParams {
        x_amps,
        z_amps: LIFT,
        x_offsets,
        phase_offsets,
    }
}

const HALF: f32 = X_AMP / 2.0;

pub static GAIT_TABLE: GaitTable = GaitTable {
    rows: [
        // CreepForward
        row(
            [-X_AMP, X_AMP, -X_AMP, X_AMP],
            [90.0 - OFFSET_FRONT, 90.0 + OFFSET_FRONT, 90.0 + OFFSET_BACK, 90.0 - OFFSET_BACK],
            CREEP_PHASES,
        ),
        // CreepBackward
        row(
            [X_AMP, -X_AMP, X_AMP, -X_AMP],
            [90.0 - OFFSET_BACK, 90.0 + OFFSET_BACK, 90.0 + OFFSET_FRONT, 90.0 - OFFSET_FRONT],
            [0.25, 0.75, 0.00, 0.50],
        ),
        // CreepLeft
        row(
            [-X_AMP; LEG_COUNT],
            [45.0 + HALF, 135.0 + HALF, 135.0 + HALF, 45.0 + HALF],
            CREEP_PHASES,
        ),
        // CreepRight
        row(
            [X_AMP; LEG_COUNT],
            [45.0 - HALF, 135.0 - HALF, 135.0 - HALF, 45.0 - HALF],
            CREEP_PHASES,
        ),
        // TrotForward
        row(
            [-X_AMP, X_AMP, -X_AMP, X_AMP],
            [45.0 + HALF, 135.0 - HALF, 135.0 + HALF, 45.0 - HALF],
            TROT_PHASES,
        ),
        // TrotBackward
        row(
            [X_AMP, -X_AMP, X_AMP, -X_AMP],
            [45.0 - HALF, 135.0 + HALF, 135.0 - HALF, 45.0 + HALF],
            TROT_PHASES,
        ),
        // TrotLeft
        row(
            [X_AMP; LEG_COUNT],
            [45.0 + HALF, 135.0 + HALF, 135.0 + HALF, 45.0 + HALF],
            TROT_PHASES,
        ),
        // TrotRight
        row(
            [-X_AMP; LEG_COUNT],
            [45.0 - HALF, 135.0 - HALF, 135.0 - HALF, 45.0 - HALF],
            TROT_PHASES,
        ),
        // TrotShiftLeft
        row(
            [X_AMP, X_AMP, -X_AMP, -X_AMP],
            [45.0 - HALF, 135.0 - HALF, 135.0 + HALF, 45.0 + HALF],
            TROT_PHASES,
        ),
        // TrotShiftRight
        row(
            [-X_AMP, -X_AMP, X_AMP, X_AMP],
            [45.0 + HALF, 135.0 + HALF, 135.0 - HALF, 45.0 - HALF],
            TROT_PHASES,
        ),
    ],
    stance_signs: [-1.0, 1.0, 1.0, -1.0],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::config::CALIBRATION;
    use crate::robot::leg::Axis;

    #[test]
    fn stance_offsets_match_vertical_neutral() {
        for h in [0.0, 20.0, 50.0] {
            let offsets = GAIT_TABLE.stance_offsets(h);
            for leg in Leg::ALL {
                let id = CALIBRATION.leg_joint(leg, Axis::Vertical);
                let neutral = CALIBRATION.joint(id).unwrap().neutral.resolve(h);
                assert_eq!(offsets[leg], neutral, "{leg} at h={h}");
            }
        }
    }

    #[test]
    fn sweeps_stay_inside_joint_ranges() {
        for mode in GaitMode::ALL {
            let params = GAIT_TABLE.params(mode);
            for leg in Leg::ALL {
                let joint = CALIBRATION
                    .joint(CALIBRATION.leg_joint(leg, Axis::Lateral))
                    .unwrap();
                let start = params.x_offsets[leg];
                let end = start + params.x_amps[leg];
                assert!(
                    joint.contains(start) && joint.contains(end),
                    "{mode:?} {leg}: {start}..{end}"
                );
            }
        }
    }

    #[test]
    fn phase_offsets_are_fractions() {
        for mode in GaitMode::ALL {
            for offset in GAIT_TABLE.params(mode).phase_offsets {
                assert!((0.0..1.0).contains(&offset));
            }
        }
    }
}
