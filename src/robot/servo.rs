//! Joint command pipeline.
//!
//! Every joint command goes through the same steps: clamp to the joint range, convert
//! to native servo units, add the joint trim and hand the result to the actuator
//! driver together with a motion profile. Commands are idempotent position targets,
//! so a failed write is reported and never retried: the next tick supersedes it.
use heapless::Vec;
use log::{debug, info, warn};
use thiserror::Error;

use super::commands::SpeedProfile;
use super::config::{Calibration, JOINT_COUNT};
use super::joint::JointId;
use super::leg::{Axis, Leg, LegTargets};
use crate::kinematics::conversion::{angle_to_native, clamp_angle, Clamped};

/// Transport to the joint actuators.
pub trait ActuatorDriver {
    type Error: core::fmt::Debug;

    fn write_position(
        &mut self,
        id: JointId,
        position: i16,
        speed: u16,
        acceleration: u8,
    ) -> Result<(), Self::Error>;

    /// `Ok(true)` when the actuator answered.
    fn ping(&mut self, id: JointId) -> Result<bool, Self::Error>;

    /// Supply voltage seen by the actuator, in volts.
    fn read_voltage(&mut self, id: JointId) -> Result<f32, Self::Error>;
}

#[derive(Debug, Error)]
pub enum PipelineError<E: core::fmt::Debug> {
    #[error("{0} is not calibrated")]
    UnknownJoint(JointId),
    #[error("transport failure on {id}: {error:?}")]
    Transport { id: JointId, error: E },
}

/// Set of joint targets dispatched together.
pub type JointFrame = Vec<(JointId, f32), JOINT_COUNT>;

/// Result of the startup bus scan.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BusSurvey {
    pub present: Vec<JointId, JOINT_COUNT>,
    pub missing: Vec<JointId, JOINT_COUNT>,
    pub voltage: Option<f32>,
}

impl BusSurvey {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

pub struct JointPipeline<'a, D> {
    driver: D,
    calibration: &'a Calibration,
    last: [Option<f32>; JOINT_COUNT],
}

impl<'a, D: ActuatorDriver> JointPipeline<'a, D> {
    pub fn new(driver: D, calibration: &'a Calibration) -> Self {
        Self {
            driver,
            calibration,
            last: [None; JOINT_COUNT],
        }
    }

    pub fn calibration(&self) -> &'a Calibration {
        self.calibration
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Last angle commanded to `id`, after clamping.
    pub fn last_angle(&self, id: JointId) -> Option<f32> {
        self.calibration.index_of(id).and_then(|i| self.last[i])
    }

    pub fn command_joint(
        &mut self,
        id: JointId,
        angle: f32,
        profile: SpeedProfile,
    ) -> Result<(), PipelineError<D::Error>> {
        let index = self
            .calibration
            .index_of(id)
            .ok_or(PipelineError::UnknownJoint(id))?;
        let joint = &self.calibration.joints[index];

        let requested = if angle.is_finite() {
            angle
        } else {
            let fallback = self.last[index].unwrap_or(joint.midpoint());
            warn!("{id}: non-finite angle requested, holding {fallback}°");
            fallback
        };

        let safe = match clamp_angle(joint, requested) {
            Clamped::Within(angle) => angle,
            Clamped::Clipped { requested, applied } => {
                warn!(
                    "{id}: {requested}° outside [{}°, {}°], clipped to {applied}°",
                    joint.min, joint.max
                );
                applied
            }
        };
        self.last[index] = Some(safe);

        let native = angle_to_native(safe) + joint.trim;
        let position = native.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        debug!("{id}: {safe}° -> {position}");
        self.driver
            .write_position(id, position, profile.speed(), profile.acceleration())
            .map_err(|error| PipelineError::Transport { id, error })
    }

    /// Dispatches every target of the frame, even after a failure. Returns the first
    /// failure.
    pub fn command_frame(
        &mut self,
        frame: &[(JointId, f32)],
        profile: SpeedProfile,
    ) -> Result<(), PipelineError<D::Error>> {
        let mut first_error = None;
        for (id, angle) in frame {
            if let Err(e) = self.command_joint(*id, *angle, profile) {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Dispatches one target per leg joint.
    pub fn command_legs(
        &mut self,
        targets: &LegTargets,
        profile: SpeedProfile,
    ) -> Result<(), PipelineError<D::Error>> {
        let mut frame = JointFrame::new();
        for leg in Leg::ALL {
            for axis in Axis::ALL {
                let id = self.calibration.leg_joint(leg, axis);
                // capacity is JOINT_COUNT, one entry per leg joint
                let _ = frame.push((id, targets[leg][axis]));
            }
        }
        self.command_frame(&frame, profile)
    }

    /// The neutral pose: every joint to its resting angle at stance height `h`.
    pub fn neutral(&mut self, stance_height: f32) -> Result<(), PipelineError<D::Error>> {
        let frame: JointFrame = self
            .calibration
            .joints
            .iter()
            .map(|joint| (joint.id, joint.neutral.resolve(stance_height)))
            .collect();
        self.command_frame(&frame, SpeedProfile::Normal)
    }

    /// Pings every calibrated joint and reads the supply voltage of the first one
    /// that answers.
    pub fn survey(&mut self) -> BusSurvey {
        let mut survey = BusSurvey::default();
        for joint in self.calibration.joints.iter() {
            let answered = match self.driver.ping(joint.id) {
                Ok(answered) => answered,
                Err(e) => {
                    warn!("{}: ping failed: {e:?}", joint.id);
                    false
                }
            };
            let list = if answered {
                &mut survey.present
            } else {
                &mut survey.missing
            };
            let _ = list.push(joint.id);
        }

        if let Some(id) = survey.present.first().copied() {
            match self.driver.read_voltage(id) {
                Ok(volts) => survey.voltage = Some(volts),
                Err(e) => warn!("{id}: voltage read failed: {e:?}"),
            }
        }
        info!(
            "bus survey: {} of {} joints present, supply {:?} V",
            survey.present.len(),
            JOINT_COUNT,
            survey.voltage
        );
        survey
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::conversion::joint_position;
    use crate::robot::config::{CALIBRATION, NORMAL_SPEED, SMOOTH_ACC, SMOOTH_SPEED};
    use crate::testing::RecordingDriver;

    fn pipeline() -> JointPipeline<'static, RecordingDriver> {
        JointPipeline::new(RecordingDriver::default(), &CALIBRATION)
    }

    #[test]
    fn dispatched_positions_stay_within_range() {
        let mut pipeline = pipeline();
        for joint in CALIBRATION.joints.iter() {
            let lowest = angle_to_native(joint.max) + joint.trim;
            let highest = angle_to_native(joint.min) + joint.trim;
            for angle in [-1000.0, -90.0, -0.5, 0.0, 45.0, 90.0, 135.0, 180.0, 1e6] {
                pipeline
                    .command_joint(joint.id, angle, SpeedProfile::Normal)
                    .unwrap();
                let write = *pipeline.driver().writes.last().unwrap();
                assert_eq!(write.id, joint.id);
                assert!((lowest..=highest).contains(&(write.position as i32)));
                assert!(joint.contains(pipeline.last_angle(joint.id).unwrap()));
            }
        }
    }

    #[test]
    fn clamp_then_trim() {
        let mut pipeline = pipeline();
        // joint 3 is limited to [90, 180] with a trim of 30
        pipeline
            .command_joint(JointId(3), 10.0, SpeedProfile::Normal)
            .unwrap();
        let write = pipeline.driver().writes[0];
        assert_eq!(write.position as i32, angle_to_native(90.0) + 30);
        assert_eq!(pipeline.last_angle(JointId(3)), Some(90.0));
    }

    #[test]
    fn profiles_only_change_motion_parameters() {
        let mut pipeline = pipeline();
        pipeline
            .command_joint(JointId(4), 100.0, SpeedProfile::Normal)
            .unwrap();
        pipeline
            .command_joint(JointId(4), 100.0, SpeedProfile::Smooth)
            .unwrap();
        let [normal, smooth] = [pipeline.driver().writes[0], pipeline.driver().writes[1]];
        assert_eq!(normal.position, smooth.position);
        assert_eq!(normal.speed, NORMAL_SPEED);
        assert_eq!((smooth.speed, smooth.acceleration), (SMOOTH_SPEED, SMOOTH_ACC));
    }

    #[test]
    fn non_finite_angle_holds_previous_command() {
        let mut pipeline = pipeline();
        pipeline
            .command_joint(JointId(1), f32::NAN, SpeedProfile::Normal)
            .unwrap();
        assert_eq!(pipeline.last_angle(JointId(1)), Some(45.0));

        pipeline
            .command_joint(JointId(1), 20.0, SpeedProfile::Normal)
            .unwrap();
        pipeline
            .command_joint(JointId(1), f32::INFINITY, SpeedProfile::Normal)
            .unwrap();
        assert_eq!(pipeline.last_angle(JointId(1)), Some(20.0));
    }

    #[test]
    fn unknown_joint_is_rejected() {
        let mut pipeline = pipeline();
        let result = pipeline.command_joint(JointId(9), 90.0, SpeedProfile::Normal);
        assert!(matches!(result, Err(PipelineError::UnknownJoint(JointId(9)))));
        assert!(pipeline.driver().writes.is_empty());
    }

    #[test]
    fn transport_failure_is_reported_not_retried() {
        let mut pipeline = pipeline();
        pipeline.driver_mut().fail_on = Some(JointId(2));
        let result = pipeline.neutral(20.0);

        assert!(matches!(
            result,
            Err(PipelineError::Transport { id: JointId(2), .. })
        ));
        // one attempt per joint, the failed one included
        assert_eq!(pipeline.driver().attempts, 8);
        assert_eq!(pipeline.driver().writes.len(), 7);
    }

    #[test]
    fn neutral_covers_every_joint_with_stance_height() {
        let mut pipeline = pipeline();
        pipeline.neutral(20.0).unwrap();

        let writes = &pipeline.driver().writes;
        assert_eq!(writes.len(), 8);
        for (write, joint) in writes.iter().zip(CALIBRATION.joints.iter()) {
            assert_eq!(write.id, joint.id);
            let expected = joint_position(joint, joint.neutral.resolve(20.0));
            assert_eq!(write.position as i32, expected);
        }
        assert_eq!(pipeline.last_angle(JointId(2)), Some(70.0));
        assert_eq!(pipeline.last_angle(JointId(4)), Some(110.0));
    }

    #[test]
    fn survey_lists_missing_joints() {
        let mut pipeline = pipeline();
        pipeline.driver_mut().absent = Some(JointId(5));
        pipeline.driver_mut().voltage = 7.4;
        let survey = pipeline.survey();

        assert_eq!(survey.present.len(), 7);
        assert_eq!(survey.missing.as_slice(), &[JointId(5)]);
        assert_eq!(survey.voltage, Some(7.4));
        assert!(!survey.is_complete());
    }
}
