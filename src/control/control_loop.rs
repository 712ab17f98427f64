//! Per-tick decision procedure.
//!
//! Each tick consumes at most one controller sample and decides, in priority order,
//! what the joints do: keep playing a scripted pose, change mode, step a gait, follow
//! the sticks directly, adjust the stance, or rest in the neutral pose.
use embassy_time::Instant;
use log::{debug, error, info};

use super::mode::{requested_mode, SUB_MODE_NEXT, SUB_MODE_PREVIOUS};
use crate::kinematics::gait_engine::GaitMode;
use crate::kinematics::gait_table::GAIT_TABLE;
use crate::kinematics::poses::{PoseKind, PoseRunner, POSE_BANKS};
use crate::robot::commands::{Button, Buttons, ControllerSample, SpeedProfile, Stick};
use crate::robot::config::{CROUCH_GAIN, STICK_THRESHOLD, TILT_GAIN, TWIST_GAIN};
use crate::robot::leg::{Axis, Leg};
use crate::robot::servo::{ActuatorDriver, JointFrame, JointPipeline, PipelineError};
use crate::robot::state::{ControlState, Mode, SubMode};

/// What a tick did with the joints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// No controller. The neutral pose goes out on the disconnecting tick only.
    Disconnected,
    Pose(PoseKind),
    ModeChanged(Mode),
    SubModeChanged(SubMode),
    Gait(GaitMode),
    Tilt,
    /// Stance height or cycle changed; the neutral pose was re-issued.
    Stance,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

/// Dominant direction of a stick deflected past the gait threshold.
fn direction(stick: Stick) -> Option<Direction> {
    let (x, y) = (stick.x.abs(), stick.y.abs());
    if x <= STICK_THRESHOLD && y <= STICK_THRESHOLD {
        return None;
    }
    Some(if y >= x {
        if stick.y > 0.0 {
            Direction::Forward
        } else {
            Direction::Backward
        }
    } else if stick.x > 0.0 {
        Direction::Right
    } else {
        Direction::Left
    })
}

fn creep(direction: Direction) -> GaitMode {
    match direction {
        Direction::Forward => GaitMode::CreepForward,
        Direction::Backward => GaitMode::CreepBackward,
        Direction::Left => GaitMode::CreepLeft,
        Direction::Right => GaitMode::CreepRight,
    }
}

fn trot(direction: Direction, sub_mode: SubMode) -> GaitMode {
    match (direction, sub_mode) {
        (Direction::Forward, _) => GaitMode::TrotForward,
        (Direction::Backward, _) => GaitMode::TrotBackward,
        (Direction::Left, SubMode::Shift) => GaitMode::TrotShiftLeft,
        (Direction::Right, SubMode::Shift) => GaitMode::TrotShiftRight,
        (Direction::Left, _) => GaitMode::TrotLeft,
        (Direction::Right, _) => GaitMode::TrotRight,
    }
}

fn log_failure<E: core::fmt::Debug>(context: &str, result: Result<(), PipelineError<E>>) {
    if let Err(e) = result {
        error!("{context}: {e}");
    }
}

pub struct ControlLoop<'a, D> {
    state: ControlState,
    pipeline: JointPipeline<'a, D>,
}

impl<'a, D: ActuatorDriver> ControlLoop<'a, D> {
    pub fn new(pipeline: JointPipeline<'a, D>) -> Self {
        Self {
            state: ControlState::default(),
            pipeline,
        }
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn pipeline(&self) -> &JointPipeline<'a, D> {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut JointPipeline<'a, D> {
        &mut self.pipeline
    }

    /// Rests every joint in the neutral pose at the current stance height.
    pub fn neutral(&mut self) {
        let height = self.state.stance.height;
        log_failure("neutral pose", self.pipeline.neutral(height));
    }

    fn stop_and_rest(&mut self) {
        self.state.gait.stop();
        self.neutral();
    }

    /// Runs one control tick. `input` is `None` while no controller is connected.
    pub fn tick(&mut self, now: Instant, input: Option<ControllerSample>) -> TickOutcome {
        let Some(sample) = input else {
            return self.disconnected(now);
        };
        let sample = sample.sanitized();
        if !self.state.connected {
            info!("controller connected");
            self.state.connected = true;
        }
        let rising = sample.buttons.rising(self.state.previous_buttons);
        self.state.previous_buttons = sample.buttons;

        if let Some(kind) = self.poll_pose(now) {
            return TickOutcome::Pose(kind);
        }

        self.state.mode.release(sample.buttons);
        if let Some(outcome) = self.handle_mode_buttons(now, sample.buttons) {
            return outcome;
        }

        match self.state.mode.mode {
            Mode::Default => self.default_tick(now, &sample, rising),
            Mode::Pose => self.pose_tick(now, rising),
            Mode::Tilt => self.tilt_tick(&sample, rising),
        }
    }

    fn disconnected(&mut self, now: Instant) -> TickOutcome {
        self.state.previous_buttons = Buttons::NONE;
        if self.state.connected {
            info!("controller disconnected");
            self.state.connected = false;
            self.state.gait.stop();
            // a running pose closes with the neutral pose on its own
            if self.state.pose.is_none() {
                self.neutral();
            }
        }
        match self.poll_pose(now) {
            Some(kind) => TickOutcome::Pose(kind),
            None => TickOutcome::Disconnected,
        }
    }

    /// Advances the running pose, if any. Returns its kind while it owns the tick.
    fn poll_pose(&mut self, now: Instant) -> Option<PoseKind> {
        let runner = self.state.pose.as_mut()?;
        let kind = runner.kind();
        if runner.poll(now, &mut self.pipeline, self.state.stance.height) {
            self.state.pose = None;
        }
        Some(kind)
    }

    fn handle_mode_buttons(&mut self, now: Instant, buttons: Buttons) -> Option<TickOutcome> {
        if let Some(mode) = requested_mode(buttons) {
            if self.state.mode.request_mode(mode, now) {
                self.stop_and_rest();
                return Some(TickOutcome::ModeChanged(mode));
            }
        }

        let forward = if buttons.pressed(SUB_MODE_NEXT) {
            true
        } else if buttons.pressed(SUB_MODE_PREVIOUS) {
            false
        } else {
            return None;
        };
        let sub_mode = self.state.mode.cycle_sub_mode(forward, now)?;
        self.stop_and_rest();
        Some(TickOutcome::SubModeChanged(sub_mode))
    }

    fn default_tick(
        &mut self,
        now: Instant,
        sample: &ControllerSample,
        rising: Buttons,
    ) -> TickOutcome {
        // a running gait picks the new stance up on its next frame
        let stance_changed = self.change_stance(rising);
        if let Some(direction) = direction(sample.left) {
            return self.run_gait(creep(direction), now);
        }
        if let Some(direction) = direction(sample.right) {
            let sub_mode = self.state.mode.sub_mode();
            return self.run_gait(trot(direction, sub_mode), now);
        }
        if stance_changed {
            self.stop_and_rest();
            return TickOutcome::Stance;
        }
        self.idle()
    }

    fn run_gait(&mut self, mode: GaitMode, now: Instant) -> TickOutcome {
        if self.state.gait.mode() != Some(mode) {
            info!("gait {mode:?}");
        }
        self.state.gait.select(mode);
        let stance = self.state.stance;
        if let Some(targets) = self
            .state
            .gait
            .step(now, stance.cycle, &GAIT_TABLE, stance.height)
        {
            debug!("gait {mode:?} phase {}", self.state.gait.phase());
            log_failure("gait step", self.pipeline.command_legs(&targets, SpeedProfile::Normal));
        }
        TickOutcome::Gait(mode)
    }

    fn pose_tick(&mut self, now: Instant, rising: Buttons) -> TickOutcome {
        let bank = POSE_BANKS[self.state.mode.sub_mode % POSE_BANKS.len()];
        let started = bank
            .iter()
            .find(|(button, _)| rising.pressed(*button))
            .map(|(_, kind)| *kind);
        if let Some(kind) = started {
            self.state.gait.stop();
            self.state.pose = Some(PoseRunner::new(kind));
            self.poll_pose(now);
            return TickOutcome::Pose(kind);
        }
        self.adjust_stance(rising).unwrap_or_else(|| self.idle())
    }

    fn tilt_tick(&mut self, sample: &ControllerSample, rising: Buttons) -> TickOutcome {
        let crouch = sample.r2 - sample.l2;
        let frame = match self.state.mode.sub_mode() {
            SubMode::Twist if !sample.right.is_centered() => Some(self.twist_frame(sample.right)),
            SubMode::Body if !sample.right.is_centered() || crouch != 0.0 => {
                Some(self.body_frame(sample.right, crouch))
            }
            _ => None,
        };
        match frame {
            Some(frame) => {
                self.state.gait.stop();
                log_failure("tilt", self.pipeline.command_frame(&frame, SpeedProfile::Smooth));
                TickOutcome::Tilt
            }
            None => self.adjust_stance(rising).unwrap_or_else(|| self.idle()),
        }
    }

    /// Vertical joints around their stance neutral: the front rises with the stick
    /// pushed forward, the left side with the stick pushed right, and the whole body
    /// sinks with the right trigger.
    fn body_frame(&self, stick: Stick, crouch: f32) -> JointFrame {
        let calibration = self.pipeline.calibration();
        let height = self.state.stance.height;
        Leg::ALL
            .into_iter()
            .filter_map(|leg| {
                let id = calibration.leg_joint(leg, Axis::Vertical);
                let neutral = calibration.joint(id)?.neutral.resolve(height);
                let pitch = if leg.is_front() { stick.y } else { -stick.y };
                let roll = if leg.is_left() { stick.x } else { -stick.x };
                let lift = TILT_GAIN * (pitch + roll) - CROUCH_GAIN * crouch;
                Some((id, neutral + GAIT_TABLE.stance_signs[leg] * lift))
            })
            .collect()
    }

    /// Every lateral joint swings the same way: the body yaws in place.
    fn twist_frame(&self, stick: Stick) -> JointFrame {
        let calibration = self.pipeline.calibration();
        let height = self.state.stance.height;
        Leg::ALL
            .into_iter()
            .filter_map(|leg| {
                let id = calibration.leg_joint(leg, Axis::Lateral);
                let joint = calibration.joint(id)?;
                Some((id, joint.neutral.resolve(height) - TWIST_GAIN * stick.x))
            })
            .collect()
    }

    /// Applies a height or cycle button edge to the stance.
    fn change_stance(&mut self, rising: Buttons) -> bool {
        let stance = &mut self.state.stance;
        if rising.pressed(Button::Up) {
            stance.raise();
        } else if rising.pressed(Button::Down) {
            stance.lower();
        } else if rising.pressed(Button::Right) {
            stance.slower();
        } else if rising.pressed(Button::Left) {
            stance.faster();
        } else {
            return false;
        }
        info!(
            "stance height {}, cycle {} ms",
            stance.height,
            stance.cycle.as_millis()
        );
        true
    }

    /// Stance change outside a gait: the new height shows in the neutral pose.
    fn adjust_stance(&mut self, rising: Buttons) -> Option<TickOutcome> {
        if !self.change_stance(rising) {
            return None;
        }
        self.stop_and_rest();
        Some(TickOutcome::Stance)
    }

    fn idle(&mut self) -> TickOutcome {
        if self.state.running() {
            info!("gait stopped");
        }
        self.stop_and_rest();
        TickOutcome::Neutral
    }
}
