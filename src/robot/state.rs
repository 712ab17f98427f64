//! Mutable robot state owned by the control loop.
use core::fmt::{self, Display, Formatter};
use embassy_time::{Duration, Instant};

use super::commands::Buttons;
use super::config::{
    CYCLE_DEFAULT, CYCLE_MAX, CYCLE_MIN, CYCLE_STEP, STANCE_HEIGHT_DEFAULT, STANCE_HEIGHT_MAX,
    STANCE_HEIGHT_MIN, STANCE_HEIGHT_STEP,
};
use crate::kinematics::gait_engine::GaitEngine;
use crate::kinematics::poses::PoseRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Default,
    /// Scripted poses.
    Pose,
    /// Direct limb teleoperation.
    Tilt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubMode {
    Walk,
    Shift,
    BankA,
    BankB,
    Body,
    Twist,
}

impl Mode {
    pub fn sub_modes(self) -> &'static [SubMode] {
        match self {
            Mode::Default => &[SubMode::Walk, SubMode::Shift],
            Mode::Pose => &[SubMode::BankA, SubMode::BankB],
            Mode::Tilt => &[SubMode::Body, SubMode::Twist],
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Default => f.write_str("default"),
            Mode::Pose => f.write_str("pose"),
            Mode::Tilt => f.write_str("tilt"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeState {
    pub mode: Mode,
    /// Index into [`Mode::sub_modes`].
    pub sub_mode: usize,
    /// Closed by every accepted change, open again once the buttons are released.
    pub buttons_active: bool,
    pub last_transition: Option<Instant>,
}

impl Default for ModeState {
    fn default() -> Self {
        Self {
            mode: Mode::Default,
            sub_mode: 0,
            buttons_active: true,
            last_transition: None,
        }
    }
}

impl ModeState {
    pub fn sub_mode(&self) -> SubMode {
        let sub_modes = self.mode.sub_modes();
        sub_modes[self.sub_mode % sub_modes.len()]
    }
}

/// Stance height and gait cycle duration, adjusted from the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stance {
    /// Degrees added to or removed from the vertical joints' base angle.
    pub height: f32,
    pub cycle: Duration,
}

impl Default for Stance {
    fn default() -> Self {
        Self {
            height: STANCE_HEIGHT_DEFAULT,
            cycle: CYCLE_DEFAULT,
        }
    }
}

impl Stance {
    pub fn raise(&mut self) {
        self.height = (self.height + STANCE_HEIGHT_STEP).min(STANCE_HEIGHT_MAX);
    }

    pub fn lower(&mut self) {
        self.height = (self.height - STANCE_HEIGHT_STEP).max(STANCE_HEIGHT_MIN);
    }

    pub fn slower(&mut self) {
        self.cycle = (self.cycle + CYCLE_STEP).min(CYCLE_MAX);
    }

    pub fn faster(&mut self) {
        self.cycle = self
            .cycle
            .checked_sub(CYCLE_STEP)
            .unwrap_or(CYCLE_MIN)
            .max(CYCLE_MIN);
    }
}

/// Everything the control loop mutates between ticks.
#[derive(Debug, Clone, Default)]
pub struct ControlState {
    pub mode: ModeState,
    pub gait: GaitEngine,
    pub stance: Stance,
    /// Buttons of the previous sample, for edge detection.
    pub previous_buttons: Buttons,
    pub connected: bool,
    pub pose: Option<PoseRunner>,
}

impl ControlState {
    pub fn running(&self) -> bool {
        self.gait.mode().is_some()
    }
}
