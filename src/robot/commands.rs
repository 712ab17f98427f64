//! Input and output command types.
//!
//! Defines the controller snapshot consumed by the control loop every tick and the
//! motion profiles handed to the actuator driver with every joint command.
use super::config::{NORMAL_ACC, NORMAL_SPEED, SMOOTH_ACC, SMOOTH_SPEED};

/// Two-axis analog stick, each component in `[-1, 1]`. Positive `y` is forward.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Stick {
    pub x: f32,
    pub y: f32,
}

impl Stick {
    pub const CENTER: Stick = Stick { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Maps raw controller axes to `[-1, 1]`, zeroing each axis on its own below
    /// `deadzone` of full scale.
    pub fn from_raw(x: i8, y: i8, deadzone: f32) -> Self {
        Self {
            x: axis_from_raw(x, deadzone),
            y: axis_from_raw(y, deadzone),
        }
    }

    pub fn sanitized(self) -> Self {
        Self {
            x: unit(self.x, -1.0),
            y: unit(self.y, -1.0),
        }
    }

    pub fn is_centered(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

fn axis_from_raw(raw: i8, deadzone: f32) -> f32 {
    let value = raw as f32;
    let limit = deadzone * 128.0;
    if value > -limit && value < limit {
        0.0
    } else {
        (value / 128.0).clamp(-1.0, 1.0)
    }
}

/// Clamps to `[low, 1]`, mapping non-finite values to zero.
fn unit(value: f32, low: f32) -> f32 {
    if value.is_finite() {
        value.clamp(low, 1.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Cross = 0,
    Circle = 1,
    Square = 2,
    Triangle = 3,
    Up = 4,
    Down = 5,
    Left = 6,
    Right = 7,
    L1 = 8,
    R1 = 9,
    Share = 10,
    Options = 11,
    Ps = 12,
    /// Left stick click.
    L3 = 13,
}

/// Set of pressed buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Buttons(u16);

impl Buttons {
    pub const NONE: Buttons = Buttons(0);

    pub const fn with(self, button: Button) -> Self {
        Self(self.0 | 1 << button as u16)
    }

    pub fn from_slice(buttons: &[Button]) -> Self {
        buttons.iter().fold(Self::NONE, |set, b| set.with(*b))
    }

    pub fn pressed(self, button: Button) -> bool {
        self.0 & (1 << button as u16) != 0
    }

    pub fn any(self, buttons: &[Button]) -> bool {
        buttons.iter().any(|b| self.pressed(*b))
    }

    /// Buttons pressed now that were released in `previous`.
    pub fn rising(self, previous: Buttons) -> Buttons {
        Buttons(self.0 & !previous.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Immutable controller snapshot for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControllerSample {
    pub left: Stick,
    pub right: Stick,
    pub buttons: Buttons,
    /// Left analog trigger, `[0, 1]`.
    pub l2: f32,
    /// Right analog trigger, `[0, 1]`.
    pub r2: f32,
}

impl ControllerSample {
    /// Clamps every analog value into its range so malformed input never reaches
    /// the joints.
    pub fn sanitized(self) -> Self {
        Self {
            left: self.left.sanitized(),
            right: self.right.sanitized(),
            buttons: self.buttons,
            l2: unit(self.l2, 0.0),
            r2: unit(self.r2, 0.0),
        }
    }
}

/// What the controller collaborator publishes to the control task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Sample(ControllerSample),
    Disconnected,
}

/// Motion profile of a joint command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedProfile {
    /// Fast profile used by gait ticks, the neutral pose and scripted poses.
    Normal,
    /// Slow profile used by manual tilt commands.
    Smooth,
}

impl SpeedProfile {
    pub fn speed(self) -> u16 {
        match self {
            SpeedProfile::Normal => NORMAL_SPEED,
            SpeedProfile::Smooth => SMOOTH_SPEED,
        }
    }

    pub fn acceleration(self) -> u8 {
        match self {
            SpeedProfile::Normal => NORMAL_ACC,
            SpeedProfile::Smooth => SMOOTH_ACC,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadzone_is_applied_per_axis() {
        // 20 is below 0.2 * 128, 100 is not
        let stick = Stick::from_raw(20, 100, 0.2);
        assert_eq!(stick.x, 0.0);
        assert!((stick.y - 100.0 / 128.0).abs() < 1e-6);

        let stick = Stick::from_raw(i8::MIN, 0, 0.2);
        assert_eq!(stick, Stick::new(-1.0, 0.0));
    }

    #[test]
    fn sanitize_clamps_malformed_values() {
        let sample = ControllerSample {
            left: Stick::new(f32::NAN, 3.0),
            right: Stick::new(-7.0, f32::INFINITY),
            buttons: Buttons::NONE,
            l2: -1.0,
            r2: 2.5,
        }
        .sanitized();

        assert_eq!(sample.left, Stick::new(0.0, 1.0));
        assert_eq!(sample.right, Stick::new(-1.0, 0.0));
        assert_eq!(sample.l2, 0.0);
        assert_eq!(sample.r2, 1.0);
    }

    #[test]
    fn rising_edges() {
        let previous = Buttons::from_slice(&[Button::Up, Button::Cross]);
        let now = Buttons::from_slice(&[Button::Up, Button::Down]);
        let rising = now.rising(previous);

        assert!(rising.pressed(Button::Down));
        assert!(!rising.pressed(Button::Up));
        assert!(!rising.pressed(Button::Cross));
    }
}
