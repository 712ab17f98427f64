//! Asynchronous tasks of the walker firmware.
//!
//! - [`control_task`]: runs the control loop at a fixed period and owns the servo
//!   bus.
//!
//! Tasks are spawned from `main.rs`. Controller input reaches them through
//! [`control_task::CONTROLLER_INPUT`].
pub mod control_task;
