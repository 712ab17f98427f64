//! Core robot types and configuration.
//!
//! This module defines the main types and constants for the walker, including:
//! - [`commands`]: Controller samples, buttons and motion profiles.
//! - [`config`]: Calibration record and timing/limit constants.
//! - [`leg`]: Leg and axis enumerations and indexing helpers.
//! - [`joint`]: Joint ids and per-joint calibration.
//! - [`state`]: The state owned by the control loop.
//! - [`servo`]: The joint command pipeline and the actuator driver seam.
//! - [`sts`]: Feetech STS serial bus driver.
pub mod commands;
pub mod config;
pub mod joint;
pub mod leg;
pub mod servo;
pub mod state;
pub mod sts;
