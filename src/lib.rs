//! Library root for the quadruped walker firmware.
//!
//! Re-exports all main modules: [`robot`], [`kinematics`], [`control`] and, on the
//! firmware build, [`tasks`]. The core is `no_std` and runs the same on the board and
//! in host tests.
#![cfg_attr(not(test), no_std)]

pub mod control;
pub mod kinematics;
pub mod robot;
#[cfg(feature = "esp32")]
pub mod tasks;

#[cfg(test)]
pub(crate) mod testing;
