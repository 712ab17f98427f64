//! Gait generation and servo conversion for the walker.
//!
//! - [`conversion`] clamps joint angles and maps them to native servo positions.
//! - [`gait_table`] holds the per-gait amplitudes, offsets and phase lags.
//! - [`gait_engine`] turns a gait and an advancing phase into leg targets.
//! - [`poses`] holds the scripted poses and their non-blocking player.
//!
//! Used by the control loop every tick.
pub mod conversion;
pub mod gait_engine;
pub mod gait_table;
pub mod poses;
