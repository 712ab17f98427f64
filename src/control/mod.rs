//! Controller-driven decision making.
//!
//! - [`mode`]: top-level mode and sub-mode transitions.
//! - [`control_loop`]: the per-tick procedure turning controller samples into joint
//!   commands.
pub mod control_loop;
pub mod mode;
