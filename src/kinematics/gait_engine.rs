//! Periodic gait generator.
//!
//! A single phase in `[0, 1)` runs through one gait cycle. Every leg reads the cycle
//! at its own lag and maps it through the waveform of the gait family to a pair of
//! joint angles. The phase advances at a fixed tick; calls between ticks are no-ops.
use core::f32::consts::PI;
use embassy_time::{Duration, Instant};
use micromath::F32Ext;

use super::gait_table::GaitTable;
use crate::robot::config::GAIT_TICK;
use crate::robot::leg::{Leg, LegTarget, LegTargets, LEG_COUNT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaitFamily {
    Creep,
    Trot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaitMode {
    CreepForward = 0,
    CreepBackward = 1,
    CreepLeft = 2,
    CreepRight = 3,
    TrotForward = 4,
    TrotBackward = 5,
    TrotLeft = 6,
    TrotRight = 7,
    TrotShiftLeft = 8,
    TrotShiftRight = 9,
}

impl GaitMode {
    pub const COUNT: usize = 10;
    pub const ALL: [GaitMode; Self::COUNT] = [
        GaitMode::CreepForward,
        GaitMode::CreepBackward,
        GaitMode::CreepLeft,
        GaitMode::CreepRight,
        GaitMode::TrotForward,
        GaitMode::TrotBackward,
        GaitMode::TrotLeft,
        GaitMode::TrotRight,
        GaitMode::TrotShiftLeft,
        GaitMode::TrotShiftRight,
    ];

    pub fn family(self) -> GaitFamily {
        match self {
            GaitMode::CreepForward
            | GaitMode::CreepBackward
            | GaitMode::CreepLeft
            | GaitMode::CreepRight => GaitFamily::Creep,
            _ => GaitFamily::Trot,
        }
    }
}

/// Creep waveform: a quarter cycle of swing (half-sine lift, quarter-sine sweep), then
/// three quarters of stance retracing the sweep linearly. Returns `(x, z)`.
pub fn creep_waveform(phase: f32, x_amp: f32, z_amp: f32, x_off: f32, z_off: f32) -> (f32, f32) {
    if phase < 0.25 {
        let z = z_off + z_amp * (phase / 0.25 * PI).sin();
        let x = x_off + x_amp * (phase / 0.25 * PI / 2.0).sin();
        (x, z)
    } else {
        let returning = (phase - 0.25) / 0.75;
        (x_off + x_amp * (1.0 - returning), z_off)
    }
}

/// Trot waveform: half a cycle of swing, then a cosine return on the ground.
pub fn trot_waveform(phase: f32, x_amp: f32, z_amp: f32, x_off: f32, z_off: f32) -> (f32, f32) {
    if phase < 0.5 {
        let z = z_off + z_amp * (phase * 2.0 * PI).sin();
        let x = x_off + x_amp * (phase * PI).sin();
        (x, z)
    } else {
        (x_off + x_amp * ((phase - 0.5) * PI).cos(), z_off)
    }
}

/// Wraps into `[0, 1)`.
fn wrap(phase: f32) -> f32 {
    let wrapped = phase % 1.0;
    if wrapped < 0.0 {
        wrapped + 1.0
    } else {
        wrapped
    }
}

/// Joint targets of every leg for `mode` at `phase` and stance height `h`.
pub fn compute_leg_targets(
    mode: GaitMode,
    phase: f32,
    table: &GaitTable,
    stance_height: f32,
) -> LegTargets {
    let params = table.params(mode);
    let z_offsets = table.stance_offsets(stance_height);
    let waveform = match mode.family() {
        GaitFamily::Creep => creep_waveform,
        GaitFamily::Trot => trot_waveform,
    };

    let mut targets = [LegTarget::default(); LEG_COUNT];
    for leg in Leg::ALL {
        let leg_phase = wrap(phase + params.phase_offsets[leg]);
        let (x, z) = waveform(
            leg_phase,
            params.x_amps[leg],
            params.z_amps[leg],
            params.x_offsets[leg],
            z_offsets[leg],
        );
        targets[leg] = LegTarget { x, z };
    }
    targets
}

/// Phase generator with its own tick rate limit.
#[derive(Debug, Clone, Default)]
pub struct GaitEngine {
    phase: f32,
    last_tick: Option<Instant>,
    mode: Option<GaitMode>,
}

impl GaitEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn mode(&self) -> Option<GaitMode> {
        self.mode
    }

    /// Advances by one tick worth of phase when at least [`GAIT_TICK`] passed since
    /// the last advance. Skipped time is dropped, never caught up.
    pub fn advance_phase(&mut self, now: Instant, cycle: Duration) -> bool {
        if let Some(last) = self.last_tick {
            match now.checked_duration_since(last) {
                Some(elapsed) if elapsed >= GAIT_TICK => {}
                _ => return false,
            }
        }
        self.last_tick = Some(now);
        let cycle_ms = cycle.as_millis().max(1) as f32;
        self.phase = wrap(self.phase + GAIT_TICK.as_millis() as f32 / cycle_ms);
        true
    }

    /// Selects the gait to run. A different gait restarts the cycle.
    pub fn select(&mut self, mode: GaitMode) {
        if self.mode != Some(mode) {
            self.mode = Some(mode);
            self.phase = 0.0;
        }
    }

    /// Gait execution stopped: the phase is frozen at 0 until the next selection.
    pub fn stop(&mut self) {
        self.mode = None;
        self.phase = 0.0;
    }

    /// One control tick of the running gait. `None` when the tick was rate limited or
    /// no gait is selected.
    pub fn step(
        &mut self,
        now: Instant,
        cycle: Duration,
        table: &GaitTable,
        stance_height: f32,
    ) -> Option<LegTargets> {
        let mode = self.mode?;
        if !self.advance_phase(now, cycle) {
            return None;
        }
        Some(compute_leg_targets(mode, self.phase, table, stance_height))
    }
}
