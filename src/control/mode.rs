//! Top-level mode and sub-mode transitions.
//!
//! A change is accepted only while the button gate is open and once the debounce
//! window since the previous change has elapsed. Holding a button therefore changes
//! the mode at most once; the gate opens again when every mode button is released.
use embassy_time::Instant;
use log::{debug, info};

use crate::robot::commands::{Button, Buttons};
use crate::robot::config::MODE_DEBOUNCE;
use crate::robot::state::{Mode, ModeState, SubMode};

/// Buttons requesting a top-level mode.
pub const MODE_BUTTONS: [(Button, Mode); 3] = [
    (Button::Ps, Mode::Default),
    (Button::Options, Mode::Pose),
    (Button::Share, Mode::Tilt),
];

pub const SUB_MODE_NEXT: Button = Button::R1;
pub const SUB_MODE_PREVIOUS: Button = Button::L1;

/// First mode whose button is held.
pub fn requested_mode(buttons: Buttons) -> Option<Mode> {
    MODE_BUTTONS
        .iter()
        .find(|(button, _)| buttons.pressed(*button))
        .map(|(_, mode)| *mode)
}

/// `true` while any mode or sub-mode button is held.
pub fn mode_buttons_held(buttons: Buttons) -> bool {
    requested_mode(buttons).is_some() || buttons.any(&[SUB_MODE_NEXT, SUB_MODE_PREVIOUS])
}

impl ModeState {
    fn debounced(&self, now: Instant) -> bool {
        match self.last_transition {
            None => true,
            Some(last) => now
                .checked_duration_since(last)
                .is_some_and(|elapsed| elapsed >= MODE_DEBOUNCE),
        }
    }

    fn accept(&mut self, now: Instant) {
        self.last_transition = Some(now);
        self.buttons_active = false;
    }

    /// Switches to `mode`. Returns whether the change was accepted.
    pub fn request_mode(&mut self, mode: Mode, now: Instant) -> bool {
        if mode == self.mode || !self.buttons_active {
            return false;
        }
        if !self.debounced(now) {
            debug!("mode {mode} requested within the debounce window");
            return false;
        }
        info!("mode {} -> {mode}", self.mode);
        self.mode = mode;
        self.sub_mode = 0;
        self.accept(now);
        true
    }

    /// Moves to the next (or previous) sub-mode, wrapping around. Returns the new
    /// sub-mode when the change was accepted.
    pub fn cycle_sub_mode(&mut self, forward: bool, now: Instant) -> Option<SubMode> {
        if !self.buttons_active || !self.debounced(now) {
            return None;
        }
        let count = self.mode.sub_modes().len();
        self.sub_mode = if forward {
            (self.sub_mode + 1) % count
        } else {
            (self.sub_mode + count - 1) % count
        };
        self.accept(now);
        let sub_mode = self.sub_mode();
        info!("{} sub-mode {sub_mode:?}", self.mode);
        Some(sub_mode)
    }

    /// Opens the gate once no mode button is held.
    pub fn release(&mut self, buttons: Buttons) {
        if !self.buttons_active && !mode_buttons_held(buttons) {
            self.buttons_active = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_time::Duration;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn button_mapping() {
        assert_eq!(requested_mode(Buttons::NONE), None);
        assert_eq!(
            requested_mode(Buttons::NONE.with(Button::Share)),
            Some(Mode::Tilt)
        );
        assert!(mode_buttons_held(Buttons::NONE.with(Button::L1)));
        assert!(!mode_buttons_held(Buttons::NONE.with(Button::Cross)));
    }

    #[test]
    fn same_mode_is_ignored() {
        let mut state = ModeState::default();
        assert!(!state.request_mode(Mode::Default, at(1000)));
        assert!(state.buttons_active);
        assert_eq!(state.last_transition, None);
    }

    #[test]
    fn accepted_change_resets_sub_mode_and_closes_gate() {
        let mut state = ModeState {
            sub_mode: 1,
            ..ModeState::default()
        };
        assert!(state.request_mode(Mode::Pose, at(1000)));
        assert_eq!(state.mode, Mode::Pose);
        assert_eq!(state.sub_mode(), SubMode::BankA);
        assert!(!state.buttons_active);
        assert_eq!(state.last_transition, Some(at(1000)));
    }

    #[test]
    fn requests_within_debounce_window_are_rejected() {
        let mut state = ModeState::default();
        assert!(state.request_mode(Mode::Pose, at(1000)));
        state.release(Buttons::NONE);

        let too_soon = at(1000) + MODE_DEBOUNCE - Duration::from_millis(1);
        assert!(!state.request_mode(Mode::Tilt, too_soon));
        assert_eq!(state.mode, Mode::Pose);

        assert!(state.request_mode(Mode::Tilt, at(1000) + MODE_DEBOUNCE));
        assert_eq!(state.mode, Mode::Tilt);
    }

    #[test]
    fn held_button_changes_once() {
        let mut state = ModeState::default();
        let held = Buttons::NONE.with(Button::R1);
        let mut accepted = 0;
        for t in (0..2000).step_by(20) {
            state.release(held);
            if state.cycle_sub_mode(true, at(t)).is_some() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);

        state.release(Buttons::NONE);
        assert!(state.buttons_active);
    }

    #[test]
    fn sub_mode_wraps_both_ways() {
        let mut state = ModeState::default();
        assert_eq!(state.cycle_sub_mode(false, at(0)), Some(SubMode::Shift));
        state.release(Buttons::NONE);
        assert_eq!(state.cycle_sub_mode(true, at(300)), Some(SubMode::Walk));
        state.release(Buttons::NONE);
        assert_eq!(state.cycle_sub_mode(true, at(600)), Some(SubMode::Shift));
    }
}
