//! Session mode machine.
//!
//! Tracks the controller's [`SessionMode`] and keeps a bounded history of
//! mode changes for diagnostics.
//!
//! # Valid Transitions
//!
//! - Normal → Enrollment (`UPDATE_MODE` received)
//! - Enrollment → Normal (scan enrolled)
//! - Enrollment → Enrollment (`UPDATE_MODE` received again)
//!
//! There is no timeout: enrollment lasts until a scan arrives.
//!
//! # Examples
//!
//! ```
//! use keybox_controller::ModeMachine;
//! use keybox_core::SessionMode;
//!
//! let mut modes = ModeMachine::new();
//! assert_eq!(modes.current(), SessionMode::Normal);
//!
//! modes.transition_to(SessionMode::Enrollment).unwrap();
//! assert!(modes.is_enrolling());
//!
//! assert!(modes.transition_to(SessionMode::Enrollment).is_ok());
//! modes.transition_to(SessionMode::Normal).unwrap();
//! assert!(modes.transition_to(SessionMode::Normal).is_err());
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use keybox_core::{Error, Result, SessionMode};
use tracing::debug;

/// Maximum number of mode changes kept in history.
const MAX_HISTORY_SIZE: usize = 100;

/// A single mode change with the time it happened.
#[derive(Debug, Clone)]
pub struct ModeTransition {
    pub from: SessionMode,
    pub to: SessionMode,
    pub timestamp: Instant,
}

impl ModeTransition {
    pub fn new(from: SessionMode, to: SessionMode) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }
}

/// Validating holder of the current session mode.
#[derive(Debug)]
pub struct ModeMachine {
    current: SessionMode,
    entered_at: Instant,
    history: VecDeque<ModeTransition>,
}

impl ModeMachine {
    /// Create a machine in `Normal` mode.
    pub fn new() -> Self {
        Self {
            current: SessionMode::Normal,
            entered_at: Instant::now(),
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn current(&self) -> SessionMode {
        self.current
    }

    pub fn is_enrolling(&self) -> bool {
        self.current == SessionMode::Enrollment
    }

    /// Time spent in the current mode.
    pub fn time_in_current_mode(&self) -> Duration {
        self.entered_at.elapsed()
    }

    /// Recent mode changes, oldest first.
    pub fn history(&self) -> &VecDeque<ModeTransition> {
        &self.history
    }

    /// Change mode, rejecting transitions [`SessionMode::can_transition_to`]
    /// does not allow.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStateTransition` for a disallowed transition;
    /// the mode is left unchanged.
    pub fn transition_to(&mut self, target: SessionMode) -> Result<ModeTransition> {
        if !self.current.can_transition_to(&target) {
            return Err(Error::InvalidStateTransition {
                from: self.current.to_string(),
                to: target.to_string(),
            });
        }

        let transition = ModeTransition::new(self.current, target);
        debug!(from = %transition.from, to = %transition.to, "Mode transition");

        self.current = target;
        self.entered_at = transition.timestamp;
        self.history.push_back(transition.clone());
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }

        Ok(transition)
    }
}

impl Default for ModeMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_normal_without_history() {
        let modes = ModeMachine::new();
        assert_eq!(modes.current(), SessionMode::Normal);
        assert!(!modes.is_enrolling());
        assert!(modes.history().is_empty());
    }

    #[test]
    fn test_enrollment_round_trip() {
        let mut modes = ModeMachine::new();

        let t = modes.transition_to(SessionMode::Enrollment).unwrap();
        assert_eq!((t.from, t.to), (SessionMode::Normal, SessionMode::Enrollment));

        let t = modes.transition_to(SessionMode::Normal).unwrap();
        assert_eq!((t.from, t.to), (SessionMode::Enrollment, SessionMode::Normal));

        assert_eq!(modes.history().len(), 2);
    }

    #[test]
    fn test_invalid_transition_leaves_mode_unchanged() {
        let mut modes = ModeMachine::new();

        let err = modes.transition_to(SessionMode::Normal).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid mode transition from Normal to Normal"
        );
        assert_eq!(modes.current(), SessionMode::Normal);
        assert!(modes.history().is_empty());
    }

    #[test]
    fn test_transition_restarts_mode_clock() {
        let mut modes = ModeMachine::new();
        std::thread::sleep(Duration::from_millis(20));
        assert!(modes.time_in_current_mode() >= Duration::from_millis(20));

        let t = modes.transition_to(SessionMode::Enrollment).unwrap();
        assert!(modes.time_in_current_mode() <= t.timestamp.elapsed());
        assert!(modes.time_in_current_mode() < Duration::from_millis(20));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut modes = ModeMachine::new();

        for _ in 0..(MAX_HISTORY_SIZE + 10) {
            modes.transition_to(SessionMode::Enrollment).unwrap();
        }

        assert_eq!(modes.history().len(), MAX_HISTORY_SIZE);
        assert!(modes.is_enrolling());
    }
}
