//! Connectivity state machine.
//!
//! Tracks which bring-up step the session is in, when it was entered, and a
//! bounded history of how it got there. It does not issue commands; the
//! [`SessionManager`](crate::SessionManager) drives it and decides when to
//! move.
//!
//! # Valid Transitions
//!
//! - Reset → Init → JoinNetwork → ConfigureSession → ConnectSession →
//!   Subscribe → Running (one step per matched command)
//! - any state except Error → Error (failure, timeout, link loss)
//! - any state → Reset (cooldown expiry or forced restart)
//!
//! Time is passed in explicitly as milliseconds from the session clock, so
//! the machine behaves identically under a mock clock.
//!
//! # Examples
//!
//! ```
//! use seatlink_core::ConnectivityState;
//! use seatlink_session::StateMachine;
//!
//! let mut machine = StateMachine::new(0);
//! assert_eq!(machine.current_state(), ConnectivityState::Reset);
//!
//! machine.transition_to(ConnectivityState::Init, 150).unwrap();
//! assert_eq!(machine.time_in_current_state(400), 250);
//!
//! // Skipping a step is refused.
//! assert!(machine.transition_to(ConnectivityState::Subscribe, 500).is_err());
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use seatlink_core::{ConnectivityState, Error, Result};

/// Maximum number of state transitions to keep in history.
///
/// A full bring-up is six transitions, so this holds the last dozen or so
/// restart cycles.
pub const MAX_HISTORY_SIZE: usize = 100;

/// A single state transition with its clock reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: ConnectivityState,
    pub to: ConnectivityState,
    /// Session clock reading when the transition happened.
    pub at_ms: u64,
}

impl StateTransition {
    pub fn new(from: ConnectivityState, to: ConnectivityState, at_ms: u64) -> Self {
        Self { from, to, at_ms }
    }

    /// True for a step along the bring-up pipeline.
    pub fn is_forward(&self) -> bool {
        self.from.on_match() == Some(self.to)
    }
}

/// State holder with validated transitions and history.
///
/// Not thread-safe; it lives inside the single control loop.
#[derive(Debug, Clone)]
pub struct StateMachine {
    current_state: ConnectivityState,
    state_entered_at_ms: u64,
    history: VecDeque<StateTransition>,
}

impl StateMachine {
    /// Create a machine in `Reset`, entered at `now_ms`.
    pub fn new(now_ms: u64) -> Self {
        Self {
            current_state: ConnectivityState::Reset,
            state_entered_at_ms: now_ms,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn current_state(&self) -> ConnectivityState {
        self.current_state
    }

    /// Clock reading when the current state was entered.
    pub fn state_entered_at(&self) -> u64 {
        self.state_entered_at_ms
    }

    /// Milliseconds spent in the current state as of `now_ms`.
    pub fn time_in_current_state(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.state_entered_at_ms)
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Move to `new_state`, validating the transition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStateTransition`] if the move is not allowed
    /// from the current state. The machine is left unchanged.
    pub fn transition_to(
        &mut self,
        new_state: ConnectivityState,
        now_ms: u64,
    ) -> Result<StateTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.current_state,
                to: new_state,
            });
        }

        let transition = StateTransition::new(self.current_state, new_state, now_ms);
        self.perform_state_change(transition);
        Ok(transition)
    }

    fn perform_state_change(&mut self, transition: StateTransition) {
        self.current_state = transition.to;
        self.state_entered_at_ms = transition.at_ms;

        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }
}
