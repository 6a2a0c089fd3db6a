use serde::{Deserialize, Serialize};
use std::fmt;

/// Connectivity state of the broker session.
///
/// The bring-up pipeline runs `Reset → Init → JoinNetwork →
/// ConfigureSession → ConnectSession → Subscribe → Running`. Any state may
/// fall into `Error`; `Error` only ever leads back to `Reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityState {
    /// Module is being rebooted.
    #[default]
    Reset,

    /// Baseline module configuration.
    Init,

    /// Joining the access point.
    JoinNetwork,

    /// Writing the broker client configuration.
    ConfigureSession,

    /// Connecting to the broker.
    ConnectSession,

    /// Subscribing to the control topic.
    Subscribe,

    /// Steady state: publishes are serviced and remote commands extracted.
    Running,

    /// Cooling down before a full restart.
    Error,
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            ConnectivityState::Reset => "Reset",
            ConnectivityState::Init => "Init",
            ConnectivityState::JoinNetwork => "JoinNetwork",
            ConnectivityState::ConfigureSession => "ConfigureSession",
            ConnectivityState::ConnectSession => "ConnectSession",
            ConnectivityState::Subscribe => "Subscribe",
            ConnectivityState::Running => "Running",
            ConnectivityState::Error => "Error",
        };
        write!(f, "{}", state_str)
    }
}

impl ConnectivityState {
    /// Bring-up states in pipeline order.
    pub const BRING_UP: [ConnectivityState; 6] = [
        ConnectivityState::Reset,
        ConnectivityState::Init,
        ConnectivityState::JoinNetwork,
        ConnectivityState::ConfigureSession,
        ConnectivityState::ConnectSession,
        ConnectivityState::Subscribe,
    ];

    /// State entered when the command issued in this state matches.
    ///
    /// Returns `None` for `Running` (stays put) and `Error` (left only by
    /// cooldown).
    ///
    /// # Examples
    ///
    /// ```
    /// use seatlink_core::ConnectivityState;
    ///
    /// assert_eq!(ConnectivityState::Reset.on_match(), Some(ConnectivityState::Init));
    /// assert_eq!(ConnectivityState::Subscribe.on_match(), Some(ConnectivityState::Running));
    /// assert_eq!(ConnectivityState::Running.on_match(), None);
    /// ```
    #[must_use]
    pub fn on_match(&self) -> Option<ConnectivityState> {
        match self {
            ConnectivityState::Reset => Some(ConnectivityState::Init),
            ConnectivityState::Init => Some(ConnectivityState::JoinNetwork),
            ConnectivityState::JoinNetwork => Some(ConnectivityState::ConfigureSession),
            ConnectivityState::ConfigureSession => Some(ConnectivityState::ConnectSession),
            ConnectivityState::ConnectSession => Some(ConnectivityState::Subscribe),
            ConnectivityState::Subscribe => Some(ConnectivityState::Running),
            ConnectivityState::Running | ConnectivityState::Error => None,
        }
    }

    /// Check if a transition to `target` is allowed from this state.
    ///
    /// Forward moves follow [`on_match`](Self::on_match); every state except
    /// `Error` itself may fall into `Error`; `Error` and `Running` may
    /// restart at `Reset` (cooldown expiry and forced restart respectively).
    /// Any bring-up state may also be restarted.
    pub fn can_transition_to(&self, target: &ConnectivityState) -> bool {
        if *target == ConnectivityState::Error {
            return *self != ConnectivityState::Error;
        }
        if *target == ConnectivityState::Reset {
            return true;
        }
        self.on_match() == Some(*target)
    }

    /// True while the pipeline is between `Init` and `Subscribe` inclusive.
    ///
    /// Used for the three-level connectivity icon: down, bringing up, running.
    pub fn is_bringing_up(&self) -> bool {
        matches!(
            self,
            ConnectivityState::Init
                | ConnectivityState::JoinNetwork
                | ConnectivityState::ConfigureSession
                | ConnectivityState::ConnectSession
                | ConnectivityState::Subscribe
        )
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ConnectivityState::Running)
    }
}

/// A message waiting to be published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub topic: String,
    pub payload: String,
}

impl PublishRequest {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}
