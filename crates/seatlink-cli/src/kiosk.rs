//! Minimal kiosk model driven by remote commands.
//!
//! The real kiosk has a screen, relays and sensors; on the host the seat
//! is a plain struct that remote commands act on and that is reported once
//! per heartbeat.

use seatlink_protocol::{RemoteCommand, RemoteCommands, SeatState};
use tracing::{info, warn};

/// What the kiosk must do after applying a batch of remote commands.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Followup {
    /// Remote `reset`: restart the session.
    pub restart: bool,
    /// Seat outputs changed; report state now instead of at the next
    /// heartbeat.
    pub publish_state: bool,
}

#[derive(Debug, Default, Clone)]
pub struct Seat {
    pub state: SeatState,
    pub maintenance: bool,
    pub user_name: Option<String>,
    pub price_per_min: u32,
}

impl Seat {
    pub fn new(price_per_min: u32) -> Self {
        Self {
            price_per_min,
            ..Self::default()
        }
    }

    /// Apply one batch taken from the session's flag bank.
    pub fn apply(&mut self, commands: &RemoteCommands) -> Followup {
        let mut followup = Followup::default();

        for command in commands.iter() {
            info!("Remote command: {}", command);
            match command {
                RemoteCommand::Reset => {
                    *self = Seat::new(self.price_per_min);
                    followup.restart = true;
                    // Restart supersedes the rest of the batch.
                    return followup;
                }
                RemoteCommand::MaintOn => {
                    self.maintenance = true;
                    self.state.alarm = false;
                }
                RemoteCommand::MaintOff => self.maintenance = false,
                RemoteCommand::PcOn | RemoteCommand::PcOff => {
                    self.state.pc_on = command == RemoteCommand::PcOn;
                    followup.publish_state = true;
                }
                RemoteCommand::LightOn | RemoteCommand::LightOff => {
                    self.state.light_on = command == RemoteCommand::LightOn;
                    followup.publish_state = true;
                }
                RemoteCommand::Checkout => {
                    if self.state.in_use {
                        self.end_session();
                    }
                }
                RemoteCommand::CardOk => self.check_in(commands),
                RemoteCommand::CardErr => {
                    warn!(
                        "Card refused: {}",
                        commands.error_text().unwrap_or("no reason given")
                    );
                }
                RemoteCommand::Message => {
                    info!("Server message: {}", commands.message().unwrap_or_default());
                }
            }
        }

        followup
    }

    fn check_in(&mut self, commands: &RemoteCommands) {
        self.state.session_secs = commands.restore_secs().unwrap_or(0);
        self.user_name = commands.user_name().map(str::to_string);
        if !self.state.in_use {
            self.state.in_use = true;
            self.state.pc_on = true;
            self.state.light_on = true;
        }
        info!(
            "Checked in {} (balance {}, {}s restored)",
            self.user_name.as_deref().unwrap_or("unknown user"),
            commands.balance().unwrap_or("?"),
            self.state.session_secs
        );
    }

    fn end_session(&mut self) {
        info!(
            "Session ended after {}s, fee {}",
            self.state.session_secs, self.state.fee
        );
        let maintenance = self.maintenance;
        *self = Seat::new(self.price_per_min);
        self.maintenance = maintenance;
    }

    /// One second of wall time passed.
    pub fn tick_second(&mut self) {
        if self.state.in_use {
            self.state.session_secs = self.state.session_secs.saturating_add(1);
            self.state.fee = SeatState::fee_for(self.state.session_secs, self.price_per_min);
        }
    }
}
