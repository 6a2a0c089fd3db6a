//! The owned connectivity session.
//!
//! [`SessionManager`] ties the pieces together: it owns the receive buffer,
//! the command matcher, the state machine, the publish queue and the remote
//! command extractor, and exposes exactly one way in for received bytes
//! ([`RxProducer`], handed out once) and one way to make progress
//! ([`poll`](SessionManager::poll), called from the control loop).
//!
//! Nothing in here waits. Every call to `poll` does at most one of: issue a
//! command, judge the outstanding one, or leave `Error` once the cooldown is
//! over. The only blocking operations are the command write itself and the
//! microsecond guard delay after it.
//!
//! # Example
//!
//! ```
//! use seatlink_core::{ConnectivityState, SessionConfig};
//! use seatlink_hardware::mock::{MockClock, MockDelay, MockSerial};
//! use seatlink_session::SessionManager;
//!
//! let clock = MockClock::new();
//! let serial = MockSerial::new();
//! let mut session =
//!     SessionManager::new(SessionConfig::default(), serial.clone(), clock.clone(), MockDelay::new())
//!         .unwrap();
//! let rx = session.take_rx_producer().unwrap();
//!
//! // Settle delay, then the module reset goes out.
//! clock.advance(200);
//! session.poll();
//! assert_eq!(serial.last_line().as_deref(), Some("AT+RST"));
//!
//! for byte in b"\r\nready\r\n" {
//!     rx.append(*byte);
//! }
//! assert_eq!(session.poll(), ConnectivityState::Init);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, warn};

use seatlink_core::constants::{RX_BUFFER_SIZE, RX_NEAR_FULL_MARGIN};
use seatlink_core::{ConnectivityState, Error, PublishRequest, Result, SessionConfig, Topics};
use seatlink_hardware::{Clock, DelayUs, SerialTx};
use seatlink_protocol::{
    CommandMatcher, CommandTable, MatchOutcome, RemoteCommandExtractor, RemoteCommands,
    RxProducer, TransportBuffer, scan,
};

use crate::publish::PublishQueue;
use crate::state_machine::{StateMachine, StateTransition};
use crate::stats::SessionStats;

/// Connectivity session over a serial AT module.
pub struct SessionManager<T, C, D> {
    config: SessionConfig,
    topics: Topics,
    commands: CommandTable,

    buffer: Arc<TransportBuffer>,
    producer: Option<RxProducer>,
    scratch: Vec<u8>,

    matcher: CommandMatcher,
    machine: StateMachine,
    /// The command for the current bring-up state has been written.
    issued: bool,

    queue: PublishQueue,
    sync_publish: Option<PublishRequest>,

    extractor: RemoteCommandExtractor,
    remote: RemoteCommands,

    stats: SessionStats,
    last_error: Option<Error>,

    tx: T,
    clock: C,
    delay: D,
}

impl<T: SerialTx, C: Clock, D: DelayUs> SessionManager<T, C, D> {
    /// Create a session in `Reset`. The settle delay starts now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` fails validation.
    pub fn new(config: SessionConfig, tx: T, clock: C, delay: D) -> Result<Self> {
        config.validate()?;

        let topics = config.topics();
        let commands = CommandTable::from_config(&config);
        let (buffer, producer) = TransportBuffer::with_producer(RX_BUFFER_SIZE);
        let sync_publish = config
            .sync_publish
            .as_ref()
            .map(|sync| PublishRequest::new(topics.sub(&sync.topic), sync.payload.clone()));
        let extractor = RemoteCommandExtractor::new(topics.command());
        let machine = StateMachine::new(clock.now_ms());

        debug!(
            "Session for {} created, control topic {}",
            config.device_id,
            topics.command()
        );

        Ok(Self {
            config,
            topics,
            commands,
            buffer,
            producer: Some(producer),
            scratch: Vec::with_capacity(RX_BUFFER_SIZE),
            matcher: CommandMatcher::new(),
            machine,
            issued: false,
            queue: PublishQueue::new(),
            sync_publish,
            extractor,
            remote: RemoteCommands::default(),
            stats: SessionStats::default(),
            last_error: None,
            tx,
            clock,
            delay,
        })
    }

    /// Hand out the single receive producer. Returns `None` after the first
    /// call.
    pub fn take_rx_producer(&mut self) -> Option<RxProducer> {
        self.producer.take()
    }

    /// Advance the session by one step and return the state afterwards.
    pub fn poll(&mut self) -> ConnectivityState {
        let now = self.clock.now_ms();
        self.account_overflow(now);

        match self.machine.current_state() {
            ConnectivityState::Error => {
                if self.machine.time_in_current_state(now) >= self.config.error_cooldown_ms {
                    info!("Error cooldown over, restarting session");
                    self.enter_reset(now);
                }
            }
            ConnectivityState::Reset
                if !self.issued
                    && self.machine.time_in_current_state(now) < self.config.reset_settle_ms => {}
            ConnectivityState::Running => self.poll_running(now),
            state => self.poll_bring_up(state, now),
        }

        self.machine.current_state()
    }

    /// Offer a message for publishing. Returns `false` if it was refused.
    ///
    /// See [`try_enqueue_publish`](Self::try_enqueue_publish) for the reason.
    pub fn enqueue_publish(&mut self, topic: impl Into<String>, payload: impl Into<String>) -> bool {
        self.try_enqueue_publish(PublishRequest::new(topic, payload))
            .is_ok()
    }

    /// Offer a message for publishing.
    ///
    /// # Errors
    ///
    /// - [`Error::NotRunning`] outside `Running`.
    /// - [`Error::BusyRejection`] while a message for another topic is
    ///   pending.
    pub fn try_enqueue_publish(&mut self, request: PublishRequest) -> Result<()> {
        let state = self.machine.current_state();
        self.queue.enqueue(request, state).inspect_err(|error| {
            debug!("{}", error);
            self.stats.record_error(error);
        })
    }

    /// Stage the message queued every time the session reaches `Running`.
    ///
    /// Replaces any previously staged message.
    pub fn set_sync_publish(&mut self, topic: impl Into<String>, payload: impl Into<String>) {
        self.sync_publish = Some(PublishRequest::new(topic, payload));
    }

    pub fn clear_sync_publish(&mut self) {
        self.sync_publish = None;
    }

    /// Hand the raised remote commands to the caller and clear the bank.
    pub fn take_remote_commands(&mut self) -> RemoteCommands {
        self.remote.take()
    }

    /// Force a full restart from `Reset`, skipping the error cooldown.
    pub fn restart(&mut self) {
        let now = self.clock.now_ms();
        info!(
            "Restart requested in {}",
            self.machine.current_state()
        );
        self.enter_reset(now);
    }

    pub fn state(&self) -> ConnectivityState {
        self.machine.current_state()
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// True between `Init` and `Subscribe`.
    pub fn is_bringing_up(&self) -> bool {
        self.state().is_bringing_up()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn history(&self) -> &VecDeque<StateTransition> {
        self.machine.history()
    }

    /// The failure that caused the most recent `Error`.
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Topic of the publish waiting or in flight, if any.
    pub fn pending_publish_topic(&self) -> Option<&str> {
        self.queue.pending_topic()
    }

    pub fn rx_buffer(&self) -> &TransportBuffer {
        &self.buffer
    }

    fn poll_bring_up(&mut self, state: ConnectivityState, now: u64) {
        if !self.issued {
            let Some(command) = self.commands.for_state(state) else {
                return;
            };
            let result = self.matcher.send(command, &self.buffer, &mut self.tx, now);
            self.after_send(result, now);
            return;
        }

        match self.matcher.poll(&self.buffer, now) {
            MatchOutcome::Pending => {
                if self.buffer.len() >= self.buffer.capacity() {
                    debug!("Receive buffer full during {}, clearing", state);
                    self.buffer.clear();
                }
            }
            MatchOutcome::Idle => self.issued = false,
            MatchOutcome::Matched => self.advance(state, now),
            MatchOutcome::Failed(error) => self.fail(error, now),
        }
    }

    fn poll_running(&mut self, now: u64) {
        if let Some(token) = self.find_link_lost() {
            self.fail(Error::LinkLost { token }, now);
            return;
        }

        let may_clear = !self.matcher.is_pending();
        let handled = self.extractor.scan(&self.buffer, &mut self.remote, may_clear);
        self.stats.remote_commands += handled as u64;

        match self.matcher.poll(&self.buffer, now) {
            MatchOutcome::Pending => {
                // The response has not arrived; make room for it.
                if self.buffer.is_nearly_full(RX_NEAR_FULL_MARGIN) {
                    debug!("Receive buffer nearly full awaiting response, clearing");
                    self.buffer.clear();
                    self.extractor.rewind();
                }
                return;
            }
            MatchOutcome::Idle => {}
            MatchOutcome::Matched => {
                if let Some(request) = self.queue.complete() {
                    debug!("Published to {}", request.topic);
                }
                self.stats.publishes_sent += 1;
            }
            MatchOutcome::Failed(error) => {
                self.fail(error, now);
                return;
            }
        }

        let Some(request) = self.queue.start_next() else {
            return;
        };
        let command = self.commands.publish(request);
        let result = self.matcher.send(&command, &self.buffer, &mut self.tx, now);
        self.after_send(result, now);
    }

    fn after_send(&mut self, result: Result<()>, now: u64) {
        match result {
            Ok(()) => {
                // send() cleared the buffer under the extractor.
                self.extractor.rewind();
                self.issued = true;
                self.delay.delay_us(self.config.tx_guard_us);
            }
            Err(error) => self.fail(error, now),
        }
    }

    fn advance(&mut self, state: ConnectivityState, now: u64) {
        let Some(next) = state.on_match() else {
            return;
        };
        self.issued = false;
        self.change_state(next, now);

        if next.is_running() {
            self.extractor.rewind();
            if let Some(sync) = self.sync_publish.clone() {
                debug!("Queueing sync publish to {}", sync.topic);
                if let Err(error) = self.queue.enqueue(sync, next) {
                    warn!("Sync publish not queued: {}", error);
                }
            }
        }
    }

    /// Record `error`; the escalating kinds send the session to `Error`.
    fn fail(&mut self, error: Error, now: u64) {
        self.stats.record_error(&error);
        if !error.escalates() {
            debug!("Handled locally: {}", error);
            return;
        }

        warn!(
            "Session failed in {}: {}",
            self.machine.current_state(),
            error
        );
        self.matcher.cancel();
        self.issued = false;
        self.last_error = Some(error);
        self.change_state(ConnectivityState::Error, now);
    }

    /// Enter `Reset` with every piece of substate reinitialized.
    fn enter_reset(&mut self, now: u64) {
        self.matcher.cancel();
        self.queue.clear();
        self.buffer.clear();
        self.extractor.rewind();
        self.issued = false;
        self.change_state(ConnectivityState::Reset, now);
    }

    fn change_state(&mut self, target: ConnectivityState, now: u64) {
        match self.machine.transition_to(target, now) {
            Ok(transition) => {
                info!("Session {} -> {}", transition.from, transition.to);
                if transition.is_forward() {
                    self.stats.forward_transitions += 1;
                }
                match transition.to {
                    ConnectivityState::Error => self.stats.error_transitions += 1,
                    ConnectivityState::Reset => self.stats.restarts += 1,
                    _ => {}
                }
            }
            Err(error) => warn!("{}", error),
        }
    }

    fn find_link_lost(&mut self) -> Option<String> {
        self.buffer.snapshot_into(&mut self.scratch);
        self.config
            .link_lost_tokens
            .iter()
            .find(|token| scan::contains(&self.scratch, token.as_bytes()))
            .cloned()
    }

    fn account_overflow(&mut self, now: u64) {
        let dropped = self.buffer.take_dropped();
        if dropped == 0 {
            return;
        }
        warn!("Receive buffer overflowed, {} bytes dropped", dropped);
        self.stats.dropped_bytes += u64::from(dropped);
        let capacity = self.buffer.capacity();
        self.fail(Error::TransportOverflow { capacity }, now);
    }
}
