//! Single-slot publish queue.
//!
//! At most one request waits and at most one is in flight. A new request for
//! the topic already waiting replaces it; a request for any other topic is
//! refused until the queue drains. The in-flight request counts as pending
//! for that check, so a state heartbeat can never overtake a card request
//! that is still being sent.

use seatlink_core::{ConnectivityState, Error, PublishRequest, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishQueue {
    waiting: Option<PublishRequest>,
    in_flight: Option<PublishRequest>,
}

impl PublishQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer `request` while the session is in `state`.
    ///
    /// # Errors
    ///
    /// - [`Error::NotRunning`] outside `Running`.
    /// - [`Error::BusyRejection`] while a request for another topic is
    ///   waiting or in flight.
    pub fn enqueue(&mut self, request: PublishRequest, state: ConnectivityState) -> Result<()> {
        if !state.is_running() {
            return Err(Error::NotRunning { state });
        }
        if let Some(pending) = self.pending_topic()
            && pending != request.topic
        {
            return Err(Error::BusyRejection {
                pending_topic: pending.to_string(),
            });
        }

        self.waiting = Some(request);
        Ok(())
    }

    /// Move the waiting request in flight and return it, unless one is
    /// already in flight.
    pub fn start_next(&mut self) -> Option<&PublishRequest> {
        if self.in_flight.is_some() {
            return None;
        }
        self.in_flight = Some(self.waiting.take()?);
        self.in_flight.as_ref()
    }

    /// Retire the in-flight request.
    pub fn complete(&mut self) -> Option<PublishRequest> {
        self.in_flight.take()
    }

    /// Drop everything, waiting and in flight.
    pub fn clear(&mut self) {
        self.waiting = None;
        self.in_flight = None;
    }

    pub fn waiting(&self) -> Option<&PublishRequest> {
        self.waiting.as_ref()
    }

    pub fn in_flight(&self) -> Option<&PublishRequest> {
        self.in_flight.as_ref()
    }

    /// Topic that blocks other topics, if any.
    pub fn pending_topic(&self) -> Option<&str> {
        self.in_flight
            .as_ref()
            .or(self.waiting.as_ref())
            .map(|request| request.topic.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_none() && self.in_flight.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const RUNNING: ConnectivityState = ConnectivityState::Running;

    fn request(topic: &str, payload: &str) -> PublishRequest {
        PublishRequest::new(topic, payload)
    }

    #[rstest]
    #[case(ConnectivityState::Reset)]
    #[case(ConnectivityState::JoinNetwork)]
    #[case(ConnectivityState::Subscribe)]
    #[case(ConnectivityState::Error)]
    fn test_rejected_outside_running(#[case] state: ConnectivityState) {
        let mut queue = PublishQueue::new();
        assert_eq!(
            queue.enqueue(request("a", "1"), state),
            Err(Error::NotRunning { state })
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_same_topic_coalesces() {
        let mut queue = PublishQueue::new();
        queue.enqueue(request("a", "p1"), RUNNING).unwrap();
        queue.enqueue(request("a", "p2"), RUNNING).unwrap();

        assert_eq!(queue.start_next().unwrap().payload, "p2");
        assert!(queue.waiting().is_none());
    }

    #[test]
    fn test_different_topic_rejected_until_drained() {
        let mut queue = PublishQueue::new();
        queue.enqueue(request("a", "p1"), RUNNING).unwrap();

        assert_eq!(
            queue.enqueue(request("b", "p3"), RUNNING),
            Err(Error::BusyRejection {
                pending_topic: "a".to_string()
            })
        );

        queue.start_next();
        assert!(queue.enqueue(request("b", "p3"), RUNNING).is_err());

        queue.complete();
        assert!(queue.enqueue(request("b", "p3"), RUNNING).is_ok());
    }

    #[test]
    fn test_same_topic_waits_behind_in_flight() {
        let mut queue = PublishQueue::new();
        queue.enqueue(request("a", "p1"), RUNNING).unwrap();
        queue.start_next();
        queue.enqueue(request("a", "p2"), RUNNING).unwrap();

        assert!(queue.start_next().is_none());
        assert_eq!(queue.complete().unwrap().payload, "p1");
        assert_eq!(queue.start_next().unwrap().payload, "p2");
    }

    #[test]
    fn test_clear() {
        let mut queue = PublishQueue::new();
        queue.enqueue(request("a", "p1"), RUNNING).unwrap();
        queue.start_next();
        queue.enqueue(request("a", "p2"), RUNNING).unwrap();
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.pending_topic(), None);
    }
}
