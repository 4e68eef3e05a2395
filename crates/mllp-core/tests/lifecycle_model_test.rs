//! Model-based property tests for the session lifecycle.
//!
//! proptest generates event sequences; a driver executes the returned
//! actions the way the client runtime does, tracking the handle and the
//! armed timer, and checks after every step:
//! - at most one reconnect timer is ever armed
//! - cancellations name the armed timer
//! - a handle is never opened over another or closed twice
//! - `is_connected` means handle attached and no timer armed
//! - `Stopped` is absorbing

use mllp_core::{
    ClientError, ErrorReason, Session, SessionAction, SessionConfig, SessionState,
    backoff::TimerToken,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Event {
    ForceReconnect,
    FireTimer,
    SendFailed,
    ReceiveFailed,
    Stop,
}

fn event() -> impl Strategy<Value = Event> {
    prop_oneof![
        2 => Just(Event::ForceReconnect),
        4 => Just(Event::FireTimer),
        3 => Just(Event::SendFailed),
        3 => Just(Event::ReceiveFailed),
        1 => Just(Event::Stop),
    ]
}

/// Runtime-side view of the session's resources.
struct Driver {
    session: Session,
    outcomes: Vec<bool>,
    next_outcome: usize,
    handle: bool,
    armed: Option<TimerToken>,
}

impl Driver {
    fn new(config: SessionConfig, outcomes: Vec<bool>) -> Self {
        Self {
            session: Session::new(config),
            outcomes,
            next_outcome: 0,
            handle: false,
            armed: None,
        }
    }

    fn connect_succeeds(&mut self) -> bool {
        let ok = self.outcomes[self.next_outcome % self.outcomes.len()];
        self.next_outcome += 1;
        ok
    }

    fn execute(&mut self, actions: Vec<SessionAction>) -> Result<(), TestCaseError> {
        let mut queue: std::collections::VecDeque<_> = actions.into();

        while let Some(action) = queue.pop_front() {
            match action {
                SessionAction::Connect => {
                    prop_assert!(!self.handle, "connect over an attached handle");
                    let follow_up = if self.connect_succeeds() {
                        self.handle = true;
                        self.session.connect_succeeded()
                    } else {
                        self.session.connect_failed(ErrorReason::Timeout)
                    };
                    for action in follow_up.into_iter().rev() {
                        queue.push_front(action);
                    }
                },
                SessionAction::CloseTransport => {
                    prop_assert!(self.handle, "close without a handle");
                    self.handle = false;
                },
                SessionAction::ScheduleReconnect { token, .. } => {
                    prop_assert!(self.armed.is_none(), "second timer armed");
                    self.armed = Some(token);
                },
                SessionAction::CancelReconnect { token } => {
                    prop_assert_eq!(self.armed.take(), Some(token));
                },
                SessionAction::Notify(_) => {},
            }
        }
        Ok(())
    }

    fn apply(&mut self, event: &Event) -> Result<(), TestCaseError> {
        let actions = match event {
            Event::ForceReconnect => self.session.force_reconnect(),
            Event::FireTimer => match self.armed.take() {
                Some(token) => self.session.timer_fired(token),
                None => Vec::new(),
            },
            Event::SendFailed if self.handle => {
                self.session.send_failed(&ClientError::send(ErrorReason::Closed))
            },
            Event::ReceiveFailed if self.handle => {
                self.session.receive_failed(&ClientError::receive(ErrorReason::Timeout))
            },
            Event::SendFailed | Event::ReceiveFailed => Vec::new(),
            Event::Stop => self.session.stop(),
        };
        self.execute(actions)
    }

    fn check(&self) -> Result<(), TestCaseError> {
        prop_assert_eq!(self.session.is_connected(), self.handle && self.armed.is_none());
        prop_assert_eq!(self.session.reconnect().pending(), self.armed);
        prop_assert_eq!(self.session.state() == SessionState::Connected, self.handle);
        if self.session.state() == SessionState::Stopped {
            prop_assert!(!self.handle && self.armed.is_none());
        }
        Ok(())
    }
}

proptest! {
    #[test]
    fn lifecycle_invariants_hold(
        close_on_recv_error in any::<bool>(),
        use_backoff in any::<bool>(),
        outcomes in prop::collection::vec(any::<bool>(), 1..8),
        events in prop::collection::vec(event(), 0..60),
    ) {
        let config = SessionConfig { close_on_recv_error, use_backoff, ..SessionConfig::default() };
        let mut driver = Driver::new(config, outcomes);

        let actions = driver.session.start();
        driver.execute(actions)?;
        driver.check()?;

        let mut stopped = false;
        for event in &events {
            driver.apply(event)?;
            driver.check()?;

            if stopped {
                prop_assert_eq!(driver.session.state(), SessionState::Stopped);
            }
            stopped |= matches!(event, Event::Stop);
        }
    }
}
