use std::fmt;
use std::time::Duration;

pub const BACKOFF_FLOOR: Duration = Duration::from_secs(5);
pub const BACKOFF_CEILING: Duration = Duration::from_secs(60);
pub const BACKOFF_MULTIPLIER: f64 = 1.5;

/// Fixed wait after an invalid-endpoint error; retrying sooner cannot help.
pub const INVALID_ENDPOINT_WAIT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Multiplicative reconnect backoff with a ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    multiplier: f64,
    current: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BACKOFF_FLOOR, BACKOFF_CEILING, BACKOFF_MULTIPLIER)
    }
}

impl Backoff {
    pub fn new(floor: Duration, ceiling: Duration, multiplier: f64) -> Self {
        Self {
            floor,
            ceiling,
            multiplier,
            current: floor,
        }
    }

    /// Wait to apply now, advancing the schedule for the next failure.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.mul_f64(self.multiplier).min(self.ceiling);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.floor;
    }

    /// Wait applied after `prior_failures` earlier consecutive failures:
    /// `min(floor * multiplier^prior_failures, ceiling)`.
    pub fn delay_for(&self, prior_failures: u32) -> Duration {
        let factor = self.multiplier.powi(prior_failures.min(i32::MAX as u32) as i32);
        let secs = (self.floor.as_secs_f64() * factor).min(self.ceiling.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

// ---------------------------------------------------------------------------
// Connection state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Disconnected,
    Connecting,
    Subscribed,
    Receiving,
    ReconnectWait(Duration),
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerState::Disconnected => write!(f, "DISCONNECTED"),
            ListenerState::Connecting => write!(f, "CONNECTING"),
            ListenerState::Subscribed => write!(f, "SUBSCRIBED"),
            ListenerState::Receiving => write!(f, "RECEIVING"),
            ListenerState::ReconnectWait(d) => write!(f, "RECONNECT_WAIT({:.2}s)", d.as_secs_f64()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailure {
    Transient,
    InvalidEndpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerEvent {
    Start,
    Connected,
    ConnectFailed(ConnectFailure),
    /// Subscription sent, or sending failed; both move on to receiving.
    SubscriptionAttempted,
    MessageReceived,
    IdleTimeout,
    ConnectionClosed,
    WaitElapsed,
}

/// Upstream connection lifecycle.
///
/// ```text
/// DISCONNECTED --Start--> CONNECTING --Connected--> SUBSCRIBED --SubscriptionAttempted--> RECEIVING
///      CONNECTING --ConnectFailed--> RECONNECT_WAIT --WaitElapsed--> CONNECTING
///      SUBSCRIBED | RECEIVING --ConnectionClosed--> RECONNECT_WAIT
///      RECEIVING --MessageReceived | IdleTimeout--> RECEIVING
/// ```
///
/// Entering SUBSCRIBED resets the backoff. There is no terminal state.
#[derive(Debug, Clone)]
pub struct ConnectionFsm {
    state: ListenerState,
    backoff: Backoff,
}

impl Default for ConnectionFsm {
    fn default() -> Self {
        Self::new(Backoff::default())
    }
}

impl ConnectionFsm {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            state: ListenerState::Disconnected,
            backoff,
        }
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    /// Apply `event`; events that do not apply to the current state leave it
    /// unchanged.
    pub fn handle(&mut self, event: ListenerEvent) -> ListenerState {
        use ListenerEvent as E;
        use ListenerState as S;

        let next = match (self.state, event) {
            (S::Disconnected, E::Start) => S::Connecting,
            (S::Connecting, E::Connected) => {
                self.backoff.reset();
                S::Subscribed
            }
            (S::Connecting, E::ConnectFailed(ConnectFailure::Transient)) => {
                S::ReconnectWait(self.backoff.next_delay())
            }
            (S::Connecting, E::ConnectFailed(ConnectFailure::InvalidEndpoint)) => {
                S::ReconnectWait(INVALID_ENDPOINT_WAIT)
            }
            (S::Subscribed, E::SubscriptionAttempted) => S::Receiving,
            (S::Receiving, E::MessageReceived | E::IdleTimeout) => S::Receiving,
            (S::Subscribed | S::Receiving, E::ConnectionClosed) => {
                S::ReconnectWait(self.backoff.next_delay())
            }
            (S::ReconnectWait(_), E::WaitElapsed) => S::Connecting,
            (state, event) => {
                tracing::debug!(state = %state, event = ?event, "Ignoring event in current state");
                state
            }
        };

        if next != self.state && !matches!(next, S::Receiving) {
            tracing::debug!(from = %self.state, to = %next, "Listener state transition");
        }
        self.state = next;
        next
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
