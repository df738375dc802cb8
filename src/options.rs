//! Client configuration.

use std::time::Duration;

/// Default client-wide request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default TLS handshake timeout.
pub const DEFAULT_TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default TCP connect timeout.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of retries after the first failed attempt.
pub const DEFAULT_MAX_TRIES: u32 = 1;

/// Options a [`WebClient`](crate::WebClient) is built from.
///
/// The client keeps its own copy, so changing a value after construction
/// has no effect on an existing client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Absolute timeout for a single request, from connect to the end of the body.
    pub timeout: Duration,
    /// Time allowed for the TLS handshake.
    pub tls_handshake_timeout: Duration,
    /// Time allowed to establish the TCP connection.
    pub dial_timeout: Duration,
    /// Retries after the first failed attempt. `0` disables retrying.
    pub max_tries: u32,
    /// Log every fetch at info level instead of debug.
    pub verbose: bool,
    /// Pause between attempts. Falls back to `timeout` when unset.
    pub retry_delay: Option<Duration>,
}

impl ClientOptions {
    /// Delay slept between two attempts of the same fetch.
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay.unwrap_or(self.timeout)
    }

    /// Budget for the whole connect phase.
    ///
    /// The transport wraps TCP connect and TLS handshake in one timer, so the
    /// two budgets are added together.
    pub fn connect_timeout(&self) -> Duration {
        self.dial_timeout.saturating_add(self.tls_handshake_timeout)
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            tls_handshake_timeout: DEFAULT_TLS_HANDSHAKE_TIMEOUT,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            max_tries: DEFAULT_MAX_TRIES,
            verbose: false,
            retry_delay: None,
        }
    }
}
