//! Per-venue connection state machine
//!
//! ```text
//! DISCONNECTED ──► CONNECTING ──► CONNECTED
//!                      ▲              │ drop
//!                      │              ▼
//!                      └──────── RECONNECTING ──(attempts > max)──► FAILED
//! ```
//!
//! `FAILED` is terminal until an explicit `restart`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection state of a venue stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Reconnecting => "RECONNECTING",
            ConnectionState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Fixed-interval reconnect policy with a bounded number of attempts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Delay between reconnection attempts in milliseconds
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    /// Maximum number of reconnection attempts
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

impl ReconnectPolicy {
    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            reconnect_delay_ms: delay.as_millis() as u64,
            max_reconnect_attempts: max_attempts,
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

fn default_reconnect_delay() -> u64 {
    5000
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

/// What to do after a connection drop or a failed connect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Wait, then call `begin_connect` again
    RetryAfter(Duration),
    /// Attempts exhausted; the tracker is now `Failed`
    Exhausted,
}

/// Illegal use of a tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Cannot connect from state {0}")]
pub struct ConnectRefused(pub ConnectionState);

/// Tracks state and reconnect attempts for one venue
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    policy: ReconnectPolicy,
    state: ConnectionState,
    attempts: u32,
}

impl ConnectionTracker {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: ConnectionState::Disconnected,
            attempts: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reconnect attempts made since the last successful connect
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Enter `Connecting`. Refused while `Failed` or already connecting/connected.
    pub fn begin_connect(&mut self) -> Result<(), ConnectRefused> {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Reconnecting => {
                self.state = ConnectionState::Connecting;
                Ok(())
            }
            other => Err(ConnectRefused(other)),
        }
    }

    /// Connect succeeded; resets the attempt counter
    pub fn connected(&mut self) {
        self.state = ConnectionState::Connected;
        self.attempts = 0;
    }

    /// The connection dropped, or a connect attempt failed
    pub fn connection_lost(&mut self) -> ReconnectDecision {
        if self.state == ConnectionState::Failed {
            return ReconnectDecision::Exhausted;
        }
        if self.attempts >= self.policy.max_reconnect_attempts {
            self.state = ConnectionState::Failed;
            return ReconnectDecision::Exhausted;
        }
        self.attempts += 1;
        self.state = ConnectionState::Reconnecting;
        ReconnectDecision::RetryAfter(self.policy.reconnect_delay())
    }

    /// Orderly shutdown
    pub fn disconnect(&mut self) {
        if self.state != ConnectionState::Failed {
            self.state = ConnectionState::Disconnected;
        }
    }

    /// Leave any state (including `Failed`) and start over
    pub fn restart(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.attempts = 0;
    }
}
