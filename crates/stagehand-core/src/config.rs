//! Centralized configuration for the Stagehand core.
//!
//! Compile-time constants live in unit structs grouped by concern. The only
//! runtime-tunable knob is [`ReconnectPolicy`], which callers can override
//! per transport.

use std::time::Duration;

/// Transport-level configuration.
pub struct TransportConfig;

impl TransportConfig {
    /// How long a single connect attempt may take before it is aborted.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
    /// Largest frame accepted on the wire.
    pub const MAX_FRAME_SIZE: usize = 8 * 1024 * 1024;
    /// Outbound write queue depth.
    pub const OUTBOUND_CHANNEL_CAPACITY: usize = 256;
    /// Inbound event queue depth.
    pub const INBOUND_CHANNEL_CAPACITY: usize = 256;
}

/// Correlator configuration.
pub struct CorrelatorConfig;

impl CorrelatorConfig {
    /// Default deadline for a single request.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    /// Capacity of the editor-event broadcast channel. Slow subscribers
    /// that fall further behind than this lose the oldest events.
    pub const EVENT_CHANNEL_CAPACITY: usize = 128;
}

/// Connection registry configuration.
pub struct RegistryConfig;

impl RegistryConfig {
    /// Interval between background health sweeps.
    pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30);
    /// Capacity of the registry's bridge-event broadcast channel.
    pub const EVENT_CHANNEL_CAPACITY: usize = 128;
}

/// Editor process and project layout constants.
pub struct EditorConfig;

impl EditorConfig {
    /// Substring identifying the editor executable in a process table.
    pub const PROCESS_NAME: &'static str = "Unity";
    /// Launch flag whose value is the project path.
    pub const PROJECT_PATH_FLAG: &'static str = "-projectPath";
    /// Subdirectories every well-formed project contains.
    pub const PROJECT_MARKERS: [&'static str; 2] = ["Assets", "ProjectSettings"];
    /// Rendezvous endpoint name prefix.
    pub const ENDPOINT_PREFIX: &'static str = "stagehand";
    /// How deep `discover` walks below the search root.
    pub const DISCOVER_MAX_DEPTH: usize = 3;
}

/// Reconnect timing for a transport that lost its peer.
///
/// The default is exponential backoff. The original bridge retried on a
/// fixed 5-second timer; [`ReconnectPolicy::fixed`] reproduces that.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor applied to the delay after each failed attempt.
    pub multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

impl ReconnectPolicy {
    /// A constant-delay policy (no backoff).
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
        }
    }

    /// Iterator-style state over this policy's delays.
    pub fn backoff(&self) -> Backoff {
        Backoff {
            current: self.initial_delay,
            max: self.max_delay,
            multiplier: self.multiplier,
        }
    }
}

/// Mutable backoff state derived from a [`ReconnectPolicy`].
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
    multiplier: f64,
}

impl Backoff {
    /// Get the next delay and advance.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let next = Duration::from_secs_f64(self.current.as_secs_f64() * self.multiplier);
        self.current = std::cmp::min(next, self.max);
        delay
    }

    /// Reset to the policy's initial delay after a successful reconnect.
    pub fn reset(&mut self, policy: &ReconnectPolicy) {
        self.current = policy.initial_delay;
    }
}

/// Options accepted by `Transport::connect`.
#[derive(Debug, Clone, Copy)]
pub struct TransportOptions {
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout: TransportConfig::CONNECT_TIMEOUT,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_increases_to_cap() {
        let policy = ReconnectPolicy {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            multiplier: 2.0,
        };
        let mut backoff = policy.backoff();

        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4)); // capped
    }

    #[test]
    fn test_fixed_policy_never_grows() {
        let mut backoff = ReconnectPolicy::fixed(Duration::from_secs(5)).backoff();
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_backoff_reset() {
        let policy = ReconnectPolicy::default();
        let mut backoff = policy.backoff();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset(&policy);
        assert_eq!(backoff.next_delay(), policy.initial_delay);
    }

    #[test]
    fn test_timeouts_are_reasonable() {
        assert!(TransportConfig::CONNECT_TIMEOUT > Duration::ZERO);
        assert!(CorrelatorConfig::REQUEST_TIMEOUT > TransportConfig::CONNECT_TIMEOUT);
    }
}
