//! Client configuration and the reconnect backoff policy.

use std::time::Duration;

use clearline_types::{Allowance, ChainId};
use rand::Rng;

/// Bounded, non-decreasing reconnect delay sequence. Once the sequence is
/// exhausted, further attempts repeat the final (capped) delay.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub delays: Vec<Duration>,
    pub jitter_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delays: [1, 2, 4, 8, 16, 30]
                .into_iter()
                .map(Duration::from_secs)
                .collect(),
            jitter_ms: 250,
        }
    }
}

/// One reconnect run. The attempt counter lives here so it resets exactly
/// when a schedule is retired by a successful reconnect.
#[derive(Debug)]
pub struct ReconnectSchedule {
    policy: ReconnectPolicy,
    attempt: u32,
}

impl ReconnectSchedule {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn next_delay(&mut self) -> Duration {
        let index = (self.attempt as usize).min(self.policy.delays.len().saturating_sub(1));
        let base = self
            .policy
            .delays
            .get(index)
            .copied()
            .unwrap_or(Duration::from_secs(1));
        self.attempt += 1;
        base + jitter(self.policy.jitter_ms)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

fn jitter(jitter_ms: u64) -> Duration {
    if jitter_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
}

/// Handshake parameters supplied to the authority.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub scope: String,
    pub application_id: String,
    pub allowances: Vec<Allowance>,
    pub session_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            scope: "trading".to_string(),
            application_id: "clearline".to_string(),
            allowances: Vec::new(),
            session_ttl: Duration::from_secs(3600),
        }
    }
}

/// Size limits for registry caches.
#[derive(Debug, Clone, Copy)]
pub struct RegistryLimits {
    pub max_closed_sessions: usize,
}

impl Default for RegistryLimits {
    fn default() -> Self {
        Self {
            max_closed_sessions: 256,
        }
    }
}

/// Startup configuration for one client instance. The endpoint URL, chain id
/// and environment tag are opaque to this library.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: String,
    pub chain_id: ChainId,
    pub environment: String,
    pub request_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub reconnect: ReconnectPolicy,
    pub auth: AuthConfig,
    pub limits: RegistryLimits,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:7824/ws".to_string(),
            chain_id: 1337,
            environment: "local".to_string(),
            request_timeout: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(15),
            reconnect: ReconnectPolicy::default(),
            auth: AuthConfig::default(),
            limits: RegistryLimits::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{ReconnectPolicy, ReconnectSchedule};

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy {
            delays: [1, 2, 4, 8, 16, 30]
                .into_iter()
                .map(Duration::from_secs)
                .collect(),
            jitter_ms: 0,
        }
    }

    #[test]
    fn delays_are_non_decreasing_and_capped() {
        let mut schedule = ReconnectSchedule::new(policy());
        let mut previous = Duration::ZERO;
        for _ in 0..10 {
            let delay = schedule.next_delay();
            assert!(delay >= previous);
            assert!(delay <= Duration::from_secs(30));
            previous = delay;
        }
        // Past the end of the sequence the cap repeats.
        assert_eq!(previous, Duration::from_secs(30));
    }

    #[test]
    fn reset_returns_to_the_first_delay() {
        let mut schedule = ReconnectSchedule::new(policy());
        assert_eq!(schedule.next_delay(), Duration::from_secs(1));
        assert_eq!(schedule.next_delay(), Duration::from_secs(2));
        assert_eq!(schedule.attempt(), 2);

        schedule.reset();
        assert_eq!(schedule.attempt(), 0);
        assert_eq!(schedule.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn jitter_stays_within_bound() {
        let mut schedule = ReconnectSchedule::new(ReconnectPolicy {
            delays: vec![Duration::from_secs(1)],
            jitter_ms: 100,
        });
        for _ in 0..20 {
            let delay = schedule.next_delay();
            assert!(delay >= Duration::from_secs(1));
            assert!(delay <= Duration::from_secs(1) + Duration::from_millis(100));
        }
    }
}
