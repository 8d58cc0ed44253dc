//! Bounded polling for page elements that appear asynchronously

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often and how long to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Delay between probes
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Probes before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_interval_ms() -> u64 {
    200
}

fn default_max_attempts() -> u32 {
    50
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl PollPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Probe until `probe` yields a value or the attempts run out
///
/// The first probe happens immediately; later ones are spaced by the policy
/// interval. Returns `None` when the element never showed up.
pub async fn wait_for<T, F>(policy: PollPolicy, mut probe: F) -> Option<T>
where
    F: FnMut() -> Option<T>,
{
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        if let Some(found) = probe() {
            return Some(found);
        }
        if attempt < attempts {
            tokio::time::sleep(policy.interval()).await;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_found_after_a_few_attempts() {
        let policy = PollPolicy {
            interval_ms: 1,
            max_attempts: 10,
        };
        let mut calls = 0;
        let found = wait_for(policy, || {
            calls += 1;
            (calls == 3).then_some("ready")
        })
        .await;

        assert_eq!(found, Some("ready"));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_gives_up() {
        let policy = PollPolicy {
            interval_ms: 1,
            max_attempts: 4,
        };
        let mut calls = 0;
        let found: Option<()> = wait_for(policy, || {
            calls += 1;
            None
        })
        .await;

        assert!(found.is_none());
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_policy_defaults_from_partial_json() {
        let policy: PollPolicy = serde_json::from_str(r#"{"max_attempts": 3}"#).unwrap();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.interval_ms, 200);
    }
}
