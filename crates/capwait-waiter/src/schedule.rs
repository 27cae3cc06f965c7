//! Poll scheduling.
//!
//! The first poll happens immediately. After each unsatisfied poll the
//! waiter sleeps for the next backoff delay, clamped to the time left
//! before the deadline.

use std::time::Duration;

use capwait_core::{ConfigError, ConfigResult, PollConfig, PollStrategy};

const DEFAULT_INITIAL: Duration = Duration::from_millis(500);
const DEFAULT_MAX: Duration = Duration::from_secs(10);

/// How long to wait between polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPolicy {
    /// Start at `initial` and double after every poll, capped at `max`.
    Exponential { initial: Duration, max: Duration },
    /// Constant interval.
    Fixed(Duration),
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy::Exponential {
            initial: DEFAULT_INITIAL,
            max: DEFAULT_MAX,
        }
    }
}

impl PollPolicy {
    pub fn from_config(config: &PollConfig) -> ConfigResult<Self> {
        let initial = config.initial_interval()?;
        if initial.is_zero() {
            return Err(ConfigError::Poll(
                "initial_interval must be greater than zero".to_string(),
            ));
        }

        match config.strategy() {
            PollStrategy::Fixed => Ok(PollPolicy::Fixed(initial)),
            PollStrategy::Exponential => {
                let max = config.max_interval()?;
                if max < initial {
                    return Err(ConfigError::Poll(format!(
                        "max_interval ({max:?}) is shorter than initial_interval ({initial:?})"
                    )));
                }
                Ok(PollPolicy::Exponential { initial, max })
            }
        }
    }

    /// Fresh backoff state for one wait.
    pub fn backoff(&self) -> Backoff {
        match *self {
            PollPolicy::Exponential { initial, max } => Backoff {
                current: initial,
                max,
                multiplier: 2,
            },
            PollPolicy::Fixed(interval) => Backoff {
                current: interval,
                max: interval,
                multiplier: 1,
            },
        }
    }
}

/// Backoff state carried across polls of a single wait.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
    multiplier: u32,
}

impl Backoff {
    /// Delay before the next poll; advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self
            .current
            .saturating_mul(self.multiplier)
            .min(self.max);
        delay
    }

    /// Next delay, never past `remaining`.
    pub fn next_delay_within(&mut self, remaining: Duration) -> Duration {
        self.next_delay().min(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_exponential_half_second_to_ten() {
        let mut backoff = PollPolicy::default().backoff();
        let delays: Vec<_> = (0..8).map(|_| backoff.next_delay().as_millis()).collect();
        // 0.5 → 1 → 2 → 4 → 8 → 10 (capped) → 10 → 10
        assert_eq!(delays, vec![500, 1000, 2000, 4000, 8000, 10_000, 10_000, 10_000]);
    }

    #[test]
    fn fixed_never_changes() {
        let mut backoff = PollPolicy::Fixed(Duration::from_secs(3)).backoff();
        for _ in 0..5 {
            assert_eq!(backoff.next_delay(), Duration::from_secs(3));
        }
    }

    #[test]
    fn delay_is_clamped_to_remaining() {
        let mut backoff = PollPolicy::Fixed(Duration::from_secs(5)).backoff();
        assert_eq!(
            backoff.next_delay_within(Duration::from_secs(2)),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn from_config_defaults() {
        let policy = PollPolicy::from_config(&PollConfig::default()).unwrap();
        assert_eq!(policy, PollPolicy::default());
    }

    #[test]
    fn from_config_fixed() {
        let config = PollConfig {
            strategy: Some(PollStrategy::Fixed),
            initial_interval: Some("2s".to_string()),
            max_interval: None,
        };
        assert_eq!(
            PollPolicy::from_config(&config).unwrap(),
            PollPolicy::Fixed(Duration::from_secs(2))
        );
    }

    #[test]
    fn from_config_rejects_inverted_bounds() {
        let config = PollConfig {
            strategy: None,
            initial_interval: Some("30s".to_string()),
            max_interval: Some("5s".to_string()),
        };
        assert!(matches!(
            PollPolicy::from_config(&config),
            Err(ConfigError::Poll(_))
        ));
    }

    #[test]
    fn from_config_rejects_zero_interval() {
        let config = PollConfig {
            initial_interval: Some("0s".to_string()),
            ..Default::default()
        };
        assert!(PollPolicy::from_config(&config).is_err());
    }
}
