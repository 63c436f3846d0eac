//! Backoff schedule for unacknowledged confirmable messages.

use std::time::Duration;

/// A number of (re)transmission attempts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attempts(pub u16);

/// The per-attempt timeout schedule for one confirmable message.
///
/// Attempt `n` waits `base × 2^n × factor` before giving the message up
/// for lost and retransmitting:
///
/// ```
/// use croak::retry::Backoff;
/// use std::time::Duration;
///
/// let backoff = Backoff { base: Duration::from_secs(2),
///                         factor: 1.5 };
///
/// assert_eq!(backoff.per_attempt_timeout(0), Duration::from_secs(3));
/// assert_eq!(backoff.per_attempt_timeout(1), Duration::from_secs(6));
/// assert_eq!(backoff.per_attempt_timeout(2), Duration::from_secs(12));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
  /// Timeout before the schedule starts doubling (`ACK_TIMEOUT`)
  pub base: Duration,
  /// Multiplier applied to every timeout (`ACK_RANDOM_FACTOR`)
  pub factor: f64,
}

impl Backoff {
  /// The timeout for attempt `n` (0 being the initial transmission)
  pub fn per_attempt_timeout(&self, attempt: u16) -> Duration {
    self.base
        .mul_f64(2u32.pow(attempt as u32) as f64 * self.factor)
  }
}

impl From<&crate::config::Config> for Backoff {
  fn from(cfg: &crate::config::Config) -> Backoff {
    Backoff { base: cfg.ack_timeout,
              factor: cfg.ack_random_factor }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn schedule_doubles() {
    let backoff = Backoff { base: Duration::from_millis(100),
                            factor: 1.5 };

    let timeouts = (0..4).map(|n| backoff.per_attempt_timeout(n))
                         .collect::<Vec<_>>();

    assert_eq!(timeouts,
               vec![Duration::from_millis(150),
                    Duration::from_millis(300),
                    Duration::from_millis(600),
                    Duration::from_millis(1200)]);
  }

  #[test]
  fn factor_of_one_is_bare_exponential() {
    let backoff = Backoff { base: Duration::from_secs(1),
                            factor: 1.0 };

    assert_eq!(backoff.per_attempt_timeout(3), Duration::from_secs(8));
  }
}
