use std::time::Duration;

use crate::retry::Attempts;

/// Runtime tunables for an endpoint.
///
/// The defaults are the RFC 7252 transmission parameters; tests and
/// constrained deployments shrink `ack_timeout` to taste.
///
/// ```
/// use croak::config::Config;
/// use croak::retry::Attempts;
/// use std::time::Duration;
///
/// assert_eq!(Config::default().ack_timeout, Duration::from_secs(2));
/// assert_eq!(Config::default().ack_random_factor, 1.5);
/// assert_eq!(Config::default().max_retransmits, Attempts(4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
  /// Base timeout for the first retransmission of an unacked
  /// confirmable message, and the period the queue poller wakes at.
  ///
  /// `ACK_TIMEOUT` in RFC 7252 terms; defaults to 2 seconds.
  pub ack_timeout: Duration,

  /// Multiplier applied to every per-attempt timeout.
  ///
  /// `ACK_RANDOM_FACTOR` in RFC 7252 terms; defaults to 1.5.
  pub ack_random_factor: f64,

  /// Number of times an unacked confirmable message is retransmitted
  /// before it is surfaced as undelivered.
  ///
  /// `MAX_RETRANSMIT` in RFC 7252 terms; defaults to 4.
  pub max_retransmits: Attempts,

  /// How long the receive loop sleeps after finding the socket empty.
  pub poll_interval: Duration,

  /// The worst one-way network latency this endpoint plans for.
  ///
  /// `MAX_LATENCY` in RFC 7252 terms; defaults to 100 seconds.
  pub max_latency: Duration,

  /// How long a peer is expected to take turning a request around.
  pub expected_processing_delay: Duration,
}

impl Default for Config {
  fn default() -> Self {
    Config { ack_timeout: Duration::from_secs(2),
             ack_random_factor: 1.5,
             max_retransmits: Attempts(4),
             poll_interval: Duration::from_millis(10),
             max_latency: Duration::from_secs(100),
             expected_processing_delay: Duration::from_secs(2) }
  }
}

impl Config {
  /// The longest an endpoint will spend transmitting one confirmable
  /// message, from first send to last retransmission.
  ///
  /// `ack_timeout × (2^max_retransmits − 1) × ack_random_factor`;
  /// `MAX_TRANSMIT_SPAN` in RFC 7252 terms.
  pub fn max_transmit_span(&self) -> Duration {
    let spread = 2u32.pow(self.max_retransmits.0 as u32) - 1;
    self.ack_timeout
        .mul_f64(spread as f64 * self.ack_random_factor)
  }

  /// How long a message ID must stay out of circulation after its
  /// exchange completes.
  ///
  /// `max_transmit_span + expected_processing_delay + 2 × max_latency`;
  /// `EXCHANGE_LIFETIME` in RFC 7252 terms.
  pub fn exchange_lifetime(&self) -> Duration {
    self.max_transmit_span() + self.expected_processing_delay + self.max_latency * 2
  }

  /// Lifetime of a non-confirmable message ID.
  ///
  /// `max_transmit_span + max_latency`; `NON_LIFETIME` in RFC 7252
  /// terms.
  pub fn non_lifetime(&self) -> Duration {
    self.max_transmit_span() + self.max_latency
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rfc_7252_defaults() {
    let cfg = Config::default();

    // 2 × (2^4 − 1) × 1.5 = 45s
    assert_eq!(cfg.max_transmit_span(), Duration::from_secs(45));
    // 45 + 2 + 200 = 247s
    assert_eq!(cfg.exchange_lifetime(), Duration::from_secs(247));
    // 45 + 100 = 145s
    assert_eq!(cfg.non_lifetime(), Duration::from_secs(145));
  }
}
