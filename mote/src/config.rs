use embedded_time::duration::Milliseconds;

use crate::retry::{Attempts, Strategy};
use crate::time::Millis;

/// Configuration options related to outbound CON requests
///
/// Defaults follow the transmission parameters of
/// [RFC7252 section 4.8](https://datatracker.ietf.org/doc/html/rfc7252#section-4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Con {
  /// Retry strategy for CON requests that
  /// have not yet been ACKed.
  ///
  /// The initial timeout is chosen randomly between `init_min` (ACK_TIMEOUT)
  /// and `init_max` (ACK_TIMEOUT * ACK_RANDOM_FACTOR), and doubles after
  /// every retransmission.
  ///
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use mote::config::Con;
  /// use mote::retry::Strategy;
  ///
  /// assert_eq!(Con::default().unacked_retry_strategy,
  ///            Strategy::Exponential { init_min: Milliseconds(2_000),
  ///                                    init_max: Milliseconds(3_000) });
  /// ```
  pub unacked_retry_strategy: Strategy,
  /// Number of times we are allowed to resend a CON request
  /// before erroring (MAX_RETRANSMIT).
  ///
  /// A request is transmitted at most `max_retransmit + 1` times.
  ///
  /// ```
  /// use mote::config::Con;
  /// use mote::retry::Attempts;
  ///
  /// assert_eq!(Con::default().max_retransmit, Attempts(4));
  /// ```
  pub max_retransmit: Attempts,
}

impl Con {
  /// Build the retry strategy from an ACK_TIMEOUT and an ACK_RANDOM_FACTOR
  /// expressed in tenths (`15` for the RFC default of 1.5).
  ///
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use mote::config::Con;
  /// use mote::retry::Strategy;
  ///
  /// assert_eq!(Con::strategy_from_ack_timeout(Milliseconds(100), 15),
  ///            Strategy::Exponential { init_min: Milliseconds(100),
  ///                                    init_max: Milliseconds(150) });
  /// ```
  pub fn strategy_from_ack_timeout(Milliseconds(ack_timeout): Millis,
                                   random_factor_tenths: u64)
                                   -> Strategy {
    Strategy::Exponential { init_min: Milliseconds(ack_timeout),
                            init_max: Milliseconds(ack_timeout.saturating_mul(random_factor_tenths) / 10) }
  }

  /// Total number of transmissions a CON request may see
  pub fn max_transmissions(&self) -> Attempts {
    Attempts(self.max_retransmit.0.saturating_add(1))
  }

  /// Time from the first transmission of a CON request
  /// to its last retransmission (MAX_TRANSMIT_SPAN)
  ///
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use mote::config::Con;
  ///
  /// assert_eq!(Con::default().max_transmit_span_millis(), Milliseconds(45_000u64));
  /// ```
  pub fn max_transmit_span_millis(&self) -> Millis {
    let Milliseconds(init_max) = self.init_max();
    Milliseconds(init_max.saturating_mul(2u64.saturating_pow(self.max_retransmit.0 as u32) - 1))
  }

  /// Time from the first transmission of a CON request to when
  /// the sender gives up on receiving an acknowledgement (MAX_TRANSMIT_WAIT)
  ///
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use mote::config::Con;
  ///
  /// assert_eq!(Con::default().max_transmit_wait_millis(), Milliseconds(93_000u64));
  /// ```
  pub fn max_transmit_wait_millis(&self) -> Millis {
    let Milliseconds(init_max) = self.init_max();
    Milliseconds(init_max.saturating_mul(2u64.saturating_pow(self.max_retransmit.0 as u32 + 1) - 1))
  }

  fn init_max(&self) -> Millis {
    let range = self.unacked_retry_strategy.range();
    Milliseconds(*range.end())
  }
}

/// Configuration options related to messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Msg {
  /// Seed used to generate message [`Token`](mote_msg::Token)s,
  /// customizable to allow for your application to generate tokens
  /// less guessably.
  ///
  /// _e.g. if a gateway polls a whole mesh of motes, giving each
  /// gateway process a distinct seed keeps tokens distinct between them._
  ///
  /// ```
  /// use mote::config::Msg;
  ///
  /// assert_eq!(Msg::default().token_seed, 0);
  /// ```
  pub token_seed: u16,

  /// See [`Con`]
  pub con: Con,
}

impl Default for Con {
  fn default() -> Self {
    Con { unacked_retry_strategy: Con::strategy_from_ack_timeout(Milliseconds(2_000), 15),
          max_retransmit: Attempts(4) }
  }
}

impl Default for Msg {
  fn default() -> Self {
    Msg { token_seed: 0,
          con: Con::default() }
  }
}

/// Runtime config
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Config {
  /// See [`Msg`]
  pub msg: Msg,
  /// How long the receive loop sleeps when the socket has nothing to read
  ///
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use mote::config::Config;
  ///
  /// assert_eq!(Config::default().poll_interval, Milliseconds(5u64));
  /// ```
  pub poll_interval: Millis,
  /// Largest datagram that will be sent or received.
  ///
  /// Defaults to 1152 bytes, the upper bound RFC7252 recommends
  /// when the path MTU is unknown.
  ///
  /// ```
  /// use mote::config::Config;
  ///
  /// assert_eq!(Config::default().max_dgram_size, 1152);
  /// ```
  pub max_dgram_size: usize,
}

impl Default for Config {
  fn default() -> Self {
    Config { msg: Msg::default(),
             poll_interval: Milliseconds(5),
             max_dgram_size: 1152 }
  }
}

impl Config {
  /// How long a NON request waits for its response before giving up.
  ///
  /// NON requests are never retransmitted, so they wait as long as a CON
  /// request would across all of its retransmissions.
  pub fn non_response_window_millis(&self) -> Millis {
    self.msg.con.max_transmit_wait_millis()
  }

  /// Time from the first transmission of a CON request until
  /// its message ID may safely be reused (EXCHANGE_LIFETIME)
  ///
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use mote::config::Config;
  ///
  /// assert_eq!(Config::default().exchange_lifetime_millis(), Milliseconds(247_000u64));
  /// ```
  pub fn exchange_lifetime_millis(&self) -> Millis {
    // MAX_LATENCY is 100s and PROCESSING_DELAY is ACK_TIMEOUT
    let Milliseconds(span) = self.msg.con.max_transmit_span_millis();
    let processing_delay = *self.msg.con.unacked_retry_strategy.range().start();
    Milliseconds(span.saturating_add(2 * 100_000).saturating_add(processing_delay))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn shorter_ack_timeout_scales_windows() {
    let con = Con { unacked_retry_strategy: Con::strategy_from_ack_timeout(Milliseconds(10), 15),
                    max_retransmit: Attempts(2) };

    assert_eq!(con.max_transmissions(), Attempts(3));
    assert_eq!(con.max_transmit_span_millis(), Milliseconds(15 * 3u64));
    assert_eq!(con.max_transmit_wait_millis(), Milliseconds(15 * 7u64));
  }

  #[test]
  fn huge_ack_timeout_saturates() {
    let strategy = Con::strategy_from_ack_timeout(Milliseconds(u64::MAX / 2), 15);
    assert_eq!(strategy.range(), u64::MAX / 2..=u64::MAX / 2);

    let con = Con { unacked_retry_strategy: strategy,
                    max_retransmit: Attempts(4) };
    assert_eq!(con.max_transmit_wait_millis(), Milliseconds(u64::MAX));

    let mut config = Config::default();
    config.msg.con = con;
    assert_eq!(config.exchange_lifetime_millis(), Milliseconds(u64::MAX));
  }
}
