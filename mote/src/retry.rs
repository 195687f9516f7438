use core::ops::RangeInclusive;

use embedded_time::duration::Milliseconds;
use embedded_time::Instant;
use rand::{Rng, SeedableRng};

use crate::time::{millis_between, millis_since_epoch, Clock, Millis};

/// A non-blocking timer that drives the retransmission of one request,
/// and lives alongside the request it retries.
///
/// It does not _contain_ the work to be done; it only answers
/// "is it time to try again, and should I?"
///
/// Each attempt gets its own deadline. With [`Strategy::Exponential`] the
/// first timeout is picked at random from the strategy's range and doubles
/// after every retry, so with a first timeout `t` the retries happen at
/// `t`, `3t`, `7t`, `15t`, ... after the first transmission.
///
/// ```
/// use embedded_time::clock::Clock;
/// use embedded_time::duration::Milliseconds;
/// use mote::retry;
///
/// # main();
/// fn main() {
///   let mut called = false;
///   let mut fails_once = || -> Result<(), ()> {
///     // ...
///     # if !called {
///     #   called = true;
///     #   Err(())
///     # } else {
///     #   Ok(())
///     # }
///   };
///
///   let clock = mote::std::Clock::new();
///   let now = || clock.try_now().unwrap();
///   let strategy = retry::Strategy::Delay { min: Milliseconds(1),
///                                           max: Milliseconds(2) };
///   let mut retry = retry::RetryTimer::new(now(), strategy, retry::Attempts(2));
///
///   while let Err(_) = fails_once() {
///     match nb::block!(retry.what_should_i_do(now())) {
///       | Ok(retry::YouShould::Retry) => continue,
///       | Ok(retry::YouShould::Cry) => panic!("no more attempts! it failed more than once!!"),
///       | Err(never) => match never {},
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RetryTimer<C: Clock> {
  start: Instant<C>,
  timeout: Millis,
  deadline: Millis,
  strategy: Strategy,
  attempts: Attempts,
  max_attempts: Attempts,
}

/// A number of attempts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attempts(pub u16);

/// Result of [`RetryTimer.what_should_i_do`].
///
/// This tells you if a retry should be attempted or not.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum YouShould {
  /// Attempts have been exhausted and the work that is
  /// being retried should be considered poisoned.
  Cry,
  /// A retry should be performed
  Retry,
}

impl<C: Clock> RetryTimer<C> {
  /// Create a new retrier, for work that was first attempted at `start`.
  ///
  /// `max_attempts` counts the first attempt; `Attempts(1)` never retries
  /// and only waits out the first timeout.
  ///
  /// The jitter is seeded from `start`, so timers started at the same
  /// instant of the same clock pick the same first timeout.
  /// Use [`RetryTimer::with_rng`] when timers must be independent.
  pub fn new(start: Instant<C>, strategy: Strategy, max_attempts: Attempts) -> Self {
    let Milliseconds(seed) = millis_since_epoch(start);
    let mut rand = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
    Self::with_rng(start, strategy, max_attempts, &mut rand)
  }

  /// Create a new retrier, picking the first timeout with `rand`
  pub fn with_rng(start: Instant<C>,
                  strategy: Strategy,
                  max_attempts: Attempts,
                  rand: &mut impl Rng)
                  -> Self {
    let init = if strategy.has_jitter() {
      Milliseconds(rand.gen_range(strategy.range()))
    } else {
      Milliseconds(*strategy.range().start())
    };

    Self { start,
           strategy,
           timeout: init,
           deadline: init,
           max_attempts,
           attempts: Attempts(1) }
  }

  /// When the thing we keep trying fails, invoke this to
  /// tell the retrytimer "it failed again! what do I do??"
  ///
  /// Returns `nb::Error::WouldBlock` when we have not yet
  /// waited the appropriate amount of time to retry.
  pub fn what_should_i_do(&mut self,
                          now: Instant<C>)
                          -> nb::Result<YouShould, core::convert::Infallible> {
    if millis_between(self.start, now) < self.deadline {
      Err(nb::Error::WouldBlock)
    } else if self.attempts >= self.max_attempts {
      Ok(YouShould::Cry)
    } else {
      self.attempts.0 += 1;
      if let Strategy::Exponential { .. } = self.strategy {
        self.timeout = Milliseconds(self.timeout.0.saturating_mul(2));
      }
      self.deadline = Milliseconds(self.deadline.0.saturating_add(self.timeout.0));
      Ok(YouShould::Retry)
    }
  }

  /// How long until [`RetryTimer::what_should_i_do`] stops yielding `WouldBlock`
  pub fn time_until_deadline(&self, now: Instant<C>) -> Millis {
    let Milliseconds(elapsed) = millis_between(self.start, now);
    Milliseconds(self.deadline.0.saturating_sub(elapsed))
  }

  /// The timeout of the current attempt
  pub fn timeout(&self) -> Millis {
    self.timeout
  }

  /// Number of attempts made so far, including the first
  pub fn attempts(&self) -> Attempts {
    self.attempts
  }
}

/// Strategy to employ when retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strategy {
  /// Generate a random delay between `min` and `max`,
  /// and wait until this delay has passed between attempts.
  ///
  /// After each failed attempt, double the delay before retrying again.
  Exponential {
    /// Minimum (inclusive) delay for second attempt
    init_min: Milliseconds<u64>,
    /// Maximum (inclusive) delay for second attempt
    init_max: Milliseconds<u64>,
  },
  /// Generate a random delay between `min` and `max`,
  /// and wait until this delay has passed between attempts.
  Delay {
    /// Minimum (inclusive) delay for attempts
    min: Milliseconds<u64>,
    /// Maximum (inclusive) delay for attempts
    max: Milliseconds<u64>,
  },
}

impl Strategy {
  /// Are min & max delays the same? if so, we should probably skip the random number generation.
  pub fn has_jitter(&self) -> bool {
    let rng = self.range();
    rng.start() != rng.end()
  }

  /// Get the min & max durations as an inclusive range
  pub fn range(&self) -> RangeInclusive<u64> {
    match self {
      | &Self::Delay { min: Milliseconds(min),
                       max: Milliseconds(max), } => min..=max.max(min),

      | &Self::Exponential { init_min: Milliseconds(min),
                             init_max: Milliseconds(max), } => min..=max.max(min),
    }
  }

  /// Get the amount of time this strategy will take if all attempts fail
  ///
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use mote::retry::{Attempts, Strategy};
  ///
  /// let exp = Strategy::Exponential { init_min: Milliseconds(2_000),
  ///                                   init_max: Milliseconds(3_000) };
  /// assert_eq!(exp.max_time(Attempts(5)), Milliseconds(93_000u64));
  /// ```
  pub fn max_time(&self, max_attempts: Attempts) -> Milliseconds<u64> {
    Milliseconds(match self {
                   | Self::Exponential { init_max: Milliseconds(max),
                                         .. } => {
                     max.saturating_mul(2u64.saturating_pow(max_attempts.0 as u32) - 1)
                   },
                   | Self::Delay { max: Milliseconds(max),
                                   .. } => max.saturating_mul(max_attempts.0 as u64),
                 })
  }
}

#[cfg(test)]
mod test {
  use embedded_time::Clock as _;

  use super::*;
  use crate::test::ClockMock;

  #[test]
  fn delay_retrier() {
    let clock = ClockMock::new();
    let now = || clock.try_now().unwrap();
    let mut retry = RetryTimer::new(now(),
                                    Strategy::Delay { min: Milliseconds(1000),
                                                      max: Milliseconds(1000) },
                                    Attempts(3));

    // attempt 1 happens before asking what_should_i_do

    clock.set(999);
    assert_eq!(retry.what_should_i_do(now()).unwrap_err(),
               nb::Error::WouldBlock);

    clock.set(1000);
    assert_eq!(retry.what_should_i_do(now()).unwrap(), YouShould::Retry);
    // Fails again (attempt 2)

    clock.set(1999);
    assert_eq!(retry.what_should_i_do(now()).unwrap_err(),
               nb::Error::WouldBlock);

    clock.set(2000);
    assert_eq!(retry.what_should_i_do(now()).unwrap(), YouShould::Retry);
    // Fails again (attempt 3)

    clock.set(2999);
    assert_eq!(retry.what_should_i_do(now()).unwrap_err(),
               nb::Error::WouldBlock);

    clock.set(3000);
    assert_eq!(retry.what_should_i_do(now()).unwrap(), YouShould::Cry);
    assert_eq!(retry.attempts(), Attempts(3));
  }

  #[test]
  fn exponential_retrier() {
    let clock = ClockMock::new();
    let now = || clock.try_now().unwrap();
    let mut retry = RetryTimer::new(now(),
                                    Strategy::Exponential { init_min: Milliseconds(100),
                                                            init_max: Milliseconds(100) },
                                    Attempts(5));

    // deadlines: 100, 300, 700, 1500, then give up at 3100
    for (deadline, timeout) in [(100, 200), (300, 400), (700, 800), (1500, 1600)] {
      clock.set(deadline - 1);
      assert_eq!(retry.what_should_i_do(now()).unwrap_err(),
                 nb::Error::WouldBlock);
      assert_eq!(retry.time_until_deadline(now()), Milliseconds(1u64));

      clock.set(deadline);
      assert_eq!(retry.what_should_i_do(now()).unwrap(), YouShould::Retry);
      assert_eq!(retry.timeout(), Milliseconds(timeout as u64));
    }

    clock.set(3099);
    assert_eq!(retry.what_should_i_do(now()).unwrap_err(),
               nb::Error::WouldBlock);
    clock.set(3100);
    assert_eq!(retry.what_should_i_do(now()).unwrap(), YouShould::Cry);
    assert_eq!(retry.attempts(), Attempts(5));
  }

  #[test]
  fn late_check_does_not_burst() {
    let clock = ClockMock::new();
    let now = || clock.try_now().unwrap();
    let mut retry = RetryTimer::new(now(),
                                    Strategy::Exponential { init_min: Milliseconds(100),
                                                            init_max: Milliseconds(100) },
                                    Attempts(5));

    // checked very late; one retry, and the next deadline is still 300ms after start
    clock.set(250);
    assert_eq!(retry.what_should_i_do(now()).unwrap(), YouShould::Retry);
    assert_eq!(retry.what_should_i_do(now()).unwrap_err(),
               nb::Error::WouldBlock);
    assert_eq!(retry.time_until_deadline(now()), Milliseconds(50u64));
  }

  #[test]
  fn jitter_stays_in_range() {
    let clock = ClockMock::new();
    let strategy = Strategy::Exponential { init_min: Milliseconds(2_000),
                                           init_max: Milliseconds(3_000) };

    let inits = (0..200u64).map(|start| {
                              clock.set(start * 7919);
                              RetryTimer::new(clock.try_now().unwrap(), strategy, Attempts(5)).timeout()
                            })
                            .collect::<Vec<_>>();

    assert!(inits.iter()
                 .all(|Milliseconds(ms)| (2_000..=3_000).contains(ms)));
    assert!(inits.iter().any(|init| init != &inits[0]));
  }

  #[test]
  fn timers_with_their_own_rng_differ() {
    let clock = ClockMock::new();
    let strategy = Strategy::Exponential { init_min: Milliseconds(2_000),
                                           init_max: Milliseconds(3_000) };

    let same_start = RetryTimer::new(clock.try_now().unwrap(), strategy, Attempts(5)).timeout();
    assert_eq!(RetryTimer::new(clock.try_now().unwrap(), strategy, Attempts(5)).timeout(),
               same_start);

    let mut rand = rand_chacha::ChaCha8Rng::seed_from_u64(61618);
    let inits = (0..50).map(|_| {
                          RetryTimer::with_rng(clock.try_now().unwrap(), strategy, Attempts(5), &mut rand).timeout()
                        })
                        .collect::<Vec<_>>();

    assert!(inits.iter()
                 .all(|Milliseconds(ms)| (2_000..=3_000).contains(ms)));
    assert!(inits.iter().any(|init| init != &inits[0]));
  }

  #[test]
  fn single_attempt_waits_once() {
    let clock = ClockMock::new();
    let now = || clock.try_now().unwrap();
    let mut retry = RetryTimer::new(now(),
                                    Strategy::Delay { min: Milliseconds(50),
                                                      max: Milliseconds(50) },
                                    Attempts(1));

    assert_eq!(retry.what_should_i_do(now()).unwrap_err(),
               nb::Error::WouldBlock);
    clock.set(50);
    assert_eq!(retry.what_should_i_do(now()).unwrap(), YouShould::Cry);
  }
}
