use embedded_time::duration::Milliseconds;
use embedded_time::Instant;

/// A duration, in milliseconds
pub type Millis = Milliseconds<u64>;

/// Supertrait of [`embedded_time::Clock`] pinning the
/// type of "ticks" to u64
pub trait Clock: embedded_time::Clock<T = u64> {}
impl<C: embedded_time::Clock<T = u64>> Clock for C {}

/// Milliseconds elapsed between `earlier` and `later`,
/// or zero if `later` is not actually later.
///
/// ```
/// use embedded_time::duration::Milliseconds;
/// use embedded_time::Instant;
/// use mote::std::Clock;
/// use mote::time::millis_between;
///
/// let a = Instant::<Clock>::new(1_000);
/// let b = Instant::<Clock>::new(5_000);
///
/// // the std clock ticks in microseconds
/// assert_eq!(millis_between(a, b), Milliseconds(4u64));
/// assert_eq!(millis_between(b, a), Milliseconds(0u64));
/// ```
pub fn millis_between<C: Clock>(earlier: Instant<C>, later: Instant<C>) -> Millis {
  later.checked_duration_since(&earlier)
       .and_then(|dur| Millis::try_from(dur).ok())
       .unwrap_or(Milliseconds(0))
}

/// Milliseconds since the clock's epoch
pub fn millis_since_epoch<C: Clock>(now: Instant<C>) -> Millis {
  Millis::try_from(now.duration_since_epoch()).unwrap_or(Milliseconds(0))
}

/// Convert to a [`std::time::Duration`], for APIs like `recv_timeout`
pub fn to_std(Milliseconds(ms): Millis) -> std::time::Duration {
  std::time::Duration::from_millis(ms)
}
