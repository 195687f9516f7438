use ::std::io;
use ::std::net::{SocketAddr, UdpSocket};

use embedded_time::rate::Fraction;

use crate::net::{Addrd, Socket};

pub(crate) fn io_to_nb(err: io::Error) -> nb::Error<io::Error> {
  match err.kind() {
    | io::ErrorKind::WouldBlock => nb::Error::WouldBlock,
    | _ => nb::Error::Other(err),
  }
}

impl Socket for UdpSocket {
  type Error = io::Error;

  fn local_addr(&self) -> io::Result<SocketAddr> {
    UdpSocket::local_addr(self)
  }

  fn send(&self, msg: Addrd<&[u8]>) -> nb::Result<(), Self::Error> {
    self.send_to(msg.data(), msg.addr())
        .map(|_| ())
        .map_err(io_to_nb)
  }

  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, Self::Error> {
    self.recv_from(buffer)
        .map(|(n, addr)| Addrd(n, addr))
        .map_err(io_to_nb)
  }
}

/// Implement [`embedded_time::Clock`] using [`std::time`] primitives
#[derive(Debug, Clone, Copy)]
pub struct Clock(::std::time::Instant);

impl Default for Clock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock {
  /// Create a new clock
  pub fn new() -> Self {
    Self(::std::time::Instant::now())
  }
}

impl embedded_time::Clock for Clock {
  type T = u64;

  // microseconds
  const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

  fn try_now(&self) -> Result<embedded_time::Instant<Self>, embedded_time::clock::Error> {
    let now = ::std::time::Instant::now();
    let elapsed = now.duration_since(self.0);
    Ok(embedded_time::Instant::new(elapsed.as_micros() as u64))
  }
}

#[cfg(test)]
mod tests {
  use embedded_time::Clock as _;

  use super::*;
  use crate::time::millis_between;

  #[test]
  fn clock_moves_forward() {
    let clock = Clock::new();
    let a = clock.try_now().unwrap();
    ::std::thread::sleep(::std::time::Duration::from_millis(5));
    let b = clock.try_now().unwrap();

    assert!(millis_between(a, b).0 >= 5);
  }

  #[test]
  fn udp_socket_would_block() {
    let sock = UdpSocket::bind("127.0.0.1:0").unwrap();
    sock.set_nonblocking(true).unwrap();

    assert!(matches!(Socket::poll(&sock, 64), Ok(None)));
  }

  #[test]
  fn udp_socket_roundtrip() {
    let a = UdpSocket::bind("127.0.0.1:0").unwrap();
    let b = UdpSocket::bind("127.0.0.1:0").unwrap();
    b.set_read_timeout(Some(::std::time::Duration::from_secs(2)))
     .unwrap();

    Socket::send(&a, Addrd(&[1u8, 2, 3][..], b.local_addr().unwrap())).unwrap();

    let Addrd(bytes, from) = Socket::poll(&b, 64).unwrap().unwrap();
    assert_eq!(bytes, vec![1, 2, 3]);
    assert_eq!(from, a.local_addr().unwrap());
  }
}
