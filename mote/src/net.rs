use core::fmt;
use core::str::FromStr;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

/// Data that came from a network socket
#[derive(PartialEq, PartialOrd, Eq, Ord, Hash, Debug, Clone, Copy)]
pub struct Addrd<T>(pub T, pub SocketAddr);

impl<T> Addrd<T> {
  /// Borrow the contents of this Addrd
  pub fn as_ref(&self) -> Addrd<&T> {
    Addrd(self.data(), self.addr())
  }

  /// Discard the socket and get the data in this Addrd
  pub fn unwrap(self) -> T {
    self.0
  }

  /// Map the data contained in this Addrd
  pub fn map<R>(self, f: impl FnOnce(T) -> R) -> Addrd<R> {
    Addrd(f(self.0), self.1)
  }

  /// Gets the data contained in this Addrd
  pub fn data(&self) -> &T {
    &self.0
  }

  /// Gets the address associated with this Addrd
  pub fn addr(&self) -> SocketAddr {
    self.1
  }
}

/// A CoAP network socket
///
/// This mirrors the Udp socket traits in embedded-nal, but allows us to implement them for foreign types (like `std::net::UdpSocket`).
///
/// Sockets are shared between the thread receiving responses and the threads
/// sending requests, so every operation borrows the socket immutably.
pub trait Socket: Sized + Send + Sync + 'static {
  /// The error yielded by socket operations
  type Error: fmt::Debug + fmt::Display + Send + 'static;

  /// Get the local address this socket is bound to
  fn local_addr(&self) -> Result<SocketAddr, Self::Error>;

  /// Send a message to a remote address
  fn send(&self, msg: Addrd<&[u8]>) -> nb::Result<(), Self::Error>;

  /// Pull a buffered datagram from the socket, along with the address to the sender.
  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, Self::Error>;

  /// Poll the socket for a datagram of at most `max_size` bytes.
  ///
  /// A longer datagram is cut to `max_size + 1` bytes, so callers
  /// can tell it apart from one that fit exactly.
  fn poll(&self, max_size: usize) -> Result<Option<Addrd<Vec<u8>>>, Self::Error> {
    let mut buf = vec![0u8; max_size.saturating_add(1)];
    let recvd = self.recv(&mut buf);

    match recvd {
      | Ok(Addrd(n, addr)) => {
        buf.truncate(n);
        Ok(Some(Addrd(buf, addr)))
      },
      | Err(nb::Error::WouldBlock) => Ok(None),
      | Err(nb::Error::Other(e)) => Err(e),
    }
  }
}

/// Whether two socket addresses name the same remote endpoint,
/// treating an IPv4-mapped IPv6 address as the IPv4 address it maps.
///
/// ```
/// use mote::net::same_endpoint;
///
/// assert!(same_endpoint("[::ffff:127.0.0.1]:5683".parse().unwrap(),
///                       "127.0.0.1:5683".parse().unwrap()));
/// assert!(!same_endpoint("[::1]:5683".parse().unwrap(),
///                        "[::1]:5684".parse().unwrap()));
/// ```
pub fn same_endpoint(a: SocketAddr, b: SocketAddr) -> bool {
  let canonical = |ip: IpAddr| match ip {
    | IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
    | v4 => v4,
  };

  a.port() == b.port() && canonical(a.ip()) == canonical(b.ip())
}

/// Port CoAP servers listen on when none is specified
pub const DEFAULT_PORT: u16 = 5683;

/// Errors encounterable constructing an [`Endpoint`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
  /// The host was not an IPv4 or IPv6 literal
  InvalidAddress(String),
  /// The port was not an integer between 0 and 65535
  InvalidPort(String),
}

impl fmt::Display for EndpointError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::InvalidAddress(a) => write!(f, "{:?} is not an IPv4 or IPv6 address", a),
      | Self::InvalidPort(p) => write!(f, "{:?} is not a valid port", p),
    }
  }
}

impl std::error::Error for EndpointError {}

/// The remote address & port a request is sent to.
///
/// Hosts must be IP literals; names are never resolved.
///
/// ```
/// use mote::net::Endpoint;
///
/// let mote = Endpoint::parse("bbbb::1060:1213:7cca:52cc", 61618).unwrap();
/// assert_eq!(mote, Endpoint::parse("[bbbb::1060:1213:7cca:52cc]", 61618).unwrap());
/// assert_eq!(mote.to_string(), "[bbbb::1060:1213:7cca:52cc]:61618");
///
/// assert!(Endpoint::parse("mote.local", 5683).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Endpoint {
  addr: IpAddr,
  port: u16,
}

impl Endpoint {
  /// Create an endpoint from an address & port
  pub fn new(addr: IpAddr, port: u16) -> Self {
    Self { addr, port }
  }

  /// Create an endpoint from a textual IP literal (IPv6 may be bracketed) and a port
  pub fn parse(host: &str, port: u16) -> Result<Self, EndpointError> {
    let unbracketed = host.strip_prefix('[')
                          .and_then(|h| h.strip_suffix(']'))
                          .unwrap_or(host);

    unbracketed.parse::<IpAddr>()
               .map(|addr| Self::new(addr, port))
               .map_err(|_| EndpointError::InvalidAddress(host.to_string()))
  }

  /// The IP address of this endpoint
  pub fn addr(&self) -> IpAddr {
    self.addr
  }

  /// The port of this endpoint
  pub fn port(&self) -> u16 {
    self.port
  }

  /// The socket address of this endpoint
  pub fn socket_addr(&self) -> SocketAddr {
    SocketAddr::new(self.addr, self.port)
  }

  /// The socket address to send to from a socket bound to `local`.
  ///
  /// IPv4 endpoints are addressed by their IPv4-mapped IPv6 address
  /// when sending from an IPv6 socket.
  pub fn socket_addr_from(&self, local: SocketAddr) -> SocketAddr {
    match (local, self.addr) {
      | (SocketAddr::V6(_), IpAddr::V4(v4)) => {
        SocketAddr::new(IpAddr::V6(v4.to_ipv6_mapped()), self.port)
      },
      | _ => self.socket_addr(),
    }
  }
}

impl From<SocketAddr> for Endpoint {
  fn from(addr: SocketAddr) -> Self {
    Self::new(addr.ip(), addr.port())
  }
}

impl From<Endpoint> for SocketAddr {
  fn from(ep: Endpoint) -> Self {
    ep.socket_addr()
  }
}

impl FromStr for Endpoint {
  type Err = EndpointError;

  /// Parse `host`, `host:port`, `[v6]` or `[v6]:port`; the port defaults to 5683.
  ///
  /// ```
  /// use mote::net::Endpoint;
  ///
  /// let ep: Endpoint = "[bbbb::1]:61618".parse().unwrap();
  /// assert_eq!(ep.port(), 61618);
  ///
  /// let ep: Endpoint = "bbbb::1".parse().unwrap();
  /// assert_eq!(ep.port(), 5683);
  ///
  /// let ep: Endpoint = "10.0.0.7:1234".parse().unwrap();
  /// assert_eq!(ep.to_string(), "10.0.0.7:1234");
  /// ```
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if let Ok(addr) = s.parse::<SocketAddr>() {
      return Ok(addr.into());
    }

    if let Ok(v6) = s.parse::<Ipv6Addr>() {
      return Ok(Self::new(IpAddr::V6(v6), DEFAULT_PORT));
    }

    let (host, port) = match s.rsplit_once(':') {
      | Some((host, port)) if !host.ends_with(':') && (host.ends_with(']') || !host.contains(':')) => {
        (host,
         port.parse::<u16>()
             .map_err(|_| EndpointError::InvalidPort(port.to_string()))?)
      },
      | _ => (s, DEFAULT_PORT),
    };

    Self::parse(host, port)
  }
}

impl fmt::Display for Endpoint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.socket_addr())
  }
}

#[cfg(test)]
mod tests {
  use std::net::Ipv4Addr;

  use super::*;

  #[test]
  fn parse_endpoint_forms() {
    let mote = IpAddr::V6("bbbb::1060:1213:7cca:52cc".parse().unwrap());

    assert_eq!("[bbbb::1060:1213:7cca:52cc]:61618".parse::<Endpoint>(),
               Ok(Endpoint::new(mote, 61618)));
    assert_eq!("[bbbb::1060:1213:7cca:52cc]".parse::<Endpoint>(),
               Ok(Endpoint::new(mote, 5683)));
    assert_eq!("bbbb::1060:1213:7cca:52cc".parse::<Endpoint>(),
               Ok(Endpoint::new(mote, 5683)));
    assert_eq!("127.0.0.1".parse::<Endpoint>(),
               Ok(Endpoint::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 5683)));
  }

  #[test]
  fn reject_bad_endpoints() {
    assert_eq!("[bbbb::1]:99999".parse::<Endpoint>(),
               Err(EndpointError::InvalidPort("99999".into())));
    assert_eq!("mote.local:5683".parse::<Endpoint>(),
               Err(EndpointError::InvalidAddress("mote.local".into())));
    assert!("[bbbb::zz]".parse::<Endpoint>().is_err());
    assert!(Endpoint::parse("", 1).is_err());
  }

  #[test]
  fn v4_from_v6_socket_is_mapped() {
    let ep = Endpoint::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 5683);
    let v6_local: SocketAddr = "[::]:61618".parse().unwrap();
    let v4_local: SocketAddr = "0.0.0.0:61618".parse().unwrap();

    assert_eq!(ep.socket_addr_from(v6_local),
               "[::ffff:127.0.0.1]:5683".parse::<SocketAddr>().unwrap());
    assert_eq!(ep.socket_addr_from(v4_local), ep.socket_addr());
  }
}
