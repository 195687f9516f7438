use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use crate::config::Config;
use crate::core::{Core, Error, What, When};
use crate::net::{Endpoint, Socket};
use crate::req::Req;
use crate::resp::Resp;
use crate::time::Clock;

/// A blocking CoAP request client
///
/// Every request blocks the calling thread until it is answered or
/// it runs out of retries. Methods borrow the client immutably,
/// so one client may be shared by many threads with requests in flight.
///
/// The socket is released when the client is dropped or [`close`](Client::close)d.
pub struct Client<S: Socket = UdpSocket, C: Clock = crate::std::Clock> {
  core: Core<S, C>,
}

impl<S: Socket, C: Clock> core::fmt::Debug for Client<S, C> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Client").field("core", &self.core).finish()
  }
}

/// Helper methods on Client Results
pub trait ClientResultExt<T, E> {
  /// If we timed out waiting for a response, consider that Ok(None).
  ///
  /// Usually used to handle sending non-confirmable requests that
  /// the server may have received but not responded to.
  fn timeout_ok(self) -> Result<Option<T>, Error<E>>;
}

impl<T, E> ClientResultExt<T, E> for Result<T, Error<E>> {
  fn timeout_ok(self) -> Result<Option<T>, Error<E>> {
    match self {
      | Ok(t) => Ok(Some(t)),
      | Err(Error { what: What::MessageNeverAcked,
                    .. }) => Ok(None),
      | Err(e) => Err(e),
    }
  }
}

impl Client {
  /// Create a new Client bound to `port` on all local interfaces.
  ///
  /// Binds the unspecified IPv6 address (which on most systems also
  /// carries IPv4), falling back to IPv4 only when IPv6 is unavailable.
  /// Port `0` picks an ephemeral port.
  ///
  /// ```no_run
  /// use mote::blocking::Client;
  ///
  /// let client = Client::open(61618).unwrap();
  /// let temperature = client.get_string("[bbbb::1060:1213:7cca:52cc]:5683".parse().unwrap(), "s/t")
  ///                         .unwrap();
  ///
  /// println!("it's {} degrees out", temperature);
  /// ```
  pub fn open(port: u16) -> Result<Self, Error<io::Error>> {
    Self::open_config(port, Config::default())
  }

  /// Create a new std client with a specific runtime config
  pub fn open_config(port: u16, config: Config) -> Result<Self, Error<io::Error>> {
    let sock = UdpSocket::bind((Ipv6Addr::UNSPECIFIED, port))
      .or_else(|e| match e.kind() {
        | io::ErrorKind::AddrInUse => Err(e),
        | _ => {
          log::debug!("IPv6 unavailable ({}), binding IPv4", e);
          UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))
        },
      })
      .and_then(|sock| sock.set_nonblocking(true).map(|_| sock))
      .map_err(|e| When::Binding(port).what(What::Bind(e)))?;

    Self::open_with(sock, config)
  }
}

impl<S: Socket> Client<S> {
  /// Create a new request client using an already-bound socket.
  ///
  /// The socket must be non-blocking.
  pub fn open_with(sock: S, config: Config) -> Result<Self, Error<S::Error>> {
    Self::open_with_clock(sock, crate::std::Clock::new(), config)
  }
}

impl<S, C> Client<S, C>
  where S: Socket,
        C: Clock + Send + Sync + 'static
{
  /// Create a new request client with a specific socket, clock & runtime config
  pub fn open_with_clock(sock: S, clock: C, config: Config) -> Result<Self, Error<S::Error>> {
    Core::new(sock, clock, config).map(|core| Self { core })
  }

  /// Send a request and wait for its response
  ///
  /// ```no_run
  /// use mote::blocking::Client;
  /// use mote::req::Req;
  ///
  /// let client = Client::open(61618).unwrap();
  ///
  /// let mut req = Req::put("s/led");
  /// req.set_payload("on");
  ///
  /// let resp = client.send("[bbbb::1]:5683".parse().unwrap(), req).unwrap();
  /// assert!(resp.is_success());
  /// ```
  pub fn send(&self, endpoint: Endpoint, req: Req) -> Result<Resp, Error<S::Error>> {
    self.core.send(endpoint, req)
  }

  /// Send a GET request and return the response payload,
  /// whatever the response code.
  pub fn get(&self, endpoint: Endpoint, path: impl AsRef<str>) -> Result<Vec<u8>, Error<S::Error>> {
    self.send(endpoint, Req::get(path)).map(Resp::into_payload)
  }

  /// Send a GET request and return the response payload as a utf8 string
  pub fn get_string(&self,
                    endpoint: Endpoint,
                    path: impl AsRef<str>)
                    -> Result<String, Error<S::Error>> {
    self.get(endpoint, path).and_then(|bytes| {
                              String::from_utf8(bytes).map_err(|e| {
                                                        When::Decoding.what(What::Decode(e.utf8_error()))
                                                      })
                            })
  }

  /// Send a POST request
  pub fn post(&self,
              endpoint: Endpoint,
              path: impl AsRef<str>,
              payload: impl AsRef<[u8]>)
              -> Result<Resp, Error<S::Error>> {
    let mut req = Req::post(path);
    req.set_payload(payload);
    self.send(endpoint, req)
  }

  /// Send a PUT request
  pub fn put(&self,
             endpoint: Endpoint,
             path: impl AsRef<str>,
             payload: impl AsRef<[u8]>)
             -> Result<Resp, Error<S::Error>> {
    let mut req = Req::put(path);
    req.set_payload(payload);
    self.send(endpoint, req)
  }

  /// Send a DELETE request
  pub fn delete(&self, endpoint: Endpoint, path: impl AsRef<str>) -> Result<Resp, Error<S::Error>> {
    self.send(endpoint, Req::delete(path))
  }

  /// Ping an endpoint
  pub fn ping(&self, endpoint: Endpoint) -> Result<(), Error<S::Error>> {
    self.core.ping(endpoint)
  }

  /// The local address the client's socket is bound to
  pub fn local_addr(&self) -> Result<SocketAddr, Error<S::Error>> {
    self.core.local_addr()
  }

  /// The runtime config in use
  pub fn config(&self) -> &Config {
    self.core.config()
  }

  /// Stop receiving and release the socket
  pub fn close(self) {
    drop(self)
  }
}

#[cfg(test)]
mod tests {
  use embedded_time::duration::Milliseconds;
  use mote_msg::{Message, TryFromBytes, TryIntoBytes};

  use super::*;
  use crate::config::Con;
  use crate::net::Addrd;
  use crate::resp::code;
  use crate::test::{mote_losing_first, piggyback, SockMock};

  fn config() -> Config {
    let mut config = Config::default();
    config.msg.con.unacked_retry_strategy = Con::strategy_from_ack_timeout(Milliseconds(10), 15);
    config.poll_interval = Milliseconds(1);
    config
  }

  fn mote() -> Endpoint {
    "[bbbb::1060:1213:7cca:52cc]:61618".parse().unwrap()
  }

  fn client(payload: &'static [u8]) -> Client<SockMock> {
    let sock = SockMock::scripted(mote_losing_first(mote().socket_addr(), 1, code::CONTENT, payload));
    Client::open_with(sock, config()).unwrap()
  }

  #[test]
  fn get_string() {
    assert_eq!(client(b"OK").get_string(mote(), "s/c").unwrap(), "OK");
  }

  #[test]
  fn get_string_rejects_invalid_utf8() {
    let err = client(&[0x4F, 0xFF]).get_string(mote(), "s/c").unwrap_err();

    assert!(matches!(err.what, What::Decode(_)));
    assert_eq!(err.when, When::Decoding);
  }

  #[test]
  fn get_returns_payload_of_error_responses() {
    let sock = SockMock::scripted(mote_losing_first(mote().socket_addr(), 0, code::NOT_FOUND, b"no such sensor"));
    let client = Client::open_with(sock, config()).unwrap();

    assert_eq!(client.get(mote(), "s/x").unwrap(), b"no such sensor");
  }

  #[test]
  fn post_carries_payload() {
    let sock = SockMock::scripted(|Addrd(bytes, to)| {
                 let req = Message::try_from_bytes(bytes).unwrap();
                 let rep = piggyback(&req, code::CHANGED, &req.payload.0);
                 vec![Addrd(rep.try_into_bytes().unwrap(), to)]
               });
    let client = Client::open_with(sock, config()).unwrap();

    let resp = client.post(mote(), "s/led", "on").unwrap();
    assert_eq!(resp.code(), code::CHANGED);
    assert_eq!(resp.payload_str().unwrap(), "on");
  }

  #[test]
  fn timeout_ok() {
    let client = Client::open_with(SockMock::new(), config()).unwrap();

    assert_eq!(client.get(mote(), "s/c").timeout_ok().unwrap(), None);
    assert_eq!(client.local_addr().unwrap(),
               "[::]:61618".parse::<SocketAddr>().unwrap());
    client.close();
  }
}
