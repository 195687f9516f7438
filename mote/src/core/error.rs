use core::fmt;
use std::io;
use std::net::SocketAddr;

use mote_msg::to_bytes::MessageToBytesError;
use mote_msg::MessageParseError;

/// The context that an error occurred in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum When {
  /// We were binding a socket to a local port
  Binding(u16),
  /// We were starting the receive loop
  Spawning,
  /// We were sending a message
  SendingMessage(Option<SocketAddr>, mote_msg::Id, mote_msg::Token),
  /// We were polling for a message when the error occurred
  Polling,
  /// We were decoding a response payload
  Decoding,
  /// No particular context
  None,
}

impl When {
  /// Construct a specific error from the context the error occurred in
  pub fn what<E>(self, what: What<E>) -> Error<E> {
    Error { when: self, what }
  }
}

/// An error encounterable from within Core,
/// generic over the error type of the socket in use.
#[derive(Debug)]
pub struct Error<E> {
  /// What happened?
  pub what: What<E>,
  /// What were we doing when it happened?
  pub when: When,
}

impl<E> Error<E> {
  /// Is this error `MalformedResponse`?
  pub fn message_parse_error(&self) -> Option<&MessageParseError> {
    match self.what {
      | What::MalformedResponse(ref e) => Some(e),
      | _ => None,
    }
  }

  /// Did the request go unanswered through every retransmission?
  pub fn is_timeout(&self) -> bool {
    matches!(self.what, What::MessageNeverAcked)
  }
}

/// A contextless error with some additional debug data attached.
#[derive(Debug)]
pub enum What<E> {
  /// The local socket could not be bound
  Bind(E),
  /// The receive loop's thread could not be started
  Spawn(io::Error),
  /// Some socket operation (e.g. sending a datagram) failed
  SockError(E),
  /// A request was sent many times without a response.
  MessageNeverAcked,
  /// A datagram that answered our request could not be parsed
  MalformedResponse(MessageParseError),
  /// A response payload was not utf8
  Decode(core::str::Utf8Error),
  /// Serializing a message to bytes failed
  ToBytes(MessageToBytesError),
  /// The clock failed to provide timing.
  ///
  /// See [`embedded_time::clock::Error`]
  ClockError,
  /// The receive loop has stopped, so no response can arrive
  Closed,
  /// The server answered our request with a Reset
  Reset,
  /// Every message ID is in use by a pending request
  IdsExhausted,
}

impl<E: fmt::Display> fmt::Display for What<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::Bind(e) => write!(f, "failed to bind socket: {}", e),
      | Self::Spawn(e) => write!(f, "failed to start receive loop: {}", e),
      | Self::SockError(e) => write!(f, "socket error: {}", e),
      | Self::MessageNeverAcked => write!(f, "timed out waiting for a response"),
      | Self::MalformedResponse(e) => write!(f, "malformed response: {}", e),
      | Self::Decode(e) => write!(f, "response payload is not utf8: {}", e),
      | Self::ToBytes(e) => write!(f, "failed to serialize request: {}", e),
      | Self::ClockError => write!(f, "clock failed"),
      | Self::Closed => write!(f, "client is closed"),
      | Self::Reset => write!(f, "request was reset by the server"),
      | Self::IdsExhausted => write!(f, "no message ID is free"),
    }
  }
}

impl fmt::Display for When {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::Binding(port) => write!(f, "binding port {}", port),
      | Self::Spawning => write!(f, "starting receive loop"),
      | Self::SendingMessage(Some(addr), id, _) => write!(f, "sending message {} to {}", id.0, addr),
      | Self::SendingMessage(None, id, _) => write!(f, "sending message {}", id.0),
      | Self::Polling => write!(f, "polling socket"),
      | Self::Decoding => write!(f, "decoding payload"),
      | Self::None => Ok(()),
    }
  }
}

impl<E: fmt::Display> fmt::Display for Error<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.when {
      | When::None => write!(f, "{}", self.what),
      | when => write!(f, "{} while {}", self.what, when),
    }
  }
}

impl<E> std::error::Error for Error<E> where E: fmt::Debug + fmt::Display + std::error::Error + 'static
{
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match &self.what {
      | What::Bind(e) | What::SockError(e) => Some(e),
      | What::Spawn(e) => Some(e),
      | What::MalformedResponse(e) => Some(e),
      | What::Decode(e) => Some(e),
      | What::ToBytes(e) => Some(e),
      | _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use mote_msg::{Id, Token};

  use super::*;

  #[test]
  fn display() {
    let addr: SocketAddr = "[bbbb::1]:5683".parse().unwrap();
    let err = When::SendingMessage(Some(addr), Id(12), Token::empty()).what::<io::Error>(What::MessageNeverAcked);

    assert!(err.is_timeout());
    assert_eq!(err.to_string(),
               "timed out waiting for a response while sending message 12 to [bbbb::1]:5683");
    assert_eq!(When::None.what::<io::Error>(What::Closed).to_string(),
               "client is closed");
  }

  #[test]
  fn parse_error_is_exposed() {
    let err = When::Polling.what::<io::Error>(What::MalformedResponse(MessageParseError::eof()));
    assert_eq!(err.message_parse_error(),
               Some(&MessageParseError::UnexpectedEndOfStream));
    assert!(!err.is_timeout());
  }
}
