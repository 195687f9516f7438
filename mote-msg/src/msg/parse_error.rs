use core::fmt;

use super::opt::parse_error::OptParseError;

/// Errors encounterable while parsing a message from bytes
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Eq, Ord)]
pub enum MessageParseError {
  /// Reached end of stream before parsing was finished
  UnexpectedEndOfStream,

  /// Version was something other than 1
  InvalidVersion(u8),

  /// Token length was > 8
  InvalidTokenLength(u8),

  /// Error parsing option
  OptParseError(OptParseError),

  /// A payload marker (`0xFF`) was not followed by any payload bytes
  EmptyPayloadAfterMarker,

  /// The message type is invalid (see [`Type`](crate::Type) for information & valid values)
  InvalidType(u8),

  /// The datagram was longer than the receiver accepts, so it was cut short
  /// and may be missing the end of its payload
  TooLong(usize),
}

impl MessageParseError {
  /// Shorthand for [`MessageParseError::UnexpectedEndOfStream`]
  pub fn eof() -> Self {
    Self::UnexpectedEndOfStream
  }
}

impl fmt::Display for MessageParseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::UnexpectedEndOfStream => write!(f, "message ended unexpectedly"),
      | Self::InvalidVersion(v) => write!(f, "unsupported CoAP version {}", v),
      | Self::InvalidTokenLength(n) => write!(f, "token length {} exceeds 8 bytes", n),
      | Self::OptParseError(e) => write!(f, "invalid option: {}", e),
      | Self::EmptyPayloadAfterMarker => write!(f, "payload marker with no payload"),
      | Self::InvalidType(t) => write!(f, "invalid message type {}", t),
      | Self::TooLong(max) => write!(f, "message exceeds {} bytes", max),
    }
  }
}

#[cfg(feature = "std")]
impl std::error::Error for MessageParseError {}
