use std_alloc::collections::BTreeMap;
use std_alloc::vec::Vec;

use crate::from_bytes::TryConsumeBytes;
use crate::Cursor;

/// Option numbers & content formats registered by RFC7252
pub mod known;

/// Option parsing errors
pub mod parse_error;
pub use parse_error::*;

/// Collection of the options in a message, keyed by option number.
///
/// Options may repeat (e.g. one Uri-Path option per path segment),
/// so each number maps to its values in the order they appear on the wire.
///
/// Using an ordered map means serializing is a single pass:
/// options must be written in ascending order of their numbers.
pub type OptionMap = BTreeMap<OptNumber, Vec<OptValue>>;

pub(crate) fn parse_opt_len_or_delta<A: AsRef<[u8]>>(head: u8,
                                                     bytes: &mut Cursor<A>,
                                                     reserved_err: OptParseError)
                                                     -> Result<u32, OptParseError> {
  match head {
    | 13 => {
      let n = bytes.next().ok_or_else(OptParseError::eof)?;
      Ok((n as u32) + 13)
    },
    | 14 => match bytes.take_exact(2) {
      | Some(&[a, b]) => Ok((u16::from_be_bytes([a, b]) as u32) + 269),
      | _ => Err(OptParseError::eof()),
    },
    | 15 => Err(reserved_err),
    | _ => Ok(head as u32),
  }
}

/// # Option Numbers
/// Identifies which option is being set (e.g. Content-Format has a Number of 12).
///
/// On the wire, options are stored as the difference between their number
/// and the previous option's number; this crate computes the absolute numbers
/// while parsing and the deltas while serializing.
///
/// See [RFC7252 - Option Numbers](https://datatracker.ietf.org/doc/html/rfc7252#section-5.4.6)
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct OptNumber(pub u32);

/// Whether or not an option may be ignored by a recipient that does not understand it.
///
/// See [RFC7252 - Critical/Elective](https://datatracker.ietf.org/doc/html/rfc7252#section-5.4.1)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum OptionMustBeProcessed {
  /// This option must be processed,
  /// and a response that ignores it
  /// will be rejected.
  ///
  /// Corresponds to the option being "critical"
  /// in strict CoAP terms
  Yes,
  /// This option does not _need_ to
  /// be processed,
  /// and a response that ignores it
  /// will be processed anyway.
  ///
  /// Corresponds to the option being "elective"
  /// in strict CoAP terms
  No,
}

impl OptNumber {
  /// Whether or not this option may be ignored by a server
  ///
  /// ```
  /// use mote_msg::opt::known;
  /// use mote_msg::OptionMustBeProcessed;
  ///
  /// assert_eq!(known::URI_PATH.must_be_processed(), OptionMustBeProcessed::Yes);
  /// assert_eq!(known::CONTENT_FORMAT.must_be_processed(), OptionMustBeProcessed::No);
  /// ```
  pub fn must_be_processed(&self) -> OptionMustBeProcessed {
    #[allow(clippy::wildcard_in_or_patterns)] // will only ever be 0 or 1
    match self.0 & 0b1 {
      | 1 => OptionMustBeProcessed::Yes,
      | 0 | _ => OptionMustBeProcessed::No,
    }
  }
}

/// Value of an option; an opaque byte string, a UTF-8 string,
/// or a big-endian unsigned integer depending on the option.
///
/// See [RFC7252 - Option Value Formats](https://datatracker.ietf.org/doc/html/rfc7252#section-3.2)
#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct OptValue(pub Vec<u8>);

impl OptValue {
  /// Borrow the raw bytes of this value
  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }

  /// Interpret this value as a UTF-8 string
  pub fn as_str(&self) -> Result<&str, core::str::Utf8Error> {
    core::str::from_utf8(&self.0)
  }
}

impl<'a> From<&'a str> for OptValue {
  fn from(s: &'a str) -> Self {
    OptValue(s.as_bytes().to_vec())
  }
}

impl<'a> From<&'a [u8]> for OptValue {
  fn from(b: &'a [u8]) -> Self {
    OptValue(b.to_vec())
  }
}

impl From<Vec<u8>> for OptValue {
  fn from(b: Vec<u8>) -> Self {
    OptValue(b)
  }
}

/// Size (in bytes) of a single option on the wire, given its delta and value length
pub(crate) fn opt_size(delta: u32, value_len: usize) -> usize {
  let ext = |n: usize| match n {
    | n if n >= 269 => 2,
    | n if n >= 13 => 1,
    | _ => 0,
  };

  1 + ext(delta as usize) + ext(value_len) + value_len
}

impl<Bytes: AsRef<[u8]>> TryConsumeBytes<Bytes> for OptionMap {
  type Error = OptParseError;

  /// Consume options until the payload marker (left unconsumed) or the end of the buffer
  fn try_consume_bytes(bytes: &mut Cursor<Bytes>) -> Result<Self, Self::Error> {
    let mut opts = OptionMap::new();
    let mut number = 0u32;

    loop {
      let head = match bytes.peek_exact(1).and_then(|b| b.first().copied()) {
        | None | Some(0b11111111) => break Ok(opts),
        | Some(head) => head,
      };
      bytes.next();

      let delta = parse_opt_len_or_delta(head >> 4,
                                         bytes,
                                         OptParseError::OptionDeltaReservedValue(15))?;
      let len = parse_opt_len_or_delta(head & 0b1111,
                                       bytes,
                                       OptParseError::ValueLengthReservedValue(15))?;

      number = number.checked_add(delta)
                     .ok_or(OptParseError::OptionNumberOverflow)?;

      let value = bytes.take_exact(len as usize)
                       .ok_or_else(OptParseError::eof)?;

      opts.entry(OptNumber(number))
          .or_default()
          .push(OptValue(value.to_vec()));
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(bytes: &[u8]) -> Result<OptionMap, OptParseError> {
    OptionMap::try_consume_bytes(&mut Cursor::new(bytes))
  }

  #[test]
  fn parse_repeated_uri_path() {
    // Uri-Path "s" (delta 11), Uri-Path "c" (delta 0)
    let opts = parse(&[0b1011_0001, b's', 0b0000_0001, b'c']).unwrap();

    assert_eq!(opts.get(&known::URI_PATH),
               Some(&vec![OptValue(b"s".to_vec()), OptValue(b"c".to_vec())]));
  }

  #[test]
  fn parse_extended_delta_and_length() {
    let value = [7u8; 20];
    let bytes = [[0b1101_1101, 24 - 13, 20 - 13].as_ref(), value.as_ref()].concat();
    let opts = parse(&bytes).unwrap();

    assert_eq!(opts.get(&OptNumber(24)), Some(&vec![OptValue(value.to_vec())]));
  }

  #[test]
  fn parse_stops_at_payload_marker() {
    let mut cur = Cursor::new([0b1100_0000u8, 0xFF, 1, 2]);
    let opts = OptionMap::try_consume_bytes(&mut cur).unwrap();

    assert_eq!(opts.get(&known::CONTENT_FORMAT), Some(&vec![OptValue(vec![])]));
    assert_eq!(cur.next(), Some(0xFF));
  }

  #[test]
  fn parse_rejects_reserved_nibbles() {
    assert_eq!(parse(&[0b1111_0001, 0]),
               Err(OptParseError::OptionDeltaReservedValue(15)));
    assert_eq!(parse(&[0b0001_1111]),
               Err(OptParseError::ValueLengthReservedValue(15)));
  }

  #[test]
  fn parse_rejects_truncated_value() {
    assert_eq!(parse(&[0b1011_0011, b's']), Err(OptParseError::eof()));
    assert_eq!(parse(&[0b1101_0001]), Err(OptParseError::eof()));
  }

  #[test]
  fn size() {
    assert_eq!(opt_size(11, 1), 2);
    assert_eq!(opt_size(24, 100), 1 + 1 + 1 + 100);
    assert_eq!(opt_size(24, 300), 1 + 1 + 2 + 300);
  }
}
