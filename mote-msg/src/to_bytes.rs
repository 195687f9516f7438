use core::fmt;

use std_alloc::vec::Vec;
use tinyvec::ArrayVec;

use crate::msg::opt::opt_size;
use crate::*;

/// Largest value representable by an option delta or length
/// (a 14 nibble followed by two extended bytes)
const MAX_EXTENDED: usize = 65535 + 269;

/// Trait allowing fallible conversion into bytes
pub trait TryIntoBytes {
  /// Error type yielded if conversion fails
  type Error;

  /// Try to convert into a byte buffer
  ///
  /// ```
  /// use mote_msg::*;
  ///
  /// let msg = Message::new(Type::Con, Code::new(0, 1), Id(1), Token::empty());
  /// let bytes: Vec<u8> = msg.try_into_bytes().unwrap();
  ///
  /// assert_eq!(bytes, vec![0b0100_0000, 0b0000_0001, 0, 1]);
  /// ```
  fn try_into_bytes(self) -> Result<Vec<u8>, Self::Error>;
}

/// Errors encounterable serializing to bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageToBytesError {
  /// The message does not fit in the datagram size it must be sent in
  TooLong {
    /// Maximum size of the datagram
    capacity: usize,
    /// Size of the serialized message
    size: usize,
  },
  /// The gap between two consecutive option numbers cannot be encoded
  OptionNumberTooLarge(u32),
  /// An option value is longer than can be encoded
  OptionValueTooLong(usize),
}

impl fmt::Display for MessageToBytesError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::TooLong { capacity, size } => {
        write!(f, "message is {} bytes, exceeding the {} byte limit", size, capacity)
      },
      | Self::OptionNumberTooLarge(n) => write!(f, "option number {} cannot be encoded", n),
      | Self::OptionValueTooLong(n) => write!(f, "option value of {} bytes cannot be encoded", n),
    }
  }
}

#[cfg(feature = "std")]
impl std::error::Error for MessageToBytesError {}

impl Message {
  /// Size of this message on the wire
  pub fn size(&self) -> usize {
    let header_size = 4;
    let payload_size = match self.payload.0.len() {
      | 0 => 0,
      | n => n + 1,
    };

    let mut prev = 0u32;
    let opts_size: usize = self.opts
                               .iter()
                               .flat_map(|(num, vals)| vals.iter().map(move |v| (*num, v)))
                               .map(|(num, v)| {
                                 let delta = num.0.saturating_sub(prev);
                                 prev = num.0;
                                 opt_size(delta, v.0.len())
                               })
                               .sum();

    header_size + self.token.0.len() + opts_size + payload_size
  }

  /// Serialize, failing with [`MessageToBytesError::TooLong`]
  /// if the result would exceed `capacity` bytes.
  ///
  /// ```
  /// use mote_msg::*;
  ///
  /// let mut msg = Message::new(Type::Con, Code::new(0, 2), Id(1), Token::empty());
  /// msg.payload = Payload(vec![0; 16]);
  ///
  /// assert_eq!(msg.clone().try_into_bytes_within(8),
  ///            Err(MessageToBytesError::TooLong { capacity: 8, size: 21 }));
  /// assert!(msg.try_into_bytes_within(21).is_ok());
  /// ```
  pub fn try_into_bytes_within(self, capacity: usize) -> Result<Vec<u8>, MessageToBytesError> {
    let size = self.size();
    if size > capacity {
      return Err(MessageToBytesError::TooLong { capacity, size });
    }

    self.try_into_bytes()
  }
}

impl TryIntoBytes for Message {
  type Error = MessageToBytesError;

  fn try_into_bytes(self) -> Result<Vec<u8>, Self::Error> {
    (&self).try_into_bytes()
  }
}

impl<'a> TryIntoBytes for &'a Message {
  type Error = MessageToBytesError;

  fn try_into_bytes(self) -> Result<Vec<u8>, Self::Error> {
    let mut bytes = Vec::with_capacity(self.size());

    let byte1: u8 = Byte1 { tkl: self.token.0.len() as u8,
                            ver: self.ver,
                            ty: self.ty }.into();
    let code: u8 = self.code.into();
    let id: [u8; 2] = self.id.into();

    bytes.push(byte1);
    bytes.push(code);

    bytes.extend(id);
    bytes.extend(self.token.0);

    let mut prev = 0u32;
    for (num, vals) in self.opts.iter() {
      for val in vals {
        let delta = num.0 - prev;
        prev = num.0;

        if delta as usize > MAX_EXTENDED {
          return Err(MessageToBytesError::OptionNumberTooLarge(num.0));
        }
        if val.0.len() > MAX_EXTENDED {
          return Err(MessageToBytesError::OptionValueTooLong(val.0.len()));
        }

        let (del, del_bytes) = opt_len_or_delta(delta as usize);
        let (len, len_bytes) = opt_len_or_delta(val.0.len());

        bytes.push(del << 4 | len);
        bytes.extend(del_bytes.into_iter().flatten());
        bytes.extend(len_bytes.into_iter().flatten());
        bytes.extend_from_slice(&val.0);
      }
    }

    if !self.payload.0.is_empty() {
      bytes.push(0b11111111);
      bytes.extend_from_slice(&self.payload.0);
    }

    Ok(bytes)
  }
}

pub(crate) fn opt_len_or_delta(val: usize) -> (u8, Option<ArrayVec<[u8; 2]>>) {
  match val {
    | n if n >= 269 => {
      let mut bytes = ArrayVec::new();
      bytes.extend(((n - 269) as u16).to_be_bytes());
      (14, Some(bytes))
    },
    | n if n >= 13 => {
      let mut bytes = ArrayVec::new();
      bytes.push((n as u8) - 13);
      (13, Some(bytes))
    },
    | n => (n as u8, None),
  }
}

impl From<Id> for [u8; 2] {
  fn from(id: Id) -> [u8; 2] {
    id.0.to_be_bytes()
  }
}

impl From<Type> for u8 {
  fn from(t: Type) -> u8 {
    use Type::*;
    match t {
      | Con => 0,
      | Non => 1,
      | Ack => 2,
      | Reset => 3,
    }
  }
}

impl From<Byte1> for u8 {
  fn from(b: Byte1) -> u8 {
    let ver = b.ver.0 << 6;
    let ty = u8::from(b.ty) << 4;
    let tkl = b.tkl;

    ver | ty | tkl
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{assert_eqb, assert_eqb_iter};

  #[test]
  fn msg() {
    let (msg, expected) = test_msg();
    let actual = msg.try_into_bytes().unwrap();
    assert_eqb_iter!(actual, expected);
  }

  #[test]
  fn size_matches_serialized_length() {
    let (msg, expected) = test_msg();
    assert_eq!(msg.size(), expected.len());

    let mut msg = Message::new(Type::Con, Code::new(0, 1), Id(1), Token::opaque(&[]));
    msg.set_path("a/really/long/path/with/a/segment/over/thirteen/bytes");
    msg.set_opt(OptNumber(300), vec![1u8; 300]);
    assert_eq!(msg.size(), msg.clone().try_into_bytes().unwrap().len());
  }

  #[test]
  fn byte_1() {
    let byte = Byte1 { ver: Version(1),
                       ty: Type::Ack,
                       tkl: 3 };
    let actual: u8 = byte.into();
    let expected = 0b_01_10_0011u8;
    assert_eqb!(actual, expected)
  }

  #[test]
  fn code() {
    let code = Code { class: 2,
                      detail: 5 };
    let actual: u8 = code.into();
    let expected = 0b0100_0101_u8;
    assert_eqb!(actual, expected)
  }

  #[test]
  fn id() {
    let id = Id(16);
    let actual = u16::from_be_bytes(id.into());
    assert_eqb!(actual, 16)
  }

  #[test]
  fn uri_path_options() {
    let mut msg = Message::new(Type::Con, Code::new(0, 1), Id(0x1234), Token::empty());
    msg.set_path("s/c");

    let actual = msg.try_into_bytes().unwrap();
    let expected = [0b0100_0000u8, 0b0000_0001, 0x12, 0x34, 0b1011_0001, b's', 0b0000_0001, b'c'];
    assert_eqb_iter!(actual, expected);
  }

  #[test]
  fn extended_option_delta() {
    let mut msg = Message::new(Type::Con, Code::new(0, 1), Id(1), Token::empty());
    msg.set_opt(known::PROXY_URI, "x");

    let actual = msg.try_into_bytes().unwrap();
    // 35 - 13 = 22 in the extended delta byte
    assert_eqb_iter!(actual[4..], [0b1101_0001u8, 22, b'x']);
  }

  #[test]
  fn no_payload_marker() {
    let msg = Message::new(Type::Con, Code::new(0, 1), Id(1), Token::empty());

    let actual = msg.try_into_bytes().unwrap();
    assert_ne!(actual.last(), Some(&0b11111111));
  }

  #[test]
  fn value_too_long() {
    let mut msg = Message::new(Type::Con, Code::new(0, 2), Id(1), Token::empty());
    msg.set_opt(OptNumber(1), vec![0u8; MAX_EXTENDED + 1]);

    assert_eq!(msg.try_into_bytes(),
               Err(MessageToBytesError::OptionValueTooLong(MAX_EXTENDED + 1)));
  }
}
