use std_alloc::string::String;
use std_alloc::vec;
use std_alloc::vec::Vec;

/// Message Code
pub mod code;

/// Message parsing errors
pub mod parse_error;

/// Message ID
pub mod id;

/// Message Options
pub mod opt;

/// Message Type
pub mod ty;

/// Message Token
pub mod token;

/// Message Version
pub mod ver;

pub use code::*;
pub use id::*;
pub use opt::*;
pub use parse_error::*;
pub use token::*;
pub use ty::*;
pub use ver::*;

use crate::from_bytes::TryConsumeBytes;
use crate::{Cursor, TryFromBytes};

/// # Payload
/// Everything after the payload marker (`0xFF`) up to the end of the datagram.
///
/// An empty payload is never written with a marker, and a marker
/// followed by nothing is a parse error.
///
/// See [RFC7252 - Message Format](https://datatracker.ietf.org/doc/html/rfc7252#section-3)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Payload(pub Vec<u8>);

/// Struct representing the first byte of a message.
///
/// ```text
/// CoAP version
/// |
/// |  Message type (request, response, empty)
/// |  |
/// |  |  Length of token, in bytes. (4-bit integer)
/// |  |  |
/// vv vv vvvv
/// 01 00 0000
/// ```
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub(crate) struct Byte1 {
  pub(crate) ver: Version,
  pub(crate) ty: Type,
  pub(crate) tkl: u8,
}

impl TryFrom<u8> for Byte1 {
  type Error = MessageParseError;

  fn try_from(b: u8) -> Result<Self, Self::Error> {
    let ver = b >> 6; // bits 0 & 1
    let ty = b >> 4 & 0b11; // bits 2 & 3
    let tkl = b & 0b1111u8; // last 4 bits

    if ver != Version::V1.0 {
      return Err(MessageParseError::InvalidVersion(ver));
    }

    Ok(Byte1 { ver: Version(ver),
               ty: Type::try_from(ty)?,
               tkl })
  }
}

/// The fixed-size part of a message plus its token.
///
/// This is everything needed to correlate an incoming datagram
/// with an outstanding request, and can be parsed from a datagram
/// whose options or payload are malformed.
///
/// ```
/// use mote_msg::{Header, Id, TryFromBytes, Type};
///
/// // ACK 2.05, id 0x0102, token [9]; followed by a reserved option nibble
/// let bytes = [0b0110_0001u8, 0b010_00101, 1, 2, 9, 0xF0];
/// let header = Header::try_from_bytes(&bytes).unwrap();
///
/// assert_eq!(header.ty, Type::Ack);
/// assert_eq!(header.id, Id(0x0102));
/// assert_eq!(header.token.as_bytes(), &[9]);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Header {
  /// see [`Version`]
  pub ver: Version,
  /// see [`Type`]
  pub ty: Type,
  /// see [`Code`]
  pub code: Code,
  /// see [`Id`]
  pub id: Id,
  /// see [`Token`]
  pub token: Token,
}

impl<Bytes: AsRef<[u8]>> TryConsumeBytes<Bytes> for Header {
  type Error = MessageParseError;

  fn try_consume_bytes(bytes: &mut Cursor<Bytes>) -> Result<Self, Self::Error> {
    let Byte1 { tkl, ty, ver } = bytes.next().ok_or_else(MessageParseError::eof)?.try_into()?;

    if tkl > 8 {
      return Err(MessageParseError::InvalidTokenLength(tkl));
    }

    let code: Code = bytes.next().ok_or_else(MessageParseError::eof)?.into();
    let id = Id::try_consume_bytes(bytes)?;

    let token = bytes.take_exact(tkl as usize)
                     .and_then(Token::try_from_slice)
                     .ok_or_else(MessageParseError::eof)?;

    Ok(Header { ver,
                ty,
                code,
                id,
                token })
  }
}

impl<Bytes: AsRef<[u8]>> TryFromBytes<Bytes> for Header {
  type Error = MessageParseError;

  fn try_from_bytes(bytes: Bytes) -> Result<Self, Self::Error> {
    Header::try_consume_bytes(&mut Cursor::new(bytes))
  }
}

/// # CoAP Messages
/// This struct provides a high-level API for manipulating requests & responses,
/// while still being cheaply serializable to & from the byte layout of CoAP messages on the wire.
///
/// ## Options
/// Options are stored in an [`OptionMap`] keyed by absolute option number;
/// repeated options (like one Uri-Path per path segment) keep their wire order.
///
/// ## Constructing
/// [`Message::new`] builds a message with no options or payload;
/// [`Message::ack`] and [`Message::reset`] build the empty replies to a received message.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Message {
  /// see [`Id`] for details
  pub id: Id,
  /// see [`Type`] for details
  pub ty: Type,
  /// see [`Version`] for details
  pub ver: Version,
  /// see [`Token`] for details
  pub token: Token,
  /// see [`Code`] for details
  pub code: Code,
  /// see [`opt::OptionMap`] for details
  pub opts: OptionMap,
  /// see [`Payload`]
  pub payload: Payload,
}

impl Message {
  /// Create a new message with no options and no payload
  pub fn new(ty: Type, code: Code, id: Id, token: Token) -> Self {
    Self { id,
           ty,
           code,
           token,
           ver: Version::default(),
           opts: OptionMap::new(),
           payload: Payload(Vec::new()) }
  }

  /// Copy the header out of this message
  pub fn header(&self) -> Header {
    Header { ver: self.ver,
             ty: self.ty,
             code: self.code,
             id: self.id,
             token: self.token }
  }

  /// Create an empty ACK acknowledging this message.
  ///
  /// Empty messages carry no token, so only the ID is echoed.
  ///
  /// ```
  /// use mote_msg::*;
  ///
  /// let rep = Message::new(Type::Con, Code::new(2, 5), Id(3), Token::opaque(&[]));
  /// let ack = rep.ack();
  ///
  /// assert_eq!(ack.ty, Type::Ack);
  /// assert_eq!(ack.id, Id(3));
  /// assert_eq!(ack.code, Code::EMPTY);
  /// assert!(ack.token.is_empty());
  /// ```
  pub fn ack(&self) -> Message {
    Message::new(Type::Ack, Code::EMPTY, self.id, Token::empty())
  }

  /// Create an empty RST rejecting this message
  pub fn reset(&self) -> Message {
    Message::new(Type::Reset, Code::EMPTY, self.id, Token::empty())
  }

  /// Whether this message has the EMPTY code (0.00)
  pub fn is_empty(&self) -> bool {
    self.code.kind() == CodeKind::Empty
  }

  /// Get all values of an option
  pub fn get(&self, n: OptNumber) -> Option<&Vec<OptValue>> {
    self.opts.get(&n)
  }

  /// Get the first value of an option
  pub fn get_first(&self, n: OptNumber) -> Option<&OptValue> {
    self.get(n).and_then(|vals| vals.first())
  }

  /// Append a value to an option, keeping any existing values
  pub fn add_opt(&mut self, n: OptNumber, v: impl Into<OptValue>) {
    self.opts.entry(n).or_default().push(v.into());
  }

  /// Replace all values of an option with a single value,
  /// yielding the values that were there before.
  pub fn set_opt(&mut self, n: OptNumber, v: impl Into<OptValue>) -> Option<Vec<OptValue>> {
    self.opts.insert(n, vec![v.into()])
  }

  /// Remove all values of an option
  pub fn remove(&mut self, n: OptNumber) -> Option<Vec<OptValue>> {
    self.opts.remove(&n)
  }

  /// Get the Uri-Path segments of this message
  pub fn path(&self) -> Result<Vec<&str>, core::str::Utf8Error> {
    self.get(opt::known::URI_PATH)
        .map(|segs| segs.iter().map(OptValue::as_str).collect())
        .unwrap_or_else(|| Ok(Vec::new()))
  }

  /// Get the Uri-Path segments of this message joined with `/`
  pub fn path_string(&self) -> Result<String, core::str::Utf8Error> {
    self.path().map(|segs| segs.join("/"))
  }

  /// Set the Uri-Path of this message from a `/`-separated path.
  ///
  /// Leading, trailing and repeated slashes are ignored;
  /// `"/s/c/"` and `"s//c"` both yield the segments `["s", "c"]`.
  ///
  /// ```
  /// use mote_msg::*;
  ///
  /// let mut msg = Message::new(Type::Con, Code::new(0, 1), Id(1), Token::empty());
  /// msg.set_path("/s/c/");
  /// assert_eq!(msg.path().unwrap(), vec!["s", "c"]);
  ///
  /// msg.set_path("");
  /// assert!(msg.path().unwrap().is_empty());
  /// ```
  pub fn set_path(&mut self, path: &str) {
    self.set_path_segments(path.split('/').filter(|s| !s.is_empty()));
  }

  /// Set the Uri-Path of this message, one option per segment
  pub fn set_path_segments<'a>(&mut self, segs: impl IntoIterator<Item = &'a str>) {
    self.remove(opt::known::URI_PATH);
    segs.into_iter()
        .for_each(|seg| self.add_opt(opt::known::URI_PATH, seg));
  }

  /// Get the Uri-Query parameters of this message
  pub fn query(&self) -> Result<Vec<&str>, core::str::Utf8Error> {
    self.get(opt::known::URI_QUERY)
        .map(|qs| qs.iter().map(OptValue::as_str).collect())
        .unwrap_or_else(|| Ok(Vec::new()))
  }

  /// Add a Uri-Query parameter (e.g. `"rt=temperature"`)
  pub fn add_query(&mut self, query: &str) {
    self.add_opt(opt::known::URI_QUERY, query);
  }

  /// Get the Content-Format of this message
  pub fn content_format(&self) -> Option<opt::known::ContentFormat> {
    self.get_first(opt::known::CONTENT_FORMAT)
        .and_then(|v| opt::known::ContentFormat::from_bytes(v.as_bytes()))
  }

  /// Set the Content-Format of this message
  pub fn set_content_format(&mut self, format: opt::known::ContentFormat) {
    self.set_opt(opt::known::CONTENT_FORMAT, format.bytes());
  }
}

impl<Bytes: AsRef<[u8]>> TryFromBytes<Bytes> for Message {
  type Error = MessageParseError;

  fn try_from_bytes(bytes: Bytes) -> Result<Self, Self::Error> {
    let mut bytes = Cursor::new(bytes);

    let Header { ver,
                 ty,
                 code,
                 id,
                 token, } = Header::try_consume_bytes(&mut bytes)?;

    let opts = OptionMap::try_consume_bytes(&mut bytes).map_err(MessageParseError::OptParseError)?;

    let payload = match bytes.next() {
      | None => Vec::new(),
      | Some(_marker) if bytes.is_exhausted() => return Err(MessageParseError::EmptyPayloadAfterMarker),
      | Some(_marker) => bytes.take_until_end().to_vec(),
    };

    Ok(Message { id,
                 ty,
                 ver,
                 code,
                 token,
                 opts,
                 payload: Payload(payload) })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_msg() {
    let (expect, msg) = crate::test_msg();
    assert_eq!(Message::try_from_bytes(&msg).unwrap(), expect)
  }

  #[test]
  fn parse_byte1() {
    let byte = 0b_01_10_0011u8;
    let byte = Byte1::try_from(byte).unwrap();
    assert_eq!(byte,
               Byte1 { ver: Version(1),
                       ty: Type::Ack,
                       tkl: 3 })
  }

  #[test]
  fn parse_id() {
    let mut id_bytes = Cursor::new(34u16.to_be_bytes());
    let id = Id::try_consume_bytes(&mut id_bytes).unwrap();
    assert_eq!(id, Id(34));
  }

  #[test]
  fn reject_bad_version() {
    assert_eq!(Message::try_from_bytes([0b10_00_0000u8, 0, 0, 1]),
               Err(MessageParseError::InvalidVersion(2)));
  }

  #[test]
  fn reject_long_token() {
    assert_eq!(Message::try_from_bytes([0b01_00_1001u8, 0, 0, 1]),
               Err(MessageParseError::InvalidTokenLength(9)));
  }

  #[test]
  fn reject_short_header() {
    assert_eq!(Message::try_from_bytes([0b01_00_0000u8, 0, 0]),
               Err(MessageParseError::eof()));
    // token length says 2, only 1 byte follows
    assert_eq!(Header::try_from_bytes([0b01_00_0010u8, 0, 0, 1, 7]),
               Err(MessageParseError::eof()));
  }

  #[test]
  fn reject_marker_without_payload() {
    assert_eq!(Message::try_from_bytes([0b01_10_0000u8, 0b010_00101, 0, 1, 0xFF]),
               Err(MessageParseError::EmptyPayloadAfterMarker));
  }

  #[test]
  fn parse_empty_ack() {
    let msg = Message::try_from_bytes([0b01_10_0000u8, 0, 0xAB, 0xCD]).unwrap();
    assert_eq!(msg.ty, Type::Ack);
    assert_eq!(msg.id, Id(0xABCD));
    assert!(msg.is_empty());
    assert!(msg.token.is_empty());
    assert!(msg.payload.0.is_empty());
  }

  #[test]
  fn header_survives_bad_options() {
    let bytes = [0b01_10_0001u8, 0b010_00101, 0, 7, 42, 0b1111_0000];

    assert!(Message::try_from_bytes(bytes).is_err());
    let header = Header::try_from_bytes(bytes).unwrap();
    assert_eq!(header.id, Id(7));
    assert_eq!(header.token.as_bytes(), &[42]);
  }

  #[test]
  fn options_helpers() {
    let mut msg = Message::new(Type::Con, Code::new(0, 1), Id(1), Token::empty());
    msg.set_path("a/b");
    msg.add_query("x=1");
    msg.set_content_format(opt::known::ContentFormat::Json);

    assert_eq!(msg.path_string().unwrap(), "a/b");
    assert_eq!(msg.query().unwrap(), vec!["x=1"]);
    assert_eq!(msg.content_format(), Some(opt::known::ContentFormat::Json));

    msg.set_path_segments(["c"]);
    assert_eq!(msg.path().unwrap(), vec!["c"]);
  }
}
