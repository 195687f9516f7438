//! Option numbers registered by RFC7252, and the
//! [Content-Format](https://datatracker.ietf.org/doc/html/rfc7252#section-12.3) registry.

use std_alloc::vec::Vec;

use super::OptNumber;

/// If-Match (1)
pub const IF_MATCH: OptNumber = OptNumber(1);
/// Uri-Host (3)
pub const URI_HOST: OptNumber = OptNumber(3);
/// ETag (4)
pub const ETAG: OptNumber = OptNumber(4);
/// If-None-Match (5)
pub const IF_NONE_MATCH: OptNumber = OptNumber(5);
/// Uri-Port (7)
pub const URI_PORT: OptNumber = OptNumber(7);
/// Location-Path (8)
pub const LOCATION_PATH: OptNumber = OptNumber(8);
/// Uri-Path (11); one option per path segment
pub const URI_PATH: OptNumber = OptNumber(11);
/// Content-Format (12)
pub const CONTENT_FORMAT: OptNumber = OptNumber(12);
/// Max-Age (14)
pub const MAX_AGE: OptNumber = OptNumber(14);
/// Uri-Query (15); one option per `key=value` argument
pub const URI_QUERY: OptNumber = OptNumber(15);
/// Accept (17)
pub const ACCEPT: OptNumber = OptNumber(17);
/// Location-Query (20)
pub const LOCATION_QUERY: OptNumber = OptNumber(20);
/// Proxy-Uri (35)
pub const PROXY_URI: OptNumber = OptNumber(35);
/// Proxy-Scheme (39)
pub const PROXY_SCHEME: OptNumber = OptNumber(39);
/// Size1 (60)
pub const SIZE1: OptNumber = OptNumber(60);

/// Content-Format
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentFormat {
  /// `text/plain; charset=utf-8`
  Text,
  /// `application/link-format`
  LinkFormat,
  /// `application/xml`
  Xml,
  /// `application/octet-stream`
  OctetStream,
  /// `application/exi`
  Exi,
  /// `application/json`
  Json,
  /// `application/cbor`
  Cbor,
  /// Another content format
  Other(u16),
}

impl ContentFormat {
  /// Encode as an option value; a minimal-length big-endian unsigned integer
  ///
  /// ```
  /// use mote_msg::opt::known::ContentFormat;
  ///
  /// assert_eq!(ContentFormat::Text.bytes(), Vec::<u8>::new());
  /// assert_eq!(ContentFormat::Json.bytes(), vec![50]);
  /// assert_eq!(ContentFormat::Other(1000).bytes(), vec![0x03, 0xE8]);
  /// ```
  pub fn bytes(&self) -> Vec<u8> {
    encode_uint(u16::from(self) as u32)
  }

  /// Decode from an option value
  pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
    decode_uint(bytes).and_then(|n| u16::try_from(n).ok())
                      .map(ContentFormat::from)
  }
}

impl<'a> From<&'a ContentFormat> for u16 {
  fn from(f: &'a ContentFormat) -> Self {
    use ContentFormat::*;
    match *f {
      | Text => 0,
      | LinkFormat => 40,
      | Xml => 41,
      | OctetStream => 42,
      | Exi => 47,
      | Json => 50,
      | Cbor => 60,
      | Other(n) => n,
    }
  }
}

impl From<u16> for ContentFormat {
  fn from(n: u16) -> Self {
    use ContentFormat::*;
    match n {
      | 0 => Text,
      | 40 => LinkFormat,
      | 41 => Xml,
      | 42 => OctetStream,
      | 47 => Exi,
      | 50 => Json,
      | 60 => Cbor,
      | n => Other(n),
    }
  }
}

/// Encode an option value of type `uint` (RFC7252 section 3.2),
/// dropping leading zero bytes.
pub fn encode_uint(n: u32) -> Vec<u8> {
  n.to_be_bytes()
   .into_iter()
   .skip_while(|b| *b == 0)
   .collect()
}

/// Decode an option value of type `uint`, yielding `None`
/// if it is longer than 4 bytes.
pub fn decode_uint(bytes: &[u8]) -> Option<u32> {
  if bytes.len() > 4 {
    return None;
  }

  Some(bytes.iter().fold(0u32, |n, b| (n << 8) | *b as u32))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn uint_roundtrip() {
    assert_eq!(encode_uint(0), Vec::<u8>::new());
    assert_eq!(encode_uint(255), vec![255]);
    assert_eq!(encode_uint(256), vec![1, 0]);
    assert_eq!(decode_uint(&[]), Some(0));
    assert_eq!(decode_uint(&[1, 0]), Some(256));
    assert_eq!(decode_uint(&[1, 0, 0, 0, 0]), None);
  }

  #[test]
  fn content_format() {
    assert_eq!(ContentFormat::from_bytes(&[]), Some(ContentFormat::Text));
    assert_eq!(ContentFormat::from_bytes(&[50]), Some(ContentFormat::Json));
    assert_eq!(ContentFormat::from_bytes(&[0x03, 0xE8]),
               Some(ContentFormat::Other(1000)));
  }
}
