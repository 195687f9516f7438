use core::fmt;
use core::str::FromStr;

use crate::net::{Endpoint, EndpointError, DEFAULT_PORT};
use crate::req::{Method, Req};

/// Errors encounterable parsing a [`Uri`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriError {
  /// The URI had no `scheme://` prefix
  MissingScheme,
  /// The scheme was something other than `coap`
  UnsupportedScheme(String),
  /// There was nothing between `coap://` and the path
  MissingHost,
  /// The host was not an IP literal
  InvalidHost(EndpointError),
  /// The port was not an integer between 0 and 65535
  InvalidPort(String),
  /// A `%` was not followed by two hex digits, or decoded to invalid utf8
  InvalidPercentEncoding(String),
  /// CoAP URIs may not have a `#fragment`
  Fragment,
}

impl fmt::Display for UriError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::MissingScheme => write!(f, "expected a coap:// URI"),
      | Self::UnsupportedScheme(s) => write!(f, "unsupported scheme {:?}, expected \"coap\"", s),
      | Self::MissingHost => write!(f, "URI has no host"),
      | Self::InvalidHost(e) => write!(f, "{}", e),
      | Self::InvalidPort(p) => write!(f, "{:?} is not a valid port", p),
      | Self::InvalidPercentEncoding(s) => write!(f, "invalid percent-encoding in {:?}", s),
      | Self::Fragment => write!(f, "coap URIs cannot have a fragment"),
    }
  }
}

impl std::error::Error for UriError {}

/// A parsed `coap://` URI
///
/// Hosts must be IP literals (IPv6 in brackets); the port defaults to 5683.
/// Path segments and query parameters are percent-decoded.
///
/// ```
/// use mote::uri::Uri;
///
/// let uri: Uri = "coap://[bbbb::1060:1213:7cca:52cc]:61618/s/c?unit=c".parse().unwrap();
///
/// assert_eq!(uri.endpoint().to_string(), "[bbbb::1060:1213:7cca:52cc]:61618");
/// assert_eq!(uri.path(), &["s", "c"]);
/// assert_eq!(uri.query(), &["unit=c"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
  endpoint: Endpoint,
  path: Vec<String>,
  query: Vec<String>,
}

impl Uri {
  /// The endpoint requests to this URI are sent to
  pub fn endpoint(&self) -> Endpoint {
    self.endpoint
  }

  /// Decoded path segments
  pub fn path(&self) -> &[String] {
    &self.path
  }

  /// Decoded query parameters
  pub fn query(&self) -> &[String] {
    &self.query
  }

  /// Build a request for the path & query of this URI
  ///
  /// ```
  /// use mote::req::Method;
  /// use mote::uri::Uri;
  ///
  /// let uri: Uri = "coap://10.0.0.7/s/a%2Fb".parse().unwrap();
  /// let req = uri.req(Method::GET);
  ///
  /// assert_eq!(req.path().unwrap(), vec!["s", "a/b"]);
  /// ```
  pub fn req(&self, method: Method) -> Req {
    let mut req = Req::new(method, "");
    req.set_path_segments(self.path.iter().map(String::as_str));
    self.query.iter().for_each(|q| req.add_query(q));
    req
  }
}

fn percent_decode(s: &str) -> Result<String, UriError> {
  let invalid = || UriError::InvalidPercentEncoding(s.to_string());
  let hex = |b: u8| (b as char).to_digit(16).map(|d| d as u8);

  let mut out = Vec::with_capacity(s.len());
  let mut bytes = s.bytes();

  while let Some(b) = bytes.next() {
    if b == b'%' {
      let hi = bytes.next().and_then(hex).ok_or_else(invalid)?;
      let lo = bytes.next().and_then(hex).ok_or_else(invalid)?;
      out.push(hi << 4 | lo);
    } else {
      out.push(b);
    }
  }

  String::from_utf8(out).map_err(|_| invalid())
}

fn split_decoded(s: &str, sep: char) -> Result<Vec<String>, UriError> {
  s.split(sep)
   .filter(|seg| !seg.is_empty())
   .map(percent_decode)
   .collect()
}

fn parse_authority(authority: &str) -> Result<Endpoint, UriError> {
  if authority.is_empty() {
    return Err(UriError::MissingHost);
  }

  let (host, port) = match authority.strip_prefix('[') {
    | Some(bracketed) => {
      let (host, rest) = bracketed.split_once(']')
                                  .ok_or_else(|| UriError::InvalidHost(EndpointError::InvalidAddress(authority.to_string())))?;
      match rest {
        | "" => (host, None),
        | _ => match rest.strip_prefix(':') {
          | Some(port) => (host, Some(port)),
          | None => return Err(UriError::InvalidPort(rest.to_string())),
        },
      }
    },
    | None => match authority.split_once(':') {
      | Some((host, port)) => (host, Some(port)),
      | None => (authority, None),
    },
  };

  if host.is_empty() {
    return Err(UriError::MissingHost);
  }

  let port = match port {
    | None | Some("") => DEFAULT_PORT,
    | Some(port) => port.parse::<u16>()
                        .map_err(|_| UriError::InvalidPort(port.to_string()))?,
  };

  Endpoint::parse(host, port).map_err(UriError::InvalidHost)
}

impl FromStr for Uri {
  type Err = UriError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (scheme, rest) = s.split_once("://").ok_or(UriError::MissingScheme)?;
    if !scheme.eq_ignore_ascii_case("coap") {
      return Err(UriError::UnsupportedScheme(scheme.to_string()));
    }

    if rest.contains('#') {
      return Err(UriError::Fragment);
    }

    let (rest, query) = match rest.split_once('?') {
      | Some((rest, query)) => (rest, query),
      | None => (rest, ""),
    };

    let (authority, path) = match rest.find('/') {
      | Some(ix) => rest.split_at(ix),
      | None => (rest, ""),
    };

    Ok(Uri { endpoint: parse_authority(authority)?,
             path: split_decoded(path, '/')?,
             query: split_decoded(query, '&')? })
  }
}
