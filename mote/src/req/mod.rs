use mote_msg::opt::known::ContentFormat;
use mote_msg::{Id, Message, OptNumber, OptValue, Payload, Token, Type};

/// Request methods
pub mod method;

#[doc(inline)]
pub use method::Method;

/// A CoAP request
///
/// Requests are confirmable unless made [`non`](Req::non).
/// The message ID and token are assigned by the client when the request is sent.
///
/// ```
/// use mote::req::{Method, Req};
/// use mote_msg::Type;
///
/// let mut req = Req::post("s/led");
/// req.set_payload("on");
///
/// assert_eq!(req.method(), Method::POST);
/// assert_eq!(req.msg_type(), Type::Con);
/// assert_eq!(req.path().unwrap(), vec!["s", "led"]);
/// assert_eq!(req.payload_str().unwrap(), "on");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Req(Message);

impl Req {
  /// Create a request
  pub fn new(method: Method, path: impl AsRef<str>) -> Self {
    let mut msg = Message::new(Type::Con, method.0, Id(0), Token::empty());
    msg.set_path(path.as_ref());

    Self(msg)
  }

  /// Create a new GET request
  ///
  /// ```
  /// use mote::req::Req;
  ///
  /// let request = Req::get("s/c");
  /// ```
  pub fn get(path: impl AsRef<str>) -> Self {
    Self::new(Method::GET, path)
  }

  /// Create a new POST request
  pub fn post(path: impl AsRef<str>) -> Self {
    Self::new(Method::POST, path)
  }

  /// Create a new PUT request
  pub fn put(path: impl AsRef<str>) -> Self {
    Self::new(Method::PUT, path)
  }

  /// Create a new DELETE request
  pub fn delete(path: impl AsRef<str>) -> Self {
    Self::new(Method::DELETE, path)
  }

  /// An empty confirmable message; sending one to an endpoint
  /// provokes a Reset, which makes for a cheap liveness check ("CoAP ping").
  pub(crate) fn ping() -> Self {
    Self(Message::new(Type::Con, Method::EMPTY.0, Id(0), Token::empty()))
  }

  /// Whether this is a ping
  pub(crate) fn is_ping(&self) -> bool {
    self.0.is_empty()
  }

  /// Make this request non-confirmable.
  ///
  /// NON requests are sent once and never retransmitted.
  pub fn non(&mut self) {
    self.0.ty = Type::Non;
  }

  /// Whether this request is confirmable
  pub fn is_con(&self) -> bool {
    self.0.ty == Type::Con
  }

  /// Get the request method
  pub fn method(&self) -> Method {
    Method(self.0.code)
  }

  /// Get the request path's segments
  pub fn path(&self) -> Result<Vec<&str>, core::str::Utf8Error> {
    self.0.path()
  }

  /// Replace the request path with already-split segments,
  /// which unlike [`Req::new`]'s path may contain `/`.
  pub fn set_path_segments<'a>(&mut self, segments: impl IntoIterator<Item = &'a str>) {
    self.0.set_path_segments(segments);
  }

  /// Get the request type (confirmable, non-confirmable)
  pub fn msg_type(&self) -> Type {
    self.0.ty
  }

  /// Get the message ID of this request; zero until it is sent.
  pub fn msg_id(&self) -> Id {
    self.0.id
  }

  /// Get the token of this request; empty until it is sent.
  pub fn msg_token(&self) -> Token {
    self.0.token
  }

  pub(crate) fn set_msg_id(&mut self, id: Id) {
    self.0.id = id;
  }

  pub(crate) fn set_msg_token(&mut self, token: Token) {
    self.0.token = token;
  }

  /// Add a Uri-Query parameter, e.g. `"unit=c"`
  pub fn add_query(&mut self, query: impl AsRef<str>) {
    self.0.add_query(query.as_ref());
  }

  /// Set the Content-Format of the payload
  pub fn set_content_format(&mut self, format: ContentFormat) {
    self.0.set_content_format(format);
  }

  /// Add a value to an arbitrary option
  pub fn add_option(&mut self, number: OptNumber, value: impl Into<OptValue>) {
    self.0.add_opt(number, value);
  }

  /// Get the values of an option
  pub fn get_option(&self, number: OptNumber) -> Option<&Vec<OptValue>> {
    self.0.get(number)
  }

  /// Set the payload of this request
  pub fn set_payload(&mut self, payload: impl AsRef<[u8]>) {
    self.0.payload = Payload(payload.as_ref().to_vec());
  }

  /// Get the payload's raw bytes
  pub fn payload(&self) -> &[u8] {
    &self.0.payload.0
  }

  /// Get the payload as a utf8 string
  pub fn payload_str(&self) -> Result<&str, core::str::Utf8Error> {
    core::str::from_utf8(self.payload())
  }

  /// Borrow the underlying message
  pub fn msg(&self) -> &Message {
    &self.0
  }
}

impl AsRef<Message> for Req {
  fn as_ref(&self) -> &Message {
    &self.0
  }
}

impl From<Req> for Message {
  fn from(req: Req) -> Self {
    req.0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn build_requests() {
    let mut req = Req::get("/s/c");
    assert!(req.is_con());
    assert_eq!(req.method(), Method::GET);
    assert_eq!(req.path().unwrap(), vec!["s", "c"]);
    assert!(req.payload().is_empty());

    req.non();
    assert_eq!(req.msg_type(), Type::Non);

    req.add_query("unit=c");
    assert_eq!(req.msg().query().unwrap(), vec!["unit=c"]);

    assert_eq!(Req::delete("x").method(), Method::DELETE);
    assert_eq!(Req::put("x").method(), Method::PUT);
  }

  #[test]
  fn ping_is_empty() {
    let ping = Req::ping();
    assert!(ping.is_ping());
    assert!(ping.is_con());
    assert!(ping.msg().opts.is_empty());
    assert!(!Req::get("").is_ping());
  }
}
