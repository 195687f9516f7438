use mote_msg::opt::known::ContentFormat;
use mote_msg::{Code, Id, Message, Token, Type};

/// Response codes
pub mod code;

/// A CoAP response
///
/// ```
/// use mote::resp::{code, Resp};
/// use mote_msg::{Id, Message, Payload, Token, Type};
///
/// let mut msg = Message::new(Type::Ack, code::CONTENT, Id(1), Token::empty());
/// msg.payload = Payload(b"21.5".to_vec());
///
/// let resp = Resp::from(msg);
/// assert_eq!(resp.code(), code::CONTENT);
/// assert_eq!(resp.payload_string().unwrap(), "21.5");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resp(Message);

impl Resp {
  /// Get the response code
  pub fn code(&self) -> Code {
    self.0.code
  }

  /// Whether the response code is in the 2.xx (Success) class
  pub fn is_success(&self) -> bool {
    self.0.code.is_success()
  }

  /// Get the payload's raw bytes
  pub fn payload(&self) -> &[u8] {
    &self.0.payload.0
  }

  /// Take the payload out of this response
  pub fn into_payload(self) -> Vec<u8> {
    self.0.payload.0
  }

  /// Get the payload as a utf8 string
  pub fn payload_str(&self) -> Result<&str, core::str::Utf8Error> {
    core::str::from_utf8(self.payload())
  }

  /// Copy the payload into an owned utf8 string
  pub fn payload_string(&self) -> Result<String, core::str::Utf8Error> {
    self.payload_str().map(String::from)
  }

  /// Get the Content-Format of the payload, if the server declared one
  pub fn content_format(&self) -> Option<ContentFormat> {
    self.0.content_format()
  }

  /// Get the message type; `Ack` for piggybacked responses
  pub fn msg_type(&self) -> Type {
    self.0.ty
  }

  /// Get the message ID
  pub fn msg_id(&self) -> Id {
    self.0.id
  }

  /// Get the token, which matches the token of the request
  pub fn token(&self) -> Token {
    self.0.token
  }

  /// Borrow the underlying message
  pub fn msg(&self) -> &Message {
    &self.0
  }
}

impl From<Message> for Resp {
  fn from(msg: Message) -> Self {
    Self(msg)
  }
}

impl From<Resp> for Message {
  fn from(resp: Resp) -> Self {
    resp.0
  }
}

impl AsRef<Message> for Resp {
  fn as_ref(&self) -> &Message {
    &self.0
  }
}

#[cfg(test)]
mod tests {
  use mote_msg::Payload;

  use super::*;

  #[test]
  fn payload_accessors() {
    let mut msg = Message::new(Type::Ack, code::NOT_FOUND, Id(7), Token::empty());
    msg.payload = Payload(vec![0xff, 0xfe]);
    let resp = Resp::from(msg);

    assert!(!resp.is_success());
    assert_eq!(resp.payload(), &[0xff, 0xfe]);
    assert!(resp.payload_str().is_err());
    assert_eq!(resp.msg_id(), Id(7));
    assert_eq!(resp.into_payload(), vec![0xff, 0xfe]);
  }
}
