use mote_msg::Message;

use crate::resp::code::code_to_human;

/// One-line description of a message, e.g. `"Response: Ack 2.05 Content with 2 byte payload"`
pub(crate) fn msg_summary(msg: &Message) -> String {
  format!("{:?}: {:?} {} with {} byte payload",
          msg.code.kind(),
          msg.ty,
          code_to_human(msg.code),
          msg.payload.0.len())
}

#[cfg(test)]
mod tests {
  use mote_msg::{Code, Id, Payload, Token, Type};

  use super::*;

  #[test]
  fn summary() {
    let mut msg = Message::new(Type::Ack, Code::new(2, 5), Id(1), Token::empty());
    msg.payload = Payload(b"OK".to_vec());

    assert_eq!(msg_summary(&msg),
               "Response: Ack 2.05 Content with 2 byte payload");
    assert_eq!(msg_summary(&Message::new(Type::Reset, Code::EMPTY, Id(1), Token::empty())),
               "Empty: Reset 0.00 Empty with 0 byte payload");
  }
}
