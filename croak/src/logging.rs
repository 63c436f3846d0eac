use croak_msg::Message;

/// One-line digest of a message for log lines.
pub(crate) fn msg_summary(msg: &Message) -> String {
  format!("{:?} {} (id {}, token {}b, payload {}b)",
          msg.ty,
          msg.code,
          msg.id.0,
          msg.token.len(),
          msg.payload.0.len())
}

#[cfg(test)]
mod tests {
  use croak_msg::{Code, Id, Message, Token, Type};

  use super::*;

  #[test]
  fn summary_reads_like_a_log_line() {
    let msg = Message::new(Type::Con, Code::GET, Id(7), Token::EMPTY);
    assert_eq!(msg_summary(&msg), "Con 0.01 (id 7, token 0b, payload 0b)");
  }
}
