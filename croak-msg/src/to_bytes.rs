use crate::msg::{Byte1, Message};
use crate::{MAX_MESSAGE_SIZE, MAX_PAYLOAD_SIZE};

/// Trait allowing fallible conversion into wire bytes
pub trait TryIntoBytes {
  /// Error yielded when the message cannot be put on the wire
  type Error;

  /// Try to convert into a datagram's bytes
  fn try_into_bytes(self) -> Result<Vec<u8>, Self::Error>;
}

/// Errors encounterable serializing to bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageToBytesError {
  /// The message is larger than [`MAX_MESSAGE_SIZE`]
  #[allow(missing_docs)]
  TooLong { capacity: usize, size: usize },

  /// The payload alone is larger than [`MAX_PAYLOAD_SIZE`]
  #[allow(missing_docs)]
  PayloadTooLong { capacity: usize, size: usize },
}

impl TryIntoBytes for Message {
  type Error = MessageToBytesError;

  fn try_into_bytes(self) -> Result<Vec<u8>, Self::Error> {
    if self.payload.0.len() > MAX_PAYLOAD_SIZE {
      return Err(MessageToBytesError::PayloadTooLong { capacity: MAX_PAYLOAD_SIZE,
                                                       size: self.payload.0.len() });
    }

    let size = self.wire_size();

    if size > MAX_MESSAGE_SIZE {
      return Err(MessageToBytesError::TooLong { capacity: MAX_MESSAGE_SIZE,
                                                size });
    }

    let mut bytes = Vec::with_capacity(size);

    let byte1: u8 = Byte1 { tkl: self.token.len() as u8,
                            ver: self.ver,
                            ty: self.ty }.into();

    bytes.push(byte1);
    bytes.push(self.code.into());
    bytes.extend(<[u8; 2]>::from(self.id));
    bytes.extend(self.token.0);

    let mut prev_number = 0u16;
    for opt in self.opts.iter() {
      opt.extend_bytes(prev_number, &mut bytes);
      prev_number = opt.number.0;
    }

    if !self.payload.0.is_empty() {
      bytes.push(0b11111111);
      bytes.extend(self.payload.0);
    }

    Ok(bytes)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::msg::opt::known::{no_repeat, repeat};
  use crate::msg::*;
  use crate::TryFromBytes;

  macro_rules! assert_eqb_iter {
    ($actual:expr, $expected:expr) => {
      if $actual.iter().ne($expected.iter()) {
        panic!("expected {:?} to equal {:?}",
               $actual.iter()
                      .map(|b| format!("{:08b}", b))
                      .collect::<Vec<_>>(),
               $expected.iter()
                        .map(|b| format!("{:08b}", b))
                        .collect::<Vec<_>>())
      }
    };
  }

  #[test]
  fn msg() {
    let (msg, expected) = crate::test_msg();
    let actual = msg.try_into_bytes().unwrap();
    assert_eqb_iter!(actual, expected);
  }

  #[test]
  fn byte_1() {
    let byte = Byte1 { ver: Version(1),
                       ty: Type::Ack,
                       tkl: 3 };
    let actual: u8 = byte.into();
    assert_eq!(actual, 0b_01_10_0011u8);
  }

  #[test]
  fn roundtrip() {
    let mut msg = Message::new(Type::Non,
                               Code::POST,
                               Id(0xBEEF),
                               Token::from_bytes(b"tok").unwrap());
    msg.opts
       .push(no_repeat::URI_HOST, "example.com".into())
       .unwrap();
    msg.opts
       .push(repeat::URI_PATH, "sensors".into())
       .unwrap();
    msg.opts
       .push(repeat::URI_PATH, "temp".into())
       .unwrap();
    msg.opts
       .push(no_repeat::CONTENT_FORMAT,
             OptValue(ContentFormat::Json.bytes().to_vec()))
       .unwrap();
    msg.payload = Payload(b"{}".to_vec());

    let bytes = msg.clone().try_into_bytes().unwrap();
    assert_eq!(Message::try_from_bytes(&bytes).unwrap(), msg);
  }

  #[test]
  fn delta_extension_boundaries() {
    // delta 13 encodes with the one-byte extension
    let mut msg = Message::new(Type::Con, Code::GET, Id(1), Token::EMPTY);
    msg.opts
       .push(OptNumber(13), OptValue(vec![1]))
       .unwrap_err(); // 13 is critical and unknown
    msg.opts.push(no_repeat::MAX_AGE, OptValue::uint(60)).unwrap();

    let bytes = msg.clone().try_into_bytes().unwrap();
    assert_eq!(bytes[4] >> 4, 13);
    assert_eq!(bytes[5], 14 - 13);
    assert_eq!(Message::try_from_bytes(&bytes).unwrap(), msg);

    // delta 269 encodes with the two-byte extension
    let mut msg = Message::new(Type::Con, Code::GET, Id(2), Token::EMPTY);
    msg.opts
       .push(OptNumber(270), OptValue(vec![7]))
       .unwrap();

    let bytes = msg.clone().try_into_bytes().unwrap();
    assert_eq!(bytes[4] >> 4, 14);
    assert_eq!(u16::from_be_bytes([bytes[5], bytes[6]]), 270 - 269);
    assert_eq!(Message::try_from_bytes(&bytes).unwrap(), msg);
  }

  #[test]
  fn no_payload_marker() {
    let msg = Message::new(Type::Con,
                           Code { class: 2,
                                  detail: 5 },
                           Id(0),
                           Token::EMPTY);

    assert_ne!(msg.try_into_bytes().unwrap().last(), Some(&0b11111111));
  }

  #[test]
  fn too_long_rejected() {
    let mut msg = Message::new(Type::Con, Code::POST, Id(1), Token::EMPTY);
    msg.payload = Payload(vec![0; crate::MAX_MESSAGE_SIZE]);

    assert!(matches!(msg.try_into_bytes(),
                     Err(MessageToBytesError::PayloadTooLong { .. })));
  }

  #[test]
  fn payload_cap_is_half_the_datagram_cap() {
    let mut msg = Message::new(Type::Con, Code::POST, Id(1), Token::EMPTY);
    msg.payload = Payload(vec![0; crate::MAX_PAYLOAD_SIZE]);
    assert!(msg.try_into_bytes().is_ok());

    let mut msg = Message::new(Type::Con, Code::POST, Id(2), Token::EMPTY);
    msg.payload = Payload(vec![0; crate::MAX_PAYLOAD_SIZE + 1]);
    assert_eq!(msg.try_into_bytes(),
               Err(MessageToBytesError::PayloadTooLong { capacity: crate::MAX_PAYLOAD_SIZE,
                                                         size: crate::MAX_PAYLOAD_SIZE + 1 }));
  }

  #[test]
  fn datagram_cap_without_payload_overflow() {
    // options alone can push past 256 bytes
    let mut msg = Message::new(Type::Con, Code::POST, Id(1), Token::EMPTY);
    msg.opts
       .push(no_repeat::PROXY_URI,
             OptValue(core::iter::repeat(b'a').take(260).collect()))
       .unwrap();

    assert!(matches!(msg.try_into_bytes(),
                     Err(MessageToBytesError::TooLong { .. })));
  }

  #[test]
  fn size_is_exact() {
    let (msg, bytes) = crate::test_msg();
    assert_eq!(msg.wire_size(), bytes.len());
  }
}
