use crate::cursor::Cursor;
use crate::from_bytes::{TryConsumeBytes, TryFromBytes};

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
pub use opt::{ContentFormat, Opt, OptNumber, OptValue, Opts};
pub use parse_error::*;
pub use token::*;
pub use ty::*;
pub use ver::*;

/// Message payload; the bytes following the `0xFF` marker.
///
/// Both requests and responses may include a payload, depending on the
/// Method or Response Code.
///
/// See [RFC7252 Section 5.5](https://datatracker.ietf.org/doc/html/rfc7252#section-5.5)
#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Payload(pub Vec<u8>);

/// Struct representing the first byte of a message.
///
/// ```text
/// CoAP version
/// |
/// |  Message type (CON, NON, ACK, RST)
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
    let ver = b >> 6; // bits 7 & 6
    let ty = b >> 4 & 0b11; // bits 5 & 4
    let tkl = b & 0b1111u8; // last 4 bits

    if ver != 1 {
      return Err(MessageParseError::InvalidVersion(ver));
    }

    Ok(Byte1 { ver: Version(ver),
               ty: Type::try_from(ty)?,
               tkl })
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

/// # `Message` struct
/// Low-level representation of a message that has been parsed from the
/// raw binary format, or is about to be serialized to it.
///
/// ```
/// use croak_msg::{Code, Id, Message, Token, TryFromBytes, Type};
///
/// //                       version  token len  code (2.05 Content)
/// //                       |        |          /
/// //                       |  type  |         /  message ID
/// //                       |  |     |        |   |
/// //                       vv vv vvvv vvvvvvvv vvvvvvvvvvvvvvvv
/// let header: [u8; 4] = 0b_01_00_0001_01000101_0000000000000001u32.to_be_bytes();
/// let token: [u8; 1] = [254u8];
/// let payload: [&[u8]; 2] = [&[0b_11111111u8], b"hello, world!"];
/// let packet = [header.as_ref(), token.as_ref(), payload.concat().as_ref()].concat();
///
/// let msg = Message::try_from_bytes(&packet).unwrap();
///
/// let mut expected = Message::new(Type::Con,
///                                 Code { class: 2, detail: 5 },
///                                 Id(1),
///                                 Token::from_bytes(&[254]).unwrap());
/// expected.payload.0 = b"hello, world!".to_vec();
///
/// assert_eq!(msg, expected);
/// ```
#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
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
  /// see [`Opts`] for details
  pub opts: Opts,
  /// see [`Payload`]
  pub payload: Payload,
}

impl Message {
  /// Create a message with no options and no payload.
  pub fn new(ty: Type, code: Code, id: Id, token: Token) -> Message {
    Message { id,
              ty,
              code,
              token,
              ver: Version::default(),
              opts: Opts::new(),
              payload: Payload(Vec::new()) }
  }

  /// Create the empty ACK for this message.
  ///
  /// Carries this message's [`Id`] and nothing else; used to stop a
  /// peer's retransmissions while the real response is prepared.
  pub fn ack(&self) -> Message {
    Message::new(Type::Ack, Code::EMPTY, self.id, Token::EMPTY)
  }

  /// Create the empty RST for this message.
  ///
  /// Carries this message's [`Id`] and nothing else; used to answer
  /// pings and to reject messages we can't process.
  pub fn rst(&self) -> Message {
    Message::new(Type::Reset, Code::EMPTY, self.id, Token::EMPTY)
  }

  /// The number of bytes this message will occupy on the wire.
  pub fn wire_size(&self) -> usize {
    let mut prev = 0u16;
    let mut opts_size = 0usize;
    for opt in self.opts.iter() {
      opts_size += opt.wire_size(prev);
      prev = opt.number.0;
    }

    let payload_size = if self.payload.0.is_empty() {
      0
    } else {
      1 + self.payload.0.len()
    };

    4 + self.token.len() + opts_size + payload_size
  }
}

impl<Bytes: AsRef<[u8]>> TryFromBytes<Bytes> for Message {
  type Error = MessageParseError;

  fn try_from_bytes(bytes: Bytes) -> Result<Self, Self::Error> {
    let mut bytes = Cursor::new(bytes);

    if bytes.remaining() < 4 {
      return Err(MessageParseError::eof());
    }

    let Byte1 { tkl, ty, ver } = bytes.next()
                                      .ok_or_else(MessageParseError::eof)?
                                      .try_into()?;

    if tkl > 8 {
      return Err(MessageParseError::InvalidTokenLength(tkl));
    }

    let code = Code::try_from_byte(bytes.next().ok_or_else(MessageParseError::eof)?)?;
    let id = Id::try_consume_bytes(&mut bytes)?;

    let token = bytes.take_exact(tkl as usize)
                     .ok_or_else(MessageParseError::eof)?;
    let token = Token::from_bytes(token).expect("tkl was checked to be <= 8");

    let opts = Opts::try_consume_bytes(&mut bytes)?;

    let payload = match bytes.next() {
      | Some(0xFF) if bytes.is_exhausted() => {
        return Err(MessageParseError::PayloadMarkerWithNoPayload)
      },
      | Some(0xFF) => Payload(bytes.take_until_end().to_vec()),
      | Some(_) => unreachable!("options parsing stops only at 0xFF or end of buffer"),
      | None => Payload(Vec::new()),
    };

    Ok(Message { id,
                 ty,
                 ver,
                 code,
                 token,
                 opts,
                 payload })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_msg;

  #[test]
  fn parse_msg() {
    let (expect, bytes) = test_msg();
    assert_eq!(Message::try_from_bytes(&bytes).unwrap(), expect)
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
  fn parse_rejects_bad_version() {
    assert_eq!(Byte1::try_from(0b_00_10_0011u8),
               Err(MessageParseError::InvalidVersion(0)));

    let mut bytes = test_msg().1;
    bytes[0] = 0b_11_00_0001;
    assert_eq!(Message::try_from_bytes(&bytes),
               Err(MessageParseError::InvalidVersion(3)));
  }

  #[test]
  fn parse_rejects_short_datagram() {
    for len in 0..4 {
      assert_eq!(Message::try_from_bytes(&vec![0b_0100_0000u8; len]),
                 Err(MessageParseError::eof()));
    }
  }

  #[test]
  fn parse_rejects_long_token() {
    // tkl = 9, no token bytes even present
    let bytes = [0b_01_00_1001u8, 0x45, 0, 1];
    assert_eq!(Message::try_from_bytes(&bytes),
               Err(MessageParseError::InvalidTokenLength(9)));
  }

  #[test]
  fn parse_rejects_unrecognized_code() {
    // class 7 detail 31
    let bytes = [0b_01_00_0000u8, 0xFF, 0, 1];
    assert_eq!(Message::try_from_bytes(&bytes),
               Err(MessageParseError::UnrecognizedCode(Code { class: 7,
                                                              detail: 31 })));
  }

  #[test]
  fn parse_rejects_bare_payload_marker() {
    let bytes = [0b_01_00_0000u8, 0x45, 0, 1, 0xFF];
    assert_eq!(Message::try_from_bytes(&bytes),
               Err(MessageParseError::PayloadMarkerWithNoPayload));
  }

  #[test]
  fn parse_id() {
    let mut id_bytes = Cursor::new(34u16.to_be_bytes());
    let id = Id::try_consume_bytes(&mut id_bytes).unwrap();
    assert_eq!(id, Id(34));
  }

  #[test]
  fn token_roundtrip_bounds() {
    for len in [0usize, 8] {
      let token = Token::from_bytes(&vec![7u8; len]).unwrap();
      let msg = Message::new(Type::Con, Code::GET, Id(9), token);
      let bytes: Vec<u8> = crate::TryIntoBytes::try_into_bytes(msg.clone()).unwrap();
      assert_eq!(Message::try_from_bytes(&bytes).unwrap().token, token);
    }
  }

  #[test]
  fn empty_ack_and_rst() {
    let (msg, _) = test_msg();
    let ack = msg.ack();
    assert_eq!(ack.ty, Type::Ack);
    assert_eq!(ack.code, Code::EMPTY);
    assert_eq!(ack.id, msg.id);
    assert!(ack.token.is_empty());

    let rst = msg.rst();
    assert_eq!(rst.ty, Type::Reset);
    assert_eq!(rst.id, msg.id);
  }
}
