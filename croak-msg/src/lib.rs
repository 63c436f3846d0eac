//! Low-level representation of CoAP messages.
//!
//! The most notable item in `croak_msg` is [`Message`]; a CoAP message
//! very close to the actual byte layout described by
//! [RFC7252 Section 3](https://datatracker.ietf.org/doc/html/rfc7252#section-3).
//!
//! ## Decoding & Encoding
//! Messages support conversion to and from bytes with the
//! [`TryFromBytes`] and [`TryIntoBytes`] traits:
//!
//! ```
//! use croak_msg::{Code, Id, Message, Token, TryFromBytes, TryIntoBytes, Type};
//!
//! let msg = Message::new(Type::Con, Code::GET, Id(1), Token::EMPTY);
//! let bytes = msg.clone().try_into_bytes().unwrap();
//!
//! assert_eq!(Message::try_from_bytes(&bytes).unwrap(), msg);
//! ```
//!
//! ## Size
//! This implementation rejects datagrams larger than
//! [`MAX_MESSAGE_SIZE`] at encode time, keeping messages friendly to
//! constrained networks. Options are stored with their absolute numbers
//! in ascending order; the wire-level delta encoding only exists during
//! conversion.

#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![deny(missing_copy_implementations)]
#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(unreachable_pub)]

#[doc(hidden)]
pub mod cursor;

#[doc(hidden)]
pub mod from_bytes;

/// Message structs
pub mod msg;

/// Zero-copy accessors over raw datagrams
pub mod peek;

#[doc(hidden)]
pub mod to_bytes;

#[doc(inline)]
pub use cursor::Cursor;
#[doc(inline)]
pub use from_bytes::TryFromBytes;
#[doc(inline)]
pub use msg::*;
#[doc(inline)]
pub use to_bytes::TryIntoBytes;

/// The largest datagram this implementation will produce or accept,
/// in bytes.
pub const MAX_MESSAGE_SIZE: usize = 256;

/// The largest payload either side of an exchange may carry.
///
/// Half of [`MAX_MESSAGE_SIZE`], leaving the other half for the header,
/// token and options.
pub const MAX_PAYLOAD_SIZE: usize = MAX_MESSAGE_SIZE / 2;

#[cfg(test)]
pub(crate) fn test_msg() -> (Message, Vec<u8>) {
  let header: [u8; 4] = 0b_01_00_0001_01000101_0000000000000001u32.to_be_bytes();
  let token: [u8; 1] = [254u8];
  let etag: &[u8] = b"lo";
  //                  Etag (4), len 2         Content-Format (12), delta 8
  let options: [&[u8]; 3] = [&[0b_0100_0010u8], etag, &[0b_1000_0001u8, 50]];
  let payload: [&[u8]; 2] = [&[0b_11111111u8], b"hello, world!"];
  let bytes = [header.as_ref(),
               token.as_ref(),
               options.concat().as_ref(),
               payload.concat().as_ref()].concat();

  let mut msg = Message::new(Type::Con,
                             Code { class: 2,
                                    detail: 5 },
                             Id(1),
                             Token::from_bytes(&[254]).unwrap());
  msg.opts
     .push(opt::known::repeat::ETAG, OptValue(b"lo".to_vec()))
     .unwrap();
  msg.opts
     .push(opt::known::no_repeat::CONTENT_FORMAT,
           OptValue(vec![50]))
     .unwrap();
  msg.payload = Payload(b"hello, world!".to_vec());

  (msg, bytes)
}
