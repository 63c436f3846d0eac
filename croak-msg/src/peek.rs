//! Zero-copy accessors over a raw datagram.
//!
//! The dispatcher wants to classify datagrams (and recover ids from
//! undecodable ones) without paying for a full decode; these helpers
//! read only the fixed header.

use crate::msg::{CodeKind, Id, Type};

/// The message type of a datagram (byte 0, bits 5-4).
///
/// Returns None for datagrams too short to carry a header.
///
/// ```
/// use croak_msg::{peek, Type};
///
/// assert_eq!(peek::message_type(&[0b_01_10_0000, 0, 0, 1]), Some(Type::Ack));
/// assert_eq!(peek::message_type(&[]), None);
/// ```
pub fn message_type(bytes: &[u8]) -> Option<Type> {
  let b = *bytes.first()?;
  match b >> 4 & 0b11 {
    | 0 => Some(Type::Con),
    | 1 => Some(Type::Non),
    | 2 => Some(Type::Ack),
    | _ => Some(Type::Reset),
  }
}

/// The message ID of a datagram (bytes 2-3, big-endian).
///
/// Returns None for datagrams too short to carry one.
pub fn message_id(bytes: &[u8]) -> Option<Id> {
  match bytes.get(2..4) {
    | Some(&[a, b]) => Some(Id::from_be_bytes([a, b])),
    | _ => None,
  }
}

/// Whether a datagram carries a request code (class 0, detail != 0).
pub fn is_request(bytes: &[u8]) -> bool {
  matches!(code_kind(bytes), Some(CodeKind::Request))
}

/// The kind of code a datagram carries, without validating it.
pub fn code_kind(bytes: &[u8]) -> Option<CodeKind> {
  let code = *bytes.get(1)?;
  match (code >> 5, code & 0b000_11111) {
    | (0, 0) => Some(CodeKind::Empty),
    | (0, _) => Some(CodeKind::Request),
    | _ => Some(CodeKind::Response),
  }
}
