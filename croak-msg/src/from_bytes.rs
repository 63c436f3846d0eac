use crate::cursor::Cursor;

/// Trait for fallibly converting a buffer of bytes into a message
/// structure.
pub trait TryFromBytes<Bytes: AsRef<[u8]>>
  where Self: Sized
{
  /// Error yielded when the bytes do not describe a valid `Self`
  type Error;

  /// Try to convert a buffer of bytes into `Self`
  fn try_from_bytes(bytes: Bytes) -> Result<Self, Self::Error>;
}

/// Trait for fallibly consuming part of a [`Cursor`], yielding a
/// structure and leaving the cursor positioned after its bytes.
pub trait TryConsumeBytes<Bytes: AsRef<[u8]>>
  where Self: Sized
{
  /// Error yielded when the bytes do not describe a valid `Self`
  type Error;

  /// Try to read `Self` from the front of the cursor
  fn try_consume_bytes(bytes: &mut Cursor<Bytes>) -> Result<Self, Self::Error>;
}
