use crate::msg::opt::OptNumber;
use crate::msg::Code;

/// Errors encounterable while parsing a message from bytes
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageParseError {
  /// Reached end of stream before parsing was finished.
  ///
  /// Also covers datagrams shorter than the 4-byte fixed header.
  UnexpectedEndOfStream,

  /// Version was not 1
  InvalidVersion(u8),

  /// Token length was > 8
  InvalidTokenLength(u8),

  /// The message type is invalid (see [`crate::Type`] for valid values)
  InvalidType(u8),

  /// The code's class/detail pair is not one defined by RFC 7252
  UnrecognizedCode(Code),

  /// The payload marker (`0xFF`) was present with zero payload bytes
  /// after it
  PayloadMarkerWithNoPayload,

  /// Error parsing an option
  OptParseError(OptParseError),
}

impl MessageParseError {
  /// Shorthand for [`MessageParseError::UnexpectedEndOfStream`]
  pub fn eof() -> Self {
    Self::UnexpectedEndOfStream
  }
}

impl From<OptParseError> for MessageParseError {
  fn from(e: OptParseError) -> Self {
    Self::OptParseError(e)
  }
}

/// Errors encounterable while parsing an option from bytes
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum OptParseError {
  /// Reached end of stream before parsing was finished
  UnexpectedEndOfStream,

  /// Option Delta nibble was 15, which is reserved
  OptionDeltaReservedValue(u8),

  /// Value Length nibble was 15, which is reserved
  ValueLengthReservedValue(u8),

  /// An option that RFC 7252 marks non-repeatable occurred twice
  RepeatedNonRepeatable(OptNumber),

  /// An option we do not recognize was marked critical.
  ///
  /// Elective options we don't recognize are carried verbatim, but a
  /// critical one must not be silently ignored.
  UnknownCriticalOption(OptNumber),

  /// The option's value length is outside the bounds RFC 7252 sets for
  /// its number
  #[allow(missing_docs)]
  ValueLengthOutOfBounds {
    number: OptNumber,
    min: usize,
    max: usize,
    actual: usize,
  },

  /// Not a true failure case; only means we tried to read the payload
  /// marker byte (0xFF) as an option header.
  OptionsExhausted,
}

impl OptParseError {
  /// Shorthand for [`OptParseError::UnexpectedEndOfStream`]
  pub fn eof() -> Self {
    Self::UnexpectedEndOfStream
  }
}
