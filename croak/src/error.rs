use croak_msg::to_bytes::MessageToBytesError;
use croak_msg::{Id, MessageParseError};

/// Errors surfaced by an endpoint, either as return values or through
/// [`crate::Listen::on_error`].
#[derive(Debug)]
pub enum Error {
  /// Bytes on the wire violated the CoAP framing or option rules.
  ///
  /// Recoverable; the offending datagram is dropped and the receive
  /// loop continues. A server additionally answers a decodable-enough
  /// confirmable message with a Reset.
  Format(MessageParseError),

  /// A caller-supplied value failed a precondition
  Argument(Argument),

  /// The message is valid CoAP but outside what this implementation
  /// supports
  Unsupported(Unsupported),

  /// A confirmable message exhausted its retransmission budget without
  /// being acknowledged.
  ///
  /// Surfaced through [`crate::Listen::on_error`] with the original
  /// message attached.
  Undelivered,

  /// The underlying socket failed
  Io(std::io::Error),
}

/// Caller-supplied values that failed a precondition
#[derive(Debug)]
pub enum Argument {
  /// The message's type/code combination is not a legal request
  /// (requests are CON or NON with a request code)
  NotARequest,

  /// The message's type/code combination is not a legal response
  NotAResponse,

  /// A message enrolled for acknowledgement tracking was not
  /// confirmable
  NotConfirmable,

  /// The URL failed to parse
  UrlMalformed(url::ParseError),

  /// The URL's scheme was neither `coap` nor `coaps`
  UrlScheme,

  /// The URL carried a `#fragment`, which CoAP URLs must not
  UrlFragment,

  /// The URL had no host
  UrlNoHost,

  /// Host resolution yielded no addresses
  HostUnresolved,

  /// The message's ID is already attached to an in-flight confirmable
  /// exchange
  IdInUse(Id),
}

/// Valid CoAP this implementation does not support
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsupported {
  /// The encoded message exceeds the datagram size cap
  #[allow(missing_docs)]
  MessageTooLong { capacity: usize, size: usize },

  /// The payload exceeds the per-side payload cap
  #[allow(missing_docs)]
  PayloadTooLong { capacity: usize, size: usize },

  /// All 65,536 message IDs are attached to in-flight exchanges
  IdSpaceExhausted,
}

impl From<MessageParseError> for Error {
  fn from(e: MessageParseError) -> Self {
    Error::Format(e)
  }
}

impl From<croak_msg::OptParseError> for Error {
  /// Option-table violations while building a message locally surface
  /// as the same Format errors a decoder would produce.
  fn from(e: croak_msg::OptParseError) -> Self {
    Error::Format(MessageParseError::OptParseError(e))
  }
}

impl From<MessageToBytesError> for Error {
  fn from(e: MessageToBytesError) -> Self {
    match e {
      | MessageToBytesError::TooLong { capacity, size } => {
        Error::Unsupported(Unsupported::MessageTooLong { capacity, size })
      },
      | MessageToBytesError::PayloadTooLong { capacity, size } => {
        Error::Unsupported(Unsupported::PayloadTooLong { capacity, size })
      },
    }
  }
}

impl From<std::io::Error> for Error {
  fn from(e: std::io::Error) -> Self {
    Error::Io(e)
  }
}

impl core::fmt::Display for Error {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      | Error::Format(e) => write!(f, "malformed message: {:?}", e),
      | Error::Argument(e) => write!(f, "invalid argument: {:?}", e),
      | Error::Unsupported(e) => write!(f, "unsupported: {:?}", e),
      | Error::Undelivered => write!(f, "confirmable message was never acknowledged"),
      | Error::Io(e) => write!(f, "socket error: {}", e),
    }
  }
}

impl std::error::Error for Error {}
