use super::MessageParseError;

/// # Message Code
///
/// 8 bits split into a 3-bit class and 5-bit detail, written
/// `class.detail` (e.g. `2.05`).
///
/// |class|meaning|
/// |---|---|
/// |`0`|Message is a request (detail > 0) or empty (detail == 0)|
/// |`2`|Message is a success response|
/// |`4`|Message is a client error response|
/// |`5`|Message is a server error response|
///
/// See [RFC7252 Section 12.1](https://datatracker.ietf.org/doc/html/rfc7252#section-12.1)
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Code {
  /// The "class" of the code; identifies requests vs response status
  pub class: u8,

  /// Granular information about the request method or response status.
  pub detail: u8,
}

/// What a [`Code`] means at the dispatch level.
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum CodeKind {
  /// Class 0, detail 0; used for pings and bare ACK / RST
  Empty,
  /// Class 0, detail > 0
  Request,
  /// Class 2, 4 or 5
  Response,
}

impl Code {
  /// `0.00`; pings and bare ACK / RST
  pub const EMPTY: Code = Code::new(0, 0);
  /// `0.01` GET
  pub const GET: Code = Code::new(0, 1);
  /// `0.02` POST
  pub const POST: Code = Code::new(0, 2);
  /// `0.03` PUT
  pub const PUT: Code = Code::new(0, 3);
  /// `0.04` DELETE
  pub const DELETE: Code = Code::new(0, 4);

  /// Create a new Code
  ///
  /// ```
  /// use croak_msg::Code;
  ///
  /// let content = Code::new(2, 05);
  /// ```
  pub const fn new(class: u8, detail: u8) -> Self {
    Self { class, detail }
  }

  /// Whether this code is an empty, request, or response code
  pub fn kind(&self) -> CodeKind {
    match (self.class, self.detail) {
      | (0, 0) => CodeKind::Empty,
      | (0, _) => CodeKind::Request,
      | _ => CodeKind::Response,
    }
  }

  /// Whether this class/detail pair is one RFC 7252 defines.
  ///
  /// Decoding an unrecognized pair is a
  /// [`MessageParseError::UnrecognizedCode`].
  pub fn is_recognized(&self) -> bool {
    match (self.class, self.detail) {
      | (0, 0..=4) => true,
      | (2, 1..=5) => true,
      | (4, 0..=6) | (4, 12) | (4, 13) | (4, 15) => true,
      | (5, 0..=5) => true,
      | _ => false,
    }
  }

  /// Get the human string representation of a message code
  ///
  /// ```
  /// use croak_msg::Code;
  ///
  /// let code = Code { class: 2, detail: 5 };
  /// assert_eq!(code.to_human().iter().collect::<String>(), "2.05");
  /// ```
  pub fn to_human(&self) -> [char; 4] {
    let to_char = |d: u8| char::from_digit(d.into(), 10).unwrap_or('?');
    [to_char(self.class),
     '.',
     to_char(self.detail / 10),
     to_char(self.detail % 10)]
  }
}

impl core::fmt::Display for Code {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    let [a, dot, b, c] = self.to_human();
    write!(f, "{}{}{}{}", a, dot, b, c)
  }
}

impl From<u8> for Code {
  fn from(b: u8) -> Self {
    let class = b >> 5;
    let detail = b & 0b000_11111;

    Code { class, detail }
  }
}

impl From<Code> for u8 {
  fn from(code: Code) -> u8 {
    let class = code.class << 5;
    let detail = code.detail;

    class | detail
  }
}

impl Code {
  /// Decode a code byte, requiring it to be recognized.
  pub(crate) fn try_from_byte(b: u8) -> Result<Self, MessageParseError> {
    let code = Code::from(b);
    if code.is_recognized() {
      Ok(code)
    } else {
      Err(MessageParseError::UnrecognizedCode(code))
    }
  }
}
