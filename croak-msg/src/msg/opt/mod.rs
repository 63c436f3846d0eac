use crate::cursor::Cursor;
use crate::from_bytes::TryConsumeBytes;

/// Table of the options RFC 7252 defines
pub mod known;

/// Content-Format values
pub mod content_format;
pub use content_format::*;

/// Observe
pub mod observe;

pub use super::parse_error::OptParseError;

/// # Option Number
///
/// Identifies which option an [`Opt`] carries (e.g. Content-Format has
/// number 12). Stored as the absolute number; the wire-level delta
/// encoding only exists inside the codec.
///
/// See [RFC7252 Section 5.4.6](https://datatracker.ietf.org/doc/html/rfc7252#section-5.4.6)
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct OptNumber(pub u16);

impl OptNumber {
  /// Whether this option must be processed by a receiver.
  ///
  /// Corresponds to the option being "critical" in strict CoAP terms;
  /// encoded in the least significant bit of the number.
  pub fn must_be_processed(&self) -> bool {
    self.0 & 0b1 == 1
  }
}

/// # Option Value
///
/// The raw bytes of an option. Interpretation (opaque / uint / string)
/// is driven by the [`known`] table for the option's number.
///
/// See [RFC7252 Section 3.2](https://datatracker.ietf.org/doc/html/rfc7252#section-3.2)
#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct OptValue(pub Vec<u8>);

impl OptValue {
  /// Encode an unsigned integer as a minimal-length big-endian value.
  ///
  /// ```
  /// use croak_msg::OptValue;
  ///
  /// assert_eq!(OptValue::uint(0).0, Vec::<u8>::new());
  /// assert_eq!(OptValue::uint(5683).0, vec![0x16, 0x33]);
  /// ```
  pub fn uint(n: u32) -> OptValue {
    let bytes = n.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    OptValue(bytes[skip..].to_vec())
  }

  /// Interpret the value as a big-endian unsigned integer.
  ///
  /// A zero-length value means 0. Returns None when longer than 4 bytes.
  pub fn as_uint(&self) -> Option<u32> {
    if self.0.len() > 4 {
      return None;
    }

    Some(self.0.iter().fold(0u32, |n, b| (n << 8) | *b as u32))
  }

  /// Interpret the value as a UTF-8 string.
  pub fn as_str(&self) -> Option<&str> {
    core::str::from_utf8(&self.0).ok()
  }

  /// The number of bytes in the value
  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Whether the value is zero-length
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl From<&str> for OptValue {
  fn from(s: &str) -> OptValue {
    OptValue(s.as_bytes().to_vec())
  }
}

/// A single option: an absolute [`OptNumber`] paired with its
/// [`OptValue`].
#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Opt {
  /// See [`OptNumber`]
  pub number: OptNumber,
  /// See [`OptValue`]
  pub value: OptValue,
}

/// The options of one message, held in ascending number order.
///
/// `Opts` is the single mutation path for options; [`Opts::push`]
/// enforces the per-number rules (repeatability, value length bounds,
/// critical options we don't know) so no construction or copy path can
/// bypass them.
#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Opts(Vec<Opt>);

impl Opts {
  /// Create an empty option sequence
  pub fn new() -> Opts {
    Opts(Vec::new())
  }

  /// Insert an option, keeping the sequence sorted by number.
  ///
  /// A repeated number is inserted after its siblings, preserving the
  /// order repeatable options were added in.
  ///
  /// Errors when:
  /// - the number is non-repeatable and already present
  /// - the value length is outside the bounds for the number
  /// - the number is unrecognized and critical
  pub fn push(&mut self, number: OptNumber, value: OptValue) -> Result<(), OptParseError> {
    match known::props(number) {
      | Some(props) => {
        if !props.repeatable && self.get(number).is_some() {
          return Err(OptParseError::RepeatedNonRepeatable(number));
        }

        if value.len() < props.min_len || value.len() > props.max_len {
          return Err(OptParseError::ValueLengthOutOfBounds { number,
                                                             min: props.min_len,
                                                             max: props.max_len,
                                                             actual: value.len() });
        }
      },
      | None if number.must_be_processed() => {
        return Err(OptParseError::UnknownCriticalOption(number));
      },
      // Unrecognized elective options are carried verbatim.
      | None => {},
    }

    let at = self.0
                 .iter()
                 .take_while(|o| o.number <= number)
                 .count();
    self.0.insert(at, Opt { number, value });
    Ok(())
  }

  /// Get the first value for a number
  pub fn get(&self, number: OptNumber) -> Option<&OptValue> {
    self.0
        .iter()
        .find(|o| o.number == number)
        .map(|o| &o.value)
  }

  /// Iterate over every value for a number, in insertion order
  pub fn get_all(&self, number: OptNumber) -> impl Iterator<Item = &OptValue> {
    self.0
        .iter()
        .filter(move |o| o.number == number)
        .map(|o| &o.value)
  }

  /// Remove every occurrence of a number, returning how many were
  /// removed
  pub fn remove(&mut self, number: OptNumber) -> usize {
    let before = self.0.len();
    self.0.retain(|o| o.number != number);
    before - self.0.len()
  }

  /// Iterate the options in ascending number order
  pub fn iter(&self) -> core::slice::Iter<'_, Opt> {
    self.0.iter()
  }

  /// The number of options
  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Whether there are no options
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl<'a> IntoIterator for &'a Opts {
  type Item = &'a Opt;
  type IntoIter = core::slice::Iter<'a, Opt>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}

pub(crate) fn parse_opt_len_or_delta<A: AsRef<[u8]>>(head: u8,
                                                     bytes: &mut Cursor<A>,
                                                     reserved_err: OptParseError)
                                                     -> Result<u16, OptParseError> {
  match head {
    | 13 => {
      let n = bytes.next().ok_or_else(OptParseError::eof)?;
      Ok((n as u16) + 13)
    },
    | 14 => match bytes.take_exact(2) {
      // saturate rather than wrap; a hostile extension value fails
      // later as an impossible length or an unknown critical option
      | Some(&[a, b]) => Ok(u16::from_be_bytes([a, b]).saturating_add(269)),
      | _ => Err(OptParseError::eof()),
    },
    | 15 => Err(reserved_err),
    | _ => Ok(head as u16),
  }
}

pub(crate) fn opt_len_or_delta(val: u16) -> (u8, Option<tinyvec::ArrayVec<[u8; 2]>>) {
  match val {
    | n if n >= 269 => {
      let mut bytes = tinyvec::ArrayVec::new();
      bytes.extend_from_slice(&(n - 269).to_be_bytes());
      (14, Some(bytes))
    },
    | n if n >= 13 => {
      let mut bytes = tinyvec::ArrayVec::new();
      bytes.push((n as u8) - 13);
      (13, Some(bytes))
    },
    | n => (n as u8, None),
  }
}

impl<Bytes: AsRef<[u8]>> TryConsumeBytes<Bytes> for Opts {
  type Error = OptParseError;

  fn try_consume_bytes(bytes: &mut Cursor<Bytes>) -> Result<Self, Self::Error> {
    let mut opts = Opts::new();
    let mut number = 0u16;

    loop {
      let byte1 = match bytes.peek_exact(1) {
        // end of datagram; no payload follows
        | None => break Ok(opts),
        // payload marker; options are done
        | Some(&[0xFF]) => break Ok(opts),
        | Some(&[b]) => b,
        | _ => unreachable!(),
      };

      bytes.next();

      // Delta must be consumed before the length extension bytes.
      let delta = parse_opt_len_or_delta(byte1 >> 4,
                                         bytes,
                                         OptParseError::OptionDeltaReservedValue(15))?;
      let len = parse_opt_len_or_delta(byte1 & 0b00001111,
                                       bytes,
                                       OptParseError::ValueLengthReservedValue(15))?
                as usize;

      let value = bytes.take_exact(len)
                       .ok_or_else(OptParseError::eof)?;

      number = number.saturating_add(delta);
      opts.push(OptNumber(number), OptValue(value.to_vec()))?;
    }
  }
}

impl Opt {
  /// Append this option's wire bytes (relative to the previous option's
  /// number) to a byte collection.
  pub(crate) fn extend_bytes(&self, prev_number: u16, bytes: &mut Vec<u8>) {
    let (del, del_bytes) = opt_len_or_delta(self.number.0 - prev_number);
    let (len, len_bytes) = opt_len_or_delta(self.value.len() as u16);

    bytes.push(del << 4 | len);

    if let Some(bs) = del_bytes {
      bytes.extend(bs);
    }

    if let Some(bs) = len_bytes {
      bytes.extend(bs);
    }

    bytes.extend(&self.value.0);
  }

  /// The number of bytes this option will occupy on the wire.
  pub(crate) fn wire_size(&self, prev_number: u16) -> usize {
    let ext = |n: u16| match n {
      | n if n >= 269 => 2,
      | n if n >= 13 => 1,
      | _ => 0,
    };

    1 + ext(self.number.0 - prev_number) + ext(self.value.len() as u16) + self.value.len()
  }
}
