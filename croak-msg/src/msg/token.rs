use tinyvec::ArrayVec;

/// # Message Token
///
/// 0-8 opaque bytes chosen by the sender of a request, echoed verbatim
/// in every response to it (piggybacked, separate, or notification).
///
/// See [RFC7252 Section 5.3.1](https://datatracker.ietf.org/doc/html/rfc7252#section-5.3.1)
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Token(pub ArrayVec<[u8; 8]>);

impl Token {
  /// The zero-length token
  pub const EMPTY: Token = Token(ArrayVec::from_array_empty([0; 8]));

  /// Copy up to 8 bytes into a token, returning None when given more.
  ///
  /// ```
  /// use croak_msg::Token;
  ///
  /// assert_eq!(Token::from_bytes(&[]).unwrap(), Token::EMPTY);
  /// assert!(Token::from_bytes(&[0; 8]).is_some());
  /// assert!(Token::from_bytes(&[0; 9]).is_none());
  /// ```
  pub fn from_bytes(bytes: &[u8]) -> Option<Token> {
    if bytes.len() > 8 {
      return None;
    }

    let mut buf = ArrayVec::new();
    buf.extend_from_slice(bytes);
    Some(Token(buf))
  }

  /// Take an arbitrary-length sequence of bytes and turn it into an
  /// opaque 8-byte message token.
  ///
  /// Currently uses the BLAKE2 hashing algorithm, but this may change in
  /// the future.
  ///
  /// ```
  /// use croak_msg::Token;
  ///
  /// let my_token = Token::opaque(&[0, 1, 2]);
  /// assert_eq!(my_token.len(), 8);
  /// ```
  pub fn opaque(data: &[u8]) -> Token {
    use blake2::digest::consts::U8;
    use blake2::{Blake2b, Digest};

    let mut digest = Blake2b::<U8>::new();
    digest.update(data);
    Token(Into::<[u8; 8]>::into(digest.finalize()).into())
  }

  /// The number of bytes in this token (0-8)
  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Whether this is the zero-length token
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn opaque_is_deterministic() {
    assert_eq!(Token::opaque(b"abc"), Token::opaque(b"abc"));
    assert_ne!(Token::opaque(b"abc"), Token::opaque(b"abd"));
  }

  #[test]
  fn from_bytes_bounds() {
    assert_eq!(Token::from_bytes(&[1, 2]).unwrap().len(), 2);
    assert_eq!(Token::from_bytes(&[0; 8]).unwrap().len(), 8);
    assert_eq!(Token::from_bytes(&[0; 9]), None);
  }
}
