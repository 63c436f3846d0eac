use super::OptNumber;

/// How an option's value bytes are meant to be interpreted.
///
/// See [RFC7252 Section 3.2](https://datatracker.ietf.org/doc/html/rfc7252#section-3.2)
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum OptFormat {
  /// Zero-length value; presence is the information
  Empty,
  /// Opaque bytes
  Opaque,
  /// Minimal-length big-endian unsigned integer
  Uint,
  /// UTF-8 string
  String,
}

/// What RFC 7252 says about one recognized option number.
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct OptProps {
  /// Value representation
  pub format: OptFormat,
  /// Smallest permitted value length, in bytes
  pub min_len: usize,
  /// Largest permitted value length, in bytes
  pub max_len: usize,
  /// Whether the option may occur more than once in a message
  pub repeatable: bool,
}

macro_rules! opt {
  (#[doc = $doc:expr] $name:ident = $n:literal) => {
    #[doc = $doc]
    #[doc = ""]
    #[doc = concat!("Option number ", stringify!($n), ".")]
    pub const $name: OptNumber = OptNumber($n);
  };
}

/// Non-repeatable options
pub mod no_repeat {
  use super::OptNumber;

  opt!(#[doc = "Uri-Host: the host of the resource being requested"]
       URI_HOST = 3);
  opt!(#[doc = "If-None-Match: make a request conditional on the target not existing"]
       IF_NONE_MATCH = 5);
  opt!(#[doc = "Observe: subscribe to (0) or unsubscribe from (1) state changes \
                (<https://www.rfc-editor.org/rfc/rfc7641#section-2>)"]
       OBSERVE = 6);
  opt!(#[doc = "Uri-Port: the port of the resource being requested"]
       URI_PORT = 7);
  opt!(#[doc = "Content-Format: how the payload is encoded (see [`super::super::ContentFormat`])"]
       CONTENT_FORMAT = 12);
  opt!(#[doc = "Max-Age: seconds a response may be cached for"]
       MAX_AGE = 14);
  opt!(#[doc = "Accept: the Content-Format acceptable to the client"]
       ACCEPT = 17);
  opt!(#[doc = "Proxy-Uri: absolute URI for a forward-proxy request"]
       PROXY_URI = 35);
  opt!(#[doc = "Proxy-Scheme: scheme for a proxy request assembled from the Uri-* options"]
       PROXY_SCHEME = 39);
  opt!(#[doc = "Size1: size of a request body, in bytes"]
       SIZE1 = 60);
}

/// Repeatable options
pub mod repeat {
  use super::OptNumber;

  opt!(#[doc = "If-Match: make a request conditional on an ETag match"]
       IF_MATCH = 1);
  opt!(#[doc = "ETag: entity-tag of a resource representation"]
       ETAG = 4);
  opt!(#[doc = "Location-Path: one segment of the location of a created resource"]
       LOCATION_PATH = 8);
  opt!(#[doc = "Uri-Path: one segment of the path of the resource being requested"]
       URI_PATH = 11);
  opt!(#[doc = "Uri-Query: one query parameter of the resource being requested"]
       URI_QUERY = 15);
  opt!(#[doc = "Location-Query: one query parameter of the location of a created resource"]
       LOCATION_QUERY = 20);
}

use self::no_repeat::*;
use self::repeat::*;

/// Look up what RFC 7252 says about an option number.
///
/// Returns None for numbers the RFC does not define; their treatment
/// then depends on the number's criticality bit
/// ([`OptNumber::must_be_processed`]).
pub fn props(number: OptNumber) -> Option<OptProps> {
  let p = |format, min_len, max_len, repeatable| {
    Some(OptProps { format,
                    min_len,
                    max_len,
                    repeatable })
  };
  use OptFormat::*;

  match number {
    | IF_MATCH => p(Opaque, 0, 8, true),
    | URI_HOST => p(String, 1, 255, false),
    | ETAG => p(Opaque, 1, 8, true),
    | IF_NONE_MATCH => p(Empty, 0, 0, false),
    | OBSERVE => p(Uint, 0, 3, false),
    | URI_PORT => p(Uint, 0, 2, false),
    | LOCATION_PATH => p(String, 0, 255, true),
    | URI_PATH => p(String, 0, 255, true),
    | CONTENT_FORMAT => p(Uint, 0, 2, false),
    | MAX_AGE => p(Uint, 0, 4, false),
    | URI_QUERY => p(String, 0, 255, true),
    | ACCEPT => p(Uint, 0, 2, false),
    | LOCATION_QUERY => p(String, 0, 255, true),
    | PROXY_URI => p(String, 1, 1034, false),
    | PROXY_SCHEME => p(String, 1, 255, false),
    | SIZE1 => p(Uint, 0, 4, false),
    | _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn criticality_follows_low_bit() {
    assert!(IF_MATCH.must_be_processed());
    assert!(URI_HOST.must_be_processed());
    assert!(!ETAG.must_be_processed());
    assert!(!SIZE1.must_be_processed());
  }

  #[test]
  fn table_covers_recognized_set() {
    for n in [1, 3, 4, 5, 6, 7, 8, 11, 12, 14, 15, 17, 20, 35, 39, 60] {
      assert!(props(OptNumber(n)).is_some(), "option {} missing", n);
    }
    assert!(props(OptNumber(2)).is_none());
    assert!(props(OptNumber(23)).is_none());
  }

  #[test]
  fn repeatability() {
    assert!(props(URI_PATH).unwrap().repeatable);
    assert!(props(ETAG).unwrap().repeatable);
    assert!(!props(CONTENT_FORMAT).unwrap().repeatable);
    assert!(!props(OBSERVE).unwrap().repeatable);
  }
}
