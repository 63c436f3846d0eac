use croak_msg::Code;

/// A request method (GET, POST, PUT, DELETE)
///
/// See [RFC7252 Section 5.8](https://datatracker.ietf.org/doc/html/rfc7252#section-5.8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Method(pub Code);

impl Method {
  /// `0.01` Fetch a representation of a resource
  pub const GET: Method = Method(Code::GET);
  /// `0.02` Process the representation in the request
  pub const POST: Method = Method(Code::POST);
  /// `0.03` Create or replace a resource with the representation
  pub const PUT: Method = Method(Code::PUT);
  /// `0.04` Delete a resource
  pub const DELETE: Method = Method(Code::DELETE);
}

impl core::fmt::Display for Method {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    let name = match self.0.detail {
      | 1 => "GET",
      | 2 => "POST",
      | 3 => "PUT",
      | 4 => "DELETE",
      | _ => "UNKNOWN",
    };
    write!(f, "{}", name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display() {
    assert_eq!(Method::GET.to_string(), "GET");
    assert_eq!(Method::DELETE.to_string(), "DELETE");
  }
}
