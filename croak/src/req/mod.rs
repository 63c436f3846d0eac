use std::net::SocketAddr;
use std::string::FromUtf8Error;

use croak_msg::opt::known::{no_repeat, repeat};
use croak_msg::opt::observe;
use croak_msg::{CodeKind, Id, Message, OptNumber, OptValue, Payload, Token, Type};
use percent_encoding::percent_decode_str;

use crate::error::{Argument, Error};

#[doc(hidden)]
pub mod method;
#[doc(inline)]
pub use method::Method;

/// Default UDP port for the `coap` scheme
pub const DEFAULT_PORT: u16 = 5683;

/// A CoAP request: a confirmable or non-confirmable message with a
/// request code, bound to a `coap://` URL.
///
/// ```
/// use croak::req::Req;
///
/// let mut req = Req::post("coap://192.0.2.1/sensors/temp?unit=c").unwrap();
/// req.set_payload("22.5".bytes());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Req {
  msg: Message,
  secure: bool,
}

impl Req {
  /// Create a request bound to a URL.
  ///
  /// - the scheme must be `coap` or `coaps` (the latter only marks the
  ///   request [`Req::secure`]; this library performs no DTLS)
  /// - a fragment is rejected
  /// - host and port become the Uri-Host and Uri-Port options
  /// - every non-empty path segment becomes a Uri-Path option,
  ///   URL-decoded
  /// - every non-empty query parameter becomes a Uri-Query option,
  ///   URL-decoded
  pub fn new(method: Method, url: &str) -> Result<Req, Error> {
    let url = url::Url::parse(url).map_err(|e| Error::Argument(Argument::UrlMalformed(e)))?;

    let secure = match url.scheme() {
      | "coap" => false,
      | "coaps" => true,
      | _ => return Err(Error::Argument(Argument::UrlScheme)),
    };

    if url.fragment().is_some() {
      return Err(Error::Argument(Argument::UrlFragment));
    }

    let host = url.host_str()
                  .ok_or(Error::Argument(Argument::UrlNoHost))?;

    let mut msg = Message::new(Type::Con, method.0, Id(0), Token::EMPTY);

    msg.opts.push(no_repeat::URI_HOST, host.into())?;
    msg.opts
       .push(no_repeat::URI_PORT,
             OptValue::uint(url.port().unwrap_or(DEFAULT_PORT) as u32))?;

    for seg in url.path_segments().into_iter().flatten() {
      if seg.is_empty() {
        continue;
      }

      let seg = percent_decode_str(seg).decode_utf8_lossy();
      msg.opts.push(repeat::URI_PATH, seg.as_ref().into())?;
    }

    for (k, v) in url.query_pairs() {
      if k.is_empty() {
        continue;
      }

      let param = if v.is_empty() {
        k.to_string()
      } else {
        format!("{}={}", k, v)
      };
      msg.opts.push(repeat::URI_QUERY, param.as_str().into())?;
    }

    Ok(Req { msg, secure })
  }

  /// Creates a new GET request
  pub fn get(url: &str) -> Result<Req, Error> {
    Self::new(Method::GET, url)
  }

  /// Creates a new POST request
  pub fn post(url: &str) -> Result<Req, Error> {
    Self::new(Method::POST, url)
  }

  /// Creates a new PUT request
  pub fn put(url: &str) -> Result<Req, Error> {
    Self::new(Method::PUT, url)
  }

  /// Creates a new DELETE request
  pub fn delete(url: &str) -> Result<Req, Error> {
    Self::new(Method::DELETE, url)
  }

  /// Make this request non-confirmable
  pub fn non(mut self) -> Req {
    self.msg.ty = Type::Non;
    self
  }

  /// This request's method
  pub fn method(&self) -> Method {
    Method(self.msg.code)
  }

  /// Whether the URL's scheme was `coaps`.
  ///
  /// Recognized syntactically only; no cryptography happens here.
  pub fn secure(&self) -> bool {
    self.secure
  }

  /// Set the token responses will be matched by
  pub fn set_token(&mut self, token: Token) {
    self.msg.token = token;
  }

  /// Set the message ID explicitly.
  ///
  /// Requests sent with id 0 get one allocated by the endpoint.
  pub fn set_msg_id(&mut self, id: Id) {
    self.msg.id = id;
  }

  /// Add a payload to this request
  pub fn set_payload<P: IntoIterator<Item = u8>>(&mut self, payload: P) {
    self.msg.payload = Payload(payload.into_iter().collect());
  }

  /// Get the payload's raw bytes
  pub fn payload(&self) -> &[u8] {
    &self.msg.payload.0
  }

  /// Get the payload and attempt to interpret it as a UTF-8 string
  pub fn payload_string(&self) -> Result<String, FromUtf8Error> {
    String::from_utf8(self.payload().to_vec())
  }

  /// Add a custom option to this request
  pub fn set_option(&mut self, number: OptNumber, value: OptValue) -> Result<(), Error> {
    Ok(self.msg.opts.push(number, value)?)
  }

  /// Get the first value of an option
  pub fn get_option(&self, number: OptNumber) -> Option<&OptValue> {
    self.msg.opts.get(number)
  }

  /// Ask the origin server to add (or remove) us from the list of
  /// observers of the requested resource.
  pub fn set_observe(&mut self, action: observe::Action) -> Result<(), Error> {
    self.msg.opts.remove(no_repeat::OBSERVE);
    Ok(self.msg
           .opts
           .push(no_repeat::OBSERVE, OptValue::uint(u32::from(action)))?)
  }

  /// The Observe action this request carries, if any
  pub fn observe_action(&self) -> Option<observe::Action> {
    self.msg
        .opts
        .get(no_repeat::OBSERVE)
        .and_then(|v| v.as_uint())
        .and_then(observe::Action::from_uint)
  }

  /// The path this request addresses, reassembled from the Uri-Path
  /// options ("/" when none are present).
  pub fn path(&self) -> String {
    let mut path = String::new();
    for seg in self.msg.opts.get_all(repeat::URI_PATH) {
      path.push('/');
      path.push_str(&String::from_utf8_lossy(&seg.0));
    }

    if path.is_empty() {
      path.push('/');
    }

    path
  }

  /// Rebuild the URL this request addresses.
  ///
  /// Host and port fall back to `peer` when the Uri-Host / Uri-Port
  /// options are absent, which is the common case for received
  /// requests.
  pub fn url(&self, peer: SocketAddr) -> String {
    let scheme = if self.secure { "coaps" } else { "coap" };

    let host = self.msg
                   .opts
                   .get(no_repeat::URI_HOST)
                   .and_then(|v| v.as_str())
                   .map(str::to_string)
                   .unwrap_or_else(|| peer.ip().to_string());

    let port = self.msg
                   .opts
                   .get(no_repeat::URI_PORT)
                   .and_then(|v| v.as_uint())
                   .map(|p| p as u16)
                   .unwrap_or_else(|| peer.port());

    let query = self.msg
                    .opts
                    .get_all(repeat::URI_QUERY)
                    .map(|v| String::from_utf8_lossy(&v.0).into_owned())
                    .collect::<Vec<_>>()
                    .join("&");

    let mut url = format!("{}://{}:{}{}", scheme, host, port, self.path());
    if !query.is_empty() {
      url.push('?');
      url.push_str(&query);
    }

    url
  }

  /// The message ID
  pub fn msg_id(&self) -> Id {
    self.msg.id
  }

  /// The token
  pub fn token(&self) -> Token {
    self.msg.token
  }

  /// The message type (CON or NON)
  pub fn msg_type(&self) -> Type {
    self.msg.ty
  }

  /// Borrow the underlying message
  pub fn msg(&self) -> &Message {
    &self.msg
  }
}

impl From<Req> for Message {
  fn from(req: Req) -> Message {
    req.msg
  }
}

impl TryFrom<Message> for Req {
  type Error = Error;

  /// Interpret a decoded message as a request.
  ///
  /// Requests are CON or NON with a request code; anything else is an
  /// [`Argument::NotARequest`].
  fn try_from(msg: Message) -> Result<Req, Error> {
    let ty_ok = matches!(msg.ty, Type::Con | Type::Non);
    let code_ok = msg.code.kind() == CodeKind::Request;

    if !ty_ok || !code_ok {
      return Err(Error::Argument(Argument::NotARequest));
    }

    Ok(Req { msg, secure: false })
  }
}

#[cfg(test)]
mod tests {
  use croak_msg::Code;

  use super::*;

  #[test]
  fn binds_host_port_path() {
    let req = Req::get("coap://192.0.2.1:5683/time").unwrap();

    assert_eq!(req.get_option(no_repeat::URI_HOST).unwrap().as_str(),
               Some("192.0.2.1"));
    assert_eq!(req.get_option(no_repeat::URI_PORT).unwrap().as_uint(),
               Some(5683));
    assert_eq!(req.path(), "/time");
    assert!(!req.secure());
  }

  #[test]
  fn default_port() {
    let req = Req::get("coap://host.example/a").unwrap();
    assert_eq!(req.get_option(no_repeat::URI_PORT).unwrap().as_uint(),
               Some(DEFAULT_PORT as u32));
  }

  #[test]
  fn binds_query_params() {
    let req = Req::get("coap://h/r?unit=c&fast").unwrap();
    let qs = req.msg()
                .opts
                .get_all(repeat::URI_QUERY)
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>();
    assert_eq!(qs, vec!["unit=c", "fast"]);
  }

  #[test]
  fn decodes_percent_escapes() {
    let req = Req::get("coap://h/with%20space?k=a%26b").unwrap();
    assert_eq!(req.path(), "/with space");

    let q = req.msg()
               .opts
               .get_all(repeat::URI_QUERY)
               .next()
               .unwrap();
    assert_eq!(q.as_str(), Some("k=a&b"));
  }

  #[test]
  fn skips_empty_segments() {
    let req = Req::get("coap://h//a//b/").unwrap();
    assert_eq!(req.path(), "/a/b");
  }

  #[test]
  fn coaps_marks_secure_only() {
    let req = Req::get("coaps://h/a").unwrap();
    assert!(req.secure());
  }

  #[test]
  fn rejects_fragment() {
    assert!(matches!(Req::get("coap://h/a#frag"),
                     Err(Error::Argument(Argument::UrlFragment))));
  }

  #[test]
  fn rejects_other_schemes() {
    assert!(matches!(Req::get("http://h/a"),
                     Err(Error::Argument(Argument::UrlScheme))));
  }

  #[test]
  fn url_roundtrip() {
    let peer: SocketAddr = "192.0.2.9:9999".parse().unwrap();

    for url in ["coap://192.0.2.1:5683/time",
                "coap://example.com:5683/a/b?k=v",
                "coaps://example.com:5684/s"]
    {
      let req = Req::get(url).unwrap();
      assert_eq!(req.url(peer), *url);
    }
  }

  #[test]
  fn url_defaults_to_peer() {
    let peer: SocketAddr = "192.0.2.9:9999".parse().unwrap();
    let msg = Message::new(Type::Con, Code::GET, Id(1), Token::EMPTY);
    let req = Req::try_from(msg).unwrap();

    assert_eq!(req.url(peer), "coap://192.0.2.9:9999/");
  }

  #[test]
  fn observe_roundtrip() {
    let mut req = Req::get("coap://h/temp").unwrap();
    assert_eq!(req.observe_action(), None);

    req.set_observe(observe::Action::Register).unwrap();
    assert_eq!(req.observe_action(), Some(observe::Action::Register));

    req.set_observe(observe::Action::Deregister).unwrap();
    assert_eq!(req.observe_action(), Some(observe::Action::Deregister));
  }

  #[test]
  fn incoming_validation() {
    let ack = Message::new(Type::Ack, Code::EMPTY, Id(1), Token::EMPTY);
    assert!(matches!(Req::try_from(ack),
                     Err(Error::Argument(Argument::NotARequest))));

    let non = Message::new(Type::Non, Code::PUT, Id(1), Token::EMPTY);
    assert!(Req::try_from(non).is_ok());
  }
}
