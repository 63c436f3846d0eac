use std::string::FromUtf8Error;

use croak_msg::opt::known::{no_repeat, repeat};
use croak_msg::{Code, CodeKind, ContentFormat, Id, Message, OptNumber, OptValue, Payload, Token,
                Type};

use crate::error::{Argument, Error};
use crate::req::Req;

/// Response codes
pub mod code;

/// A CoAP response: the answer to a [`Req`], correlated by token.
///
/// Piggybacked responses ride in the ACK of a confirmable request
/// ([`Resp::for_request`]); separate responses are fresh messages
/// carrying the request's token ([`Resp::separate`]).
///
/// ```
/// use croak::resp::{code, Resp};
/// use croak::req::Req;
///
/// // pretend this is an incoming request
/// let mut req = Req::get("coap://192.0.2.1/hello").unwrap();
/// req.set_msg_id(croak_msg::Id(7));
///
/// let mut resp = Resp::for_request(&req).unwrap();
/// resp.set_code(code::CONTENT);
/// resp.set_payload("hi there".bytes());
///
/// // the ACK inherits the request's id and token
/// assert_eq!(resp.msg_id(), req.msg_id());
/// assert_eq!(resp.token(), req.token());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Resp {
  msg: Message,
}

impl Resp {
  /// Create a response for a request.
  ///
  /// A confirmable request gets an ACK (piggybacked response); a
  /// non-confirmable request gets a NON. This constructor never yields
  /// a confirmable response; see [`Resp::separate`] for that.
  ///
  /// Returns None when the message in the request slot is not a
  /// request (empty / ACK / RST).
  pub fn for_request(req: &Req) -> Option<Resp> {
    match req.msg_type() {
      | Type::Con => Some(Self::ack(req)),
      | Type::Non => Some(Self::non(req)),
      | _ => None,
    }
  }

  /// Create a response ACKnowledging a confirmable request.
  ///
  /// Inherits the request's message ID (so the ACK stops the peer's
  /// retransmissions) and token (so the peer can match the payload to
  /// its request).
  pub fn ack(req: &Req) -> Resp {
    let msg = Message::new(Type::Ack, code::CONTENT, req.msg_id(), req.token());
    Resp { msg }
  }

  /// Create a non-confirmable response for a request.
  pub fn non(req: &Req) -> Resp {
    let msg = Message::new(Type::Non, code::CONTENT, Id(0), req.token());
    Resp { msg }
  }

  /// Create a separate response: a fresh message carrying the
  /// original request's token, sent after an empty ACK already stopped
  /// the peer's retransmissions.
  ///
  /// `confirmable` asks the endpoint to retransmit the response until
  /// the peer ACKs it. The message ID is left unassigned; the endpoint
  /// allocates one at send time.
  pub fn separate(req: &Req, confirmable: bool) -> Resp {
    let ty = if confirmable { Type::Con } else { Type::Non };
    let msg = Message::new(ty, code::CONTENT, Id(0), req.token());
    Resp { msg }
  }

  /// Change the code of this response
  pub fn set_code(&mut self, code: Code) {
    self.msg.code = code;
  }

  /// The response code (e.g. 2.05)
  pub fn code(&self) -> Code {
    self.msg.code
  }

  /// Add a payload to this response
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

  /// Set the Content-Format option
  pub fn set_content_format(&mut self, format: ContentFormat) -> Result<(), Error> {
    self.msg.opts.remove(no_repeat::CONTENT_FORMAT);
    Ok(self.msg
           .opts
           .push(no_repeat::CONTENT_FORMAT,
                 OptValue::uint(u16::from(&format) as u32))?)
  }

  /// Add a custom option to this response
  pub fn set_option(&mut self, number: OptNumber, value: OptValue) -> Result<(), Error> {
    Ok(self.msg.opts.push(number, value)?)
  }

  /// Get the first value of an option
  pub fn get_option(&self, number: OptNumber) -> Option<&OptValue> {
    self.msg.opts.get(number)
  }

  /// Point the peer at the location of a resource this response
  /// created, as a relative URL (`/path/to/it?k=v`).
  ///
  /// Fills the Location-Path and Location-Query options, the mirror of
  /// the request side's Uri-Path / Uri-Query binding.
  pub fn set_location(&mut self, relative: &str) -> Result<(), Error> {
    let (path, query) = match relative.split_once('?') {
      | Some((p, q)) => (p, Some(q)),
      | None => (relative, None),
    };

    self.msg.opts.remove(repeat::LOCATION_PATH);
    self.msg.opts.remove(repeat::LOCATION_QUERY);

    for seg in path.split('/').filter(|s| !s.is_empty()) {
      self.msg.opts.push(repeat::LOCATION_PATH, seg.into())?;
    }

    for param in query.into_iter()
                      .flat_map(|q| q.split('&'))
                      .filter(|p| !p.is_empty())
    {
      self.msg.opts.push(repeat::LOCATION_QUERY, param.into())?;
    }

    Ok(())
  }

  /// The relative URL the Location-Path / Location-Query options
  /// describe, if any.
  pub fn location(&self) -> Option<String> {
    let path = self.msg
                   .opts
                   .get_all(repeat::LOCATION_PATH)
                   .map(|v| String::from_utf8_lossy(&v.0).into_owned())
                   .collect::<Vec<_>>();

    if path.is_empty() {
      return None;
    }

    let mut out = format!("/{}", path.join("/"));

    let query = self.msg
                    .opts
                    .get_all(repeat::LOCATION_QUERY)
                    .map(|v| String::from_utf8_lossy(&v.0).into_owned())
                    .collect::<Vec<_>>()
                    .join("&");
    if !query.is_empty() {
      out.push('?');
      out.push_str(&query);
    }

    Some(out)
  }

  /// Set the token that correlates this response to a request
  pub fn set_token(&mut self, token: Token) {
    self.msg.token = token;
  }

  /// The token that correlates this response to a request
  pub fn token(&self) -> Token {
    self.msg.token
  }

  /// Set the message ID explicitly.
  ///
  /// Responses sent with id 0 (other than ACK / RST, which inherit the
  /// id they answer) get one allocated by the endpoint.
  pub fn set_msg_id(&mut self, id: Id) {
    self.msg.id = id;
  }

  /// The message ID
  pub fn msg_id(&self) -> Id {
    self.msg.id
  }

  /// The message type (ACK, NON, RST; CON for separate responses)
  pub fn msg_type(&self) -> Type {
    self.msg.ty
  }

  /// Borrow the underlying message
  pub fn msg(&self) -> &Message {
    &self.msg
  }
}

impl From<Resp> for Message {
  fn from(resp: Resp) -> Message {
    resp.msg
  }
}

impl TryFrom<Message> for Resp {
  type Error = Error;

  /// Interpret a decoded message as a response.
  ///
  /// Responses carry a response code, or an empty code (bare ACK /
  /// RST). A message with a request code is an
  /// [`Argument::NotAResponse`].
  fn try_from(msg: Message) -> Result<Resp, Error> {
    match msg.code.kind() {
      | CodeKind::Response | CodeKind::Empty => Ok(Resp { msg }),
      | CodeKind::Request => Err(Error::Argument(Argument::NotAResponse)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn req() -> Req {
    let mut req = Req::get("coap://192.0.2.1/x").unwrap();
    req.set_msg_id(Id(40));
    req.set_token(Token::from_bytes(&[1, 2]).unwrap());
    req
  }

  #[test]
  fn piggybacked_inherits_id_and_token() {
    let resp = Resp::for_request(&req()).unwrap();
    assert_eq!(resp.msg_type(), Type::Ack);
    assert_eq!(resp.msg_id(), Id(40));
    assert_eq!(resp.token(), Token::from_bytes(&[1, 2]).unwrap());
  }

  #[test]
  fn non_request_gets_non_response() {
    let resp = Resp::for_request(&req().non()).unwrap();
    assert_eq!(resp.msg_type(), Type::Non);
    assert_eq!(resp.token(), Token::from_bytes(&[1, 2]).unwrap());
    // fresh exchange, not an ACK; id is assigned at send time
    assert_eq!(resp.msg_id(), Id(0));
  }

  #[test]
  fn for_request_never_yields_con() {
    assert_ne!(Resp::for_request(&req()).unwrap().msg_type(), Type::Con);
    assert_ne!(Resp::for_request(&req().non()).unwrap().msg_type(),
               Type::Con);
  }

  #[test]
  fn separate_keeps_token_only() {
    let resp = Resp::separate(&req(), true);
    assert_eq!(resp.msg_type(), Type::Con);
    assert_eq!(resp.token(), Token::from_bytes(&[1, 2]).unwrap());
    assert_eq!(resp.msg_id(), Id(0));
  }

  #[test]
  fn location_roundtrip() {
    let mut resp = Resp::for_request(&req()).unwrap();
    resp.set_code(code::CREATED);
    resp.set_location("/store/items/7?rev=2").unwrap();

    assert_eq!(resp.location().unwrap(), "/store/items/7?rev=2");

    let locs = resp.msg()
                   .opts
                   .get_all(repeat::LOCATION_PATH)
                   .filter_map(|v| v.as_str())
                   .collect::<Vec<_>>();
    assert_eq!(locs, vec!["store", "items", "7"]);
  }

  #[test]
  fn incoming_validation() {
    let rst = Message::new(Type::Reset, Code::EMPTY, Id(1), Token::EMPTY);
    assert!(Resp::try_from(rst).is_ok());

    let get = Message::new(Type::Con, Code::GET, Id(1), Token::EMPTY);
    assert!(matches!(Resp::try_from(get),
                     Err(Error::Argument(Argument::NotAResponse))));
  }
}
