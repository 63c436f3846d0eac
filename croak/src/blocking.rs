//! A synchronous client: poll for messages instead of installing
//! callbacks.

use std::net::UdpSocket;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use croak_msg::{CodeKind, Message};

use crate::client;
use crate::config::Config;
use crate::core::Listen;
use crate::error::Error;
use crate::net::Addrd;
use crate::req::Req;
use crate::resp::Resp;

enum Incoming {
  Msg(Addrd<Message>),
  Failed(Error, Option<Addrd<Message>>),
}

/// Funnels the endpoint's callbacks into a channel the blocking client
/// drains.
struct Funnel(Mutex<Sender<Incoming>>);

impl Funnel {
  fn push(&self, incoming: Incoming) {
    // a full shutdown drops the receiver; nothing left to notify
    let _ = self.0.lock().unwrap().send(incoming);
  }
}

impl Listen for Funnel {
  fn on_request(&self, req: Addrd<Req>) {
    self.push(Incoming::Msg(req.map(Message::from)));
  }

  fn on_response(&self, resp: Addrd<Resp>) {
    self.push(Incoming::Msg(resp.map(Message::from)));
  }

  fn on_error(&self, error: Error, msg: Option<Addrd<Message>>) {
    self.push(Incoming::Failed(error, msg));
  }
}

/// A blocking CoAP request client.
///
/// ```no_run
/// use croak::blocking::Client;
/// use croak::req::Req;
///
/// let client = Client::new("192.0.2.1", 5683).unwrap();
/// let rep = client.send(Req::get("coap://192.0.2.1/hello").unwrap())
///                 .unwrap();
///
/// println!("{}", rep.payload_string().unwrap());
/// ```
#[derive(Debug)]
pub struct Client {
  inner: client::Client<UdpSocket>,
  rx: Mutex<Receiver<Incoming>>,
}

impl Client {
  /// Connect to a server with the default [`Config`]
  pub fn new(host: &str, port: u16) -> Result<Client, Error> {
    Self::with_config(Config::default(), host, port)
  }

  /// [`Client::new`] with explicit tunables
  pub fn with_config(cfg: Config, host: &str, port: u16) -> Result<Client, Error> {
    let (tx, rx) = channel();
    let inner = client::Client::with_config(cfg, host, port, Funnel(Mutex::new(tx)))?;

    Ok(Client { inner,
                rx: Mutex::new(rx) })
  }

  /// Pull the next incoming message, waiting at most `timeout`.
  ///
  /// `Ok(None)` means the timeout elapsed with nothing to show for it;
  /// errors the endpoint reported (undelivered messages, socket
  /// failures) surface here as `Err`.
  pub fn receive(&self, timeout: Duration) -> Result<Option<Addrd<Message>>, Error> {
    match self.rx.lock().unwrap().recv_timeout(timeout) {
      | Ok(Incoming::Msg(msg)) => Ok(Some(msg)),
      | Ok(Incoming::Failed(e, _)) => Err(e),
      | Err(RecvTimeoutError::Timeout) => Ok(None),
      | Err(RecvTimeoutError::Disconnected) => Ok(None),
    }
  }

  /// Send a request and wait for the response that answers it,
  /// matching by token across piggybacked and separate responses.
  pub fn send(&self, req: Req) -> Result<Resp, Error> {
    let token = req.token();
    self.inner.send(req)?;

    let deadline = Instant::now() + self.patience();
    loop {
      let left = deadline.saturating_duration_since(Instant::now());

      match self.receive(left)? {
        | None => return Err(Error::Undelivered),
        | Some(msg) if msg.data().token == token
                       && msg.data().code.kind() == CodeKind::Response =>
        {
          return Resp::try_from(msg.unwrap())
        },
        // someone else's exchange, or a bare ACK; keep waiting
        | Some(_) => continue,
      }
    }
  }

  /// Ping the server, waiting for its reset.
  pub fn ping(&self) -> Result<(), Error> {
    let id = self.inner.ping()?;

    let deadline = Instant::now() + self.patience();
    loop {
      let left = deadline.saturating_duration_since(Instant::now());

      match self.receive(left)? {
        | None => return Err(Error::Undelivered),
        | Some(msg) if msg.data().id == id
                       && msg.data().code.kind() == CodeKind::Empty =>
        {
          return Ok(())
        },
        | Some(_) => continue,
      }
    }
  }

  /// How long [`Client::send`] waits before declaring a request dead:
  /// the full retransmission window plus one more timeout for the
  /// answer to travel back.
  fn patience(&self) -> Duration {
    self.inner.config().max_transmit_span() + self.inner.config().ack_timeout
  }

  /// Stop the endpoint threads
  pub fn shutdown(&mut self) {
    self.inner.shutdown();
  }
}
