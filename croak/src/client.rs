use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::thread::JoinHandle;

use croak_msg::{Code, CodeKind, Id, Message, Token, Type};

use crate::config::Config;
use crate::core::{Core, Listen};
use crate::error::{Argument, Error};
use crate::net::{Addrd, Socket};
use crate::req::Req;
use crate::resp::Resp;

// Datagrams above croak's cap still deserve a decode attempt; be
// liberal about what the buffer accepts.
pub(crate) const RECV_BUF_SIZE: usize = 512;

// A socket that fails this many reads in a row is considered gone.
pub(crate) const MAX_CONSECUTIVE_IO_ERRORS: u8 = 5;

/// A CoAP client endpoint: a socket aimed at one server, a receive
/// loop, and the retransmission machinery for confirmable requests.
///
/// Incoming traffic is handed to the [`Listen`] implementation the
/// client was built with; see [`crate::blocking::Client`] for a
/// callback-free variant.
///
/// ```no_run
/// use croak::client::Client;
/// use croak::req::Req;
///
/// let client = Client::new("192.0.2.1", 5683, ()).unwrap();
///
/// let mut req = Req::get("coap://192.0.2.1/time").unwrap();
/// req.set_token(croak_msg::Token::opaque(b"my-request"));
/// client.send(req).unwrap();
/// ```
#[derive(Debug)]
pub struct Client<S: Socket = UdpSocket> {
  core: Arc<Core<S>>,
  peer: SocketAddr,
  threads: Vec<JoinHandle<()>>,
}

impl Client<UdpSocket> {
  /// Resolve a host, bind an ephemeral UDP socket, and start the
  /// endpoint threads with the default [`Config`].
  pub fn new(host: &str, port: u16, listener: impl Listen) -> Result<Client<UdpSocket>, Error> {
    Self::with_config(Config::default(), host, port, listener)
  }

  /// [`Client::new`] with explicit tunables
  pub fn with_config(cfg: Config,
                     host: &str,
                     port: u16,
                     listener: impl Listen)
                     -> Result<Client<UdpSocket>, Error> {
    let peer = (host, port).to_socket_addrs()
                           .map_err(Error::Io)?
                           .next()
                           .ok_or(Error::Argument(Argument::HostUnresolved))?;

    let bind_addr: SocketAddr = match peer {
      | SocketAddr::V4(_) => "0.0.0.0:0".parse().unwrap(),
      | SocketAddr::V6(_) => "[::]:0".parse().unwrap(),
    };

    let sock = <UdpSocket as Socket>::bind(bind_addr).map_err(Error::Io)?;
    Ok(Self::start(cfg, sock, peer, listener))
  }
}

impl<S: Socket> Client<S> {
  /// Start an endpoint over an already-bound socket.
  pub fn start(cfg: Config, sock: S, peer: SocketAddr, listener: impl Listen) -> Client<S> {
    let core = Arc::new(Core::new(cfg, sock, listener));

    let recv = {
      let core = Arc::clone(&core);
      std::thread::spawn(move || Self::recv_loop(&core))
    };
    let poll = {
      let core = Arc::clone(&core);
      std::thread::spawn(move || core.drive_retransmissions())
    };

    Client { core,
             peer,
             threads: vec![recv, poll] }
  }

  /// Send a request to this client's server, returning the message ID
  /// it went out under and the number of bytes sent.
  ///
  /// Confirmable requests are retransmitted until acked or the budget
  /// runs out (then [`Listen::on_error`] sees
  /// [`Error::Undelivered`]).
  pub fn send(&self, req: Req) -> Result<(Id, usize), Error> {
    self.send_msg(Addrd(req.into(), self.peer))
  }

  /// Send a raw message to an arbitrary peer.
  pub fn send_msg(&self, msg: Addrd<Message>) -> Result<(Id, usize), Error> {
    self.core.send_msg(msg)
  }

  /// Check the server is alive: send a confirmable empty message, which
  /// the peer answers with a bare RST carrying the same ID.
  pub fn ping(&self) -> Result<Id, Error> {
    let msg = Message::new(Type::Con, Code::EMPTY, Id(0), Token::EMPTY);
    self.send_msg(Addrd(msg, self.peer)).map(|(id, _)| id)
  }

  /// The server this client is aimed at
  pub fn peer_addr(&self) -> SocketAddr {
    self.peer
  }

  /// The local address of this client's socket
  pub fn local_addr(&self) -> Result<SocketAddr, Error> {
    self.core.sock().local_addr().map_err(Into::into)
  }

  /// This endpoint's tunables
  pub fn config(&self) -> &Config {
    &self.core.cfg
  }

  /// Message IDs currently attached to in-flight confirmable
  /// exchanges.
  pub fn in_flight_ids(&self) -> std::collections::BTreeSet<u16> {
    self.core.exchanges.in_use_ids()
  }

  /// Stop both endpoint threads and drop all pending exchanges.
  ///
  /// Idempotent; also runs on drop.
  pub fn shutdown(&mut self) {
    self.core.stop();
    for t in self.threads.drain(..) {
      let _ = t.join();
    }
  }

  fn recv_loop(core: &Core<S>) {
    let mut buf = [0u8; RECV_BUF_SIZE];
    let mut io_errors = 0u8;

    while !core.stopped() {
      match core.sock().recv(&mut buf) {
        | Ok(Addrd(n, addr)) => {
          io_errors = 0;
          Self::dispatch(core, Addrd(&buf[..n], addr));
        },
        | Err(nb::Error::WouldBlock) => std::thread::sleep(core.cfg.poll_interval),
        | Err(nb::Error::Other(e)) => {
          io_errors += 1;
          core.on_error(e.into(), None);

          if io_errors >= MAX_CONSECUTIVE_IO_ERRORS {
            log::error!("receive loop stopping: socket keeps failing");
            core.stop();
          }
        },
      }
    }
  }

  /// Classify one datagram and route it to the listener.
  fn dispatch(core: &Core<S>, dgram: Addrd<&[u8]>) {
    let msg = match core.decode(dgram) {
      | Ok(msg) => msg,
      | Err(e) => {
        core.on_error(e, None);
        return;
      },
    };

    // happens-before the on_response below, so the callback never sees
    // its exchange still pending
    core.settle(&msg);

    match msg.data().code.kind() {
      | CodeKind::Empty if msg.data().ty == Type::Con => core.reply_rst(&msg),
      | CodeKind::Empty => Self::dispatch_response(core, msg),
      | CodeKind::Request => {
        let addr = msg.addr();
        match Req::try_from(msg.unwrap()) {
          | Ok(req) => core.on_request(Addrd(req, addr)),
          | Err(e) => core.on_error(e, None),
        }
      },
      | CodeKind::Response => {
        core.ack_con_response(&msg);
        Self::dispatch_response(core, msg);
      },
    }
  }

  fn dispatch_response(core: &Core<S>, msg: Addrd<Message>) {
    let addr = msg.addr();
    match Resp::try_from(msg.unwrap()) {
      | Ok(resp) => core.on_response(Addrd(resp, addr)),
      | Err(e) => core.on_error(e, None),
    }
  }
}

impl<S: Socket> Drop for Client<S> {
  fn drop(&mut self) {
    self.shutdown();
  }
}
