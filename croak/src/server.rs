use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::thread::JoinHandle;

use croak_msg::opt::observe::Action;
use croak_msg::{Code, CodeKind, Id, Message, Token, Type};

use crate::client::{MAX_CONSECUTIVE_IO_ERRORS, RECV_BUF_SIZE};
use crate::config::Config;
use crate::core::{Core, Listen};
use crate::error::Error;
use crate::net::{Addrd, Socket};
use crate::observe::Observers;
use crate::req::Req;
use crate::resp::Resp;
use crate::separate::SeparateQueue;

/// A CoAP server endpoint: a bound socket, a receive loop dispatching
/// requests to the [`Listen`] implementation, the observer registry,
/// and the queue of requests deferred for separate responses.
///
/// ```no_run
/// use croak::net::Addrd;
/// use croak::req::Req;
/// use croak::resp::{code, Resp};
/// use croak::server::Server;
///
/// struct Time;
/// impl croak::Listen for Time {
///   fn on_request(&self, req: Addrd<Req>) {
///     // answer from another thread, or right here
///   }
/// }
///
/// let server = Server::new("0.0.0.0:5683", Time).unwrap();
/// ```
#[derive(Debug)]
pub struct Server<S: Socket = UdpSocket> {
  core: Arc<Core<S>>,
  side: Arc<Side>,
  threads: Vec<JoinHandle<()>>,
}

#[derive(Debug, Default)]
struct Side {
  observers: Observers,
  separate: SeparateQueue,
}

impl Server<UdpSocket> {
  /// Bind a UDP socket and start the endpoint threads with the default
  /// [`Config`].
  pub fn new<A: ToSocketAddrs>(addr: A, listener: impl Listen) -> Result<Server<UdpSocket>, Error> {
    Self::with_config(Config::default(), addr, listener)
  }

  /// [`Server::new`] with explicit tunables
  pub fn with_config<A: ToSocketAddrs>(cfg: Config,
                                       addr: A,
                                       listener: impl Listen)
                                       -> Result<Server<UdpSocket>, Error> {
    let sock = <UdpSocket as Socket>::bind(addr).map_err(Error::Io)?;
    Ok(Self::start(cfg, sock, listener))
  }
}

impl<S: Socket> Server<S> {
  /// Start an endpoint over an already-bound socket.
  pub fn start(cfg: Config, sock: S, listener: impl Listen) -> Server<S> {
    let core = Arc::new(Core::new(cfg, sock, listener));
    let side = Arc::new(Side::default());

    let recv = {
      let core = Arc::clone(&core);
      let side = Arc::clone(&side);
      std::thread::spawn(move || Self::recv_loop(&core, &side))
    };
    let poll = {
      let core = Arc::clone(&core);
      std::thread::spawn(move || core.drive_retransmissions())
    };

    Server { core,
             side,
             threads: vec![recv, poll] }
  }

  /// The clients observing this server's resources
  pub fn observers(&self) -> &Observers {
    &self.side.observers
  }

  /// Acknowledge a confirmable request now and park it for a separate
  /// response later.
  ///
  /// The bare ACK stops the peer retransmitting while the application
  /// prepares the real answer; [`Server::next_pending_separate`] hands
  /// the request back when it is ready to be answered (build the
  /// response with [`Resp::separate`] so it carries the original
  /// token).
  pub fn add_pending_separate(&self, req: Addrd<Req>) -> Result<(), Error> {
    if req.data().msg_type() == Type::Con {
      let ack = Addrd(req.data().msg().ack(), req.addr());
      self.core.send_msg(ack)?;
    }

    self.side.separate.enqueue(req);
    Ok(())
  }

  /// Take the longest-waiting deferred request, if any
  pub fn next_pending_separate(&self) -> Option<Addrd<Req>> {
    self.side.separate.dequeue()
  }

  /// Send a response to a peer.
  ///
  /// A failure to send unregisters any observer the response's token
  /// identifies; a subscriber we cannot reach is a subscriber no more.
  pub fn send(&self, resp: Addrd<Resp>) -> Result<(Id, usize), Error> {
    let token = resp.data().token();
    let msg = resp.map(Message::from);

    self.core.send_msg(msg).map_err(|e| {
                             self.side.observers.unregister_by_token(token);
                             e
                           })
  }

  /// Send a raw message to a peer.
  pub fn send_msg(&self, msg: Addrd<Message>) -> Result<(Id, usize), Error> {
    self.core.send_msg(msg)
  }

  /// Push the new state of a resource to everyone observing it.
  ///
  /// Each observer gets a non-confirmable response carrying its own
  /// subscription token and a fresh message ID. Observers that fail to
  /// send are unregistered. Returns how many notifications went out.
  pub fn notify(&self, url: &str, code: Code, payload: impl AsRef<[u8]>) -> Result<usize, Error> {
    let mut sent = 0;

    for observer in self.side.observers.list(url) {
      let mut resp = Resp::separate(observer.req.data(), false);
      resp.set_code(code);
      resp.set_payload(payload.as_ref().iter().copied());

      match self.core.send_msg(Addrd(resp.into(), observer.req.addr())) {
        | Ok(_) => sent += 1,
        | Err(e) => {
          log::warn!("dropping observer of {}: {}", url, e);
          self.side.observers.unregister_by_token(observer.token());
          self.core.on_error(e, None);
        },
      }
    }

    Ok(sent)
  }

  /// The local address of this server's socket
  pub fn local_addr(&self) -> Result<SocketAddr, Error> {
    self.core.sock().local_addr().map_err(Into::into)
  }

  /// This endpoint's tunables
  pub fn config(&self) -> &Config {
    &self.core.cfg
  }

  /// Stop both endpoint threads, drop all pending exchanges, parked
  /// requests, and observers.
  ///
  /// Idempotent; also runs on drop.
  pub fn shutdown(&mut self) {
    self.core.stop();
    for t in self.threads.drain(..) {
      let _ = t.join();
    }
    self.side.separate.clear();
    self.side.observers.clear();
  }

  fn recv_loop(core: &Core<S>, side: &Side) {
    let mut buf = [0u8; RECV_BUF_SIZE];
    let mut io_errors = 0u8;

    while !core.stopped() {
      match core.sock().recv(&mut buf) {
        | Ok(Addrd(n, addr)) => {
          io_errors = 0;
          Self::dispatch(core, side, Addrd(&buf[..n], addr));
        },
        | Err(nb::Error::WouldBlock) => std::thread::sleep(core.cfg.poll_interval),
        | Err(nb::Error::Other(e)) => {
          io_errors += 1;
          core.on_error(e.into(), None);

          // a server outlives its socket if it can; rebind and carry on
          match core.rebind_sock() {
            | Ok(()) => log::warn!("recreated server socket after error"),
            | Err(e) if io_errors >= MAX_CONSECUTIVE_IO_ERRORS => {
              log::error!("receive loop stopping: cannot recreate socket: {}", e);
              core.stop();
            },
            | Err(_) => {},
          }
        },
      }
    }
  }

  /// Classify one datagram and route it.
  fn dispatch(core: &Core<S>, side: &Side, dgram: Addrd<&[u8]>) {
    let msg = match core.decode(dgram) {
      | Ok(msg) => msg,
      | Err(e) => {
        Self::reject_undecodable(core, dgram);
        core.on_error(e, None);
        return;
      },
    };

    let settled = core.settle(&msg);

    // the peer rejecting a message is a subscriber hanging up: find the
    // subscription by the RST's token, or by the notification it
    // answers
    if msg.data().ty == Type::Reset {
      let token = Some(msg.data().token)
                       .filter(|t| !t.is_empty())
                       .or_else(|| settled.as_ref().map(|p| p.msg.data().token));

      if let Some(token) = token {
        if side.observers.unregister_by_token(token) {
          log::debug!("observer {:?} unregistered by reset", token);
        }
      }
    }

    match msg.data().code.kind() {
      | CodeKind::Empty if msg.data().ty == Type::Con => core.reply_rst(&msg),
      | CodeKind::Empty => Self::dispatch_response(core, msg),
      | CodeKind::Request => Self::dispatch_request(core, side, msg),
      | CodeKind::Response => {
        core.ack_con_response(&msg);
        Self::dispatch_response(core, msg);
      },
    }
  }

  fn dispatch_request(core: &Core<S>, side: &Side, msg: Addrd<Message>) {
    let addr = msg.addr();
    let req = match Req::try_from(msg.unwrap()) {
      | Ok(req) => Addrd(req, addr),
      | Err(e) => {
        core.on_error(e, None);
        return;
      },
    };

    match req.data().observe_action() {
      | Some(Action::Register) => side.observers.register(req.clone()),
      | Some(Action::Deregister) => {
        side.observers
            .unregister(&req.data().path(), req.data().token());
      },
      | None => {},
    }

    core.on_request(req);
  }

  fn dispatch_response(core: &Core<S>, msg: Addrd<Message>) {
    let addr = msg.addr();
    match Resp::try_from(msg.unwrap()) {
      | Ok(resp) => core.on_response(Addrd(resp, addr)),
      | Err(e) => core.on_error(e, None),
    }
  }

  /// A confirmable message we can't decode still gets an answer: a
  /// reset telling the peer to stop retransmitting, with whatever
  /// message ID the header yielded (0 if even that was lost).
  fn reject_undecodable(core: &Core<S>, dgram: Addrd<&[u8]>) {
    if croak_msg::peek::message_type(dgram.data()) != Some(Type::Con) {
      return;
    }

    let id = croak_msg::peek::message_id(dgram.data()).unwrap_or(Id(0));
    let rst = Message::new(Type::Reset, Code::new(4, 0), id, Token::EMPTY);

    if let Err(e) = core.send_msg(Addrd(rst, dgram.addr())) {
      log::warn!("failed to reject undecodable message from {}: {}",
                 dgram.addr(),
                 e);
    }
  }
}

impl<S: Socket> Drop for Server<S> {
  fn drop(&mut self) {
    self.shutdown();
  }
}
