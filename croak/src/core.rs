//! The engine shared by both endpoint roles: the send path, the
//! retransmission driver, and the receive-side plumbing.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use croak_msg::{Id, Message, TryFromBytes, TryIntoBytes, Type};

use crate::config::Config;
use crate::error::Error;
use crate::exchange::{Exchanges, Pending, Wake};
use crate::logging::msg_summary;
use crate::net::{Addrd, Socket};
use crate::req::Req;
use crate::resp::Resp;
use crate::retry::{Attempts, Backoff};

/// The callback surface of an endpoint.
///
/// Callbacks run on the endpoint's receive thread (or its poller
/// thread, for [`Listen::on_error`] with
/// [`Error::Undelivered`]), so they must not block. A callback
/// that panics is logged and swallowed; it never takes down the
/// dispatcher.
///
/// Every method defaults to doing nothing, so implementations
/// override only what they care about.
pub trait Listen: Send + Sync + 'static {
  /// A request arrived
  fn on_request(&self, req: Addrd<Req>) {
    let _ = req;
  }

  /// A response (or bare ACK / RST) arrived
  fn on_response(&self, resp: Addrd<Resp>) {
    let _ = resp;
  }

  /// Something went wrong; `msg` is attached when the error concerns a
  /// specific outbound message (e.g. [`Error::Undelivered`]).
  fn on_error(&self, error: Error, msg: Option<Addrd<Message>>) {
    let _ = (error, msg);
  }
}

/// Discards every event
impl Listen for () {}

pub(crate) struct Core<S: Socket> {
  pub(crate) cfg: Config,
  pub(crate) exchanges: Exchanges,
  listener: Box<dyn Listen>,
  sock: Mutex<Arc<S>>,
  done: AtomicBool,
}

impl<S: Socket> core::fmt::Debug for Core<S> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Core")
     .field("cfg", &self.cfg)
     .field("exchanges", &self.exchanges)
     .finish_non_exhaustive()
  }
}

impl<S: Socket> Core<S> {
  pub(crate) fn new(cfg: Config, sock: S, listener: impl Listen) -> Core<S> {
    Core { cfg,
           exchanges: Exchanges::new(),
           listener: Box::new(listener),
           sock: Mutex::new(Arc::new(sock)),
           done: AtomicBool::new(false) }
  }

  pub(crate) fn sock(&self) -> Arc<S> {
    Arc::clone(&self.sock.lock().unwrap())
  }

  /// Replace a socket the OS gave up on (server receive loop only).
  pub(crate) fn rebind_sock(&self) -> Result<(), Error> {
    let mut slot = self.sock.lock().unwrap();
    let addr = slot.local_addr().map_err(Into::into)?;
    let fresh = S::bind(addr).map_err(Into::into)?;
    *slot = Arc::new(fresh);
    Ok(())
  }

  pub(crate) fn stop(&self) {
    self.done.store(true, Ordering::SeqCst);
    self.exchanges.shutdown();
  }

  pub(crate) fn stopped(&self) -> bool {
    self.done.load(Ordering::SeqCst)
  }

  /// Encode and transmit a message, tracking it for retransmission
  /// when confirmable.
  ///
  /// Messages leave here with a usable ID: requests, and responses
  /// opening a fresh exchange, that still carry id 0 get one allocated.
  /// Enrollment (including that allocation) and the first transmission
  /// happen in order, and a failure anywhere on the send path cancels
  /// the enrollment before the error is returned.
  pub(crate) fn send_msg(&self, msg: Addrd<Message>) -> Result<(Id, usize), Error> {
    let backoff = Backoff::from(&self.cfg);

    let msg = match msg.data().ty {
      | Type::Con if msg.data().id == Id(0) => {
        self.exchanges
            .enroll_allocating(msg, backoff.per_attempt_timeout(0))?
      },
      | Type::Con => {
        self.exchanges
            .enroll(msg.clone(), backoff.per_attempt_timeout(0))?;
        msg
      },
      | Type::Non if msg.data().id == Id(0) => {
        let mut msg = msg;
        msg.data_mut().id = self.exchanges.allocate_id()?;
        msg
      },
      // ACK / RST echo the id of the message they answer; a reset for
      // an unrecoverable datagram legitimately carries id 0.
      | _ => msg,
    };

    let id = msg.data().id;

    match self.transmit(&msg) {
      | Ok(sent) => Ok((id, sent)),
      | Err(e) => {
        if msg.data().ty == Type::Con {
          self.exchanges.cancel(id);
        }
        Err(e)
      },
    }
  }

  /// Encode and write to the socket, without touching the pending
  /// queue.
  fn transmit(&self, msg: &Addrd<Message>) -> Result<usize, Error> {
    let addr = msg.addr();
    let bytes = msg.data().clone().try_into_bytes()?;

    let sent = nb::block!(self.sock().send(Addrd(bytes.as_slice(), addr))).map_err(Into::into)?;

    log::trace!("sent {} -> {}", msg_summary(msg.data()), addr);
    Ok(sent)
  }

  /// Run the retransmission state machine until shutdown.
  ///
  /// Wakes every `ack_timeout`, handling at most one timed-out
  /// exchange per wake: under budget the message is re-enrolled with a
  /// doubled per-attempt timeout and retransmitted; over budget it is
  /// surfaced as [`Error::Undelivered`] with the original message.
  pub(crate) fn drive_retransmissions(&self) {
    let backoff = Backoff::from(&self.cfg);

    loop {
      match self.exchanges.poll(self.cfg.ack_timeout) {
        | Wake::Shutdown => break,
        | Wake::Idle => continue,
        | Wake::TimedOut(pending) => {
          if pending.retransmits < self.cfg.max_retransmits {
            self.retransmit(pending, backoff);
          } else {
            log::warn!("{} was never acked, giving up",
                       msg_summary(pending.msg.data()));
            self.on_error(Error::Undelivered, Some(pending.msg));
          }
        },
      }
    }
  }

  fn retransmit(&self, mut pending: Pending, backoff: Backoff) {
    pending.retransmits = Attempts(pending.retransmits.0 + 1);
    pending.timeout = backoff.per_attempt_timeout(pending.retransmits.0);

    let msg = pending.msg.clone();
    let attempt = pending.retransmits.0;

    if let Err(e) = self.exchanges.re_enroll(pending) {
      self.on_error(e, Some(msg));
      return;
    }

    log::debug!("retransmitting {} (attempt {})",
                msg_summary(msg.data()),
                attempt);

    if let Err(e) = self.transmit(&msg) {
      self.exchanges.cancel(msg.data().id);
      self.on_error(e, Some(msg));
    }
  }

  /// Decode one received datagram.
  pub(crate) fn decode(&self, dgram: Addrd<&[u8]>) -> Result<Addrd<Message>, Error> {
    let addr = dgram.addr();
    let msg = Message::try_from_bytes(dgram.data())?;
    log::trace!("recvd {} <- {}", msg_summary(&msg), addr);
    Ok(Addrd(msg, addr))
  }

  /// For an inbound ACK / RST, remove the exchange it answers.
  ///
  /// Runs before any callback, so a callback never observes its own
  /// message still enrolled.
  pub(crate) fn settle(&self, msg: &Addrd<Message>) -> Option<Pending> {
    match msg.data().ty {
      | Type::Ack | Type::Reset => self.exchanges.cancel(msg.data().id),
      | _ => None,
    }
  }

  /// Answer a confirmable message nobody will respond to (a ping, or
  /// context we lost) with a bare RST.
  pub(crate) fn reply_rst(&self, msg: &Addrd<Message>) {
    let rst = Addrd(msg.data().rst(), msg.addr());
    if let Err(e) = self.send_msg(rst) {
      log::warn!("failed to reset {}: {}", msg.addr(), e);
    }
  }

  /// A separate response arrived as CON; stop the peer's
  /// retransmissions with a bare ACK.
  pub(crate) fn ack_con_response(&self, msg: &Addrd<Message>) {
    if msg.data().ty != Type::Con {
      return;
    }

    let ack = Addrd(msg.data().ack(), msg.addr());
    if let Err(e) = self.send_msg(ack) {
      log::warn!("failed to ack separate response from {}: {}",
                 msg.addr(),
                 e);
    }
  }

  // Callback plumbing. Whatever the application does in a callback
  // stays in the callback; a panic is logged and the dispatcher moves
  // on.

  pub(crate) fn on_request(&self, req: Addrd<Req>) {
    self.guarded(move |l| l.on_request(req));
  }

  pub(crate) fn on_response(&self, resp: Addrd<Resp>) {
    self.guarded(move |l| l.on_response(resp));
  }

  pub(crate) fn on_error(&self, error: Error, msg: Option<Addrd<Message>>) {
    self.guarded(move |l| l.on_error(error, msg));
  }

  fn guarded(&self, f: impl FnOnce(&dyn Listen)) {
    if catch_unwind(AssertUnwindSafe(|| f(self.listener.as_ref()))).is_err() {
      log::error!("a listener callback panicked; continuing");
    }
  }
}
