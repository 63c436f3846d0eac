//! Bookkeeping for confirmable messages awaiting an ACK or RST.

use std::collections::BTreeSet;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use croak_msg::{Id, Message, Type};

use crate::error::{Argument, Error, Unsupported};
use crate::net::Addrd;
use crate::retry::Attempts;

/// One in-flight confirmable message.
#[derive(Debug, Clone)]
pub struct Pending {
  /// The message as it went onto the wire
  pub msg: Addrd<Message>,
  /// When the latest transmission was handed to the socket
  pub dispatched: Instant,
  /// How long to wait for an ACK before this entry times out
  pub timeout: Duration,
  /// How many retransmissions have happened so far
  pub retransmits: Attempts,
}

/// What the queue poller should do after a wake.
#[derive(Debug)]
pub(crate) enum Wake {
  /// An entry waited longer than its per-attempt timeout; it has been
  /// removed and the retransmission state machine should decide its
  /// fate.
  ///
  /// At most one entry is yielded per wake to keep the critical
  /// section short.
  TimedOut(Pending),
  /// Nothing to do
  Idle,
  /// [`Exchanges::shutdown`] was called
  Shutdown,
}

#[derive(Debug)]
struct State {
  pending: Vec<Pending>,
  next_id: u16,
  done: bool,
}

/// The time-ordered set of in-flight confirmable messages, plus the
/// message-ID counter.
///
/// Everything lives under one mutex: enrollment, cancellation, the
/// poller's scan, and ID allocation. Allocating under the same lock is
/// what keeps two concurrent `send`s from picking the same ID.
#[derive(Debug)]
pub struct Exchanges {
  state: Mutex<State>,
  wake: Condvar,
}

impl Default for Exchanges {
  fn default() -> Self {
    Exchanges::new()
  }
}

impl Exchanges {
  /// Create an empty queue.
  ///
  /// The ID counter starts at a random point in the 16-bit space, per
  /// [RFC7252 Section 4.4](https://datatracker.ietf.org/doc/html/rfc7252#section-4.4).
  pub fn new() -> Self {
    Exchanges { state: Mutex::new(State { pending: Vec::new(),
                                          next_id: rand::random::<u16>(),
                                          done: false }),
                wake: Condvar::new() }
  }

  /// Allocate a message ID that no in-flight exchange is using.
  ///
  /// Never yields 0, which outbound messages use to mean "assign me
  /// one". The scan is bounded to one full wrap of the ID space; if
  /// every ID is in use this yields
  /// [`Unsupported::IdSpaceExhausted`](crate::error::Unsupported)
  /// rather than spinning.
  pub fn allocate_id(&self) -> Result<Id, Error> {
    let mut state = self.state.lock().unwrap();
    Self::allocate_locked(&mut state)
  }

  /// Track a confirmable message until [`Exchanges::cancel`]led or
  /// timed out.
  ///
  /// Errors when the message is not CON, or when its ID is already
  /// enrolled (in-flight IDs must be unique per endpoint).
  pub fn enroll(&self, msg: Addrd<Message>, timeout: Duration) -> Result<(), Error> {
    let mut state = self.state.lock().unwrap();
    Self::enroll_locked(&mut state, msg, timeout, Attempts(0))
  }

  /// Allocate a fresh ID and enroll in one critical section, returning
  /// the message with its ID assigned.
  pub fn enroll_allocating(&self,
                           mut msg: Addrd<Message>,
                           timeout: Duration)
                           -> Result<Addrd<Message>, Error> {
    let mut state = self.state.lock().unwrap();
    msg.data_mut().id = Self::allocate_locked(&mut state)?;
    Self::enroll_locked(&mut state, msg.clone(), timeout, Attempts(0))?;
    Ok(msg)
  }

  /// Put a timed-out entry back in the queue for another attempt.
  pub(crate) fn re_enroll(&self, pending: Pending) -> Result<(), Error> {
    let mut state = self.state.lock().unwrap();
    Self::enroll_locked(&mut state,
                        pending.msg,
                        pending.timeout,
                        pending.retransmits)
  }

  /// Remove the first entry whose ID matches, yielding it.
  ///
  /// A no-op when no entry matches, so ACK and RST handling can call
  /// this unconditionally.
  pub fn cancel(&self, id: Id) -> Option<Pending> {
    let mut state = self.state.lock().unwrap();
    state.pending
         .iter()
         .position(|p| p.msg.data().id == id)
         .map(|at| state.pending.remove(at))
  }

  /// The set of message IDs attached to in-flight exchanges right now
  pub fn in_use_ids(&self) -> BTreeSet<u16> {
    self.state
        .lock()
        .unwrap()
        .pending
        .iter()
        .map(|p| p.msg.data().id.0)
        .collect()
  }

  /// A deep copy of the pending message with this ID, for correlation
  pub fn lookup(&self, id: Id) -> Option<Addrd<Message>> {
    self.state
        .lock()
        .unwrap()
        .pending
        .iter()
        .find(|p| p.msg.data().id == id)
        .map(|p| p.msg.clone())
  }

  /// How many exchanges are in flight
  pub fn len(&self) -> usize {
    self.state.lock().unwrap().pending.len()
  }

  /// Whether no exchanges are in flight
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Signal the poller to exit and drop every pending entry.
  pub fn shutdown(&self) {
    let mut state = self.state.lock().unwrap();
    state.done = true;
    state.pending.clear();
    self.wake.notify_all();
  }

  /// Sleep until `wake_every` elapses (or shutdown), then hand back at
  /// most one timed-out entry.
  pub(crate) fn poll(&self, wake_every: Duration) -> Wake {
    let state = self.state.lock().unwrap();

    if state.done {
      return Wake::Shutdown;
    }

    let (mut state, _) = self.wake.wait_timeout(state, wake_every).unwrap();

    if state.done {
      return Wake::Shutdown;
    }

    let now = Instant::now();
    match state.pending
               .iter()
               .position(|p| now.duration_since(p.dispatched) >= p.timeout)
    {
      | Some(at) => Wake::TimedOut(state.pending.remove(at)),
      | None => Wake::Idle,
    }
  }

  fn allocate_locked(state: &mut State) -> Result<Id, Error> {
    let in_use = state.pending
                      .iter()
                      .map(|p| p.msg.data().id.0)
                      .collect::<BTreeSet<_>>();

    for _ in 0..=u16::MAX {
      state.next_id = state.next_id.wrapping_add(1);
      // 0 stays reserved as the "assign me one" marker on outbound
      // messages
      if state.next_id != 0 && !in_use.contains(&state.next_id) {
        return Ok(Id(state.next_id));
      }
    }

    Err(Error::Unsupported(Unsupported::IdSpaceExhausted))
  }

  fn enroll_locked(state: &mut State,
                   msg: Addrd<Message>,
                   timeout: Duration,
                   retransmits: Attempts)
                   -> Result<(), Error> {
    if msg.data().ty != Type::Con {
      return Err(Error::Argument(Argument::NotConfirmable));
    }

    let id = msg.data().id;
    if state.pending.iter().any(|p| p.msg.data().id == id) {
      return Err(Error::Argument(Argument::IdInUse(id)));
    }

    state.pending.push(Pending { msg,
                                 dispatched: Instant::now(),
                                 timeout,
                                 retransmits });
    Ok(())
  }
}
