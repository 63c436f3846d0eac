//! FIFO of requests the application chose to answer later.
//!
//! A server that can't answer a confirmable request inside the peer's
//! retransmission window sends a bare ACK, parks the request here, and
//! answers with a fresh message (carrying the original token) when the
//! data is ready.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::net::Addrd;
use crate::req::Req;

/// The queue of requests awaiting a separate response.
#[derive(Debug, Default)]
pub struct SeparateQueue {
  inner: Mutex<VecDeque<Addrd<Req>>>,
}

impl SeparateQueue {
  /// Create an empty queue
  pub fn new() -> SeparateQueue {
    SeparateQueue::default()
  }

  /// Park a request for a deferred answer
  pub fn enqueue(&self, req: Addrd<Req>) {
    self.inner.lock().unwrap().push_back(req);
  }

  /// Take the request that has waited the longest
  pub fn dequeue(&self) -> Option<Addrd<Req>> {
    self.inner.lock().unwrap().pop_front()
  }

  /// How many requests are waiting
  pub fn len(&self) -> usize {
    self.inner.lock().unwrap().len()
  }

  /// Whether no requests are waiting
  pub fn is_empty(&self) -> bool {
    self.inner.lock().unwrap().is_empty()
  }

  /// Drop every parked request
  pub fn clear(&self) {
    self.inner.lock().unwrap().clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fifo_order() {
    let q = SeparateQueue::new();
    let addr = "127.0.0.1:5683".parse().unwrap();

    q.enqueue(Addrd(Req::get("coap://h/1").unwrap(), addr));
    q.enqueue(Addrd(Req::get("coap://h/2").unwrap(), addr));

    assert_eq!(q.dequeue().unwrap().data().path(), "/1");
    assert_eq!(q.dequeue().unwrap().data().path(), "/2");
    assert!(q.dequeue().is_none());
  }
}
