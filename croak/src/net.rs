use std::net::{SocketAddr, ToSocketAddrs};

/// Data that came from (or is going to) a network socket
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub struct Addrd<T>(pub T, pub SocketAddr);

impl<T> Addrd<T> {
  /// Borrow the contents of this Addrd
  pub fn as_ref(&self) -> Addrd<&T> {
    Addrd(self.data(), self.addr())
  }

  /// Discard the address and get the data in this Addrd
  pub fn unwrap(self) -> T {
    self.0
  }

  /// Map the data contained in this Addrd
  pub fn map<R>(self, f: impl FnOnce(T) -> R) -> Addrd<R> {
    Addrd(f(self.0), self.1)
  }

  /// Borrow the contents of the addressed item
  pub fn data(&self) -> &T {
    &self.0
  }

  /// Mutably borrow the contents of the addressed item
  pub fn data_mut(&mut self) -> &mut T {
    &mut self.0
  }

  /// Copy the socket address for the data
  pub fn addr(&self) -> SocketAddr {
    self.1
  }
}

/// A CoAP network socket.
///
/// This mirrors `std::net::UdpSocket`, but allows endpoints to be
/// driven by test doubles and keeps the one non-std expectation in one
/// place: sockets are non-blocking, signalling "nothing to read yet"
/// with [`nb::Error::WouldBlock`].
///
/// All methods take `&self`; one socket is shared by an endpoint's
/// caller threads and its receive loop.
pub trait Socket: Sized + Send + Sync + 'static {
  /// The error yielded by socket operations
  type Error: core::fmt::Debug + Into<crate::Error>;

  /// Bind a new socket to a local address, in non-blocking mode.
  ///
  /// Implementations should bind to the first address if `addr` yields
  /// multiple.
  fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self, Self::Error>;

  /// The local address this socket is bound to
  fn local_addr(&self) -> Result<SocketAddr, Self::Error>;

  /// Send a datagram to a remote address
  fn send(&self, msg: Addrd<&[u8]>) -> nb::Result<usize, Self::Error>;

  /// Pull a datagram from the socket along with the sender's address,
  /// or [`nb::Error::WouldBlock`] when none is queued.
  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, Self::Error>;
}
