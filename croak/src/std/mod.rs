//! Implementations of croak's abstractions for platforms with the Rust
//! standard library.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use crate::net::{Addrd, Socket};

fn io_to_nb(err: io::Error) -> nb::Error<io::Error> {
  match err.kind() {
    | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => nb::Error::WouldBlock,
    | _ => nb::Error::Other(err),
  }
}

impl Socket for UdpSocket {
  type Error = io::Error;

  fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self, Self::Error> {
    let sock = UdpSocket::bind(addr)?;
    sock.set_nonblocking(true)?;
    Ok(sock)
  }

  fn local_addr(&self) -> Result<SocketAddr, Self::Error> {
    UdpSocket::local_addr(self)
  }

  fn send(&self, msg: Addrd<&[u8]>) -> nb::Result<usize, Self::Error> {
    self.send_to(msg.data(), msg.addr()).map_err(io_to_nb)
  }

  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, Self::Error> {
    self.recv_from(buffer)
        .map(|(n, addr)| Addrd(n, addr))
        .map_err(io_to_nb)
  }
}
