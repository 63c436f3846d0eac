//! `croak` is a CoAP implementation for platforms with threads and UDP
//! sockets.
//!
//! ## CoAP
//! CoAP is an application-level network protocol that copies the
//! semantics of HTTP to an environment conducive to **constrained**
//! devices (weak hardware, small battery capacity, lossy networks).
//!
//! This means that you can write and run two-way RESTful communication
//! between devices very similarly to the networking semantics you are
//! most likely familiar with:
//! - GET, POST, PUT, DELETE requests
//! - Headers (renamed to [Options](https://datatracker.ietf.org/doc/html/rfc7252#section-5.10))
//! - [Response status codes](https://datatracker.ietf.org/doc/html/rfc7252#section-5.9)
//!
//! Because CoAP sits on UDP instead of TCP, the transport guarantees
//! HTTP takes for granted are rebuilt at the message layer: confirmable
//! messages are retransmitted with exponential backoff until the peer
//! acknowledges them, acknowledgements are matched by message ID, and
//! responses are matched to requests by token — including responses
//! that arrive minutes later, or many times
//! ([observe](https://datatracker.ietf.org/doc/html/rfc7641)).
//!
//! ## Endpoints
//! - [`client::Client`] sends requests at one server and hands whatever
//!   comes back to your [`Listen`] implementation.
//! - [`blocking::Client`] is the same endpoint without callbacks: poll
//!   [`blocking::Client::receive`], or let
//!   [`blocking::Client::send`] wait for the matching response.
//! - [`server::Server`] answers requests, parks what it can't answer
//!   yet ([`server::Server::add_pending_separate`]), and pushes
//!   state changes to observers ([`server::Server::notify`]).
//!
//! Each endpoint owns two background threads: a receive loop that
//! decodes and dispatches datagrams, and a poller that retransmits
//! unacknowledged confirmable messages. Callbacks run on the receive
//! thread and must not block.
//!
//! The wire codec lives in [`croak_msg`] and is re-exported here as
//! [`msg`].
//!
//! ## Logging
//! Everything noteworthy is logged through the
//! [`log`](https://docs.rs/log) facade: install any sink you like, or
//! none (the default discards).

#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(unreachable_pub)]

pub use croak_msg as msg;

/// Synchronous (callback-free) client
pub mod blocking;

/// The client endpoint
pub mod client;

/// Endpoint tunables
pub mod config;

/// Error kinds
pub mod error;

/// Addressed data & the socket abstraction
pub mod net;

/// Registry of resource observers (RFC 7641)
pub mod observe;

/// Requests
pub mod req;

/// Responses
pub mod resp;

/// Retransmission backoff schedule
pub mod retry;

/// Queue of requests deferred for separate responses
pub mod separate;

/// The server endpoint
pub mod server;

/// Pending-exchange bookkeeping
pub mod exchange;

/// Implementations of croak abstractions for std platforms
pub mod std;

mod core;
mod logging;

#[doc(inline)]
pub use client::Client;
#[doc(inline)]
pub use config::Config;
#[doc(inline)]
pub use self::core::Listen;
#[doc(inline)]
pub use error::Error;
#[doc(inline)]
pub use net::{Addrd, Socket};
#[doc(inline)]
pub use req::Req;
#[doc(inline)]
pub use resp::Resp;
#[doc(inline)]
pub use server::Server;
