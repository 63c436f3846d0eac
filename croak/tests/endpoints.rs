//! End-to-end exchanges between real endpoints over loopback UDP.

use std::net::UdpSocket;
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use croak::config::Config;
use croak::msg::opt::observe::Action;
use croak::msg::{Code, Id, Message, Token, TryFromBytes, Type};
use croak::net::Addrd;
use croak::req::Req;
use croak::resp::{code, Resp};
use croak::retry::Attempts;
use croak::server::Server;
use croak::{Client, Error, Listen};

fn test_config() -> Config {
  Config { ack_timeout: Duration::from_millis(80),
           poll_interval: Duration::from_millis(5),
           ..Config::default() }
}

fn wait_for(what: &str, mut cond: impl FnMut() -> bool) {
  let deadline = Instant::now() + Duration::from_secs(5);
  while !cond() {
    if Instant::now() > deadline {
      panic!("timed out waiting for {}", what);
    }
    std::thread::sleep(Duration::from_millis(5));
  }
}

/// Captures everything an endpoint reports; clones share storage.
#[derive(Default, Clone)]
struct Recorder {
  resps: Arc<Mutex<Vec<Addrd<Resp>>>>,
  errors: Arc<Mutex<Vec<(Error, Option<Addrd<Message>>)>>>,
}

impl Recorder {
  fn undelivered_count(&self) -> usize {
    self.errors
        .lock()
        .unwrap()
        .iter()
        .filter(|(e, _)| matches!(e, Error::Undelivered))
        .count()
  }
}

impl Listen for Recorder {
  fn on_response(&self, resp: Addrd<Resp>) {
    self.resps.lock().unwrap().push(resp);
  }

  fn on_error(&self, error: Error, msg: Option<Addrd<Message>>) {
    self.errors.lock().unwrap().push((error, msg));
  }
}

/// Hands every request to the test body through a channel.
struct ForwardReqs(Mutex<Sender<Addrd<Req>>>);

impl Listen for ForwardReqs {
  fn on_request(&self, req: Addrd<Req>) {
    let _ = self.0.lock().unwrap().send(req);
  }
}

#[test]
fn ping_is_answered_with_reset() {
  let server = Server::with_config(test_config(), "127.0.0.1:0", ()).unwrap();
  let server_addr = server.local_addr().unwrap();

  let recorder = Recorder::default();
  let client = Client::with_config(test_config(),
                                   "127.0.0.1",
                                   server_addr.port(),
                                   recorder.clone()).unwrap();

  let ping = Message::new(Type::Con, Code::EMPTY, Id(0x1234), Token::EMPTY);
  let (id, _) = client.send_msg(Addrd(ping, server_addr)).unwrap();
  assert_eq!(id, Id(0x1234));
  assert!(client.in_flight_ids().contains(&0x1234));

  wait_for("reset to arrive", || {
    recorder.resps
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.data().msg_id() == Id(0x1234) && r.data().msg_type() == Type::Reset)
  });

  // the reset settled the exchange before the callback saw it
  assert!(!client.in_flight_ids().contains(&0x1234));
}

#[test]
fn get_with_uri_encodes_host_port_path() {
  let req = Req::get("coap://192.0.2.1:5683/time").unwrap();
  let mut msg = Message::from(req);
  msg.id = Id(7);

  let bytes = croak::msg::TryIntoBytes::try_into_bytes(msg).unwrap();
  let decoded = Message::try_from_bytes(&bytes).unwrap();

  use croak::msg::opt::known::{no_repeat, repeat};
  assert_eq!(decoded.opts
                    .get(no_repeat::URI_HOST)
                    .and_then(|v| v.as_str()),
             Some("192.0.2.1"));
  assert_eq!(decoded.opts
                    .get(no_repeat::URI_PORT)
                    .and_then(|v| v.as_uint()),
             Some(5683));
  assert_eq!(decoded.opts
                    .get_all(repeat::URI_PATH)
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>(),
             vec!["time"]);
  assert_eq!(decoded.id, Id(7));
}

#[test]
fn separate_response_correlated_by_token() {
  let (tx, rx) = channel();
  let server = Server::with_config(test_config(),
                                   "127.0.0.1:0",
                                   ForwardReqs(Mutex::new(tx))).unwrap();
  let server_addr = server.local_addr().unwrap();

  let client = croak::blocking::Client::with_config(test_config(),
                                                    "127.0.0.1",
                                                    server_addr.port()).unwrap();

  let handle = std::thread::spawn(move || {
    let mut req = Req::get(&format!("coap://127.0.0.1:{}/slow", server_addr.port())).unwrap();
    req.set_msg_id(Id(100));
    req.set_token(Token::from_bytes(&[0xAB]).unwrap());
    client.send(req)
  });

  // the application defers: empty ACK goes out now, answer comes later
  let req = rx.recv_timeout(Duration::from_secs(5)).unwrap();
  server.add_pending_separate(req).unwrap();

  std::thread::sleep(Duration::from_millis(50));

  let parked = server.next_pending_separate().unwrap();
  assert_eq!(parked.data().msg_id(), Id(100));

  let mut resp = Resp::separate(parked.data(), true);
  resp.set_code(code::CONTENT);
  resp.set_payload("42".bytes());
  let (id, _) = server.send(Addrd(resp, parked.addr())).unwrap();

  // fresh exchange for the separate response
  assert_ne!(id, Id(100));

  let rep = handle.join().unwrap().unwrap();
  assert_eq!(rep.token(), Token::from_bytes(&[0xAB]).unwrap());
  assert_eq!(rep.payload_string().unwrap(), "42");
  assert_eq!(rep.code(), code::CONTENT);
}

#[test]
fn unacked_con_retransmits_then_undelivered() {
  // a live socket nobody reads
  let black_hole = UdpSocket::bind("127.0.0.1:0").unwrap();
  let hole_addr = black_hole.local_addr().unwrap();

  let cfg = Config { ack_timeout: Duration::from_millis(50),
                     max_retransmits: Attempts(2),
                     poll_interval: Duration::from_millis(5),
                     ..Config::default() };

  let recorder = Recorder::default();
  let client = Client::with_config(cfg,
                                   "127.0.0.1",
                                   hole_addr.port(),
                                   recorder.clone()).unwrap();

  let started = Instant::now();
  let (id, _) = client.send(Req::get("coap://127.0.0.1/void").unwrap()).unwrap();
  assert!(client.in_flight_ids().contains(&id.0));

  wait_for("undelivered error", || recorder.undelivered_count() == 1);

  // 50ms base, factor 1.5: attempts wait 75ms, 150ms, 300ms
  let elapsed = started.elapsed();
  assert!(elapsed >= Duration::from_millis(300),
          "undelivered too early: {:?}",
          elapsed);

  assert!(client.in_flight_ids().is_empty());

  // exactly the initial send plus max_retransmits copies hit the wire
  black_hole.set_nonblocking(true).unwrap();
  let mut buf = [0u8; 512];
  let mut copies = 0;
  while let Ok((n, _)) = black_hole.recv_from(&mut buf) {
    let msg = Message::try_from_bytes(&buf[..n]).unwrap();
    assert_eq!(msg.id, id);
    copies += 1;
  }
  assert_eq!(copies, 3);

  // the undelivered report carries the original message
  let errors = recorder.errors.lock().unwrap();
  let (_, msg) = errors.iter()
                       .find(|(e, _)| matches!(e, Error::Undelivered))
                       .unwrap();
  assert_eq!(msg.as_ref().unwrap().data().id, id);
}

#[test]
fn observe_register_notify_then_reset() {
  let server = Server::with_config(test_config(), "127.0.0.1:0", ()).unwrap();
  let server_addr = server.local_addr().unwrap();

  let recorder = Recorder::default();
  let client = Client::with_config(test_config(),
                                   "127.0.0.1",
                                   server_addr.port(),
                                   recorder.clone()).unwrap();

  let token = Token::from_bytes(&[0xCD]).unwrap();

  let mut req = Req::get(&format!("coap://127.0.0.1:{}/temp", server_addr.port())).unwrap()
                    .non();
  req.set_token(token);
  req.set_observe(Action::Register).unwrap();
  client.send(req).unwrap();

  wait_for("subscription to register", || {
    server.observers()
          .list("/temp")
          .iter()
          .any(|o| o.token() == token)
  });

  let sent = server.notify("/temp", code::CONTENT, b"22").unwrap();
  assert_eq!(sent, 1);

  wait_for("notification to arrive", || {
    recorder.resps
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.data().token() == token && r.data().payload() == b"22")
  });

  // hang up: a reset bearing the subscription token
  let rst = Message::new(Type::Reset, Code::EMPTY, Id(0), token);
  client.send_msg(Addrd(rst, server_addr)).unwrap();

  wait_for("subscription to be dropped", || server.observers().is_empty());
}

#[test]
fn undecodable_con_is_rejected_with_bad_request() {
  let server = Server::with_config(test_config(), "127.0.0.1:0", ()).unwrap();
  let server_addr = server.local_addr().unwrap();

  let raw = UdpSocket::bind("127.0.0.1:0").unwrap();
  raw.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

  // CON, tkl 1, GET, id 100... and then nothing where the token should be
  raw.send_to(&[0b_01_00_0001, 0x01, 0x00, 100], server_addr)
     .unwrap();

  let mut buf = [0u8; 64];
  let (n, _) = raw.recv_from(&mut buf).unwrap();
  let rst = Message::try_from_bytes(&buf[..n]).unwrap();

  assert_eq!(rst.ty, Type::Reset);
  assert_eq!(rst.code, Code::new(4, 0));
  assert_eq!(rst.id, Id(100));

  // too short to even recover an id: the reset answers with id 0
  raw.send_to(&[0b_01_00_0000, 0x01, 0x00], server_addr).unwrap();

  let (n, _) = raw.recv_from(&mut buf).unwrap();
  let rst = Message::try_from_bytes(&buf[..n]).unwrap();
  assert_eq!(rst.ty, Type::Reset);
  assert_eq!(rst.id, Id(0));
}

#[test]
fn request_and_piggybacked_response() {
  let (tx, rx) = channel();
  let server = Server::with_config(test_config(),
                                   "127.0.0.1:0",
                                   ForwardReqs(Mutex::new(tx))).unwrap();
  let server_addr = server.local_addr().unwrap();

  let client = croak::blocking::Client::with_config(test_config(),
                                                    "127.0.0.1",
                                                    server_addr.port()).unwrap();

  let handle = std::thread::spawn(move || {
    let mut req =
      Req::get(&format!("coap://127.0.0.1:{}/hello?name=frog", server_addr.port())).unwrap();
    req.set_token(Token::opaque(b"hello-req"));
    client.send(req)
  });

  let req = rx.recv_timeout(Duration::from_secs(5)).unwrap();
  assert_eq!(req.data().path(), "/hello");

  let mut resp = Resp::for_request(req.data()).unwrap();
  resp.set_code(code::CONTENT);
  resp.set_payload("hi, frog".bytes());
  server.send(Addrd(resp, req.addr())).unwrap();

  let rep = handle.join().unwrap().unwrap();
  assert_eq!(rep.payload_string().unwrap(), "hi, frog");
}

#[test]
fn blocking_ping() {
  let server = Server::with_config(test_config(), "127.0.0.1:0", ()).unwrap();
  let server_addr = server.local_addr().unwrap();

  let client = croak::blocking::Client::with_config(test_config(),
                                                    "127.0.0.1",
                                                    server_addr.port()).unwrap();

  client.ping().unwrap();
}
