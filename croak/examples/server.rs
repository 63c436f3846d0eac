use std::sync::mpsc::{channel, Sender};
use std::sync::Mutex;
use std::thread::JoinHandle;

use croak::net::Addrd;
use croak::req::Req;
use croak::resp::{code, Resp};
use croak::server::Server;
use croak::Listen;

pub const PORT: u16 = 5683;

/// Hands every request to the serving loop below.
struct Forward(Mutex<Sender<Addrd<Req>>>);

impl Listen for Forward {
  fn on_request(&self, req: Addrd<Req>) {
    self.0.lock().unwrap().send(req).ok();
  }
}

pub fn spawn() -> JoinHandle<()> {
  std::thread::spawn(|| {
    let (tx, rx) = channel();
    let server = Server::new(("127.0.0.1", PORT), Forward(Mutex::new(tx))).unwrap();

    log::info!("serving coap://127.0.0.1:{}", PORT);

    for req in rx.iter() {
      let path = req.data().path();

      match path.as_str() {
        | "/hello" => {
          log::info!("a client said hello");
          let mut resp = Resp::for_request(req.data()).unwrap();
          resp.set_code(code::CONTENT);
          resp.set_payload("hello, world!".bytes());
          server.send(Addrd(resp, req.addr())).unwrap();
        },
        | "/black_hole" => {
          log::info!("ignoring a request, as requested");
        },
        | "/exit" => {
          log::info!("a client said exit");
          let mut resp = Resp::for_request(req.data()).unwrap();
          resp.set_code(code::CONTENT);
          resp.set_payload("goodbye, world!".bytes());
          server.send(Addrd(resp, req.addr())).unwrap();
          break;
        },
        | _ => {
          let mut resp = Resp::for_request(req.data()).unwrap();
          resp.set_code(code::NOT_FOUND);
          server.send(Addrd(resp, req.addr())).unwrap();
        },
      }
    }
  })
}

fn main() {
  simple_logger::init_with_level(log::Level::Debug).unwrap();
  spawn().join().unwrap();
}
