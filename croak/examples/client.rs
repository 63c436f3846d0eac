use croak::blocking::Client;
use croak::req::Req;
use croak::resp::Resp;
use croak::Error;

#[path = "./server.rs"]
mod server;

trait Log {
  fn log(self);
}

impl Log for Result<Resp, Error> {
  fn log(self) {
    match self {
      | Ok(rep) => {
        log::info!("ok! {} {:?}", rep.code(), rep.payload_string().unwrap());
      },
      | Err(e) => {
        log::error!("error! {}", e);
      },
    }
  }
}

fn main() {
  simple_logger::init_with_level(log::Level::Info).unwrap();

  let server = server::spawn();
  std::thread::sleep(std::time::Duration::from_millis(100));

  let client = Client::new("127.0.0.1", server::PORT).unwrap();

  log::info!("PING");
  client.ping().unwrap();
  log::info!("pinged ok!\n");

  log::info!("CON GET /hello");
  client.send(Req::get("coap://127.0.0.1/hello").unwrap()).log();

  log::info!("NON GET /hello");
  client.send(Req::get("coap://127.0.0.1/hello").unwrap().non())
        .log();

  log::info!("CON GET /exit");
  client.send(Req::get("coap://127.0.0.1/exit").unwrap()).log();

  server.join().unwrap();
}
