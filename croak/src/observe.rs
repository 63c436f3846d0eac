//! Registry of clients observing resources (RFC 7641).

use std::sync::Mutex;

use croak_msg::Token;

use crate::net::Addrd;
use crate::req::Req;

/// One subscriber: an independent copy of the observe request it
/// registered with. The request's token identifies the subscription;
/// its address is where notifications go.
#[derive(Debug, Clone)]
pub struct Observer {
  /// The registration request, as received
  pub req: Addrd<Req>,
}

impl Observer {
  /// The token identifying this subscription
  pub fn token(&self) -> Token {
    self.req.data().token()
  }
}

#[derive(Debug, Default)]
struct Resources {
  by_url: Vec<(String, Vec<Observer>)>,
}

/// Maps resource URLs to the clients observing them.
///
/// Shared by the receive thread (registering & RST-driven removal) and
/// caller threads (listing subscribers to notify), so everything lives
/// behind one mutex.
#[derive(Debug, Default)]
pub struct Observers {
  inner: Mutex<Resources>,
}

/// Resource URLs are matched case-insensitively with surrounding
/// whitespace and trailing slashes ignored.
fn normalize(url: &str) -> String {
  let url = url.trim().trim_end_matches('/').to_lowercase();
  if url.starts_with('/') {
    url
  } else {
    format!("/{}", url)
  }
}

impl Observers {
  /// Create an empty registry
  pub fn new() -> Observers {
    Observers::default()
  }

  /// Make a resource observable ahead of any subscriptions.
  ///
  /// Registering an observer creates its resource implicitly, so this
  /// is only needed when the application wants [`Observers::list`] to
  /// distinguish "no observers" from "no such resource".
  pub fn add_resource(&self, url: &str) {
    let url = normalize(url);
    let mut inner = self.inner.lock().unwrap();
    if !inner.by_url.iter().any(|(u, _)| *u == url) {
      inner.by_url.push((url, Vec::new()));
    }
  }

  /// Drop a resource and every observer of it
  pub fn remove_resource(&self, url: &str) {
    let url = normalize(url);
    self.inner
        .lock()
        .unwrap()
        .by_url
        .retain(|(u, _)| *u != url);
  }

  /// Add a subscription for the resource `req` addresses.
  ///
  /// The subscription is keyed by the request's token; registering the
  /// same token again replaces the previous entry.
  pub fn register(&self, req: Addrd<Req>) {
    let url = normalize(&req.data().path());
    let token = req.data().token();

    let mut inner = self.inner.lock().unwrap();
    match inner.by_url.iter_mut().find(|(u, _)| *u == url) {
      | Some((_, list)) => {
        list.retain(|o| o.token() != token);
        list.push(Observer { req });
      },
      | None => inner.by_url.push((url, vec![Observer { req }])),
    }
  }

  /// Remove the subscription with this token from a resource's list.
  ///
  /// Returns whether anything was removed.
  pub fn unregister(&self, url: &str, token: Token) -> bool {
    let url = normalize(url);
    let mut inner = self.inner.lock().unwrap();

    match inner.by_url.iter_mut().find(|(u, _)| *u == url) {
      | Some((_, list)) => {
        let before = list.len();
        list.retain(|o| o.token() != token);
        before != list.len()
      },
      | None => false,
    }
  }

  /// Remove whichever subscription this token identifies, scanning
  /// every resource. Used when a RST or a send failure tells us a
  /// subscriber is gone but not which resource it watched.
  pub fn unregister_by_token(&self, token: Token) -> bool {
    let mut inner = self.inner.lock().unwrap();
    let mut removed = false;

    for (_, list) in inner.by_url.iter_mut() {
      let before = list.len();
      list.retain(|o| o.token() != token);
      removed |= before != list.len();
    }

    removed
  }

  /// The current observers of a resource, in registration order
  pub fn list(&self, url: &str) -> Vec<Observer> {
    let url = normalize(url);
    self.inner
        .lock()
        .unwrap()
        .by_url
        .iter()
        .find(|(u, _)| *u == url)
        .map(|(_, list)| list.clone())
        .unwrap_or_default()
  }

  /// Drop every resource and observer
  pub fn clear(&self) {
    self.inner.lock().unwrap().by_url.clear();
  }

  /// Total number of subscriptions across all resources
  pub fn len(&self) -> usize {
    self.inner
        .lock()
        .unwrap()
        .by_url
        .iter()
        .map(|(_, list)| list.len())
        .sum()
  }

  /// Whether there are no subscriptions
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[cfg(test)]
mod tests {
  use croak_msg::opt::observe::Action;

  use super::*;

  fn observer(path: &str, token: &[u8]) -> Addrd<Req> {
    let mut req = Req::get(&format!("coap://192.0.2.1{}", path)).unwrap();
    req.set_token(Token::from_bytes(token).unwrap());
    req.set_observe(Action::Register).unwrap();
    Addrd(req, "192.0.2.9:1111".parse().unwrap())
  }

  #[test]
  fn register_then_list() {
    let reg = Observers::new();
    reg.register(observer("/temp", &[0xCD]));

    let listed = reg.list("/temp");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].token(), Token::from_bytes(&[0xCD]).unwrap());
  }

  #[test]
  fn urls_normalized() {
    let reg = Observers::new();
    reg.register(observer("/Temp", &[1]));

    assert_eq!(reg.list(" /temp/ ").len(), 1);
    assert!(reg.unregister("/TEMP", Token::from_bytes(&[1]).unwrap()));
  }

  #[test]
  fn same_token_replaces() {
    let reg = Observers::new();
    reg.register(observer("/a", &[9]));
    reg.register(observer("/a", &[9]));
    assert_eq!(reg.len(), 1);
  }

  #[test]
  fn unregister_by_token_scans_all_resources() {
    let reg = Observers::new();
    reg.register(observer("/a", &[1]));
    reg.register(observer("/b", &[2]));

    assert!(reg.unregister_by_token(Token::from_bytes(&[2]).unwrap()));
    assert!(!reg.unregister_by_token(Token::from_bytes(&[2]).unwrap()));
    assert_eq!(reg.len(), 1);
  }

  #[test]
  fn remove_resource_drops_observers() {
    let reg = Observers::new();
    reg.add_resource("/a");
    reg.register(observer("/a", &[1]));
    reg.remove_resource("/a");

    assert!(reg.is_empty());
    assert!(reg.list("/a").is_empty());
  }
}
