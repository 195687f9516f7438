use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use embedded_time::duration::Milliseconds;
use mote::blocking::Client;
use mote::config::{Con, Config};
use mote::net::Endpoint;
use mote::resp::code;
use mote_msg::{Code, Message, MessageParseError, Payload, TryFromBytes, TryIntoBytes, Type};

/// A CoAP server on loopback that answers every CON request
/// with a piggybacked response, after ignoring the first few.
struct Mote {
  addr: SocketAddr,
  seen: Arc<AtomicUsize>,
  stop: Arc<AtomicBool>,
  thread: Option<JoinHandle<()>>,
}

impl Mote {
  fn spawn(lose_first: usize, code: Code, payload: &'static [u8]) -> Self {
    let sock = UdpSocket::bind("127.0.0.1:0").unwrap();
    sock.set_read_timeout(Some(Duration::from_millis(10))).unwrap();

    let addr = sock.local_addr().unwrap();
    let seen = Arc::new(AtomicUsize::new(0));
    let stop = Arc::new(AtomicBool::new(false));

    let thread = thread::spawn({
      let seen = seen.clone();
      let stop = stop.clone();
      move || {
        let mut buf = [0u8; 1152];
        while !stop.load(Ordering::SeqCst) {
          let (n, from) = match sock.recv_from(&mut buf) {
            | Ok(recvd) => recvd,
            | Err(_) => continue,
          };

          let req = match Message::try_from_bytes(&buf[..n]) {
            | Ok(req) if req.ty == Type::Con => req,
            | _ => continue,
          };

          if seen.fetch_add(1, Ordering::SeqCst) < lose_first {
            continue;
          }

          let mut rep = Message::new(Type::Ack, code, req.id, req.token);
          rep.payload = Payload(payload.to_vec());
          sock.send_to(&rep.try_into_bytes().unwrap(), from).unwrap();
        }
      }
    });

    Mote { addr,
           seen,
           stop,
           thread: Some(thread) }
  }

  fn endpoint(&self) -> Endpoint {
    self.addr.into()
  }

  fn requests_seen(&self) -> usize {
    self.seen.load(Ordering::SeqCst)
  }
}

impl Drop for Mote {
  fn drop(&mut self) {
    self.stop.store(true, Ordering::SeqCst);
    if let Some(thread) = self.thread.take() {
      thread.join().ok();
    }
  }
}

fn config() -> Config {
  let mut config = Config::default();
  config.msg.con = Con { unacked_retry_strategy: Con::strategy_from_ack_timeout(Milliseconds(50), 15),
                         max_retransmit: mote::retry::Attempts(4) };
  config.poll_interval = Milliseconds(1);
  config
}

fn client() -> Client {
  let sock = UdpSocket::bind("127.0.0.1:0").unwrap();
  sock.set_nonblocking(true).unwrap();
  Client::open_with(sock, config()).unwrap()
}

#[test]
fn get_over_udp() {
  simple_logger::init_with_level(log::Level::Debug).ok();

  let mote = Mote::spawn(0, code::CONTENT, &[0x4F, 0x4B]);
  let client = client();

  assert_eq!(client.get(mote.endpoint(), "s/c").unwrap(), vec![0x4F, 0x4B]);
  assert_eq!(client.get_string(mote.endpoint(), "s/c").unwrap(), "OK");
  assert_eq!(mote.requests_seen(), 2);
}

#[test]
fn retransmits_over_udp() {
  let mote = Mote::spawn(2, code::CONTENT, b"21.5");
  let client = client();

  assert_eq!(client.get_string(mote.endpoint(), "s/t").unwrap(), "21.5");
  assert_eq!(mote.requests_seen(), 3);
}

#[test]
fn times_out_over_udp() {
  let mote = Mote::spawn(usize::MAX, code::CONTENT, b"");
  let client = client();

  let err = client.get(mote.endpoint(), "s/c").unwrap_err();
  assert!(err.is_timeout());

  // let any datagram still in flight land
  thread::sleep(Duration::from_millis(50));
  assert_eq!(mote.requests_seen(), 5);
}

#[test]
fn oversized_response_over_udp() {
  static BIG: [u8; 1300] = [0x4F; 1300];

  let mote = Mote::spawn(0, code::CONTENT, &BIG);
  let sock = UdpSocket::bind("127.0.0.1:0").unwrap();
  sock.set_nonblocking(true).unwrap();
  let client = Client::open_with(sock, Config::default()).unwrap();

  let err = client.get(mote.endpoint(), "s/c").unwrap_err();
  assert_eq!(err.message_parse_error(),
             Some(&MessageParseError::TooLong(1152)));
  assert_eq!(mote.requests_seen(), 1);
}

#[test]
fn open_on_ephemeral_port() {
  let mote = Mote::spawn(0, code::CONTENT, b"OK");

  let client = Client::open_config(0, config()).unwrap();
  assert_ne!(client.local_addr().unwrap().port(), 0);
  assert_eq!(client.get_string(mote.endpoint(), "s/c").unwrap(), "OK");
  client.close();
}

#[test]
fn bind_error_when_port_taken() {
  let taken = UdpSocket::bind("[::]:0").or_else(|_| UdpSocket::bind("0.0.0.0:0"))
                                       .unwrap();
  let port = taken.local_addr().unwrap().port();

  let err = Client::open(port).unwrap_err();
  assert!(matches!(err.what, mote::core::What::Bind(_)));
}
