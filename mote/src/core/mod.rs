use core::fmt;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

use embedded_time::duration::Milliseconds;
use embedded_time::Instant;
use mote_msg::{Code, Header, Id, Message, MessageParseError, Token, TryFromBytes, TryIntoBytes,
               Type};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::Config;
use crate::logging::msg_summary;
use crate::net::{same_endpoint, Addrd, Endpoint, Socket};
use crate::req::Req;
use crate::resp::Resp;
use crate::retry::{Attempts, RetryTimer, Strategy, YouShould};
use crate::time::{millis_since_epoch, to_std, Clock};

mod error;
#[doc(inline)]
pub use error::*;

/// What the receive loop hands to a caller waiting on a request
type Reply = Result<Message, Refusal>;

/// Reasons a correlated datagram did not answer the request with a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Refusal {
  Malformed(MessageParseError),
  Reset,
}

/// A request that has been sent and not yet answered
#[derive(Debug)]
struct Pending {
  token: Token,
  dest: SocketAddr,
  con: bool,
  ping: bool,
  /// Distinguishes this registration from later ones reusing the same ID
  serial: u64,
  reply: SyncSender<Reply>,
}

/// Outstanding requests, keyed by message ID
#[derive(Debug)]
pub(crate) struct PendingTable {
  entries: HashMap<Id, Pending>,
  next_id: Id,
  next_serial: u64,
}

impl PendingTable {
  fn new(first_id: Id) -> Self {
    Self { entries: HashMap::new(),
           next_id: first_id,
           next_serial: 0 }
  }

  /// Allocate a message ID for a new request and store it.
  ///
  /// IDs count upwards from a random start, wrapping at 2^16
  /// and skipping any that are still pending.
  fn register(&mut self,
              token: Token,
              dest: SocketAddr,
              con: bool,
              ping: bool,
              reply: SyncSender<Reply>)
              -> Option<(Id, u64)> {
    if self.entries.len() > u16::MAX as usize {
      return None;
    }

    let mut id = self.next_id;
    while self.entries.contains_key(&id) {
      id = id.next();
    }
    self.next_id = id.next();

    let serial = self.next_serial;
    self.next_serial = self.next_serial.wrapping_add(1);

    self.entries.insert(id,
                        Pending { token,
                                  dest,
                                  con,
                                  ping,
                                  serial,
                                  reply });

    log::trace!("stored new id {} ({} pending)", id.0, self.entries.len());
    Some((id, serial))
  }

  /// Remove the entry for `id` if it satisfies `f`
  fn take_where(&mut self, id: Id, f: impl FnOnce(&Pending) -> bool) -> Option<Pending> {
    if self.entries.get(&id).map(f).unwrap_or(false) {
      self.entries.remove(&id)
    } else {
      None
    }
  }

  /// Remove the NON request from `from` that sent `token`
  fn take_by_token(&mut self, token: Token, from: SocketAddr) -> Option<Pending> {
    let id = self.entries
                 .iter()
                 .find(|(_, p)| {
                   !p.con && !p.token.is_empty() && p.token == token && same_endpoint(p.dest, from)
                 })
                 .map(|(id, _)| *id)?;

    self.entries.remove(&id)
  }

  fn remove_registration(&mut self, id: Id, serial: u64) {
    self.take_where(id, |p| p.serial == serial);
  }

  fn len(&self) -> usize {
    self.entries.len()
  }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A caller's claim on an entry in the [`PendingTable`].
///
/// However the caller stops waiting (answered, timed out, errored, unwound)
/// the entry is removed when this is dropped.
struct Registration<'a> {
  table: &'a Mutex<PendingTable>,
  id: Id,
  serial: u64,
}

impl<'a> Drop for Registration<'a> {
  fn drop(&mut self) {
    lock(self.table).remove_registration(self.id, self.serial);
  }
}

struct Shared<S, C> {
  sock: S,
  clock: C,
  config: Config,
  pending: Mutex<PendingTable>,
  token_salt: u64,
  tokens_minted: AtomicU64,
  /// Picks the first retransmission timeout of each request
  jitter: Mutex<ChaCha8Rng>,
  stop: AtomicBool,
}

/// The engine of a CoAP client.
///
/// `Core` owns the socket, a background thread that receives datagrams,
/// and the table of requests awaiting a response.
///
/// Any number of threads may have requests in flight on one `Core` at once:
/// each caller of [`Core::send`] registers its request, drives its own
/// retransmission timer, and waits for the receive loop to hand it
/// the datagram that answers it.
///
/// Dropping the `Core` stops the receive loop and releases the socket.
pub struct Core<S: Socket, C: Clock> {
  shared: Arc<Shared<S, C>>,
  recv_loop: Option<JoinHandle<()>>,
}

impl<S: Socket, C: Clock> fmt::Debug for Core<S, C> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Core")
     .field("config", &self.shared.config)
     .field("pending", &lock(&self.shared.pending).len())
     .finish()
  }
}

impl<S, C> Core<S, C>
  where S: Socket,
        C: Clock + Send + Sync + 'static
{
  /// Take ownership of a socket & clock and start receiving on the socket
  pub fn new(sock: S, clock: C, config: Config) -> Result<Self, Error<S::Error>> {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH)
                                 .map(|d| d.as_nanos() as u64)
                                 .unwrap_or(0);
    let mut rand = ChaCha8Rng::seed_from_u64(nanos ^ config.msg.token_seed as u64);
    let jitter = ChaCha8Rng::seed_from_u64(rand.gen());

    let shared = Arc::new(Shared { sock,
                                   clock,
                                   config,
                                   pending: Mutex::new(PendingTable::new(Id(rand.gen()))),
                                   token_salt: rand.gen(),
                                   tokens_minted: AtomicU64::new(0),
                                   jitter: Mutex::new(jitter),
                                   stop: AtomicBool::new(false) });

    let recv_loop = thread::Builder::new().name("mote-recv".into())
                                          .spawn({
                                            let shared = shared.clone();
                                            move || shared.recv_loop()
                                          })
                                          .map_err(|e| When::Spawning.what::<S::Error>(What::Spawn(e)))?;

    Ok(Self { shared,
              recv_loop: Some(recv_loop) })
  }

  /// Send a request and block until it is answered.
  ///
  /// Confirmable requests are retransmitted with exponential backoff
  /// until acknowledged or until retries run out, yielding
  /// [`What::MessageNeverAcked`]. Non-confirmable requests are sent once
  /// and wait as long as a confirmable request would in total.
  pub fn send(&self, endpoint: Endpoint, req: Req) -> Result<Resp, Error<S::Error>> {
    self.shared.exchange(endpoint, req).map(Resp::from)
  }

  /// Check that `endpoint` is alive by sending it an empty CON message.
  ///
  /// CoAP servers answer these with a Reset (or with an empty ACK).
  pub fn ping(&self, endpoint: Endpoint) -> Result<(), Error<S::Error>> {
    self.shared.exchange(endpoint, Req::ping()).map(|_| ())
  }

  /// Number of requests currently awaiting a response
  pub fn pending_count(&self) -> usize {
    lock(&self.shared.pending).len()
  }

  /// The runtime config in use
  pub fn config(&self) -> &Config {
    &self.shared.config
  }

  /// The local address of the socket
  pub fn local_addr(&self) -> Result<SocketAddr, Error<S::Error>> {
    self.shared
        .sock
        .local_addr()
        .map_err(|e| When::None.what(What::SockError(e)))
  }
}

impl<S: Socket, C: Clock> Drop for Core<S, C> {
  fn drop(&mut self) {
    self.shared.stop.store(true, Ordering::Release);
    if let Some(recv_loop) = self.recv_loop.take() {
      recv_loop.join().ok();
    }
  }
}

impl<S, C> Shared<S, C>
  where S: Socket,
        C: Clock
{
  fn now(&self, when: When) -> Result<Instant<C>, Error<S::Error>> {
    self.clock
        .try_now()
        .map_err(|_| when.what(What::ClockError))
  }

  fn mint_token(&self, now: Instant<C>) -> Token {
    let n = self.tokens_minted.fetch_add(1, Ordering::Relaxed);
    let Milliseconds(ms) = millis_since_epoch(now);

    let mut data = Vec::with_capacity(26);
    data.extend_from_slice(&self.config.msg.token_seed.to_be_bytes());
    data.extend_from_slice(&self.token_salt.to_be_bytes());
    data.extend_from_slice(&ms.to_be_bytes());
    data.extend_from_slice(&n.to_be_bytes());

    Token::opaque(&data)
  }

  fn retry_timer(&self, now: Instant<C>, con: bool) -> RetryTimer<C> {
    if con {
      RetryTimer::with_rng(now,
                           self.config.msg.con.unacked_retry_strategy,
                           self.config.msg.con.max_transmissions(),
                           &mut *lock(&self.jitter))
    } else {
      let window = self.config.non_response_window_millis();
      RetryTimer::new(now,
                      Strategy::Delay { min: window,
                                        max: window },
                      Attempts(1))
    }
  }

  fn send_dgram(&self, dgram: Addrd<&[u8]>) -> Result<(), S::Error> {
    nb::block!(self.sock.send(dgram))?;
    log::trace!("sent {}b -> {}", dgram.data().len(), dgram.addr());
    Ok(())
  }

  fn exchange(&self, endpoint: Endpoint, mut req: Req) -> Result<Message, Error<S::Error>> {
    let now = self.now(When::None)?;
    let local = self.sock
                    .local_addr()
                    .map_err(|e| When::None.what(What::SockError(e)))?;
    let dest = endpoint.socket_addr_from(local);

    let ping = req.is_ping();
    let con = req.is_con() || ping;
    let token = if ping { Token::empty() } else { self.mint_token(now) };

    let (tx, rx) = mpsc::sync_channel::<Reply>(1);
    let (id, serial) =
      lock(&self.pending).register(token, dest, con, ping, tx)
                         .ok_or_else(|| When::SendingMessage(Some(dest), Id(0), token).what::<S::Error>(What::IdsExhausted))?;
    let _registration = Registration { table: &self.pending,
                                       id,
                                       serial };

    req.set_msg_id(id);
    req.set_msg_token(token);
    let when = When::SendingMessage(Some(dest), id, token);

    log::debug!("sending {} -> {}", msg_summary(req.msg()), dest);
    let bytes = req.msg()
                   .clone()
                   .try_into_bytes_within(self.config.max_dgram_size)
                   .map_err(|e| when.what(What::ToBytes(e)))?;
    self.send_dgram(Addrd(&bytes, dest))
        .map_err(|e| when.what(What::SockError(e)))?;

    let mut timer = self.retry_timer(now, con);

    loop {
      let wait = timer.time_until_deadline(self.now(when)?);

      match rx.recv_timeout(to_std(wait)) {
        | Ok(Ok(msg)) => return Ok(msg),
        | Ok(Err(Refusal::Malformed(e))) => return Err(when.what(What::MalformedResponse(e))),
        | Ok(Err(Refusal::Reset)) => return Err(when.what(What::Reset)),
        | Err(RecvTimeoutError::Disconnected) => return Err(when.what(What::Closed)),
        | Err(RecvTimeoutError::Timeout) => (),
      }

      match timer.what_should_i_do(self.now(when)?) {
        | Err(nb::Error::WouldBlock) => continue,
        | Err(nb::Error::Other(never)) => match never {},
        | Ok(YouShould::Retry) => {
          log::debug!("retransmitting {} -> {} (attempt {})",
                      id.0,
                      dest,
                      timer.attempts().0);
          self.send_dgram(Addrd(&bytes, dest))
              .map_err(|e| when.what(What::SockError(e)))?;
        },
        | Ok(YouShould::Cry) => {
          log::warn!("message {} to {} went unanswered after {} attempts",
                     id.0,
                     dest,
                     timer.attempts().0);
          return Err(when.what(What::MessageNeverAcked));
        },
      }
    }
  }

  fn recv_loop(&self) {
    while !self.stop.load(Ordering::Acquire) {
      match self.sock.poll(self.config.max_dgram_size) {
        | Ok(Some(dgram)) => self.dispatch(dgram),
        | Ok(None) => thread::sleep(to_std(self.config.poll_interval)),
        | Err(e) => {
          log::error!("{}", When::Polling.what(What::SockError(e)));
          thread::sleep(to_std(self.config.poll_interval));
        },
      }
    }

    // Nothing will answer the requests still waiting; dropping their
    // senders wakes them up.
    lock(&self.pending).entries.clear();
  }

  fn dispatch(&self, Addrd(bytes, from): Addrd<Vec<u8>>) {
    log::trace!("recvd {}b <- {}", bytes.len(), from);

    let max = self.config.max_dgram_size;
    if bytes.len() > max {
      log::debug!("datagram from {} exceeds {} bytes and was truncated", from, max);
    }

    let header = match Header::try_from_bytes(bytes.as_slice()) {
      | Ok(header) => header,
      | Err(e) => {
        log::debug!("discarding datagram from {}: {}", from, e);
        return;
      },
    };

    match header.ty {
      | Type::Ack | Type::Reset => self.on_answer(header, &bytes, from),
      | Type::Con | Type::Non => self.on_separate(header, &bytes, from),
    }
  }

  /// An ACK or RST, which answers a request of ours by message ID
  fn on_answer(&self, header: Header, bytes: &[u8], from: SocketAddr) {
    let empty = header.code == Code::EMPTY;
    let mut ignored_empty_ack = false;

    let entry = lock(&self.pending).take_where(header.id, |p| {
                                     if !same_endpoint(p.dest, from) {
                                       false
                                     } else if header.ty == Type::Reset || (empty && p.ping) {
                                       true
                                     } else if empty {
                                       ignored_empty_ack = true;
                                       false
                                     } else {
                                       p.token == header.token
                                     }
                                   });

    let entry = match entry {
      | Some(entry) => entry,
      | None if ignored_empty_ack => {
        log::debug!("message {} was acked by {} without a response; waiting for a piggybacked one",
                    header.id.0,
                    from);
        return;
      },
      | None => {
        log::debug!("discarding {:?} {} from {}: it answers no pending request",
                    header.ty,
                    header.id.0,
                    from);
        return;
      },
    };

    let reply = match (header.ty, empty) {
      | (Type::Reset, _) if !entry.ping => Err(Refusal::Reset),
      | (_, true) => Ok(Message::new(header.ty, header.code, header.id, header.token)),
      | _ => self.parse(bytes, from),
    };

    Self::deliver(entry, reply);
  }

  /// A CON or NON message, which may be the response to one of our NON requests
  fn on_separate(&self, header: Header, bytes: &[u8], from: SocketAddr) {
    let entry = if header.code == Code::EMPTY {
      None
    } else {
      lock(&self.pending).take_by_token(header.token, from)
    };

    let entry = match entry {
      | Some(entry) => entry,
      | None if header.ty == Type::Con => {
        log::debug!("rejecting unexpected CON {} from {}", header.id.0, from);
        self.send_empty(Message::new(Type::Reset, Code::EMPTY, header.id, Token::empty()), from);
        return;
      },
      | None => {
        log::debug!("discarding NON {} from {}: it answers no pending request",
                    header.id.0,
                    from);
        return;
      },
    };

    let reply = self.parse(bytes, from);
    if header.ty == Type::Con {
      let ty = if reply.is_ok() { Type::Ack } else { Type::Reset };
      self.send_empty(Message::new(ty, Code::EMPTY, header.id, Token::empty()), from);
    }

    Self::deliver(entry, reply);
  }

  fn parse(&self, bytes: &[u8], from: SocketAddr) -> Reply {
    let max = self.config.max_dgram_size;
    let parsed = if bytes.len() > max {
      Err(MessageParseError::TooLong(max))
    } else {
      Message::try_from_bytes(bytes)
    };

    match parsed {
      | Ok(msg) => {
        log::debug!("recvd {} <- {}", msg_summary(&msg), from);
        Ok(msg)
      },
      | Err(e) => {
        log::warn!("response from {} could not be parsed: {}", from, e);
        Err(Refusal::Malformed(e))
      },
    }
  }

  fn send_empty(&self, msg: Message, to: SocketAddr) {
    let sent = (&msg).try_into_bytes()
                     .map_err(|e| e.to_string())
                     .and_then(|bytes| {
                       self.send_dgram(Addrd(&bytes, to))
                           .map_err(|e| e.to_string())
                     });

    if let Err(e) = sent {
      log::error!("failed to send {:?} {} to {}: {}", msg.ty, msg.id.0, to, e);
    }
  }

  fn deliver(entry: Pending, reply: Reply) {
    if entry.reply.try_send(reply).is_err() {
      log::trace!("caller waiting on {:?} is gone", entry.token);
    }
  }
}
