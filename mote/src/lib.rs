//! `mote` is a small CoAP client for reading sensors on constrained devices.
//!
//! ## CoAP
//! CoAP is an application-level network protocol that copies the semantics of HTTP
//! to an environment conducive to **constrained** devices. (weak hardware, small battery capacity, etc.)
//!
//! Requests are carried in UDP datagrams, so this crate takes care of the parts
//! of [RFC7252](https://datatracker.ietf.org/doc/html/rfc7252) that make UDP reliable enough to ask a mote a question:
//! - Confirmable requests are retransmitted with exponential backoff until they are acknowledged
//! - Responses are matched to requests by message ID and token
//! - Stray, duplicate and malformed datagrams are discarded without disturbing outstanding requests
//!
//! ## Example
//! ```no_run
//! use mote::blocking::Client;
//! use mote::net::Endpoint;
//!
//! let client = Client::open(61618).unwrap();
//! let mote: Endpoint = "[bbbb::1060:1213:7cca:52cc]:5683".parse().unwrap();
//!
//! let reading = client.get_string(mote, "s/c").unwrap();
//! println!("{}", reading);
//! ```
//!
//! Many requests may be outstanding on one [`Client`](blocking::Client) at once;
//! it can be shared between threads by reference.

#![doc(html_root_url = "https://docs.rs/mote/0.1.0")]
// -
// style
#![allow(clippy::unused_unit)]
// -
// deny
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![cfg_attr(not(test), deny(unsafe_code))]
// -
// warnings
#![cfg_attr(not(test), warn(unreachable_pub))]


pub(crate) mod logging;

/// Blocking CoAP client
pub mod blocking;

/// Runtime configuration
pub mod config;

/// Request correlation, retransmission & the receive loop
pub mod core;

/// Network abstractions
pub mod net;

/// Requests
pub mod req;

/// Responses
pub mod resp;

/// Retransmission timers
pub mod retry;

/// `std`-only implementations of the network & time abstractions
pub mod std;

/// Time abstractions
pub mod time;

/// Parsing `coap://` URIs
pub mod uri;

macro_rules! code {
  (rfc7252($section:literal) $name:ident = $c:literal * $d:literal) => {
    #[doc = concat!("See [RFC7252 section ",
                    $section,
                    "](https://datatracker.ietf.org/doc/html/rfc7252#section-",
                    $section,
                    ")")]
    #[allow(clippy::zero_prefixed_literal)]
    pub const $name: mote_msg::Code = mote_msg::Code::new($c, $d);
  };
  (rfc7252($section:literal) $name:ident = $newtype:tt($c:literal * $d:literal)) => {
    #[doc = concat!("See [RFC7252 section ",
                    $section,
                    "](https://datatracker.ietf.org/doc/html/rfc7252#section-",
                    $section,
                    ")")]
    #[allow(clippy::zero_prefixed_literal)]
    pub const $name: $newtype = $newtype(mote_msg::Code::new($c, $d));
  };
}

pub(crate) use code;
