use std::fmt::Display;
use std::process::ExitCode;

use clap::Parser;
use embedded_time::duration::Milliseconds;
use mote::blocking::Client;
use mote::config::{Con, Config};
use mote::core::{Error, What};
use mote::net::Endpoint;
use mote::req::{Method, Req};
use mote::resp::code::code_to_human;
use mote::retry::Attempts;
use mote::uri::Uri;

/// Exit codes; clap exits with 2 on usage errors
mod exit {
  pub const OTHER: u8 = 1;
  pub const BIND: u8 = 3;
  pub const TIMEOUT: u8 = 4;
  pub const MALFORMED: u8 = 5;
  pub const DECODE: u8 = 6;
  pub const INVALID_TARGET: u8 = 7;
}

/// Send one CoAP request to a mote and print the response payload
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
  /// Resource to request, e.g. coap://[bbbb::1060:1213:7cca:52cc]:5683/s/c
  #[arg(conflicts_with_all = ["host", "port", "path"], required_unless_present = "host")]
  uri: Option<String>,

  /// IPv6 or IPv4 address of the mote
  #[arg(long, requires = "path")]
  host: Option<String>,

  /// Port of the mote
  #[arg(long, default_value_t = mote::net::DEFAULT_PORT)]
  port: u16,

  /// Resource path, e.g. s/c
  #[arg(long, requires = "host")]
  path: Option<String>,

  /// Local UDP port to bind; 0 picks any free port
  #[arg(long, default_value_t = 61618)]
  local_port: u16,

  /// GET, POST, PUT or DELETE
  #[arg(short = 'X', long, default_value = "GET")]
  method: Method,

  /// Request payload
  #[arg(long)]
  payload: Option<String>,

  /// Send a non-confirmable request, which is never retransmitted
  #[arg(long)]
  non: bool,

  /// Initial retransmission timeout (ACK_TIMEOUT)
  #[arg(long, default_value_t = 2_000)]
  ack_timeout_ms: u64,

  /// Retransmissions before giving up (MAX_RETRANSMIT)
  #[arg(long, default_value_t = 4)]
  max_retransmit: u16,

  /// Replace invalid utf8 in the response instead of failing
  #[arg(long)]
  lossy: bool,

  /// Log more; repeat for more detail
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

/// Why we are exiting unsuccessfully
#[derive(Debug)]
struct Failure(u8, String);

impl<E: Display> From<Error<E>> for Failure {
  fn from(e: Error<E>) -> Self {
    let code = match e.what {
      | What::Bind(_) => exit::BIND,
      | What::MessageNeverAcked => exit::TIMEOUT,
      | What::MalformedResponse(_) => exit::MALFORMED,
      | What::Decode(_) => exit::DECODE,
      | _ => exit::OTHER,
    };

    Failure(code, e.to_string())
  }
}

fn target(args: &Args) -> Result<(Endpoint, Req), Failure> {
  let invalid = |e: &dyn Display| Failure(exit::INVALID_TARGET, e.to_string());

  match (&args.uri, &args.host, &args.path) {
    | (Some(uri), _, _) => uri.parse::<Uri>()
                              .map(|uri| (uri.endpoint(), uri.req(args.method)))
                              .map_err(|e| invalid(&e)),
    | (None, Some(host), Some(path)) => Endpoint::parse(host, args.port)
                                          .map(|ep| (ep, Req::new(args.method, path)))
                                          .map_err(|e| invalid(&e)),
    | _ => Err(invalid(&"expected a coap:// URI, or --host and --path")),
  }
}

fn config(args: &Args) -> Config {
  let mut config = Config::default();
  config.msg.con = Con { unacked_retry_strategy:
                           Con::strategy_from_ack_timeout(Milliseconds(args.ack_timeout_ms), 15),
                         max_retransmit: Attempts(args.max_retransmit) };
  config
}

fn run(args: Args) -> Result<(), Failure> {
  let (endpoint, mut req) = target(&args)?;
  if let Some(payload) = &args.payload {
    req.set_payload(payload);
  }
  if args.non {
    req.non();
  }

  let client = Client::open_config(args.local_port, config(&args))?;
  log::info!("{} {} -> {}",
             req.method(),
             req.path().map(|segs| segs.join("/")).unwrap_or_default(),
             endpoint);

  let resp = client.send(endpoint, req)?;
  client.close();

  let text = if args.lossy {
    String::from_utf8_lossy(resp.payload()).into_owned()
  } else {
    resp.payload_string()
        .map_err(|e| Failure(exit::DECODE, format!("response payload is not utf8: {}", e)))?
  };

  if !text.is_empty() {
    println!("{}", text);
  }

  if resp.is_success() {
    Ok(())
  } else {
    Err(Failure(exit::OTHER, code_to_human(resp.code())))
  }
}

fn main() -> ExitCode {
  let args = Args::parse();

  let level = match args.verbose {
    | 0 => log::Level::Warn,
    | 1 => log::Level::Info,
    | 2 => log::Level::Debug,
    | _ => log::Level::Trace,
  };
  if let Err(e) = simple_logger::init_with_level(level) {
    eprintln!("mote-get: logging disabled: {}", e);
  }

  match run(args) {
    | Ok(()) => ExitCode::SUCCESS,
    | Err(Failure(code, msg)) => {
      eprintln!("mote-get: {}", msg);
      ExitCode::from(code)
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(argv: &[&str]) -> Args {
    Args::try_parse_from(std::iter::once("mote-get").chain(argv.iter().copied())).unwrap()
  }

  #[test]
  fn uri_target() {
    let (ep, req) = target(&args(&["coap://[bbbb::1060:1213:7cca:52cc]:61618/s/c"])).unwrap();
    assert_eq!(ep, Endpoint::parse("bbbb::1060:1213:7cca:52cc", 61618).unwrap());
    assert_eq!(req.path().unwrap(), vec!["s", "c"]);
    assert_eq!(req.method(), Method::GET);
  }

  #[test]
  fn host_port_path_target() {
    let (ep, req) = target(&args(&["--host", "bbbb::1", "--path", "s/c", "-X", "put"])).unwrap();
    assert_eq!(ep.port(), 5683);
    assert_eq!(req.method(), Method::PUT);
  }

  #[test]
  fn invalid_target_exit_code() {
    let Failure(code, _) = target(&args(&["coap://mote.local/s/c"])).unwrap_err();
    assert_eq!(code, exit::INVALID_TARGET);
  }

  #[test]
  fn usage_errors() {
    let parse = |argv: &[&str]| Args::try_parse_from(std::iter::once("mote-get").chain(argv.iter().copied()));

    assert!(parse(&[]).is_err());
    assert!(parse(&["--host", "bbbb::1"]).is_err());
    assert!(parse(&["coap://[bbbb::1]/s", "--host", "bbbb::1", "--path", "s"]).is_err());
    assert!(parse(&["coap://[bbbb::1]/s", "-X", "PATCH"]).is_err());
  }

  #[test]
  fn flags_override_config() {
    let config = config(&args(&["coap://[bbbb::1]/s", "--ack-timeout-ms", "100", "--max-retransmit", "2"]));
    assert_eq!(config.msg.con.max_transmissions(), Attempts(3));
    assert_eq!(config.msg.con.max_transmit_wait_millis(), Milliseconds(150 * 7u64));
  }

  #[test]
  fn huge_ack_timeout_flag() {
    let config = config(&args(&["coap://[bbbb::1]/s", "--ack-timeout-ms", "18446744073709551615"]));
    assert_eq!(config.msg.con.max_transmit_wait_millis(), Milliseconds(u64::MAX));
  }

  #[test]
  fn exit_codes() {
    let code = |what: What<std::io::Error>| {
      let Failure(code, _) = mote::core::When::None.what(what).into();
      code
    };

    assert_eq!(code(What::MessageNeverAcked), exit::TIMEOUT);
    assert_eq!(code(What::Bind(std::io::ErrorKind::AddrInUse.into())), exit::BIND);
    assert_eq!(code(What::Closed), exit::OTHER);
  }
}
