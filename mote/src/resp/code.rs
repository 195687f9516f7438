pub use mote_msg::Code;

use crate::code;

// 2.xx
code!(rfc7252("5.9.1.1") CREATED = 2*01);
code!(rfc7252("5.9.1.2") DELETED = 2*02);
code!(rfc7252("5.9.1.3") VALID   = 2*03);
code!(rfc7252("5.9.1.4") CHANGED = 2*04);
code!(rfc7252("5.9.1.5") CONTENT = 2*05);

// 4.xx
code!(rfc7252("5.9.2.1")  BAD_REQUEST                = 4*00);
code!(rfc7252("5.9.2.2")  UNAUTHORIZED               = 4*01);
code!(rfc7252("5.9.2.3")  BAD_OPTION                 = 4*02);
code!(rfc7252("5.9.2.4")  FORBIDDEN                  = 4*03);
code!(rfc7252("5.9.2.5")  NOT_FOUND                  = 4*04);
code!(rfc7252("5.9.2.6")  METHOD_NOT_ALLOWED         = 4*05);
code!(rfc7252("5.9.2.7")  NOT_ACCEPTABLE             = 4*06);
code!(rfc7252("5.9.2.8")  PRECONDITION_FAILED        = 4*12);
code!(rfc7252("5.9.2.9")  REQUEST_ENTITY_TOO_LARGE   = 4*13);
code!(rfc7252("5.9.2.10") UNSUPPORTED_CONTENT_FORMAT = 4*15);

// 5.xx
code!(rfc7252("5.9.3.1") INTERNAL_SERVER_ERROR  =  5*00);
code!(rfc7252("5.9.3.2") NOT_IMPLEMENTED        =  5*01);
code!(rfc7252("5.9.3.3") BAD_GATEWAY            =  5*02);
code!(rfc7252("5.9.3.4") SERVICE_UNAVAILABLE    =  5*03);
code!(rfc7252("5.9.3.5") GATEWAY_TIMEOUT        =  5*04);
code!(rfc7252("5.9.3.6") PROXYING_NOT_SUPPORTED =  5*05);

/// Render a code with its registered name, e.g. `"4.04 Not Found"`.
///
/// Codes without a registered name render as just `"c.dd"`.
///
/// ```
/// use mote::resp::code::{code_to_human, CONTENT};
/// use mote_msg::Code;
///
/// assert_eq!(code_to_human(CONTENT), "2.05 Content");
/// assert_eq!(code_to_human(Code::new(0, 1)), "0.01 GET");
/// assert_eq!(code_to_human(Code::new(6, 1)), "6.01");
/// ```
pub fn code_to_human(code: Code) -> String {
  let name = match (code.class, code.detail) {
    | (0, 0) => "Empty",
    | (0, 1) => "GET",
    | (0, 2) => "POST",
    | (0, 3) => "PUT",
    | (0, 4) => "DELETE",
    | (2, 1) => "Created",
    | (2, 2) => "Deleted",
    | (2, 3) => "Valid",
    | (2, 4) => "Changed",
    | (2, 5) => "Content",
    | (4, 0) => "Bad Request",
    | (4, 1) => "Unauthorized",
    | (4, 2) => "Bad Option",
    | (4, 3) => "Forbidden",
    | (4, 4) => "Not Found",
    | (4, 5) => "Method Not Allowed",
    | (4, 6) => "Not Acceptable",
    | (4, 12) => "Precondition Failed",
    | (4, 13) => "Request Entity Too Large",
    | (4, 15) => "Unsupported Content-Format",
    | (5, 0) => "Internal Server Error",
    | (5, 1) => "Not Implemented",
    | (5, 2) => "Bad Gateway",
    | (5, 3) => "Service Unavailable",
    | (5, 4) => "Gateway Timeout",
    | (5, 5) => "Proxying Not Supported",
    | _ => return code.to_string(),
  };

  format!("{} {}", code, name)
}
