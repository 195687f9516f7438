use core::fmt;
use core::str::FromStr;

use mote_msg::Code;

use crate::code;

/// Request method
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Method(pub(super) Code);

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.0 {
      | Code { class: 0, detail: 0 } => write!(f, "EMPTY"),
      | Code { class: 0, detail: 1 } => write!(f, "GET"),
      | Code { class: 0, detail: 2 } => write!(f, "POST"),
      | Code { class: 0, detail: 3 } => write!(f, "PUT"),
      | Code { class: 0, detail: 4 } => write!(f, "DELETE"),
      | c => write!(f, "{}", c),
    }
  }
}

impl Method {
  code!(rfc7252("4.1")   EMPTY  = Method(0*00));
  code!(rfc7252("5.8.1") GET    = Method(0*01));
  code!(rfc7252("5.8.2") POST   = Method(0*02));
  code!(rfc7252("5.8.3") PUT    = Method(0*03));
  code!(rfc7252("5.8.4") DELETE = Method(0*04));

  /// The message code of this method
  pub fn code(&self) -> Code {
    self.0
  }
}

/// The method name was not GET, POST, PUT or DELETE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMethod(pub String);

impl fmt::Display for UnknownMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "unknown method {:?}", self.0)
  }
}

impl std::error::Error for UnknownMethod {}

impl FromStr for Method {
  type Err = UnknownMethod;

  /// ```
  /// use mote::req::Method;
  ///
  /// assert_eq!("get".parse::<Method>(), Ok(Method::GET));
  /// assert_eq!("PUT".parse::<Method>(), Ok(Method::PUT));
  /// assert!("PATCH".parse::<Method>().is_err());
  /// ```
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_uppercase().as_str() {
      | "GET" => Ok(Method::GET),
      | "POST" => Ok(Method::POST),
      | "PUT" => Ok(Method::PUT),
      | "DELETE" => Ok(Method::DELETE),
      | _ => Err(UnknownMethod(s.to_string())),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn codes_and_names_agree() {
    for (method, code, name) in [(Method::GET, Code::new(0, 1), "GET"),
                                 (Method::POST, Code::new(0, 2), "POST"),
                                 (Method::PUT, Code::new(0, 3), "PUT"),
                                 (Method::DELETE, Code::new(0, 4), "DELETE")]
    {
      assert_eq!(method.code(), code);
      assert_eq!(method.to_string(), name);
      assert_eq!(name.parse::<Method>(), Ok(method));
    }
  }
}
