use core::fmt;

/// Errors encounterable while parsing an option from bytes
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Eq, Ord)]
pub enum OptParseError {
  /// Reached end of stream before parsing was finished
  UnexpectedEndOfStream,

  /// Option Delta was set to 15, which is invalid.
  OptionDeltaReservedValue(u8),

  /// Value Length was set to 15, which is invalid.
  ValueLengthReservedValue(u8),

  /// The running sum of option deltas no longer fits in an option number
  OptionNumberOverflow,
}

impl OptParseError {
  /// Shorthand for [`OptParseError::UnexpectedEndOfStream`]
  pub fn eof() -> Self {
    Self::UnexpectedEndOfStream
  }
}

impl fmt::Display for OptParseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::UnexpectedEndOfStream => write!(f, "option ended unexpectedly"),
      | Self::OptionDeltaReservedValue(n) => write!(f, "option delta uses reserved value {}", n),
      | Self::ValueLengthReservedValue(n) => write!(f, "option length uses reserved value {}", n),
      | Self::OptionNumberOverflow => write!(f, "option number overflowed"),
    }
  }
}

#[cfg(feature = "std")]
impl std::error::Error for OptParseError {}
