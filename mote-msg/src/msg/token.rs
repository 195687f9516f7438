use tinyvec::ArrayVec;

/// # Message Token
///
/// The Token is used to match a response with a request.  The token
/// value is a sequence of 0 to 8 bytes.
///
/// Every request carries a client-generated token that the server
/// MUST echo (without modification) in any resulting response.
///
/// A token is intended for use as a client-local identifier for
/// differentiating between concurrent requests; it is unrelated
/// to the [`Id`](crate::Id), which deduplicates and acknowledges
/// individual messages.
///
/// See [RFC7252 - Token](https://datatracker.ietf.org/doc/html/rfc7252#section-5.3.1) for context
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Token(pub ArrayVec<[u8; 8]>);

impl Token {
  /// Take an arbitrary-length sequence of bytes and turn it into an opaque message token
  ///
  /// Currently uses the BLAKE2 hashing algorithm, but this may change in the future.
  ///
  /// ```
  /// use mote_msg::Token;
  ///
  /// let my_token = Token::opaque(&[0, 1, 2]);
  /// assert_eq!(my_token.as_bytes().len(), 8);
  /// assert_eq!(my_token, Token::opaque(&[0, 1, 2]));
  /// ```
  pub fn opaque(data: &[u8]) -> Token {
    use blake2::digest::consts::U8;
    use blake2::{Blake2b, Digest};

    let mut digest = Blake2b::<U8>::new();
    digest.update(data);
    Token(Into::<[u8; 8]>::into(digest.finalize()).into())
  }

  /// Copy a token out of a byte slice, yielding `None` if
  /// the slice is longer than 8 bytes.
  ///
  /// ```
  /// use mote_msg::Token;
  ///
  /// assert!(Token::try_from_slice(&[1, 2, 3]).is_some());
  /// assert!(Token::try_from_slice(&[0; 9]).is_none());
  /// ```
  pub fn try_from_slice(bytes: &[u8]) -> Option<Token> {
    ArrayVec::try_from(bytes).ok().map(Token)
  }

  /// The zero-length token, used by empty messages
  pub fn empty() -> Token {
    Token(ArrayVec::new())
  }

  /// Whether this is a zero-length token
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Borrow the token's bytes
  pub fn as_bytes(&self) -> &[u8] {
    self.0.as_slice()
  }
}
