/// Reads a byte buffer front to back, the way the message
/// and option parsers consume datagrams.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor<T> {
  buf: T,
  pos: usize,
}

impl<T: AsRef<[u8]>> Cursor<T> {
  /// Start reading `buf` from its first byte
  pub fn new(buf: T) -> Cursor<T> {
    Cursor { buf, pos: 0 }
  }

  fn unread(&self) -> &[u8] {
    self.buf.as_ref().get(self.pos..).unwrap_or(&[])
  }

  /// Consume one byte; `None` once everything has been read.
  pub fn next(&mut self) -> Option<u8> {
    let byte = *self.unread().first()?;
    self.pos += 1;
    Some(byte)
  }

  /// Consume exactly `n` bytes.
  ///
  /// When fewer than `n` remain nothing is consumed and `None` is returned.
  pub fn take_exact(&mut self, n: usize) -> Option<&[u8]> {
    let start = self.pos;
    let end = start.checked_add(n).filter(|end| *end <= self.buf.as_ref().len())?;
    self.pos = end;
    Some(&self.buf.as_ref()[start..end])
  }

  /// The next `n` bytes, without consuming them
  pub fn peek_exact(&self, n: usize) -> Option<&[u8]> {
    self.unread().get(..n)
  }

  /// Consume everything that is left
  pub fn take_until_end(&mut self) -> &[u8] {
    let start = self.pos.min(self.buf.as_ref().len());
    self.pos = self.buf.as_ref().len();
    &self.buf.as_ref()[start..]
  }

  /// Number of bytes not read yet
  pub fn remaining(&self) -> usize {
    self.unread().len()
  }

  /// Have all bytes been read?
  pub fn is_exhausted(&self) -> bool {
    self.remaining() == 0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn next_until_exhausted() {
    let mut cur = Cursor::new([0x40u8]);
    assert_eq!(cur.next(), Some(0x40));
    assert_eq!(cur.next(), None);
    assert_eq!(cur.next(), None);
  }

  #[test]
  fn take_exact_is_all_or_nothing() {
    let mut cur = Cursor::new(vec![1, 2, 3]);
    assert_eq!(cur.take_exact(2), Some([1, 2].as_ref()));
    assert_eq!(cur.take_exact(2), None);
    assert_eq!(cur.remaining(), 1);
    assert_eq!(cur.take_exact(1), Some([3].as_ref()));
    assert!(cur.is_exhausted());
    assert_eq!(cur.take_exact(usize::MAX), None);
  }

  #[test]
  fn peek_does_not_consume() {
    let cur = Cursor::new(vec![1, 2, 3]);
    assert_eq!(cur.peek_exact(3), Some([1, 2, 3].as_ref()));
    assert_eq!(cur.peek_exact(4), None);
    assert_eq!(cur.remaining(), 3);
  }

  #[test]
  fn payload_after_marker() {
    let mut cur = Cursor::new([0xFFu8, 0x4F, 0x4B]);
    assert_eq!(cur.next(), Some(0xFF));
    assert!(!cur.is_exhausted());
    assert_eq!(cur.take_until_end(), b"OK");
    assert!(cur.is_exhausted());
    assert_eq!(cur.take_until_end(), &[] as &[u8]);
  }
}
