//! The machine's only data type: an unsigned 64 bit value that doubles as an address, with
//! arithmetic that wraps modulo 2^64.

use std::fmt::{Display, Formatter};
use std::ops::{Add, Sub};

// `WordType` is `u64`, the width of every memory cell and of the address space.
pub type WordType = u64;

/**
  A `Word` is both a memory value and a memory address. Arithmetic never overflows; it wraps
  around, which is how programs express negative numbers. For example, `0-1` assembles to
  2^64-1, the halt address.
*/
#[derive(Copy, Clone, Default, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct Word(pub WordType);

impl Word {
  pub const ZERO: Word = Word(0);
  pub const MAX : Word = Word(WordType::MAX);

  pub fn zero() -> Word {
    Word::ZERO
  }

  pub fn new(value: WordType) -> Word {
    Word(value)
  }

  /// Reinterprets a signed number in two's complement, so `from_signed(-1) == Word::MAX`.
  pub fn from_signed(value: i64) -> Word {
    Word(value as WordType)
  }

  pub fn value(self) -> WordType {
    self.0
  }

  pub fn add(self, rhs: Word) -> Word {
    Word(self.0.wrapping_add(rhs.0))
  }

  /**
    Computes `self - rhs` and whether `self <= rhs`. The flag is the branch condition of the
    machine's instruction, so it must be computed from the operands and not from the result.
  */
  pub fn sub(self, rhs: Word) -> (Word, bool) {
    (Word(self.0.wrapping_sub(rhs.0)), self.0 <= rhs.0)
  }

  /// Multiplies by a small base, used when accumulating numeric literals digit by digit.
  pub fn mul_small(self, base: u32) -> Word {
    Word(self.0.wrapping_mul(base as WordType))
  }

  pub fn inc(self) -> Word {
    Word(self.0.wrapping_add(1))
  }

  pub fn dec(self) -> Word {
    Word(self.0.wrapping_sub(1))
  }

  pub fn is_zero(self) -> bool {
    self.0 == 0
  }

  pub fn low_byte(self) -> u8 {
    (self.0 & 0xFF) as u8
  }

  /// Converts to an index into a vector if the value fits in `usize`.
  pub fn idx(self) -> Option<usize> {
    if self.0 > usize::MAX as WordType {
      None
    } else {
      Some(self.0 as usize)
    }
  }

  pub fn to_decimal_string(self) -> String {
    self.0.to_string()
  }
}

impl From<WordType> for Word {
  fn from(value: WordType) -> Word {
    Word(value)
  }
}

impl From<i64> for Word {
  fn from(value: i64) -> Word {
    Word::from_signed(value)
  }
}

impl From<u32> for Word {
  fn from(value: u32) -> Word {
    Word(value as WordType)
  }
}

impl Display for Word {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

// Wrapping, like every other operation on a `Word`.
impl Add<Word> for Word {
  type Output = Word;
  fn add(self, rhs: Word) -> Word {
    Word::add(self, rhs)
  }
}

impl Add<WordType> for Word {
  type Output = Word;
  fn add(self, rhs: WordType) -> Word {
    Word(self.0.wrapping_add(rhs))
  }
}

impl Sub<Word> for Word {
  type Output = Word;
  fn sub(self, rhs: Word) -> Word {
    Word::sub(self, rhs).0
  }
}
