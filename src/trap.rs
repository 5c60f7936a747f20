/*!
  Reserved addresses. The top half of the address space is never ordinary memory. A handful of
  addresses at its very top are traps that interact with the host instead of reading or writing a
  memory cell. A trap is identified by its offset from the top, so the halt trap at offset 1 is
  address 2^64-1, written `0-1` in assembly.

  Offsets are significant: they are the machine's ABI. New host capabilities must take unused
  offsets.
*/

use std::convert::TryFrom;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};

use crate::word::{Word, WordType};

/// Every address at or above this is reserved and never backed by memory.
pub const RESERVED_BASE: Word = Word(1 << 63);

/// Ticks per second of the machine's clock. Time is seconds in 32.32 fixed point.
pub const TICKS_PER_SECOND: WordType = 1 << 32;

#[derive(
StrumDisplay, IntoStaticStr, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,          Eq, PartialEq,  Debug,            Hash
)]
#[repr(u64)]
pub enum Trap {
  /// A: end execution.
  Halt = 1,
  /// A: write the low byte of the input value to the host.
  WriteByte = 2,
  /// B: the next input byte, or 0 if none is available.
  ReadByte = 3,
  /// B: ticks per second of the host clock.
  Frequency = 4,
  /// B: the current time in ticks.
  Time = 5,
  /// A: sleep for the input value in ticks.
  Sleep = 6,
  /// A: render the frame whose header is at the input value.
  Draw = 7,
}

impl Trap {
  pub fn offset(&self) -> WordType {
    Into::<WordType>::into(*self)
  }

  /// The trap's address, counting down from 2^64-1.
  pub fn address(&self) -> Word {
    Word::ZERO - Word(self.offset())
  }

  /// The trap at `address`, if any.
  pub fn from_address(address: Word) -> Option<Trap> {
    let offset = (Word::ZERO - address).value();
    Trap::try_from(offset).ok()
  }
}

pub fn is_reserved(address: Word) -> bool {
  address >= RESERVED_BASE
}


#[cfg(test)]
mod tests {
  use super::*;
  use std::str::FromStr;
  use strum::IntoEnumIterator;

  #[test]
  fn addresses_count_down_from_the_top() {
    assert_eq!(Trap::Halt.address(), Word::MAX);
    assert_eq!(Trap::WriteByte.address(), Word::from(-2i64));
    assert_eq!(Trap::ReadByte.address(), Word::from(-3i64));
    assert_eq!(Trap::Frequency.address(), Word::from(-4i64));
    assert_eq!(Trap::Time.address(), Word::from(-5i64));
    assert_eq!(Trap::Sleep.address(), Word::from(-6i64));
    assert_eq!(Trap::Draw.address(), Word::from(-7i64));
  }

  #[test]
  fn round_trip_through_addresses() {
    for trap in Trap::iter() {
      assert_eq!(Trap::from_address(trap.address()), Some(trap));
      assert!(is_reserved(trap.address()));
    }
  }

  #[test]
  fn unassigned_addresses() {
    assert_eq!(Trap::from_address(Word::ZERO), None);
    assert_eq!(Trap::from_address(Word::from(-8i64)), None);
    assert_eq!(Trap::from_address(Word(12)), None);
    assert!(!is_reserved(Word((1 << 63) - 1)));
    assert!(is_reserved(RESERVED_BASE));
  }

  #[test]
  fn names() {
    assert_eq!(Trap::WriteByte.to_string(), "WriteByte");
    assert_eq!(Trap::from_str("Sleep").ok(), Some(Trap::Sleep));
  }
}
