/*!
  Sparse machine memory. Every address from 0 to 2^64-1 logically holds a value, initially zero,
  but storage is only allocated up to the highest address that has been written a non-zero value.
  The backing vector doubles in length when it grows and never shrinks.

  Addresses at or above `2^address_bits` are never backed. Reading them yields zero and writing a
  non-zero value to them is an allocation failure.
*/

use crate::error::MemoryError;
use crate::word::{Word, WordType};

/// By default memory may grow to 2^32 words.
pub const DEFAULT_ADDRESS_BITS: u32 = 32;
/// The largest width or height a frame header may declare.
pub const MAX_FRAME_DIMENSION: WordType = 65536;

#[derive(Clone, Debug)]
pub struct Memory {
  cells        : Vec<Word>,
  address_bits : u32,
}

/// A frame described by a `{width, height, pixels}` header in memory. Pixels are ARGB words,
/// row-major.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Frame<'m> {
  pub width  : usize,
  pub height : usize,
  pub pixels : &'m [Word],
}

impl Memory {

  pub fn new() -> Memory {
    Memory::with_address_bits(DEFAULT_ADDRESS_BITS)
  }

  pub fn with_address_bits(address_bits: u32) -> Memory {
    Memory {
      cells: Vec::new(),
      address_bits: address_bits.min(64),
    }
  }

  /// The number of backed words. Every address below this is stored explicitly.
  pub fn capacity(&self) -> usize {
    self.cells.len()
  }

  /// A read-only view of the backed words.
  pub fn as_slice(&self) -> &[Word] {
    &self.cells
  }

  pub fn clear(&mut self) {
    self.cells = Vec::new();
  }

  pub fn get(&self, address: Word) -> Word {
    match address.idx() {
      Some(i) if i < self.cells.len() => self.cells[i],
      _                               => Word::ZERO
    }
  }

  /**
    Writes `value` at `address`, growing the backing store if needed. Writing zero past the end
    of the backed region does nothing, since that location already reads as zero.
  */
  pub fn set(&mut self, address: Word, value: Word) -> Result<(), MemoryError> {
    if let Some(i) = address.idx() {
      if i < self.cells.len() {
        self.cells[i] = value;
        return Ok(());
      }
    }
    if value.is_zero() {
      return Ok(());
    }
    let i = self.grow(address)?;
    self.cells[i] = value;
    Ok(())
  }

  /// Grows to the smallest power of two strictly greater than `address`.
  fn grow(&mut self, address: Word) -> Result<usize, MemoryError> {
    let error = MemoryError { address };
    if self.address_bits < 64 && address.value() >> self.address_bits != 0 {
      return Err(error);
    }
    let index = address.idx().ok_or(error)?;
    let length = index.checked_add(1)
                      .and_then(usize::checked_next_power_of_two)
                      .ok_or(error)?;
    self.cells.try_reserve_exact(length - self.cells.len()).map_err(|_| error)?;
    self.cells.resize(length, Word::ZERO);
    Ok(index)
  }

  /**
    Decodes the frame whose header starts at `header`: width, height, and the address of the
    first pixel, in consecutive words. Returns `None` if the header or the pixels are not within
    backed memory or the dimensions are unreasonable.
  */
  pub fn frame(&self, header: Word) -> Option<Frame<'_>> {
    let base = header.idx()?;
    if base.checked_add(3)? > self.cells.len() {
      return None;
    }
    let width  = self.cells[base].value();
    let height = self.cells[base + 1].value();
    if width > MAX_FRAME_DIMENSION || height > MAX_FRAME_DIMENSION {
      return None;
    }
    let (width, height) = (width as usize, height as usize);
    let start = self.cells[base + 2].idx()?;
    let end   = start.checked_add(width.checked_mul(height)?)?;
    if end > self.cells.len() {
      return None;
    }
    Some(Frame { width, height, pixels: &self.cells[start..end] })
  }
}

impl Default for Memory {
  fn default() -> Memory {
    Memory::new()
  }
}
