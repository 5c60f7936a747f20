//! Error types for assembly and memory failures. Both are terminal for a machine: once one is
//! recorded, the machine must be cleared before it runs again.

use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::word::Word;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum Error {
  #[error("{0}")]
  Parse(#[from] ParseError),
  #[error("{0}")]
  Memory(#[from] MemoryError),
}

/// Everything that can go wrong while turning source text into a memory image.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ParseErrorKind {
  #[error("Input string too long")]
  TooLong,
  #[error("Unterminated block comment")]
  UnterminatedComment,
  #[error("Double operator")]
  DoubleOperator,
  #[error("Operating on declaration")]
  OperatingOnDeclaration,
  #[error("Leading operator")]
  LeadingOperator,
  #[error("Trailing operator")]
  TrailingOperator,
  #[error("Duplicate label declaration")]
  DuplicateLabel,
  #[error("Unable to find label")]
  UnknownLabel,
  #[error("Unseparated tokens")]
  UnseparatedTokens,
  #[error("Unexpected token")]
  UnexpectedToken,
  #[error("Could not open file \"{path}\": {reason}")]
  FileUnreadable { path: String, reason: String },
  #[error("File \"{path}\" too large: {size} bytes")]
  FileTooLarge { path: String, size: u64 },
}

/// The line of source an error occurred on, cut down to a window with the offending span
/// underlined by carets.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Excerpt {
  /// 1-based
  pub line      : usize,
  pub window    : String,
  pub underline : String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParseError {
  pub kind    : ParseErrorKind,
  pub excerpt : Option<Excerpt>,
}

impl ParseError {
  pub fn new(kind: ParseErrorKind) -> ParseError {
    ParseError { kind, excerpt: None }
  }

  pub fn with_excerpt(kind: ParseErrorKind, excerpt: Excerpt) -> ParseError {
    ParseError { kind, excerpt: Some(excerpt) }
  }

  pub fn line(&self) -> Option<usize> {
    self.excerpt.as_ref().map(|e| e.line)
  }
}

impl Display for ParseError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match &self.excerpt {
      Some(excerpt) => {
        write!(
          f,
          "Parser: {}\nLine  : {}\n\n\t{}\n\t{}\n\n",
          self.kind, excerpt.line, excerpt.window, excerpt.underline
        )
      }
      None => {
        writeln!(f, "Parser: {}", self.kind)
      }
    }
  }
}

impl std::error::Error for ParseError {}

/// The backing store could not grow to cover `address`.
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
#[error("Failed to allocate memory.\nIndex: {address}\n")]
pub struct MemoryError {
  pub address: Word,
}
