/*!
  The assembler turns source text into a memory image.

  Every token that produces a value occupies the next word of memory, starting at address 0.
  Operators combine a value with the one before it instead of taking a word of their own, so
  `len-txt+1` is a single word. Labels mark the address of the next word.

  Because a label can be referenced before it is declared, the source is scanned twice. The
  first pass only binds labels to addresses. The second pass resolves every reference and writes
  the values into memory. Both passes tokenize the source identically, so label scopes evolve the
  same way in each.
*/

mod token;

use std::ops::Range;

use crate::error::{Error, Excerpt, MemoryError, ParseError, ParseErrorKind};
use crate::label::{LabelTable, Scope};
use crate::memory::Memory;
use crate::word::Word;

pub use token::{is_label_char, Operator, Token, Tokens};
use token::needs_separator;

/// Sources this long or longer are rejected outright.
pub const MAX_SOURCE_LENGTH: usize = 1 << 30;
/// Characters of context shown before the error in a diagnostic window.
const WINDOW_LEAD: usize = 30;
/// The widest a diagnostic window can be.
const WINDOW_WIDTH: usize = 60;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Pass {
  /// Binds labels.
  Declare,
  /// Resolves references and writes memory.
  Emit,
}

/// What the most recent non-value token left waiting for a value.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Pending {
  Nothing,
  Declaration,
  Operator(Operator),
}

enum Failure {
  Parse(ParseErrorKind, Range<usize>),
  Memory(MemoryError),
}

/**
  The state of one pass over the source. `address` is the address of the next word. The most
  recent value is held in `accumulator` until it is complete, which is when the next value that
  is not joined to it by an operator begins.
*/
struct PassState<'a> {
  pass        : Pass,
  labels      : &'a mut LabelTable,
  memory      : &'a mut Memory,
  scope       : Scope,
  address     : Word,
  accumulator : Word,
  pending     : Pending,
}

impl<'a> PassState<'a> {

  fn new(pass: Pass, labels: &'a mut LabelTable, memory: &'a mut Memory) -> PassState<'a> {
    PassState {
      pass,
      labels,
      memory,
      scope       : LabelTable::begin(),
      address     : Word::ZERO,
      accumulator : Word::ZERO,
      pending     : Pending::Nothing,
    }
  }

  fn run(&mut self, source: &str) -> Result<(), Failure> {
    let mut tokens = Tokens::new(source);
    let mut last_span = 0..0;

    while let Some((token, span)) = tokens.next() {
      let fail = |kind: ParseErrorKind| Failure::Parse(kind, span.clone());
      match token {

        Token::Blank => continue,

        Token::UnterminatedComment => return Err(fail(ParseErrorKind::UnterminatedComment)),

        Token::Unexpected => return Err(fail(ParseErrorKind::UnexpectedToken)),

        Token::Operator(operator) => self.operator(operator).map_err(fail)?,

        Token::Declaration(name) => self.declare(name).map_err(fail)?,

        Token::Literal(value) => self.value(value)?,

        Token::Here => self.value(self.address)?,

        Token::Reference(name) => {
          let value = self.reference(name).map_err(fail)?;
          self.value(value)?;
        }

      }

      if token.is_value() && tokens.peek().map_or(false, needs_separator) {
        return Err(fail(ParseErrorKind::UnseparatedTokens));
      }
      last_span = span;
    }

    if let Pending::Operator(_) = self.pending {
      return Err(Failure::Parse(ParseErrorKind::TrailingOperator, last_span.start..source.len()));
    }
    self.flush()
  }

  /// Writes the completed value in the accumulator to its word.
  fn flush(&mut self) -> Result<(), Failure> {
    if self.pass == Pass::Emit && !self.address.is_zero() {
      self.memory.set(self.address.dec(), self.accumulator).map_err(Failure::Memory)?;
    }
    Ok(())
  }

  fn value(&mut self, value: Word) -> Result<(), Failure> {
    let value = match self.pending {
      Pending::Operator(Operator::Add)      => self.accumulator + value,
      Pending::Operator(Operator::Subtract) => self.accumulator - value,
      _ => {
        self.flush()?;
        value
      }
    };
    self.accumulator = value;
    self.address = self.address.inc();
    self.pending = Pending::Nothing;
    Ok(())
  }

  /// An operator reopens the previous word, so step back onto it.
  fn operator(&mut self, operator: Operator) -> Result<(), ParseErrorKind> {
    if let Pending::Operator(_) = self.pending {
      return Err(ParseErrorKind::DoubleOperator);
    }
    if self.address.is_zero() {
      return Err(ParseErrorKind::LeadingOperator);
    }
    if self.pending == Pending::Declaration {
      return Err(ParseErrorKind::OperatingOnDeclaration);
    }
    self.address = self.address.dec();
    self.pending = Pending::Operator(operator);
    Ok(())
  }

  fn declare(&mut self, name: &str) -> Result<(), ParseErrorKind> {
    if let Pending::Operator(_) = self.pending {
      return Err(ParseErrorKind::OperatingOnDeclaration);
    }
    let label = self.labels.declare(&mut self.scope, name);
    if self.pass == Pass::Declare {
      self.labels.bind(label, self.address)?;
    }
    self.pending = Pending::Declaration;
    Ok(())
  }

  /// Forward references read as zero in the first pass, since only label addresses matter there.
  fn reference(&self, name: &str) -> Result<Word, ParseErrorKind> {
    match self.labels.address(&self.scope, name) {
      Some(address)                      => Ok(address),
      None if self.pass == Pass::Declare => Ok(Word::ZERO),
      None                               => Err(ParseErrorKind::UnknownLabel)
    }
  }
}

/**
  Assembles `source` into `memory`, starting at address 0, and returns the labels it declared.
  On failure, memory may hold part of the program.
*/
pub fn assemble(source: &str, memory: &mut Memory) -> Result<LabelTable, Error> {
  assemble_with_limit(source, memory, MAX_SOURCE_LENGTH)
}

/// `assemble`, rejecting sources of `limit` bytes or more.
pub(crate) fn assemble_with_limit(source: &str, memory: &mut Memory, limit: usize)
  -> Result<LabelTable, Error>
{
  if source.len() >= limit {
    return Err(ParseError::new(ParseErrorKind::TooLong).into());
  }

  let mut labels = LabelTable::new();
  for &pass in &[Pass::Declare, Pass::Emit] {
    let mut state = PassState::new(pass, &mut labels, memory);
    let result = state.run(source);

    #[cfg(feature = "trace_computation")]
    println!("Assembler pass {:?}: {} words, {} labels", pass, state.address, state.labels.len());

    match result {
      Ok(())                          => {}
      Err(Failure::Memory(error))     => return Err(error.into()),
      Err(Failure::Parse(kind, span)) => {
        return Err(ParseError::with_excerpt(kind, excerpt(source, span)).into());
      }
    }
  }

  Ok(labels)
}

/**
  Cuts the line containing `span` down to a window of at most `WINDOW_WIDTH` characters, starting
  at most `WINDOW_LEAD` characters before the span, and underlines the span with carets. The line
  is trimmed of surrounding whitespace first. Whitespace under the window is copied into the
  underline so tabs keep the carets aligned.
*/
fn excerpt(source: &str, span: Range<usize>) -> Excerpt {
  let bytes = source.as_bytes();
  let start = span.start.min(bytes.len());
  let line  = 1 + bytes[..start].iter().filter(|&&b| b == b'\n').count();

  let mut line_start = bytes[..start].iter().rposition(|&b| b == b'\n').map_or(0, |k| k + 1);
  let mut line_end   = bytes[start..].iter().position(|&b| b == b'\n').map_or(bytes.len(), |k| start + k);
  while line_start < line_end && bytes[line_start] <= b' ' {
    line_start += 1;
  }
  while line_end > line_start && bytes[line_end - 1] <= b' ' {
    line_end -= 1;
  }

  // Only ASCII bytes were skipped, so both ends are character boundaries.
  let characters: Vec<(usize, char)> =
    source[line_start..line_end]
      .char_indices()
      .map(|(offset, c)| (line_start + offset, c))
      .collect();
  let error_at = characters.iter().position(|&(offset, _)| offset >= start).unwrap_or(characters.len());
  let first    = error_at.saturating_sub(WINDOW_LEAD);

  let mut window    = String::new();
  let mut underline = String::new();
  for &(offset, c) in characters.iter().skip(first).take(WINDOW_WIDTH) {
    window.push(c);
    underline.push(
      if span.contains(&offset) {
        '^'
      } else if c <= ' ' {
        c
      } else {
        ' '
      }
    );
  }

  Excerpt { line, window, underline }
}
