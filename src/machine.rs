//! The machine: memory, the instruction pointer, the labels of the last assembly, and the state
//! that says whether it may run. Execution lives in `executor` and `scheduler`.

use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use prettytable::{format as TableFormat, Table};

use crate::assembler::{self, MAX_SOURCE_LENGTH};
use crate::error::{Error, MemoryError, ParseError, ParseErrorKind, Result};
use crate::label::LabelTable;
use crate::memory::{Memory, DEFAULT_ADDRESS_BITS};
use crate::trap::Trap;
use crate::word::Word;

/// Words shown in the state table, starting at the instruction pointer.
const DUMP_WORDS: u64 = 9;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MachineConfig {
  /// Memory may grow to `2^address_bits` words.
  pub address_bits   : u32,
  /// Sleeps at most this long are waited out inside `run` instead of yielding.
  pub busy_wait      : Duration,
  /// Instructions between clock checks in `run`.
  pub check_interval : u32,
}

impl Default for MachineConfig {
  fn default() -> MachineConfig {
    MachineConfig {
      address_bits   : DEFAULT_ADDRESS_BITS,
      busy_wait      : Duration::from_millis(4),
      check_interval : 4096,
    }
  }
}

/**
  The lifecycle of a machine. A machine starts `Ready`, becomes `Running` once a program is
  assembled into it, and ends in one of the other states. Only `Running` executes. Every state is
  left only through `clear` or a new assembly.
*/
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum State {
  Ready,
  Running,
  Completed,
  ParserError(ParseError),
  MemoryError(MemoryError),
}

impl State {
  /// The numeric state, also used as the process exit code.
  pub fn code(&self) -> i32 {
    match self {
      State::Completed      => 0,
      State::Ready          |
      State::Running        => 1,
      State::ParserError(_) => 2,
      State::MemoryError(_) => 3,
    }
  }

  pub fn is_error(&self) -> bool {
    matches!(self, State::ParserError(_) | State::MemoryError(_))
  }
}

impl Display for State {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      State::Ready          => write!(f, "Ready"),
      State::Running        => write!(f, "Running"),
      State::Completed      => write!(f, "Completed"),
      State::ParserError(_) => write!(f, "Parser error"),
      State::MemoryError(_) => write!(f, "Memory error"),
    }
  }
}

pub struct Machine {
  pub(crate) ip            : Word,
  pub(crate) memory        : Memory,
  pub(crate) state         : State,
  /// When a sleep that `run` deferred ends.
  pub(crate) pending_sleep : Option<Instant>,
  labels                   : LabelTable,
  config                   : MachineConfig,
}

impl Machine {

  // region Display methods

  /// The words from `start`, with the word at `highlight` marked and trap addresses named.
  fn make_word_table(memory: &Memory, start: Word, count: u64, highlight: Word) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    for offset in 0..count {
      let address = start + offset;
      let value   = memory.get(address);
      let contents = match Trap::from_address(value) {
        Some(trap) => format!("{} ({})", value, trap),
        None       => format!("{}", value)
      };

      match address == highlight {

        true  => {
          table.add_row(row![r->format!("* --> mem[{}] =", address), contents]);
        }

        false => {
          table.add_row(row![r->format!("mem[{}] =", address), contents]);
        }

      }
    }
    table
  }

  /// The operands of the instruction at the instruction pointer and what they point to.
  fn make_operand_table(&self) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Operand", ubl->"Value", ubl->"Target"]);

    for (offset, name) in ["A", "B", "C"].iter().enumerate() {
      let operand = self.memory.get(self.ip + offset as u64);
      let target = match (offset, Trap::from_address(operand)) {
        (2, _)          => String::new(),
        (_, Some(trap)) => trap.to_string(),
        _               => format!("{}", self.memory.get(operand))
      };
      table.add_row(row![r->*name, operand, target]);
    }
    table
  }

  // endregion

  pub fn new() -> Machine {
    Machine::with_config(MachineConfig::default())
  }

  pub fn with_config(config: MachineConfig) -> Machine {
    Machine {
      ip            : Word::ZERO,
      memory        : Memory::with_address_bits(config.address_bits),
      state         : State::Ready,
      pending_sleep : None,
      labels        : LabelTable::new(),
      config,
    }
  }

  pub fn config(&self) -> &MachineConfig {
    &self.config
  }

  /// Returns the machine to `Ready` with empty memory, no labels, and the instruction pointer at 0.
  pub fn clear(&mut self) {
    self.ip            = Word::ZERO;
    self.state         = State::Ready;
    self.pending_sleep = None;
    self.labels        = LabelTable::new();
    self.memory.clear();
  }

  /**
    Clears the machine and assembles `source` into it. On success the machine is `Running` at
    address 0. On failure the machine holds the error in its state, and the same error is
    returned.
  */
  pub fn assemble(&mut self, source: &str) -> Result<()> {
    self.clear();
    match assembler::assemble(source, &mut self.memory) {

      Ok(labels) => {
        self.labels = labels;
        self.state  = State::Running;
        Ok(())
      }

      Err(error) => {
        self.fail(error.clone());
        Err(error)
      }

    }
  }

  /// Reads the file at `path` and assembles it. File problems are reported as parser errors.
  pub fn assemble_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
    let path = path.as_ref();
    let name = path.display().to_string();

    let unreadable = |error: std::io::Error| {
      Error::from(ParseError::new(ParseErrorKind::FileUnreadable {
        path   : name.clone(),
        reason : error.to_string(),
      }))
    };

    let loaded =
      fs::metadata(path)
        .map_err(unreadable)
        .and_then(|metadata| {
          match metadata.len() >= MAX_SOURCE_LENGTH as u64 {
            true  => Err(Error::from(ParseError::new(ParseErrorKind::FileTooLarge {
              path : name.clone(),
              size : metadata.len(),
            }))),
            false => fs::read_to_string(path).map_err(unreadable)
          }
        });

    match loaded {
      Ok(source) => self.assemble(&source),
      Err(error) => {
        self.clear();
        self.fail(error.clone());
        Err(error)
      }
    }
  }

  /// Moves a `Ready` machine to `Running`, for images written with `set` instead of assembled.
  pub fn start(&mut self) {
    if self.state == State::Ready {
      self.state = State::Running;
    }
  }

  pub(crate) fn fail(&mut self, error: Error) {
    self.state = match error {
      Error::Parse(error)  => State::ParserError(error),
      Error::Memory(error) => State::MemoryError(error),
    };
  }

  /// The address of a label from the last assembly, by its full name, e.g. `loop.end`.
  pub fn find_label(&self, name: &str) -> Option<Word> {
    self.labels.resolve(name)
  }

  pub fn ip(&self) -> Word {
    self.ip
  }

  pub fn set_ip(&mut self, ip: Word) {
    self.ip = ip;
  }

  pub fn get(&self, address: Word) -> Word {
    self.memory.get(address)
  }

  /// Writes memory directly. A failed write puts the machine in the `MemoryError` state.
  pub fn set(&mut self, address: Word, value: Word) -> std::result::Result<(), MemoryError> {
    self.memory.set(address, value).map_err(|error| {
      self.state = State::MemoryError(error);
      error
    })
  }

  pub fn memory(&self) -> &Memory {
    &self.memory
  }

  pub fn state(&self) -> &State {
    &self.state
  }

  pub fn is_running(&self) -> bool {
    self.state == State::Running
  }

  pub fn pending_sleep(&self) -> Option<Instant> {
    self.pending_sleep
  }

  /// The full diagnostic text of an error state.
  pub fn diagnostic(&self) -> Option<String> {
    match &self.state {
      State::ParserError(error) => Some(error.to_string()),
      State::MemoryError(error) => Some(error.to_string()),
      _                         => None
    }
  }
}

impl Default for Machine {
  fn default() -> Machine {
    Machine::new()
  }
}

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl Display for Machine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let word_table    = Machine::make_word_table(&self.memory, self.ip, DUMP_WORDS, self.ip);
    let operand_table = self.make_operand_table();

    let mut combined_table = table!([word_table, operand_table]);

    combined_table.set_titles(row![ub->"Memory", ub->"Instruction"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    writeln!(f, "State : {} ({})", self.state, self.state.code())?;
    if let Some(diagnostic) = self.diagnostic() {
      write!(f, "{}", diagnostic)?;
    }
    write!(f, "IP    : {}\n{}", self.ip, combined_table)
  }
}
