/*!
  SICO, a single instruction computer. Its one instruction, `A B C`, subtracts `mem[B]` from
  `mem[A]` and jumps to `C` if `mem[A]` was less than or equal to `mem[B]`. Every value and address
  is a 64 bit word, and arithmetic wraps around.

  Programs are written in a small assembly language, assembled into memory with
  `Machine::assemble`, and run with `Machine::run_steps` or, against a deadline,
  `Machine::run`. Input, output, and time come from a `Host`.
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod assembler;
pub mod error;
pub mod executor;
pub mod host;
pub mod label;
pub mod machine;
pub mod memory;
pub mod scheduler;
pub mod trap;
pub mod word;

pub use crate::error::{Error, MemoryError, ParseError, ParseErrorKind, Result};
pub use crate::executor::Step;
pub use crate::host::{BufferHost, Host, StdHost};
pub use crate::machine::{Machine, MachineConfig, State};
pub use crate::scheduler::Yield;
pub use crate::trap::Trap;
pub use crate::word::Word;
