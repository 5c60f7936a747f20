/*!
  Executes instructions. Each instruction is three words `A B C` at the instruction pointer:

    ```text
    mem[A] = mem[A] - mem[B]
    if mem[A] <= mem[B] before the subtraction, jump to C
    ```

  When `B` is a trap address, the trap supplies the value instead of memory. When `A` is a trap
  address, the trap consumes the value and nothing branches. `run_steps` runs a fixed number of
  instructions; `Machine::run` in `scheduler` runs against the clock.
*/

use crate::host::{ticks_to_duration, Host};
use crate::machine::{Machine, State};
use crate::scheduler::wake_after;
use crate::trap::{is_reserved, Trap};
use crate::word::Word;

/// What an instruction asks of whoever is driving the machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Step {
  Continue,
  /// Suspend for this many ticks of the host's clock.
  Sleep(Word),
  /// The machine is no longer running.
  Stopped,
}

impl Machine {

  /// The value an instruction reads through its `B` operand.
  fn input<H: Host>(&self, host: &mut H, b: Word) -> Word {
    if !is_reserved(b) {
      return self.memory.get(b);
    }
    match Trap::from_address(b) {
      Some(Trap::ReadByte)  => Word::from(host.read_byte().unwrap_or(0) as u32),
      Some(Trap::Frequency) => host.frequency(),
      Some(Trap::Time)      => host.system_time(),
      _                     => Word::ZERO
    }
  }

  /// Executes one instruction.
  pub fn step<H: Host>(&mut self, host: &mut H) -> Step {
    if self.state != State::Running {
      return Step::Stopped;
    }

    let ip = self.ip;
    let a  = self.memory.get(ip);
    let b  = self.memory.get(ip + 1);
    let c  = self.memory.get(ip + 2);
    self.ip = ip + 3;

    let value = self.input(host, b);

    #[cfg(feature = "trace_computation")]
    println!("{:>20}: {:>20} {:>20} {:>20}  value = {}", ip, a, b, c, value);

    if !is_reserved(a) {
      let (result, branch) = self.memory.get(a).sub(value);
      if let Err(error) = self.memory.set(a, result) {
        self.state = State::MemoryError(error);
        return Step::Stopped;
      }
      if branch {
        self.ip = c;
      }
      return Step::Continue;
    }

    match Trap::from_address(a) {

      Some(Trap::Halt) => {
        self.state = State::Completed;
        Step::Stopped
      }

      Some(Trap::WriteByte) => {
        host.write_byte(value.low_byte());
        Step::Continue
      }

      Some(Trap::Sleep) => Step::Sleep(value),

      Some(Trap::Draw) => {
        if let Some(frame) = self.memory.frame(value) {
          host.draw(frame);
        }
        Step::Continue
      }

      // Input traps and unassigned reserved addresses absorb the write.
      _ => Step::Continue

    }
  }

  /**
    Runs at most `steps` instructions, or until the machine stops. Sleeps block through
    `Host::wait_until`, including one left pending by `run`. Returns the state the machine is left
    in.
  */
  pub fn run_steps<H: Host>(&mut self, host: &mut H, steps: u64) -> &State {
    if self.state == State::Running {
      if let Some(wake) = self.pending_sleep.take() {
        host.wait_until(wake);
      }
    }
    for _ in 0..steps {
      match self.step(host) {

        Step::Continue => {}

        Step::Sleep(ticks) => {
          let duration = ticks_to_duration(ticks, host.frequency());
          let wake     = wake_after(host.now(), duration);
          host.wait_until(wake);
        }

        Step::Stopped => break

      }
    }
    &self.state
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::MemoryError;
  use crate::host::BufferHost;
  use crate::machine::MachineConfig;
  use crate::memory::Frame;
  use crate::trap::TICKS_PER_SECOND;
  use std::time::{Duration, Instant};

  const HELLO_WORLD: &str = "
    loop: len  one  exit   # Decrement [len]. If [len]<=1, exit.
          0-2  txt  ?+1    # Print a letter.
          ?-2  neg  loop   # Increment letter pointer.

    exit: 0-1  0    0

    txt:  'H 'e 'l 'l 'o ', 32
          'W 'o 'r 'l 'd '!
    len:  len-txt+1
    neg:  0-1
    one:  1
  ";

  fn machine(source: &str) -> Machine {
    let mut machine = Machine::new();
    machine.assemble(source).unwrap();
    machine
  }

  #[test]
  fn hello_world() {
    let mut machine = machine(HELLO_WORLD);
    let mut host = BufferHost::new();
    assert_eq!(machine.run_steps(&mut host, 10_000), &State::Completed);
    assert_eq!(host.output, b"Hello, World!".to_vec());
  }

  #[test]
  fn branch_when_less_or_equal() {
    // mem[6] = 3, mem[7] = 5: 3 <= 5, so jump to 9.
    let mut machine = machine("6 7 9  0 0 0  3 5");
    let mut host = BufferHost::new();
    assert_eq!(machine.step(&mut host), Step::Continue);
    assert_eq!(machine.ip(), Word(9));
    assert_eq!(machine.get(Word(6)), Word::from(-2i64));
  }

  #[test]
  fn fall_through_when_greater() {
    let mut machine = machine("6 7 9  0 0 0  5 3");
    let mut host = BufferHost::new();
    machine.step(&mut host);
    assert_eq!(machine.ip(), Word(3));
    assert_eq!(machine.get(Word(6)), Word(2));
  }

  #[test]
  fn same_operand_always_branches() {
    let mut machine = machine("3 3 7  12");
    let mut host = BufferHost::new();
    machine.step(&mut host);
    assert_eq!(machine.ip(), Word(7));
    assert_eq!(machine.get(Word(3)), Word::ZERO);
  }

  #[test]
  fn unsigned_comparison() {
    // 0-1 is the largest value, so it is never <= 1.
    let mut machine = machine("6 7 9  0 0 0  0-1 1");
    let mut host = BufferHost::new();
    machine.step(&mut host);
    assert_eq!(machine.ip(), Word(3));
    assert_eq!(machine.get(Word(6)), Word::from(-2i64));
  }

  #[test]
  fn halt_completes() {
    let mut machine = machine("0-1 0 5");
    let mut host = BufferHost::new();
    assert_eq!(machine.step(&mut host), Step::Stopped);
    assert_eq!(machine.state(), &State::Completed);
    assert_eq!(machine.ip(), Word(3));
    assert_eq!(machine.step(&mut host), Step::Stopped);
  }

  #[test]
  fn write_byte_does_not_branch() {
    let mut machine = machine("0-2 c 9  0-1 0 0  c: 0x141");
    let mut host = BufferHost::new();
    machine.step(&mut host);
    assert_eq!(machine.ip(), Word(3));
    assert_eq!(host.output, vec![0x41]);
  }

  #[test]
  fn read_byte() {
    let mut machine = machine("x 0-3 ?+1  y 0-3 ?+1  0-1 0 0  x: 0 y: 0");
    let mut host = BufferHost::with_input(b"A");
    assert_eq!(machine.run_steps(&mut host, 100), &State::Completed);
    // Subtracting reads: x = 0 - 'A', y = 0 - 0 since input ran out.
    assert_eq!(machine.find_label("x").map(|x| machine.get(x)), Some(Word::from(-65i64)));
    assert_eq!(machine.find_label("y").map(|y| machine.get(y)), Some(Word::ZERO));
  }

  #[test]
  fn frequency_and_time() {
    let mut machine = machine("f 0-4 ?+1  t 0-5 ?+1  0-1 0 0  f: 0 t: 0");
    let mut host = BufferHost::new();
    machine.run_steps(&mut host, 100);
    let f = machine.find_label("f").map(|f| machine.get(f));
    assert_eq!(f, Some(Word::ZERO - Word(TICKS_PER_SECOND)));
    let t = machine.find_label("t").map(|t| machine.get(t)).unwrap();
    // Some time after 2020, in 32.32 fixed point.
    assert!((Word::ZERO - t).value() >> 32 > 1_577_836_800);
  }

  #[test]
  fn unknown_reserved_addresses_are_ignored() {
    let mut machine = machine("0-100 one 9  0x8000000000000000 one 9  0-1 0 0  one: 1");
    let mut host = BufferHost::new();
    assert_eq!(machine.run_steps(&mut host, 100), &State::Completed);
    assert_eq!(machine.ip(), Word(9));
  }

  #[test]
  fn reading_reserved_addresses() {
    // An output trap read as `B` is zero, so 1 - 0 > 0 and nothing branches.
    let mut machine = machine("one 0-1 9  0-1 0 0  one: 1");
    let mut host = BufferHost::new();
    machine.step(&mut host);
    assert_eq!(machine.ip(), Word(3));
    assert_eq!(machine.get(Word(6)), Word(1));
  }

  #[test]
  fn runtime_memory_error() {
    let config = MachineConfig { address_bits: 4, ..MachineConfig::default() };
    let mut machine = Machine::with_config(config);
    machine.assemble("100 one 0  one: 1").unwrap();
    let mut host = BufferHost::new();
    assert_eq!(
      machine.run_steps(&mut host, 10),
      &State::MemoryError(MemoryError { address: Word(100) })
    );
  }

  #[test]
  fn writing_zero_outside_memory_is_fine() {
    let config = MachineConfig { address_bits: 4, ..MachineConfig::default() };
    let mut machine = Machine::with_config(config);
    machine.assemble("100 100 3  0-1 0 0").unwrap();
    let mut host = BufferHost::new();
    assert_eq!(machine.run_steps(&mut host, 10), &State::Completed);
    assert_eq!(machine.memory().capacity(), 4);
  }

  #[test]
  fn ip_wraps_around() {
    // Operands come from MAX, 0 and 1: A = 0, B = 5, C = 0.
    let mut machine = Machine::new();
    machine.set(Word(0), Word(5)).unwrap();
    machine.start();
    machine.set_ip(Word::MAX);
    let mut host = BufferHost::new();
    machine.step(&mut host);
    assert_eq!(machine.ip(), Word(2));
    assert_eq!(machine.get(Word(0)), Word(5));
    assert_eq!(machine.state(), &State::Running);
  }

  #[test]
  fn ready_machine_does_not_run() {
    let mut machine = Machine::new();
    let mut host = BufferHost::new();
    assert_eq!(machine.step(&mut host), Step::Stopped);
    assert_eq!(machine.run_steps(&mut host, 10), &State::Ready);
  }

  #[test]
  fn sleep_blocks_in_run_steps() {
    // Sleep for 1/1000 s, print, halt.
    let mut machine = machine("0-6 t ?+1  0-2 c ?+1  0-1 0 0  t: 4294967  c: 'z");
    let mut host = BufferHost::new();
    let start = Instant::now();
    assert_eq!(machine.run_steps(&mut host, 10), &State::Completed);
    assert!(start.elapsed() >= Duration::from_micros(999));
    assert_eq!(host.output, b"z".to_vec());
  }

  struct DisplayHost {
    frames: Vec<(usize, usize, Vec<Word>)>,
  }

  impl Host for DisplayHost {
    fn write_byte(&mut self, _byte: u8) {}

    fn read_byte(&mut self) -> Option<u8> {
      None
    }

    fn now(&mut self) -> Instant {
      Instant::now()
    }

    fn draw(&mut self, frame: Frame<'_>) {
      self.frames.push((frame.width, frame.height, frame.pixels.to_vec()));
    }
  }

  #[test]
  fn draw_frame() {
    let source = "
      0-7 hdr  ?+1
      0-7 badp ?+1
      0-1 0 0
      hdr:  header
      badp: bad
      header: 2 1 pixels
      pixels: 0xff000000 0xffffffff
      bad: 70000 1 pixels
    ";
    let mut machine = machine(source);
    let mut host = DisplayHost { frames: Vec::new() };
    assert_eq!(machine.run_steps(&mut host, 10), &State::Completed);
    assert_eq!(
      host.frames,
      vec![(2, 1, vec![Word(0xff00_0000), Word(0xffff_ffff)])]
    );
  }
}
