/*!
  The machine's view of the outside world. Traps that read or write something other than memory
  go through a `Host`: the output byte sink, the input byte source, the clock, and the display.

  `StdHost` connects a machine to the process's stdin and stdout. `BufferHost` keeps both streams
  in memory, which is what embedders and tests want.
*/

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::memory::Frame;
use crate::trap::TICKS_PER_SECOND;
use crate::word::{Word, WordType};

const NANOS_PER_SECOND: u128 = 1_000_000_000;

pub trait Host {
  fn write_byte(&mut self, byte: u8);

  /// The next input byte, or `None` if no input is available right now. Must not block.
  fn read_byte(&mut self) -> Option<u8>;

  /// A monotonic clock. Deadlines and sleeps are measured against it.
  fn now(&mut self) -> Instant;

  /// Ticks per second of `system_time`.
  fn frequency(&self) -> Word {
    Word(TICKS_PER_SECOND)
  }

  /// Wall clock time in ticks.
  fn system_time(&mut self) -> Word {
    ticks_since_epoch(SystemTime::now())
  }

  /// Blocks until `now()` reaches `wake`.
  fn wait_until(&mut self, wake: Instant) {
    while self.now() < wake {
      std::hint::spin_loop();
    }
  }

  /// Presents a frame. Hosts without a display ignore it.
  fn draw(&mut self, _frame: Frame<'_>) {}
}

/// Converts a wall clock time to seconds since the Unix epoch in 32.32 fixed point.
pub fn ticks_since_epoch(time: SystemTime) -> Word {
  let since = time.duration_since(UNIX_EPOCH).unwrap_or_default();
  let whole    = since.as_secs() << 32;
  let fraction = ((since.subsec_nanos() as u128) << 32) / NANOS_PER_SECOND;
  Word(whole.wrapping_add(fraction as WordType))
}

/// Converts a tick count at the given frequency to a duration. A zero frequency is read as the
/// default one.
pub fn ticks_to_duration(ticks: Word, frequency: Word) -> Duration {
  let frequency = match frequency.value() {
    0 => TICKS_PER_SECOND,
    f => f
  };
  let seconds   = ticks.value() / frequency;
  let remainder = ticks.value() % frequency;
  let nanos     = (remainder as u128 * NANOS_PER_SECOND) / frequency as u128;
  Duration::new(seconds, nanos as u32)
}


/// Connects a machine to the process's standard streams.
pub struct StdHost {
  input: Option<Receiver<u8>>,
}

impl StdHost {
  pub fn new() -> StdHost {
    StdHost { input: None }
  }

  /// Stdin is read on its own thread so that an empty stdin never stalls the machine.
  fn input(&mut self) -> &Receiver<u8> {
    self.input.get_or_insert_with(|| {
      let (sender, receiver) = mpsc::channel();
      thread::spawn(move || {
        for byte in io::stdin().lock().bytes() {
          match byte {
            Ok(byte) => {
              if sender.send(byte).is_err() {
                break;
              }
            }
            Err(_) => break
          }
        }
      });
      receiver
    })
  }
}

impl Default for StdHost {
  fn default() -> StdHost {
    StdHost::new()
  }
}

impl Host for StdHost {
  fn write_byte(&mut self, byte: u8) {
    let mut out = io::stdout();
    // A closed stdout has nowhere to report to.
    let _ = out.write_all(&[byte]).and_then(|_| out.flush());
  }

  fn read_byte(&mut self) -> Option<u8> {
    self.input().try_recv().ok()
  }

  fn now(&mut self) -> Instant {
    Instant::now()
  }

  fn wait_until(&mut self, wake: Instant) {
    let now = Instant::now();
    if wake > now {
      thread::sleep(wake - now);
    }
  }
}


/// A host whose input and output are in-memory buffers, with the real clock.
#[derive(Clone, Debug, Default)]
pub struct BufferHost {
  pub input  : VecDeque<u8>,
  pub output : Vec<u8>,
}

impl BufferHost {
  pub fn new() -> BufferHost {
    BufferHost::default()
  }

  pub fn with_input(input: &[u8]) -> BufferHost {
    BufferHost {
      input  : input.iter().copied().collect(),
      output : Vec::new(),
    }
  }

  pub fn output_string(&self) -> String {
    String::from_utf8_lossy(&self.output).into_owned()
  }
}

impl Host for BufferHost {
  fn write_byte(&mut self, byte: u8) {
    self.output.push(byte);
  }

  fn read_byte(&mut self) -> Option<u8> {
    self.input.pop_front()
  }

  fn now(&mut self) -> Instant {
    Instant::now()
  }
}
