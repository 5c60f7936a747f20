use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};

use clap::Parser;
use strum::IntoEnumIterator;

use sico::{Host, Machine, MachineConfig, StdHost, Trap, Yield};

/// Prints "Usage: sico file.sico" and halts.
const USAGE_PROGRAM: &str = "
  loop: len  ?     neg
        0-2  text  ?+1
        ?-2  neg   loop
  text: 85 115 97 103 101 58 32 115 105 99 111
        32 102 105 108 101 46 115 105 99 111 10
  neg:  0-1
  len:  len-text
";

#[derive(Parser, Debug)]
#[command(name = "sico")]
#[command(about = "Assembles and runs a SICO program", long_about = None)]
struct Args {
  /// Assembly source to run. Without one, prints usage.
  file: Option<PathBuf>,

  /// Milliseconds the machine runs between clock checks by the host loop
  #[arg(long, default_value_t = 15)]
  frame_ms: u64,

  /// Memory may grow to 2^address_bits words
  #[arg(long, default_value_t = sico::memory::DEFAULT_ADDRESS_BITS)]
  address_bits: u32,

  /// Print the machine state when the program stops
  #[arg(long)]
  dump: bool,

  /// List the trap addresses and exit
  #[arg(long)]
  traps: bool,
}

fn print_traps() {
  println!("{:<10} {:>7} {:>21}", "Trap", "Address", "Decimal");
  for trap in Trap::iter() {
    println!("{:<10} {:>7} {:>21}", trap.to_string(), format!("0-{}", trap.offset()), trap.address().value());
  }
}

/// Runs the machine to completion in frames of `frame`, sleeping through the program's sleeps.
fn run_frames<H: Host>(machine: &mut Machine, host: &mut H, frame: Duration) {
  let mut deadline = Instant::now() + frame;
  loop {
    match machine.run(host, deadline) {

      Yield::Stopped => break,

      Yield::Deadline => {
        deadline = Instant::now() + frame;
      }

      Yield::Sleeping(wake) => {
        host.wait_until(wake.min(deadline));
        let now = Instant::now();
        if now >= deadline {
          deadline = now + frame;
        }
      }

    }
  }
}

fn main() {
  let args = Args::parse();

  if args.traps {
    print_traps();
    return;
  }

  let config = MachineConfig { address_bits: args.address_bits, ..MachineConfig::default() };
  let mut machine = Machine::with_config(config);

  // The error is kept in the machine's state and reported below.
  let _ = match &args.file {
    Some(path) => machine.assemble_file(path),
    None       => machine.assemble(USAGE_PROGRAM)
  };

  let mut host = StdHost::new();
  run_frames(&mut machine, &mut host, Duration::from_millis(args.frame_ms.max(1)));

  if args.dump {
    println!("{}", machine);
  } else if let Some(diagnostic) = machine.diagnostic() {
    eprint!("{}", diagnostic);
  }

  process::exit(machine.state().code());
}


#[cfg(test)]
mod tests {
  use super::*;
  use sico::{BufferHost, State};

  #[test]
  fn usage_program() {
    let mut machine = Machine::new();
    machine.assemble(USAGE_PROGRAM).unwrap();
    let mut host = BufferHost::new();
    run_frames(&mut machine, &mut host, Duration::from_millis(15));
    assert_eq!(machine.state(), &State::Completed);
    assert_eq!(host.output_string(), "Usage: sico file.sico\n");
  }

  #[test]
  fn arguments() {
    let args = Args::parse_from(["sico", "--frame-ms", "5", "--dump", "demo.sico"]);
    assert_eq!(args.file, Some(PathBuf::from("demo.sico")));
    assert_eq!(args.frame_ms, 5);
    assert_eq!(args.address_bits, 32);
    assert!(args.dump);
    assert!(!args.traps);
  }
}
