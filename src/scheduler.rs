/*!
  Runs a machine cooperatively against a deadline, for hosts that own their own loop, such as a
  display refreshing every frame.

  `run` executes until the machine stops, the deadline passes, or the program sleeps for longer
  than the host should be blocked. The clock is checked every `check_interval` instructions, so a
  run may pass its deadline by that many instructions. Short sleeps are waited out in place. A
  longer sleep is recorded as `pending_sleep` and `run` returns; the next `run` resumes with the
  instruction after the sleep once the wake time has come.
*/

use std::time::{Duration, Instant};

use crate::executor::Step;
use crate::host::{ticks_to_duration, Host};
use crate::machine::Machine;

/// Why `run` returned.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Yield {
  /// The machine is not running: it completed, failed, or was never started.
  Stopped,
  /// The deadline passed.
  Deadline,
  /// The program is asleep until the given time.
  Sleeping(Instant),
}

/// `now + duration`, saturating at a time far enough away to mean "never".
pub fn wake_after(now: Instant, duration: Duration) -> Instant {
  now.checked_add(duration)
     .or_else(|| now.checked_add(Duration::from_secs(u32::MAX as u64)))
     .unwrap_or(now)
}

impl Machine {

  /// Runs until the machine stops, `deadline` passes, or the program sleeps past what can be waited
  /// out in place.
  pub fn run<H: Host>(&mut self, host: &mut H, deadline: Instant) -> Yield {
    if !self.is_running() {
      return Yield::Stopped;
    }

    if let Some(wake) = self.pending_sleep {
      if wake >= deadline {
        return Yield::Sleeping(wake);
      }
      let now = host.now();
      if wake > now && wake - now > self.config().busy_wait {
        return Yield::Sleeping(wake);
      }
      host.wait_until(wake);
      self.pending_sleep = None;
    }

    let check_interval = self.config().check_interval.max(1);
    let busy_wait      = self.config().busy_wait;
    let mut until_check = 0;

    loop {
      if until_check == 0 {
        if host.now() >= deadline {
          return Yield::Deadline;
        }
        until_check = check_interval;
      }
      until_check -= 1;

      match self.step(host) {

        Step::Continue => {}

        Step::Stopped => return Yield::Stopped,

        Step::Sleep(ticks) => {
          let duration = ticks_to_duration(ticks, host.frequency());
          let wake     = wake_after(host.now(), duration);
          if duration > busy_wait || wake >= deadline {
            self.pending_sleep = Some(wake);
            return Yield::Sleeping(wake);
          }
          host.wait_until(wake);
          until_check = 0;
        }

      }
    }
  }
}
