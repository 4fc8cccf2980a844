//! Fixture: blocks SIGTERM, then lingers well past any bounded wait.
//! Tests use it to exercise the teardown-timeout path, where only the
//! SIGKILL safety net can reclaim the child.

#![allow(clippy::print_stderr)]

use std::io::{self, BufRead};
use std::time::Duration;

fn main() -> io::Result<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{SigSet, Signal};
        let mut mask = SigSet::empty();
        mask.add(Signal::SIGTERM);
        mask.thread_block().map_err(io::Error::from)?;
    }
    eprintln!("ignore-term: ready");

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let _ = line?;
    }
    // Input closed; outlive any reasonable bounded wait.
    std::thread::sleep(Duration::from_secs(600));
    Ok(())
}
