//! Fixture: spawns a long-lived helper child (inheriting this process's
//! group), prints the helper's pid, then drains stdin until end-of-input.
//! Tests use the printed pid to verify that group-wide teardown also
//! terminates descendants.

#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]
// The helper is reaped by the harness's group signal, never by this process.
#![allow(unknown_lints)]
#![allow(clippy::zombie_processes)]

use std::io::{self, BufRead, Write};
use std::process::{Command, Stdio};

fn main() -> io::Result<()> {
    let helper = Command::new("/bin/sleep")
        .arg("300")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    println!("helper-pid: {}", helper.id());
    io::stdout().flush()?;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let _ = line?;
    }
    eprintln!("spawn-helper: input closed");
    Ok(())
}
