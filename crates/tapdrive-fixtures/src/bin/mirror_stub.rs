//! Fixture: emulates the mirror process. Prints a banner on stderr, decodes
//! `LAEvent:` lines from stdin, echoes each decoded event on stdout, and
//! exits when its input closes.

// Test fixtures require special allowances - they are not production code
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

use std::io::{self, BufRead, Write};
use tapdrive::protocol;

fn main() -> io::Result<()> {
    eprintln!("mirror-stub: starting");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        match protocol::decode_line(&line) {
            Ok(event) => {
                writeln!(stdout, "{:?} ({}, {})", event.kind, event.x, event.y)?;
                stdout.flush()?;
            }
            Err(err) => eprintln!("mirror-stub: rejected line: {err}"),
        }
    }

    eprintln!("mirror-stub: input closed");
    Ok(())
}
