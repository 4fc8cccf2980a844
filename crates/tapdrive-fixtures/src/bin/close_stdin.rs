//! Fixture: reads exactly one line, echoes it, then exits so the harness
//! sees a broken input pipe mid-script.

#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

use std::io::{self, BufRead};

fn main() -> io::Result<()> {
    let stdin = io::stdin();
    let mut first = String::new();
    stdin.lock().read_line(&mut first)?;
    println!("got: {}", first.trim_end());
    Ok(())
}
