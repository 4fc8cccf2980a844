//! Fixture programs and helpers for tapdrive integration tests.
//!
//! The binaries stand in for the real mirror process:
//!
//! - `tapdrive-mirror-stub` - parses `LAEvent:` lines, echoes decoded events
//!   on stdout, logs on stderr, exits on end-of-input.
//! - `tapdrive-close-stdin` - exits after the first line, exercising the
//!   broken-pipe recovery path.
//! - `tapdrive-spawn-helper` - spawns a long-lived helper child and prints
//!   its pid, so tests can verify group-wide teardown.
//! - `tapdrive-ignore-term` - blocks SIGTERM and lingers, so tests can
//!   verify the bounded-wait timeout and the SIGKILL safety net.

// Test fixtures crate - relaxed lints for test utilities
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

use std::path::PathBuf;

/// Resolve a sibling fixture binary from a `CARGO_BIN_EXE_*` path.
///
/// Cargo places every workspace binary in the same directory, so tests in
/// this crate can locate the harness-facing fixtures from their own
/// `CARGO_BIN_EXE` values.
pub fn sibling_binary(own_bin: &str, name: &str) -> PathBuf {
    let dir = PathBuf::from(own_bin)
        .parent()
        .expect("binary path has a parent")
        .to_path_buf();
    dir.join(name)
}
