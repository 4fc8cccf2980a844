// Test module - relaxed lint rules
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::cast_possible_wrap)]
#![allow(missing_docs)]
#![cfg(unix)]

//! Supervisor runs against the fixture binaries, which behave closer to the
//! real mirror process than `/bin/cat`: they parse the protocol, talk on
//! both output channels, and spawn descendants.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tapdrive::model::{GestureScript, LaunchConfig, Phase};
use tapdrive::relay::{LineSink, MemorySink};
use tapdrive::runner::{self, codes, HarnessConfig, NoopObserver};

fn fixture_config(name: &str, script: GestureScript) -> HarnessConfig {
    let bin = tapdrive_fixtures::sibling_binary(env!("CARGO_BIN_EXE_tapdrive-mirror-stub"), name);
    HarnessConfig {
        launch: LaunchConfig {
            command: bin.display().to_string(),
            ..LaunchConfig::default()
        },
        script,
        ..HarnessConfig::default()
    }
}

fn fast_script(moves: u32) -> GestureScript {
    GestureScript {
        moves,
        pacing_ms: 1,
        warmup_ms: 0,
        // Long enough for the fixture to echo everything before teardown.
        settle_ms: 300,
        ..GestureScript::default()
    }
}

fn pid_alive(pid: u32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}

#[test]
fn mirror_stub_decodes_the_full_sequence() {
    let sink = Arc::new(MemorySink::new());
    let config = fixture_config("tapdrive-mirror-stub", fast_script(10));
    let report = runner::run(&config, Arc::clone(&sink) as Arc<dyn LineSink>).unwrap();

    assert_eq!(report.phase, Phase::Joined);
    assert_eq!(report.lines_written, 12);
    assert!(!report.channel_closed);

    let decoded = sink.lines_for("STDOUT");
    assert_eq!(decoded.len(), 12);
    assert_eq!(decoded[0], "Down (500, 1200)");
    assert_eq!(decoded[1], "Move (450, 1200)");
    assert_eq!(decoded[11], "Up (0, 1200)");

    let stderr = sink.lines_for("STDERR");
    assert!(stderr.contains(&"mirror-stub: starting".to_string()));
}

#[test]
fn close_stdin_fixture_triggers_channel_recovery() {
    let sink = Arc::new(MemorySink::new());
    let script = GestureScript {
        // Slow pacing so the pipe is observed broken before the script ends.
        pacing_ms: 50,
        warmup_ms: 0,
        settle_ms: 100,
        ..GestureScript::default()
    };
    let config = fixture_config("tapdrive-close-stdin", script);
    let report = runner::run(&config, Arc::clone(&sink) as Arc<dyn LineSink>).unwrap();

    assert_eq!(report.phase, Phase::Joined);
    assert!(report.channel_closed);
    assert!(report.lines_written < 12);
    let error = report.error.expect("channel closure is recorded");
    assert_eq!(error.code, codes::CHANNEL);

    let echoed = sink.lines_for("STDOUT");
    assert_eq!(echoed.len(), 1);
    assert!(echoed[0].starts_with("got: LAEvent:"));
}

#[test]
fn group_teardown_reaps_spawned_descendants() {
    let sink = Arc::new(MemorySink::new());
    let config = fixture_config("tapdrive-spawn-helper", fast_script(2));
    let report = runner::run(&config, Arc::clone(&sink) as Arc<dyn LineSink>).unwrap();

    assert_eq!(report.phase, Phase::Joined);
    let helper_pid = sink
        .lines_for("STDOUT")
        .iter()
        .find_map(|line| line.strip_prefix("helper-pid: ").map(str::to_string))
        .expect("fixture prints its helper pid")
        .parse::<u32>()
        .unwrap();

    // SIGTERM delivery to the group is asynchronous; give it a moment.
    for _ in 0..50 {
        if !pid_alive(helper_pid) {
            return;
        }
        thread::sleep(Duration::from_millis(100));
    }
    // Do not leave the helper behind even when the assertion fails.
    let _ = nix::sys::signal::kill(
        nix::unistd::Pid::from_raw(helper_pid as i32),
        nix::sys::signal::Signal::SIGKILL,
    );
    panic!("helper {helper_pid} survived group teardown");
}

#[test]
fn sigterm_immune_child_flags_teardown_timeout() {
    let sink = Arc::new(MemorySink::new());
    let mut config = fixture_config("tapdrive-ignore-term", fast_script(0));
    // Short bounded wait; the fixture never honors SIGTERM anyway.
    config.teardown_timeout_ms = 300;
    let report = runner::run(&config, Arc::clone(&sink) as Arc<dyn LineSink>).unwrap();

    assert_eq!(report.phase, Phase::Joined);
    assert!(report.teardown_timed_out, "SIGTERM is blocked by the fixture");
    assert!(
        report.exit_status.is_none(),
        "an unreaped child has no exit status"
    );
    // The session's final cleanup escalates to SIGKILL, so the child is
    // still gone once the report is produced.
    assert!(!pid_alive(report.pid));
}

#[test]
fn interrupt_during_warmup_skips_the_script() {
    let sink = Arc::new(MemorySink::new());
    let script = GestureScript {
        warmup_ms: 10_000,
        ..GestureScript::default()
    };
    let config = fixture_config("tapdrive-mirror-stub", script);
    let interrupt = Arc::new(AtomicBool::new(true));
    let report = runner::run_with(
        &config,
        Arc::clone(&sink) as Arc<dyn LineSink>,
        interrupt,
        Arc::new(NoopObserver),
    )
    .unwrap();

    assert_eq!(report.phase, Phase::Joined);
    assert!(report.interrupted);
    assert_eq!(report.lines_written, 0);
    assert!(sink.lines_for("STDOUT").is_empty());
}
