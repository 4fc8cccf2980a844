//! The supervisor state machine driving one harness run.
//!
//! One controlling thread walks `Idle → Launching → Warming → Scripting →
//! Settling → Terminating → Joined` while two relay threads drain the
//! child's output channels. Every path through the script phases, including
//! a broken stdin pipe and an operator interrupt, funnels into the same
//! teardown: SIGTERM to the process group, a bounded wait for exit, then
//! joining both relays. Teardown executes exactly once per run.

use crate::model::{
    ErrorInfo, ExitStatus, GestureEvent, GestureScript, LaunchConfig, Phase, RunId, RunReport,
};
use crate::protocol;
use crate::relay::{LineSink, Relay};
use crate::session::Session;
use miette::Diagnostic;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Label relayed stdout lines carry.
pub const STDOUT_LABEL: &str = "STDOUT";
/// Label relayed stderr lines carry.
pub const STDERR_LABEL: &str = "STDERR";

/// Default bounded wait for the child to exit after the group is signaled.
pub const DEFAULT_TEARDOWN_TIMEOUT_MS: u64 = 5000;
/// Slice size for interruptible sleeps; bounds interrupt latency.
const PAUSE_SLICE: Duration = Duration::from_millis(25);

pub type HarnessResult<T> = Result<T, HarnessError>;

/// Stable error codes carried by [`HarnessError`]; the CLI maps them to
/// process exit codes.
pub mod codes {
    pub const LAUNCH: &str = "E_LAUNCH";
    pub const CHANNEL: &str = "E_CHANNEL";
    pub const PROTOCOL: &str = "E_PROTOCOL";
    pub const IO: &str = "E_IO";
    pub const INTERNAL: &str = "E_INTERNAL";
}

#[derive(Debug)]
pub struct HarnessError {
    pub code: &'static str,
    pub message: String,
    pub context: Option<Value>,
}

impl HarnessError {
    pub fn launch(command: &str, err: impl fmt::Display) -> Self {
        Self {
            code: codes::LAUNCH,
            message: format!("failed to spawn '{command}'"),
            context: Some(serde_json::json!({ "command": command, "source": err.to_string() })),
        }
    }

    pub fn channel_closed(message: impl Into<String>) -> Self {
        Self {
            code: codes::CHANNEL,
            message: message.into(),
            context: None,
        }
    }

    /// Classify a stdin write failure: a broken pipe means the child closed
    /// its input or exited, anything else is a plain I/O error.
    pub fn from_stdin_write(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::BrokenPipe {
            Self {
                code: codes::CHANNEL,
                message: "input channel closed by the child".to_string(),
                context: Some(serde_json::json!({ "source": err.to_string() })),
            }
        } else {
            Self::io("failed to write to input channel", err)
        }
    }

    pub fn protocol(message: impl Into<String>, err: impl fmt::Display) -> Self {
        Self {
            code: codes::PROTOCOL,
            message: message.into(),
            context: Some(serde_json::json!({ "source": err.to_string() })),
        }
    }

    pub fn protocol_msg(message: impl Into<String>) -> Self {
        Self {
            code: codes::PROTOCOL,
            message: message.into(),
            context: None,
        }
    }

    pub fn io(message: impl Into<String>, err: impl fmt::Display) -> Self {
        Self {
            code: codes::IO,
            message: message.into(),
            context: Some(serde_json::json!({ "source": err.to_string() })),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: codes::INTERNAL,
            message: message.into(),
            context: None,
        }
    }

    #[must_use]
    pub fn is_channel_closed(&self) -> bool {
        self.code == codes::CHANNEL
    }

    #[must_use]
    pub fn to_error_info(&self) -> ErrorInfo {
        ErrorInfo {
            code: self.code.to_string(),
            message: self.message.clone(),
            context: self.context.clone(),
        }
    }
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for HarnessError {}

impl Diagnostic for HarnessError {}

/// Callback surface for phase transitions and sent events. The CLI hangs
/// its progress output here; library callers usually use [`NoopObserver`].
pub trait RunObserver: Send + Sync {
    fn on_phase(&self, _phase: Phase) {}
    fn on_event_sent(&self, _event: &GestureEvent, _line: &str) {}
}

/// Observer that does nothing.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Everything one harness run needs: how to launch and what to script.
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    pub launch: LaunchConfig,
    pub script: GestureScript,
    /// Bounded wait for the child to exit after the group is signaled.
    pub teardown_timeout_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            launch: LaunchConfig::default(),
            script: GestureScript::default(),
            teardown_timeout_ms: DEFAULT_TEARDOWN_TIMEOUT_MS,
        }
    }
}

/// Run the harness with a console-free default observer and no interrupt
/// source. See [`run_with`].
pub fn run(config: &HarnessConfig, sink: Arc<dyn LineSink>) -> HarnessResult<RunReport> {
    run_with(
        config,
        sink,
        Arc::new(AtomicBool::new(false)),
        Arc::new(NoopObserver),
    )
}

/// Run the full harness state machine.
///
/// `interrupt` is the operator-stop flag; raising it at any suspension point
/// routes the run into teardown instead of leaving orphans. The returned
/// report always has phase `Joined`; recovered conditions (channel closure,
/// interrupt) are flags on the report, not errors.
///
/// # Errors
/// `E_LAUNCH` if the child cannot be spawned; `E_PROTOCOL`/`E_IO` for fatal
/// failures during the run. Teardown has already completed when an error is
/// returned.
pub fn run_with(
    config: &HarnessConfig,
    sink: Arc<dyn LineSink>,
    interrupt: Arc<AtomicBool>,
    observer: Arc<dyn RunObserver>,
) -> HarnessResult<RunReport> {
    let run_id = RunId::new();
    let started = Instant::now();
    let mut phase = Phase::Idle;

    enter(&mut phase, Phase::Launching, observer.as_ref());
    let mut session = match Session::spawn(&config.launch) {
        Ok(session) => session,
        Err(err) => {
            enter(&mut phase, Phase::Joined, observer.as_ref());
            return Err(err);
        }
    };
    let pid = session.pid();
    info!(%run_id, pid, command = %config.launch.command, "mirror process started");

    let mut relays = None;
    let mut outcome = match attach_relays(&mut session, &sink) {
        Ok(pair) => {
            relays = Some(pair);
            drive(
                &mut session,
                &config.script,
                &interrupt,
                observer.as_ref(),
                &mut phase,
            )
        }
        Err(err) => ScriptOutcome::fatal(err),
    };

    enter(&mut phase, Phase::Terminating, observer.as_ref());
    let shutdown = teardown(session, relays, config.teardown_timeout_ms);
    enter(&mut phase, Phase::Joined, observer.as_ref());

    if let Some(err) = outcome.fatal.take() {
        return Err(err);
    }

    let error = outcome
        .channel_error
        .as_ref()
        .map(HarnessError::to_error_info);
    Ok(RunReport {
        run_id,
        phase,
        pid,
        lines_written: outcome.lines_written,
        stdout_lines: shutdown.stdout_lines,
        stderr_lines: shutdown.stderr_lines,
        interrupted: outcome.interrupted,
        channel_closed: outcome.channel_error.is_some(),
        teardown_timed_out: shutdown.timed_out,
        exit_status: shutdown.exit_status,
        duration_ms: elapsed_ms(&started),
        error,
    })
}

#[derive(Default)]
struct ScriptOutcome {
    lines_written: u64,
    interrupted: bool,
    channel_error: Option<HarnessError>,
    fatal: Option<HarnessError>,
}

impl ScriptOutcome {
    fn fatal(err: HarnessError) -> Self {
        Self {
            fatal: Some(err),
            ..Self::default()
        }
    }
}

struct Shutdown {
    exit_status: Option<ExitStatus>,
    timed_out: bool,
    stdout_lines: u64,
    stderr_lines: u64,
}

fn attach_relays(
    session: &mut Session,
    sink: &Arc<dyn LineSink>,
) -> HarnessResult<(Relay, Relay)> {
    let stdout = session
        .take_stdout()
        .ok_or_else(|| HarnessError::internal("stdout channel missing after spawn"))?;
    let stderr = session
        .take_stderr()
        .ok_or_else(|| HarnessError::internal("stderr channel missing after spawn"))?;
    let out = Relay::spawn(stdout, STDOUT_LABEL, Arc::clone(sink))?;
    let err = Relay::spawn(stderr, STDERR_LABEL, Arc::clone(sink))?;
    Ok((out, err))
}

/// Warm-up, scripted writes, and settle. Returns instead of erroring for the
/// recovered conditions; teardown is the caller's unconditional next step.
fn drive(
    session: &mut Session,
    script: &GestureScript,
    interrupt: &AtomicBool,
    observer: &dyn RunObserver,
    phase: &mut Phase,
) -> ScriptOutcome {
    let mut outcome = ScriptOutcome::default();

    enter(phase, Phase::Warming, observer);
    if !pause(script.warmup_ms, interrupt) {
        info!("interrupted during warm-up");
        outcome.interrupted = true;
        return outcome;
    }

    enter(phase, Phase::Scripting, observer);
    let events = script.events();
    let last = events.len().saturating_sub(1);
    for (index, event) in events.into_iter().enumerate() {
        if interrupt.load(Ordering::SeqCst) {
            info!("interrupted during script");
            outcome.interrupted = true;
            return outcome;
        }
        let line = match protocol::encode_line(&event) {
            Ok(line) => line,
            Err(err) => {
                outcome.fatal = Some(err);
                return outcome;
            }
        };
        match session.write_line(&line) {
            Ok(()) => {
                outcome.lines_written += 1;
                debug!(line = line.trim_end(), "sent");
                observer.on_event_sent(&event, line.trim_end());
            }
            Err(err) if err.is_channel_closed() => {
                info!(%err, "input channel closed; aborting remaining script");
                outcome.channel_error = Some(err);
                return outcome;
            }
            Err(err) => {
                outcome.fatal = Some(err);
                return outcome;
            }
        }
        // No pacing after the final Up; the settle delay follows it.
        if index < last && !pause(script.pacing_ms, interrupt) {
            info!("interrupted during script");
            outcome.interrupted = true;
            return outcome;
        }
    }

    enter(phase, Phase::Settling, observer);
    if !pause(script.settle_ms, interrupt) {
        info!("interrupted during settle");
        outcome.interrupted = true;
    }
    outcome
}

/// The guaranteed teardown path: signal the whole group, wait bounded for
/// exit, release the session, then join both relays. A wait timeout is
/// logged, not escalated to a harder kill.
fn teardown(mut session: Session, relays: Option<(Relay, Relay)>, timeout_ms: u64) -> Shutdown {
    if let Err(err) = session.signal_group_term() {
        warn!(%err, "failed to signal process group");
    }
    let mut timed_out = false;
    let exit_status = match session.wait_for_exit(Duration::from_millis(timeout_ms)) {
        Ok(Some(status)) => Some(convert_exit(status)),
        Ok(None) => {
            warn!(
                timeout_ms,
                "child did not exit within the bounded wait after SIGTERM"
            );
            timed_out = true;
            None
        }
        Err(err) => {
            warn!(%err, "failed to reap child");
            None
        }
    };

    // Dropping the session closes our stdin handle and, if the child somehow
    // survived the group signal, runs the best-effort cleanup so the relays
    // below cannot block forever on a still-open pipe.
    drop(session);

    let (stdout_lines, stderr_lines) = match relays {
        Some((out, err)) => (join_relay(out), join_relay(err)),
        None => (0, 0),
    };
    Shutdown {
        exit_status,
        timed_out,
        stdout_lines,
        stderr_lines,
    }
}

fn join_relay(relay: Relay) -> u64 {
    let label = relay.label();
    match relay.join() {
        Ok(forwarded) => {
            debug!(label, forwarded, "relay joined");
            forwarded
        }
        Err(err) => {
            warn!(label, %err, "relay finished with an error");
            0
        }
    }
}

fn enter(phase: &mut Phase, next: Phase, observer: &dyn RunObserver) {
    *phase = next;
    debug!(phase = ?next, "phase transition");
    observer.on_phase(next);
}

/// Sleep in small slices so an interrupt is observed promptly. Returns
/// `false` if the interrupt flag was raised before the full wait elapsed.
fn pause(duration_ms: u64, interrupt: &AtomicBool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(duration_ms);
    loop {
        if interrupt.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep(deadline.saturating_duration_since(now).min(PAUSE_SLICE));
    }
}

fn convert_exit(status: std::process::ExitStatus) -> ExitStatus {
    #[cfg(unix)]
    let signal = std::os::unix::process::ExitStatusExt::signal(&status);
    #[cfg(not(unix))]
    let signal = None;
    ExitStatus {
        success: status.success(),
        code: status.code(),
        signal,
    }
}

fn elapsed_ms(started_at: &Instant) -> u64 {
    // Elapsed time is always well under u64::MAX
    #[allow(clippy::cast_possible_truncation)]
    let value = started_at.elapsed().as_millis() as u64;
    value
}
