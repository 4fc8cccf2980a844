//! Run outcome types emitted by the supervisor.

use crate::model::RunId;
use serde::{Deserialize, Serialize};

/// Supervisor states, in transition order. `Joined` is terminal; success and
/// failure converge there.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Launching,
    Warming,
    Scripting,
    Settling,
    Terminating,
    Joined,
}

/// How the mirror process exited, if it was reaped in time.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ExitStatus {
    pub success: bool,
    pub code: Option<i32>,
    /// Signal that terminated the child, on unix.
    pub signal: Option<i32>,
}

/// Serializable projection of a harness error.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    pub context: Option<serde_json::Value>,
}

/// Summary of one harness run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    /// Final phase reached; always `Joined` for a report that was produced.
    pub phase: Phase,
    /// Process id of the spawned child.
    pub pid: u32,
    /// Protocol lines written to the child's stdin.
    pub lines_written: u64,
    /// Lines relayed from each output channel.
    pub stdout_lines: u64,
    pub stderr_lines: u64,
    /// The operator interrupted the run; teardown still completed.
    pub interrupted: bool,
    /// The child's stdin closed mid-script; remaining writes were aborted.
    pub channel_closed: bool,
    /// The child did not exit within the bounded wait after SIGTERM.
    pub teardown_timed_out: bool,
    pub exit_status: Option<ExitStatus>,
    pub duration_ms: u64,
    /// Informational error recorded for a recovered condition.
    pub error: Option<ErrorInfo>,
}
