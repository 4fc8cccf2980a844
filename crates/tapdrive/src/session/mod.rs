//! Mirror process lifecycle: spawn, stdin writes, group signaling, reaping.
//!
//! Exactly one [`Session`] exists per harness run. The supervisor owns it
//! for its entire lifetime; it is destroyed only after confirmed termination
//! and relay completion. Dropping a session performs best-effort cleanup
//! (SIGTERM to the group, short wait, SIGKILL) so no child outlives it even
//! on an unexpected exit path.

use crate::model::LaunchConfig;
use crate::runner::HarnessError;
#[cfg(unix)]
use nix::sys::signal::{killpg, Signal};
#[cfg(unix)]
use nix::unistd::Pid;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);
const DROP_GRACE: Duration = Duration::from_millis(100);

/// Handle to the live mirror process.
#[derive(Debug)]
pub struct Session {
    child: Child,
    stdin: Option<ChildStdin>,
    pid: u32,
}

impl Session {
    /// Spawn the mirror process with piped channels and, on unix, a fresh
    /// process group rooted at the child so the whole tree can be signaled
    /// together.
    ///
    /// # Errors
    /// Returns `E_LAUNCH` if the executable is missing or unspawnable.
    pub fn spawn(config: &LaunchConfig) -> Result<Self, HarnessError> {
        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &config.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in config.env_overrides() {
            command.env(key, value);
        }
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|err| HarnessError::launch(&config.command, err))?;
        let pid = child.id();
        let stdin = child.stdin.take();
        Ok(Self { child, stdin, pid })
    }

    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Hand the stdout pipe to its relay. Each output channel has exactly
    /// one reader.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Hand the stderr pipe to its relay.
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Write one protocol line to the child's stdin and flush immediately so
    /// the child observes the complete line promptly.
    ///
    /// # Errors
    /// `E_CHANNEL` if the child closed its input (broken pipe), `E_IO` for
    /// any other write failure.
    pub fn write_line(&mut self, line: &str) -> Result<(), HarnessError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| HarnessError::channel_closed("input channel already closed"))?;
        stdin
            .write_all(line.as_bytes())
            .map_err(HarnessError::from_stdin_write)?;
        stdin.flush().map_err(HarnessError::from_stdin_write)
    }

    /// Deliver SIGTERM to the entire process group, not just the immediate
    /// child, so helper processes the mirror spawned are terminated too.
    /// A group that is already gone is not an error.
    pub fn signal_group_term(&mut self) -> Result<(), HarnessError> {
        #[cfg(unix)]
        {
            signal_group(self.pgid(), Signal::SIGTERM)
        }
        #[cfg(not(unix))]
        {
            self.child
                .kill()
                .map_err(|err| HarnessError::io("failed to kill child", err))
        }
    }

    /// Poll for the child's exit status up to `timeout`. Returns `None` if
    /// the child is still running when the deadline passes.
    pub fn wait_for_exit(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<std::process::ExitStatus>, HarnessError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => return Ok(Some(status)),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        return Ok(None);
                    }
                    std::thread::sleep(EXIT_POLL_INTERVAL);
                }
                Err(err) => {
                    return Err(HarnessError::io("failed to wait for child", err));
                }
            }
        }
    }

    #[cfg(unix)]
    fn pgid(&self) -> Pid {
        // Process IDs are always positive and fit in i32
        #[allow(clippy::cast_possible_wrap)]
        Pid::from_raw(self.pid as i32)
    }

    /// Best-effort cleanup used by Drop. Errors are ignored; for controlled
    /// termination with error handling the supervisor signals and reaps the
    /// session before dropping it.
    fn cleanup_best_effort(&mut self) {
        if self.child.try_wait().ok().flatten().is_some() {
            return;
        }

        #[cfg(unix)]
        {
            let _ = signal_group(self.pgid(), Signal::SIGTERM);
            let deadline = Instant::now() + DROP_GRACE;
            while Instant::now() < deadline {
                if self.child.try_wait().ok().flatten().is_some() {
                    return;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            let _ = signal_group(self.pgid(), Signal::SIGKILL);
            let _ = self.child.wait();
        }

        #[cfg(not(unix))]
        {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cleanup_best_effort();
    }
}

#[cfg(unix)]
fn signal_group(pgid: Pid, signal: Signal) -> Result<(), HarnessError> {
    match killpg(pgid, signal) {
        // ESRCH means the group is already gone, which is fine
        Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(err) => Err(HarnessError::io("failed to signal process group", err)),
    }
}
