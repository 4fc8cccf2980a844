//! Resolved launch parameters for the external mirror process.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment key forcing unbuffered output from the launched program.
pub const UNBUFFERED_ENV: &str = "PYTHONUNBUFFERED";
/// Environment key the mirror process uses to locate its window icon.
pub const ICON_PATH_ENV: &str = "SCRCPY_ICON_PATH";
/// Environment key the mirror process uses to locate its device-side server.
pub const SERVER_PATH_ENV: &str = "SCRCPY_SERVER_PATH";

/// Everything needed to spawn the mirror process. Built once before spawn
/// and never mutated afterwards.
///
/// The environment is the caller's environment overlaid with the unbuffered
/// flag and the two resource paths; these three overrides are the harness's
/// only environment contract with the launched program.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// Path to the mirror process executable.
    pub command: String,
    /// Extra arguments passed through verbatim.
    pub args: Vec<String>,
    /// Working directory for the child; the project root by convention.
    pub cwd: Option<PathBuf>,
    /// Value for [`ICON_PATH_ENV`], relative to the working directory.
    pub icon_path: String,
    /// Value for [`SERVER_PATH_ENV`], relative to the working directory.
    pub server_path: String,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            command: "./x/app/scrcpy".to_string(),
            args: Vec::new(),
            cwd: None,
            icon_path: "app/data/icon.png".to_string(),
            server_path: "x/server/scrcpy-server".to_string(),
        }
    }
}

impl LaunchConfig {
    /// The fixed environment overrides applied on top of the inherited
    /// environment at spawn time.
    #[must_use]
    pub fn env_overrides(&self) -> [(&'static str, String); 3] {
        [
            (UNBUFFERED_ENV, "1".to_string()),
            (ICON_PATH_ENV, self.icon_path.clone()),
            (SERVER_PATH_ENV, self.server_path.clone()),
        ]
    }
}
