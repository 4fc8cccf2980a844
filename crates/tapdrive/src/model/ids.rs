//! Run identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Correlates one report with the log lines and relayed output of a single
/// harness invocation. Minted fresh at the start of every run; serializes
/// as the bare UUID string.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
