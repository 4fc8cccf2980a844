//! tapdrive: a harness that injects scripted touch gestures into an
//! interactive device-mirroring process over its stdin.
//!
//! The harness spawns the external program with piped channels and its own
//! process group, drains stdout/stderr through background [`relay::Relay`]
//! tasks, writes a paced Down/Move/Up gesture script encoded as
//! `LAEvent:<json>` lines, and guarantees group-wide termination plus relay
//! joining on every exit path.

#![forbid(unsafe_code)]
// Public API types have docs; internal items will be documented over time.
#![allow(missing_docs)]

pub mod model;
pub mod protocol;
pub mod relay;
pub mod runner;
pub mod session;

pub use crate::model::*;
