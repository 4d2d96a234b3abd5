// SPDX-License-Identifier: PMPL-1.0-or-later

//! crash-probe: a catalog of deliberate, categorized process crashes.
//!
//! Each probe terminates the calling process through one specific fault
//! mechanism, so crash reporters and diagnostic pipelines can be checked
//! against a known failure. The crate triggers failures; it never observes
//! or recovers from them.
//!
//! LAYOUT:
//! 1. **Registry**: immutable name → descriptor table, built once at startup.
//! 2. **Probes**: one module per fault family, every body a `fn() -> !`.
//! 3. **Driver**: fallback watchdog, randomized call chains, and a
//!    crash-once-per-run launch mode for CI crash/relaunch cycles.

pub mod chain;
pub mod config;
pub mod driver;
pub mod error;
pub mod probes;
pub mod registry;
pub mod report;
pub mod types;

pub use error::{ProbeError, ProbeResult};
pub use registry::Registry;
