// SPDX-License-Identifier: PMPL-1.0-or-later

//! Probe driver: fallback watchdog, breadcrumbs, and launch mode

use crate::chain::CallChain;
use crate::config::DriverConfig;
use crate::probes::exception::describe_payload;
use crate::registry::Registry;
use crate::types::ProbeDescriptor;
use anyhow::{Context, Result};
use colored::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::panic;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FireOptions {
    /// Enter the probe through a randomized call chain
    pub call_chain: bool,
    /// SIGKILL the process if the probe has not terminated it by then
    pub fallback: Option<Duration>,
    /// Pause between the breadcrumb and the crash
    pub delay: Duration,
}

impl Default for FireOptions {
    fn default() -> Self {
        Self {
            call_chain: true,
            fallback: Some(Duration::from_secs(crate::config::DEFAULT_FALLBACK_SECS)),
            delay: Duration::ZERO,
        }
    }
}

impl FireOptions {
    pub fn from_config(config: &DriverConfig) -> Self {
        Self {
            call_chain: config.call_chain,
            fallback: config.fallback(),
            delay: Duration::ZERO,
        }
    }
}

/// End the process with SIGKILL. Used when a probe outlives its own fault.
pub fn kill_self() -> ! {
    unsafe {
        libc::kill(libc::getpid(), libc::SIGKILL);
    }
    std::process::abort()
}

/// Start a detached thread that kills the process after `after`
pub fn arm_fallback(after: Duration) {
    let armed = thread::Builder::new()
        .name("crash-probe-fallback".to_string())
        .spawn(move || {
            thread::sleep(after);
            kill_self();
        });
    if let Err(err) = armed {
        eprintln!("crash-probe: could not arm fallback watchdog: {}", err);
    }
}

/// One-line trail left on stderr right before the crash
pub fn breadcrumb(probe: &ProbeDescriptor, chain: &CallChain) -> String {
    let path = if chain.is_empty() {
        "direct".to_string()
    } else {
        chain.frame_names().join(" > ")
    };
    format!(
        "crash-probe: {} firing {} [{}] via {}",
        chrono::Utc::now().to_rfc3339(),
        probe.name,
        probe.category,
        path
    )
}

/// Chain a hook after the default one that names the panic payload's type.
///
/// The default hook prints `Box<dyn Any>` for typed payloads, which leaves the
/// native exception probes without a type in their diagnostic.
pub fn install_panic_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        default_hook(info);
        eprintln!("crash-probe: uncaught {}", describe_payload(info.payload()));
    }));
}

/// Fire a probe. Never returns.
pub fn fire<R: Rng + ?Sized>(probe: &ProbeDescriptor, options: &FireOptions, rng: &mut R) -> ! {
    install_panic_hook();
    if let Some(after) = options.fallback {
        arm_fallback(after);
    }

    let chain = if options.call_chain {
        CallChain::plan(rng)
    } else {
        CallChain::direct()
    };
    eprintln!("{}", breadcrumb(probe, &chain).red());

    if !options.delay.is_zero() {
        thread::sleep(options.delay);
    }
    chain.run(probe.action)
}

/// Persisted proof that a run id already crashed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchMarker {
    pub run_id: String,
    pub probe: String,
    pub armed_at: String,
}

#[derive(Debug)]
pub enum LaunchOutcome<'r> {
    /// Launch mode is off
    Disabled,
    /// This run id crashed on an earlier launch
    AlreadyCrashed { marker: LaunchMarker, path: PathBuf },
    /// Marker written; fire this probe after `delay`
    Armed {
        probe: &'r ProbeDescriptor,
        delay: Duration,
    },
}

pub fn marker_path(state_dir: &Path, run_id: &str) -> PathBuf {
    state_dir.join(format!("launch-{}.json", sanitize_run_id(run_id)))
}

fn sanitize_run_id(run_id: &str) -> String {
    run_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Decide what this launch does. Crashes at most once per run id.
pub fn prepare_launch<'r, R: Rng + ?Sized>(
    registry: &'r Registry,
    config: &DriverConfig,
    rng: &mut R,
) -> Result<LaunchOutcome<'r>> {
    if !config.crash_on_launch {
        return Ok(LaunchOutcome::Disabled);
    }

    let path = marker_path(&config.state_dir, &config.run_id);
    if path.exists() {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading launch marker {}", path.display()))?;
        let marker: LaunchMarker = serde_json::from_str(&content)
            .with_context(|| format!("parsing launch marker {}", path.display()))?;
        return Ok(LaunchOutcome::AlreadyCrashed { marker, path });
    }

    let probe = match &config.probe {
        Some(name) => registry.lookup(name)?,
        None => registry.pick(rng, None)?,
    };

    let marker = LaunchMarker {
        run_id: config.run_id.clone(),
        probe: probe.name.to_string(),
        armed_at: chrono::Utc::now().to_rfc3339(),
    };
    fs::create_dir_all(&config.state_dir)
        .with_context(|| format!("creating state directory {}", config.state_dir.display()))?;
    fs::write(&path, serde_json::to_string_pretty(&marker)?)
        .with_context(|| format!("writing launch marker {}", path.display()))?;

    let delay = Duration::from_millis(
        rng.gen_range(config.launch_delay_ms.min..=config.launch_delay_ms.max),
    );
    Ok(LaunchOutcome::Armed { probe, delay })
}
