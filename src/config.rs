// SPDX-License-Identifier: PMPL-1.0-or-later

//! Driver configuration: file profile plus environment overrides

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_FALLBACK_SECS: u64 = 15;

pub const ENV_PROBE: &str = "CRASH_PROBE_TYPE";
pub const ENV_ON_LAUNCH: &str = "CRASH_PROBE_ON_LAUNCH";
pub const ENV_RUN_ID: &str = "CRASH_PROBE_RUN_ID";
pub const ENV_FALLBACK_SECS: &str = "CRASH_PROBE_FALLBACK_SECS";
pub const ENV_CALL_CHAIN: &str = "CRASH_PROBE_CALL_CHAIN";
pub const ENV_STATE_DIR: &str = "CRASH_PROBE_STATE_DIR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min: u64,
    pub max: u64,
}

impl Default for DelayRange {
    fn default() -> Self {
        Self { min: 500, max: 3000 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Probe to fire; random when unset
    pub probe: Option<String>,
    pub crash_on_launch: bool,
    pub run_id: String,
    /// Seconds before the SIGKILL fallback; 0 disables it
    pub fallback_secs: u64,
    pub call_chain: bool,
    pub launch_delay_ms: DelayRange,
    pub state_dir: PathBuf,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            probe: None,
            crash_on_launch: false,
            run_id: "default".to_string(),
            fallback_secs: DEFAULT_FALLBACK_SECS,
            call_chain: true,
            launch_delay_ms: DelayRange::default(),
            state_dir: PathBuf::from(".crash-probe"),
        }
    }
}

impl DriverConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading driver config {}", path.display()))?;
        // Extension-based dispatch keeps JSON and YAML parsing unambiguous.
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("parsing json driver config {}", path.display())),
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("parsing yaml driver config {}", path.display())),
            _ => Err(anyhow!(
                "unsupported driver config extension for {}",
                path.display()
            )),
        }
    }

    /// Defaults, then the optional file, then the process environment
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(probe) = lookup(ENV_PROBE).filter(|v| !v.trim().is_empty()) {
            self.probe = Some(probe.trim().to_string());
        }
        if let Some(raw) = lookup(ENV_ON_LAUNCH) {
            self.crash_on_launch = parse_flag(ENV_ON_LAUNCH, &raw)?;
        }
        if let Some(run_id) = lookup(ENV_RUN_ID) {
            self.run_id = run_id;
        }
        if let Some(raw) = lookup(ENV_FALLBACK_SECS) {
            self.fallback_secs = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of seconds, got '{}'", ENV_FALLBACK_SECS, raw))?;
        }
        if let Some(raw) = lookup(ENV_CALL_CHAIN) {
            self.call_chain = parse_flag(ENV_CALL_CHAIN, &raw)?;
        }
        if let Some(dir) = lookup(ENV_STATE_DIR).filter(|v| !v.is_empty()) {
            self.state_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.launch_delay_ms.min > self.launch_delay_ms.max {
            bail!(
                "launch_delay_ms.min ({}) exceeds launch_delay_ms.max ({})",
                self.launch_delay_ms.min,
                self.launch_delay_ms.max
            );
        }
        if self.run_id.trim().is_empty() {
            bail!("run_id must not be empty");
        }
        Ok(())
    }

    pub fn fallback(&self) -> Option<Duration> {
        (self.fallback_secs > 0).then(|| Duration::from_secs(self.fallback_secs))
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(anyhow!("{} must be a boolean flag, got '{}'", key, other)),
    }
}
