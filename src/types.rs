// SPDX-License-Identifier: PMPL-1.0-or-later

//! Core type definitions for crash-probe

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fault family a probe belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeCategory {
    MemoryAccess,
    BadInstruction,
    StackCorruption,
    RuntimeCorruption,
    /// Native exceptions: panics that hit a non-unwinding boundary
    CppException,
    /// Managed exceptions: panics that unwind out of `main`
    LanguageException,
    HeapCorruption,
    Threading,
    MemorySafety,
    Panic,
    Resource,
}

impl ProbeCategory {
    pub fn all() -> Vec<ProbeCategory> {
        vec![
            ProbeCategory::MemoryAccess,
            ProbeCategory::BadInstruction,
            ProbeCategory::StackCorruption,
            ProbeCategory::RuntimeCorruption,
            ProbeCategory::CppException,
            ProbeCategory::LanguageException,
            ProbeCategory::HeapCorruption,
            ProbeCategory::Threading,
            ProbeCategory::MemorySafety,
            ProbeCategory::Panic,
            ProbeCategory::Resource,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProbeCategory::MemoryAccess => "Memory access",
            ProbeCategory::BadInstruction => "Bad instruction",
            ProbeCategory::StackCorruption => "Stack corruption",
            ProbeCategory::RuntimeCorruption => "Runtime corruption",
            ProbeCategory::CppException => "Language exception (native)",
            ProbeCategory::LanguageException => "Language exception (managed)",
            ProbeCategory::HeapCorruption => "Heap corruption",
            ProbeCategory::Threading => "Threading",
            ProbeCategory::MemorySafety => "Memory safety",
            ProbeCategory::Panic => "Panic",
            ProbeCategory::Resource => "Resource exhaustion",
        }
    }
}

impl fmt::Display for ProbeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fatal signals a probe is expected to die with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Signal {
    #[serde(rename = "SIGSEGV")]
    Segv,
    #[serde(rename = "SIGBUS")]
    Bus,
    #[serde(rename = "SIGILL")]
    Ill,
    #[serde(rename = "SIGTRAP")]
    Trap,
    #[serde(rename = "SIGABRT")]
    Abrt,
    #[serde(rename = "SIGFPE")]
    Fpe,
    #[serde(rename = "SIGKILL")]
    Kill,
}

impl Signal {
    pub fn raw(&self) -> i32 {
        match self {
            Signal::Segv => libc::SIGSEGV,
            Signal::Bus => libc::SIGBUS,
            Signal::Ill => libc::SIGILL,
            Signal::Trap => libc::SIGTRAP,
            Signal::Abrt => libc::SIGABRT,
            Signal::Fpe => libc::SIGFPE,
            Signal::Kill => libc::SIGKILL,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Signal::Segv => "SIGSEGV",
            Signal::Bus => "SIGBUS",
            Signal::Ill => "SIGILL",
            Signal::Trap => "SIGTRAP",
            Signal::Abrt => "SIGABRT",
            Signal::Fpe => "SIGFPE",
            Signal::Kill => "SIGKILL",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a probe is expected to end the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Killed by any one of these signals
    Signal(&'static [Signal]),
    /// Normal exit with this status code (101 for an uncaught panic)
    ExitCode(i32),
}

/// Exit status of a panic that unwinds out of `main`
pub const PANIC_EXIT_CODE: i32 = 101;

impl Termination {
    /// Whether an observed exit status satisfies this expectation
    #[cfg(unix)]
    pub fn matches(&self, status: &std::process::ExitStatus) -> bool {
        use std::os::unix::process::ExitStatusExt;

        match self {
            Termination::Signal(set) => status
                .signal()
                .map(|raw| set.iter().any(|sig| sig.raw() == raw))
                .unwrap_or(false),
            Termination::ExitCode(code) => status.code() == Some(*code),
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Signal(set) => {
                let names: Vec<&str> = set.iter().map(Signal::name).collect();
                f.write_str(&names.join("|"))
            }
            Termination::ExitCode(code) => write!(f, "exit {}", code),
        }
    }
}

/// Body of a probe. Control never comes back to the caller.
pub type ProbeAction = fn() -> !;

/// One registered crash probe
#[derive(Clone, Copy)]
pub struct ProbeDescriptor {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub category: ProbeCategory,
    pub display_name: &'static str,
    pub description: &'static str,
    pub expected: Termination,
    pub action: ProbeAction,
}

impl ProbeDescriptor {
    /// Case-insensitive match against the canonical name and every alias
    pub fn answers_to(&self, query: &str) -> bool {
        self.name.eq_ignore_ascii_case(query)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(query))
    }

    pub fn summary(&self) -> ProbeSummary {
        ProbeSummary {
            name: self.name.to_string(),
            aliases: self.aliases.iter().map(|a| a.to_string()).collect(),
            category: self.category,
            display_name: self.display_name.to_string(),
            description: self.description.to_string(),
            expected: self.expected,
        }
    }
}

impl fmt::Debug for ProbeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeDescriptor")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("expected", &self.expected)
            .finish_non_exhaustive()
    }
}

/// Serializable view of a descriptor for listings
#[derive(Debug, Clone, Serialize)]
pub struct ProbeSummary {
    pub name: String,
    pub aliases: Vec<String>,
    pub category: ProbeCategory,
    pub display_name: String,
    pub description: String,
    pub expected: Termination,
}
