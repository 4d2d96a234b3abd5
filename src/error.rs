// SPDX-License-Identifier: PMPL-1.0-or-later

use crate::types::ProbeCategory;
use thiserror::Error;

/// Result type for registry operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// The recoverable failures of the catalog. Crashes are not errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("unknown probe '{name}'{}", did_you_mean(.suggestion))]
    UnknownProbe {
        name: String,
        suggestion: Option<String>,
    },

    #[error("no probes registered in category {0}")]
    NoProbes(ProbeCategory),

    #[error("the probe registry is empty")]
    EmptyRegistry,
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean '{}'?)", name),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_probe_message() {
        let plain = ProbeError::UnknownProbe {
            name: "nope".to_string(),
            suggestion: None,
        };
        assert_eq!(plain.to_string(), "unknown probe 'nope'");

        let hinted = ProbeError::UnknownProbe {
            name: "doublefre".to_string(),
            suggestion: Some("DoubleFree".to_string()),
        };
        assert_eq!(
            hinted.to_string(),
            "unknown probe 'doublefre' (did you mean 'DoubleFree'?)"
        );
    }
}
