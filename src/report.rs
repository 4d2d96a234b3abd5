// SPDX-License-Identifier: PMPL-1.0-or-later

//! Catalog listings for humans and harnesses

use crate::registry::Registry;
use crate::types::*;
use anyhow::Result;
use clap::ValueEnum;
use colored::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    Table,
    Json,
    Yaml,
}

/// Render the catalog, optionally limited to one category
pub fn render(
    registry: &Registry,
    format: ListFormat,
    category: Option<ProbeCategory>,
) -> Result<String> {
    let selected: Vec<&ProbeDescriptor> = registry
        .iter()
        .filter(|p| category.map_or(true, |cat| p.category == cat))
        .collect();

    match format {
        ListFormat::Table => Ok(render_table(registry, &selected)),
        ListFormat::Json => {
            let summaries: Vec<ProbeSummary> = selected.iter().map(|p| p.summary()).collect();
            Ok(serde_json::to_string_pretty(&summaries)?)
        }
        ListFormat::Yaml => {
            let summaries: Vec<ProbeSummary> = selected.iter().map(|p| p.summary()).collect();
            Ok(serde_yaml::to_string(&summaries)?)
        }
    }
}

fn render_table(registry: &Registry, selected: &[&ProbeDescriptor]) -> String {
    let mut lines = Vec::new();
    let width = selected.iter().map(|p| p.name.len()).max().unwrap_or(0);

    for category in registry.categories() {
        let members: Vec<_> = selected.iter().filter(|p| p.category == category).collect();
        if members.is_empty() {
            continue;
        }
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format!("{}", category.label().bold().yellow()));
        for probe in members {
            lines.push(format!(
                "  {}  {}  {}",
                format!("{:width$}", probe.name, width = width).bold(),
                probe.display_name,
                format!("[{}]", probe.expected).dimmed()
            ));
        }
    }

    lines.push(String::new());
    lines.push(format!("{} probes", selected.len()));
    lines.join("\n")
}

/// Multi-line detail view of one probe
pub fn describe(probe: &ProbeDescriptor) -> String {
    let mut lines = vec![
        format!("{}", probe.name.bold().cyan()),
        format!("  Name:        {}", probe.display_name),
        format!("  Category:    {}", probe.category),
        format!("  Expected:    {}", probe.expected),
        format!("  Effect:      {}", probe.description),
    ];
    if !probe.aliases.is_empty() {
        lines.push(format!("  Aliases:     {}", probe.aliases.join(", ")));
    }
    lines.join("\n")
}
