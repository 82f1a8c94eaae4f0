//! `konverge apply` — reconcile definitions against the cluster.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::{json, Value};

use konverge_apply::{apply_all, Action, ApplyConfig, ApplyReport};
use konverge_core::DefinitionInput;

use crate::commands::ConnectionArgs;
use crate::StateArg;

/// Arguments for `konverge apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Path to a manifest with one or more YAML/JSON documents.
    #[arg(long, value_name = "FILE", conflicts_with = "definition")]
    pub src: Option<PathBuf>,

    /// Inline resource definition (a YAML or JSON mapping).
    #[arg(long, value_name = "YAML")]
    pub definition: Option<String>,

    /// Resource kind when not embedded in the definition.
    #[arg(long)]
    pub kind: Option<String>,

    /// apiVersion when not embedded in the definition.
    #[arg(long)]
    pub api_version: Option<String>,

    /// Object name when the definition carries no metadata.name.
    #[arg(long)]
    pub name: Option<String>,

    /// Namespace when the definition carries no metadata.namespace.
    #[arg(long, short = 'n')]
    pub namespace: Option<String>,

    /// Desired state: present or absent.
    #[arg(long, default_value_t = StateArg::default())]
    pub state: StateArg,

    /// Replace the object unconditionally instead of diffing and patching.
    #[arg(long)]
    pub force: bool,

    /// Check mode: report what would change without mutating the cluster.
    #[arg(long)]
    pub check: bool,

    /// Emit the report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl ApplyArgs {
    pub fn run(self) -> Result<()> {
        // Resolve definitions before touching the network: configuration
        // errors must not depend on cluster availability.
        let inline = match &self.definition {
            Some(text) => {
                let value: Value =
                    serde_yaml::from_str(text).context("failed to parse --definition")?;
                match value {
                    Value::Object(map) => Some(map),
                    _ => bail!("--definition must be a YAML or JSON mapping"),
                }
            }
            None => None,
        };
        let definitions = DefinitionInput {
            inline,
            src: self.src.clone(),
            kind: self.kind.clone(),
            api_version: self.api_version.clone(),
        }
        .resolve()?;

        let config = ApplyConfig {
            state: self.state.0,
            force: self.force,
            check_mode: self.check,
            name: self.name.clone(),
            namespace: self.namespace.clone(),
        };

        let cluster = self.connection.connect()?;
        let report = apply_all(&cluster, &config, &definitions)?;

        if self.json {
            let payload = json!({
                "changed": report.changed(),
                "outcomes": report.outcomes,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&payload)
                    .context("failed to serialize apply report")?
            );
        } else {
            print_report(&report, self.check);
        }
        Ok(())
    }
}

fn print_report(report: &ApplyReport, check: bool) {
    println!("{}", summary_line(report, check));

    for outcome in &report.outcomes {
        let target = match (&outcome.namespace, &outcome.name) {
            (Some(ns), Some(name)) => format!("{ns}/{name}"),
            (_, Some(name)) => name.clone(),
            _ => outcome.namespace.clone().unwrap_or_else(|| "*".to_owned()),
        };
        let verdict = outcome.action.to_string();
        let verdict = match outcome.action {
            Action::Created | Action::Deleted | Action::Replaced | Action::Patched => {
                verdict.green().bold().to_string()
            }
            Action::WouldCreate
            | Action::WouldDelete
            | Action::WouldReplace
            | Action::WouldPatch => verdict.yellow().to_string(),
            Action::Unchanged | Action::Listed => verdict.bright_black().to_string(),
        };
        println!("  {}  {} {target} — {verdict}", symbol(outcome.action), outcome.kind);

        for entry in &outcome.diff {
            println!("       {} {}", entry.kind, entry.path);
        }
    }
}

fn symbol(action: Action) -> &'static str {
    match action {
        Action::Created | Action::Deleted | Action::Replaced | Action::Patched => "✎",
        Action::WouldCreate | Action::WouldDelete | Action::WouldReplace | Action::WouldPatch => {
            "~"
        }
        Action::Unchanged => "·",
        Action::Listed => "≡",
    }
}

/// Headline for a run: `✓` only when something was actually mutated, `~` for
/// a check run that found work, `·` when there was nothing to change.
fn summary_line(report: &ApplyReport, check: bool) -> String {
    let prefix = if check { "[check] " } else { "" };
    let changed = report.outcomes.iter().filter(|o| o.changed).count();
    let unchanged = report.outcomes.len() - changed;
    let mark = if changed == 0 {
        "·"
    } else if check {
        "~"
    } else {
        "✓"
    };
    format!(
        "{prefix}{mark} {} definition(s) reconciled ({changed} changed, {unchanged} unchanged)",
        report.outcomes.len()
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
