//! `konverge resources` — show the resource types discovered on the cluster.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::commands::ConnectionArgs;

/// Arguments for `konverge resources`.
#[derive(Args, Debug)]
pub struct ResourcesArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Only show kinds containing this substring.
    #[arg(long)]
    pub kind: Option<String>,
}

impl ResourcesArgs {
    pub fn run(self) -> Result<()> {
        let cluster = self.connection.connect()?;
        for resource in cluster.resources() {
            // The list companions double every entry; skip them here.
            if resource.kind.ends_with("List") {
                continue;
            }
            if let Some(filter) = &self.kind {
                if !resource.kind.contains(filter.as_str()) {
                    continue;
                }
            }
            let scope = if resource.namespaced {
                "namespaced"
            } else {
                "cluster"
            };
            println!(
                "{} ({})  {}  {}",
                resource.kind.bold(),
                resource.plural,
                resource.group_version(),
                scope
            );
        }
        Ok(())
    }
}
