//! `konverge get` — fetch or list objects without reconciling.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::Value;

use konverge_apply::{query, QueryConfig};

use crate::commands::ConnectionArgs;

/// Arguments for `konverge get`.
#[derive(Args, Debug)]
pub struct GetArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Resource kind to query.
    #[arg(long)]
    pub kind: String,

    /// apiVersion of the kind.
    #[arg(long, default_value = "v1")]
    pub api_version: String,

    /// Fetch exactly this object instead of listing.
    #[arg(long)]
    pub name: Option<String>,

    /// Namespace to query.
    #[arg(long, short = 'n')]
    pub namespace: Option<String>,

    /// List across every namespace.
    #[arg(long, conflicts_with = "namespace", conflicts_with = "name")]
    pub all_namespaces: bool,

    /// Label selector, e.g. `app=web,tier!=cache`.
    #[arg(long, short = 'l')]
    pub selector: Option<String>,

    /// Field selector, e.g. `metadata.name=web`.
    #[arg(long)]
    pub field_selector: Option<String>,

    /// Emit the matching objects as JSON.
    #[arg(long)]
    pub json: bool,
}

impl GetArgs {
    pub fn run(self) -> Result<()> {
        let config = QueryConfig {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            all_namespaces: self.all_namespaces,
            label_selector: self.selector.clone(),
            field_selector: self.field_selector.clone(),
        };

        let cluster = self.connection.connect()?;
        let objects = query(&cluster, &config, &self.kind, &self.api_version)?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&objects)
                    .context("failed to serialize query result")?
            );
            return Ok(());
        }

        if objects.is_empty() {
            println!("no {} objects matched", self.kind);
            return Ok(());
        }
        for object in &objects {
            println!("{}  {}", self.kind.bold(), target_of(object));
        }
        Ok(())
    }
}

fn target_of(object: &Value) -> String {
    let name = object
        .pointer("/metadata/name")
        .and_then(Value::as_str)
        .unwrap_or("<unnamed>");
    match object.pointer("/metadata/namespace").and_then(Value::as_str) {
        Some(ns) => format!("{ns}/{name}"),
        None => name.to_owned(),
    }
}
