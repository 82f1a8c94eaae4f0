//! Konverge — declarative cluster resource reconciliation CLI.
//!
//! # Usage
//!
//! ```text
//! konverge apply --server <URL> --src <manifest.yaml> [--check] [--force]
//! konverge apply --server <URL> --definition '<yaml>' [--state present|absent]
//! konverge apply --server <URL> --kind ConfigMap --api-version v1 \
//!     --name a --namespace ns --state absent
//! konverge get --server <URL> --kind Pod -n ns -l app=web
//! konverge resources --server <URL>
//! ```

mod commands;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{apply::ApplyArgs, get::GetArgs, resources::ResourcesArgs};
use konverge_core::State;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "konverge",
    version,
    about = "Converge cluster resources to desired-state manifests",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile one or more resource definitions against the cluster.
    Apply(ApplyArgs),

    /// Fetch or list objects without reconciling.
    Get(GetArgs),

    /// Show the resource types discovered on the cluster.
    Resources(ResourcesArgs),
}

// ---------------------------------------------------------------------------
// Shared State argument — parsed from CLI strings, converts to core type
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse [`State`] from CLI args.
#[derive(Debug, Clone, Default)]
pub struct StateArg(pub State);

impl FromStr for StateArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        State::from_str(s).map(Self)
    }
}

impl fmt::Display for StateArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<StateArg> for State {
    fn from(s: StateArg) -> Self {
        s.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Apply(args) => args.run(),
        Commands::Get(args) => args.run(),
        Commands::Resources(args) => args.run(),
    }
}
