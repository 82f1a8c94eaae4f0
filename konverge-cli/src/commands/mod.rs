//! Subcommand implementations.

pub mod apply;
pub mod get;
pub mod resources;

use anyhow::{Context, Result};
use clap::Args;

use konverge_client::{ClusterConfig, HttpCluster};

/// Connection flags shared by every subcommand.
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// API server base URL, e.g. `https://10.0.0.1:6443`.
    #[arg(long, value_name = "URL")]
    pub server: String,

    /// Bearer token for the API server; falls back to $KONVERGE_TOKEN.
    #[arg(long)]
    pub token: Option<String>,
}

impl ConnectionArgs {
    pub fn connect(&self) -> Result<HttpCluster> {
        let token = self
            .token
            .clone()
            .or_else(|| std::env::var("KONVERGE_TOKEN").ok());
        HttpCluster::connect(ClusterConfig {
            base_url: self.server.clone(),
            token,
        })
        .with_context(|| format!("failed to connect to {}", self.server))
    }
}
