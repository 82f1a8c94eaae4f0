//! # konverge-client
//!
//! Cluster API abstraction: resource discovery, endpoint traits, a real HTTP
//! implementation and an in-memory double.
//!
//! The reconciler only sees the [`Cluster`] and [`ResourceEndpoint`] traits;
//! whether calls hit a live API server ([`HttpCluster`]) or an in-memory
//! object store ([`MemoryCluster`]) is the caller's choice.

pub mod discovery;
pub mod error;
pub mod http;
pub mod memory;

pub use discovery::{Cluster, DiscoveredResource, ResourceEndpoint, Selector};
pub use error::ClientError;
pub use http::{ClusterConfig, HttpCluster};
pub use memory::MemoryCluster;
