//! # konverge-apply
//!
//! The reconciler state machine. Call [`apply_one`] to converge a single
//! definition against a cluster, or [`apply_all`] to process an ordered
//! batch, accumulating one [`ReconcileOutcome`] per definition into an
//! [`ApplyReport`]. The first fatal error aborts the run.
//!
//! [`query`] is the read-only counterpart: fetch or list objects without
//! reconciling anything.

pub mod error;
pub mod query;
pub mod reconciler;

pub use error::ApplyError;
pub use query::{query, QueryConfig};
pub use reconciler::{apply_all, apply_one, Action, ApplyConfig, ApplyReport, ReconcileOutcome};
