//! Core data model for the research query engine
//!
//! This crate defines the shapes shared by every layer of research-rs:
//!
//! - [`QueryInput`] / [`QueryRecord`]: one research question and its durable,
//!   artifact-rich result
//! - [`Job`]: an asynchronous execution request with a guarded lifecycle
//!   (`queued -> running -> completed | failed`)
//! - [`Usage`] / [`CostBreakdown`]: token counts and spend across the agent,
//!   data, and search cost centers
//! - [`ArtifactBag`] / [`FragmentKind`]: the sparse bag of optional market
//!   enrichment fragments attached to a result
//! - [`SessionContext`]: the key-value execution context handed to the
//!   answering capability
//!
//! No I/O happens here; higher crates own transport, persistence, and
//! orchestration.

pub mod artifact;
pub mod context;
pub mod error;
pub mod job;
pub mod query;
pub mod session;

pub use artifact::{ArtifactBag, FragmentKind};
pub use context::SessionContext;
pub use error::{CoreError, Result};
pub use job::{Job, JobStatus};
pub use query::{CostBreakdown, QueryInput, QueryMode, QueryRecord, QueryStatus, Usage, Verbosity};
pub use session::Session;
