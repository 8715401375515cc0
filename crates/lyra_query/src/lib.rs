//! Demand-driven incremental query engine for the Lyra front end.
//!
//! This crate provides a revision-tracked memoization engine with:
//! - Automatic memoization of query results
//! - Dependency tracking discovered during execution, not declared up front
//! - Early cutoff (a recomputation producing an equal value does not
//!   invalidate dependents)
//! - Parallel dependency refresh
//!
//! # Architecture
//!
//! The system is organized in layers:
//!
//! ```text
//! Inputs (source text, compilation options - externally supplied)
//!     ↓
//! Syntax queries (parse trees keyed by file)
//!     ↓
//! Binding queries (scopes, symbol lookups)
//!     ↓
//! Semantic queries (types, overloads, bound trees)
//! ```
//!
//! Each layer reads the one above it through [`QueryDatabase::query`] and
//! [`QueryDatabase::get_input`]; every read is recorded as a dependency
//! edge. When an input changes, the revision clock advances and stale
//! results are re-verified or recomputed on demand - nothing is pushed.
//!
//! # Example
//!
//! ```ignore
//! use lyra_query::{Query, QueryDatabase, QueryId};
//!
//! struct SourceLength;
//! impl Query for SourceLength {
//!     type Key = QueryId;
//!     type Value = usize;
//!
//!     fn execute(db: &QueryDatabase, key: QueryId) -> usize {
//!         db.get_input::<String>(key).len()
//!     }
//! }
//!
//! let db = QueryDatabase::new();
//! let source = db.create_input::<String>();
//! db.set_input(source, "let x = 5".to_owned());
//! let length = db.query::<SourceLength>(source);
//! ```

#![allow(
    clippy::module_name_repetitions,
    reason = "Query types like QueryDatabase are clearer than just Database"
)]

mod database;
mod parallel;
mod query;
mod record;
mod revision;

// Re-exports
pub use database::QueryDatabase;
pub use parallel::ParallelConfig;
pub use query::{Query, QueryId};
pub use revision::{Revision, RevisionCounter};
