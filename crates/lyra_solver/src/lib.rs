//! Cooperative constraint solver for Lyra semantic inference.
//!
//! Type inference, overload resolution and symbol binding are naturally
//! expressed as mutually dependent computations whose answers are not
//! always known at the point they are requested - forward references,
//! circular-looking lookups, deferred overload resolution. This crate
//! models each such unit as a [`Constraint`] producing a [`Promise`], and
//! a [`ConstraintSolver`] that sweeps the pending set to a fixpoint.
//!
//! Suspension is purely cooperative: a constraint that cannot progress
//! reports [`SolveState::Stale`] and is revisited next sweep; no thread is
//! ever blocked. Constraints left pending at the fixpoint report
//! diagnostics instead of crashing the surrounding compilation.

mod constraint;
mod promise;
mod solver;

// Re-exports
pub use constraint::{AwaitConstraint, Constraint, SolveState, SupplyConstraint};
pub use promise::Promise;
pub use solver::ConstraintSolver;
