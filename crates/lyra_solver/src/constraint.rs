//! The constraint family stepped by the solver.
//!
//! A constraint is a deferred unit of semantic inference producing a
//! [`Promise`]. Stepping yields a finite, non-restartable sequence of
//! states; the scheduling loop in [`ConstraintSolver`] stays separate so
//! each constraint's state machine is testable on its own.
//!
//! [`ConstraintSolver`]: crate::ConstraintSolver

use crate::promise::Promise;
use lyra_diagnostics::{Diagnostic, DiagnosticBag};

/// Outcome of stepping a constraint once.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SolveState {
    /// No progress was made, typically because an awaited promise is not
    /// yet resolved; the constraint stays pending for the next sweep.
    Stale,
    /// The constraint resolved its promise and leaves the pending set.
    Solved,
}

/// A deferred unit of semantic inference.
///
/// Implementations may append diagnostics while stepping. Stepping a
/// constraint again after it returned [`SolveState::Solved`] is a solver
/// bug and fatal.
pub trait Constraint {
    /// Pull the next state from the constraint's solve sequence.
    fn step(&mut self, diagnostics: &mut DiagnosticBag) -> SolveState;

    /// Report this constraint as permanently unresolved.
    ///
    /// Called once solving reached a fixpoint with the constraint still
    /// pending. Appends a diagnostic and returns; unresolved constraints
    /// are a user-facing condition, never a crash.
    fn report_unresolved(&self, diagnostics: &mut DiagnosticBag);
}

/// The plain constraint: resolves its promise with an eagerly known value
/// on its first step.
///
/// Used to seed solving with facts that are known up front but still need
/// to flow through promises.
pub struct SupplyConstraint<T> {
    promise: Promise<T>,
    value: Option<T>,
}

impl<T> SupplyConstraint<T> {
    /// Create a constraint that will supply `value`.
    pub fn new(value: T) -> Self {
        Self {
            promise: Promise::unresolved(),
            value: Some(value),
        }
    }

    /// The promise of this constraint's result.
    #[inline]
    pub fn promise(&self) -> Promise<T> {
        self.promise.clone()
    }
}

impl<T> Constraint for SupplyConstraint<T> {
    fn step(&mut self, _diagnostics: &mut DiagnosticBag) -> SolveState {
        let value = self
            .value
            .take()
            .unwrap_or_else(|| panic!("constraint stepped past Solved"));
        self.promise.resolve(value);
        SolveState::Solved
    }

    fn report_unresolved(&self, diagnostics: &mut DiagnosticBag) {
        diagnostics.add(Diagnostic::error("unresolved constraint: value was never supplied"));
    }
}

/// A constraint that runs when another constraint has finished.
///
/// Steps [`SolveState::Stale`] while the awaited promise is unresolved;
/// once it resolves, applies the transform and resolves its own promise.
/// This is the composition primitive that lets one inference step depend
/// on another's not-yet-known answer without blocking a thread.
pub struct AwaitConstraint<T, U> {
    awaited: Promise<T>,
    map: Option<Box<dyn FnOnce(T) -> U>>,
    promise: Promise<U>,
    /// What was being inferred, for the unresolved diagnostic.
    description: String,
}

impl<T: Clone, U> AwaitConstraint<T, U> {
    /// Create a constraint awaiting `awaited`, mapping its result with
    /// `map` once available.
    pub fn new(
        awaited: Promise<T>,
        description: impl Into<String>,
        map: impl FnOnce(T) -> U + 'static,
    ) -> Self {
        Self {
            awaited,
            map: Some(Box::new(map)),
            promise: Promise::unresolved(),
            description: description.into(),
        }
    }

    /// The promise of this constraint's result.
    #[inline]
    pub fn promise(&self) -> Promise<U> {
        self.promise.clone()
    }
}

impl<T: Clone, U> Constraint for AwaitConstraint<T, U> {
    fn step(&mut self, _diagnostics: &mut DiagnosticBag) -> SolveState {
        // Wait until resolved
        if !self.awaited.is_resolved() {
            return SolveState::Stale;
        }

        let map = self
            .map
            .take()
            .unwrap_or_else(|| panic!("constraint stepped past Solved"));
        self.promise.resolve(map(self.awaited.result()));
        SolveState::Solved
    }

    fn report_unresolved(&self, diagnostics: &mut DiagnosticBag) {
        diagnostics.add(Diagnostic::error(format!(
            "unresolved constraint: {}",
            self.description
        )));
    }
}
