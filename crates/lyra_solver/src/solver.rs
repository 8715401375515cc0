//! The cooperative constraint scheduler.

use crate::constraint::{AwaitConstraint, Constraint, SolveState, SupplyConstraint};
use crate::promise::Promise;
use log::debug;
use lyra_diagnostics::DiagnosticBag;

/// Drives pending constraints to a fixpoint.
///
/// Single-threaded and cooperative: constraints never block. Each sweep
/// visits every pending constraint once, in registration order, pulling
/// one state from it. A sweep that solves nothing is the fixpoint - the
/// termination guarantee for constraints that can never resolve - after
/// which every remaining constraint reports a diagnostic.
#[derive(Default)]
pub struct ConstraintSolver {
    pending: Vec<Box<dyn Constraint>>,
}

impl ConstraintSolver {
    /// Create a solver with no pending constraints.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constraint.
    ///
    /// Sweeps visit constraints in registration order, so diagnostics for
    /// permanently unresolved constraints come out deterministically.
    #[inline]
    pub fn add(&mut self, constraint: impl Constraint + 'static) {
        self.pending.push(Box::new(constraint));
    }

    /// Register a plain value-supplying constraint; returns its promise.
    pub fn supply<T: 'static>(&mut self, value: T) -> Promise<T> {
        let constraint = SupplyConstraint::new(value);
        let promise = constraint.promise();
        self.add(constraint);
        promise
    }

    /// Register a constraint awaiting `awaited`, mapping its result with
    /// `map`; returns the promise of the mapped value.
    ///
    /// `description` names what is being inferred and surfaces in the
    /// diagnostic if the constraint never resolves.
    pub fn await_map<T, U>(
        &mut self,
        awaited: Promise<T>,
        description: impl Into<String>,
        map: impl FnOnce(T) -> U + 'static,
    ) -> Promise<U>
    where
        T: Clone + 'static,
        U: 'static,
    {
        let constraint = AwaitConstraint::new(awaited, description, map);
        let promise = constraint.promise();
        self.add(constraint);
        promise
    }

    /// The number of constraints still pending.
    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Sweep the pending set until a fixpoint, then report every
    /// constraint that remains unresolved.
    ///
    /// Unresolved constraints are dropped after reporting; they are a
    /// user-facing condition (undefined reference, unresolvable overload),
    /// never an abort of the surrounding analysis.
    pub fn solve(&mut self, diagnostics: &mut DiagnosticBag) {
        let mut sweep = 0_usize;
        loop {
            sweep += 1;
            let mut still_pending = Vec::with_capacity(self.pending.len());
            let mut solved = 0_usize;

            for mut constraint in self.pending.drain(..) {
                match constraint.step(diagnostics) {
                    SolveState::Solved => solved += 1,
                    SolveState::Stale => still_pending.push(constraint),
                }
            }

            self.pending = still_pending;
            debug!("sweep {sweep}: {solved} solved, {} pending", self.pending.len());

            // A sweep that solved nothing is the fixpoint; anything still
            // pending can never resolve
            if solved == 0 || self.pending.is_empty() {
                break;
            }
        }

        for constraint in self.pending.drain(..) {
            constraint.report_unresolved(diagnostics);
        }
    }
}
