//! End-to-end resolution: binder-style queries over the incremental
//! database, with forward references going through the constraint solver.

use lyra_binding::{FunctionSymbol, LookupResult, Symbol, VariableSymbol};
use lyra_diagnostics::DiagnosticBag;
use lyra_query::{Query, QueryDatabase, QueryId};
use lyra_solver::ConstraintSolver;

fn function(name: &str, arity: usize) -> Symbol {
    Symbol::Function(FunctionSymbol {
        name: name.to_owned(),
        arity,
    })
}

fn variable(name: &str) -> Symbol {
    Symbol::Variable(VariableSymbol {
        name: name.to_owned(),
    })
}

/// Resolves a name against the declarations of one scope input.
///
/// Diagnostics from inside a query body stay local: the memoized value is
/// the resolved symbol, and error cases surface as sentinels.
struct ResolveValue;

impl Query for ResolveValue {
    type Key = (QueryId, String);
    type Value = Symbol;

    fn execute(db: &QueryDatabase, (scope, name): Self::Key) -> Symbol {
        let declarations = db.get_input::<Vec<Symbol>>(scope);
        let matching = declarations
            .into_iter()
            .filter(|symbol| symbol.name() == name);
        let result = LookupResult::from_result_set(matching);

        let mut diagnostics = DiagnosticBag::new();
        result.value_symbol(&name, &mut diagnostics)
    }
}

#[test]
fn lookup_tracks_scope_changes() {
    let db = QueryDatabase::new();
    let scope = db.create_input::<Vec<Symbol>>();
    db.set_input(scope, vec![variable("x"), function("print", 1)]);

    // Single candidates resolve directly
    let resolved = db.query::<ResolveValue>((scope, "x".to_owned()));
    assert_eq!(resolved, variable("x"));

    // A second overload joins the set once the scope grows
    db.set_input(
        scope,
        vec![variable("x"), function("print", 1), function("print", 2)],
    );
    let resolved = db.query::<ResolveValue>((scope, "print".to_owned()));
    let Symbol::Overload(overload) = resolved else {
        panic!("expected an overload symbol, got {resolved:?}");
    };
    assert_eq!(overload.functions.len(), 2);

    // Unknown names come back as sentinels, not crashes
    let resolved = db.query::<ResolveValue>((scope, "missing".to_owned()));
    assert!(resolved.is_error());
}

#[test]
fn forward_reference_resolves_through_the_solver() {
    let db = QueryDatabase::new();
    let scope = db.create_input::<Vec<Symbol>>();
    db.set_input(scope, vec![variable("answer")]);

    let mut solver = ConstraintSolver::new();
    let mut diagnostics = DiagnosticBag::new();

    // The use site is processed before the definition exists; it awaits
    // the definition's promise instead of failing
    let definition = lyra_solver::Promise::unresolved();
    let use_site = solver.await_map(
        definition.clone(),
        "reference to answer",
        |symbol: Symbol| symbol,
    );

    // Later, the binder reaches the definition and supplies it
    let supplied = solver.supply(db.query::<ResolveValue>((scope, "answer".to_owned())));
    solver.add(lyra_solver::AwaitConstraint::new(
        supplied,
        "definition of answer",
        move |symbol: Symbol| definition.resolve(symbol),
    ));

    solver.solve(&mut diagnostics);

    assert!(diagnostics.is_empty());
    assert_eq!(use_site.result(), variable("answer"));
}

#[test]
fn unresolved_forward_reference_is_reported() {
    let mut solver = ConstraintSolver::new();
    let mut diagnostics = DiagnosticBag::new();

    let never_defined: lyra_solver::Promise<Symbol> = lyra_solver::Promise::unresolved();
    let _use_site = solver.await_map(never_defined, "reference to ghost", |symbol| symbol);

    solver.solve(&mut diagnostics);

    assert_eq!(diagnostics.len(), 1);
    assert!(
        diagnostics
            .iter()
            .next()
            .is_some_and(|diagnostic| diagnostic.message().contains("reference to ghost"))
    );
}
