//! Behavioral tests for memoization, early cutoff and invalidation.

use lyra_query::{Query, QueryDatabase, QueryId, Revision};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Doubles an integer input.
struct Doubled;

impl Query for Doubled {
    type Key = QueryId;
    type Value = i64;

    fn execute(db: &QueryDatabase, key: QueryId) -> i64 {
        db.get_input::<i64>(key) * 2
    }
}

/// Same shape as [`Doubled`], but owned by the memoization test alone so
/// its execution counter is not shared across concurrently running tests.
struct CountedDouble;

static COUNTED_DOUBLE_EXECUTIONS: AtomicUsize = AtomicUsize::new(0);

impl Query for CountedDouble {
    type Key = QueryId;
    type Value = i64;

    fn execute(db: &QueryDatabase, key: QueryId) -> i64 {
        COUNTED_DOUBLE_EXECUTIONS.fetch_add(1, Ordering::SeqCst);
        db.get_input::<i64>(key) * 2
    }
}

/// Absolute value of an integer input; the middle of a two-level chain.
struct Magnitude;

impl Query for Magnitude {
    type Key = QueryId;
    type Value = i64;

    fn execute(db: &QueryDatabase, key: QueryId) -> i64 {
        db.get_input::<i64>(key).abs()
    }
}

/// Formats the magnitude of an input; depends only on [`Magnitude`].
struct Described;

static DESCRIBED_EXECUTIONS: AtomicUsize = AtomicUsize::new(0);

impl Query for Described {
    type Key = QueryId;
    type Value = String;

    fn execute(db: &QueryDatabase, key: QueryId) -> String {
        DESCRIBED_EXECUTIONS.fetch_add(1, Ordering::SeqCst);
        format!("magnitude {}", db.query::<Magnitude>(key))
    }
}

#[test]
fn inputs_round_trip() {
    let db = QueryDatabase::new();
    let input = db.create_input::<i64>();

    // Unset inputs read as the type's default
    assert_eq!(db.get_input::<i64>(input), 0);
    assert_eq!(db.changed_at(input), Revision::INVALID);
    assert_eq!(db.verified_at(input), Revision::MAX);

    db.set_input(input, 5_i64);
    assert_eq!(db.get_input::<i64>(input), 5);
}

/// Querying twice at the same revision returns the identical value and
/// does not re-execute the query body.
#[test]
fn repeated_queries_are_memoized() {
    let db = QueryDatabase::new();
    let input = db.create_input::<i64>();
    db.set_input(input, 21_i64);

    let first = db.query::<CountedDouble>(input);
    let executions = COUNTED_DOUBLE_EXECUTIONS.load(Ordering::SeqCst);
    let second = db.query::<CountedDouble>(input);

    assert_eq!(first, 42);
    assert_eq!(second, 42);
    assert_eq!(COUNTED_DOUBLE_EXECUTIONS.load(Ordering::SeqCst), executions);
}

/// Setting an input to an equal value advances the clock, but a dependent
/// query that recomputes to an equal value keeps its changed-revision.
#[test]
fn equal_input_value_does_not_advance_dependents() {
    let db = QueryDatabase::new();
    let input = db.create_input::<i64>();
    db.set_input(input, 5_i64);

    let record = db.query_id::<Magnitude>(&input);
    assert_eq!(db.query::<Magnitude>(input), 5);
    let computed_changed = db.changed_at(record);

    // Re-setting the same value still advances the clock and the input's
    // changed-revision
    db.set_input(input, 5_i64);
    let after_set = db.current_revision();
    assert!(computed_changed < after_set);
    assert_eq!(db.changed_at(input), after_set);

    // The recomputed value is equal, so the record's changed-revision
    // stays put while its verification point catches up
    assert_eq!(db.query::<Magnitude>(input), 5);
    assert_eq!(db.changed_at(record), computed_changed);
    assert_eq!(db.verified_at(record), after_set);
}

/// A genuine input change propagates, stamping the dependent with the
/// revision at which the input changed.
#[test]
fn changed_input_value_propagates() {
    let db = QueryDatabase::new();
    let input = db.create_input::<i64>();
    db.set_input(input, 5_i64);

    assert_eq!(db.query::<Doubled>(input), 10);

    db.set_input(input, 6_i64);
    let changed_revision = db.changed_at(input);

    assert_eq!(db.query::<Doubled>(input), 12);
    assert_eq!(db.changed_at(db.query_id::<Doubled>(&input)), changed_revision);
}

/// Early cutoff across a chain: `Described` depends on `Magnitude`, which
/// recomputes to an equal value after a sign flip, so `Described` is never
/// re-executed.
#[test]
fn early_cutoff_stops_propagation() {
    let _ = env_logger::builder().is_test(true).try_init();

    let db = QueryDatabase::new();
    let input = db.create_input::<i64>();
    db.set_input(input, 5_i64);

    assert_eq!(db.query::<Described>(input), "magnitude 5");
    let executions = DESCRIBED_EXECUTIONS.load(Ordering::SeqCst);

    // Magnitude recomputes to the same 5; Described must be reusable
    // without running its body
    db.set_input(input, -5_i64);
    assert_eq!(db.query::<Described>(input), "magnitude 5");
    assert_eq!(DESCRIBED_EXECUTIONS.load(Ordering::SeqCst), executions);

    // A real change still reaches the top of the chain
    db.set_input(input, -7_i64);
    assert_eq!(db.query::<Described>(input), "magnitude 7");
    assert_eq!(DESCRIBED_EXECUTIONS.load(Ordering::SeqCst), executions + 1);
}

/// The full scenario from the database contract, end to end.
#[test]
fn input_clock_scenario() {
    let db = QueryDatabase::new();
    let input = db.create_input::<i64>();

    db.set_input(input, 5_i64);
    assert_eq!(db.get_input::<i64>(input), 5);
    let first_set = db.current_revision();

    // Same value, clock still advances
    db.set_input(input, 5_i64);
    assert!(first_set < db.current_revision());
}

#[test]
fn clear_computed_keeps_inputs() {
    let db = QueryDatabase::new();
    let input = db.create_input::<i64>();
    db.set_input(input, 3_i64);
    let _ = db.query::<Doubled>(input);

    assert_eq!(db.len(), 2);
    db.clear_computed();
    assert_eq!(db.len(), 1);
    assert_eq!(db.get_input::<i64>(input), 3);

    // Dropped queries come back on demand
    assert_eq!(db.query::<Doubled>(input), 6);
}

/// A query that reads itself.
struct SelfReferential;

impl Query for SelfReferential {
    type Key = QueryId;
    type Value = i64;

    fn execute(db: &QueryDatabase, key: QueryId) -> i64 {
        db.query::<SelfReferential>(key)
    }
}

#[test]
#[should_panic(expected = "query cycle detected")]
fn self_referential_query_is_fatal() {
    let db = QueryDatabase::new();
    let input = db.create_input::<i64>();
    let _ = db.query::<SelfReferential>(input);
}

#[test]
#[should_panic(expected = "type mismatch")]
fn reading_an_input_at_the_wrong_type_is_fatal() {
    let db = QueryDatabase::new();
    let input = db.create_input::<i64>();
    let _: String = db.get_input::<String>(input);
}

#[test]
#[should_panic(expected = "not an input")]
fn setting_a_computed_query_is_fatal() {
    let db = QueryDatabase::new();
    let input = db.create_input::<i64>();
    db.set_input(input, 2_i64);
    let _ = db.query::<Doubled>(input);

    db.set_input(db.query_id::<Doubled>(&input), 9);
}
