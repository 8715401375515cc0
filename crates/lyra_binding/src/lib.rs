//! Symbol lookup and binding-layer result types for the Lyra front end.
//!
//! The binder walks scopes collecting candidate symbols into a
//! [`LookupResult`], which enforces the shadowing rule between
//! overloadable functions and everything else, and resolves the final set
//! to a symbol - or to an error sentinel plus a diagnostic, so downstream
//! passes keep running after a failed lookup.

mod lookup;
mod symbol;

// Re-exports
pub use lookup::LookupResult;
pub use symbol::{
    FunctionSymbol, LabelSymbol, OverloadSymbol, Symbol, TypeSymbol, VariableSymbol,
};
