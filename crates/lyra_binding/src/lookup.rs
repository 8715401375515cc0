//! The result of a symbol lookup.

use crate::symbol::{OverloadSymbol, Symbol};
use lyra_diagnostics::{Diagnostic, DiagnosticBag};

/// Diagnostic for a reference that resolved to nothing.
fn undefined_reference(name: &str) -> Diagnostic {
    Diagnostic::error(format!("undefined reference to {name}"))
}

/// Accumulates candidate symbols under the shadowing rule.
///
/// The first acceptable kind wins the right to occupy the set: once any
/// non-function symbol is present, functions are rejected, and once the
/// set is collecting function overloads, non-functions are rejected. The
/// set therefore only ever holds one non-function symbol's worth of
/// candidates or a homogeneous group of functions.
///
/// Insertion order is preserved so resolution is deterministic.
#[derive(Debug, Default, Clone)]
pub struct LookupResult {
    symbols: Vec<Symbol>,
}

impl LookupResult {
    /// Create an empty result.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a result by adding every symbol in order; symbols the
    /// narrowing rule rejects are skipped.
    pub fn from_result_set(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        let mut result = Self::new();
        for symbol in symbols {
            let _ = result.add(symbol);
        }
        result
    }

    /// True if the lookup should continue walking outer scopes: nothing
    /// was found yet, or an overload set is still collecting.
    #[inline]
    pub fn should_continue(&self) -> bool {
        !self.found_any() || self.is_overload_set()
    }

    /// True if any symbol has been found.
    #[inline]
    pub fn found_any(&self) -> bool {
        !self.symbols.is_empty()
    }

    /// True if this result is collecting function overloads.
    #[inline]
    pub fn is_overload_set(&self) -> bool {
        self.symbols.first().is_some_and(Symbol::is_function)
    }

    /// The symbols found so far, in insertion order.
    #[inline]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Attempt to add a symbol to the result set.
    ///
    /// Returns true if the symbol fits the narrowing rule; a duplicate of
    /// an already-present symbol is accepted without growing the set.
    pub fn add(&mut self, symbol: Symbol) -> bool {
        if self.is_overload_set() {
            // Only further functions may join an overload set
            if !symbol.is_function() {
                return false;
            }
        } else if self.found_any() && symbol.is_function() {
            // A non-function occupies the set; it cannot become an
            // overload set anymore
            return false;
        }

        if !self.symbols.contains(&symbol) {
            self.symbols.push(symbol);
        }
        true
    }

    /// Resolve the lookup in a value context.
    ///
    /// An empty set reports an undefined reference and yields the
    /// undefined-value sentinel. Multiple symbols form an overload symbol.
    ///
    /// # Panics
    ///
    /// Panics on multiple non-function symbols - the narrowing rule makes
    /// that unreachable, so hitting it means the set was built outside
    /// [`Self::add`].
    pub fn value_symbol(&self, name: &str, diagnostics: &mut DiagnosticBag) -> Symbol {
        if !self.found_any() {
            diagnostics.add(undefined_reference(name));
            return Symbol::UndefinedValue(name.to_owned());
        }
        if self.symbols.len() > 1 {
            assert!(
                self.is_overload_set(),
                "multiple non-overloadable symbols for {name} in a value context",
            );
            let functions = self
                .symbols
                .iter()
                .map(|symbol| match symbol {
                    Symbol::Function(function) => function.clone(),
                    _ => unreachable!("overload set contains a non-function"),
                })
                .collect();
            return Symbol::Overload(OverloadSymbol { functions });
        }
        self.symbols[0].clone()
    }

    /// Resolve the lookup in a type context.
    ///
    /// # Panics
    ///
    /// Panics on more than one symbol; scope construction keeps type
    /// lookups unambiguous before they reach this point.
    pub fn type_symbol(&self, name: &str, diagnostics: &mut DiagnosticBag) -> Symbol {
        if !self.found_any() {
            diagnostics.add(undefined_reference(name));
            return Symbol::UndefinedType(name.to_owned());
        }
        assert!(
            self.symbols.len() == 1,
            "ambiguous type reference to {name}",
        );
        self.symbols[0].clone()
    }

    /// Resolve the lookup in a label context.
    ///
    /// # Panics
    ///
    /// Panics on more than one symbol, or when the single symbol is not a
    /// label - both indicate a scope built wrong, not bad user input.
    pub fn label_symbol(&self, name: &str, diagnostics: &mut DiagnosticBag) -> Symbol {
        if !self.found_any() {
            diagnostics.add(undefined_reference(name));
            return Symbol::UndefinedLabel(name.to_owned());
        }
        assert!(
            self.symbols.len() == 1,
            "ambiguous label reference to {name}",
        );
        let symbol = &self.symbols[0];
        assert!(
            matches!(symbol, Symbol::Label(_)),
            "label reference to {name} resolved to a non-label",
        );
        symbol.clone()
    }
}
