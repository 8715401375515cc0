//! Diagnostic values and the append-only collector shared by the solver
//! and the binder.
//!
//! Diagnostics are plain values, never control flow: semantic errors are
//! recorded in a [`DiagnosticBag`] and a placeholder value is threaded
//! through so downstream passes keep running. Rendering and source
//! locations belong to the outer compiler layers, not here.

use std::fmt;
use std::slice;

/// How severe a diagnostic is.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    /// Something worth telling the user that does not invalidate analysis.
    Warning,
    /// A semantic error; downstream passes see a sentinel value instead.
    Error,
}

/// A single user-facing message produced during analysis.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Diagnostic {
    severity: Severity,
    message: String,
}

impl Diagnostic {
    /// Create a diagnostic with an explicit severity.
    #[inline]
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    /// Create an error diagnostic.
    #[inline]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Create a warning diagnostic.
    #[inline]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// The severity of this diagnostic.
    #[inline]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The message text.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(formatter, "{prefix}: {}", self.message)
    }
}

/// Append-only sink of diagnostics, owned by a compilation session.
///
/// Iteration yields diagnostics in insertion order, so deterministic
/// producers give deterministic output.
#[derive(Default, Clone, Debug)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    /// Create an empty bag.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diagnostic.
    #[inline]
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// The number of collected diagnostics.
    #[inline]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Whether the bag is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Iterate over the diagnostics in insertion order.
    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }
}

impl<'bag> IntoIterator for &'bag DiagnosticBag {
    type Item = &'bag Diagnostic;
    type IntoIter = slice::Iter<'bag, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_preserved() {
        let mut bag = DiagnosticBag::new();
        bag.add(Diagnostic::error("first"));
        bag.add(Diagnostic::warning("second"));

        let messages: Vec<_> = bag.iter().map(Diagnostic::message).collect();
        assert_eq!(messages, ["first", "second"]);
    }

    #[test]
    fn display_includes_severity() {
        assert_eq!(
            Diagnostic::error("undefined reference to x").to_string(),
            "error: undefined reference to x"
        );
        assert_eq!(Diagnostic::warning("shadowed").to_string(), "warning: shadowed");
    }
}
