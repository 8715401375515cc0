//! Symbols produced by binding.
//!
//! The kind set is closed: functions (the only overloadable kind), the
//! non-overloadable value/type/label kinds, the overload set built by
//! lookup, and the undefined sentinels threaded through downstream passes
//! after a failed lookup so analysis can continue.

/// A function declaration. Functions may overload each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSymbol {
    pub name: String,
    /// Number of parameters; overloads of one name differ here.
    pub arity: usize,
}

/// A bound variable or parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableSymbol {
    pub name: String,
}

/// A named type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeSymbol {
    pub name: String,
}

/// A jump target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelSymbol {
    pub name: String,
}

/// A set of function overloads sharing one name; built by lookup, holds
/// at least two functions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OverloadSymbol {
    pub functions: Vec<FunctionSymbol>,
}

/// A named entity a lookup can resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    Function(FunctionSymbol),
    Variable(VariableSymbol),
    Type(TypeSymbol),
    Label(LabelSymbol),
    Overload(OverloadSymbol),
    /// Error sentinel for a reference that resolved to nothing in a value
    /// context.
    UndefinedValue(String),
    /// Error sentinel for an unresolved type reference.
    UndefinedType(String),
    /// Error sentinel for an unresolved label reference.
    UndefinedLabel(String),
}

impl Symbol {
    /// Whether the symbol may participate in an overload set.
    #[inline]
    pub const fn is_function(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    /// Whether the symbol is an error sentinel.
    #[inline]
    pub const fn is_error(&self) -> bool {
        matches!(
            self,
            Self::UndefinedValue(_) | Self::UndefinedType(_) | Self::UndefinedLabel(_)
        )
    }

    /// The declared or referenced name.
    pub fn name(&self) -> &str {
        match self {
            Self::Function(function) => &function.name,
            Self::Variable(variable) => &variable.name,
            Self::Type(ty) => &ty.name,
            Self::Label(label) => &label.name,
            Self::Overload(overload) => &overload.functions[0].name,
            Self::UndefinedValue(name) | Self::UndefinedType(name) | Self::UndefinedLabel(name) => {
                name
            }
        }
    }
}
