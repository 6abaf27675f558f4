//! # Source-Level Type System
//!
//! Every value in the language has one of four base types:
//!
//! | Type | Written as | Notes |
//! |------|------------|-------|
//! | `Int` | `int` | 64-bit signed |
//! | `Float` | `float` | 64-bit IEEE |
//! | `Bool` | `bool` | stored as 0/1 in int slots |
//! | `Array` | `array[N] of T` | fixed size, nests for multiple dimensions |
//!
//! Type aliases (`type matrix = array[3] of array[4] of int`) are resolved away
//! by the [`SymbolTable`] before anything else looks at a type, so the rest of
//! the pipeline only ever sees base types.
//!
//! ## Assignment Compatibility
//!
//! A value of type `S` may be stored into a location of type `T` when `S == T`,
//! or when `S` is `Int` and `T` is `Float` (implicit widening). Array locations
//! never accept a value, so arrays cannot be assigned, initialised or passed.

pub mod checker;
pub mod symbols;

pub use checker::TypeChecker;
pub use symbols::{FunctionSig, Scope, SymbolTable};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fully resolved (base) type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// Signed 64-bit integer
    Int,
    /// 64-bit floating point
    Float,
    /// Boolean
    Bool,
    /// Fixed-size array
    Array {
        /// Type of each element (itself an array for extra dimensions)
        element: Box<Type>,
        /// Number of elements
        size: usize,
    },
}

impl Type {
    /// `array[size] of element`
    pub fn array(element: Type, size: usize) -> Self {
        Type::Array {
            element: Box::new(element),
            size,
        }
    }

    /// Int or Float
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    /// Check if this type is an array
    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    /// Element type of an array, `None` for scalars
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Sizes of every dimension, outermost first (empty for scalars)
    pub fn dimensions(&self) -> Vec<usize> {
        let mut dims = Vec::new();
        let mut current = self;
        while let Type::Array { element, size } = current {
            dims.push(*size);
            current = element;
        }
        dims
    }

    /// Innermost non-array type
    pub fn leaf(&self) -> &Type {
        let mut current = self;
        while let Type::Array { element, .. } = current {
            current = element;
        }
        current
    }

    /// Whether a value of type `source` may be stored into a location of this type
    pub fn accepts(&self, source: &Type) -> bool {
        match (self, source) {
            (Type::Array { .. }, _) => false,
            (Type::Float, Type::Int) => true,
            (target, source) => target == source,
        }
    }

    /// Result type of `+ - * /` on two numeric operands
    pub fn arithmetic_result(left: &Type, right: &Type) -> Type {
        if *left == Type::Float || *right == Type::Float {
            Type::Float
        } else {
            Type::Int
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Bool => write!(f, "bool"),
            Type::Array { element, size } => write!(f, "array[{}] of {}", size, element),
        }
    }
}
