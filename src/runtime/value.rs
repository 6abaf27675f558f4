use std::fmt;

use crate::compiler::ir::Kind;
use crate::error::{Error, Result};

/// Runtime value held in a register, a memory slot or a frame binding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// 64-bit integer (also bools and addresses)
    Int(i64),
    /// 64-bit floating-point value
    Float(f64),
}

impl Value {
    /// Storage kind of this value
    pub fn kind(&self) -> Kind {
        match self {
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
        }
    }

    /// Returns the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
        }
    }

    /// Integer payload; a float is a fault
    pub fn as_int(&self, line: usize) -> Result<i64> {
        match self {
            Value::Int(n) => Ok(*n),
            Value::Float(_) => Err(Error::ValueMismatch {
                message: format!("expected int, got {}", self.type_name()),
                line,
            }),
        }
    }

    /// Float payload; ints are widened
    pub fn as_float(&self) -> f64 {
        match self {
            Value::Int(n) => *n as f64,
            Value::Float(f) => *f,
        }
    }

    /// Convert for a slot of `kind`: Int widens to Float, Float never narrows
    pub fn coerce(self, kind: Kind, line: usize) -> Result<Value> {
        match kind {
            Kind::Int => self.as_int(line).map(Value::Int),
            Kind::Float => Ok(Value::Float(self.as_float())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coercion() {
        assert_eq!(Value::Int(5).coerce(Kind::Float, 1).unwrap(), Value::Float(5.0));
        assert_eq!(Value::Int(5).coerce(Kind::Int, 1).unwrap(), Value::Int(5));
        assert!(matches!(
            Value::Float(1.5).coerce(Kind::Int, 7),
            Err(Error::ValueMismatch { line: 7, .. })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::Float(5.0).to_string(), "5.0");
    }
}
