//! Error types for the analysis, IR and interpreter stages

use crate::syntax::Span;
use crate::types::Type;
use thiserror::Error;

/// Pipeline errors
///
/// Every variant is fatal for the stage that raised it. Semantic errors carry
/// the source [`Span`], format errors the IR line number and runtime faults the
/// source line recorded on the faulting instruction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Semantic errors
    /// Reference to a type alias that was never declared
    ///
    /// **Example:** `var x : matrix` without `type matrix = ...`
    #[error("{span}: undeclared type `{name}`")]
    UndeclaredType {
        /// Alias name
        name: String,
        /// Position of the alias token
        span: Span,
    },

    /// Type alias that (indirectly) refers to itself
    #[error("{span}: type `{name}` is defined in terms of itself")]
    CyclicType {
        /// Alias name
        name: String,
        /// Position of the alias declaration
        span: Span,
    },

    /// Name declared twice in the same namespace
    #[error("{span}: `{name}` is already declared")]
    DuplicateDeclaration {
        /// Duplicated name
        name: String,
        /// Position of the second declaration
        span: Span,
    },

    /// Use of a variable that is neither a global nor a parameter in scope
    #[error("{span}: undeclared identifier `{name}`")]
    UndeclaredVariable {
        /// Variable name
        name: String,
        /// Position of the reference
        span: Span,
    },

    /// Call to a function that is not in the function table
    #[error("{span}: undeclared function `{name}`")]
    UndeclaredFunction {
        /// Function name
        name: String,
        /// Position of the call
        span: Span,
    },

    /// Index applied to a non-array value (or too many indices)
    #[error("{span}: `{name}` of type {found} cannot be indexed")]
    NotAnArray {
        /// Variable being indexed
        name: String,
        /// Type left after peeling the previous indices
        found: Type,
        /// Position of the variable
        span: Span,
    },

    /// Array index whose type is not int
    #[error("{span}: array index must be int, found {found}")]
    NonIntegerIndex {
        /// Index expression type
        found: Type,
        /// Position of the index expression
        span: Span,
    },

    /// Arithmetic or relational operand that is not int or float
    #[error("{span}: operator `{op}` expects int or float operands, found {found}")]
    NonNumericOperand {
        /// Operator text
        op: String,
        /// Offending operand type
        found: Type,
        /// Position of the operator
        span: Span,
    },

    /// Expression used as a condition without being bool
    #[error("{span}: condition must be bool, found {found}")]
    NonBooleanCondition {
        /// Expression type
        found: Type,
        /// Position of the expression
        span: Span,
    },

    /// Value not assignment-compatible with its destination
    ///
    /// **Triggered by:** float into int, bool into numeric, anything into an array
    #[error("{span}: cannot assign {found} to {expected}")]
    TypeMismatch {
        /// Destination type
        expected: Type,
        /// Value type
        found: Type,
        /// Position of the destination or argument
        span: Span,
    },

    /// Call with the wrong number of arguments
    #[error("{span}: `{function}` expects {expected} argument(s), found {found}")]
    ArgumentCount {
        /// Callee name
        function: String,
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        found: usize,
        /// Position of the call
        span: Span,
    },

    /// `break` outside any loop
    #[error("{span}: illegal break outside of a loop")]
    IllegalBreak {
        /// Position of the break token
        span: Span,
    },

    /// `for` over something other than a declared int variable
    #[error("{span}: loop variable `{name}` must be a declared int variable")]
    InvalidLoopVariable {
        /// Loop variable name
        name: String,
        /// Position of the loop variable
        span: Span,
    },

    /// `return expr` inside a function declared without a return type
    #[error("{span}: void function `{function}` cannot return a value")]
    ReturnInVoidFunction {
        /// Enclosing function
        function: String,
        /// Position of the return token
        span: Span,
    },

    /// `return` among the top-level statements
    #[error("{span}: return outside of a function")]
    ReturnOutsideFunction {
        /// Position of the return token
        span: Span,
    },

    /// Non-void function whose body does not end with `return`
    #[error("{span}: function `{function}` must end with a return statement")]
    MissingReturn {
        /// Function name
        function: String,
        /// Position of the function name
        span: Span,
    },

    /// Result of a void call stored into a variable
    #[error("{span}: void function `{function}` has no value to assign")]
    VoidValue {
        /// Callee name
        function: String,
        /// Position of the call
        span: Span,
    },

    // IR format errors
    /// Opcode mnemonic not in the instruction set
    #[error("IR line {line}: unknown opcode `{opcode}`")]
    UnknownOpcode {
        /// Mnemonic as written
        opcode: String,
        /// IR line number
        line: usize,
    },

    /// Operand list length outside the opcode's shape
    #[error("IR line {line}: `{opcode}` expects {expected} operand(s), found {found}")]
    OperandCount {
        /// Opcode mnemonic
        opcode: String,
        /// Human readable description of the accepted counts
        expected: String,
        /// Operands supplied
        found: usize,
        /// IR line number
        line: usize,
    },

    /// Operand whose kind does not match the opcode's shape
    #[error("IR line {line}: `{opcode}` operand {position} `{operand}` should be {expected}")]
    OperandKind {
        /// Opcode mnemonic
        opcode: String,
        /// Offending operand text
        operand: String,
        /// 1-based operand position
        position: usize,
        /// Expected operand kind
        expected: String,
        /// IR line number
        line: usize,
    },

    /// Operand text that is not a register, number or name
    #[error("IR line {line}: malformed operand `{operand}`")]
    MalformedOperand {
        /// Operand text
        operand: String,
        /// IR line number
        line: usize,
    },

    /// Variable, array, function or label declared twice in the IR
    #[error("IR line {line}: duplicate declaration of `{name}`")]
    DuplicateSymbol {
        /// Duplicated name
        name: String,
        /// IR line number
        line: usize,
    },

    /// `.VAR`/`.ARRAY` directive after the first `.FUNC`
    #[error("IR line {line}: declaration of `{name}` after function definitions began")]
    DeclarationAfterFunction {
        /// Declared name
        name: String,
        /// IR line number
        line: usize,
    },

    /// IR without a `main` function
    #[error("IR program has no `main` function")]
    MissingMain,

    /// `main` declared with parameters
    #[error("IR line {line}: `main` cannot take parameters")]
    MainHasParameters {
        /// IR line number
        line: usize,
    },

    // Runtime faults
    /// Read of a register that was never written
    #[error("line {line}: unknown register {register}")]
    UnknownRegister {
        /// Register text (`$i3`, `$f0`)
        register: String,
        /// Source line of the faulting instruction
        line: usize,
    },

    /// Array address outside every allocated chunk
    #[error("line {line}: invalid memory address {address}")]
    InvalidAddress {
        /// Flat address
        address: i64,
        /// Source line of the faulting instruction
        line: usize,
    },

    /// Branch to a label that was never defined
    #[error("line {line}: unknown label `{label}`")]
    UnknownLabel {
        /// Label name
        label: String,
        /// Source line of the faulting instruction
        line: usize,
    },

    /// Call to a name that is neither a function nor a built-in
    #[error("line {line}: unknown function `{name}`")]
    UnknownFunction {
        /// Function name
        name: String,
        /// Source line of the faulting instruction
        line: usize,
    },

    /// Load or store of an undeclared variable
    #[error("line {line}: unknown variable `{name}`")]
    UnknownVariable {
        /// Variable name
        name: String,
        /// Source line of the faulting instruction
        line: usize,
    },

    /// Runtime call with the wrong number of arguments
    #[error("line {line}: `{function}` expects {expected} argument(s), got {found}")]
    ArityMismatch {
        /// Callee name
        function: String,
        /// Expected argument count
        expected: usize,
        /// Supplied argument count
        found: usize,
        /// Source line of the faulting instruction
        line: usize,
    },

    /// Float value where an int is required
    #[error("line {line}: type mismatch: {message}")]
    ValueMismatch {
        /// What was expected and what arrived
        message: String,
        /// Source line of the faulting instruction
        line: usize,
    },

    /// Value returned while no caller frame exists
    #[error("line {line}: cannot return a value from the top level")]
    ReturnFromTopLevel {
        /// Source line of the faulting instruction
        line: usize,
    },

    /// Integer division by zero
    #[error("line {line}: division by zero")]
    DivisionByZero {
        /// Source line of the faulting instruction
        line: usize,
    },

    /// Console input that does not parse as the requested number
    #[error("line {line}: invalid input {input:?} for `{function}`")]
    InvalidInput {
        /// Built-in that was reading
        function: String,
        /// Text that was read
        input: String,
        /// Source line of the faulting instruction
        line: usize,
    },

    /// Configured instruction budget exhausted
    #[error("line {line}: step limit of {limit} instructions exceeded")]
    StepLimitExceeded {
        /// Configured limit
        limit: u64,
        /// Source line of the instruction that would have exceeded it
        line: usize,
    },

    /// Console read or write failure
    #[error("I/O error: {0}")]
    Io(String),
}

/// Stage an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Symbol table construction or type checking
    Semantic,
    /// IR construction, text parsing or program loading
    Format,
    /// Interpreter execution
    Runtime,
}

impl Error {
    /// Classify the error by pipeline stage
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::UndeclaredType { .. }
            | Error::CyclicType { .. }
            | Error::DuplicateDeclaration { .. }
            | Error::UndeclaredVariable { .. }
            | Error::UndeclaredFunction { .. }
            | Error::NotAnArray { .. }
            | Error::NonIntegerIndex { .. }
            | Error::NonNumericOperand { .. }
            | Error::NonBooleanCondition { .. }
            | Error::TypeMismatch { .. }
            | Error::ArgumentCount { .. }
            | Error::IllegalBreak { .. }
            | Error::InvalidLoopVariable { .. }
            | Error::ReturnInVoidFunction { .. }
            | Error::ReturnOutsideFunction { .. }
            | Error::MissingReturn { .. }
            | Error::VoidValue { .. } => ErrorCategory::Semantic,

            Error::UnknownOpcode { .. }
            | Error::OperandCount { .. }
            | Error::OperandKind { .. }
            | Error::MalformedOperand { .. }
            | Error::DuplicateSymbol { .. }
            | Error::DeclarationAfterFunction { .. }
            | Error::MissingMain
            | Error::MainHasParameters { .. } => ErrorCategory::Format,

            _ => ErrorCategory::Runtime,
        }
    }

    /// Source span of a semantic error
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::UndeclaredType { span, .. }
            | Error::CyclicType { span, .. }
            | Error::DuplicateDeclaration { span, .. }
            | Error::UndeclaredVariable { span, .. }
            | Error::UndeclaredFunction { span, .. }
            | Error::NotAnArray { span, .. }
            | Error::NonIntegerIndex { span, .. }
            | Error::NonNumericOperand { span, .. }
            | Error::NonBooleanCondition { span, .. }
            | Error::TypeMismatch { span, .. }
            | Error::ArgumentCount { span, .. }
            | Error::IllegalBreak { span }
            | Error::InvalidLoopVariable { span, .. }
            | Error::ReturnInVoidFunction { span, .. }
            | Error::ReturnOutsideFunction { span }
            | Error::MissingReturn { span, .. }
            | Error::VoidValue { span, .. } => Some(*span),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let semantic = Error::IllegalBreak {
            span: Span::new(3, 4),
        };
        assert_eq!(semantic.category(), ErrorCategory::Semantic);
        assert_eq!(semantic.span(), Some(Span::new(3, 4)));
        assert_eq!(
            semantic.to_string(),
            "line 3, column 4: illegal break outside of a loop"
        );

        assert_eq!(Error::MissingMain.category(), ErrorCategory::Format);

        let fault = Error::UnknownFunction {
            name: "foo".into(),
            line: 7,
        };
        assert_eq!(fault.category(), ErrorCategory::Runtime);
        assert_eq!(fault.span(), None);
        assert_eq!(fault.to_string(), "line 7: unknown function `foo`");
    }
}
