use serde::{Deserialize, Serialize};
use std::fmt;

/// Source position of a token in the original program text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// 1-based source line (0 when the node was built synthetically)
    pub line: usize,
    /// 1-based column of the token's first character
    pub column: usize,
}

impl Span {
    /// Creates a span at the given line and column
    pub fn new(line: usize, column: usize) -> Self {
        Span { line, column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Identifier leaf: lexeme plus where it appeared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ident {
    /// Identifier text
    pub name: String,
    /// Position of the identifier token
    pub span: Span,
}

impl Ident {
    /// Identifier without a meaningful position
    pub fn new(name: impl Into<String>) -> Self {
        Ident {
            name: name.into(),
            span: Span::default(),
        }
    }

    /// Identifier located at `line`, `column`
    pub fn at(name: impl Into<String>, line: usize, column: usize) -> Self {
        Ident {
            name: name.into(),
            span: Span::new(line, column),
        }
    }
}

/// Complete program: declaration section followed by the top-level statements
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    /// Type, variable and function declarations
    pub declarations: Declarations,
    /// Top-level statements (the body of the implicit `main`)
    pub statements: Vec<Statement>,
}

/// Declaration section of a program
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Declarations {
    /// `type name = type-expr` declarations
    pub types: Vec<TypeDecl>,
    /// `var a, b : type-expr [:= literal]` declarations
    pub variables: Vec<VarDecl>,
    /// Function definitions
    pub functions: Vec<FunctionDecl>,
}

/// Type alias declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    /// Alias being introduced
    pub name: Ident,
    /// Right-hand side of the alias
    pub ty: TypeExpr,
}

/// Unresolved type expression as written in the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeExpr {
    /// `int`
    Int,
    /// `float`
    Float,
    /// `bool`
    Bool,
    /// Reference to a type alias
    Named(Ident),
    /// `array[size] of element`
    Array {
        /// Number of elements
        size: usize,
        /// Element type expression
        element: Box<TypeExpr>,
    },
}

impl TypeExpr {
    /// `array[size] of element`
    pub fn array(size: usize, element: TypeExpr) -> Self {
        TypeExpr::Array {
            size,
            element: Box::new(element),
        }
    }
}

/// Global variable declaration binding one or more names to a type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    /// Every identifier in the declaration's identifier list
    pub names: Vec<Ident>,
    /// Declared type
    pub ty: TypeExpr,
    /// Optional literal initializer shared by all names
    pub init: Option<Literal>,
}

/// Function parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name
    pub name: Ident,
    /// Parameter type
    pub ty: TypeExpr,
}

/// Function definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    /// Function name
    pub name: Ident,
    /// Ordered parameter list
    pub params: Vec<Param>,
    /// Return type, `None` for void functions
    pub ret: Option<TypeExpr>,
    /// Function body
    pub body: Vec<Statement>,
}

/// Literal constant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// Boolean literal
    Bool(bool),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(n) => write!(f, "{}", n),
            Literal::Float(x) => write!(f, "{:?}", x),
            Literal::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        };
        f.write_str(symbol)
    }
}

/// Relational operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `=`
    Eq,
    /// `<>`
    Ne,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
        };
        f.write_str(symbol)
    }
}

/// Numeric expression (factor / term / numeric-expression levels of the grammar)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Literal constant
    Literal {
        /// Literal value
        value: Literal,
        /// Position of the literal token
        span: Span,
    },
    /// Scalar or whole-array variable reference
    Variable(Ident),
    /// `name[i][j]...`, one dimension peeled per index
    ArrayAccess {
        /// Array variable being indexed
        array: Ident,
        /// Index expressions, outermost dimension first
        indices: Vec<Expression>,
    },
    /// Arithmetic operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: Box<Expression>,
        /// Right operand
        right: Box<Expression>,
        /// Position of the operator token
        span: Span,
    },
    /// Parenthesised expression
    Grouping(Box<Expression>),
}

impl Expression {
    /// Integer literal without position
    pub fn int(value: i64) -> Self {
        Expression::Literal {
            value: Literal::Int(value),
            span: Span::default(),
        }
    }

    /// Float literal without position
    pub fn float(value: f64) -> Self {
        Expression::Literal {
            value: Literal::Float(value),
            span: Span::default(),
        }
    }

    /// Boolean literal without position
    pub fn bool(value: bool) -> Self {
        Expression::Literal {
            value: Literal::Bool(value),
            span: Span::default(),
        }
    }

    /// Variable reference without position
    pub fn var(name: impl Into<String>) -> Self {
        Expression::Variable(Ident::new(name))
    }

    /// `name[indices...]`
    pub fn index(name: impl Into<String>, indices: Vec<Expression>) -> Self {
        Expression::ArrayAccess {
            array: Ident::new(name),
            indices,
        }
    }

    /// `left op right`
    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            span: Span::default(),
        }
    }

    /// `(inner)`
    pub fn group(inner: Expression) -> Self {
        Expression::Grouping(Box::new(inner))
    }

    /// Position used when reporting problems with this expression
    pub fn span(&self) -> Span {
        match self {
            Expression::Literal { span, .. } => *span,
            Expression::Variable(ident) => ident.span,
            Expression::ArrayAccess { array, .. } => array.span,
            Expression::Binary { span, .. } => *span,
            Expression::Grouping(inner) => inner.span(),
        }
    }
}

/// Boolean expression (predicate / clause / boolean-expression levels)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// `left op right`
    Compare {
        /// Relational operator
        op: CompareOp,
        /// Left operand
        left: Expression,
        /// Right operand
        right: Expression,
        /// Position of the operator token
        span: Span,
    },
    /// `left & right`
    And(Box<Condition>, Box<Condition>),
    /// `left | right`
    Or(Box<Condition>, Box<Condition>),
    /// A bool-typed expression used directly as a condition
    Value(Expression),
}

impl Condition {
    /// `left op right` without position
    pub fn compare(op: CompareOp, left: Expression, right: Expression) -> Self {
        Condition::Compare {
            op,
            left,
            right,
            span: Span::default(),
        }
    }

    /// `left & right`
    pub fn and(left: Condition, right: Condition) -> Self {
        Condition::And(Box::new(left), Box::new(right))
    }

    /// `left | right`
    pub fn or(left: Condition, right: Condition) -> Self {
        Condition::Or(Box::new(left), Box::new(right))
    }

    /// Position of the leftmost operator or operand
    pub fn span(&self) -> Span {
        match self {
            Condition::Compare { span, .. } => *span,
            Condition::And(left, _) | Condition::Or(left, _) => left.span(),
            Condition::Value(expr) => expr.span(),
        }
    }
}

/// Assignable location: a scalar variable or an indexed array element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lvalue {
    /// Variable being written
    pub name: Ident,
    /// Index expressions (empty for a plain variable)
    pub indices: Vec<Expression>,
}

impl Lvalue {
    /// Plain variable target
    pub fn var(name: impl Into<String>) -> Self {
        Lvalue {
            name: Ident::new(name),
            indices: Vec::new(),
        }
    }

    /// Indexed array element target
    pub fn index(name: impl Into<String>, indices: Vec<Expression>) -> Self {
        Lvalue {
            name: Ident::new(name),
            indices,
        }
    }
}

/// Statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// `target := value`
    Assign {
        /// Location being written
        target: Lvalue,
        /// Value expression
        value: Expression,
    },

    /// `if condition then ... [else ...] endif`
    If {
        /// Branch condition
        condition: Condition,
        /// Statements executed when the condition holds
        then_branch: Vec<Statement>,
        /// Statements executed otherwise
        else_branch: Option<Vec<Statement>>,
    },

    /// `while condition do ... enddo`
    While {
        /// Loop condition
        condition: Condition,
        /// Loop body
        body: Vec<Statement>,
    },

    /// `for variable := from to to do ... enddo` (upper bound exclusive)
    For {
        /// Declared int loop variable
        variable: Ident,
        /// Initial value
        from: Expression,
        /// Exclusive upper bound, re-evaluated every iteration
        to: Expression,
        /// Loop body
        body: Vec<Statement>,
    },

    /// `break`
    Break {
        /// Position of the break token
        span: Span,
    },

    /// `[target :=] function(args...)`
    Call {
        /// Optional location receiving the return value
        target: Option<Lvalue>,
        /// Callee name
        function: Ident,
        /// Positional arguments
        args: Vec<Expression>,
    },

    /// `return value`
    Return {
        /// Returned value
        value: Expression,
        /// Position of the return token
        span: Span,
    },
}

impl Statement {
    /// `target := value`
    pub fn assign(target: Lvalue, value: Expression) -> Self {
        Statement::Assign { target, value }
    }

    /// Call statement without a result target
    pub fn call(function: impl Into<String>, args: Vec<Expression>) -> Self {
        Statement::Call {
            target: None,
            function: Ident::new(function),
            args,
        }
    }

    /// `target := function(args...)`
    pub fn call_into(target: Lvalue, function: impl Into<String>, args: Vec<Expression>) -> Self {
        Statement::Call {
            target: Some(target),
            function: Ident::new(function),
            args,
        }
    }

    /// Position used for diagnostics and IR line annotations
    pub fn span(&self) -> Span {
        match self {
            Statement::Assign { target, .. } => target.name.span,
            Statement::If { condition, .. } | Statement::While { condition, .. } => {
                condition.span()
            }
            Statement::For { variable, .. } => variable.span,
            Statement::Break { span } | Statement::Return { span, .. } => *span,
            Statement::Call { function, .. } => function.span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_span_follows_leading_token() {
        let stmt = Statement::Assign {
            target: Lvalue {
                name: Ident::at("x", 4, 2),
                indices: Vec::new(),
            },
            value: Expression::int(1),
        };
        assert_eq!(stmt.span(), Span::new(4, 2));

        let brk = Statement::Break {
            span: Span::new(9, 5),
        };
        assert_eq!(brk.span().to_string(), "line 9, column 5");
    }

    #[test]
    fn test_grouping_reports_inner_span() {
        let expr = Expression::group(Expression::Variable(Ident::at("y", 3, 7)));
        assert_eq!(expr.span(), Span::new(3, 7));
    }

    #[test]
    fn test_tree_deserializes_from_json() {
        let json = r#"{
            "declarations": {
                "types": [],
                "variables": [
                    {"names": [{"name": "x", "span": {"line": 1, "column": 5}}],
                     "ty": "Int", "init": {"Int": 5}}
                ],
                "functions": []
            },
            "statements": [
                {"Call": {"target": null,
                          "function": {"name": "printi", "span": {"line": 2, "column": 1}},
                          "args": [{"Variable": {"name": "x", "span": {"line": 2, "column": 8}}}]}}
            ]
        }"#;

        let program: Program = serde_json::from_str(json).unwrap();
        assert_eq!(program.declarations.variables[0].init, Some(Literal::Int(5)));
        assert_eq!(program.statements[0].span(), Span::new(2, 1));
    }
}
