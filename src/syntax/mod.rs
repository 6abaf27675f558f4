//! Syntax tree consumed by the analysis pipeline.
//!
//! Scanning and parsing happen outside this crate; the parser hands over an
//! already-validated tree in the shape defined here. Every type derives
//! `serde` so a front end can also ship the tree as JSON.

mod ast;

pub use ast::{
    BinaryOp, CompareOp, Condition, Declarations, Expression, FunctionDecl, Ident, Literal,
    Lvalue, Param, Program, Span, Statement, TypeDecl, TypeExpr, VarDecl,
};
