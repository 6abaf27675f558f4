//! # tiger-core - Semantic Analysis, IR Generation and Interpretation
//!
//! Backend and runtime for a small imperative teaching language with `int`,
//! `float` and `bool` values, fixed-size multi-dimensional arrays, functions
//! and structured control flow.
//!
//! The crate consumes an already parsed syntax tree ([`syntax::Program`]),
//! checks it, lowers it to a linear three-address IR over unbounded virtual
//! registers and runs that IR on a stack machine.
//!
//! ## Architecture
//!
//! ```text
//! Program → SymbolTable → TypeChecker → IrGenerator → IrProgram → Interpreter
//!                                                        ↕
//!                                                    IR text form
//! ```
//!
//! ### Main Components
//!
//! - [`SymbolTable`] - Resolves type aliases, globals and function signatures
//! - [`TypeChecker`] - Validates statements and expressions
//! - [`IrGenerator`] - Lowers the checked tree to [`IrProgram`]
//! - [`Interpreter`] - Executes IR against registers, frames and [`runtime::Memory`]
//! - [`Compiler`] - Chains the stages with [`PipelineOptions`]
//!
//! ## Quick Start
//!
//! ```rust
//! use tiger_core::syntax::{
//!     BinaryOp, Declarations, Expression, Ident, Literal, Lvalue, Program, Statement, TypeExpr,
//!     VarDecl,
//! };
//! use tiger_core::{Compiler, PipelineOptions};
//!
//! # fn main() -> tiger_core::Result<()> {
//! // var x : int := 5
//! // x := x + 1
//! // printi(x)
//! let program = Program {
//!     declarations: Declarations {
//!         variables: vec![VarDecl {
//!             names: vec![Ident::new("x")],
//!             ty: TypeExpr::Int,
//!             init: Some(Literal::Int(5)),
//!         }],
//!         ..Default::default()
//!     },
//!     statements: vec![
//!         Statement::assign(
//!             Lvalue::var("x"),
//!             Expression::binary(BinaryOp::Add, Expression::var("x"), Expression::int(1)),
//!         ),
//!         Statement::call("printi", vec![Expression::var("x")]),
//!     ],
//! };
//!
//! let compiler = Compiler::new(PipelineOptions::default());
//! let ir = compiler.compile(&program)?;
//! println!("{}", ir);
//!
//! let output = compiler.run_ir(&ir, std::io::empty(), Vec::new())?;
//! assert_eq!(String::from_utf8_lossy(&output), "printi: 6\n");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every stage returns [`Result`]. The first problem aborts the run; use
//! [`Error::category`] to tell semantic errors, IR format errors and runtime
//! faults apart.

#![warn(missing_docs)]

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod compiler;
pub mod error;
pub mod runtime;
pub mod syntax;
pub mod types;

// Re-export main types
pub use compiler::{Compiler, IrGenerator, IrProgram, PipelineOptions};
pub use error::{Error, ErrorCategory, Result};
pub use runtime::{Interpreter, Value};
pub use types::{SymbolTable, Type, TypeChecker};
