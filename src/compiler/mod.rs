//! # Compilation Pipeline
//!
//! Chains the stages over an already parsed [`Program`]:
//!
//! ```text
//! Program → SymbolTable → TypeChecker → IrGenerator → IrProgram → Interpreter
//! ```
//!
//! Each stage stops at its first error, so a program that fails analysis never
//! produces IR and IR that fails to load never executes.
//!
//! ## Usage
//!
//! ```
//! use tiger_core::compiler::{Compiler, PipelineOptions};
//! use tiger_core::syntax::{Expression, Program, Statement};
//!
//! # fn main() -> tiger_core::Result<()> {
//! let program = Program {
//!     statements: vec![Statement::call("printi", vec![Expression::int(7)])],
//!     ..Default::default()
//! };
//! let compiler = Compiler::new(PipelineOptions::default());
//! let output = compiler.run(&program, std::io::empty(), Vec::new())?;
//! assert_eq!(String::from_utf8_lossy(&output), "printi: 7\n");
//! # Ok(())
//! # }
//! ```

pub mod ir;

pub use ir::{Instruction, IrGenerator, IrProgram, Kind, Opcode, Operand, RegisterAllocator};

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::runtime;
use crate::syntax::Program;
use crate::types::{SymbolTable, TypeChecker};

/// Pipeline options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Maximum number of instructions the interpreter may execute
    pub step_limit: Option<u64>,
    /// Log the generated IR text at debug level
    pub dump_ir: bool,
}

/// Analysis, generation and execution driver
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: PipelineOptions,
}

impl Compiler {
    /// Create a compiler with options
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    /// Options in use
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Build the symbol table and type check the whole program
    pub fn analyze(&self, program: &Program) -> Result<SymbolTable> {
        let symbols = SymbolTable::build(&program.declarations)?;
        TypeChecker::new(&symbols).check_program(program)?;
        debug!("analysis passed");
        Ok(symbols)
    }

    /// Analyze and lower a program to IR
    pub fn compile(&self, program: &Program) -> Result<IrProgram> {
        let symbols = self.analyze(program)?;
        let ir = IrGenerator::new(&symbols).generate(program)?;
        if self.options.dump_ir {
            debug!(ir = %ir, "generated IR");
        }
        Ok(ir)
    }

    /// Compile and execute a program, returning the output sink
    pub fn run<R: BufRead, W: Write>(&self, program: &Program, input: R, output: W) -> Result<W> {
        let ir = self.compile(program)?;
        self.run_ir(&ir, input, output)
    }

    /// Execute already generated (or parsed) IR
    pub fn run_ir<R: BufRead, W: Write>(&self, ir: &IrProgram, input: R, output: W) -> Result<W> {
        runtime::execute(ir, input, output, self.options.step_limit)
    }
}

/// Analyze and lower `program` with default options
pub fn compile(program: &Program) -> Result<IrProgram> {
    Compiler::default().compile(program)
}

/// Compile and execute `program`
pub fn run<R: BufRead, W: Write>(
    program: &Program,
    options: &PipelineOptions,
    input: R,
    output: W,
) -> Result<W> {
    Compiler::new(options.clone()).run(program, input, output)
}
