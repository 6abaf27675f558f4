//! # Intermediate Representation (IR)
//!
//! Linear three-address code over an unbounded supply of virtual registers.
//! Produced by [`IrGenerator`] from a checked syntax tree, executed by the
//! interpreter in [`crate::runtime`].
//!
//! ## Module Structure
//!
//! ```text
//! ir/
//! ├── mod.rs          # This file - module definition and re-exports
//! ├── instruction.rs  # Operand, Opcode, operand shapes, Instruction
//! ├── program.rs      # IrProgram and its text form
//! └── generator.rs    # RegisterAllocator, IrGenerator
//! ```
//!
//! ## Text Form
//!
//! ```text
//! .VARi x 5 # line 1
//! .FUNC main # line 2
//!     LOADi $i0, x # line 2
//!     ADDIi $i1, $i0, 1 # line 2
//!     STOREi $i1, x # line 2
//!     CALL printi, $i1 # line 3
//!     RET # line 3
//! ```
//!
//! Opcode suffixes name the operand form: `i`/`f` for register-register,
//! `Ii`/`If` for register-immediate. Comparisons always write an int register.

pub mod generator;
pub mod instruction;
pub mod program;

pub use generator::{IrGenerator, RegisterAllocator};
pub use instruction::{
    ArithOp, Form, Instruction, Kind, Opcode, Operand, OperandKind, Relation, Shape, Slot, Tail,
};
pub use program::IrProgram;
