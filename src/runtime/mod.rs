//! Runtime execution of IR programs on a stack-based virtual machine

mod interpreter;
mod memory;
mod value;

pub use interpreter::{execute, Interpreter};
pub use memory::{ChunkList, Memory};
pub use value::Value;
