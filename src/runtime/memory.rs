//! Global storage: named scalars plus flat per-kind array address spaces
//!
//! Arrays live in chunk lists. An address is resolved by walking the chunks
//! of its kind and subtracting each chunk's length until it lands inside one,
//! so every chunk of a kind shares one contiguous address range.
//!
//! A declared `array[3] of array[4] of float` becomes one int chunk of three
//! base addresses plus three float chunks of four values each. The array's
//! name is an int scalar holding the outer chunk's address.

use std::collections::HashMap;

use super::value::Value;
use crate::compiler::ir::Kind;
use crate::error::{Error, Result};

/// Append-only list of fixed-length chunks forming one address space
#[derive(Debug, Clone, Default)]
pub struct ChunkList<T> {
    chunks: Vec<Vec<T>>,
    len: usize,
}

impl<T: Copy + Default> ChunkList<T> {
    /// Empty address space
    pub fn new() -> Self {
        ChunkList {
            chunks: Vec::new(),
            len: 0,
        }
    }

    /// Append a zeroed chunk, returning its base address
    pub fn allocate(&mut self, length: usize) -> i64 {
        let base = self.len as i64;
        self.chunks.push(vec![T::default(); length]);
        self.len += length;
        base
    }

    /// Total number of slots across all chunks
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if nothing has been allocated
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// (chunk, offset) holding `address`
    fn resolve(&self, address: i64) -> Option<(usize, usize)> {
        let mut rest = usize::try_from(address).ok()?;
        for (index, chunk) in self.chunks.iter().enumerate() {
            if rest < chunk.len() {
                return Some((index, rest));
            }
            rest -= chunk.len();
        }
        None
    }

    /// Value at `address`
    pub fn load(&self, address: i64) -> Option<T> {
        let (chunk, offset) = self.resolve(address)?;
        Some(self.chunks[chunk][offset])
    }

    /// Overwrite the slot at `address`; `None` when it is out of range
    pub fn store(&mut self, address: i64, value: T) -> Option<()> {
        let (chunk, offset) = self.resolve(address)?;
        self.chunks[chunk][offset] = value;
        Some(())
    }
}

/// Memory of one interpreter run
#[derive(Debug, Clone, Default)]
pub struct Memory {
    ints: HashMap<String, i64>,
    floats: HashMap<String, f64>,
    int_chunks: ChunkList<i64>,
    float_chunks: ChunkList<f64>,
}

impl Memory {
    /// Empty memory
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a scalar, initialised to `init`
    pub fn declare(&mut self, name: &str, init: Value) {
        match init {
            Value::Int(n) => {
                self.ints.insert(name.to_string(), n);
            }
            Value::Float(x) => {
                self.floats.insert(name.to_string(), x);
            }
        }
    }

    /// Check if a scalar of either kind named `name` exists
    pub fn is_declared(&self, name: &str) -> bool {
        self.ints.contains_key(name) || self.floats.contains_key(name)
    }

    /// Allocate an array with the given dimension sizes and bind `name` to
    /// its base address
    pub fn allocate_array(&mut self, name: &str, dims: &[usize], leaf: Kind) -> i64 {
        let base = self.allocate_dims(dims, leaf);
        self.ints.insert(name.to_string(), base);
        base
    }

    fn allocate_dims(&mut self, dims: &[usize], leaf: Kind) -> i64 {
        match dims {
            [] => self.int_chunks.allocate(0),
            [size] => match leaf {
                Kind::Int => self.int_chunks.allocate(*size),
                Kind::Float => self.float_chunks.allocate(*size),
            },
            [size, inner @ ..] => {
                let base = self.int_chunks.allocate(*size);
                let chunk = self.int_chunks.chunks.len() - 1;
                for slot in 0..*size {
                    let child = self.allocate_dims(inner, leaf);
                    self.int_chunks.chunks[chunk][slot] = child;
                }
                base
            }
        }
    }

    /// Read the scalar `name` as `kind`
    pub fn load(&self, name: &str, kind: Kind, line: usize) -> Result<Value> {
        let found = match kind {
            Kind::Int => self.ints.get(name).copied().map(Value::Int),
            Kind::Float => self.floats.get(name).copied().map(Value::Float),
        };
        found.ok_or_else(|| Error::UnknownVariable {
            name: name.to_string(),
            line,
        })
    }

    /// Write a declared scalar, converting to its declared kind
    pub fn store(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if let Some(slot) = self.ints.get_mut(name) {
            *slot = value.as_int(line)?;
        } else if let Some(slot) = self.floats.get_mut(name) {
            *slot = value.as_float();
        } else {
            return Err(Error::UnknownVariable {
                name: name.to_string(),
                line,
            });
        }
        Ok(())
    }

    /// Read the array slot at `address` in the `kind` address space
    pub fn load_element(&self, kind: Kind, address: i64, line: usize) -> Result<Value> {
        let found = match kind {
            Kind::Int => self.int_chunks.load(address).map(Value::Int),
            Kind::Float => self.float_chunks.load(address).map(Value::Float),
        };
        found.ok_or(Error::InvalidAddress { address, line })
    }

    /// Write the array slot at `address` in the value's address space
    pub fn store_element(&mut self, address: i64, value: Value, line: usize) -> Result<()> {
        let stored = match value {
            Value::Int(n) => self.int_chunks.store(address, n),
            Value::Float(x) => self.float_chunks.store(address, x),
        };
        stored.ok_or(Error::InvalidAddress { address, line })
    }
}
