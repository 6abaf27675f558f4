//! IR program and its text form

use super::instruction::{Instruction, Opcode, Operand};
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Complete IR program: declarations, then function blocks, in linear order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IrProgram {
    /// All instructions in linear order
    pub instructions: Vec<Instruction>,
}

impl IrProgram {
    /// Wrap an instruction list
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Number of instructions (directives and labels included)
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Check if the program has no instructions
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Instructions using `opcode`
    pub fn with_opcode(&self, opcode: Opcode) -> impl Iterator<Item = &Instruction> {
        self.instructions
            .iter()
            .filter(move |instr| instr.opcode() == opcode)
    }

    /// Parse the newline-separated text form
    ///
    /// Each line is a directive, a `label:` marker or an opcode followed by
    /// comma/space separated operands. A trailing `# line N` comment restores
    /// the originating source line; without it the IR line number is used.
    pub fn parse(text: &str) -> Result<Self> {
        let mut instructions = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            if let Some(instr) = parse_line(raw, index + 1)? {
                instructions.push(instr);
            }
        }
        Ok(Self { instructions })
    }
}

impl FromStr for IrProgram {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        IrProgram::parse(text)
    }
}

impl fmt::Display for IrProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instr in &self.instructions {
            writeln!(f, "{}", instr)?;
        }
        Ok(())
    }
}

fn parse_line(raw: &str, ir_line: usize) -> Result<Option<Instruction>> {
    let (code, comment) = match raw.split_once('#') {
        Some((code, comment)) => (code, Some(comment)),
        None => (raw, None),
    };
    let code = code.trim();
    if code.is_empty() {
        return Ok(None);
    }

    let line = comment
        .and_then(|c| c.trim().strip_prefix("line"))
        .and_then(|n| n.trim().parse().ok())
        .unwrap_or(ir_line);

    if let Some(label) = code.strip_suffix(':') {
        let operand = Operand::parse(label.trim(), ir_line)?;
        return Instruction::new(Opcode::Label, vec![operand], ir_line)
            .map(|instr| Some(instr.at_line(line)));
    }

    let mut tokens = code
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty());
    let mnemonic = tokens.next().unwrap_or_default();
    let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| Error::UnknownOpcode {
        opcode: mnemonic.to_string(),
        line: ir_line,
    })?;

    let operands = tokens
        .map(|token| Operand::parse(token, ir_line))
        .collect::<Result<Vec<_>>>()?;

    // Shape errors report the IR line; the instruction keeps its source line.
    let instr = Instruction::new(opcode, operands, ir_line)?;
    Ok(Some(instr.at_line(line)))
}
