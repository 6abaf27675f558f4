//! Stack-machine interpreter for IR programs
//!
//! Loading scans the instruction list once: declarations populate [`Memory`],
//! `.FUNC` markers fill the function table and `label:` markers the single
//! program-wide label table. Execution then starts just past `.FUNC main`
//! and runs until `RET` with an empty call stack, the end of the program or
//! the first fault.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use tracing::{debug, trace};

use super::memory::Memory;
use super::value::Value;
use crate::compiler::ir::{ArithOp, Form, Instruction, IrProgram, Kind, Opcode, Operand, Relation};
use crate::error::{Error, Result};
use crate::types::symbols::{is_builtin, ENTRY_POINT};

/// Entry point of a user function
#[derive(Debug, Clone)]
struct FunctionEntry {
    /// Index of the `.FUNC` marker
    start: usize,
    params: Vec<String>,
}

/// Int and float register files
#[derive(Debug, Clone, Default)]
struct Registers {
    ints: HashMap<u32, i64>,
    floats: HashMap<u32, f64>,
}

/// Saved calling context
#[derive(Debug, Clone)]
struct Frame {
    return_pc: usize,
    return_dest: Option<Operand>,
    /// Parameter values; shadow globals of the same name
    bindings: HashMap<String, Value>,
    /// Caller's registers, restored on return
    saved: Registers,
}

enum Flow {
    Continue,
    Halt,
}

/// Interpreter for one loaded program
pub struct Interpreter<'p, R, W> {
    program: &'p IrProgram,
    labels: HashMap<String, usize>,
    functions: HashMap<String, FunctionEntry>,
    memory: Memory,
    registers: Registers,
    frames: Vec<Frame>,
    pc: usize,
    steps: u64,
    step_limit: Option<u64>,
    input: R,
    output: W,
}

impl<'p, R: BufRead, W: Write> Interpreter<'p, R, W> {
    /// Load `program`, validating its layout and allocating its globals
    pub fn new(program: &'p IrProgram, input: R, output: W) -> Result<Self> {
        let mut memory = Memory::new();
        let mut labels = HashMap::new();
        let mut functions: HashMap<String, FunctionEntry> = HashMap::new();
        let mut in_functions = false;

        for (index, instr) in program.instructions.iter().enumerate() {
            let ir_line = index + 1;
            let opcode = instr.opcode();
            if opcode.is_declaration() {
                let name = name_operand(instr, 0, ir_line)?;
                if in_functions {
                    return Err(Error::DeclarationAfterFunction {
                        name: name.to_string(),
                        line: ir_line,
                    });
                }
                if memory.is_declared(name) {
                    return Err(Error::DuplicateSymbol {
                        name: name.to_string(),
                        line: ir_line,
                    });
                }
                declare(&mut memory, instr, name, ir_line)?;
                continue;
            }

            match opcode {
                Opcode::Func => {
                    in_functions = true;
                    let name = name_operand(instr, 0, ir_line)?;
                    if functions.contains_key(name) || is_builtin(name) {
                        return Err(Error::DuplicateSymbol {
                            name: name.to_string(),
                            line: ir_line,
                        });
                    }
                    let params = instr.operands()[1..]
                        .iter()
                        .filter_map(|p| p.name().map(str::to_string))
                        .collect();
                    functions.insert(
                        name.to_string(),
                        FunctionEntry {
                            start: index,
                            params,
                        },
                    );
                }
                Opcode::Label => {
                    let name = name_operand(instr, 0, ir_line)?;
                    if labels.insert(name.to_string(), index).is_some() {
                        return Err(Error::DuplicateSymbol {
                            name: name.to_string(),
                            line: ir_line,
                        });
                    }
                }
                _ => {}
            }
        }

        let main = functions.get(ENTRY_POINT).ok_or(Error::MissingMain)?;
        if !main.params.is_empty() {
            return Err(Error::MainHasParameters {
                line: main.start + 1,
            });
        }
        let pc = main.start + 1;

        debug!(
            instructions = program.len(),
            labels = labels.len(),
            functions = functions.len(),
            entry = pc,
            "program loaded"
        );

        Ok(Interpreter {
            program,
            labels,
            functions,
            memory,
            registers: Registers::default(),
            frames: Vec::new(),
            pc,
            steps: 0,
            step_limit: None,
            input,
            output,
        })
    }

    /// Fault with `StepLimitExceeded` after executing `limit` instructions
    pub fn with_step_limit(mut self, limit: Option<u64>) -> Self {
        self.step_limit = limit;
        self
    }

    /// Global memory
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Instructions executed so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Consume the interpreter, returning its output sink
    pub fn into_output(self) -> W {
        self.output
    }

    /// Execute until halt or the first fault
    pub fn run(&mut self) -> Result<()> {
        let program = self.program;
        while let Some(instr) = program.instructions.get(self.pc) {
            if let Some(limit) = self.step_limit {
                if self.steps >= limit {
                    return Err(Error::StepLimitExceeded {
                        limit,
                        line: instr.line(),
                    });
                }
            }
            self.steps += 1;
            trace!(pc = self.pc, instruction = %instr, "execute");
            self.pc += 1;

            if let Flow::Halt = self.step(instr)? {
                break;
            }
        }
        self.output.flush()?;
        debug!(steps = self.steps, "halted");
        Ok(())
    }

    fn step(&mut self, instr: &Instruction) -> Result<Flow> {
        let line = instr.line();
        let ops = instr.operands();
        match instr.opcode() {
            Opcode::VarI
            | Opcode::VarF
            | Opcode::ArrayI
            | Opcode::ArrayF
            | Opcode::Func
            | Opcode::Label => {}

            Opcode::Load(kind) => {
                let name = name_operand(instr, 1, line)?;
                let value = match self.binding(name) {
                    Some(bound) => bound.coerce(kind, line)?,
                    None => self.memory.load(name, kind, line)?,
                };
                self.write(&ops[0], value, line)?;
            }

            Opcode::Store(kind) => {
                let value = self.read(&ops[0], line)?.coerce(kind, line)?;
                let name = name_operand(instr, 1, line)?;
                match self.frames.last_mut().and_then(|f| f.bindings.get_mut(name)) {
                    Some(bound) => *bound = value.coerce(bound.kind(), line)?,
                    None => self.memory.store(name, value, line)?,
                }
            }

            Opcode::LoadImm(_) => {
                let value = self.read(&ops[1], line)?;
                self.write(&ops[0], value, line)?;
            }

            Opcode::LoadIndirect(kind) => {
                let address = self.address(ops, line)?;
                let value = self.memory.load_element(kind, address, line)?;
                self.write(&ops[0], value, line)?;
            }

            Opcode::StoreIndirect(kind) => {
                let value = self.read(&ops[0], line)?.coerce(kind, line)?;
                let address = self.address(ops, line)?;
                self.memory.store_element(address, value, line)?;
            }

            Opcode::IntToFloat => {
                let value = self.read_int(&ops[1], line)?;
                self.write(&ops[0], Value::Float(value as f64), line)?;
            }

            Opcode::Arith(op, form) => {
                let left = self.read(&ops[1], line)?;
                let right = self.read(&ops[2], line)?;
                let result = match form {
                    Form::Int | Form::IntImm => Value::Int(int_arith(
                        op,
                        left.as_int(line)?,
                        right.as_int(line)?,
                        line,
                    )?),
                    Form::Float | Form::FloatImm => {
                        Value::Float(float_arith(op, left.as_float(), right.as_float()))
                    }
                };
                self.write(&ops[0], result, line)?;
            }

            Opcode::Compare(relation, form) => {
                let left = self.read(&ops[1], line)?;
                let right = self.read(&ops[2], line)?;
                let holds = match form {
                    Form::Int | Form::IntImm => {
                        compare(relation, &left.as_int(line)?, &right.as_int(line)?)
                    }
                    Form::Float | Form::FloatImm => {
                        compare(relation, &left.as_float(), &right.as_float())
                    }
                };
                self.write(&ops[0], Value::Int(i64::from(holds)), line)?;
            }

            Opcode::And | Opcode::Or => {
                let left = self.read_int(&ops[1], line)? != 0;
                let right = self.read_int(&ops[2], line)? != 0;
                let result = match instr.opcode() {
                    Opcode::And => left && right,
                    _ => left || right,
                };
                self.write(&ops[0], Value::Int(i64::from(result)), line)?;
            }

            Opcode::Br => self.jump(name_operand(instr, 0, line)?, line)?,

            Opcode::Brz | Opcode::Brnz => {
                let value = self.read_int(&ops[0], line)?;
                let taken = match instr.opcode() {
                    Opcode::Brz => value == 0,
                    _ => value != 0,
                };
                if taken {
                    self.jump(name_operand(instr, 1, line)?, line)?;
                }
            }

            Opcode::Call => {
                let name = name_operand(instr, 0, line)?;
                self.invoke(name, &ops[1..], None, line)?;
            }

            Opcode::CallRet => {
                let name = name_operand(instr, 1, line)?;
                self.invoke(name, &ops[2..], Some(&ops[0]), line)?;
            }

            Opcode::Ret => match self.frames.pop() {
                Some(frame) => self.resume(frame),
                None => return Ok(Flow::Halt),
            },

            Opcode::RetValue(kind) => {
                let value = self.read(&ops[0], line)?.coerce(kind, line)?;
                let frame = self
                    .frames
                    .pop()
                    .ok_or(Error::ReturnFromTopLevel { line })?;
                let dest = frame.return_dest.clone();
                self.resume(frame);
                if let Some(dest) = dest {
                    self.write(&dest, value, line)?;
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn binding(&self, name: &str) -> Option<Value> {
        self.frames
            .last()
            .and_then(|frame| frame.bindings.get(name))
            .copied()
    }

    fn resume(&mut self, frame: Frame) {
        self.pc = frame.return_pc;
        self.registers = frame.saved;
    }

    fn jump(&mut self, label: &str, line: usize) -> Result<()> {
        let target = self
            .labels
            .get(label)
            .copied()
            .ok_or_else(|| Error::UnknownLabel {
                label: label.to_string(),
                line,
            })?;
        self.pc = target + 1;
        Ok(())
    }

    /// Base register plus optional immediate offset of `LOADM`/`STOREM`
    fn address(&self, ops: &[Operand], line: usize) -> Result<i64> {
        let base = self.read_int(&ops[1], line)?;
        let offset = match ops.get(2) {
            Some(offset) => self.read_int(offset, line)?,
            None => 0,
        };
        Ok(base.wrapping_add(offset))
    }

    fn invoke(
        &mut self,
        name: &str,
        args: &[Operand],
        dest: Option<&Operand>,
        line: usize,
    ) -> Result<()> {
        if is_builtin(name) {
            let result = self.builtin(name, args, line)?;
            return match (result, dest) {
                (Some(value), Some(dest)) => self.write(dest, value, line),
                (None, Some(_)) => Err(Error::ValueMismatch {
                    message: format!("{} does not return a value", name),
                    line,
                }),
                (_, None) => Ok(()),
            };
        }

        let entry = self
            .functions
            .get(name)
            .ok_or_else(|| Error::UnknownFunction {
                name: name.to_string(),
                line,
            })?;
        if entry.params.len() != args.len() {
            return Err(Error::ArityMismatch {
                function: name.to_string(),
                expected: entry.params.len(),
                found: args.len(),
                line,
            });
        }
        let start = entry.start;
        let params = entry.params.clone();

        let mut bindings = HashMap::with_capacity(args.len());
        for (param, arg) in params.into_iter().zip(args) {
            bindings.insert(param, self.read(arg, line)?);
        }
        trace!(function = name, depth = self.frames.len() + 1, "call");

        self.frames.push(Frame {
            return_pc: self.pc,
            return_dest: dest.cloned(),
            bindings,
            saved: self.registers.clone(),
        });
        self.pc = start + 1;
        Ok(())
    }

    fn builtin(&mut self, name: &str, args: &[Operand], line: usize) -> Result<Option<Value>> {
        let expected = match name {
            "printi" | "printf" | "printb" => 1,
            _ => 0,
        };
        if args.len() != expected {
            return Err(Error::ArityMismatch {
                function: name.to_string(),
                expected,
                found: args.len(),
                line,
            });
        }

        match name {
            "printi" => {
                let value = self.read_int(&args[0], line)?;
                writeln!(self.output, "printi: {}", value)?;
                Ok(None)
            }
            "printf" => {
                let value = self.read(&args[0], line)?.as_float();
                writeln!(self.output, "printf: {:?}", value)?;
                Ok(None)
            }
            "printb" => {
                let value = self.read_int(&args[0], line)? != 0;
                writeln!(self.output, "printb: {}", value)?;
                Ok(None)
            }
            "readi" => {
                let text = self.read_line()?;
                text.parse()
                    .map(|n| Some(Value::Int(n)))
                    .map_err(|_| invalid_input(name, text, line))
            }
            _ => {
                let text = self.read_line()?;
                text.parse()
                    .map(|x| Some(Value::Float(x)))
                    .map_err(|_| invalid_input(name, text, line))
            }
        }
    }

    fn read_line(&mut self) -> Result<String> {
        self.output.flush()?;
        let mut buf = String::new();
        self.input.read_line(&mut buf)?;
        Ok(buf.trim().to_string())
    }

    fn read(&self, operand: &Operand, line: usize) -> Result<Value> {
        let unknown = || Error::UnknownRegister {
            register: operand.to_string(),
            line,
        };
        match operand {
            Operand::IntReg(n) => self
                .registers
                .ints
                .get(n)
                .copied()
                .map(Value::Int)
                .ok_or_else(unknown),
            Operand::FloatReg(n) => self
                .registers
                .floats
                .get(n)
                .copied()
                .map(Value::Float)
                .ok_or_else(unknown),
            Operand::IntImm(v) => Ok(Value::Int(*v)),
            Operand::FloatImm(v) => Ok(Value::Float(*v)),
            Operand::Label(_) => Err(Error::MalformedOperand {
                operand: operand.to_string(),
                line,
            }),
        }
    }

    fn read_int(&self, operand: &Operand, line: usize) -> Result<i64> {
        self.read(operand, line)?.as_int(line)
    }

    fn write(&mut self, operand: &Operand, value: Value, line: usize) -> Result<()> {
        match operand {
            Operand::IntReg(n) => {
                let value = value.as_int(line)?;
                self.registers.ints.insert(*n, value);
            }
            Operand::FloatReg(n) => {
                self.registers.floats.insert(*n, value.as_float());
            }
            other => {
                return Err(Error::MalformedOperand {
                    operand: other.to_string(),
                    line,
                })
            }
        }
        Ok(())
    }
}

/// Allocate a global for a `.VAR`/`.ARRAY` directive
fn declare(memory: &mut Memory, instr: &Instruction, name: &str, line: usize) -> Result<()> {
    let operands = &instr.operands()[1..];
    match instr.opcode() {
        Opcode::VarI => {
            let init = match operands.first() {
                Some(Operand::IntImm(v)) => *v,
                _ => 0,
            };
            memory.declare(name, Value::Int(init));
        }
        Opcode::VarF => {
            let init = match operands.first() {
                Some(Operand::IntImm(v)) => *v as f64,
                Some(Operand::FloatImm(v)) => *v,
                _ => 0.0,
            };
            memory.declare(name, Value::Float(init));
        }
        opcode => {
            let dims = operands
                .iter()
                .map(|dim| match dim {
                    Operand::IntImm(v) if *v >= 0 => Ok(*v as usize),
                    other => Err(Error::MalformedOperand {
                        operand: other.to_string(),
                        line,
                    }),
                })
                .collect::<Result<Vec<_>>>()?;
            let leaf = match opcode {
                Opcode::ArrayF => Kind::Float,
                _ => Kind::Int,
            };
            memory.allocate_array(name, &dims, leaf);
        }
    }
    Ok(())
}

fn name_operand(instr: &Instruction, index: usize, line: usize) -> Result<&str> {
    instr
        .operand(index)
        .and_then(Operand::name)
        .ok_or_else(|| Error::OperandKind {
            opcode: instr.opcode().mnemonic(),
            operand: instr
                .operand(index)
                .map(Operand::to_string)
                .unwrap_or_default(),
            position: index + 1,
            expected: "a name".to_string(),
            line,
        })
}

fn int_arith(op: ArithOp, left: i64, right: i64, line: usize) -> Result<i64> {
    Ok(match op {
        ArithOp::Add => left.wrapping_add(right),
        ArithOp::Sub => left.wrapping_sub(right),
        ArithOp::Mul => left.wrapping_mul(right),
        ArithOp::Div => {
            if right == 0 {
                return Err(Error::DivisionByZero { line });
            }
            left.wrapping_div(right)
        }
    })
}

fn float_arith(op: ArithOp, left: f64, right: f64) -> f64 {
    match op {
        ArithOp::Add => left + right,
        ArithOp::Sub => left - right,
        ArithOp::Mul => left * right,
        ArithOp::Div => left / right,
    }
}

fn compare<T: PartialOrd>(relation: Relation, left: &T, right: &T) -> bool {
    match relation {
        Relation::Gt => left > right,
        Relation::Geq => left >= right,
        Relation::Eq => left == right,
        Relation::Neq => left != right,
    }
}

fn invalid_input(function: &str, input: String, line: usize) -> Error {
    Error::InvalidInput {
        function: function.to_string(),
        input,
        line,
    }
}

/// Load and run `program` to completion
pub fn execute<R: BufRead, W: Write>(
    program: &IrProgram,
    input: R,
    output: W,
    step_limit: Option<u64>,
) -> Result<W> {
    let mut interpreter = Interpreter::new(program, input, output)?.with_step_limit(step_limit);
    interpreter.run()?;
    Ok(interpreter.into_output())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run_with_input(text: &str, input: &str) -> Result<String> {
        let program = IrProgram::parse(text)?;
        let output = execute(&program, Cursor::new(input.to_string()), Vec::new(), Some(10_000))?;
        Ok(String::from_utf8(output).unwrap())
    }

    fn run(text: &str) -> Result<String> {
        run_with_input(text, "")
    }

    #[test]
    fn test_increment_and_print() {
        let out = run(r#"
.VARi x 5
.FUNC main
    LOADi $i0, x
    ADDIi $i1, $i0, 1
    STOREi $i1, x
    LOADi $i2, x
    CALL printi, $i2
    RET
"#)
        .unwrap();
        assert_eq!(out, "printi: 6\n");
    }

    #[test]
    fn test_parameters_shadow_globals() {
        let out = run(r#"
.VARi n 100
.FUNC twice n
    LOADi $i0, n
    MULIi $i1, $i0, 2
    RETi $i1
.FUNC main
    LOADIi $i2, 21
    CALL_RET $i3, twice, $i2
    CALL printi, $i3
    LOADi $i4, n
    CALL printi, $i4
    RET
"#)
        .unwrap();
        assert_eq!(out, "printi: 42\nprinti: 100\n");
    }

    #[test]
    fn test_recursion() {
        let out = run(r#"
.FUNC fact n
    LOADi $i0, n
    GTIi $i1, $i0, 1
    BRNZ $i1, L0
    LOADIi $i2, 1
    RETi $i2
L0:
    LOADi $i3, n
    SUBIi $i4, $i3, 1
    CALL_RET $i5, fact, $i4
    LOADi $i6, n
    MULi $i7, $i6, $i5
    RETi $i7
.FUNC main
    LOADIi $i8, 5
    CALL_RET $i9, fact, $i8
    CALL printi, $i9
    RET
"#)
        .unwrap();
        assert_eq!(out, "printi: 120\n");
    }

    #[test]
    fn test_caller_registers_survive_calls() {
        let out = run(r#"
.FUNC clobber
    LOADIi $i0, 99
    RET
.FUNC main
    LOADIi $i0, 7
    CALL clobber
    CALL printi, $i0
    RET
"#)
        .unwrap();
        assert_eq!(out, "printi: 7\n");
    }

    #[test]
    fn test_int_return_widens_into_float_destination() {
        let out = run(r#"
.FUNC three
    LOADIi $i0, 3
    RETi $i0
.FUNC main
    CALL_RET $f0, three
    CALL printf, $f0
    LOADIi $i1, 1
    CALL printb, $i1
    RET
"#)
        .unwrap();
        assert_eq!(out, "printf: 3.0\nprintb: true\n");
    }

    #[test]
    fn test_indirect_memory_with_offset() {
        let out = run(r#"
.ARRAYf m 3 4
.FUNC main
    LOADi $i0, m
    LOADMi $i1, $i0, 2
    LOADIf $f0, 2.5
    STOREMf $f0, $i1, 3
    LOADIi $i2, 3
    ADDi $i3, $i1, $i2
    LOADMf $f1, $i3
    CALL printf, $f1
    RET
"#)
        .unwrap();
        assert_eq!(out, "printf: 2.5\n");
    }

    #[test]
    fn test_read_builtins() {
        let out = run_with_input(
            r#"
.FUNC main
    CALL_RET $i0, readi
    CALL_RET $f0, readf
    CALL printi, $i0
    CALL printf, $f0
    RET
"#,
            "12\n2.5\n",
        )
        .unwrap();
        assert_eq!(out, "printi: 12\nprintf: 2.5\n");

        let err = run_with_input(".FUNC main\n    CALL_RET $i0, readi\n", "abc\n").unwrap_err();
        assert!(matches!(err, Error::InvalidInput { ref input, .. } if input == "abc"));
    }

    #[test]
    fn test_runtime_faults() {
        let err = run(".FUNC main\n    LOADIi $i0, 1 # line 4\n    CALL nosuch, $i0 # line 7\n")
            .unwrap_err();
        assert_eq!(
            err,
            Error::UnknownFunction {
                name: "nosuch".into(),
                line: 7
            }
        );

        let err = run(".FUNC main\n    BR L9\n").unwrap_err();
        assert!(matches!(err, Error::UnknownLabel { ref label, .. } if label == "L9"));

        let err = run(".FUNC main\n    CALL printi, $i3\n").unwrap_err();
        assert!(matches!(err, Error::UnknownRegister { ref register, .. } if register == "$i3"));

        let err = run(".FUNC main\n    LOADIi $i0, 1\n    RETi $i0\n").unwrap_err();
        assert!(matches!(err, Error::ReturnFromTopLevel { .. }));

        let err = run(".FUNC main\n    CALL printi\n").unwrap_err();
        assert!(matches!(err, Error::ArityMismatch { expected: 1, found: 0, .. }));

        let err = run(".FUNC main\n    LOADIi $i0, 1\n    DIVIi $i1, $i0, 0\n").unwrap_err();
        assert!(matches!(err, Error::DivisionByZero { line: 3 }));

        let err = run(".ARRAYi a 2\n.FUNC main\n    LOADi $i0, a\n    LOADMi $i1, $i0, 2\n")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAddress { address: 2, .. }));
    }

    #[test]
    fn test_float_return_into_int_destination_faults() {
        let err = run(r#"
.FUNC half
    LOADIf $f0, 0.5
    RETf $f0
.FUNC main
    CALL_RET $i0, half
    RET
"#)
        .unwrap_err();
        assert!(matches!(err, Error::ValueMismatch { .. }));
    }

    #[test]
    fn test_store_follows_slot_kind() {
        let err = run(".VARi n\n.FUNC main\n    LOADIf $f0, 1.5\n    STOREf $f0, n\n").unwrap_err();
        assert!(matches!(err, Error::ValueMismatch { line: 4, .. }));

        let err = run(r#"
.FUNC set n
    LOADIf $f0, 2.5
    STOREf $f0, n
    RET
.FUNC main
    LOADIi $i0, 1
    CALL set, $i0
    RET
"#)
        .unwrap_err();
        assert!(matches!(err, Error::ValueMismatch { line: 4, .. }));

        let out = run(r#"
.VARf w
.FUNC main
    LOADIi $i0, 3
    STOREi $i0, w
    LOADf $f0, w
    CALL printf, $f0
    RET
"#)
        .unwrap();
        assert_eq!(out, "printf: 3.0\n");
    }

    #[test]
    fn test_zero_length_array_loads() {
        let program =
            IrProgram::parse(".ARRAYi empty 0\n.VARi x 4\n.FUNC main\n    LOADi $i0, x\n    RET\n")
                .unwrap();
        let mut interpreter =
            Interpreter::new(&program, Cursor::new(String::new()), Vec::new()).unwrap();
        interpreter.run().unwrap();
        assert_eq!(interpreter.steps(), 2);
        assert!(interpreter.memory().is_declared("empty"));
    }

    #[test]
    fn test_load_time_validation() {
        let err = run(".FUNC f\n    RET\n").unwrap_err();
        assert_eq!(err, Error::MissingMain);

        let err = run(".VARi x\n.FUNC main x\n    RET\n").unwrap_err();
        assert_eq!(err, Error::MainHasParameters { line: 2 });

        let err = run(".FUNC main\n    RET\n.VARi late\n").unwrap_err();
        assert!(matches!(err, Error::DeclarationAfterFunction { line: 3, .. }));

        let err = run(".VARi x\n.VARf x\n.FUNC main\n    RET\n").unwrap_err();
        assert!(matches!(err, Error::DuplicateSymbol { line: 2, .. }));

        let err = run(".FUNC main\nL0:\nL0:\n    RET\n").unwrap_err();
        assert!(matches!(err, Error::DuplicateSymbol { ref name, .. } if name == "L0"));
    }

    #[test]
    fn test_step_limit() {
        let program = IrProgram::parse(".FUNC main\nL0:\n    BR L0\n").unwrap();
        let err = execute(&program, Cursor::new(String::new()), Vec::new(), Some(50)).unwrap_err();
        assert_eq!(err, Error::StepLimitExceeded { limit: 50, line: 3 });
    }
}
