//! IR instruction definitions
//!
//! Operands are typed values internally; their text spelling (`$i7`, `$f2`,
//! `42`, `1.5`, `L3`) only exists at the format boundary in [`Operand::parse`]
//! and the `Display` impls.

use crate::error::{Error, Result};
use crate::types::Type;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

/// Value kind of a register, immediate or memory slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Integer (also used for bools and array addresses)
    Int,
    /// Floating point
    Float,
}

impl Kind {
    /// Storage kind of a base type
    pub fn of(ty: &Type) -> Kind {
        match ty {
            Type::Float => Kind::Float,
            Type::Int | Type::Bool | Type::Array { .. } => Kind::Int,
        }
    }

    /// Mnemonic suffix: `i` or `f`
    pub fn suffix(self) -> &'static str {
        match self {
            Kind::Int => "i",
            Kind::Float => "f",
        }
    }
}

/// Instruction operand
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Virtual int register `$iN`
    IntReg(u32),
    /// Virtual float register `$fN`
    FloatReg(u32),
    /// Integer immediate
    IntImm(i64),
    /// Float immediate
    FloatImm(f64),
    /// Label, function or variable name
    Label(String),
}

/// Operand category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// `$iN`
    IntReg,
    /// `$fN`
    FloatReg,
    /// integer literal
    IntImm,
    /// float literal
    FloatImm,
    /// identifier
    Label,
}

lazy_static! {
    static ref INT_REG: Regex = Regex::new(r"^\$i(\d+)$").expect("int register pattern");
    static ref FLOAT_REG: Regex = Regex::new(r"^\$f(\d+)$").expect("float register pattern");
    static ref INT_IMM: Regex = Regex::new(r"^-?\d+$").expect("int immediate pattern");
    static ref FLOAT_IMM: Regex =
        Regex::new(r"^-?(\d+\.\d*|\.\d+|\d+(\.\d*)?[eE][-+]?\d+|\.\d+[eE][-+]?\d+)$")
            .expect("float immediate pattern");
    static ref NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("name pattern");
}

impl Operand {
    /// Category of this operand
    pub fn kind(&self) -> OperandKind {
        match self {
            Operand::IntReg(_) => OperandKind::IntReg,
            Operand::FloatReg(_) => OperandKind::FloatReg,
            Operand::IntImm(_) => OperandKind::IntImm,
            Operand::FloatImm(_) => OperandKind::FloatImm,
            Operand::Label(_) => OperandKind::Label,
        }
    }

    /// Check if this operand is an immediate
    pub fn is_immediate(&self) -> bool {
        matches!(self, Operand::IntImm(_) | Operand::FloatImm(_))
    }

    /// Name carried by a label operand
    pub fn name(&self) -> Option<&str> {
        match self {
            Operand::Label(name) => Some(name),
            _ => None,
        }
    }

    /// Decode one operand from its text form
    pub fn parse(text: &str, line: usize) -> Result<Operand> {
        let malformed = || Error::MalformedOperand {
            operand: text.to_string(),
            line,
        };

        if let Some(caps) = INT_REG.captures(text) {
            return caps[1].parse().map(Operand::IntReg).map_err(|_| malformed());
        }
        if let Some(caps) = FLOAT_REG.captures(text) {
            return caps[1].parse().map(Operand::FloatReg).map_err(|_| malformed());
        }
        if INT_IMM.is_match(text) {
            return text.parse().map(Operand::IntImm).map_err(|_| malformed());
        }
        if FLOAT_IMM.is_match(text) {
            return text.parse().map(Operand::FloatImm).map_err(|_| malformed());
        }
        if NAME.is_match(text) {
            return Ok(Operand::Label(text.to_string()));
        }
        Err(malformed())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::IntReg(n) => write!(f, "$i{}", n),
            Operand::FloatReg(n) => write!(f, "$f{}", n),
            Operand::IntImm(v) => write!(f, "{}", v),
            Operand::FloatImm(v) => write!(f, "{:?}", v),
            Operand::Label(name) => f.write_str(name),
        }
    }
}

/// Arithmetic operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    /// `ADD`
    Add,
    /// `SUB`
    Sub,
    /// `MUL`
    Mul,
    /// `DIV`
    Div,
}

/// Comparison producing 0 or 1; `<` and `<=` are expressed with swapped operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// `GT`
    Gt,
    /// `GEQ`
    Geq,
    /// `EQ`
    Eq,
    /// `NEQ`
    Neq,
}

/// Operand form of a binary instruction, selected from the final operand kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Form {
    /// int register, int register
    Int,
    /// float register, float register
    Float,
    /// int register, int immediate
    IntImm,
    /// float register, float immediate
    FloatImm,
}

impl Form {
    /// Form for a left register and right operand of the given kind
    pub fn select(kind: Kind, right: &Operand) -> Form {
        match (kind, right.is_immediate()) {
            (Kind::Int, false) => Form::Int,
            (Kind::Int, true) => Form::IntImm,
            (Kind::Float, false) => Form::Float,
            (Kind::Float, true) => Form::FloatImm,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Form::Int => "i",
            Form::Float => "f",
            Form::IntImm => "Ii",
            Form::FloatImm => "If",
        }
    }
}

const ARITH_OPS: [ArithOp; 4] = [ArithOp::Add, ArithOp::Sub, ArithOp::Mul, ArithOp::Div];
const RELATIONS: [Relation; 4] = [Relation::Gt, Relation::Geq, Relation::Eq, Relation::Neq];
const FORMS: [Form; 4] = [Form::Int, Form::Float, Form::IntImm, Form::FloatImm];
const KINDS: [Kind; 2] = [Kind::Int, Kind::Float];

/// Opcode set, directives and the label marker included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// `.VARi name [init]`
    VarI,
    /// `.VARf name [init]`
    VarF,
    /// `.ARRAYi name dim...`
    ArrayI,
    /// `.ARRAYf name dim...`
    ArrayF,
    /// `.FUNC name [param...]`
    Func,
    /// `name:`
    Label,
    /// `LOADx dst, var`
    Load(Kind),
    /// `STOREx src, var`
    Store(Kind),
    /// `LOADIx dst, imm`
    LoadImm(Kind),
    /// `LOADMx dst, addr [, offset]`
    LoadIndirect(Kind),
    /// `STOREMx src, addr [, offset]`
    StoreIndirect(Kind),
    /// `ITOF $f, $i`
    IntToFloat,
    /// `ADD`/`SUB`/`MUL`/`DIV`
    Arith(ArithOp, Form),
    /// `GT`/`GEQ`/`EQ`/`NEQ`, result in an int register
    Compare(Relation, Form),
    /// Logical and of two 0/1 registers
    And,
    /// Logical or of two 0/1 registers
    Or,
    /// Unconditional branch
    Br,
    /// Branch if zero
    Brz,
    /// Branch if not zero
    Brnz,
    /// Call discarding any result
    Call,
    /// Call delivering one result into a destination register
    CallRet,
    /// Return without value (halts at top level)
    Ret,
    /// `RETi`/`RETf`
    RetValue(Kind),
}

lazy_static! {
    static ref MNEMONICS: HashMap<String, Opcode> = Opcode::all()
        .into_iter()
        .filter(|op| *op != Opcode::Label)
        .map(|op| (op.mnemonic(), op))
        .collect();
}

impl Opcode {
    /// Every opcode, in a stable order
    pub fn all() -> Vec<Opcode> {
        let mut all = vec![
            Opcode::VarI,
            Opcode::VarF,
            Opcode::ArrayI,
            Opcode::ArrayF,
            Opcode::Func,
            Opcode::Label,
        ];
        for kind in KINDS {
            all.extend([
                Opcode::Load(kind),
                Opcode::Store(kind),
                Opcode::LoadImm(kind),
                Opcode::LoadIndirect(kind),
                Opcode::StoreIndirect(kind),
                Opcode::RetValue(kind),
            ]);
        }
        all.push(Opcode::IntToFloat);
        for form in FORMS {
            all.extend(ARITH_OPS.iter().map(|op| Opcode::Arith(*op, form)));
            all.extend(RELATIONS.iter().map(|rel| Opcode::Compare(*rel, form)));
        }
        all.extend([
            Opcode::And,
            Opcode::Or,
            Opcode::Br,
            Opcode::Brz,
            Opcode::Brnz,
            Opcode::Call,
            Opcode::CallRet,
            Opcode::Ret,
        ]);
        all
    }

    /// Look up an opcode by its text mnemonic
    pub fn from_mnemonic(text: &str) -> Option<Opcode> {
        MNEMONICS.get(text).copied()
    }

    /// Text mnemonic
    pub fn mnemonic(&self) -> String {
        match self {
            Opcode::VarI => ".VARi".into(),
            Opcode::VarF => ".VARf".into(),
            Opcode::ArrayI => ".ARRAYi".into(),
            Opcode::ArrayF => ".ARRAYf".into(),
            Opcode::Func => ".FUNC".into(),
            Opcode::Label => "label".into(),
            Opcode::Load(k) => format!("LOAD{}", k.suffix()),
            Opcode::Store(k) => format!("STORE{}", k.suffix()),
            Opcode::LoadImm(k) => format!("LOADI{}", k.suffix()),
            Opcode::LoadIndirect(k) => format!("LOADM{}", k.suffix()),
            Opcode::StoreIndirect(k) => format!("STOREM{}", k.suffix()),
            Opcode::IntToFloat => "ITOF".into(),
            Opcode::Arith(op, form) => {
                let base = match op {
                    ArithOp::Add => "ADD",
                    ArithOp::Sub => "SUB",
                    ArithOp::Mul => "MUL",
                    ArithOp::Div => "DIV",
                };
                format!("{}{}", base, form.suffix())
            }
            Opcode::Compare(rel, form) => {
                let base = match rel {
                    Relation::Gt => "GT",
                    Relation::Geq => "GEQ",
                    Relation::Eq => "EQ",
                    Relation::Neq => "NEQ",
                };
                format!("{}{}", base, form.suffix())
            }
            Opcode::And => "AND".into(),
            Opcode::Or => "OR".into(),
            Opcode::Br => "BR".into(),
            Opcode::Brz => "BRZ".into(),
            Opcode::Brnz => "BRNZ".into(),
            Opcode::Call => "CALL".into(),
            Opcode::CallRet => "CALL_RET".into(),
            Opcode::Ret => "RET".into(),
            Opcode::RetValue(k) => format!("RET{}", k.suffix()),
        }
    }

    /// Check if this is a `.VAR`/`.ARRAY`/`.FUNC` directive
    pub fn is_directive(&self) -> bool {
        matches!(
            self,
            Opcode::VarI | Opcode::VarF | Opcode::ArrayI | Opcode::ArrayF | Opcode::Func
        )
    }

    /// Check if this is a global variable or array declaration
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            Opcode::VarI | Opcode::VarF | Opcode::ArrayI | Opcode::ArrayF
        )
    }

    /// Operand shape this opcode's operand list must satisfy
    pub fn shape(&self) -> Shape {
        use Slot::*;
        let (fixed, tail): (&'static [Slot], Tail) = match self {
            Opcode::VarI => (&[Name], Tail::Optional(IntImm)),
            Opcode::VarF => (&[Name], Tail::Optional(Number)),
            Opcode::ArrayI | Opcode::ArrayF => (&[Name], Tail::Repeated(IntImm, 1)),
            Opcode::Func => (&[Name], Tail::Repeated(Name, 0)),
            Opcode::Label | Opcode::Br => (&[Name], Tail::None),
            Opcode::Load(Kind::Int) | Opcode::Store(Kind::Int) => (&[IntReg, Name], Tail::None),
            Opcode::Load(Kind::Float) | Opcode::Store(Kind::Float) => {
                (&[FloatReg, Name], Tail::None)
            }
            Opcode::LoadImm(Kind::Int) => (&[IntReg, IntImm], Tail::None),
            Opcode::LoadImm(Kind::Float) => (&[FloatReg, FloatImm], Tail::None),
            Opcode::LoadIndirect(Kind::Int) | Opcode::StoreIndirect(Kind::Int) => {
                (&[IntReg, IntReg], Tail::Optional(IntImm))
            }
            Opcode::LoadIndirect(Kind::Float) | Opcode::StoreIndirect(Kind::Float) => {
                (&[FloatReg, IntReg], Tail::Optional(IntImm))
            }
            Opcode::IntToFloat => (&[FloatReg, IntReg], Tail::None),
            Opcode::Arith(_, Form::Int) | Opcode::Compare(_, Form::Int) => {
                (&[IntReg, IntReg, IntReg], Tail::None)
            }
            Opcode::Arith(_, Form::IntImm) | Opcode::Compare(_, Form::IntImm) => {
                (&[IntReg, IntReg, IntImm], Tail::None)
            }
            Opcode::Arith(_, Form::Float) => (&[FloatReg, FloatReg, FloatReg], Tail::None),
            Opcode::Arith(_, Form::FloatImm) => (&[FloatReg, FloatReg, FloatImm], Tail::None),
            Opcode::Compare(_, Form::Float) => (&[IntReg, FloatReg, FloatReg], Tail::None),
            Opcode::Compare(_, Form::FloatImm) => (&[IntReg, FloatReg, FloatImm], Tail::None),
            Opcode::And | Opcode::Or => (&[IntReg, IntReg, IntReg], Tail::None),
            Opcode::Brz | Opcode::Brnz => (&[IntReg, Name], Tail::None),
            Opcode::Call => (&[Name], Tail::Repeated(AnyReg, 0)),
            Opcode::CallRet => (&[AnyReg, Name], Tail::Repeated(AnyReg, 0)),
            Opcode::Ret => (&[], Tail::None),
            Opcode::RetValue(Kind::Int) => (&[IntReg], Tail::None),
            Opcode::RetValue(Kind::Float) => (&[FloatReg], Tail::None),
        };
        Shape { fixed, tail }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mnemonic())
    }
}

/// Operand category accepted at one position of a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// `$iN`
    IntReg,
    /// `$fN`
    FloatReg,
    /// `$iN` or `$fN`
    AnyReg,
    /// integer immediate
    IntImm,
    /// float immediate
    FloatImm,
    /// integer or float immediate
    Number,
    /// label, function or variable name
    Name,
}

impl Slot {
    fn accepts(self, operand: &Operand) -> bool {
        use OperandKind as K;
        match (self, operand.kind()) {
            (Slot::IntReg, K::IntReg) | (Slot::FloatReg, K::FloatReg) => true,
            (Slot::AnyReg, K::IntReg | K::FloatReg) => true,
            (Slot::IntImm, K::IntImm) | (Slot::FloatImm, K::FloatImm) => true,
            (Slot::Number, K::IntImm | K::FloatImm) => true,
            (Slot::Name, K::Label) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Slot::IntReg => "an int register",
            Slot::FloatReg => "a float register",
            Slot::AnyReg => "a register",
            Slot::IntImm => "an int immediate",
            Slot::FloatImm => "a float immediate",
            Slot::Number => "a numeric immediate",
            Slot::Name => "a name",
        };
        f.write_str(text)
    }
}

/// What may follow the fixed operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tail {
    /// Nothing
    None,
    /// At most one more operand
    Optional(Slot),
    /// Any number of operands, at least the given minimum
    Repeated(Slot, usize),
}

/// Ordered operand shape of an opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    /// Operands that must always be present
    pub fixed: &'static [Slot],
    /// Trailing operands
    pub tail: Tail,
}

impl Shape {
    fn describe_count(&self) -> String {
        let n = self.fixed.len();
        match self.tail {
            Tail::None => format!("exactly {}", n),
            Tail::Optional(_) => format!("{} or {}", n, n + 1),
            Tail::Repeated(_, min) => format!("at least {}", n + min),
        }
    }

    /// Check `operands` against the shape, reporting the first mismatch
    pub fn validate(&self, opcode: Opcode, operands: &[Operand], line: usize) -> Result<()> {
        let fixed = self.fixed.len();
        let found = operands.len();
        let count_ok = match self.tail {
            Tail::None => found == fixed,
            Tail::Optional(_) => found == fixed || found == fixed + 1,
            Tail::Repeated(_, min) => found >= fixed + min,
        };
        if !count_ok {
            return Err(Error::OperandCount {
                opcode: opcode.mnemonic(),
                expected: self.describe_count(),
                found,
                line,
            });
        }

        for (i, operand) in operands.iter().enumerate() {
            let slot = match (self.fixed.get(i), self.tail) {
                (Some(slot), _) => *slot,
                (None, Tail::Optional(slot)) | (None, Tail::Repeated(slot, _)) => slot,
                (None, Tail::None) => unreachable!("operand count already validated"),
            };
            if !slot.accepts(operand) {
                return Err(Error::OperandKind {
                    opcode: opcode.mnemonic(),
                    operand: operand.to_string(),
                    position: i + 1,
                    expected: slot.to_string(),
                    line,
                });
            }
        }
        Ok(())
    }
}

/// One IR instruction: opcode, shape-checked operands and originating source line
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    opcode: Opcode,
    operands: Vec<Operand>,
    line: usize,
}

impl Instruction {
    /// Build an instruction, validating the operands against the opcode's shape
    pub fn new(opcode: Opcode, operands: Vec<Operand>, line: usize) -> Result<Self> {
        opcode.shape().validate(opcode, &operands, line)?;
        Ok(Instruction {
            opcode,
            operands,
            line,
        })
    }

    /// Opcode
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Operands in order
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// Source line the instruction was generated from
    pub fn line(&self) -> usize {
        self.line
    }

    /// Operand at `index`
    pub fn operand(&self, index: usize) -> Option<&Operand> {
        self.operands.get(index)
    }

    /// Same instruction attributed to another source line
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.opcode == Opcode::Label {
            if let Some(name) = self.operands.first() {
                write!(f, "{}:", name)?;
            }
        } else if self.opcode.is_directive() {
            write!(f, "{}", self.opcode)?;
            for operand in &self.operands {
                write!(f, " {}", operand)?;
            }
        } else {
            write!(f, "    {}", self.opcode)?;
            for (i, operand) in self.operands.iter().enumerate() {
                let sep = if i == 0 { " " } else { ", " };
                write!(f, "{}{}", sep, operand)?;
            }
        }
        write!(f, " # line {}", self.line)
    }
}
