//! IR Generator - lowers a type-checked syntax tree to linear IR
//!
//! ## Layout of the generated program
//!
//! ```text
//! .VARi / .VARf / .ARRAYi / .ARRAYf   globals, in declaration order
//! .FUNC f p1 p2 ...                   one block per user function
//!     ...
//!     RET | RETi | RETf
//! .FUNC main                          top-level statements
//!     ...
//!     RET
//! ```
//!
//! The generator does not re-validate types. It trusts the checker and only
//! reports the few conditions it cannot lower at all.
//!
//! ## Numbering
//!
//! All registers and labels come from one [`RegisterAllocator`] owned by the
//! generator. Int and float registers are counted separately; labels share a
//! single counter across every function, so label names are unique in the
//! whole program and the interpreter can keep one flat label table.

use super::instruction::{ArithOp, Form, Instruction, Kind, Opcode, Operand, Relation};
use super::program::IrProgram;
use crate::error::{Error, Result};
use crate::syntax::{
    BinaryOp, CompareOp, Condition, Expression, FunctionDecl, Ident, Literal, Lvalue, Program,
    Span, Statement, VarDecl,
};
use crate::types::symbols::ENTRY_POINT;
use crate::types::{Scope, SymbolTable, Type};
use tracing::{debug, trace};

/// Monotonic source of virtual registers and labels; nothing is ever reused
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterAllocator {
    next_int: u32,
    next_float: u32,
    next_label: u32,
}

impl RegisterAllocator {
    /// Fresh allocator starting at `$i0`, `$f0` and `L0`
    pub fn new() -> Self {
        Self::default()
    }

    /// Next int register
    pub fn int(&mut self) -> Operand {
        let reg = Operand::IntReg(self.next_int);
        self.next_int += 1;
        reg
    }

    /// Next float register
    pub fn float(&mut self) -> Operand {
        let reg = Operand::FloatReg(self.next_float);
        self.next_float += 1;
        reg
    }

    /// Next register of the given kind
    pub fn reg(&mut self, kind: Kind) -> Operand {
        match kind {
            Kind::Int => self.int(),
            Kind::Float => self.float(),
        }
    }

    /// Next label name
    pub fn label(&mut self) -> String {
        let label = format!("L{}", self.next_label);
        self.next_label += 1;
        label
    }

    /// Number of (int registers, float registers, labels) handed out so far
    pub fn allocated(&self) -> (u32, u32, u32) {
        (self.next_int, self.next_float, self.next_label)
    }
}

/// Function whose body is being lowered
struct Routine {
    name: String,
    ret: Option<Type>,
}

/// Lowers one program; consumed by [`IrGenerator::generate`]
pub struct IrGenerator<'a> {
    symbols: &'a SymbolTable,
    alloc: RegisterAllocator,
    instructions: Vec<Instruction>,
    /// Variables visible in the body being lowered
    scope: Scope,
    routine: Option<Routine>,
    /// End labels of the enclosing loops, innermost last
    breaks: Vec<String>,
    /// Source line attached to emitted instructions
    line: usize,
}

impl<'a> IrGenerator<'a> {
    /// Create a generator over a resolved symbol table
    pub fn new(symbols: &'a SymbolTable) -> Self {
        Self::with_allocator(symbols, RegisterAllocator::new())
    }

    /// Create a generator continuing the numbering of `alloc`
    pub fn with_allocator(symbols: &'a SymbolTable, alloc: RegisterAllocator) -> Self {
        IrGenerator {
            symbols,
            alloc,
            instructions: Vec::new(),
            scope: symbols.globals().clone(),
            routine: None,
            breaks: Vec::new(),
            line: 0,
        }
    }

    /// Lower a whole program
    pub fn generate(self, program: &Program) -> Result<IrProgram> {
        self.generate_with_allocator(program).map(|(ir, _)| ir)
    }

    /// Lower a whole program, handing back the allocator state afterwards
    pub fn generate_with_allocator(
        mut self,
        program: &Program,
    ) -> Result<(IrProgram, RegisterAllocator)> {
        for decl in &program.declarations.variables {
            self.declare(decl)?;
        }
        for function in &program.declarations.functions {
            self.lower_function(function)?;
        }
        self.lower_main(&program.statements)?;

        let (ints, floats, labels) = self.alloc.allocated();
        debug!(
            instructions = self.instructions.len(),
            int_registers = ints,
            float_registers = floats,
            labels,
            "IR generated"
        );
        Ok((IrProgram::new(self.instructions), self.alloc))
    }

    fn emit(&mut self, opcode: Opcode, operands: Vec<Operand>) -> Result<()> {
        let instr = Instruction::new(opcode, operands, self.line)?;
        trace!(instruction = %instr, "emit");
        self.instructions.push(instr);
        Ok(())
    }

    fn emit_label(&mut self, label: &str) -> Result<()> {
        self.emit(Opcode::Label, vec![Operand::Label(label.to_string())])
    }

    // =========================================================================
    // Declarations and function blocks
    // =========================================================================

    fn declare(&mut self, decl: &VarDecl) -> Result<()> {
        for ident in &decl.names {
            self.line = ident.span.line;
            let ty = self.variable_type(ident)?;
            let name = Operand::Label(ident.name.clone());

            if ty.is_array() {
                let opcode = match Kind::of(ty.leaf()) {
                    Kind::Int => Opcode::ArrayI,
                    Kind::Float => Opcode::ArrayF,
                };
                let mut operands = vec![name];
                operands.extend(
                    ty.dimensions()
                        .into_iter()
                        .map(|dim| Operand::IntImm(dim as i64)),
                );
                self.emit(opcode, operands)?;
                continue;
            }

            let kind = Kind::of(&ty);
            let opcode = match kind {
                Kind::Int => Opcode::VarI,
                Kind::Float => Opcode::VarF,
            };
            let mut operands = vec![name];
            if let Some(init) = &decl.init {
                operands.push(initializer(kind, init, &ty, ident.span)?);
            }
            self.emit(opcode, operands)?;
        }
        Ok(())
    }

    fn lower_function(&mut self, decl: &FunctionDecl) -> Result<()> {
        let name = &decl.name.name;
        let sig = self
            .symbols
            .function(name)
            .cloned()
            .ok_or_else(|| Error::UndeclaredFunction {
                name: name.clone(),
                span: decl.name.span,
            })?;
        debug!(function = %name, "generating function");

        self.line = decl.name.span.line;
        self.scope = self.symbols.function_scope(&sig);
        self.routine = Some(Routine {
            name: name.clone(),
            ret: sig.ret.clone(),
        });

        let mut operands = vec![Operand::Label(name.clone())];
        operands.extend(sig.params.iter().map(|(p, _)| Operand::Label(p.clone())));
        self.emit(Opcode::Func, operands)?;

        self.lower_block(&decl.body)?;
        if sig.ret.is_none() {
            self.emit(Opcode::Ret, vec![])?;
        }
        Ok(())
    }

    fn lower_main(&mut self, statements: &[Statement]) -> Result<()> {
        debug!(statements = statements.len(), "generating main");
        self.line = statements.first().map_or(0, |s| s.span().line);
        self.scope = self.symbols.globals().clone();
        self.routine = None;

        self.emit(Opcode::Func, vec![Operand::Label(ENTRY_POINT.into())])?;
        self.lower_block(statements)?;
        self.emit(Opcode::Ret, vec![])
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// Lower nested statements, keeping the caller's source line afterwards
    fn lower_block(&mut self, statements: &[Statement]) -> Result<()> {
        let line = self.line;
        for stmt in statements {
            self.lower_statement(stmt)?;
        }
        self.line = line;
        Ok(())
    }

    fn lower_statement(&mut self, stmt: &Statement) -> Result<()> {
        self.line = stmt.span().line;
        match stmt {
            Statement::Assign { target, value } => {
                let (value, kind) = self.lower_expression(value, false)?;
                self.store_to_lvalue(target, value, kind)
            }

            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let flag = self.lower_condition(condition)?;
                let end = self.alloc.label();
                let otherwise = match else_branch {
                    Some(_) => self.alloc.label(),
                    None => end.clone(),
                };
                self.emit(Opcode::Brz, vec![flag, Operand::Label(otherwise.clone())])?;
                self.lower_block(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.emit(Opcode::Br, vec![Operand::Label(end.clone())])?;
                    self.emit_label(&otherwise)?;
                    self.lower_block(else_branch)?;
                }
                self.emit_label(&end)
            }

            Statement::While { condition, body } => {
                let top = self.alloc.label();
                let end = self.alloc.label();
                self.emit_label(&top)?;
                let flag = self.lower_condition(condition)?;
                self.emit(Opcode::Brz, vec![flag, Operand::Label(end.clone())])?;
                self.lower_loop_body(body, &end)?;
                self.emit(Opcode::Br, vec![Operand::Label(top)])?;
                self.emit_label(&end)
            }

            Statement::For {
                variable,
                from,
                to,
                body,
            } => self.lower_for(variable, from, to, body),

            Statement::Break { span } => {
                let end = self
                    .breaks
                    .last()
                    .cloned()
                    .ok_or(Error::IllegalBreak { span: *span })?;
                self.emit(Opcode::Br, vec![Operand::Label(end)])
            }

            Statement::Call {
                target,
                function,
                args,
            } => self.lower_call(target.as_ref(), function, args),

            Statement::Return { value, span } => {
                let ret = match &self.routine {
                    None => return Err(Error::ReturnOutsideFunction { span: *span }),
                    Some(Routine { ret: Some(ret), .. }) => Kind::of(ret),
                    Some(Routine { name, ret: None }) => {
                        return Err(Error::ReturnInVoidFunction {
                            function: name.clone(),
                            span: *span,
                        })
                    }
                };
                let (value, kind) = self.lower_expression(value, false)?;
                let value = self.coerce(value, kind, ret)?;
                self.emit(Opcode::RetValue(ret), vec![value])
            }
        }
    }

    fn lower_loop_body(&mut self, body: &[Statement], end: &str) -> Result<()> {
        self.breaks.push(end.to_string());
        let lowered = self.lower_block(body);
        self.breaks.pop();
        lowered
    }

    fn lower_for(
        &mut self,
        variable: &Ident,
        from: &Expression,
        to: &Expression,
        body: &[Statement],
    ) -> Result<()> {
        let var = Operand::Label(variable.name.clone());

        let (start, _) = self.lower_expression(from, false)?;
        self.emit(Opcode::Store(Kind::Int), vec![start, var.clone()])?;

        let top = self.alloc.label();
        let end = self.alloc.label();
        self.emit_label(&top)?;

        // Upper bound is re-evaluated on every iteration
        let current = self.alloc.int();
        self.emit(Opcode::Load(Kind::Int), vec![current.clone(), var.clone()])?;
        let (bound, _) = self.lower_expression(to, true)?;
        let flag = self.alloc.int();
        let form = Form::select(Kind::Int, &bound);
        self.emit(
            Opcode::Compare(Relation::Neq, form),
            vec![flag.clone(), current, bound],
        )?;
        self.emit(Opcode::Brz, vec![flag, Operand::Label(end.clone())])?;

        self.lower_loop_body(body, &end)?;

        let value = self.alloc.int();
        self.emit(Opcode::Load(Kind::Int), vec![value.clone(), var.clone()])?;
        let next = self.alloc.int();
        self.emit(
            Opcode::Arith(ArithOp::Add, Form::IntImm),
            vec![next.clone(), value, Operand::IntImm(1)],
        )?;
        self.emit(Opcode::Store(Kind::Int), vec![next, var])?;
        self.emit(Opcode::Br, vec![Operand::Label(top)])?;
        self.emit_label(&end)
    }

    fn lower_call(
        &mut self,
        target: Option<&Lvalue>,
        function: &Ident,
        args: &[Expression],
    ) -> Result<()> {
        let sig = self
            .symbols
            .function(&function.name)
            .cloned()
            .ok_or_else(|| Error::UndeclaredFunction {
                name: function.name.clone(),
                span: function.span,
            })?;
        if sig.params.len() != args.len() {
            return Err(Error::ArgumentCount {
                function: function.name.clone(),
                expected: sig.params.len(),
                found: args.len(),
                span: function.span,
            });
        }

        let mut lowered = Vec::with_capacity(args.len());
        for (arg, (_, param)) in args.iter().zip(&sig.params) {
            let (value, kind) = self.lower_expression(arg, false)?;
            lowered.push(self.coerce(value, kind, Kind::of(param))?);
        }
        let callee = Operand::Label(function.name.clone());

        match (&sig.ret, target) {
            (None, None) => {
                let mut operands = vec![callee];
                operands.extend(lowered);
                self.emit(Opcode::Call, operands)
            }
            (None, Some(_)) => Err(Error::VoidValue {
                function: function.name.clone(),
                span: function.span,
            }),
            (Some(ret), target) => {
                let kind = Kind::of(ret);
                let dest = self.alloc.reg(kind);
                let mut operands = vec![dest.clone(), callee];
                operands.extend(lowered);
                self.emit(Opcode::CallRet, operands)?;
                match target {
                    Some(target) => self.store_to_lvalue(target, dest, kind),
                    None => Ok(()),
                }
            }
        }
    }

    fn store_to_lvalue(&mut self, target: &Lvalue, value: Operand, kind: Kind) -> Result<()> {
        if target.indices.is_empty() {
            let slot = Kind::of(&self.variable_type(&target.name)?);
            let value = self.coerce(value, kind, slot)?;
            return self.emit(
                Opcode::Store(slot),
                vec![value, Operand::Label(target.name.name.clone())],
            );
        }

        let (address, offset, slot) = self.element_address(&target.name, &target.indices)?;
        let value = self.coerce(value, kind, slot)?;
        let mut operands = vec![value, address];
        operands.extend(offset);
        self.emit(Opcode::StoreIndirect(slot), operands)
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Lower an expression to an operand and its kind
    ///
    /// With `allow_imm`, a bare literal comes back as an immediate instead of
    /// being loaded into a register.
    fn lower_expression(&mut self, expr: &Expression, allow_imm: bool) -> Result<(Operand, Kind)> {
        match expr {
            Expression::Literal { value, .. } => {
                let (imm, kind) = match value {
                    Literal::Int(v) => (Operand::IntImm(*v), Kind::Int),
                    Literal::Bool(b) => (Operand::IntImm(i64::from(*b)), Kind::Int),
                    Literal::Float(v) => (Operand::FloatImm(*v), Kind::Float),
                };
                if allow_imm {
                    return Ok((imm, kind));
                }
                let dst = self.alloc.reg(kind);
                self.emit(Opcode::LoadImm(kind), vec![dst.clone(), imm])?;
                Ok((dst, kind))
            }

            Expression::Variable(ident) => self.load_variable(ident),

            Expression::ArrayAccess { array, indices } if indices.is_empty() => {
                self.load_variable(array)
            }

            Expression::ArrayAccess { array, indices } => {
                let (address, offset, kind) = self.element_address(array, indices)?;
                let dst = self.alloc.reg(kind);
                let mut operands = vec![dst.clone(), address];
                operands.extend(offset);
                self.emit(Opcode::LoadIndirect(kind), operands)?;
                Ok((dst, kind))
            }

            Expression::Binary {
                op, left, right, ..
            } => {
                let left = self.lower_expression(left, false)?;
                let right = self.lower_expression(right, true)?;
                let (left, right, kind) = self.unify(left, right)?;
                let dst = self.alloc.reg(kind);
                let form = Form::select(kind, &right);
                self.emit(Opcode::Arith(arith_op(*op), form), vec![dst.clone(), left, right])?;
                Ok((dst, kind))
            }

            Expression::Grouping(inner) => self.lower_expression(inner, allow_imm),
        }
    }

    fn load_variable(&mut self, ident: &Ident) -> Result<(Operand, Kind)> {
        let kind = Kind::of(&self.variable_type(ident)?);
        let dst = self.alloc.reg(kind);
        self.emit(
            Opcode::Load(kind),
            vec![dst.clone(), Operand::Label(ident.name.clone())],
        )?;
        Ok((dst, kind))
    }

    /// Address of an indexed element: (address register, optional immediate
    /// offset, kind of the addressed slot)
    ///
    /// Every index but the last follows one level of base addresses; the
    /// last one selects the slot.
    fn element_address(
        &mut self,
        array: &Ident,
        indices: &[Expression],
    ) -> Result<(Operand, Option<Operand>, Kind)> {
        let mut ty = self.variable_type(array)?;
        let mut base = self.alloc.int();
        self.emit(
            Opcode::Load(Kind::Int),
            vec![base.clone(), Operand::Label(array.name.clone())],
        )?;

        let mut offset = None;
        for (depth, index) in indices.iter().enumerate() {
            ty = match ty {
                Type::Array { element, .. } => *element,
                found => {
                    return Err(Error::NotAnArray {
                        name: array.name.clone(),
                        found,
                        span: array.span,
                    })
                }
            };

            let (index, _) = self.lower_expression(index, true)?;
            let (address, imm) = if index.is_immediate() {
                (base.clone(), Some(index))
            } else {
                let address = self.alloc.int();
                self.emit(
                    Opcode::Arith(ArithOp::Add, Form::Int),
                    vec![address.clone(), base.clone(), index],
                )?;
                (address, None)
            };

            if depth + 1 == indices.len() {
                base = address;
                offset = imm;
            } else {
                let next = self.alloc.int();
                let mut operands = vec![next.clone(), address];
                operands.extend(imm);
                self.emit(Opcode::LoadIndirect(Kind::Int), operands)?;
                base = next;
            }
        }

        Ok((base, offset, Kind::of(&ty)))
    }

    /// Bring two operands to a common kind, converting the int side
    fn unify(
        &mut self,
        (left, left_kind): (Operand, Kind),
        (right, right_kind): (Operand, Kind),
    ) -> Result<(Operand, Operand, Kind)> {
        match (left_kind, right_kind) {
            (Kind::Int, Kind::Float) => {
                let left = self.int_to_float(left)?;
                Ok((left, right, Kind::Float))
            }
            (Kind::Float, Kind::Int) => {
                let right = self.int_to_float(right)?;
                Ok((left, right, Kind::Float))
            }
            (kind, _) => Ok((left, right, kind)),
        }
    }

    /// Convert `value` of kind `from` for a slot of kind `to`
    fn coerce(&mut self, value: Operand, from: Kind, to: Kind) -> Result<Operand> {
        match (from, to) {
            (Kind::Int, Kind::Float) => self.int_to_float(value),
            _ => Ok(value),
        }
    }

    fn int_to_float(&mut self, value: Operand) -> Result<Operand> {
        let source = if value.is_immediate() {
            let reg = self.alloc.int();
            self.emit(Opcode::LoadImm(Kind::Int), vec![reg.clone(), value])?;
            reg
        } else {
            value
        };
        let dst = self.alloc.float();
        self.emit(Opcode::IntToFloat, vec![dst.clone(), source])?;
        Ok(dst)
    }

    // =========================================================================
    // Conditions
    // =========================================================================

    /// Lower a condition into an int register holding 0 or 1
    fn lower_condition(&mut self, condition: &Condition) -> Result<Operand> {
        match condition {
            Condition::Compare {
                op, left, right, ..
            } => {
                // `<` and `<=` swap operands, so the source-left side ends up
                // on the right where an immediate is allowed.
                let swap = matches!(op, CompareOp::Lt | CompareOp::Le);
                let left = self.lower_expression(left, swap)?;
                let right = self.lower_expression(right, !swap)?;
                let (left, right, kind) = self.unify(left, right)?;
                let (first, second) = if swap { (right, left) } else { (left, right) };

                let relation = match op {
                    CompareOp::Lt | CompareOp::Gt => Relation::Gt,
                    CompareOp::Le | CompareOp::Ge => Relation::Geq,
                    CompareOp::Eq => Relation::Eq,
                    CompareOp::Ne => Relation::Neq,
                };
                let dst = self.alloc.int();
                let form = Form::select(kind, &second);
                self.emit(
                    Opcode::Compare(relation, form),
                    vec![dst.clone(), first, second],
                )?;
                Ok(dst)
            }

            Condition::And(left, right) | Condition::Or(left, right) => {
                let left = self.lower_condition(left)?;
                let right = self.lower_condition(right)?;
                let opcode = match condition {
                    Condition::And(..) => Opcode::And,
                    _ => Opcode::Or,
                };
                let dst = self.alloc.int();
                self.emit(opcode, vec![dst.clone(), left, right])?;
                Ok(dst)
            }

            Condition::Value(expr) => {
                let (value, _) = self.lower_expression(expr, false)?;
                Ok(value)
            }
        }
    }

    fn variable_type(&self, ident: &Ident) -> Result<Type> {
        self.scope
            .get(&ident.name)
            .cloned()
            .ok_or_else(|| Error::UndeclaredVariable {
                name: ident.name.clone(),
                span: ident.span,
            })
    }
}

fn arith_op(op: BinaryOp) -> ArithOp {
    match op {
        BinaryOp::Add => ArithOp::Add,
        BinaryOp::Sub => ArithOp::Sub,
        BinaryOp::Mul => ArithOp::Mul,
        BinaryOp::Div => ArithOp::Div,
    }
}

/// Immediate written into a `.VAR` directive
fn initializer(kind: Kind, literal: &Literal, ty: &Type, span: Span) -> Result<Operand> {
    match (kind, literal) {
        (Kind::Int, Literal::Int(v)) => Ok(Operand::IntImm(*v)),
        (Kind::Int, Literal::Bool(b)) => Ok(Operand::IntImm(i64::from(*b))),
        (Kind::Float, Literal::Int(v)) => Ok(Operand::FloatImm(*v as f64)),
        (Kind::Float, Literal::Float(v)) => Ok(Operand::FloatImm(*v)),
        (_, literal) => Err(Error::TypeMismatch {
            expected: ty.clone(),
            found: crate::types::checker::literal_type(literal),
            span,
        }),
    }
}
