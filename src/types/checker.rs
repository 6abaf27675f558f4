//! # Type Checker
//!
//! Validates every statement and expression of a program against a resolved
//! [`SymbolTable`]. The pass produces nothing but pass/fail: it stops at the
//! first violation and reports it with its source position. Code generation
//! re-derives the types it needs on its own.

use super::symbols::{Scope, SymbolTable};
use super::Type;
use crate::error::{Error, Result};
use crate::syntax::{
    Condition, Expression, FunctionDecl, Ident, Literal, Lvalue, Program, Span, Statement,
    VarDecl,
};
use tracing::debug;

/// Type of a literal is its lexical class
pub fn literal_type(literal: &Literal) -> Type {
    match literal {
        Literal::Int(_) => Type::Int,
        Literal::Float(_) => Type::Float,
        Literal::Bool(_) => Type::Bool,
    }
}

/// Function currently being checked
#[derive(Clone, Copy)]
struct FunctionContext<'s> {
    name: &'s str,
    ret: Option<&'s Type>,
}

/// Variables in scope plus the enclosing function (`None` at top level)
struct Body<'s> {
    scope: &'s Scope,
    function: Option<FunctionContext<'s>>,
}

/// Type checker for a whole program
pub struct TypeChecker<'a> {
    symbols: &'a SymbolTable,
}

impl<'a> TypeChecker<'a> {
    /// Creates a checker over an already built symbol table
    pub fn new(symbols: &'a SymbolTable) -> Self {
        TypeChecker { symbols }
    }

    /// Type check a complete program
    pub fn check_program(&self, program: &Program) -> Result<()> {
        self.check_initializers(&program.declarations.variables)?;

        for function in &program.declarations.functions {
            self.check_function(function)?;
        }

        debug!(
            statements = program.statements.len(),
            "checking top-level statements"
        );
        let body = Body {
            scope: self.symbols.globals(),
            function: None,
        };
        self.check_block(&program.statements, &body, false)
    }

    fn check_initializers(&self, decls: &[VarDecl]) -> Result<()> {
        for decl in decls {
            let Some(init) = &decl.init else { continue };
            let found = literal_type(init);
            for ident in &decl.names {
                let expected = self.variable_type(ident, self.symbols.globals())?;
                require_assignable(&expected, &found, ident.span)?;
            }
        }
        Ok(())
    }

    /// Check one function body in the scope extended by its parameters
    pub fn check_function(&self, decl: &FunctionDecl) -> Result<()> {
        let name = decl.name.name.as_str();
        let sig = self
            .symbols
            .function(name)
            .ok_or_else(|| Error::UndeclaredFunction {
                name: name.to_string(),
                span: decl.name.span,
            })?;
        debug!(function = name, "checking function");

        let scope = self.symbols.function_scope(sig);
        let body = Body {
            scope: &scope,
            function: Some(FunctionContext {
                name,
                ret: sig.ret.as_ref(),
            }),
        };
        self.check_block(&decl.body, &body, false)?;

        if sig.ret.is_some() && !matches!(decl.body.last(), Some(Statement::Return { .. })) {
            return Err(Error::MissingReturn {
                function: name.to_string(),
                span: decl.name.span,
            });
        }
        Ok(())
    }

    fn check_block(&self, statements: &[Statement], body: &Body<'_>, in_loop: bool) -> Result<()> {
        for stmt in statements {
            self.check_statement(stmt, body, in_loop)?;
        }
        Ok(())
    }

    fn check_statement(&self, stmt: &Statement, body: &Body<'_>, in_loop: bool) -> Result<()> {
        let scope = body.scope;
        match stmt {
            Statement::Assign { target, value } => {
                let expected = self.lvalue_type(target, scope)?;
                let found = self.infer_type(value, scope)?;
                require_assignable(&expected, &found, target.name.span)
            }

            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.check_condition(condition, scope)?;
                self.check_block(then_branch, body, in_loop)?;
                if let Some(else_branch) = else_branch {
                    self.check_block(else_branch, body, in_loop)?;
                }
                Ok(())
            }

            Statement::While {
                condition,
                body: statements,
            } => {
                self.check_condition(condition, scope)?;
                self.check_block(statements, body, true)
            }

            Statement::For {
                variable,
                from,
                to,
                body: statements,
            } => {
                if scope.get(&variable.name) != Some(&Type::Int) {
                    return Err(Error::InvalidLoopVariable {
                        name: variable.name.clone(),
                        span: variable.span,
                    });
                }
                let from_type = self.infer_type(from, scope)?;
                require_assignable(&Type::Int, &from_type, from.span())?;
                let to_type = self.infer_type(to, scope)?;
                require_assignable(&Type::Int, &to_type, to.span())?;
                self.check_block(statements, body, true)
            }

            Statement::Break { span } => {
                if in_loop {
                    Ok(())
                } else {
                    Err(Error::IllegalBreak { span: *span })
                }
            }

            Statement::Call {
                target,
                function,
                args,
            } => self.check_call(target.as_ref(), function, args, scope),

            Statement::Return { value, span } => {
                let Some(context) = body.function else {
                    return Err(Error::ReturnOutsideFunction { span: *span });
                };
                let Some(ret) = context.ret else {
                    return Err(Error::ReturnInVoidFunction {
                        function: context.name.to_string(),
                        span: *span,
                    });
                };
                let found = self.infer_type(value, scope)?;
                require_assignable(ret, &found, value.span())
            }
        }
    }

    fn check_call(
        &self,
        target: Option<&Lvalue>,
        function: &Ident,
        args: &[Expression],
        scope: &Scope,
    ) -> Result<()> {
        let sig = self
            .symbols
            .function(&function.name)
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

        for (arg, (_, param_type)) in args.iter().zip(&sig.params) {
            let found = self.infer_type(arg, scope)?;
            require_assignable(param_type, &found, arg.span())?;
        }

        if let Some(target) = target {
            let expected = self.lvalue_type(target, scope)?;
            match &sig.ret {
                Some(ret) => require_assignable(&expected, ret, target.name.span)?,
                None => {
                    return Err(Error::VoidValue {
                        function: function.name.clone(),
                        span: function.span,
                    })
                }
            }
        }
        Ok(())
    }

    /// Infer the type of a numeric expression
    pub fn infer_type(&self, expr: &Expression, scope: &Scope) -> Result<Type> {
        match expr {
            Expression::Literal { value, .. } => Ok(literal_type(value)),

            Expression::Variable(ident) => self.variable_type(ident, scope),

            Expression::ArrayAccess { array, indices } => {
                self.indexed_type(array, indices, scope)
            }

            Expression::Binary {
                op,
                left,
                right,
                span,
            } => {
                let left_type = self.infer_type(left, scope)?;
                let right_type = self.infer_type(right, scope)?;
                for operand in [&left_type, &right_type] {
                    if !operand.is_numeric() {
                        return Err(Error::NonNumericOperand {
                            op: op.to_string(),
                            found: operand.clone(),
                            span: *span,
                        });
                    }
                }
                Ok(Type::arithmetic_result(&left_type, &right_type))
            }

            Expression::Grouping(inner) => self.infer_type(inner, scope),
        }
    }

    /// Validate a boolean expression
    pub fn check_condition(&self, condition: &Condition, scope: &Scope) -> Result<()> {
        match condition {
            Condition::Compare {
                op,
                left,
                right,
                span,
            } => {
                for operand in [left, right] {
                    let ty = self.infer_type(operand, scope)?;
                    if !ty.is_numeric() {
                        return Err(Error::NonNumericOperand {
                            op: op.to_string(),
                            found: ty,
                            span: *span,
                        });
                    }
                }
                Ok(())
            }
            Condition::And(left, right) | Condition::Or(left, right) => {
                self.check_condition(left, scope)?;
                self.check_condition(right, scope)
            }
            Condition::Value(expr) => match self.infer_type(expr, scope)? {
                Type::Bool => Ok(()),
                found => Err(Error::NonBooleanCondition {
                    found,
                    span: expr.span(),
                }),
            },
        }
    }

    fn variable_type(&self, ident: &Ident, scope: &Scope) -> Result<Type> {
        scope
            .get(&ident.name)
            .cloned()
            .ok_or_else(|| Error::UndeclaredVariable {
                name: ident.name.clone(),
                span: ident.span,
            })
    }

    /// Peel one array dimension per index
    fn indexed_type(&self, array: &Ident, indices: &[Expression], scope: &Scope) -> Result<Type> {
        let mut ty = self.variable_type(array, scope)?;
        for index in indices {
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
            let index_type = self.infer_type(index, scope)?;
            if index_type != Type::Int {
                return Err(Error::NonIntegerIndex {
                    found: index_type,
                    span: index.span(),
                });
            }
        }
        Ok(ty)
    }

    fn lvalue_type(&self, target: &Lvalue, scope: &Scope) -> Result<Type> {
        self.indexed_type(&target.name, &target.indices, scope)
    }
}

fn require_assignable(expected: &Type, found: &Type, span: Span) -> Result<()> {
    if expected.accepts(found) {
        Ok(())
    } else {
        Err(Error::TypeMismatch {
            expected: expected.clone(),
            found: found.clone(),
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{
        BinaryOp, CompareOp, Declarations, Param, TypeExpr, VarDecl,
    };

    fn var(names: &[&str], ty: TypeExpr) -> VarDecl {
        VarDecl {
            names: names.iter().map(|n| Ident::new(*n)).collect(),
            ty,
            init: None,
        }
    }

    fn program(variables: Vec<VarDecl>, statements: Vec<Statement>) -> Program {
        Program {
            declarations: Declarations {
                variables,
                ..Default::default()
            },
            statements,
        }
    }

    fn check(program: &Program) -> Result<()> {
        let symbols = SymbolTable::build(&program.declarations)?;
        TypeChecker::new(&symbols).check_program(program)
    }

    fn matrix_vars() -> Vec<VarDecl> {
        vec![
            var(&["m"], TypeExpr::array(3, TypeExpr::array(4, TypeExpr::Float))),
            var(&["i", "j"], TypeExpr::Int),
            var(&["x"], TypeExpr::Float),
            var(&["flag"], TypeExpr::Bool),
        ]
    }

    #[test]
    fn test_arithmetic_types() {
        let symbols = SymbolTable::build(&program(matrix_vars(), vec![]).declarations).unwrap();
        let checker = TypeChecker::new(&symbols);
        let scope = symbols.globals();

        let int_sum = Expression::binary(BinaryOp::Add, Expression::var("i"), Expression::int(1));
        assert_eq!(checker.infer_type(&int_sum, scope).unwrap(), Type::Int);

        let mixed = Expression::binary(BinaryOp::Mul, Expression::var("i"), Expression::var("x"));
        assert_eq!(checker.infer_type(&mixed, scope).unwrap(), Type::Float);

        let element = Expression::index("m", vec![Expression::var("i"), Expression::var("j")]);
        assert_eq!(checker.infer_type(&element, scope).unwrap(), Type::Float);

        let row = Expression::index("m", vec![Expression::int(0)]);
        assert_eq!(
            checker.infer_type(&row, scope).unwrap(),
            Type::array(Type::Float, 4)
        );
    }

    #[test]
    fn test_inference_is_deterministic() {
        let symbols = SymbolTable::build(&program(matrix_vars(), vec![]).declarations).unwrap();
        let checker = TypeChecker::new(&symbols);
        let expr = Expression::binary(
            BinaryOp::Div,
            Expression::group(Expression::binary(
                BinaryOp::Sub,
                Expression::var("j"),
                Expression::float(0.5),
            )),
            Expression::index("m", vec![Expression::int(1), Expression::var("i")]),
        );

        let first = checker.infer_type(&expr, symbols.globals()).unwrap();
        let second = checker.infer_type(&expr, symbols.globals()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, Type::Float);
    }

    #[test]
    fn test_bool_operand_rejected() {
        let stmt = Statement::assign(
            Lvalue::var("i"),
            Expression::binary(BinaryOp::Add, Expression::var("flag"), Expression::int(1)),
        );
        let err = check(&program(matrix_vars(), vec![stmt])).unwrap_err();
        assert!(matches!(err, Error::NonNumericOperand { found: Type::Bool, .. }));
    }

    #[test]
    fn test_index_must_be_int() {
        let stmt = Statement::assign(
            Lvalue::var("x"),
            Expression::index("m", vec![Expression::var("x"), Expression::int(0)]),
        );
        let err = check(&program(matrix_vars(), vec![stmt])).unwrap_err();
        assert!(matches!(err, Error::NonIntegerIndex { found: Type::Float, .. }));
    }

    #[test]
    fn test_too_many_indices() {
        let stmt = Statement::assign(
            Lvalue::var("x"),
            Expression::index(
                "m",
                vec![Expression::int(0), Expression::int(0), Expression::int(0)],
            ),
        );
        let err = check(&program(matrix_vars(), vec![stmt])).unwrap_err();
        assert!(matches!(err, Error::NotAnArray { found: Type::Float, .. }));
    }

    #[test]
    fn test_assignment_compatibility() {
        let widen = Statement::assign(Lvalue::var("x"), Expression::var("i"));
        assert!(check(&program(matrix_vars(), vec![widen])).is_ok());

        let narrow = Statement::assign(Lvalue::var("i"), Expression::var("x"));
        assert!(matches!(
            check(&program(matrix_vars(), vec![narrow])),
            Err(Error::TypeMismatch {
                expected: Type::Int,
                found: Type::Float,
                ..
            })
        ));

        let whole_array = Statement::assign(
            Lvalue::index("m", vec![Expression::int(0)]),
            Expression::index("m", vec![Expression::int(1)]),
        );
        assert!(matches!(
            check(&program(matrix_vars(), vec![whole_array])),
            Err(Error::TypeMismatch { .. })
        ));

        let element = Statement::assign(
            Lvalue::index("m", vec![Expression::int(2), Expression::int(3)]),
            Expression::int(7),
        );
        assert!(check(&program(matrix_vars(), vec![element])).is_ok());
    }

    #[test]
    fn test_break_requires_loop() {
        let stray = Statement::Break {
            span: Span::new(5, 3),
        };
        assert_eq!(
            check(&program(matrix_vars(), vec![stray])).unwrap_err(),
            Error::IllegalBreak {
                span: Span::new(5, 3)
            }
        );

        let in_if_in_while = Statement::While {
            condition: Condition::compare(CompareOp::Lt, Expression::var("i"), Expression::int(3)),
            body: vec![Statement::If {
                condition: Condition::Value(Expression::var("flag")),
                then_branch: vec![Statement::Break {
                    span: Span::default(),
                }],
                else_branch: None,
            }],
        };
        assert!(check(&program(matrix_vars(), vec![in_if_in_while])).is_ok());
    }

    #[test]
    fn test_for_variable_must_be_int() {
        let bad = Statement::For {
            variable: Ident::new("x"),
            from: Expression::int(0),
            to: Expression::int(3),
            body: vec![],
        };
        assert!(matches!(
            check(&program(matrix_vars(), vec![bad])),
            Err(Error::InvalidLoopVariable { .. })
        ));

        let float_bound = Statement::For {
            variable: Ident::new("i"),
            from: Expression::int(0),
            to: Expression::var("x"),
            body: vec![Statement::Break {
                span: Span::default(),
            }],
        };
        assert!(matches!(
            check(&program(matrix_vars(), vec![float_bound])),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_condition_value_must_be_bool() {
        let stmt = Statement::If {
            condition: Condition::Value(Expression::var("i")),
            then_branch: vec![],
            else_branch: None,
        };
        assert!(matches!(
            check(&program(matrix_vars(), vec![stmt])),
            Err(Error::NonBooleanCondition { found: Type::Int, .. })
        ));
    }

    #[test]
    fn test_call_arguments() {
        let ok = Statement::call("printf", vec![Expression::var("i")]);
        assert!(check(&program(matrix_vars(), vec![ok])).is_ok());

        let arity = Statement::call("printi", vec![]);
        assert!(matches!(
            check(&program(matrix_vars(), vec![arity])),
            Err(Error::ArgumentCount {
                expected: 1,
                found: 0,
                ..
            })
        ));

        let kind = Statement::call("printi", vec![Expression::var("x")]);
        assert!(matches!(
            check(&program(matrix_vars(), vec![kind])),
            Err(Error::TypeMismatch { .. })
        ));

        let void_value = Statement::call_into(Lvalue::var("i"), "printi", vec![Expression::int(1)]);
        assert!(matches!(
            check(&program(matrix_vars(), vec![void_value])),
            Err(Error::VoidValue { .. })
        ));

        let unknown = Statement::call("nope", vec![]);
        assert!(matches!(
            check(&program(matrix_vars(), vec![unknown])),
            Err(Error::UndeclaredFunction { .. })
        ));
    }

    fn function(name: &str, ret: Option<TypeExpr>, body: Vec<Statement>) -> FunctionDecl {
        FunctionDecl {
            name: Ident::at(name, 1, 10),
            params: vec![Param {
                name: Ident::new("n"),
                ty: TypeExpr::Int,
            }],
            ret,
            body,
        }
    }

    fn with_function(decl: FunctionDecl) -> Program {
        let mut program = program(matrix_vars(), vec![]);
        program.declarations.functions.push(decl);
        program
    }

    fn ret(value: Expression) -> Statement {
        Statement::Return {
            value,
            span: Span::new(2, 5),
        }
    }

    #[test]
    fn test_function_returns() {
        let widening = function("half", Some(TypeExpr::Float), vec![ret(Expression::var("n"))]);
        assert!(check(&with_function(widening)).is_ok());

        let missing = function(
            "f",
            Some(TypeExpr::Int),
            vec![Statement::call("printi", vec![Expression::var("n")])],
        );
        assert_eq!(
            check(&with_function(missing)).unwrap_err(),
            Error::MissingReturn {
                function: "f".into(),
                span: Span::new(1, 10)
            }
        );

        let void_return = function("g", None, vec![ret(Expression::int(1))]);
        assert!(matches!(
            check(&with_function(void_return)),
            Err(Error::ReturnInVoidFunction { .. })
        ));

        let narrowing = function("h", Some(TypeExpr::Int), vec![ret(Expression::var("x"))]);
        assert!(matches!(
            check(&with_function(narrowing)),
            Err(Error::TypeMismatch { .. })
        ));

        let top_level = program(matrix_vars(), vec![ret(Expression::int(0))]);
        assert!(matches!(
            check(&top_level),
            Err(Error::ReturnOutsideFunction { .. })
        ));
    }

    #[test]
    fn test_parameters_extend_scope_only_inside_function() {
        let uses_param = function(
            "show",
            None,
            vec![Statement::call("printi", vec![Expression::var("n")])],
        );
        let mut prog = with_function(uses_param);
        assert!(check(&prog).is_ok());

        prog.statements
            .push(Statement::call("printi", vec![Expression::var("n")]));
        assert!(matches!(
            check(&prog),
            Err(Error::UndeclaredVariable { name, .. }) if name == "n"
        ));
    }

    #[test]
    fn test_initializers() {
        let mut decl = var(&["x"], TypeExpr::Float);
        decl.init = Some(Literal::Int(5));
        assert!(check(&program(vec![decl], vec![])).is_ok());

        let mut decl = var(&["b"], TypeExpr::Bool);
        decl.init = Some(Literal::Int(1));
        assert!(matches!(
            check(&program(vec![decl], vec![])),
            Err(Error::TypeMismatch { .. })
        ));
    }
}
