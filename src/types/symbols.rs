//! Symbol table construction.
//!
//! Built by an ordered pipeline where each stage only reads the tables the
//! previous stages produced:
//!
//! 1. type aliases
//! 2. global variables (may name aliases)
//! 3. user functions (parameter and return types may name aliases)
//! 4. built-in functions
//!
//! The result is immutable. Function bodies see the globals through a
//! [`Scope`] copy extended with their parameters; the table itself is never
//! touched after [`SymbolTable::build`] returns.

use super::Type;
use crate::error::{Error, Result};
use crate::syntax::{Declarations, FunctionDecl, Ident, TypeDecl, TypeExpr, VarDecl};
use std::collections::HashMap;
use tracing::debug;

/// Variable name to type mapping visible while analysing one body
pub type Scope = HashMap<String, Type>;

/// Names of the functions provided by the interpreter
pub const BUILTIN_NAMES: &[&str] = &["printi", "printf", "printb", "readi", "readf"];

/// Name of the implicit function holding the top-level statements
pub const ENTRY_POINT: &str = "main";

/// Check if `name` is one of the runtime built-ins
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Built-in signature: (parameter types, return type)
fn builtin_signature(name: &str) -> (Vec<Type>, Option<Type>) {
    match name {
        "printi" => (vec![Type::Int], None),
        "printf" => (vec![Type::Float], None),
        "printb" => (vec![Type::Bool], None),
        "readi" => (Vec::new(), Some(Type::Int)),
        _ => (Vec::new(), Some(Type::Float)),
    }
}

/// Resolved function signature
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSig {
    /// Return type, `None` for void
    pub ret: Option<Type>,
    /// Parameters in declaration order
    pub params: Vec<(String, Type)>,
    /// Provided by the interpreter rather than declared in the program
    pub builtin: bool,
}

/// Resolved declarations of a program
#[derive(Debug, Clone)]
pub struct SymbolTable {
    aliases: HashMap<String, Type>,
    variables: Scope,
    functions: HashMap<String, FunctionSig>,
}

impl SymbolTable {
    /// Resolve a declaration section
    pub fn build(decls: &Declarations) -> Result<Self> {
        let aliases = AliasResolver::new(&decls.types)?.resolve_all()?;
        let variables = resolve_variables(&decls.variables, &aliases)?;
        let mut functions = resolve_functions(&decls.functions, &aliases)?;
        inject_builtins(&mut functions);

        debug!(
            aliases = aliases.len(),
            variables = variables.len(),
            functions = functions.len(),
            "symbol table built"
        );

        Ok(SymbolTable {
            aliases,
            variables,
            functions,
        })
    }

    /// Resolved type of an alias
    pub fn alias(&self, name: &str) -> Option<&Type> {
        self.aliases.get(name)
    }

    /// Type of a global variable
    pub fn variable(&self, name: &str) -> Option<&Type> {
        self.variables.get(name)
    }

    /// Signature of a user function or built-in
    pub fn function(&self, name: &str) -> Option<&FunctionSig> {
        self.functions.get(name)
    }

    /// The global variable scope
    pub fn globals(&self) -> &Scope {
        &self.variables
    }

    /// Shadow copy of the globals extended by a function's parameters
    pub fn function_scope(&self, sig: &FunctionSig) -> Scope {
        let mut scope = self.variables.clone();
        for (name, ty) in &sig.params {
            scope.insert(name.clone(), ty.clone());
        }
        scope
    }
}

/// Resolve a type expression against an already complete alias table
pub fn resolve_type(expr: &TypeExpr, aliases: &HashMap<String, Type>) -> Result<Type> {
    match expr {
        TypeExpr::Int => Ok(Type::Int),
        TypeExpr::Float => Ok(Type::Float),
        TypeExpr::Bool => Ok(Type::Bool),
        TypeExpr::Named(ident) => aliases
            .get(&ident.name)
            .cloned()
            .ok_or_else(|| undeclared_type(ident)),
        TypeExpr::Array { size, element } => {
            Ok(Type::array(resolve_type(element, aliases)?, *size))
        }
    }
}

fn undeclared_type(ident: &Ident) -> Error {
    Error::UndeclaredType {
        name: ident.name.clone(),
        span: ident.span,
    }
}

/// Resolves aliases that may refer to aliases declared later in the list
struct AliasResolver<'d> {
    declared: HashMap<&'d str, &'d TypeDecl>,
    order: &'d [TypeDecl],
    resolved: HashMap<String, Type>,
    visiting: Vec<&'d str>,
}

impl<'d> AliasResolver<'d> {
    fn new(decls: &'d [TypeDecl]) -> Result<Self> {
        let mut declared = HashMap::new();
        for decl in decls {
            if declared.insert(decl.name.name.as_str(), decl).is_some() {
                return Err(Error::DuplicateDeclaration {
                    name: decl.name.name.clone(),
                    span: decl.name.span,
                });
            }
        }
        Ok(AliasResolver {
            declared,
            order: decls,
            resolved: HashMap::new(),
            visiting: Vec::new(),
        })
    }

    fn resolve_all(mut self) -> Result<HashMap<String, Type>> {
        for decl in self.order {
            self.resolve_decl(decl)?;
        }
        Ok(self.resolved)
    }

    fn resolve_decl(&mut self, decl: &'d TypeDecl) -> Result<Type> {
        let name = decl.name.name.as_str();
        if let Some(ty) = self.resolved.get(name) {
            return Ok(ty.clone());
        }
        if self.visiting.contains(&name) {
            return Err(Error::CyclicType {
                name: name.to_string(),
                span: decl.name.span,
            });
        }

        self.visiting.push(name);
        let ty = self.resolve_expr(&decl.ty)?;
        self.visiting.pop();

        self.resolved.insert(name.to_string(), ty.clone());
        Ok(ty)
    }

    fn resolve_expr(&mut self, expr: &'d TypeExpr) -> Result<Type> {
        match expr {
            TypeExpr::Int => Ok(Type::Int),
            TypeExpr::Float => Ok(Type::Float),
            TypeExpr::Bool => Ok(Type::Bool),
            TypeExpr::Named(ident) => {
                let decl = self
                    .declared
                    .get(ident.name.as_str())
                    .copied()
                    .ok_or_else(|| undeclared_type(ident))?;
                self.resolve_decl(decl)
            }
            TypeExpr::Array { size, element } => {
                Ok(Type::array(self.resolve_expr(element)?, *size))
            }
        }
    }
}

fn resolve_variables(decls: &[VarDecl], aliases: &HashMap<String, Type>) -> Result<Scope> {
    let mut variables = Scope::new();
    for decl in decls {
        let ty = resolve_type(&decl.ty, aliases)?;
        for ident in &decl.names {
            if variables.insert(ident.name.clone(), ty.clone()).is_some() {
                return Err(Error::DuplicateDeclaration {
                    name: ident.name.clone(),
                    span: ident.span,
                });
            }
        }
    }
    Ok(variables)
}

fn resolve_functions(
    decls: &[FunctionDecl],
    aliases: &HashMap<String, Type>,
) -> Result<HashMap<String, FunctionSig>> {
    let mut functions = HashMap::new();
    for decl in decls {
        let name = &decl.name;
        if is_builtin(&name.name)
            || name.name == ENTRY_POINT
            || functions.contains_key(&name.name)
        {
            return Err(Error::DuplicateDeclaration {
                name: name.name.clone(),
                span: name.span,
            });
        }

        let mut params: Vec<(String, Type)> = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            if params.iter().any(|(existing, _)| *existing == param.name.name) {
                return Err(Error::DuplicateDeclaration {
                    name: param.name.name.clone(),
                    span: param.name.span,
                });
            }
            params.push((param.name.name.clone(), resolve_type(&param.ty, aliases)?));
        }

        let ret = decl
            .ret
            .as_ref()
            .map(|ty| resolve_type(ty, aliases))
            .transpose()?;

        functions.insert(
            name.name.clone(),
            FunctionSig {
                ret,
                params,
                builtin: false,
            },
        );
    }
    Ok(functions)
}

fn inject_builtins(functions: &mut HashMap<String, FunctionSig>) {
    for name in BUILTIN_NAMES {
        let (param_types, ret) = builtin_signature(name);
        let params = param_types
            .into_iter()
            .enumerate()
            .map(|(i, ty)| (format!("arg{}", i), ty))
            .collect();
        functions.insert(
            name.to_string(),
            FunctionSig {
                ret,
                params,
                builtin: true,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{Param, Span};

    fn alias(name: &str, ty: TypeExpr) -> TypeDecl {
        TypeDecl {
            name: Ident::new(name),
            ty,
        }
    }

    fn named(name: &str) -> TypeExpr {
        TypeExpr::Named(Ident::at(name, 2, 9))
    }

    #[test]
    fn test_aliases_chase_other_aliases() {
        let decls = Declarations {
            types: vec![
                alias("matrix", TypeExpr::array(3, named("row"))),
                alias("row", TypeExpr::array(4, named("cell"))),
                alias("cell", TypeExpr::Float),
            ],
            ..Default::default()
        };

        let table = SymbolTable::build(&decls).unwrap();
        assert_eq!(
            table.alias("matrix"),
            Some(&Type::array(Type::array(Type::Float, 4), 3))
        );
        assert_eq!(table.alias("cell"), Some(&Type::Float));
    }

    #[test]
    fn test_unknown_alias_names_the_token() {
        let decls = Declarations {
            variables: vec![VarDecl {
                names: vec![Ident::new("x")],
                ty: named("missing"),
                init: None,
            }],
            ..Default::default()
        };

        let err = SymbolTable::build(&decls).unwrap_err();
        assert_eq!(
            err,
            Error::UndeclaredType {
                name: "missing".into(),
                span: Span::new(2, 9),
            }
        );
    }

    #[test]
    fn test_cyclic_alias_is_rejected() {
        let decls = Declarations {
            types: vec![alias("a", named("b")), alias("b", named("a"))],
            ..Default::default()
        };
        assert!(matches!(
            SymbolTable::build(&decls),
            Err(Error::CyclicType { .. })
        ));
    }

    #[test]
    fn test_variables_share_resolved_type() {
        let decls = Declarations {
            types: vec![alias("vec", TypeExpr::array(5, TypeExpr::Int))],
            variables: vec![VarDecl {
                names: vec![Ident::new("a"), Ident::new("b")],
                ty: named("vec"),
                init: None,
            }],
            ..Default::default()
        };

        let table = SymbolTable::build(&decls).unwrap();
        assert_eq!(table.variable("a"), Some(&Type::array(Type::Int, 5)));
        assert_eq!(table.variable("a"), table.variable("b"));
    }

    #[test]
    fn test_function_signatures_and_builtins() {
        let decls = Declarations {
            functions: vec![FunctionDecl {
                name: Ident::new("scale"),
                params: vec![
                    Param {
                        name: Ident::new("x"),
                        ty: TypeExpr::Float,
                    },
                    Param {
                        name: Ident::new("n"),
                        ty: TypeExpr::Int,
                    },
                ],
                ret: Some(TypeExpr::Float),
                body: Vec::new(),
            }],
            ..Default::default()
        };

        let table = SymbolTable::build(&decls).unwrap();
        let sig = table.function("scale").unwrap();
        assert_eq!(sig.ret, Some(Type::Float));
        assert_eq!(
            sig.params,
            vec![("x".to_string(), Type::Float), ("n".to_string(), Type::Int)]
        );
        assert!(!sig.builtin);

        let printi = table.function("printi").unwrap();
        assert!(printi.builtin);
        assert_eq!(printi.ret, None);
        assert_eq!(printi.params.len(), 1);
        assert_eq!(table.function("readf").unwrap().ret, Some(Type::Float));
    }

    #[test]
    fn test_function_scope_shadows_without_mutating_globals() {
        let decls = Declarations {
            variables: vec![VarDecl {
                names: vec![Ident::new("x")],
                ty: TypeExpr::Int,
                init: None,
            }],
            functions: vec![FunctionDecl {
                name: Ident::new("f"),
                params: vec![Param {
                    name: Ident::new("x"),
                    ty: TypeExpr::Float,
                }],
                ret: None,
                body: Vec::new(),
            }],
            ..Default::default()
        };

        let table = SymbolTable::build(&decls).unwrap();
        let scope = table.function_scope(table.function("f").unwrap());
        assert_eq!(scope.get("x"), Some(&Type::Float));
        assert_eq!(table.variable("x"), Some(&Type::Int));
    }

    #[test]
    fn test_redefining_builtin_is_rejected() {
        let decls = Declarations {
            functions: vec![FunctionDecl {
                name: Ident::new("printi"),
                params: Vec::new(),
                ret: None,
                body: Vec::new(),
            }],
            ..Default::default()
        };
        assert!(matches!(
            SymbolTable::build(&decls),
            Err(Error::DuplicateDeclaration { name, .. }) if name == "printi"
        ));
    }

    #[test]
    fn test_function_named_main_is_rejected() {
        let decls = Declarations {
            functions: vec![FunctionDecl {
                name: Ident::at("main", 3, 10),
                params: Vec::new(),
                ret: None,
                body: Vec::new(),
            }],
            ..Default::default()
        };
        assert_eq!(
            SymbolTable::build(&decls).unwrap_err(),
            Error::DuplicateDeclaration {
                name: "main".into(),
                span: Span::new(3, 10),
            }
        );
    }
}
