//! A small evaluator for the expressions the rewriter deals in, so rewritten
//! programs can be run against the runtime helper's semantics.

use idx_runtime::{Nullish, Thrown};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use swc_ecma_ast::*;

type NativeFn = dyn Fn(&Value, Vec<Value>) -> Result<Value, Thrown>;

#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Object(Rc<BTreeMap<String, Value>>),
    Function(Rc<NativeFn>),
}

impl Value {
    pub fn object<'k>(entries: impl IntoIterator<Item = (&'k str, Value)>) -> Value {
        Value::Object(Rc::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        ))
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Object(Rc::new(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
        ))
    }

    pub fn function(f: impl Fn(&Value, Vec<Value>) -> Result<Value, Thrown> + 'static) -> Value {
        Value::Function(Rc::new(f))
    }

    pub fn str(s: &str) -> Value {
        Value::Str(s.to_string())
    }

    fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Object(_) | Value::Function(_) => true,
        }
    }

    pub fn get(&self, key: &str) -> Result<Value, Thrown> {
        match self {
            Value::Undefined | Value::Null => Err(Thrown::type_error(format!(
                "Cannot read properties of {} (reading '{}')",
                if matches!(self, Value::Null) { "null" } else { "undefined" },
                key
            ))),
            Value::Object(map) => Ok(map.get(key).cloned().unwrap_or(Value::Undefined)),
            Value::Str(s) if key == "length" => Ok(Value::Num(s.chars().count() as f64)),
            _ => Ok(Value::Undefined),
        }
    }

    fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Nullish<Value>> for Value {
    fn from(result: Nullish<Value>) -> Self {
        match result {
            Nullish::Value(v) => v,
            Nullish::Null => Value::Null,
            Nullish::Undefined => Value::Undefined,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (a, b) => !a.is_nullish() && a.loose_eq(b),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Num(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Object(map) => f.debug_map().entries(map.iter()).finish(),
            Value::Function(_) => write!(f, "[function]"),
        }
    }
}

#[derive(Clone, Default)]
pub struct Env {
    vars: HashMap<String, Value>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.vars.insert(name.to_string(), value);
        self
    }

    /// Run variable declarations and expression statements, returning the
    /// value of the last expression statement.
    pub fn run(&mut self, program: &Program) -> Result<Value, Thrown> {
        let stmts: Vec<&Stmt> = match program {
            Program::Module(module) => module
                .body
                .iter()
                .filter_map(|item| match item {
                    ModuleItem::Stmt(stmt) => Some(stmt),
                    ModuleItem::ModuleDecl(_) => None,
                })
                .collect(),
            Program::Script(script) => script.body.iter().collect(),
        };

        let mut last = Value::Undefined;
        for stmt in stmts {
            match stmt {
                Stmt::Decl(Decl::Var(var)) => {
                    for declarator in &var.decls {
                        let Pat::Ident(name) = &declarator.name else {
                            panic!("unsupported declarator");
                        };
                        let value = match &declarator.init {
                            Some(init) => self.eval(init)?,
                            None => Value::Undefined,
                        };
                        self.vars.insert(name.id.sym.to_string(), value);
                    }
                }
                Stmt::Expr(expr) => last = self.eval(&expr.expr)?,
                other => panic!("unsupported statement: {:?}", other),
            }
        }
        Ok(last)
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value, Thrown> {
        match expr {
            Expr::Paren(paren) => self.eval(&paren.expr),
            Expr::Ident(ident) => match &*ident.sym {
                "undefined" => Ok(Value::Undefined),
                name => self.vars.get(name).cloned().ok_or_else(|| {
                    Thrown::error("ReferenceError", format!("{} is not defined", name))
                }),
            },
            Expr::Lit(Lit::Null(_)) => Ok(Value::Null),
            Expr::Lit(Lit::Num(n)) => Ok(Value::Num(n.value)),
            Expr::Lit(Lit::Bool(b)) => Ok(Value::Bool(b.value)),
            Expr::Lit(Lit::Str(s)) => Ok(Value::Str(s.value.as_str().unwrap_or("").to_string())),
            Expr::Member(member) => {
                let object = self.eval(&member.obj)?;
                let key = self.key(&member.prop)?;
                object.get(&key)
            }
            Expr::Call(call) => self.call(call),
            Expr::Assign(assign) => {
                let AssignTarget::Simple(SimpleAssignTarget::Ident(target)) = &assign.left else {
                    panic!("unsupported assignment target");
                };
                let value = self.eval(&assign.right)?;
                self.vars.insert(target.id.sym.to_string(), value.clone());
                Ok(value)
            }
            Expr::Bin(bin) if matches!(bin.op, BinaryOp::NotEq | BinaryOp::EqEq) => {
                let left = self.eval(&bin.left)?;
                let right = self.eval(&bin.right)?;
                let equal = left.loose_eq(&right);
                Ok(Value::Bool(if bin.op == BinaryOp::EqEq { equal } else { !equal }))
            }
            Expr::Cond(cond) => {
                if self.eval(&cond.test)?.truthy() {
                    self.eval(&cond.cons)
                } else {
                    self.eval(&cond.alt)
                }
            }
            Expr::Arrow(arrow) => Ok(self.closure(arrow)),
            other => panic!("unsupported expression: {:?}", other),
        }
    }

    /// An expression-bodied arrow, capturing the current variables.
    fn closure(&self, arrow: &ArrowExpr) -> Value {
        let BlockStmtOrExpr::Expr(body) = &*arrow.body else {
            panic!("unsupported arrow body");
        };
        let params: Vec<String> = arrow
            .params
            .iter()
            .map(|param| match param {
                Pat::Ident(binding) => binding.id.sym.to_string(),
                other => panic!("unsupported parameter: {:?}", other),
            })
            .collect();
        let body = body.clone();
        let captured = self.clone();

        Value::function(move |_, args| {
            let mut env = captured.clone();
            let mut args = args.into_iter();
            for name in &params {
                env = env.with(name, args.next().unwrap_or(Value::Undefined));
            }
            env.eval(&body)
        })
    }

    fn key(&mut self, prop: &MemberProp) -> Result<String, Thrown> {
        match prop {
            MemberProp::Ident(name) => Ok(name.sym.to_string()),
            MemberProp::Computed(computed) => Ok(match self.eval(&computed.expr)? {
                Value::Num(n) if n.fract() == 0.0 => format!("{}", n as i64),
                Value::Str(s) => s,
                other => format!("{:?}", other),
            }),
            MemberProp::PrivateName(_) => panic!("unsupported private name"),
        }
    }

    /// Calls keep the receiver as `this`. A non-function callee fails with
    /// the name of the property that held it.
    fn call(&mut self, call: &CallExpr) -> Result<Value, Thrown> {
        let Callee::Expr(callee) = &call.callee else {
            panic!("unsupported callee");
        };

        let mut callee: &Expr = callee;
        while let Expr::Paren(paren) = callee {
            callee = &paren.expr;
        }

        let (this, function, name) = match callee {
            Expr::Member(member) => {
                let object = self.eval(&member.obj)?;
                let key = self.key(&member.prop)?;
                let function = object.get(&key)?;
                (object, function, key)
            }
            other => (Value::Undefined, self.eval(other)?, "expression".to_string()),
        };

        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(self.eval(&arg.expr)?);
        }

        match function {
            Value::Function(f) => f(&this, args),
            _ => Err(Thrown::type_error(format!("{} is not a function", name))),
        }
    }
}
