//! Call-site rewriting.
//!
//! Replaces every planned helper call with its guard chain, declares the
//! temporaries in the nearest declaration holder (program, function body,
//! arrow, static block) and removes helper declarations whose references
//! were all rewritten. Comments in front of a removed declaration move to
//! the statement after it.

use crate::binding::RewritePlan;
use crate::chain;
use crate::error::RewriteError;
use crate::guard;
use crate::options::{HoistPriority, Options};
use crate::scope::UidGenerator;
use serde::Serialize;
use std::collections::HashSet;
use swc_common::comments::Comments;
use swc_common::{BytePos, Span, Spanned, SyntaxContext, DUMMY_SP};
use swc_ecma_ast::*;
use swc_ecma_visit::{VisitMut, VisitMutWith};

/// A temporary declared by the rewriter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Temporary {
    pub name: String,
    pub priority: HoistPriority,
}

struct Holder {
    priority: HoistPriority,
    names: Vec<String>,
}

/// What the rewriter did to a program.
#[derive(Debug, Default)]
pub struct RewriteOutcome {
    pub calls_rewritten: usize,
    pub temporaries: Vec<Temporary>,
}

pub struct CallSiteRewriter<'a> {
    plan: &'a RewritePlan,
    options: &'a Options,
    uid: UidGenerator,
    removals: HashSet<Span>,
    comments: Option<&'a dyn Comments>,
    /// Comments here belong to the program and are printed by it
    program_start: BytePos,
    holders: Vec<Holder>,
    outcome: RewriteOutcome,
    error: Option<RewriteError>,
}

impl<'a> CallSiteRewriter<'a> {
    pub fn new(
        plan: &'a RewritePlan,
        options: &'a Options,
        uid: UidGenerator,
        comments: Option<&'a dyn Comments>,
    ) -> Self {
        Self {
            plan,
            options,
            uid,
            removals: plan.removals(),
            comments,
            program_start: BytePos::DUMMY,
            holders: Vec::new(),
            outcome: RewriteOutcome::default(),
            error: None,
        }
    }

    /// The first error met during the traversal, or the outcome.
    pub fn finish(self) -> Result<RewriteOutcome, RewriteError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.outcome),
        }
    }

    fn is_target(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Call(CallExpr {
                callee: Callee::Expr(callee),
                ..
            }) => matches!(strip_parens(callee), Expr::Ident(ident) if self.plan.is_target(ident.span)),
            _ => false,
        }
    }

    /// Drop the items `keep` rejects. Leading comments of a dropped item
    /// move to the next kept item, or behind the last one.
    fn retain_items<T: Spanned>(&self, items: &mut Vec<T>, mut keep: impl FnMut(&T) -> bool) {
        let Some(comments) = self.comments else {
            items.retain(|item| keep(item));
            return;
        };

        let mut pending: Vec<BytePos> = Vec::new();
        let mut previous_end = None;
        items.retain(|item| {
            let span = item.span();
            if !keep(item) {
                if span.lo != self.program_start {
                    pending.push(span.lo);
                }
                return false;
            }
            // move_leading keeps comments from earlier positions first
            for from in pending.drain(..).rev() {
                comments.move_leading(from, span.lo);
            }
            previous_end = Some(span.hi);
            true
        });

        for from in pending {
            match (previous_end, comments.take_leading(from)) {
                (Some(end), Some(moved)) => comments.add_trailing_comments(end, moved),
                (None, Some(moved)) => {
                    log::trace!("dropping {} comment(s) of a removed declaration", moved.len())
                }
                _ => {}
            }
        }
    }

    /// Visit the arguments of a helper call before the call itself.
    ///
    /// The callback is not a declaration holder: its body is moved out of
    /// it, so temporaries of nested calls belong to the enclosing holder.
    fn visit_helper_args(&mut self, call: &mut CallExpr) {
        for (index, arg) in call.args.iter_mut().enumerate() {
            if index == 1 {
                if let Some(arrow) = callback_arrow(&mut arg.expr) {
                    arrow.body.visit_mut_with(self);
                    continue;
                }
            }
            arg.visit_mut_with(self);
        }
    }

    fn rewrite_call(&mut self, call: &mut CallExpr) -> Result<Box<Expr>, RewriteError> {
        let chain = chain::decompose(call, self.options.policy)?;
        log::trace!("rewriting call with {} step(s)", chain.steps.len());
        self.outcome.calls_rewritten += 1;
        Ok(guard::build(chain, || self.allocate_temp()))
    }

    fn allocate_temp(&mut self) -> Ident {
        let name = self.uid.generate("ref");
        match self.holders.last_mut() {
            Some(holder) => {
                holder.names.push(name.clone());
                self.outcome.temporaries.push(Temporary {
                    name: name.clone(),
                    priority: holder.priority,
                });
            }
            None => log::warn!("no declaration holder for `{}`", name),
        }
        Ident::new_no_ctxt(name.into(), DUMMY_SP)
    }

    fn push_holder(&mut self, priority: HoistPriority) {
        self.holders.push(Holder {
            priority,
            names: Vec::new(),
        });
    }

    /// Pop the innermost holder, returning its `var` statement if it
    /// declared anything.
    fn pop_holder(&mut self) -> Option<Stmt> {
        let holder = self.holders.pop()?;
        if holder.names.is_empty() {
            return None;
        }
        Some(var_declaration(holder.names))
    }

    fn with_holder(&mut self, priority: HoistPriority, stmts: &mut Vec<Stmt>) {
        self.push_holder(priority);
        stmts.visit_mut_with(self);
        if let Some(decl) = self.pop_holder() {
            let at = directive_count(stmts.iter());
            stmts.insert(at, decl);
        }
    }

    fn method_priority(&self, is_async: bool) -> HoistPriority {
        if is_async {
            self.options.async_method_hoist
        } else {
            HoistPriority::DEFAULT
        }
    }

    fn rewrite_function(&mut self, function: &mut Function, priority: HoistPriority) {
        function.decorators.visit_mut_with(self);
        // Parameter initializers cannot see body declarations.
        function.params.visit_mut_with(self);
        if let Some(body) = &mut function.body {
            self.with_holder(priority, &mut body.stmts);
        }
    }
}

impl VisitMut for CallSiteRewriter<'_> {
    fn visit_mut_expr(&mut self, expr: &mut Expr) {
        if self.error.is_some() {
            return;
        }
        if !self.is_target(expr) {
            expr.visit_mut_children_with(self);
            return;
        }

        let Expr::Call(call) = expr else {
            return;
        };
        self.visit_helper_args(call);
        if self.error.is_some() {
            return;
        }
        match self.rewrite_call(call) {
            Ok(replacement) => *expr = *replacement,
            Err(err) => self.error = Some(err),
        }
    }

    // Declaration holders

    fn visit_mut_module(&mut self, module: &mut Module) {
        self.program_start = module.span.lo;
        self.push_holder(HoistPriority::DEFAULT);
        module.body.visit_mut_with(self);
        if let Some(decl) = self.pop_holder() {
            let at = module
                .body
                .iter()
                .take_while(|item| matches!(item, ModuleItem::Stmt(stmt) if is_directive(stmt)))
                .count();
            module.body.insert(at, ModuleItem::Stmt(decl));
        }
    }

    fn visit_mut_script(&mut self, script: &mut Script) {
        self.program_start = script.span.lo;
        self.with_holder(HoistPriority::DEFAULT, &mut script.body);
    }

    fn visit_mut_function(&mut self, function: &mut Function) {
        self.rewrite_function(function, HoistPriority::DEFAULT);
    }

    fn visit_mut_class_method(&mut self, method: &mut ClassMethod) {
        method.key.visit_mut_with(self);
        let priority = self.method_priority(method.function.is_async);
        self.rewrite_function(&mut method.function, priority);
    }

    fn visit_mut_private_method(&mut self, method: &mut PrivateMethod) {
        let priority = self.method_priority(method.function.is_async);
        self.rewrite_function(&mut method.function, priority);
    }

    fn visit_mut_constructor(&mut self, ctor: &mut Constructor) {
        ctor.key.visit_mut_with(self);
        ctor.params.visit_mut_with(self);
        if let Some(body) = &mut ctor.body {
            self.with_holder(HoistPriority::DEFAULT, &mut body.stmts);
        }
    }

    fn visit_mut_getter_prop(&mut self, getter: &mut GetterProp) {
        getter.key.visit_mut_with(self);
        if let Some(body) = &mut getter.body {
            self.with_holder(HoistPriority::DEFAULT, &mut body.stmts);
        }
    }

    fn visit_mut_setter_prop(&mut self, setter: &mut SetterProp) {
        setter.key.visit_mut_with(self);
        setter.param.visit_mut_with(self);
        if let Some(body) = &mut setter.body {
            self.with_holder(HoistPriority::DEFAULT, &mut body.stmts);
        }
    }

    fn visit_mut_static_block(&mut self, block: &mut StaticBlock) {
        self.with_holder(HoistPriority::DEFAULT, &mut block.body.stmts);
    }

    fn visit_mut_arrow_expr(&mut self, arrow: &mut ArrowExpr) {
        arrow.params.visit_mut_with(self);

        self.push_holder(HoistPriority::DEFAULT);
        arrow.body.visit_mut_with(self);
        let decl = self.pop_holder();

        let body = std::mem::replace(&mut *arrow.body, BlockStmtOrExpr::Expr(Box::new(invalid())));
        *arrow.body = match (body, decl) {
            (BlockStmtOrExpr::BlockStmt(mut block), Some(decl)) => {
                let at = directive_count(block.stmts.iter());
                block.stmts.insert(at, decl);
                BlockStmtOrExpr::BlockStmt(block)
            }
            // x => <expr> becomes x => { var _ref; return <expr>; }
            (BlockStmtOrExpr::Expr(mut expr), Some(decl)) => {
                unwrap_generated(&mut expr);
                BlockStmtOrExpr::BlockStmt(BlockStmt {
                    span: DUMMY_SP,
                    ctxt: SyntaxContext::empty(),
                    stmts: vec![
                        decl,
                        Stmt::Return(ReturnStmt {
                            span: DUMMY_SP,
                            arg: Some(expr),
                        }),
                    ],
                })
            }
            (BlockStmtOrExpr::Expr(mut expr), None) => {
                unwrap_generated_cond(&mut expr);
                BlockStmtOrExpr::Expr(expr)
            }
            (body, None) => body,
        };
    }

    // Declaration removal

    fn visit_mut_var_decl(&mut self, var: &mut VarDecl) {
        var.visit_mut_children_with(self);
        if !self.removals.is_empty() && self.error.is_none() {
            var.decls.retain(|d| !self.removals.contains(&d.span));
        }
    }

    fn visit_mut_module_items(&mut self, items: &mut Vec<ModuleItem>) {
        for item in items.iter_mut() {
            match item {
                // Emptied declarations are dropped below rather than replaced
                ModuleItem::Stmt(stmt) => stmt.visit_mut_children_with(self),
                other => other.visit_mut_with(self),
            }
        }
        if self.removals.is_empty() || self.error.is_some() {
            return;
        }
        let removals = &self.removals;
        self.retain_items(items, |item| match item {
            ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => !removals.contains(&import.span),
            ModuleItem::Stmt(stmt) => !is_emptied_var(stmt),
            _ => true,
        });
    }

    fn visit_mut_stmts(&mut self, stmts: &mut Vec<Stmt>) {
        for stmt in stmts.iter_mut() {
            stmt.visit_mut_children_with(self);
        }
        if self.removals.is_empty() || self.error.is_some() {
            return;
        }
        self.retain_items(stmts, |stmt| !is_emptied_var(stmt));
    }

    /// `if (x) var idx = require('idx');` keeps an empty statement.
    fn visit_mut_stmt(&mut self, stmt: &mut Stmt) {
        stmt.visit_mut_children_with(self);
        if is_emptied_var(stmt) {
            *stmt = Stmt::Empty(EmptyStmt { span: DUMMY_SP });
        }
    }

    fn visit_mut_for_stmt(&mut self, stmt: &mut ForStmt) {
        stmt.visit_mut_children_with(self);
        if matches!(&stmt.init, Some(VarDeclOrExpr::VarDecl(var)) if var.decls.is_empty()) {
            stmt.init = None;
        }
    }

    // Contexts where a rewritten call needs no parentheses

    fn visit_mut_expr_stmt(&mut self, stmt: &mut ExprStmt) {
        stmt.visit_mut_children_with(self);
        unwrap_generated_cond(&mut stmt.expr);
    }

    fn visit_mut_assign_expr(&mut self, assign: &mut AssignExpr) {
        assign.visit_mut_children_with(self);
        unwrap_generated(&mut assign.right);
    }

    fn visit_mut_var_declarator(&mut self, declarator: &mut VarDeclarator) {
        declarator.visit_mut_children_with(self);
        if let Some(init) = &mut declarator.init {
            unwrap_generated(init);
        }
    }

    fn visit_mut_return_stmt(&mut self, stmt: &mut ReturnStmt) {
        stmt.visit_mut_children_with(self);
        if let Some(arg) = &mut stmt.arg {
            unwrap_generated(arg);
        }
    }

    fn visit_mut_throw_stmt(&mut self, stmt: &mut ThrowStmt) {
        stmt.visit_mut_children_with(self);
        unwrap_generated(&mut stmt.arg);
    }

    fn visit_mut_expr_or_spread(&mut self, arg: &mut ExprOrSpread) {
        arg.visit_mut_children_with(self);
        unwrap_generated(&mut arg.expr);
    }

    fn visit_mut_cond_expr(&mut self, cond: &mut CondExpr) {
        cond.visit_mut_children_with(self);
        unwrap_generated(&mut cond.cons);
        unwrap_generated(&mut cond.alt);
    }

    fn visit_mut_key_value_prop(&mut self, prop: &mut KeyValueProp) {
        prop.visit_mut_children_with(self);
        unwrap_generated(&mut prop.value);
    }

    fn visit_mut_computed_prop_name(&mut self, prop: &mut ComputedPropName) {
        prop.visit_mut_children_with(self);
        unwrap_generated(&mut prop.expr);
    }

    fn visit_mut_seq_expr(&mut self, seq: &mut SeqExpr) {
        seq.visit_mut_children_with(self);
        for expr in &mut seq.exprs {
            unwrap_generated(expr);
        }
    }

    fn visit_mut_paren_expr(&mut self, paren: &mut ParenExpr) {
        paren.visit_mut_children_with(self);
        unwrap_generated(&mut paren.expr);
    }

    fn visit_mut_tpl(&mut self, tpl: &mut Tpl) {
        tpl.visit_mut_children_with(self);
        for expr in &mut tpl.exprs {
            unwrap_generated(expr);
        }
    }

    fn visit_mut_jsx_expr_container(&mut self, container: &mut JSXExprContainer) {
        container.visit_mut_children_with(self);
        if let JSXExpr::Expr(expr) = &mut container.expr {
            unwrap_generated(expr);
        }
    }

    fn visit_mut_assign_pat(&mut self, pat: &mut AssignPat) {
        pat.visit_mut_children_with(self);
        unwrap_generated(&mut pat.right);
    }

    fn visit_mut_class_prop(&mut self, prop: &mut ClassProp) {
        prop.visit_mut_children_with(self);
        if let Some(value) = &mut prop.value {
            unwrap_generated(value);
        }
    }
}

/// A `var`/`let`/`const` whose declarators were all removed.
fn is_emptied_var(stmt: &Stmt) -> bool {
    matches!(stmt, Stmt::Decl(Decl::Var(var)) if var.decls.is_empty())
}

fn strip_parens(mut expr: &Expr) -> &Expr {
    while let Expr::Paren(paren) = expr {
        expr = &paren.expr;
    }
    expr
}

fn callback_arrow(expr: &mut Expr) -> Option<&mut ArrowExpr> {
    match expr {
        Expr::Arrow(arrow) => Some(arrow),
        Expr::Paren(paren) => callback_arrow(&mut paren.expr),
        _ => None,
    }
}

fn unwrap_generated(expr: &mut Box<Expr>) {
    if !guard::is_generated_paren(expr) {
        return;
    }
    if let Expr::Paren(paren) = &mut **expr {
        let inner = std::mem::replace(&mut paren.expr, Box::new(invalid()));
        *expr = inner;
    }
}

/// Statement and arrow-body positions: only a conditional is safe to
/// unwrap, a bare base expression could be an object literal.
fn unwrap_generated_cond(expr: &mut Box<Expr>) {
    if matches!(&**expr, Expr::Paren(paren) if paren.span.is_dummy() && matches!(*paren.expr, Expr::Cond(_)))
    {
        unwrap_generated(expr);
    }
}

fn invalid() -> Expr {
    Expr::Invalid(Invalid { span: DUMMY_SP })
}

fn var_declaration(names: Vec<String>) -> Stmt {
    Stmt::Decl(Decl::Var(Box::new(VarDecl {
        span: DUMMY_SP,
        ctxt: SyntaxContext::empty(),
        kind: VarDeclKind::Var,
        declare: false,
        decls: names
            .into_iter()
            .map(|name| VarDeclarator {
                span: DUMMY_SP,
                name: Pat::Ident(BindingIdent {
                    id: Ident::new_no_ctxt(name.into(), DUMMY_SP),
                    type_ann: None,
                }),
                init: None,
                definite: false,
            })
            .collect(),
    })))
}

fn is_directive(stmt: &Stmt) -> bool {
    matches!(stmt, Stmt::Expr(ExprStmt { expr, .. }) if matches!(&**expr, Expr::Lit(Lit::Str(_))))
}

fn directive_count<'s>(stmts: impl Iterator<Item = &'s Stmt>) -> usize {
    stmts.take_while(|stmt| is_directive(stmt)).count()
}
