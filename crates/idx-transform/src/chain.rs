//! Argument validation and chain decomposition for a single helper call.
//!
//! A call `idx(base, p => p.a.b())` is validated in a fixed order (arity,
//! arrow, expression body, one identifier parameter) and its callback body is
//! then peeled from the outside in until the parameter is reached. The steps
//! collected on the way, reversed, form the access chain.

use crate::error::{self, RewriteError};
use crate::options::ChainPolicy;
use swc_common::{Spanned, DUMMY_SP};
use swc_ecma_ast::{
    ArrowExpr, BlockStmtOrExpr, CallExpr, Callee, Expr, ExprOrSpread, Function, Ident, Invalid,
    MemberProp, Pat, Prop, TsTypeParamInstantiation,
};
use swc_ecma_visit::{Visit, VisitWith};

/// One link of an access chain, in evaluation order.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// `.name`, `[expr]` or `.#private`
    Member { prop: MemberProp },
    /// `(args)`
    Call {
        args: Vec<ExprOrSpread>,
        type_args: Option<Box<TsTypeParamInstantiation>>,
    },
}

/// A validated helper call, taken apart.
#[derive(Debug)]
pub struct Chain {
    /// The object expression (first argument)
    pub base: Box<Expr>,
    /// Steps applied to the base, first to last
    pub steps: Vec<Step>,
    /// Span of the whole call being replaced
    pub span: swc_common::Span,
}

/// Check the call's arguments without modifying it.
///
/// Returns the callback and its parameter on success.
pub fn check_arguments(call: &CallExpr) -> Result<(&ArrowExpr, &Ident), RewriteError> {
    if call.args.len() != 2 || call.args[0].spread.is_some() {
        return Err(RewriteError::arity(call.span));
    }

    let callback = &call.args[1].expr;
    let arrow = match strip_parens(callback) {
        Expr::Arrow(arrow) if call.args[1].spread.is_none() => arrow,
        _ => return Err(RewriteError::shape(error::NOT_ARROW, callback.span())),
    };

    if let BlockStmtOrExpr::BlockStmt(block) = &*arrow.body {
        return Err(RewriteError::shape(error::BLOCK_BODY, block.span));
    }

    if arrow.params.len() != 1 {
        return Err(RewriteError::shape(error::PARAM_COUNT, arrow.span));
    }

    match &arrow.params[0] {
        Pat::Ident(binding) => Ok((arrow, &binding.id)),
        other => Err(RewriteError::shape(error::PARAM_NOT_IDENT, other.span())),
    }
}

/// Validate `call` and move its parts out of it.
///
/// On success the call's arguments are left as placeholders; the caller is
/// expected to replace the whole call expression.
pub fn decompose(call: &mut CallExpr, policy: ChainPolicy) -> Result<Chain, RewriteError> {
    let (arrow, param) = check_arguments(call)?;
    let param = param.sym.to_string();
    let BlockStmtOrExpr::Expr(body) = &*arrow.body else {
        unreachable!("expression body checked above");
    };

    // Validate before taking anything apart.
    collect_steps(body, &param, policy)?;

    let base = take_expr(&mut call.args[0].expr);
    let mut callback = take_expr(&mut call.args[1].expr);
    while let Expr::Paren(paren) = *callback {
        callback = paren.expr;
    }
    let Expr::Arrow(arrow) = *callback else {
        unreachable!("arrow checked above");
    };
    let BlockStmtOrExpr::Expr(body) = *arrow.body else {
        unreachable!("expression body checked above");
    };

    Ok(Chain {
        base,
        steps: into_steps(body),
        span: call.span,
    })
}

/// Walk the body from the outermost node to the parameter, checking every
/// node against the policy. Returns the number of steps.
fn collect_steps(body: &Expr, param: &str, policy: ChainPolicy) -> Result<usize, RewriteError> {
    let shape_message = match policy {
        ChainPolicy::Strict => error::STRICT_BODY,
        ChainPolicy::Permissive => error::PERMISSIVE_BODY,
    };

    let mut count = 0;
    let mut node = body;
    loop {
        match node {
            Expr::Member(member) => {
                if let MemberProp::Computed(computed) = &member.prop {
                    check_no_param_use(&*computed.expr, param)?;
                }
                count += 1;
                node = &member.obj;
            }
            Expr::Call(call) if policy == ChainPolicy::Permissive => match &call.callee {
                Callee::Expr(callee) => {
                    check_no_param_use(&call.args, param)?;
                    count += 1;
                    node = callee;
                }
                _ => return Err(RewriteError::shape(shape_message, call.span)),
            },
            Expr::Paren(paren) => node = &paren.expr,
            Expr::Ident(ident) if &*ident.sym == param => return Ok(count),
            Expr::Ident(ident) => {
                return Err(RewriteError::shape(error::PARAM_MISMATCH, ident.span));
            }
            other => return Err(RewriteError::shape(shape_message, other.span())),
        }
    }
}

/// The parameter is gone once the callback is inlined, so a computed key or
/// call argument must not refer to it.
fn check_no_param_use<'a, N>(node: &N, param: &'a str) -> Result<(), RewriteError>
where
    N: VisitWith<ParamUse<'a>> + ?Sized,
{
    let mut finder = ParamUse { param, found: None };
    node.visit_with(&mut finder);
    match finder.found {
        Some(span) => Err(RewriteError::shape(error::PARAM_ESCAPES, span)),
        None => Ok(()),
    }
}

struct ParamUse<'a> {
    param: &'a str,
    found: Option<swc_common::Span>,
}

impl ParamUse<'_> {
    fn check(&mut self, ident: &Ident) {
        if self.found.is_none() && &*ident.sym == self.param {
            self.found = Some(ident.span);
        }
    }

    fn binds_param<'p>(&self, mut params: impl Iterator<Item = &'p Pat>) -> bool {
        params.any(|p| matches!(p, Pat::Ident(binding) if &*binding.id.sym == self.param))
    }
}

impl Visit for ParamUse<'_> {
    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(ident) => self.check(ident),
            _ => expr.visit_children_with(self),
        }
    }

    fn visit_prop(&mut self, prop: &Prop) {
        match prop {
            Prop::Shorthand(ident) => self.check(ident),
            _ => prop.visit_children_with(self),
        }
    }

    // A nested callback with its own `_` shadows the parameter.
    fn visit_arrow_expr(&mut self, arrow: &ArrowExpr) {
        if !self.binds_param(arrow.params.iter()) {
            arrow.visit_children_with(self);
        }
    }

    fn visit_function(&mut self, function: &Function) {
        if !self.binds_param(function.params.iter().map(|p| &p.pat)) {
            function.visit_children_with(self);
        }
    }
}

/// Peel an already validated body into steps, first to last.
fn into_steps(body: Box<Expr>) -> Vec<Step> {
    let mut steps = Vec::new();
    let mut node = body;
    loop {
        match *node {
            Expr::Member(member) => {
                steps.push(Step::Member { prop: member.prop });
                node = member.obj;
            }
            Expr::Call(call) => {
                let Callee::Expr(callee) = call.callee else {
                    break;
                };
                steps.push(Step::Call {
                    args: call.args,
                    type_args: call.type_args,
                });
                node = callee;
            }
            Expr::Paren(paren) => node = paren.expr,
            _ => break,
        }
    }
    steps.reverse();
    steps
}

fn strip_parens(mut expr: &Expr) -> &Expr {
    while let Expr::Paren(paren) = expr {
        expr = &paren.expr;
    }
    expr
}

fn take_expr(slot: &mut Box<Expr>) -> Box<Expr> {
    std::mem::replace(slot, Box::new(Expr::Invalid(Invalid { span: DUMMY_SP })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_ecma_ast::{ModuleItem, Program, Stmt};

    fn call_of(source: &str) -> CallExpr {
        let parsed = idx_parser::parse(source, "test.js").unwrap();
        let stmt = match parsed.program {
            Program::Module(mut m) => match m.body.remove(0) {
                ModuleItem::Stmt(stmt) => stmt,
                _ => panic!("expected statement"),
            },
            Program::Script(mut s) => s.body.remove(0),
        };
        let Stmt::Expr(expr_stmt) = stmt else {
            panic!("expected expression statement");
        };
        let Expr::Call(call) = *expr_stmt.expr else {
            panic!("expected call");
        };
        call
    }

    fn message(source: &str, policy: ChainPolicy) -> &'static str {
        decompose(&mut call_of(source), policy).unwrap_err().message()
    }

    #[test]
    fn test_arity() {
        assert_eq!(message("idx(a);", ChainPolicy::Permissive), error::ARITY);
        assert_eq!(message("idx(a, _ => _.b, c);", ChainPolicy::Permissive), error::ARITY);
        assert_eq!(message("idx(...args);", ChainPolicy::Permissive), error::ARITY);
    }

    #[test]
    fn test_callback_shape_errors_in_order() {
        let p = ChainPolicy::Permissive;
        assert_eq!(message("idx(a, function (_) { return _.b; });", p), error::NOT_ARROW);
        assert_eq!(message("idx(a, f);", p), error::NOT_ARROW);
        assert_eq!(message("idx(a, _ => { return _.b; });", p), error::BLOCK_BODY);
        assert_eq!(message("idx(a, () => a.b);", p), error::PARAM_COUNT);
        assert_eq!(message("idx(a, (x, y) => x.b);", p), error::PARAM_COUNT);
        assert_eq!(message("idx(a, ({ b }) => b);", p), error::PARAM_NOT_IDENT);
        assert_eq!(message("idx(a, _ => a.b);", p), error::PARAM_MISMATCH);
    }

    #[test]
    fn test_body_grammar_by_policy() {
        assert_eq!(
            message("idx(a, _ => _.b + 1);", ChainPolicy::Permissive),
            error::PERMISSIVE_BODY
        );
        assert_eq!(
            message("idx(a, _ => _.b?.c);", ChainPolicy::Permissive),
            error::PERMISSIVE_BODY
        );
        assert_eq!(
            message("idx(a, _ => _.b());", ChainPolicy::Strict),
            error::STRICT_BODY
        );
        assert_eq!(
            message("idx(a, _ => _.b + 1);", ChainPolicy::Strict),
            error::STRICT_BODY
        );
    }

    #[test]
    fn test_steps_are_in_evaluation_order() {
        let mut call = call_of("idx(a, _ => _.b[c](d, e).f);");
        let chain = decompose(&mut call, ChainPolicy::Permissive).unwrap();

        assert!(matches!(*chain.base, Expr::Ident(ref i) if &*i.sym == "a"));
        assert_eq!(chain.steps.len(), 4);
        assert!(matches!(&chain.steps[0], Step::Member { prop: MemberProp::Ident(p) } if &*p.sym == "b"));
        assert!(matches!(&chain.steps[1], Step::Member { prop: MemberProp::Computed(_) }));
        assert!(matches!(&chain.steps[2], Step::Call { args, .. } if args.len() == 2));
        assert!(matches!(&chain.steps[3], Step::Member { prop: MemberProp::Ident(p) } if &*p.sym == "f"));
    }

    #[test]
    fn test_parameter_cannot_leave_the_chain() {
        let p = ChainPolicy::Permissive;
        assert_eq!(message("idx(a, _ => _.b[_.c]);", p), error::PARAM_ESCAPES);
        assert_eq!(message("idx(a, _ => _.b.get(_));", p), error::PARAM_ESCAPES);
        assert_eq!(message("idx(a, _ => _.b.f({ _ }));", p), error::PARAM_ESCAPES);
        assert_eq!(message("idx(a, x => x[x.length - 1]);", ChainPolicy::Strict), error::PARAM_ESCAPES);

        // Other names, and callbacks binding their own `_`, are fine
        assert!(decompose(&mut call_of("idx(a, _ => _.b[c.d]);"), p).is_ok());
        assert!(decompose(&mut call_of("idx(a, _ => _.b.map(_ => _.c));"), p).is_ok());
    }

    #[test]
    fn test_parens_are_transparent() {
        let mut call = call_of("idx(a, (_ => ((_).b).c));");
        let chain = decompose(&mut call, ChainPolicy::Strict).unwrap();
        assert_eq!(chain.steps.len(), 2);
    }

    #[test]
    fn test_identity_callback_has_no_steps() {
        let mut call = call_of("idx(a, _ => _);");
        let chain = decompose(&mut call, ChainPolicy::Permissive).unwrap();
        assert!(chain.steps.is_empty());
    }

    #[test]
    fn test_check_arguments_leaves_call_intact() {
        let call = call_of("idx(a, x => x.b);");
        let (_, param) = check_arguments(&call).unwrap();
        assert_eq!(&*param.sym, "x");
        assert_eq!(call.args.len(), 2);
    }
}
