//! Guard chain construction.
//!
//! For the chain `base.a.b` and temporary `t` the builder produces
//!
//! ```text
//! (t = base) != null ? (t = t.a) != null ? t.b : t : t
//! ```
//!
//! Every intermediate value is evaluated once, stored in `t` and compared
//! loosely against `null` (which also catches `undefined`). The last level is
//! applied without a guard, so an absent leaf is passed through unchanged and
//! an absent intermediate yields that absent value itself.

use crate::chain::{Chain, Step};
use swc_common::{Span, SyntaxContext, DUMMY_SP};
use swc_ecma_ast::{
    AssignExpr, AssignOp, AssignTarget, BinExpr, BinaryOp, BindingIdent, CallExpr, Callee,
    CondExpr, Expr, ExprOrSpread, Ident, Lit, MemberExpr, MemberProp, Null, ParenExpr,
    SimpleAssignTarget, TsTypeParamInstantiation,
};

/// One guarded unit of a chain.
///
/// A member access directly followed by a call is kept together as a method
/// call so the callee still receives its object as `this`.
#[derive(Debug, Clone, PartialEq)]
pub enum Level {
    Member(MemberProp),
    Call {
        args: Vec<ExprOrSpread>,
        type_args: Option<Box<TsTypeParamInstantiation>>,
    },
    Method {
        prop: MemberProp,
        args: Vec<ExprOrSpread>,
        type_args: Option<Box<TsTypeParamInstantiation>>,
    },
}

/// Group chain steps into levels.
pub fn levels(steps: Vec<Step>) -> Vec<Level> {
    let mut levels = Vec::with_capacity(steps.len());
    let mut steps = steps.into_iter().peekable();
    while let Some(step) = steps.next() {
        match step {
            Step::Member { prop } => match steps.next_if(|next| matches!(next, Step::Call { .. })) {
                Some(Step::Call { args, type_args }) => levels.push(Level::Method {
                    prop,
                    args,
                    type_args,
                }),
                _ => levels.push(Level::Member(prop)),
            },
            Step::Call { args, type_args } => levels.push(Level::Call { args, type_args }),
        }
    }
    levels
}

/// Build the guard chain for `chain`, storing intermediates in the
/// temporary returned by `temp`.
///
/// `temp` is only called when the chain has at least one level. The result
/// is wrapped in a generated parenthesis; see [`is_generated_paren`]. The
/// outermost conditional takes the call's span, so comments in front of the
/// call stay in front of it.
pub fn build(chain: Chain, temp: impl FnOnce() -> Ident) -> Box<Expr> {
    let mut levels = levels(chain.steps);

    let Some(last) = levels.pop() else {
        return paren(chain.base);
    };

    let temp = temp();
    let mut expr = apply(last, &temp);
    while let Some(level) = levels.pop() {
        let value = apply(level, &temp);
        expr = guard(DUMMY_SP, &temp, value, expr);
    }
    paren(guard(chain.span, &temp, chain.base, expr))
}

/// Whether `expr` is a parenthesis added by [`build`] rather than one
/// written in the source.
pub fn is_generated_paren(expr: &Expr) -> bool {
    matches!(expr, Expr::Paren(p) if p.span.is_dummy())
}

/// `(temp = value) != null ? then : temp`
fn guard(span: Span, temp: &Ident, value: Box<Expr>, then: Box<Expr>) -> Box<Expr> {
    let assign = Box::new(Expr::Assign(AssignExpr {
        span: DUMMY_SP,
        op: AssignOp::Assign,
        left: AssignTarget::Simple(SimpleAssignTarget::Ident(BindingIdent {
            id: temp.clone(),
            type_ann: None,
        })),
        right: value,
    }));

    let test = Box::new(Expr::Bin(BinExpr {
        span: DUMMY_SP,
        op: BinaryOp::NotEq,
        left: Box::new(Expr::Paren(ParenExpr {
            span: DUMMY_SP,
            expr: assign,
        })),
        right: Box::new(Expr::Lit(Lit::Null(Null { span: DUMMY_SP }))),
    }));

    Box::new(Expr::Cond(CondExpr {
        span,
        test,
        cons: then,
        alt: Box::new(Expr::Ident(temp.clone())),
    }))
}

fn apply(level: Level, temp: &Ident) -> Box<Expr> {
    let object = Box::new(Expr::Ident(temp.clone()));
    match level {
        Level::Member(prop) => member(object, prop),
        Level::Call { args, type_args } => call(object, args, type_args),
        Level::Method {
            prop,
            args,
            type_args,
        } => call(member(object, prop), args, type_args),
    }
}

fn member(obj: Box<Expr>, prop: MemberProp) -> Box<Expr> {
    Box::new(Expr::Member(MemberExpr {
        span: DUMMY_SP,
        obj,
        prop,
    }))
}

fn call(
    callee: Box<Expr>,
    args: Vec<ExprOrSpread>,
    type_args: Option<Box<TsTypeParamInstantiation>>,
) -> Box<Expr> {
    Box::new(Expr::Call(CallExpr {
        span: DUMMY_SP,
        ctxt: SyntaxContext::empty(),
        callee: Callee::Expr(callee),
        args,
        type_args,
    }))
}

fn paren(expr: Box<Expr>) -> Box<Expr> {
    Box::new(Expr::Paren(ParenExpr {
        span: DUMMY_SP,
        expr,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_ecma_ast::IdentName;

    fn prop(name: &str) -> MemberProp {
        MemberProp::Ident(IdentName::new(name.into(), DUMMY_SP))
    }

    fn ident(name: &str) -> Ident {
        Ident::new_no_ctxt(name.into(), DUMMY_SP)
    }

    #[test]
    fn test_member_followed_by_call_is_a_method_level() {
        let steps = vec![
            Step::Member { prop: prop("a") },
            Step::Member { prop: prop("b") },
            Step::Call {
                args: vec![],
                type_args: None,
            },
            Step::Call {
                args: vec![],
                type_args: None,
            },
        ];
        let levels = levels(steps);
        assert_eq!(levels.len(), 3);
        assert!(matches!(levels[0], Level::Member(_)));
        assert!(matches!(levels[1], Level::Method { .. }));
        assert!(matches!(levels[2], Level::Call { .. }));
    }

    #[test]
    fn test_single_level_has_one_guard() {
        let chain = Chain {
            base: Box::new(Expr::Ident(ident("base"))),
            steps: vec![Step::Member { prop: prop("a") }],
            span: DUMMY_SP,
        };
        let built = build(chain, || ident("_ref"));
        assert!(is_generated_paren(&built));

        let Expr::Paren(outer) = *built else { unreachable!() };
        let Expr::Cond(cond) = *outer.expr else {
            panic!("expected conditional");
        };
        assert!(matches!(*cond.cons, Expr::Member(_)));
        assert!(matches!(*cond.alt, Expr::Ident(ref i) if &*i.sym == "_ref"));
    }

    #[test]
    fn test_empty_chain_is_the_base() {
        let chain = Chain {
            base: Box::new(Expr::Ident(ident("base"))),
            steps: vec![],
            span: DUMMY_SP,
        };
        let built = build(chain, || panic!("no temporary needed"));
        let Expr::Paren(outer) = *built else {
            panic!("expected generated paren");
        };
        assert!(matches!(*outer.expr, Expr::Ident(ref i) if &*i.sym == "base"));
    }
}
