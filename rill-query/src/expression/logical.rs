//! Logical operators with SPARQL three-valued error semantics
//!
//! `&&` is false if either side is false, `||` is true if either side is
//! true; otherwise an error on either side is the result.

use super::eval::eval;
use crate::algebra::Expression;
use crate::context::EvaluationContext;
use crate::error::ExprResult;
use crate::multiset::{Multiset, SolutionId};
use crate::value::ValuedNode;

fn ebv(
    expr: &Expression,
    ctx: &EvaluationContext<'_>,
    source: &Multiset,
    id: SolutionId,
) -> ExprResult<bool> {
    eval(expr, ctx, source, id)?.effective_boolean_value()
}

pub fn and(
    a: &Expression,
    b: &Expression,
    ctx: &EvaluationContext<'_>,
    source: &Multiset,
    id: SolutionId,
) -> ExprResult<ValuedNode> {
    let left = ebv(a, ctx, source, id);
    if let Ok(false) = left {
        return Ok(ValuedNode::boolean(false));
    }
    match (left, ebv(b, ctx, source, id)) {
        (_, Ok(false)) => Ok(ValuedNode::boolean(false)),
        (Ok(true), Ok(true)) => Ok(ValuedNode::boolean(true)),
        (Err(e), _) | (_, Err(e)) => Err(e),
        (Ok(false), _) => Ok(ValuedNode::boolean(false)),
    }
}

pub fn or(
    a: &Expression,
    b: &Expression,
    ctx: &EvaluationContext<'_>,
    source: &Multiset,
    id: SolutionId,
) -> ExprResult<ValuedNode> {
    let left = ebv(a, ctx, source, id);
    if let Ok(true) = left {
        return Ok(ValuedNode::boolean(true));
    }
    match (left, ebv(b, ctx, source, id)) {
        (_, Ok(true)) => Ok(ValuedNode::boolean(true)),
        (Ok(false), Ok(false)) => Ok(ValuedNode::boolean(false)),
        (Err(e), _) | (_, Err(e)) => Err(e),
        (Ok(true), _) => Ok(ValuedNode::boolean(true)),
    }
}

pub fn not(
    e: &Expression,
    ctx: &EvaluationContext<'_>,
    source: &Multiset,
    id: SolutionId,
) -> ExprResult<ValuedNode> {
    Ok(ValuedNode::boolean(!ebv(e, ctx, source, id)?))
}
