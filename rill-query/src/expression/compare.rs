//! Relational operators and IN / NOT IN

use super::eval::eval;
use crate::algebra::{CompareOp, Expression};
use crate::context::EvaluationContext;
use crate::error::ExprResult;
use crate::multiset::{Multiset, SolutionId};
use crate::value::ValuedNode;
use std::cmp::Ordering;

pub fn compare(
    op: CompareOp,
    left: &ValuedNode,
    right: &ValuedNode,
    ctx: &EvaluationContext<'_>,
) -> ExprResult<ValuedNode> {
    let comparer = ctx.relational();
    let result = match op {
        CompareOp::Eq => comparer.equals(left, right)?,
        CompareOp::Ne => !comparer.equals(left, right)?,
        CompareOp::Lt => comparer.compare(op.symbol(), left, right)? == Ordering::Less,
        CompareOp::Le => comparer.compare(op.symbol(), left, right)? != Ordering::Greater,
        CompareOp::Gt => comparer.compare(op.symbol(), left, right)? == Ordering::Greater,
        CompareOp::Ge => comparer.compare(op.symbol(), left, right)? != Ordering::Less,
    };
    Ok(ValuedNode::boolean(result))
}

/// `IN` is true on the first equal member; with no match, any member error
/// is the result, else false
pub fn in_list(
    expr: &Expression,
    list: &[Expression],
    negated: bool,
    ctx: &EvaluationContext<'_>,
    source: &Multiset,
    id: SolutionId,
) -> ExprResult<ValuedNode> {
    let needle = eval(expr, ctx, source, id)?;
    let mut error = None;
    for member in list {
        let outcome = eval(member, ctx, source, id)
            .and_then(|value| ctx.relational().equals(&needle, &value));
        match outcome {
            Ok(true) => return Ok(ValuedNode::boolean(!negated)),
            Ok(false) => {}
            Err(e) => {
                error.get_or_insert(e);
            }
        }
    }
    match error {
        Some(e) => Err(e),
        None => Ok(ValuedNode::boolean(negated)),
    }
}
