//! Conditional functions: BOUND, IF, COALESCE
//!
//! These evaluate their arguments lazily.

use super::eval::eval;
use super::helpers::check_arity;
use crate::algebra::Expression;
use crate::context::EvaluationContext;
use crate::error::{ExprResult, ExpressionError};
use crate::multiset::{Multiset, SolutionId};
use crate::value::ValuedNode;

pub fn bound(args: &[Expression], source: &Multiset, id: SolutionId) -> ExprResult<ValuedNode> {
    check_arity(args, 1, "BOUND")?;
    match &args[0] {
        Expression::Var(var) => {
            let bound = source.get(id).map_or(false, |row| row.contains(var));
            Ok(ValuedNode::boolean(bound))
        }
        _ => Err(ExpressionError::invalid_argument(
            "BOUND",
            "argument must be a variable",
        )),
    }
}

pub fn if_then_else(
    args: &[Expression],
    ctx: &EvaluationContext<'_>,
    source: &Multiset,
    id: SolutionId,
) -> ExprResult<ValuedNode> {
    check_arity(args, 3, "IF")?;
    if eval(&args[0], ctx, source, id)?.effective_boolean_value()? {
        eval(&args[1], ctx, source, id)
    } else {
        eval(&args[2], ctx, source, id)
    }
}

pub fn coalesce(
    args: &[Expression],
    ctx: &EvaluationContext<'_>,
    source: &Multiset,
    id: SolutionId,
) -> ExprResult<ValuedNode> {
    args.iter()
        .find_map(|arg| eval(arg, ctx, source, id).ok())
        .ok_or(ExpressionError::NoValue("COALESCE"))
}
