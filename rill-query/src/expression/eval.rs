//! Core recursive expression evaluation

use super::{arithmetic, compare, dispatch, exists, logical};
use crate::aggregate;
use crate::algebra::{ArithmeticOp, Expression};
use crate::context::EvaluationContext;
use crate::error::{ExprResult, ExpressionError};
use crate::multiset::{Multiset, SolutionId};
use crate::value::ValuedNode;

pub(crate) fn eval(
    expr: &Expression,
    ctx: &EvaluationContext<'_>,
    source: &Multiset,
    id: SolutionId,
) -> ExprResult<ValuedNode> {
    match expr {
        Expression::Var(var) => source
            .get(id)
            .and_then(|row| row.get(var))
            .map(|term| ValuedNode::new(term.clone()))
            .ok_or_else(|| ExpressionError::UnboundVariable(var.name().to_string())),

        Expression::Const(term) => Ok(ValuedNode::new(term.clone())),

        Expression::And(a, b) => logical::and(a, b, ctx, source, id),
        Expression::Or(a, b) => logical::or(a, b, ctx, source, id),
        Expression::Not(e) => logical::not(e, ctx, source, id),

        Expression::Compare(op, a, b) => {
            let left = eval(a, ctx, source, id)?;
            let right = eval(b, ctx, source, id)?;
            compare::compare(*op, &left, &right, ctx)
        }

        Expression::Arithmetic(op, a, b) => {
            let left = eval(a, ctx, source, id)?;
            let right = eval(b, ctx, source, id)?;
            match op {
                ArithmeticOp::Add => arithmetic::add(&left, &right),
                ArithmeticOp::Subtract => arithmetic::subtract(&left, &right),
                ArithmeticOp::Multiply => arithmetic::multiply(&left, &right),
                ArithmeticOp::Divide => arithmetic::divide(&left, &right),
            }
        }

        Expression::Negate(e) => arithmetic::negate(&eval(e, ctx, source, id)?),
        Expression::UnaryPlus(e) => arithmetic::unary_plus(eval(e, ctx, source, id)?),

        Expression::In {
            expr,
            list,
            negated,
        } => compare::in_list(expr, list, *negated, ctx, source, id),

        Expression::Call(function, args) => dispatch::call(*function, args, ctx, source, id),

        Expression::Exists {
            id: expr_id,
            pattern,
            negated,
        } => exists::eval_exists(*expr_id, pattern, *negated, ctx, source, id),

        Expression::Rand { id: expr_id } => {
            let (stamp, _) = source.identity_key();
            Ok(ValuedNode::double(ctx.random_for(*expr_id, stamp, id)))
        }

        Expression::Aggregate(agg) => {
            let grouped = source.as_grouped().ok_or(ExpressionError::NotGrouped)?;
            let group = grouped.group(id).ok_or(ExpressionError::NotGrouped)?;
            let contents = Multiset::Solutions(grouped.contents().clone());
            aggregate::evaluate(agg, ctx, &contents, group.members())?
                .ok_or(ExpressionError::NoValue(agg.function.name()))
        }

        Expression::Extension { function, args } => {
            let values = args
                .iter()
                .map(|a| eval(a, ctx, source, id))
                .collect::<ExprResult<Vec<_>>>()?;
            function.call(&values)
        }
    }
}

/// Evaluate every argument, failing on the first error
pub(super) fn eval_args(
    args: &[Expression],
    ctx: &EvaluationContext<'_>,
    source: &Multiset,
    id: SolutionId,
) -> ExprResult<Vec<ValuedNode>> {
    args.iter().map(|a| eval(a, ctx, source, id)).collect()
}
