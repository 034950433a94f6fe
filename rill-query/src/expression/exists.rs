//! EXISTS / NOT EXISTS
//!
//! The pattern is evaluated once per (expression, active graph, input
//! multiset) in an isolated context and semi-joined against the whole
//! input. The ids of the input solutions with a compatible match are
//! cached, so each row after the first is a set lookup.

use crate::algebra::{Algebra, ExprId};
use crate::context::EvaluationContext;
use crate::error::{ExprResult, ExpressionError};
use crate::multiset::{Multiset, SolutionId};
use crate::value::ValuedNode;
use tracing::trace;

pub(super) fn eval_exists(
    expr_id: ExprId,
    pattern: &Algebra,
    negated: bool,
    ctx: &EvaluationContext<'_>,
    source: &Multiset,
    id: SolutionId,
) -> ExprResult<ValuedNode> {
    let (stamp, count) = source.identity_key();
    let key = (expr_id, ctx.active_graph().clone(), stamp, count);

    let matching = match ctx.cached_exists(&key) {
        Some(ids) => ids,
        None => {
            let mut nested = ctx.isolated();
            let result = nested.evaluate(pattern).map_err(|e| {
                trace!(error = %e, "EXISTS pattern failed");
                ExpressionError::Nested(e.to_string())
            })?;
            trace!(
                rows = result.len(),
                inputs = count,
                negated,
                "EXISTS pattern evaluated"
            );
            ctx.store_exists(key, source.compatible_ids(&result))
        }
    };

    Ok(ValuedNode::boolean(matching.contains(&id) != negated))
}
