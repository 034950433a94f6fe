//! Aggregate evaluation over a group of solutions
//!
//! An aggregate is evaluated once per group (or once over the whole input
//! when there is no GROUP BY) against the pre-grouping solutions whose ids
//! make up the group.
//!
//! # Row errors
//!
//! - SUM, COUNT, MIN, MAX, MEDIAN, MODE, SAMPLE: an erroring row is left out.
//! - AVG: any erroring row makes the result unbound.
//! - GROUP_CONCAT / STRING_JOIN: an erroring row contributes an empty string.
//! - ALL: an erroring row counts as false. ANY and NONE ignore it.
//!
//! # Empty groups
//!
//! COUNT and SUM give integer 0, AVG gives integer 0, NMIN / NMAX / MIN /
//! MAX / SAMPLE / MEDIAN / MODE give unbound.
//!
//! GROUP_CONCAT and STRING_JOIN concatenate in solution id order.

use crate::algebra::{Aggregate, AggregateArg, AggregateFunction, Expression};
use crate::context::EvaluationContext;
use crate::error::{ExprResult, ExpressionError};
use crate::multiset::{Multiset, SolutionId};
use crate::value::{NumericType, ValuedNode};
use bigdecimal::BigDecimal;
use num_traits::Zero;
use rill_core::Term;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;
use tracing::trace;

/// Evaluate `agg` over the solutions `members` of `contents`
///
/// `Ok(None)` means the aggregate has no value for this group.
pub fn evaluate(
    agg: &Aggregate,
    ctx: &EvaluationContext<'_>,
    contents: &Multiset,
    members: &[SolutionId],
) -> ExprResult<Option<ValuedNode>> {
    let expr = match &agg.arg {
        AggregateArg::Star => {
            if agg.function != AggregateFunction::Count {
                return Err(ExpressionError::invalid_argument(
                    agg.function.name(),
                    "* is only allowed in COUNT",
                ));
            }
            return Ok(Some(count_star(contents, members, agg.distinct)));
        }
        AggregateArg::Expr(expr) => expr,
    };

    let values = collect(expr, ctx, contents, members, agg.distinct);

    let result = match &agg.function {
        AggregateFunction::Count => Some(count(&values)),
        AggregateFunction::Sum => Some(sum(&values)),
        AggregateFunction::Avg => avg(&values),
        AggregateFunction::Min => extreme(&values, ctx, Ordering::Less),
        AggregateFunction::Max => extreme(&values, ctx, Ordering::Greater),
        AggregateFunction::NumericMin => numeric_extreme(&values, ctx, Ordering::Less),
        AggregateFunction::NumericMax => numeric_extreme(&values, ctx, Ordering::Greater),
        AggregateFunction::Sample => values.iter().find_map(|v| v.as_ref().ok().cloned()),
        AggregateFunction::GroupConcat { separator } => {
            Some(concat(&values, separator, group_concat_part))
        }
        AggregateFunction::StringJoin { separator } => {
            Some(concat(&values, separator, string_join_part))
        }
        AggregateFunction::Median => median(&values),
        AggregateFunction::Mode => mode(&values),
        AggregateFunction::All => Some(ValuedNode::boolean(values.iter().all(is_true))),
        AggregateFunction::Any => Some(ValuedNode::boolean(values.iter().any(is_true))),
        AggregateFunction::NoneOf => {
            Some(ValuedNode::boolean(!values.iter().any(is_true)))
        }
    };
    Ok(result)
}

/// Argument values in member order; DISTINCT drops repeated terms but keeps
/// every error
fn collect(
    expr: &Expression,
    ctx: &EvaluationContext<'_>,
    contents: &Multiset,
    members: &[SolutionId],
    distinct: bool,
) -> Vec<ExprResult<ValuedNode>> {
    let mut seen: FxHashSet<Term> = FxHashSet::default();
    members
        .iter()
        .map(|&id| expr.evaluate_in(ctx, contents, id))
        .filter(|value| match value {
            Ok(v) if distinct => seen.insert(v.term().clone()),
            _ => true,
        })
        .collect()
}

fn count_star(contents: &Multiset, members: &[SolutionId], distinct: bool) -> ValuedNode {
    if !distinct {
        return ValuedNode::integer(members.len() as i64);
    }
    let vars = contents.vars().to_vec();
    let unique: FxHashSet<Vec<Option<Term>>> = members
        .iter()
        .filter_map(|&id| contents.get(id))
        .map(|row| row.key(&vars))
        .collect();
    ValuedNode::integer(unique.len() as i64)
}

fn count(values: &[ExprResult<ValuedNode>]) -> ValuedNode {
    ValuedNode::integer(values.iter().filter(|v| v.is_ok()).count() as i64)
}

fn is_true(value: &ExprResult<ValuedNode>) -> bool {
    match value {
        Ok(v) => v.effective_boolean_value().unwrap_or(false),
        Err(e) => {
            trace!(error = %e, "boolean aggregate row failed");
            false
        }
    }
}

/// Running totals kept at every numeric width at once
///
/// Only the width of the widest contributing value is read back, so an
/// all-integer group never goes through floating point.
struct NumericTotals {
    widest: NumericType,
    count: usize,
    integer: Option<i64>,
    decimal: Option<BigDecimal>,
    float: f32,
    double: f64,
}

impl NumericTotals {
    fn new() -> Self {
        Self {
            widest: NumericType::NaN,
            count: 0,
            integer: Some(0),
            decimal: Some(BigDecimal::zero()),
            float: 0.0,
            double: 0.0,
        }
    }

    /// Add a numeric value; false when the value is not numeric
    fn add(&mut self, value: &ValuedNode) -> bool {
        let t = value.numeric_type();
        if !t.is_numeric() {
            return false;
        }
        self.widest = self.widest.promote(t);
        self.count += 1;
        self.integer = match (self.integer, value.as_integer()) {
            (Some(total), Ok(i)) => total.checked_add(i),
            _ => None,
        };
        self.decimal = match (self.decimal.take(), value.as_decimal()) {
            (Some(total), Ok(d)) => Some(total + d),
            _ => None,
        };
        self.float += value.as_float().unwrap_or(f32::NAN);
        self.double += value.as_double().unwrap_or(f64::NAN);
        true
    }

    fn total(&self) -> ValuedNode {
        match self.widest {
            NumericType::NaN => ValuedNode::integer(0),
            NumericType::Integer => match (self.integer, &self.decimal) {
                (Some(i), _) => ValuedNode::integer(i),
                (None, Some(d)) => ValuedNode::decimal(d.clone()),
                (None, None) => ValuedNode::double(self.double),
            },
            NumericType::Decimal => match &self.decimal {
                Some(d) => ValuedNode::decimal(d.clone()),
                None => ValuedNode::double(self.double),
            },
            NumericType::Float => ValuedNode::float(self.float),
            NumericType::Double => ValuedNode::double(self.double),
        }
    }

    fn mean(&self) -> ValuedNode {
        if self.count == 0 {
            return ValuedNode::integer(0);
        }
        let n = self.count;
        match self.widest {
            NumericType::Float => ValuedNode::float(self.float / n as f32),
            NumericType::Double => ValuedNode::double(self.double / n as f64),
            _ => match &self.decimal {
                Some(d) => ValuedNode::decimal(d.clone() / BigDecimal::from(n as u64)),
                None => ValuedNode::double(self.double / n as f64),
            },
        }
    }
}

fn sum(values: &[ExprResult<ValuedNode>]) -> ValuedNode {
    let mut totals = NumericTotals::new();
    for value in values {
        match value {
            Ok(v) => {
                if !totals.add(v) {
                    trace!(value = %v, "SUM skipping non-numeric value");
                }
            }
            Err(e) => trace!(error = %e, "SUM skipping row"),
        }
    }
    totals.total()
}

fn avg(values: &[ExprResult<ValuedNode>]) -> Option<ValuedNode> {
    let mut totals = NumericTotals::new();
    for value in values {
        match value {
            Ok(v) => {
                totals.add(v);
            }
            Err(e) => {
                trace!(error = %e, "AVG unbound after row error");
                return None;
            }
        }
    }
    Some(totals.mean())
}

/// MIN / MAX under the ordering comparer
fn extreme(
    values: &[ExprResult<ValuedNode>],
    ctx: &EvaluationContext<'_>,
    wanted: Ordering,
) -> Option<ValuedNode> {
    let ordering = ctx.ordering();
    values
        .iter()
        .filter_map(|v| v.as_ref().ok())
        .fold(None::<&ValuedNode>, |best, v| match best {
            Some(b) if ordering.compare_nodes(v, b) != wanted => Some(b),
            _ => Some(v),
        })
        .cloned()
}

/// NMIN / NMAX: numeric values only, compared after promotion
fn numeric_extreme(
    values: &[ExprResult<ValuedNode>],
    ctx: &EvaluationContext<'_>,
    wanted: Ordering,
) -> Option<ValuedNode> {
    let relational = ctx.relational();
    let mut best: Option<&ValuedNode> = None;
    let mut widest = NumericType::NaN;
    for v in values.iter().filter_map(|v| v.as_ref().ok()) {
        if !v.is_numeric() {
            continue;
        }
        widest = widest.promote(v.numeric_type());
        best = match best {
            Some(b) if relational.try_compare(v, b) != Some(wanted) => Some(b),
            _ => Some(v),
        };
    }
    best.map(|b| widen(b, widest))
}

/// Restate a numeric value at a wider numeric type
fn widen(value: &ValuedNode, to: NumericType) -> ValuedNode {
    if value.numeric_type() == to {
        return value.clone();
    }
    let widened = match to {
        NumericType::Decimal => value.as_decimal().ok().map(ValuedNode::decimal),
        NumericType::Float => value.as_float().ok().map(ValuedNode::float),
        NumericType::Double => value.as_double().ok().map(ValuedNode::double),
        _ => None,
    };
    widened.unwrap_or_else(|| value.clone())
}

fn group_concat_part(value: &ValuedNode) -> Option<String> {
    match value.term() {
        Term::Literal(lit) => Some(lit.lexical().to_string()),
        Term::Iri(iri) => Some(iri.to_string()),
        _ => None,
    }
}

fn string_join_part(value: &ValuedNode) -> Option<String> {
    value
        .as_literal()
        .filter(|lit| lit.is_simple())
        .map(|lit| lit.lexical().to_string())
}

fn concat(
    values: &[ExprResult<ValuedNode>],
    separator: &str,
    part: fn(&ValuedNode) -> Option<String>,
) -> ValuedNode {
    let parts: Vec<String> = values
        .iter()
        .map(|v| match v {
            Ok(v) => part(v).unwrap_or_default(),
            Err(e) => {
                trace!(error = %e, "concatenation row contributes an empty string");
                String::new()
            }
        })
        .collect();
    ValuedNode::string(parts.join(separator))
}

/// Upper median under raw term order
fn median(values: &[ExprResult<ValuedNode>]) -> Option<ValuedNode> {
    let mut terms: Vec<&ValuedNode> = values.iter().filter_map(|v| v.as_ref().ok()).collect();
    if terms.is_empty() {
        return None;
    }
    terms.sort_by(|a, b| a.term().cmp(b.term()));
    Some(terms[terms.len() / 2].clone())
}

/// Most frequent value, provided it beats the number of rows with no value
fn mode(values: &[ExprResult<ValuedNode>]) -> Option<ValuedNode> {
    let mut counts: FxHashMap<&Term, usize> = FxHashMap::default();
    let mut order: Vec<&ValuedNode> = Vec::new();
    let mut missing = 0usize;
    for value in values {
        match value {
            Ok(v) => {
                let n = counts.entry(v.term()).or_insert(0);
                if *n == 0 {
                    order.push(v);
                }
                *n += 1;
            }
            Err(_) => missing += 1,
        }
    }
    let mut best: Option<(&ValuedNode, usize)> = None;
    for v in order {
        let n = counts.get(v.term()).copied().unwrap_or(0);
        if best.map_or(true, |(_, m)| n > m) {
            best = Some((v, n));
        }
    }
    best.filter(|(_, n)| *n > missing).map(|(v, _)| v.clone())
}
