//! Algebra processor
//!
//! Recursive dispatcher evaluating each [`Algebra`] operator to a
//! [`Multiset`]. Every operator runs inside a `evaluate` debug span, moves
//! the context depth and checks the query timer on entry and exit. The
//! output of each completed operator is recorded on the context so that
//! [`evaluate_root`] can return it when the query times out with partial
//! results enabled.
//!
//! # Input multiset
//!
//! Operators are pure functions of their children. The context input is
//! only changed while the right side of a join or left join is evaluated,
//! where it holds the left solutions; SERVICE and GRAPH read it to ship
//! bindings and to pick the graphs a bound graph variable allows.

use crate::aggregate;
use crate::algebra::{Aggregate, Algebra, Expression, GroupKey, OrderCondition, PatternTerm, TriplePattern};
use crate::context::EvaluationContext;
use crate::error::{QueryError, Result};
use crate::multiset::{BindingGroup, GroupedSet, Multiset, Solution, SolutionId, SolutionSet};
use crate::property_path;
use crate::service;
use crate::value::ValuedNode;
use crate::var::Var;
use rill_core::{GraphName, Term};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

/// Evaluate a top-level query
///
/// Identical to [`evaluate`] except that a timeout returns the most recently
/// completed operator output when partial results are enabled.
pub fn evaluate_root(algebra: &Algebra, ctx: &mut EvaluationContext<'_>) -> Result<Multiset> {
    match evaluate(algebra, ctx) {
        Err(QueryError::Timeout(e)) if ctx.options().partial_results_on_timeout => {
            tracing::debug!(
                timeout_ms = e.timeout_ms,
                elapsed_ms = e.elapsed_ms,
                rows = ctx.output().len(),
                "query timed out, returning partial results"
            );
            Ok(ctx.output().clone())
        }
        other => other,
    }
}

/// Evaluate one operator tree
pub fn evaluate(algebra: &Algebra, ctx: &mut EvaluationContext<'_>) -> Result<Multiset> {
    let span = tracing::debug_span!(
        "evaluate",
        op = algebra.name(),
        depth = ctx.depth(),
        rows_out = tracing::field::Empty,
        ms = tracing::field::Empty
    );
    let _guard = span.enter();
    let start = Instant::now();

    ctx.check_timeout()?;
    ctx.enter();
    let result = dispatch(algebra, ctx);
    ctx.exit();
    let output = result?;
    ctx.check_timeout()?;

    span.record("rows_out", output.len() as u64);
    span.record("ms", (start.elapsed().as_secs_f64() * 1000.0) as u64);
    ctx.set_output(&output);
    Ok(output)
}

fn dispatch(algebra: &Algebra, ctx: &mut EvaluationContext<'_>) -> Result<Multiset> {
    match algebra {
        Algebra::Bgp(patterns) => bgp(patterns, ctx),

        Algebra::Join(left, right) => {
            let lhs = evaluate(left, ctx)?;
            if lhs.is_empty() {
                return Ok(Multiset::Null);
            }
            let rhs = with_input(ctx, lhs.clone(), |ctx| evaluate(right, ctx))?;
            Ok(lhs.join(&rhs, ctx.parallelism()))
        }

        Algebra::LeftJoin {
            left,
            right,
            filter,
        } => left_join(left, right, filter.as_ref(), ctx),

        Algebra::Minus(left, right) => {
            let lhs = evaluate(left, ctx)?;
            if lhs.is_empty() {
                return Ok(lhs);
            }
            let rhs_vars = right.variables();
            if !lhs.vars().iter().any(|v| rhs_vars.contains(v)) {
                trace!("MINUS operands share no variables, right side skipped");
                return Ok(lhs);
            }
            let rhs = evaluate(right, ctx)?;
            Ok(lhs.minus_join(&rhs))
        }

        Algebra::Union(left, right) => {
            let lhs = evaluate(left, ctx)?;
            let rhs = evaluate(right, ctx)?;
            Ok(lhs.union(&rhs))
        }

        Algebra::Filter { inner, expr } => {
            let input = evaluate(inner, ctx)?;
            Ok(filter(&input, expr, ctx))
        }

        Algebra::Extend { inner, var, expr } => {
            let input = evaluate(inner, ctx)?;
            extend(input, var, expr, ctx)
        }

        Algebra::Graph { graph, inner } => graph_pattern(graph, inner, ctx),

        Algebra::GroupBy {
            inner,
            keys,
            aggregates,
        } => {
            let input = evaluate(inner, ctx)?;
            group_by(&input, keys, aggregates, ctx)
        }

        Algebra::Having { inner, expr } => {
            let input = evaluate(inner, ctx)?;
            Ok(filter(&input, expr, ctx))
        }

        Algebra::OrderBy { inner, conditions } => {
            let input = evaluate(inner, ctx)?;
            Ok(order_by(&input, conditions, ctx))
        }

        Algebra::Distinct(inner) | Algebra::Reduced(inner) => Ok(evaluate(inner, ctx)?.distinct()),

        Algebra::Slice {
            inner,
            offset,
            limit,
        } => {
            let input = evaluate(inner, ctx)?;
            Ok(slice(&input, *offset, *limit))
        }

        Algebra::Select { inner, vars } => {
            let input = evaluate(inner, ctx)?;
            Ok(match vars {
                None => input,
                Some(vars) => match input {
                    Multiset::Null => Multiset::empty(vars.clone()),
                    other => Multiset::Solutions(other.to_solution_set().project(vars)),
                },
            })
        }

        Algebra::Service {
            endpoint,
            inner,
            silent,
        } => service::evaluate(endpoint, inner, *silent, ctx),

        Algebra::Values { vars, rows } => Ok(values(vars, rows)),

        Algebra::Path {
            subject,
            path,
            object,
        } => property_path::evaluate(subject, path, object, ctx),

        Algebra::Ask(inner) => Ok(ask(evaluate(inner, ctx)?.is_empty())),

        Algebra::AskAnyTriples => Ok(ask(ctx.find(None, None, None)?.is_empty())),

        Algebra::AskUnion(left, right) => {
            let lhs = evaluate(left, ctx)?;
            if !lhs.is_empty() {
                return Ok(lhs);
            }
            evaluate(right, ctx)
        }

        Algebra::SubQuery(inner) => {
            let mut nested = ctx.isolated();
            Ok(match nested.evaluate(inner)? {
                Multiset::Grouped(g) => Multiset::Solutions(g.output().clone()),
                other => other,
            })
        }

        Algebra::SelectDistinctGraphs { var } => {
            let rows = ctx
                .graph_names()?
                .into_iter()
                .map(|g| Solution::new().with(var.clone(), g))
                .collect();
            Ok(Multiset::from_rows(vec![var.clone()], rows))
        }

        Algebra::Unknown(op) => op.evaluate(ctx),
    }
}

/// Run `f` with `input` installed as the context input
fn with_input<T>(
    ctx: &mut EvaluationContext<'_>,
    input: Multiset,
    f: impl FnOnce(&mut EvaluationContext<'_>) -> Result<T>,
) -> Result<T> {
    let previous = ctx.set_input(input);
    let result = f(ctx);
    ctx.set_input(previous);
    result
}

/// Run `f` with `graph` as the active graph
fn with_graph<T>(
    ctx: &mut EvaluationContext<'_>,
    graph: GraphName,
    f: impl FnOnce(&mut EvaluationContext<'_>) -> Result<T>,
) -> Result<T> {
    let previous = ctx.set_active_graph(graph);
    let result = f(ctx);
    ctx.set_active_graph(previous);
    result
}

fn ask(empty: bool) -> Multiset {
    if empty {
        Multiset::Null
    } else {
        Multiset::Identity
    }
}

// ============================================================================
// Basic graph patterns
// ============================================================================

fn bgp(patterns: &[TriplePattern], ctx: &EvaluationContext<'_>) -> Result<Multiset> {
    let mut acc = Multiset::Identity;
    for pattern in patterns {
        let matches = triple_pattern(pattern, ctx)?;
        acc = acc.join(&matches, ctx.parallelism());
        if acc.is_empty() {
            return Ok(Multiset::Null);
        }
    }
    Ok(acc)
}

/// Solutions of one triple pattern; a variable repeated across positions
/// must bind the same term
fn triple_pattern(pattern: &TriplePattern, ctx: &EvaluationContext<'_>) -> Result<Multiset> {
    let triples = ctx.find(
        pattern.subject.as_term(),
        pattern.predicate.as_term(),
        pattern.object.as_term(),
    )?;
    let vars = pattern.vars();
    if vars.is_empty() {
        return Ok(ask(triples.is_empty()));
    }
    let positions = [&pattern.subject, &pattern.predicate, &pattern.object];
    let rows = triples
        .into_iter()
        .filter_map(|t| {
            let mut row = Solution::new();
            for (pos, term) in positions.iter().zip([t.subject, t.predicate, t.object]) {
                if let PatternTerm::Var(v) = pos {
                    if let Some(existing) = row.get(v) {
                        if existing != &term {
                            return None;
                        }
                    } else {
                        row.insert(v.clone(), term);
                    }
                }
            }
            Some(row)
        })
        .collect();
    Ok(Multiset::from_rows(vars, rows))
}

// ============================================================================
// Joins and filters
// ============================================================================

fn left_join(
    left: &Algebra,
    right: &Algebra,
    condition: Option<&Expression>,
    ctx: &mut EvaluationContext<'_>,
) -> Result<Multiset> {
    let lhs = evaluate(left, ctx)?;
    if lhs.is_empty() {
        return Ok(Multiset::Null);
    }
    let rhs = with_input(ctx, lhs.clone(), |ctx| evaluate(right, ctx))?;
    let ctx = &*ctx;
    Ok(lhs.left_join(&rhs, ctx.parallelism(), |candidates, id| match condition {
        None => true,
        Some(expr) => {
            let source = Multiset::Solutions(candidates.clone());
            match expr.evaluate_bool(ctx, &source, id) {
                Ok(keep) => keep,
                Err(e) => {
                    trace!(error = %e, "OPTIONAL filter error, pairing rejected");
                    false
                }
            }
        }
    }))
}

/// Keep the solutions whose effective boolean value is true
fn filter(input: &Multiset, expr: &Expression, ctx: &EvaluationContext<'_>) -> Multiset {
    let ids: Vec<SolutionId> = input
        .ids()
        .filter(|&id| match expr.evaluate_bool(ctx, input, id) {
            Ok(keep) => keep,
            Err(e) => {
                trace!(error = %e, id, "filter error, solution dropped");
                false
            }
        })
        .collect();
    input.select(&ids)
}

fn extend(input: Multiset, var: &Var, expr: &Expression, ctx: &EvaluationContext<'_>) -> Result<Multiset> {
    if input.contains_var(var) {
        return Err(QueryError::InvalidQuery(format!(
            "BIND target {} is already in scope",
            var
        )));
    }
    let values = input
        .ids()
        .map(|id| match expr.evaluate_in(ctx, &input, id) {
            Ok(v) => Some(v.into_term()),
            Err(e) => {
                trace!(error = %e, var = %var, id, "BIND error, variable left unbound");
                None
            }
        })
        .collect();
    Ok(input.extend(var.clone(), values))
}

// ============================================================================
// GRAPH
// ============================================================================

fn graph_pattern(graph: &PatternTerm, inner: &Algebra, ctx: &mut EvaluationContext<'_>) -> Result<Multiset> {
    match graph {
        PatternTerm::Term(name) => {
            if !ctx.scope().allows_named(name) || !ctx.graph_names()?.contains(name) {
                return Ok(Multiset::Null);
            }
            with_graph(ctx, GraphName::Named(name.clone()), |ctx| evaluate(inner, ctx))
        }
        PatternTerm::Var(var) => {
            let available = ctx.graph_names()?;
            let bound = bound_values(ctx.input(), var);
            let graphs: Vec<Term> = if bound.is_empty() {
                available
            } else {
                trace!(var = %var, graphs = bound.len(), "GRAPH variable bound by input");
                bound.into_iter().filter(|g| available.contains(g)).collect()
            };
            let mut out = Multiset::Null;
            for name in graphs {
                let result = with_graph(ctx, GraphName::Named(name.clone()), |ctx| evaluate(inner, ctx))?;
                let binding = Multiset::from_rows(vec![var.clone()], vec![Solution::new().with(var.clone(), name)]);
                out = out.union(&result.join(&binding, ctx.parallelism()));
            }
            Ok(out)
        }
    }
}

/// Distinct values of `var` in `input`, first occurrence order
fn bound_values(input: &Multiset, var: &Var) -> Vec<Term> {
    let mut out: Vec<Term> = Vec::new();
    for (_, row) in input.iter() {
        if let Some(term) = row.get(var) {
            if !out.contains(term) {
                out.push(term.clone());
            }
        }
    }
    out
}

// ============================================================================
// Grouping and ordering
// ============================================================================

fn group_by(
    input: &Multiset,
    keys: &[GroupKey],
    aggregates: &[(Var, Aggregate)],
    ctx: &EvaluationContext<'_>,
) -> Result<Multiset> {
    let contents = input.to_solution_set();

    let mut index: FxHashMap<Vec<Option<Term>>, usize> = FxHashMap::default();
    let mut groups: Vec<BindingGroup> = Vec::new();
    let mut members: Vec<Vec<SolutionId>> = Vec::new();
    let mut group_keys: Vec<Vec<Option<Term>>> = Vec::new();

    if keys.is_empty() {
        // implicit single group, present even for empty input
        group_keys.push(Vec::new());
        members.push(input.ids().collect());
    } else {
        for id in input.ids() {
            let key: Vec<Option<Term>> = keys
                .iter()
                .map(|k| match k.expr.evaluate_in(ctx, input, id) {
                    Ok(v) => Some(v.into_term()),
                    Err(e) => {
                        trace!(error = %e, id, "group key error, treated as unbound");
                        None
                    }
                })
                .collect();
            let slot = *index.entry(key.clone()).or_insert_with(|| {
                group_keys.push(key);
                members.push(Vec::new());
                members.len() - 1
            });
            members[slot].push(id);
        }
    }

    let source = Multiset::Solutions(contents.clone());
    let mut out_vars: Vec<Var> = keys.iter().filter_map(GroupKey::output_var).cloned().collect();
    out_vars.extend(aggregates.iter().map(|(v, _)| v.clone()));

    let mut output = Vec::with_capacity(group_keys.len());
    for (key, ids) in group_keys.into_iter().zip(members) {
        ctx.check_timeout()?;
        let mut row = Solution::new();
        for (k, value) in keys.iter().zip(&key) {
            if let (Some(var), Some(term)) = (k.output_var(), value) {
                row.insert(var.clone(), term.clone());
            }
        }
        for (var, agg) in aggregates {
            match aggregate::evaluate(agg, ctx, &source, &ids) {
                Ok(Some(v)) => {
                    row.insert(var.clone(), v.into_term());
                }
                Ok(None) => {}
                Err(e) => trace!(error = %e, var = %var, "aggregate error, variable left unbound"),
            }
        }
        output.push(row);
        groups.push(BindingGroup::new(key, ids));
    }

    trace!(groups = groups.len(), rows = contents.len(), "grouped");
    Ok(Multiset::Grouped(GroupedSet::new(
        Arc::new(contents),
        groups,
        SolutionSet::from_rows(out_vars, output),
    )))
}

/// Stable sort by the ordering comparer
fn order_by(input: &Multiset, conditions: &[OrderCondition], ctx: &EvaluationContext<'_>) -> Multiset {
    if input.len() < 2 || conditions.is_empty() {
        return input.clone();
    }
    let keys: Vec<Vec<Option<ValuedNode>>> = input
        .ids()
        .map(|id| {
            conditions
                .iter()
                .map(|c| c.expr.evaluate_in(ctx, input, id).ok())
                .collect()
        })
        .collect();
    let ordering = ctx.ordering();
    let mut ids: Vec<SolutionId> = input.ids().collect();
    ids.sort_by(|&a, &b| {
        conditions
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let ord = ordering.compare(keys[a][i].as_ref(), keys[b][i].as_ref());
                if c.descending {
                    ord.reverse()
                } else {
                    ord
                }
            })
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    input.select(&ids)
}

/// OFFSET then LIMIT; `offset <= 0` and `limit < 0` are unset
fn slice(input: &Multiset, offset: i64, limit: i64) -> Multiset {
    let skip = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
    let take = if limit < 0 {
        usize::MAX
    } else {
        usize::try_from(limit).unwrap_or(usize::MAX)
    };
    if skip == 0 && take >= input.len() {
        return input.clone();
    }
    let ids: Vec<SolutionId> = input.ids().skip(skip).take(take).collect();
    input.select(&ids)
}

fn values(vars: &[Var], rows: &[Vec<Option<Term>>]) -> Multiset {
    let solutions = rows
        .iter()
        .map(|cells| {
            vars.iter()
                .zip(cells)
                .filter_map(|(v, cell)| cell.clone().map(|t| (v.clone(), t)))
                .collect::<Solution>()
        })
        .collect();
    Multiset::from_rows(vars.to_vec(), solutions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{AggregateFunction, CompareOp, Function};
    use crate::options::{DatasetScope, QueryOptions};
    use rill_core::{MemoryDataset, Triple};

    fn iri(s: &str) -> Term {
        Term::iri(format!("http://example.org/{}", s))
    }

    fn tp(s: &str, p: &str, o: &str) -> TriplePattern {
        let pos = |x: &str| -> PatternTerm {
            match x.strip_prefix('?') {
                Some(v) => PatternTerm::var(v),
                None => iri(x).into(),
            }
        };
        TriplePattern::new(pos(s), pos(p), pos(o))
    }

    fn data() -> MemoryDataset {
        let mut d = MemoryDataset::new();
        d.insert(Triple::new(iri("a"), iri("p"), Term::integer(1)));
        d.insert(Triple::new(iri("a"), iri("p"), Term::integer(2)));
        d.insert(Triple::new(iri("b"), iri("p"), Term::integer(3)));
        d.insert(Triple::new(iri("a"), iri("q"), iri("a")));
        d
    }

    fn run(data: &MemoryDataset, algebra: &Algebra) -> Multiset {
        let options = QueryOptions::default();
        let scope = DatasetScope::default();
        let mut ctx = EvaluationContext::new(data, &options, &scope);
        evaluate(algebra, &mut ctx).unwrap()
    }

    fn var(name: &str) -> Var {
        Var::new(name)
    }

    #[test]
    fn test_empty_bgp_is_identity() {
        assert!(run(&data(), &Algebra::identity()).is_identity());
    }

    #[test]
    fn test_repeated_variable_in_pattern() {
        let r = run(&data(), &Algebra::bgp(vec![tp("?x", "q", "?x")]));
        assert_eq!(r.len(), 1);
        assert_eq!(r.get(0).and_then(|s| s.get(&var("x"))), Some(&iri("a")));
    }

    #[test]
    fn test_filter_drops_errors() {
        let bgp = Algebra::bgp(vec![tp("?s", "p", "?o")]);
        // ?missing is unbound everywhere, so every row errors
        let f = Algebra::filter(
            bgp,
            Expression::compare(CompareOp::Gt, Expression::var("missing"), Expression::constant(Term::integer(0))),
        );
        assert!(run(&data(), &f).is_empty());
    }

    #[test]
    fn test_extend_rejects_bound_variable() {
        let bgp = Algebra::bgp(vec![tp("?s", "p", "?o")]);
        let ext = Algebra::extend(bgp, "o", Expression::constant(Term::integer(1)));
        let options = QueryOptions::default();
        let scope = DatasetScope::default();
        let d = data();
        let mut ctx = EvaluationContext::new(&d, &options, &scope);
        assert!(matches!(evaluate(&ext, &mut ctx), Err(QueryError::InvalidQuery(_))));
    }

    #[test]
    fn test_extend_error_leaves_unbound() {
        let ext = Algebra::extend(
            Algebra::identity(),
            "z",
            Expression::call(Function::StrLen, vec![Expression::var("nope")]),
        );
        let r = run(&data(), &ext);
        assert_eq!(r.len(), 1);
        assert!(r.get(0).is_some_and(|s| s.get(&var("z")).is_none()));
    }

    #[test]
    fn test_minus_disjoint_is_noop() {
        let lhs = Algebra::bgp(vec![tp("?s", "p", "?o")]);
        let rhs = Algebra::bgp(vec![tp("?x", "q", "?y")]);
        let r = run(&data(), &Algebra::minus(lhs, rhs));
        assert_eq!(r.len(), 3);
    }

    #[test]
    fn test_implicit_group_over_empty_input() {
        let bgp = Algebra::bgp(vec![tp("?s", "nothing", "?o")]);
        let g = Algebra::group_by(bgp, Vec::new(), vec![(var("c"), Aggregate::count_star())]);
        let r = run(&data(), &g);
        assert_eq!(r.len(), 1);
        assert_eq!(r.get(0).and_then(|s| s.get(&var("c"))), Some(&Term::integer(0)));
    }

    #[test]
    fn test_group_by_with_having() {
        let bgp = Algebra::bgp(vec![tp("?s", "p", "?o")]);
        let g = Algebra::group_by(
            bgp,
            vec![GroupKey::var("s")],
            vec![(var("n"), Aggregate::count_star())],
        );
        let h = Algebra::having(
            g,
            Expression::compare(
                CompareOp::Gt,
                Expression::aggregate(Aggregate::new(AggregateFunction::Sum, Expression::var("o"))),
                Expression::constant(Term::integer(2)),
            ),
        );
        let r = run(&data(), &h);
        // a: 1 + 2 = 3, b: 3
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn test_order_by_desc_and_slice() {
        let bgp = Algebra::bgp(vec![tp("?s", "p", "?o")]);
        let ordered = Algebra::order_by(bgp, vec![OrderCondition::desc(Expression::var("o"))]);
        let sliced = Algebra::slice(ordered, 1, 1);
        let r = run(&data(), &sliced);
        assert_eq!(r.len(), 1);
        assert_eq!(r.get(0).and_then(|s| s.get(&var("o"))), Some(&Term::integer(2)));
    }

    #[test]
    fn test_slice_sentinels() {
        let bgp = Algebra::bgp(vec![tp("?s", "p", "?o")]);
        assert_eq!(run(&data(), &Algebra::slice(bgp.clone(), 0, -1)).len(), 3);
        assert_eq!(run(&data(), &Algebra::slice(bgp.clone(), -5, 2)).len(), 2);
        assert_eq!(run(&data(), &Algebra::slice(bgp, 2, 0)).len(), 0);
    }

    #[test]
    fn test_select_null_keeps_vars() {
        let bgp = Algebra::bgp(vec![tp("?s", "nothing", "?o")]);
        let r = run(&data(), &Algebra::select(bgp, Some(vec![var("s"), var("extra")])));
        assert!(r.is_empty());
        assert_eq!(r.vars(), &[var("s"), var("extra")]);
    }

    #[test]
    fn test_values_with_undef() {
        let v = Algebra::Values {
            vars: vec![var("x"), var("y")],
            rows: vec![vec![Some(Term::integer(1)), None], vec![None, Some(Term::integer(2))]],
        };
        let r = run(&data(), &v);
        assert_eq!(r.len(), 2);
        assert!(r.get(0).is_some_and(|s| s.get(&var("y")).is_none()));
    }

    #[test]
    fn test_ask_variants() {
        let found = Algebra::ask(Algebra::bgp(vec![tp("?s", "p", "?o")]));
        assert!(run(&data(), &found).is_identity());
        let missing = Algebra::ask(Algebra::bgp(vec![tp("?s", "nothing", "?o")]));
        assert!(run(&data(), &missing).is_null());
        assert!(run(&data(), &Algebra::AskAnyTriples).is_identity());
        assert!(run(&MemoryDataset::new(), &Algebra::AskAnyTriples).is_null());
    }

    #[test]
    fn test_subquery_flattens_groups() {
        let bgp = Algebra::bgp(vec![tp("?s", "p", "?o")]);
        let g = Algebra::group_by(bgp, vec![GroupKey::var("s")], Vec::new());
        let r = run(&data(), &Algebra::SubQuery(Box::new(g)));
        assert!(matches!(r, Multiset::Solutions(_)));
        assert_eq!(r.len(), 2);
    }
}
