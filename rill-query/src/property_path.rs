//! Property path evaluation
//!
//! A path is evaluated to the (start, end) node pairs it connects in the
//! active graph, restricted by whichever ends are fixed terms. The pairs
//! are then bound to the subject and object variables.
//!
//! # Key semantics
//!
//! - Predicate, inverse, sequence and alternative paths keep duplicates,
//!   as their join / union translations do.
//! - `?`, `*` and `+` paths give each (start, end) pair once.
//! - `*` and `+` are evaluated breadth-first with a visited set, so cycles
//!   terminate.
//! - A zero-length path from a fixed term matches that term even when it
//!   does not occur in the graph; with both ends unbound it matches every
//!   subject and object of the active graph.
//! - Negated property sets `!(p|^q)` match single edges whose predicate is
//!   outside the set, in the direction each member names.

use crate::algebra::{PatternTerm, PropertyPath};
use crate::context::EvaluationContext;
use crate::error::Result;
use crate::multiset::{Multiset, Solution};
use crate::var::Var;
use rill_core::Term;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

type Pair = (Term, Term);

/// Evaluate `subject path object` against the active graph
pub(crate) fn evaluate(
    subject: &PatternTerm,
    path: &PropertyPath,
    object: &PatternTerm,
    ctx: &EvaluationContext<'_>,
) -> Result<Multiset> {
    let pairs = pairs(path, subject.as_term(), object.as_term(), ctx)?;
    Ok(bind(subject, object, pairs))
}

fn bind(subject: &PatternTerm, object: &PatternTerm, pairs: Vec<Pair>) -> Multiset {
    match (subject.as_var(), object.as_var()) {
        (None, None) => {
            if pairs.is_empty() {
                Multiset::Null
            } else {
                Multiset::Identity
            }
        }
        (Some(s), Some(o)) if s == o => {
            let rows = pairs
                .into_iter()
                .filter(|(a, b)| a == b)
                .map(|(a, _)| Solution::new().with(s.clone(), a))
                .collect();
            Multiset::from_rows(vec![s.clone()], rows)
        }
        (s, o) => {
            let vars: Vec<Var> = s.into_iter().chain(o).cloned().collect();
            let rows = pairs
                .into_iter()
                .map(|(a, b)| {
                    let mut row = Solution::new();
                    if let Some(s) = s {
                        row.insert(s.clone(), a);
                    }
                    if let Some(o) = o {
                        row.insert(o.clone(), b);
                    }
                    row
                })
                .collect();
            Multiset::from_rows(vars, rows)
        }
    }
}

/// All (start, end) pairs of `path` with the given ends fixed
fn pairs(
    path: &PropertyPath,
    from: Option<&Term>,
    to: Option<&Term>,
    ctx: &EvaluationContext<'_>,
) -> Result<Vec<Pair>> {
    ctx.check_timeout()?;
    match path {
        PropertyPath::Predicate(p) => Ok(ctx
            .find(from, Some(p), to)?
            .into_iter()
            .map(|t| (t.subject, t.object))
            .collect()),

        PropertyPath::Inverse(inner) => Ok(pairs(inner, to, from, ctx)?
            .into_iter()
            .map(|(a, b)| (b, a))
            .collect()),

        PropertyPath::Sequence(first, second) => sequence(first, second, from, to, ctx),

        PropertyPath::Alternative(left, right) => {
            let mut out = pairs(left, from, to, ctx)?;
            out.extend(pairs(right, from, to, ctx)?);
            Ok(out)
        }

        PropertyPath::ZeroOrOne(inner) => {
            let mut out = zero_length(from, to, ctx)?;
            out.extend(pairs(inner, from, to, ctx)?);
            Ok(dedup(out))
        }

        PropertyPath::ZeroOrMore(inner) => closure(inner, from, to, true, ctx),
        PropertyPath::OneOrMore(inner) => closure(inner, from, to, false, ctx),

        PropertyPath::NegatedSet { forward, inverse } => {
            let mut out = Vec::new();
            if !forward.is_empty() || inverse.is_empty() {
                out.extend(
                    ctx.find(from, None, to)?
                        .into_iter()
                        .filter(|t| !forward.contains(&t.predicate))
                        .map(|t| (t.subject, t.object)),
                );
            }
            if !inverse.is_empty() {
                out.extend(
                    ctx.find(to, None, from)?
                        .into_iter()
                        .filter(|t| !inverse.contains(&t.predicate))
                        .map(|t| (t.object, t.subject)),
                );
            }
            Ok(out)
        }
    }
}

/// `first / second`, driven from whichever end is fixed
fn sequence(
    first: &PropertyPath,
    second: &PropertyPath,
    from: Option<&Term>,
    to: Option<&Term>,
    ctx: &EvaluationContext<'_>,
) -> Result<Vec<Pair>> {
    let mut out = Vec::new();
    if from.is_none() && to.is_some() {
        for (mid, end) in pairs(second, None, to, ctx)? {
            for (start, _) in pairs(first, None, Some(&mid), ctx)? {
                out.push((start, end.clone()));
            }
        }
    } else {
        for (start, mid) in pairs(first, from, None, ctx)? {
            for (_, end) in pairs(second, Some(&mid), to, ctx)? {
                out.push((start.clone(), end));
            }
        }
    }
    Ok(out)
}

fn zero_length(from: Option<&Term>, to: Option<&Term>, ctx: &EvaluationContext<'_>) -> Result<Vec<Pair>> {
    match (from, to) {
        (Some(a), Some(b)) => Ok(if a == b { vec![(a.clone(), a.clone())] } else { Vec::new() }),
        (Some(n), None) | (None, Some(n)) => Ok(vec![(n.clone(), n.clone())]),
        (None, None) => Ok(graph_nodes(ctx)?.into_iter().map(|n| (n.clone(), n)).collect()),
    }
}

/// Subjects and objects of the active graph, first occurrence order
fn graph_nodes(ctx: &EvaluationContext<'_>) -> Result<Vec<Term>> {
    let mut seen = FxHashSet::default();
    let mut nodes = Vec::new();
    for t in ctx.find(None, None, None)? {
        for n in [t.subject, t.object] {
            if seen.insert(n.clone()) {
                nodes.push(n);
            }
        }
    }
    Ok(nodes)
}

/// `path*` (`include_start`) or `path+`
fn closure(
    path: &PropertyPath,
    from: Option<&Term>,
    to: Option<&Term>,
    include_start: bool,
    ctx: &EvaluationContext<'_>,
) -> Result<Vec<Pair>> {
    match (from, to) {
        (Some(start), _) => Ok(reach(path, start, true, include_start, ctx)?
            .into_iter()
            .filter(|end| to.map_or(true, |t| t == end))
            .map(|end| (start.clone(), end))
            .collect()),
        (None, Some(end)) => Ok(reach(path, end, false, include_start, ctx)?
            .into_iter()
            .map(|start| (start, end.clone()))
            .collect()),
        (None, None) => {
            let starts = if include_start {
                graph_nodes(ctx)?
            } else {
                let mut seen = FxHashSet::default();
                pairs(path, None, None, ctx)?
                    .into_iter()
                    .map(|(s, _)| s)
                    .filter(|s| seen.insert(s.clone()))
                    .collect()
            };
            let mut out = Vec::new();
            for start in starts {
                for end in reach(path, &start, true, include_start, ctx)? {
                    out.push((start.clone(), end));
                }
            }
            Ok(out)
        }
    }
}

/// Nodes reachable from `node` by one or more steps (forward) or reaching
/// it (backward), in breadth-first order
fn reach(
    path: &PropertyPath,
    node: &Term,
    forward: bool,
    include_start: bool,
    ctx: &EvaluationContext<'_>,
) -> Result<Vec<Term>> {
    let mut visited: FxHashSet<Term> = FxHashSet::default();
    let mut out = Vec::new();
    if include_start {
        visited.insert(node.clone());
        out.push(node.clone());
    }
    let mut queue = VecDeque::from([node.clone()]);
    let mut expanded: FxHashSet<Term> = FxHashSet::default();
    while let Some(current) = queue.pop_front() {
        if !expanded.insert(current.clone()) {
            continue;
        }
        let next: Vec<Term> = if forward {
            pairs(path, Some(&current), None, ctx)?
                .into_iter()
                .map(|(_, b)| b)
                .collect()
        } else {
            pairs(path, None, Some(&current), ctx)?
                .into_iter()
                .map(|(a, _)| a)
                .collect()
        };
        for n in next {
            if visited.insert(n.clone()) {
                out.push(n.clone());
            }
            if !expanded.contains(&n) {
                queue.push_back(n);
            }
        }
    }
    Ok(out)
}

fn dedup(pairs: Vec<Pair>) -> Vec<Pair> {
    let mut seen = FxHashSet::default();
    pairs.into_iter().filter(|p| seen.insert(p.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{DatasetScope, QueryOptions};
    use rill_core::{MemoryDataset, Triple};

    fn iri(s: &str) -> Term {
        Term::iri(format!("http://example.org/{}", s))
    }

    fn chain() -> MemoryDataset {
        // a -> b -> c -> a (cycle), c -> d
        let mut data = MemoryDataset::new();
        for (s, o) in [("a", "b"), ("b", "c"), ("c", "a"), ("c", "d")] {
            data.insert(Triple::new(iri(s), iri("next"), iri(o)));
        }
        data
    }

    fn run(data: &MemoryDataset, s: PatternTerm, path: PropertyPath, o: PatternTerm) -> Multiset {
        let options = QueryOptions::default();
        let scope = DatasetScope::default();
        let ctx = EvaluationContext::new(data, &options, &scope);
        evaluate(&s, &path, &o, &ctx).unwrap()
    }

    fn next() -> PropertyPath {
        PropertyPath::Predicate(iri("next"))
    }

    #[test]
    fn test_one_or_more_terminates_on_cycle() {
        let data = chain();
        let r = run(
            &data,
            iri("a").into(),
            PropertyPath::OneOrMore(Box::new(next())),
            Var::new("x").into(),
        );
        // b, c, a (via the cycle), d
        assert_eq!(r.len(), 4);
    }

    #[test]
    fn test_zero_or_more_includes_start() {
        let data = chain();
        let r = run(
            &data,
            iri("d").into(),
            PropertyPath::ZeroOrMore(Box::new(next())),
            Var::new("x").into(),
        );
        assert_eq!(r.len(), 1);
        assert_eq!(r.get(0).and_then(|s| s.get(&Var::new("x"))), Some(&iri("d")));
    }

    #[test]
    fn test_zero_length_between_fixed_terms() {
        let data = MemoryDataset::new();
        let star = || PropertyPath::ZeroOrMore(Box::new(next()));
        assert!(run(&data, iri("z").into(), star(), iri("z").into()).is_identity());
        assert!(run(&data, iri("z").into(), star(), iri("y").into()).is_null());
    }

    #[test]
    fn test_sequence_and_inverse() {
        let data = chain();
        let seq = PropertyPath::Sequence(Box::new(next()), Box::new(next()));
        let r = run(&data, iri("a").into(), seq, Var::new("x").into());
        assert_eq!(r.get(0).and_then(|s| s.get(&Var::new("x"))), Some(&iri("c")));

        let inv = PropertyPath::Inverse(Box::new(next()));
        let r = run(&data, iri("a").into(), inv, Var::new("x").into());
        assert_eq!(r.get(0).and_then(|s| s.get(&Var::new("x"))), Some(&iri("c")));
    }

    #[test]
    fn test_backward_closure() {
        let data = chain();
        let r = run(
            &data,
            Var::new("x").into(),
            PropertyPath::OneOrMore(Box::new(next())),
            iri("d").into(),
        );
        // c directly; b, a through c
        assert_eq!(r.len(), 3);
    }

    #[test]
    fn test_negated_set() {
        let mut data = chain();
        data.insert(Triple::new(iri("a"), iri("other"), iri("z")));
        let neg = PropertyPath::NegatedSet {
            forward: vec![iri("next")],
            inverse: Vec::new(),
        };
        let r = run(&data, iri("a").into(), neg, Var::new("x").into());
        assert_eq!(r.len(), 1);
        assert_eq!(r.get(0).and_then(|s| s.get(&Var::new("x"))), Some(&iri("z")));
    }
}
