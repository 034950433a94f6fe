//! Algebra rewrite passes applied before evaluation
//!
//! A pass that fails leaves the tree it was given untouched; the failure is
//! logged and the next pass runs on the previous tree.

use crate::algebra::Algebra;
use crate::error::Result;
use tracing::{trace, warn};

/// One algebra-to-algebra rewrite
pub trait AlgebraOptimiser: Send + Sync {
    fn name(&self) -> &str;

    fn optimise(&self, algebra: &Algebra) -> Result<Algebra>;
}

/// Apply `passes` in order
pub fn optimise(algebra: Algebra, passes: &[Box<dyn AlgebraOptimiser>]) -> Algebra {
    passes.iter().fold(algebra, |current, pass| match pass.optimise(&current) {
        Ok(rewritten) => {
            trace!(pass = pass.name(), "optimiser pass applied");
            rewritten
        }
        Err(e) => {
            warn!(pass = pass.name(), error = %e, "optimiser pass failed, algebra left unmodified");
            current
        }
    })
}

/// Removes joins against the empty BGP, the neutral element of join
#[derive(Debug, Default, Clone, Copy)]
pub struct JoinIdentityElimination;

impl AlgebraOptimiser for JoinIdentityElimination {
    fn name(&self) -> &str {
        "join-identity-elimination"
    }

    fn optimise(&self, algebra: &Algebra) -> Result<Algebra> {
        Ok(eliminate(algebra))
    }
}

fn eliminate(algebra: &Algebra) -> Algebra {
    let b = |a: &Algebra| Box::new(eliminate(a));
    match algebra {
        Algebra::Join(left, right) => {
            let (left, right) = (eliminate(left), eliminate(right));
            if left.is_identity() {
                right
            } else if right.is_identity() {
                left
            } else {
                Algebra::join(left, right)
            }
        }
        Algebra::LeftJoin {
            left,
            right,
            filter,
        } => Algebra::LeftJoin {
            left: b(left),
            right: b(right),
            filter: filter.clone(),
        },
        Algebra::Minus(l, r) => Algebra::Minus(b(l), b(r)),
        Algebra::Union(l, r) => Algebra::Union(b(l), b(r)),
        Algebra::AskUnion(l, r) => Algebra::AskUnion(b(l), b(r)),
        Algebra::Filter { inner, expr } => Algebra::Filter {
            inner: b(inner),
            expr: expr.clone(),
        },
        Algebra::Extend { inner, var, expr } => Algebra::Extend {
            inner: b(inner),
            var: var.clone(),
            expr: expr.clone(),
        },
        Algebra::Graph { graph, inner } => Algebra::Graph {
            graph: graph.clone(),
            inner: b(inner),
        },
        Algebra::GroupBy {
            inner,
            keys,
            aggregates,
        } => Algebra::GroupBy {
            inner: b(inner),
            keys: keys.clone(),
            aggregates: aggregates.clone(),
        },
        Algebra::Having { inner, expr } => Algebra::Having {
            inner: b(inner),
            expr: expr.clone(),
        },
        Algebra::OrderBy { inner, conditions } => Algebra::OrderBy {
            inner: b(inner),
            conditions: conditions.clone(),
        },
        Algebra::Distinct(inner) => Algebra::Distinct(b(inner)),
        Algebra::Reduced(inner) => Algebra::Reduced(b(inner)),
        Algebra::Slice {
            inner,
            offset,
            limit,
        } => Algebra::Slice {
            inner: b(inner),
            offset: *offset,
            limit: *limit,
        },
        Algebra::Select { inner, vars } => Algebra::Select {
            inner: b(inner),
            vars: vars.clone(),
        },
        Algebra::Service {
            endpoint,
            inner,
            silent,
        } => Algebra::Service {
            endpoint: endpoint.clone(),
            inner: b(inner),
            silent: *silent,
        },
        Algebra::Ask(inner) => Algebra::Ask(b(inner)),
        Algebra::SubQuery(inner) => Algebra::SubQuery(b(inner)),
        Algebra::Bgp(_)
        | Algebra::Values { .. }
        | Algebra::Path { .. }
        | Algebra::AskAnyTriples
        | Algebra::SelectDistinctGraphs { .. }
        | Algebra::Unknown(_) => algebra.clone(),
    }
}
