//! Query execution entry point
//!
//! Ties the pieces together for one query: optimiser passes, a fresh
//! [`EvaluationContext`], root evaluation and conversion of the final
//! multiset into a [`QueryResult`] according to the query form.
//!
//! Use [`execute_query`] for the defaults or build a [`QueryExecutor`] to
//! add a SERVICE client, FROM / FROM NAMED scope or optimiser passes.

use crate::algebra::Algebra;
use crate::context::EvaluationContext;
use crate::error::Result;
use crate::optimise::{optimise, AlgebraOptimiser, JoinIdentityElimination};
use crate::options::{DatasetScope, QueryOptions};
use crate::processor;
use crate::results::QueryResult;
use crate::service::{ServiceClient, ServicePool};
use rill_core::Dataset;
use std::sync::Arc;
use std::time::Instant;

/// Query form, deciding how the final multiset is reported
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum QueryForm {
    #[default]
    Select,
    Ask,
    /// Template instantiation happens downstream; the solutions are returned
    Construct,
    Describe,
}

/// A query ready for evaluation
#[derive(Clone, Debug)]
pub struct PreparedQuery {
    pub algebra: Algebra,
    pub form: QueryForm,
    pub scope: DatasetScope,
}

impl PreparedQuery {
    pub fn select(algebra: Algebra) -> Self {
        Self {
            algebra,
            form: QueryForm::Select,
            scope: DatasetScope::default(),
        }
    }

    pub fn ask(algebra: Algebra) -> Self {
        Self {
            algebra,
            form: QueryForm::Ask,
            scope: DatasetScope::default(),
        }
    }

    pub fn with_scope(mut self, scope: DatasetScope) -> Self {
        self.scope = scope;
        self
    }
}

/// Reusable execution configuration
pub struct QueryExecutor {
    options: QueryOptions,
    service: Option<Arc<dyn ServiceClient>>,
    service_pool: Arc<ServicePool>,
    passes: Vec<Box<dyn AlgebraOptimiser>>,
}

impl QueryExecutor {
    /// Executor with the built-in optimiser passes
    pub fn new(options: QueryOptions) -> Self {
        let service_pool = Arc::new(ServicePool::new(options.federation.max_concurrency));
        Self {
            options,
            service: None,
            service_pool,
            passes: vec![Box::new(JoinIdentityElimination)],
        }
    }

    pub fn with_service_client(mut self, client: Arc<dyn ServiceClient>) -> Self {
        self.service = Some(client);
        self
    }

    /// Pool running this executor's SERVICE requests
    pub fn service_pool(&self) -> &Arc<ServicePool> {
        &self.service_pool
    }

    pub fn with_pass(mut self, pass: Box<dyn AlgebraOptimiser>) -> Self {
        self.passes.push(pass);
        self
    }

    /// Drop all optimiser passes, including the built-in ones
    pub fn without_passes(mut self) -> Self {
        self.passes.clear();
        self
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn execute(&self, data: &dyn Dataset, query: &PreparedQuery) -> Result<QueryResult> {
        let span = tracing::debug_span!(
            "query_execute",
            form = ?query.form,
            timeout_ms = self.options.effective_timeout_ms(),
            rows = tracing::field::Empty,
            ms = tracing::field::Empty
        );
        let _guard = span.enter();
        let start = Instant::now();

        let algebra = optimise(query.algebra.clone(), &self.passes);
        let mut ctx = EvaluationContext::new(data, &self.options, &query.scope)
            .with_service_pool(Arc::clone(&self.service_pool));
        if let Some(client) = &self.service {
            ctx = ctx.with_service_client(Arc::clone(client));
        }

        let output = processor::evaluate_root(&algebra, &mut ctx)?;
        span.record("rows", output.len() as u64);
        span.record("ms", (start.elapsed().as_secs_f64() * 1000.0) as u64);
        tracing::debug!(rows = output.len(), "query evaluated");

        Ok(match query.form {
            QueryForm::Ask => QueryResult::boolean(&output),
            QueryForm::Select | QueryForm::Construct | QueryForm::Describe => {
                QueryResult::solutions(&output)
            }
        })
    }
}

/// Execute `query` with `options` and the built-in optimiser passes
pub fn execute_query(data: &dyn Dataset, query: &PreparedQuery, options: &QueryOptions) -> Result<QueryResult> {
    QueryExecutor::new(options.clone()).execute(data, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{PatternTerm, TriplePattern};
    use rill_core::{MemoryDataset, Term, Triple};

    fn data() -> MemoryDataset {
        let mut d = MemoryDataset::new();
        d.insert(Triple::new(
            Term::iri("http://example.org/a"),
            Term::iri("http://example.org/p"),
            Term::integer(1),
        ));
        d
    }

    fn bgp(p: &str) -> Algebra {
        Algebra::bgp(vec![TriplePattern::new(
            PatternTerm::var("s"),
            Term::iri(format!("http://example.org/{}", p)),
            PatternTerm::var("o"),
        )])
    }

    #[test]
    fn test_select_returns_solutions() {
        let q = PreparedQuery::select(Algebra::join(Algebra::identity(), bgp("p")));
        let r = execute_query(&data(), &q, &QueryOptions::default()).unwrap();
        assert_eq!(r.as_solutions().map(|s| s.len()), Some(1));
    }

    #[test]
    fn test_ask_returns_boolean() {
        let yes = PreparedQuery::ask(bgp("p"));
        let no = PreparedQuery::ask(bgp("q"));
        let opts = QueryOptions::default();
        assert_eq!(execute_query(&data(), &yes, &opts).unwrap().as_boolean(), Some(true));
        assert_eq!(execute_query(&data(), &no, &opts).unwrap().as_boolean(), Some(false));
    }
}
