//! SERVICE evaluation against remote endpoints
//!
//! The engine does not speak any wire protocol itself. A [`ServiceClient`]
//! supplied by the embedding application executes one [`ServiceRequest`]
//! (endpoint, pattern, optional VALUES block, limit, timeout) and returns a
//! multiset.
//!
//! # Semantics
//!
//! - `SERVICE <iri> { ... }` sends requests to that endpoint.
//! - `SERVICE ?ep { ... }` sends requests to every distinct IRI bound to
//!   `?ep` in the current input, and binds `?ep` on the results.
//! - Input solutions projected onto the variables shared with the pattern
//!   are shipped as VALUES blocks of `service_chunk_size` rows.
//! - A sliced pattern caps the remote result at limit + offset.
//! - Requests run on a bounded [`ServicePool`] (`federation.max_concurrency`
//!   threads) that is built once and shared across evaluations. Results are
//!   merged in request order without de-duplication.
//! - The first failure aborts the operator unless the endpoint failure is
//!   ignored by configuration; no further requests are started after it. Under `SILENT` a failure returns the results
//!   obtained so far, or a single empty solution if there are none.

use crate::algebra::{Algebra, PatternTerm};
use crate::context::EvaluationContext;
use crate::error::{QueryError, Result};
use crate::multiset::{Multiset, SolutionSet};
use crate::var::Var;
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use rill_core::Term;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use thiserror::Error;
use tracing::debug;

/// Failure reported by a [`ServiceClient`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Endpoint {endpoint} failed: {message}")]
    Failed { endpoint: String, message: String },

    #[error("Endpoint {endpoint} did not answer within {timeout_ms}ms")]
    Timeout { endpoint: String, timeout_ms: u64 },
}

impl ServiceError {
    pub fn failed(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Failed {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }
}

/// One remote evaluation
#[derive(Clone, Debug)]
pub struct ServiceRequest {
    pub endpoint: String,
    pub pattern: Algebra,
    /// Input bindings restricting the pattern, if any
    pub bindings: Option<SolutionSet>,
    /// Maximum number of solutions wanted
    pub limit: Option<usize>,
    pub timeout_ms: Option<u64>,
}

/// Executes SERVICE requests; implemented by the embedding application
pub trait ServiceClient: Send + Sync {
    fn execute(&self, request: &ServiceRequest) -> std::result::Result<Multiset, ServiceError>;
}

impl<F> ServiceClient for F
where
    F: Fn(&ServiceRequest) -> std::result::Result<Multiset, ServiceError> + Send + Sync,
{
    fn execute(&self, request: &ServiceRequest) -> std::result::Result<Multiset, ServiceError> {
        self(request)
    }
}

/// Evaluate a SERVICE operator against the context's current input
pub(crate) fn evaluate(
    endpoint: &PatternTerm,
    pattern: &Algebra,
    silent: bool,
    ctx: &EvaluationContext<'_>,
) -> Result<Multiset> {
    let Some(client) = ctx.service_client().cloned() else {
        return fail_or_silent(
            silent,
            Multiset::Null,
            QueryError::Service("no service client configured".to_string()),
        );
    };

    let endpoints = match resolve_endpoints(endpoint, ctx.input()) {
        Ok(endpoints) => endpoints,
        Err(e) => return fail_or_silent(silent, Multiset::Null, e),
    };

    let requests = build_requests(&endpoints, pattern, ctx);
    debug!(
        endpoints = endpoints.len(),
        requests = requests.len(),
        "dispatching service requests"
    );

    let ignore_failures = ctx.options().federation.ignore_failed_endpoints;
    let responses = dispatch(&*client, &requests, ctx.service_pool(), !ignore_failures)?;
    let first_failure = responses
        .iter()
        .flatten()
        .find_map(|r| r.as_ref().err())
        .cloned();

    let mut merged = Multiset::Null;
    for (request, response) in requests.iter().zip(responses) {
        match response {
            Some(Ok(result)) => {
                let result = match endpoint.as_var() {
                    Some(var) => bind_endpoint(result, var, &request.endpoint),
                    None => result,
                };
                merged = merged.union(&result);
            }
            Some(Err(e)) if ignore_failures => {
                debug!(error = %e, "ignoring failed endpoint");
            }
            _ => break,
        }
    }
    if let Some(e) = first_failure.filter(|_| !ignore_failures) {
        return fail_or_silent(silent, merged, QueryError::Service(e.to_string()));
    }
    ctx.check_timeout()?;
    Ok(merged)
}

fn fail_or_silent(silent: bool, obtained: Multiset, error: QueryError) -> Result<Multiset> {
    if !silent {
        return Err(error);
    }
    debug!(error = %error, "SERVICE SILENT suppressed failure");
    if obtained.is_null() {
        Ok(Multiset::Identity)
    } else {
        Ok(obtained)
    }
}

fn resolve_endpoints(endpoint: &PatternTerm, input: &Multiset) -> Result<Vec<String>> {
    match endpoint {
        PatternTerm::Term(Term::Iri(iri)) => Ok(vec![iri.to_string()]),
        PatternTerm::Term(other) => Err(QueryError::InvalidQuery(format!(
            "SERVICE endpoint {} is not an IRI",
            other
        ))),
        PatternTerm::Var(var) => {
            let mut endpoints: Vec<String> = Vec::new();
            for (_, row) in input.iter() {
                if let Some(Term::Iri(iri)) = row.get(var) {
                    if !endpoints.iter().any(|e| e.as_str() == &**iri) {
                        endpoints.push(iri.to_string());
                    }
                }
            }
            if endpoints.is_empty() {
                return Err(QueryError::Service(format!(
                    "SERVICE endpoint variable {} is unbound",
                    var
                )));
            }
            Ok(endpoints)
        }
    }
}

fn build_requests(endpoints: &[String], pattern: &Algebra, ctx: &EvaluationContext<'_>) -> Vec<ServiceRequest> {
    let chunks = binding_chunks(ctx.input(), pattern, ctx.options().service_chunk_size);
    let limit = remote_limit(pattern);
    let timeout_ms = endpoint_timeout(ctx);

    endpoints
        .iter()
        .flat_map(|endpoint| {
            chunks.iter().map(move |bindings| ServiceRequest {
                endpoint: endpoint.clone(),
                pattern: pattern.clone(),
                bindings: bindings.clone(),
                limit,
                timeout_ms,
            })
        })
        .collect()
}

/// Distinct input bindings on the variables shared with the pattern, split
/// into chunks; a single unrestricted request when nothing is shared
fn binding_chunks(input: &Multiset, pattern: &Algebra, chunk_size: usize) -> Vec<Option<SolutionSet>> {
    if input.is_identity() || input.is_empty() {
        return vec![None];
    }
    let pattern_vars = pattern.variables();
    let shared: Vec<Var> = input
        .vars()
        .iter()
        .filter(|v| pattern_vars.contains(v))
        .cloned()
        .collect();
    if shared.is_empty() {
        return vec![None];
    }
    let values = input.to_solution_set().project(&shared).distinct();
    let ids: Vec<usize> = (0..values.len()).collect();
    ids.chunks(chunk_size.max(1))
        .map(|chunk| Some(values.select(chunk)))
        .collect()
}

fn remote_limit(pattern: &Algebra) -> Option<usize> {
    match pattern {
        Algebra::Slice { offset, limit, .. } if *limit >= 0 => {
            Some((*limit as usize).saturating_add((*offset).max(0) as usize))
        }
        Algebra::Select { inner, .. } => remote_limit(inner),
        _ => None,
    }
}

fn endpoint_timeout(ctx: &EvaluationContext<'_>) -> Option<u64> {
    let configured = ctx.options().federation.endpoint_timeout_ms;
    match (configured, ctx.remaining_timeout_ms()) {
        (0, remaining) => remaining,
        (t, Some(remaining)) => Some(t.min(remaining)),
        (t, None) => Some(t),
    }
}

/// Worker pool for SERVICE requests
///
/// Built on first use and reused by every SERVICE operator evaluated through
/// the same executor.
pub struct ServicePool {
    threads: usize,
    pool: OnceCell<rayon::ThreadPool>,
}

impl ServicePool {
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
            pool: OnceCell::new(),
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Whether the worker threads have been spawned yet
    pub fn is_started(&self) -> bool {
        self.pool.get().is_some()
    }

    fn get(&self) -> Result<&rayon::ThreadPool> {
        self.pool.get_or_try_init(|| {
            debug!(threads = self.threads, "starting service pool");
            rayon::ThreadPoolBuilder::new()
                .num_threads(self.threads)
                .thread_name(|i| format!("rill-service-{}", i))
                .build()
                .map_err(|e| QueryError::Internal(format!("service pool: {}", e)))
        })
    }
}

impl std::fmt::Debug for ServicePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServicePool")
            .field("threads", &self.threads)
            .field("started", &self.is_started())
            .finish()
    }
}

/// Run every request on the pool, returning responses in request order
///
/// With `stop_on_failure` no request is started once one has failed; the
/// requests skipped that way come back as `None`.
fn dispatch(
    client: &dyn ServiceClient,
    requests: &[ServiceRequest],
    pool: &ServicePool,
    stop_on_failure: bool,
) -> Result<Vec<Option<std::result::Result<Multiset, ServiceError>>>> {
    let failed = AtomicBool::new(false);
    let run = |request: &ServiceRequest| {
        if stop_on_failure && failed.load(AtomicOrdering::Acquire) {
            return None;
        }
        let response = client.execute(request);
        if response.is_err() {
            failed.store(true, AtomicOrdering::Release);
        }
        Some(response)
    };
    if requests.len() <= 1 || pool.threads() <= 1 {
        return Ok(requests.iter().map(run).collect());
    }
    Ok(pool.get()?.install(|| requests.par_iter().map(run).collect()))
}

fn bind_endpoint(result: Multiset, var: &Var, endpoint: &str) -> Multiset {
    let value = Term::iri(endpoint);
    let values = vec![Some(value); result.len()];
    result.extend(var.clone(), values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::TriplePattern;
    use crate::multiset::Solution;
    use crate::options::{DatasetScope, FederationOptions, QueryOptions};
    use rill_core::MemoryDataset;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    type Response = std::result::Result<Multiset, ServiceError>;

    fn pattern() -> Algebra {
        Algebra::bgp(vec![TriplePattern::new(
            Var::new("s"),
            Term::iri("http://example.org/p"),
            Var::new("o"),
        )])
    }

    fn one_row(endpoint: &str) -> Multiset {
        Multiset::from_rows(
            vec![Var::new("s")],
            vec![Solution::new().with("s", Term::iri(endpoint))],
        )
    }

    #[test]
    fn test_fixed_endpoint() {
        let data = MemoryDataset::new();
        let options = QueryOptions::default();
        let scope = DatasetScope::default();
        let client: Arc<dyn ServiceClient> = Arc::new(|req: &ServiceRequest| -> Response {
            Ok(one_row(&req.endpoint))
        });
        let ctx = EvaluationContext::new(&data, &options, &scope).with_service_client(client);

        let endpoint = PatternTerm::from(Term::iri("http://remote/sparql"));
        let result = evaluate(&endpoint, &pattern(), false, &ctx).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_silent_failure_gives_identity() {
        let data = MemoryDataset::new();
        let options = QueryOptions::default();
        let scope = DatasetScope::default();
        let client: Arc<dyn ServiceClient> = Arc::new(|req: &ServiceRequest| -> Response {
            Err(ServiceError::failed(req.endpoint.clone(), "down"))
        });
        let ctx = EvaluationContext::new(&data, &options, &scope).with_service_client(client);
        let endpoint = PatternTerm::from(Term::iri("http://remote/sparql"));

        assert!(evaluate(&endpoint, &pattern(), false, &ctx).is_err());
        let silent = evaluate(&endpoint, &pattern(), true, &ctx).unwrap();
        assert!(silent.is_identity());
    }

    #[test]
    fn test_variable_endpoint_fans_out_and_binds() {
        let data = MemoryDataset::new();
        let options = QueryOptions::default().with_federation(FederationOptions {
            max_concurrency: 2,
            ..FederationOptions::default()
        });
        let scope = DatasetScope::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let client: Arc<dyn ServiceClient> = Arc::new(move |req: &ServiceRequest| -> Response {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(one_row(&req.endpoint))
        });
        let mut ctx = EvaluationContext::new(&data, &options, &scope).with_service_client(client);
        ctx.set_input(Multiset::from_rows(
            vec![Var::new("ep")],
            vec![
                Solution::new().with("ep", Term::iri("http://a/sparql")),
                Solution::new().with("ep", Term::iri("http://b/sparql")),
                Solution::new().with("ep", Term::iri("http://a/sparql")),
            ],
        ));

        let result = evaluate(&PatternTerm::Var(Var::new("ep")), &pattern(), false, &ctx).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.len(), 2);
        assert!(result.contains_var(&Var::new("ep")));
        assert_eq!(
            result.get(1).and_then(|row| row.get(&Var::new("ep"))),
            Some(&Term::iri("http://b/sparql"))
        );
    }

    #[test]
    fn test_bindings_shipped_in_chunks() {
        let data = MemoryDataset::new();
        let options = QueryOptions::default().with_service_chunk_size(2);
        let scope = DatasetScope::default();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let client: Arc<dyn ServiceClient> = Arc::new(move |req: &ServiceRequest| -> Response {
            let rows = req.bindings.as_ref().map_or(0, |b| b.len());
            counter.fetch_add(rows, Ordering::SeqCst);
            Ok(Multiset::Identity)
        });
        let mut ctx = EvaluationContext::new(&data, &options, &scope).with_service_client(client);
        let rows = (0..5)
            .map(|i| Solution::new().with("s", Term::integer(i)))
            .collect();
        ctx.set_input(Multiset::from_rows(vec![Var::new("s")], rows));

        let endpoint = PatternTerm::from(Term::iri("http://remote/sparql"));
        evaluate(&endpoint, &pattern(), false, &ctx).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_failure_stops_further_requests() {
        let data = MemoryDataset::new();
        let options = QueryOptions::default()
            .with_service_chunk_size(1)
            .with_federation(FederationOptions {
                max_concurrency: 1,
                ..FederationOptions::default()
            });
        let scope = DatasetScope::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let client: Arc<dyn ServiceClient> = Arc::new(move |req: &ServiceRequest| -> Response {
            if counter.fetch_add(1, Ordering::SeqCst) == 1 {
                return Err(ServiceError::failed(req.endpoint.clone(), "down"));
            }
            Ok(one_row(&req.endpoint))
        });
        let mut ctx = EvaluationContext::new(&data, &options, &scope).with_service_client(client);
        let rows = (0..5)
            .map(|i| Solution::new().with("s", Term::integer(i)))
            .collect();
        ctx.set_input(Multiset::from_rows(vec![Var::new("s")], rows));
        let endpoint = PatternTerm::from(Term::iri("http://remote/sparql"));

        assert!(evaluate(&endpoint, &pattern(), false, &ctx).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // SILENT keeps what arrived before the failure
        calls.store(0, Ordering::SeqCst);
        let partial = evaluate(&endpoint, &pattern(), true, &ctx).unwrap();
        assert_eq!(partial.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_ignored_failures_run_every_request() {
        let data = MemoryDataset::new();
        let options = QueryOptions::default()
            .with_service_chunk_size(1)
            .with_federation(FederationOptions {
                max_concurrency: 3,
                ignore_failed_endpoints: true,
                ..FederationOptions::default()
            });
        let scope = DatasetScope::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let client: Arc<dyn ServiceClient> = Arc::new(move |req: &ServiceRequest| -> Response {
            counter.fetch_add(1, Ordering::SeqCst);
            match req.bindings.as_ref().and_then(|b| b.get(0)) {
                Some(row) if row.get(&Var::new("s")) == Some(&Term::integer(2)) => {
                    Err(ServiceError::failed(req.endpoint.clone(), "down"))
                }
                _ => Ok(one_row(&req.endpoint)),
            }
        });
        let mut ctx = EvaluationContext::new(&data, &options, &scope).with_service_client(client);
        let rows = (0..5)
            .map(|i| Solution::new().with("s", Term::integer(i)))
            .collect();
        ctx.set_input(Multiset::from_rows(vec![Var::new("s")], rows));
        let endpoint = PatternTerm::from(Term::iri("http://remote/sparql"));

        let result = evaluate(&endpoint, &pattern(), false, &ctx).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_pool_built_once_and_shared() {
        let data = MemoryDataset::new();
        let options = QueryOptions::default().with_service_chunk_size(1);
        let scope = DatasetScope::default();
        let client: Arc<dyn ServiceClient> = Arc::new(|req: &ServiceRequest| -> Response {
            Ok(one_row(&req.endpoint))
        });
        let pool = Arc::new(ServicePool::new(options.federation.max_concurrency));
        let mut ctx = EvaluationContext::new(&data, &options, &scope)
            .with_service_client(client)
            .with_service_pool(Arc::clone(&pool));
        let rows = (0..3)
            .map(|i| Solution::new().with("s", Term::integer(i)))
            .collect();
        ctx.set_input(Multiset::from_rows(vec![Var::new("s")], rows));
        let endpoint = PatternTerm::from(Term::iri("http://remote/sparql"));

        assert!(!pool.is_started());
        evaluate(&endpoint, &pattern(), false, &ctx).unwrap();
        assert!(pool.is_started());
        let first = pool.get().unwrap() as *const rayon::ThreadPool;

        let nested = ctx.isolated();
        nested.service_pool().get().unwrap();
        evaluate(&endpoint, &pattern(), false, &ctx).unwrap();
        assert!(std::ptr::eq(first, pool.get().unwrap()));
        assert!(std::ptr::eq(first, nested.service_pool().get().unwrap()));
    }

    #[test]
    fn test_remote_limit_includes_offset() {
        assert_eq!(remote_limit(&Algebra::slice(pattern(), 5, 10)), Some(15));
        assert_eq!(remote_limit(&Algebra::slice(pattern(), 0, -1)), None);
        assert_eq!(remote_limit(&pattern()), None);
    }
}
