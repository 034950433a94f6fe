//! Query evaluation options
//!
//! [`QueryOptions`] collects the per-query knobs (timeout, parallel join
//! fan-out, string collation, SERVICE batching and federation limits).
//! [`DatasetScope`] carries the FROM / FROM NAMED restrictions.

use crate::compare::{Collation, StringComparer};
use crate::multiset::Parallelism;
use rill_core::Term;
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Default rows per VALUES block shipped to a SERVICE endpoint
pub const DEFAULT_SERVICE_CHUNK_SIZE: usize = 100;

/// Default probe rows before join fan-out kicks in
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 10_000;

/// Limits for federated SERVICE evaluation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FederationOptions {
    /// Maximum in-flight endpoint requests
    pub max_concurrency: usize,
    /// Per-endpoint timeout in milliseconds (0 = inherit the query timeout)
    pub endpoint_timeout_ms: u64,
    /// Keep going when an endpoint fails
    pub ignore_failed_endpoints: bool,
}

impl Default for FederationOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            endpoint_timeout_ms: 0,
            ignore_failed_endpoints: false,
        }
    }
}

/// Options for one query evaluation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct QueryOptions {
    /// Execution timeout in milliseconds (0 = none)
    pub timeout_ms: u64,
    /// Upper bound on `timeout_ms` imposed by the processor (0 = none)
    pub max_timeout_ms: u64,
    /// Return the last completed output instead of failing on timeout
    pub partial_results_on_timeout: bool,
    /// Allow data-parallel join and product probing
    pub parallel: bool,
    pub parallel_threshold: usize,
    pub collation: Collation,
    pub ignore_case: bool,
    pub ignore_accents: bool,
    pub service_chunk_size: usize,
    pub federation: FederationOptions,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 0,
            max_timeout_ms: 0,
            partial_results_on_timeout: false,
            parallel: false,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            collation: Collation::default(),
            ignore_case: false,
            ignore_accents: false,
            service_chunk_size: DEFAULT_SERVICE_CHUNK_SIZE,
            federation: FederationOptions::default(),
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a JSON `opts` object; absent or malformed input gives
    /// defaults
    pub fn from_opts_value(opts: Option<&JsonValue>) -> Self {
        let Some(opts) = opts.filter(|v| v.is_object()) else {
            return Self::default();
        };
        serde_json::from_value(opts.clone()).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring malformed query options");
            Self::default()
        })
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_timeout_ms(mut self, max_timeout_ms: u64) -> Self {
        self.max_timeout_ms = max_timeout_ms;
        self
    }

    pub fn with_partial_results(mut self) -> Self {
        self.partial_results_on_timeout = true;
        self
    }

    pub fn with_parallel(mut self, threshold: usize) -> Self {
        self.parallel = true;
        self.parallel_threshold = threshold;
        self
    }

    pub fn with_collation(mut self, collation: Collation, ignore_case: bool) -> Self {
        self.collation = collation;
        self.ignore_case = ignore_case;
        self
    }

    pub fn with_ignore_accents(mut self, ignore_accents: bool) -> Self {
        self.ignore_accents = ignore_accents;
        self
    }

    pub fn with_service_chunk_size(mut self, size: usize) -> Self {
        self.service_chunk_size = size;
        self
    }

    pub fn with_federation(mut self, federation: FederationOptions) -> Self {
        self.federation = federation;
        self
    }

    /// Timeout actually enforced: the query timeout capped by the processor
    /// maximum (0 = none)
    pub fn effective_timeout_ms(&self) -> u64 {
        match (self.timeout_ms, self.max_timeout_ms) {
            (0, max) => max,
            (t, 0) => t,
            (t, max) => t.min(max),
        }
    }

    pub fn parallelism(&self) -> Parallelism {
        Parallelism {
            enabled: self.parallel,
            threshold: self.parallel_threshold.max(1),
        }
    }

    pub fn string_comparer(&self) -> StringComparer {
        StringComparer::new(self.collation, self.ignore_case).with_ignore_accents(self.ignore_accents)
    }
}

/// FROM / FROM NAMED restrictions
///
/// An empty `default_graphs` means the dataset's own default graph; an empty
/// `named_graphs` means every named graph the dataset holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetScope {
    pub default_graphs: Vec<Term>,
    pub named_graphs: Vec<Term>,
}

impl DatasetScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_graph(mut self, graph: Term) -> Self {
        self.default_graphs.push(graph);
        self
    }

    pub fn with_named_graph(mut self, graph: Term) -> Self {
        self.named_graphs.push(graph);
        self
    }

    /// Whether `graph` may be addressed by GRAPH
    pub fn allows_named(&self, graph: &Term) -> bool {
        self.named_graphs.is_empty() || self.named_graphs.contains(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_when_absent() {
        assert_eq!(QueryOptions::from_opts_value(None), QueryOptions::default());
        assert_eq!(
            QueryOptions::from_opts_value(Some(&json!("nope"))),
            QueryOptions::default()
        );
    }

    #[test]
    fn test_parse_kebab_case() {
        let opts = QueryOptions::from_opts_value(Some(&json!({
            "timeout-ms": 250,
            "partial-results-on-timeout": true,
            "collation": "invariant",
            "federation": { "max-concurrency": 2, "ignore-failed-endpoints": true }
        })));
        assert_eq!(opts.timeout_ms, 250);
        assert!(opts.partial_results_on_timeout);
        assert_eq!(opts.collation, Collation::Invariant);
        assert_eq!(opts.federation.max_concurrency, 2);
        assert!(opts.federation.ignore_failed_endpoints);
        assert_eq!(opts.service_chunk_size, DEFAULT_SERVICE_CHUNK_SIZE);
    }

    #[test]
    fn test_string_comparer_from_opts() {
        let opts = QueryOptions::from_opts_value(Some(&json!({
            "ignore-case": true,
            "ignore-accents": true
        })));
        let strings = opts.string_comparer();
        assert!(strings.ignore_case);
        assert!(strings.ignore_accents);
        assert_eq!(strings.compare("Élan", "elan"), std::cmp::Ordering::Equal);
    }

    #[test]
    fn test_effective_timeout_is_capped() {
        assert_eq!(QueryOptions::new().effective_timeout_ms(), 0);
        assert_eq!(QueryOptions::new().with_timeout_ms(500).effective_timeout_ms(), 500);
        assert_eq!(
            QueryOptions::new()
                .with_timeout_ms(500)
                .with_max_timeout_ms(100)
                .effective_timeout_ms(),
            100
        );
        assert_eq!(
            QueryOptions::new().with_max_timeout_ms(100).effective_timeout_ms(),
            100
        );
    }

    #[test]
    fn test_scope_named_graphs() {
        let g = Term::iri("http://example.org/g");
        assert!(DatasetScope::new().allows_named(&g));
        let scoped = DatasetScope::new().with_named_graph(Term::iri("http://example.org/h"));
        assert!(!scoped.allows_named(&g));
    }
}
