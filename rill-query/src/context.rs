//! Evaluation context
//!
//! The `EvaluationContext` carries the per-query state threaded through the
//! recursive evaluation: the dataset handle and options, the current input
//! and last completed output multisets, the two comparers, the query timer,
//! the active graph and the typed caches used by EXISTS, BNODE and RAND.
//!
//! # Isolation
//!
//! EXISTS patterns and sub-queries run in an [`isolated`](EvaluationContext::isolated)
//! copy: it shares the dataset, options, timer, `NOW()` value and blank node
//! allocator (and SERVICE pool) with its parent, but starts from an identity input with empty
//! caches so nothing leaks back into the outer evaluation.

use crate::algebra::{Algebra, ExprId};
use crate::compare::{OrderingComparer, RelationalComparer};
use crate::error::{Result, TimeoutError};
use crate::multiset::{Multiset, Parallelism, SolutionId};
use crate::options::{DatasetScope, QueryOptions};
use crate::service::{ServiceClient, ServicePool};
use rill_core::{Dataset, DateTime, GraphName, Term, Triple};
use rill_vocab::blank::GENERATED_PREFIX;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic query timer
#[derive(Clone, Copy, Debug)]
pub struct QueryTimer {
    start: Instant,
    timeout: Option<Duration>,
}

impl QueryTimer {
    /// Start now; `timeout_ms == 0` means no timeout
    pub fn start(timeout_ms: u64) -> Self {
        Self {
            start: Instant::now(),
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            start: Instant::now(),
            timeout: (!timeout.is_zero()).then_some(timeout),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Fails once the elapsed time exceeds the timeout
    pub fn check(&self) -> std::result::Result<(), TimeoutError> {
        match self.timeout {
            Some(timeout) => {
                let elapsed = self.elapsed();
                if elapsed > timeout {
                    Err(TimeoutError {
                        timeout_ms: timeout.as_millis() as u64,
                        elapsed_ms: elapsed.as_millis() as u64,
                    })
                } else {
                    Ok(())
                }
            }
            None => Ok(()),
        }
    }

    /// Time left in milliseconds, at least 1 while a timeout is set
    pub fn remaining_ms(&self) -> Option<u64> {
        self.timeout.map(|timeout| {
            let left = timeout.saturating_sub(self.elapsed()).as_millis() as u64;
            left.max(1)
        })
    }
}

/// Key of a cached EXISTS result: expression, active graph and input identity
pub(crate) type ExistsKey = (ExprId, GraphName, u64, usize);

#[derive(Default)]
struct Caches {
    exists: RefCell<FxHashMap<ExistsKey, Rc<FxHashSet<SolutionId>>>>,
    bnodes: RefCell<FxHashMap<(GraphName, u64, SolutionId, String), Term>>,
    rand: RefCell<FxHashMap<(ExprId, GraphName, u64, SolutionId), f64>>,
}

/// Per-query evaluation state
pub struct EvaluationContext<'a> {
    data: &'a dyn Dataset,
    options: &'a QueryOptions,
    scope: &'a DatasetScope,
    service: Option<Arc<dyn ServiceClient>>,
    service_pool: Arc<ServicePool>,
    input: Multiset,
    output: Multiset,
    active_graph: GraphName,
    relational: RelationalComparer,
    ordering: OrderingComparer,
    timer: QueryTimer,
    depth: usize,
    now: DateTime,
    bnode_counter: Rc<Cell<u64>>,
    caches: Caches,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(data: &'a dyn Dataset, options: &'a QueryOptions, scope: &'a DatasetScope) -> Self {
        let strings = options.string_comparer();
        Self {
            data,
            options,
            scope,
            service: None,
            service_pool: Arc::new(ServicePool::new(options.federation.max_concurrency)),
            input: Multiset::Identity,
            output: Multiset::Null,
            active_graph: GraphName::Default,
            relational: RelationalComparer::new(strings),
            ordering: OrderingComparer::new(strings),
            timer: QueryTimer::start(options.effective_timeout_ms()),
            depth: 0,
            now: DateTime::now(),
            bnode_counter: Rc::new(Cell::new(0)),
            caches: Caches::default(),
        }
    }

    pub fn with_service_client(mut self, client: Arc<dyn ServiceClient>) -> Self {
        self.service = Some(client);
        self
    }

    /// Share a SERVICE worker pool with other contexts
    pub fn with_service_pool(mut self, pool: Arc<ServicePool>) -> Self {
        self.service_pool = pool;
        self
    }

    /// Replace the timer (the timer starts when the context is created)
    pub fn with_timer(mut self, timer: QueryTimer) -> Self {
        self.timer = timer;
        self
    }

    /// Copy for nested evaluation (EXISTS, sub-queries)
    pub fn isolated(&self) -> EvaluationContext<'a> {
        EvaluationContext {
            data: self.data,
            options: self.options,
            scope: self.scope,
            service: self.service.clone(),
            service_pool: Arc::clone(&self.service_pool),
            input: Multiset::Identity,
            output: Multiset::Null,
            active_graph: self.active_graph.clone(),
            relational: self.relational,
            ordering: self.ordering,
            timer: self.timer,
            depth: self.depth + 1,
            now: self.now.clone(),
            bnode_counter: Rc::clone(&self.bnode_counter),
            caches: Caches::default(),
        }
    }

    /// Evaluate an operator tree in this context
    pub fn evaluate(&mut self, algebra: &Algebra) -> Result<Multiset> {
        crate::processor::evaluate(algebra, self)
    }

    pub fn data(&self) -> &'a dyn Dataset {
        self.data
    }

    pub fn options(&self) -> &'a QueryOptions {
        self.options
    }

    pub fn scope(&self) -> &'a DatasetScope {
        self.scope
    }

    pub fn service_client(&self) -> Option<&Arc<dyn ServiceClient>> {
        self.service.as_ref()
    }

    pub fn service_pool(&self) -> &ServicePool {
        &self.service_pool
    }

    pub fn parallelism(&self) -> Parallelism {
        self.options.parallelism()
    }

    pub fn relational(&self) -> &RelationalComparer {
        &self.relational
    }

    pub fn ordering(&self) -> &OrderingComparer {
        &self.ordering
    }

    pub fn timer(&self) -> &QueryTimer {
        &self.timer
    }

    pub fn check_timeout(&self) -> Result<()> {
        Ok(self.timer.check()?)
    }

    pub fn remaining_timeout_ms(&self) -> Option<u64> {
        self.timer.remaining_ms()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn enter(&mut self) {
        self.depth += 1;
    }

    pub(crate) fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// `NOW()` value, fixed for the whole query
    pub fn now(&self) -> &DateTime {
        &self.now
    }

    pub fn input(&self) -> &Multiset {
        &self.input
    }

    /// Install the multiset expressions are evaluated against
    pub fn set_input(&mut self, input: Multiset) -> Multiset {
        std::mem::replace(&mut self.input, input)
    }

    /// Most recently completed operator output
    pub fn output(&self) -> &Multiset {
        &self.output
    }

    pub(crate) fn set_output(&mut self, output: &Multiset) {
        self.output = output.clone();
    }

    pub fn active_graph(&self) -> &GraphName {
        &self.active_graph
    }

    pub fn set_active_graph(&mut self, graph: GraphName) -> GraphName {
        std::mem::replace(&mut self.active_graph, graph)
    }

    /// Triples of the active graph matching the bound positions
    ///
    /// The default graph is the RDF merge of the FROM graphs when any are
    /// given. The timeout is checked for every triple scanned.
    pub fn find(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
    ) -> Result<Vec<Triple>> {
        let graphs: Vec<GraphName> = match &self.active_graph {
            GraphName::Default if !self.scope.default_graphs.is_empty() => self
                .scope
                .default_graphs
                .iter()
                .cloned()
                .map(GraphName::Named)
                .collect(),
            other => vec![other.clone()],
        };
        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        let merge = graphs.len() > 1;
        for graph in &graphs {
            for triple in self.data.find(graph, subject, predicate, object)? {
                self.check_timeout()?;
                if !merge || seen.insert(triple.clone()) {
                    out.push(triple);
                }
            }
        }
        Ok(out)
    }

    /// Named graphs visible to GRAPH, honoring FROM NAMED
    pub fn graph_names(&self) -> Result<Vec<Term>> {
        if self.scope.named_graphs.is_empty() {
            Ok(self.data.graph_names()?)
        } else {
            Ok(self.scope.named_graphs.clone())
        }
    }

    /// Fresh blank node label, unique within the query
    pub fn fresh_blank_node(&self) -> Term {
        let n = self.bnode_counter.get();
        self.bnode_counter.set(n + 1);
        Term::blank(format!("{}{}", GENERATED_PREFIX, n))
    }

    /// Blank node for `BNODE(lexical)`, stable per active graph, input
    /// identity, solution and key
    pub fn keyed_blank_node(&self, stamp: u64, id: SolutionId, key: &str) -> Term {
        let cache_key = (self.active_graph.clone(), stamp, id, key.to_string());
        if let Some(term) = self.caches.bnodes.borrow().get(&cache_key) {
            return term.clone();
        }
        let term = self.fresh_blank_node();
        self.caches.bnodes.borrow_mut().insert(cache_key, term.clone());
        term
    }

    pub(crate) fn cached_exists(&self, key: &ExistsKey) -> Option<Rc<FxHashSet<SolutionId>>> {
        self.caches.exists.borrow().get(key).cloned()
    }

    pub(crate) fn store_exists(&self, key: ExistsKey, ids: FxHashSet<SolutionId>) -> Rc<FxHashSet<SolutionId>> {
        let ids = Rc::new(ids);
        self.caches.exists.borrow_mut().insert(key, Rc::clone(&ids));
        ids
    }

    /// `RAND()` value memoized per expression, active graph, input identity
    /// and solution
    pub fn random_for(&self, expr: ExprId, stamp: u64, id: SolutionId) -> f64 {
        *self
            .caches
            .rand
            .borrow_mut()
            .entry((expr, self.active_graph.clone(), stamp, id))
            .or_insert_with(rand::random::<f64>)
    }
}
