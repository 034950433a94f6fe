//! Read-only dataset seam
//!
//! The evaluation engine consumes triples through the [`Dataset`] trait and
//! never mutates it. [`MemoryDataset`] is a small indexed implementation for
//! embedding and tests.

use crate::error::Result;
use crate::term::{Term, Triple};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// Graph selector for dataset lookups
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GraphName {
    /// The dataset's default graph
    Default,
    /// A named graph
    Named(Term),
}

/// Boxed triple iterator returned by [`Dataset::find`]
pub type TripleIter<'a> = Box<dyn Iterator<Item = Triple> + 'a>;

/// Read-only access to quads
///
/// Implementations must tolerate concurrent readers when multiple queries
/// evaluate at once; a single evaluation only ever reads.
pub trait Dataset {
    /// Triples in `graph` matching the bound positions (`None` = wildcard)
    fn find<'a>(
        &'a self,
        graph: &GraphName,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
    ) -> Result<TripleIter<'a>>;

    /// Names of all named graphs
    fn graph_names(&self) -> Result<Vec<Term>>;

    /// Triple membership test
    fn contains(&self, graph: &GraphName, triple: &Triple) -> Result<bool> {
        Ok(self
            .find(
                graph,
                Some(&triple.subject),
                Some(&triple.predicate),
                Some(&triple.object),
            )?
            .next()
            .is_some())
    }

    /// Whether a named graph exists
    fn has_graph(&self, name: &Term) -> Result<bool> {
        Ok(self.graph_names()?.iter().any(|g| g == name))
    }

    /// Whether `graph` holds any triple
    fn has_triples(&self, graph: &GraphName) -> Result<bool> {
        Ok(self.find(graph, None, None, None)?.next().is_some())
    }
}

impl<D: Dataset + ?Sized> Dataset for Arc<D> {
    fn find<'a>(
        &'a self,
        graph: &GraphName,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
    ) -> Result<TripleIter<'a>> {
        (**self).find(graph, subject, predicate, object)
    }

    fn graph_names(&self) -> Result<Vec<Term>> {
        (**self).graph_names()
    }

    fn contains(&self, graph: &GraphName, triple: &Triple) -> Result<bool> {
        (**self).contains(graph, triple)
    }

    fn has_graph(&self, name: &Term) -> Result<bool> {
        (**self).has_graph(name)
    }
}

/// One graph's triples plus per-position indexes
#[derive(Debug, Default, Clone)]
struct MemoryGraph {
    triples: Vec<Triple>,
    members: FxHashSet<Triple>,
    by_subject: FxHashMap<Term, Vec<usize>>,
    by_predicate: FxHashMap<Term, Vec<usize>>,
    by_object: FxHashMap<Term, Vec<usize>>,
}

impl MemoryGraph {
    fn insert(&mut self, triple: Triple) -> bool {
        if self.members.contains(&triple) {
            return false;
        }
        let idx = self.triples.len();
        self.by_subject
            .entry(triple.subject.clone())
            .or_default()
            .push(idx);
        self.by_predicate
            .entry(triple.predicate.clone())
            .or_default()
            .push(idx);
        self.by_object
            .entry(triple.object.clone())
            .or_default()
            .push(idx);
        self.members.insert(triple.clone());
        self.triples.push(triple);
        true
    }

    /// Smallest candidate index list for the bound positions, or None when
    /// every position is a wildcard.
    fn candidates(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
    ) -> Option<&[usize]> {
        const EMPTY: &[usize] = &[];
        let lists = [
            subject.map(|s| self.by_subject.get(s).map_or(EMPTY, Vec::as_slice)),
            predicate.map(|p| self.by_predicate.get(p).map_or(EMPTY, Vec::as_slice)),
            object.map(|o| self.by_object.get(o).map_or(EMPTY, Vec::as_slice)),
        ];
        lists.into_iter().flatten().min_by_key(|l| l.len())
    }
}

/// In-memory dataset with a default graph and any number of named graphs
#[derive(Debug, Default, Clone)]
pub struct MemoryDataset {
    default_graph: MemoryGraph,
    named: FxHashMap<Term, MemoryGraph>,
    /// Insertion order of named graphs
    graph_order: Vec<Term>,
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert into the default graph; returns false for duplicates
    pub fn insert(&mut self, triple: Triple) -> bool {
        self.default_graph.insert(triple)
    }

    /// Insert into a named graph, creating it on first use
    pub fn insert_named(&mut self, graph: Term, triple: Triple) -> bool {
        if !self.named.contains_key(&graph) {
            self.graph_order.push(graph.clone());
        }
        self.named.entry(graph).or_default().insert(triple)
    }

    /// Create an empty named graph
    pub fn create_graph(&mut self, graph: Term) {
        if !self.named.contains_key(&graph) {
            self.graph_order.push(graph.clone());
            self.named.insert(graph, MemoryGraph::default());
        }
    }

    pub fn len(&self) -> usize {
        self.default_graph.triples.len()
            + self.named.values().map(|g| g.triples.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn graph(&self, name: &GraphName) -> Option<&MemoryGraph> {
        match name {
            GraphName::Default => Some(&self.default_graph),
            GraphName::Named(term) => self.named.get(term),
        }
    }
}

impl Dataset for MemoryDataset {
    fn find<'a>(
        &'a self,
        graph: &GraphName,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
    ) -> Result<TripleIter<'a>> {
        let Some(g) = self.graph(graph) else {
            return Ok(Box::new(std::iter::empty()));
        };
        let (s, p, o) = (subject.cloned(), predicate.cloned(), object.cloned());
        let matches = move |t: &Triple| {
            s.as_ref().map_or(true, |s| &t.subject == s)
                && p.as_ref().map_or(true, |p| &t.predicate == p)
                && o.as_ref().map_or(true, |o| &t.object == o)
        };
        match g.candidates(subject, predicate, object) {
            Some(idxs) => Ok(Box::new(
                idxs.iter()
                    .map(move |&i| &g.triples[i])
                    .filter(move |t| matches(*t))
                    .cloned(),
            )),
            None => Ok(Box::new(g.triples.iter().cloned())),
        }
    }

    fn graph_names(&self) -> Result<Vec<Term>> {
        Ok(self.graph_order.clone())
    }

    fn contains(&self, graph: &GraphName, triple: &Triple) -> Result<bool> {
        Ok(self
            .graph(graph)
            .map_or(false, |g| g.members.contains(triple)))
    }

    fn has_graph(&self, name: &Term) -> Result<bool> {
        Ok(self.named.contains_key(name))
    }
}
