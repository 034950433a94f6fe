//! Multisets of solutions
//!
//! This module contains:
//! - `Solution`: a partial mapping from variable to term
//! - `SolutionSet`: an ordered bag of solutions sharing a variable list
//! - `GroupedSet`: a solution set partitioned into `BindingGroup`s
//! - `Multiset`: the value produced by every operator (identity, null,
//!   ordinary or grouped)
//!
//! # Identity
//!
//! A solution's id is its position in the owning multiset. Every
//! `SolutionSet` carries a stamp drawn from a process-wide counter; the pair
//! `(stamp, len)` identifies its contents for cache keys. Growing a set
//! changes `len`, and growing a set whose rows are shared with a clone
//! allocates a fresh stamp.

use crate::var::Var;
use once_cell::sync::Lazy;
use rayon::prelude::*;
use rill_core::Term;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Position of a solution within its multiset
pub type SolutionId = usize;

static NEXT_STAMP: AtomicU64 = AtomicU64::new(1);

static EMPTY_SOLUTION: Lazy<Solution> = Lazy::new(Solution::new);

fn next_stamp() -> u64 {
    NEXT_STAMP.fetch_add(1, Ordering::Relaxed)
}

/// A (possibly partial) mapping from variable to term
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Solution {
    values: FxHashMap<Var, Term>,
}

impl Solution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, var: &Var) -> Option<&Term> {
        self.values.get(var)
    }

    pub fn contains(&self, var: &Var) -> bool {
        self.values.contains_key(var)
    }

    pub fn insert(&mut self, var: Var, term: Term) -> Option<Term> {
        self.values.insert(var, term)
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, var: impl Into<Var>, term: Term) -> Self {
        self.values.insert(var.into(), term);
        self
    }

    pub fn remove(&mut self, var: &Var) -> Option<Term> {
        self.values.remove(var)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Var, &Term)> {
        self.values.iter()
    }

    /// Bound variables in name order
    pub fn sorted_vars(&self) -> Vec<Var> {
        let mut vars: Vec<Var> = self.values.keys().cloned().collect();
        vars.sort();
        vars
    }

    /// Every variable bound on both sides has the same term
    pub fn is_compatible(&self, other: &Solution) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .values
            .iter()
            .all(|(var, term)| large.values.get(var).map_or(true, |t| t == term))
    }

    /// Compatible and sharing at least one variable bound on both sides
    pub fn is_minus_compatible(&self, other: &Solution) -> bool {
        let mut shared = false;
        for (var, term) in &self.values {
            if let Some(t) = other.values.get(var) {
                if t != term {
                    return false;
                }
                shared = true;
            }
        }
        shared
    }

    /// Union of two compatible solutions
    pub fn merged(&self, other: &Solution) -> Solution {
        let mut values = self.values.clone();
        for (var, term) in &other.values {
            values.entry(var.clone()).or_insert_with(|| term.clone());
        }
        Solution { values }
    }

    /// Restrict to `vars`
    pub fn project(&self, vars: &[Var]) -> Solution {
        let values = vars
            .iter()
            .filter_map(|v| self.values.get(v).map(|t| (v.clone(), t.clone())))
            .collect();
        Solution { values }
    }

    /// Row key in `vars` order, used for duplicate elimination and grouping
    pub fn key(&self, vars: &[Var]) -> Vec<Option<Term>> {
        vars.iter().map(|v| self.values.get(v).cloned()).collect()
    }
}

impl FromIterator<(Var, Term)> for Solution {
    fn from_iter<I: IntoIterator<Item = (Var, Term)>>(iter: I) -> Self {
        Solution {
            values: iter.into_iter().collect(),
        }
    }
}

/// Data-parallel fan-out for join probing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Parallelism {
    pub enabled: bool,
    /// Minimum number of probe rows before fanning out
    pub threshold: usize,
}

impl Parallelism {
    pub fn sequential() -> Self {
        Self {
            enabled: false,
            threshold: usize::MAX,
        }
    }

    fn applies(&self, rows: usize) -> bool {
        self.enabled && rows >= self.threshold
    }
}

impl Default for Parallelism {
    fn default() -> Self {
        Self::sequential()
    }
}

/// An ordered bag of solutions over a declared variable list
#[derive(Clone, Debug)]
pub struct SolutionSet {
    vars: Vec<Var>,
    rows: Arc<Vec<Solution>>,
    stamp: u64,
}

impl SolutionSet {
    pub fn new(vars: Vec<Var>) -> Self {
        Self {
            vars,
            rows: Arc::new(Vec::new()),
            stamp: next_stamp(),
        }
    }

    /// Build from rows; variables bound by a row but missing from `vars` are
    /// appended
    pub fn from_rows(vars: Vec<Var>, rows: Vec<Solution>) -> Self {
        let mut set = Self {
            vars,
            rows: Arc::new(Vec::new()),
            stamp: next_stamp(),
        };
        let mut seen: FxHashSet<Var> = set.vars.iter().cloned().collect();
        for row in &rows {
            for var in row.sorted_vars() {
                if seen.insert(var.clone()) {
                    set.vars.push(var);
                }
            }
        }
        set.rows = Arc::new(rows);
        set
    }

    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    pub fn contains_var(&self, var: &Var) -> bool {
        self.vars.contains(var)
    }

    pub fn add_var(&mut self, var: Var) {
        if !self.vars.contains(&var) {
            self.vars.push(var);
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    pub fn get(&self, id: SolutionId) -> Option<&Solution> {
        self.rows.get(id)
    }

    pub fn rows(&self) -> &[Solution] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = (SolutionId, &Solution)> {
        self.rows.iter().enumerate()
    }

    pub fn push(&mut self, solution: Solution) {
        for var in solution.sorted_vars() {
            self.add_var(var);
        }
        if Arc::get_mut(&mut self.rows).is_none() {
            self.stamp = next_stamp();
        }
        Arc::make_mut(&mut self.rows).push(solution);
    }

    /// Rows at `ids`, in the order given
    pub fn select(&self, ids: &[SolutionId]) -> SolutionSet {
        let rows = ids.iter().filter_map(|&i| self.rows.get(i).cloned()).collect();
        SolutionSet {
            vars: self.vars.clone(),
            rows: Arc::new(rows),
            stamp: next_stamp(),
        }
    }

    /// Bind `var` on each row from `values` (`None` leaves it unbound)
    pub fn extend(&self, var: Var, values: Vec<Option<Term>>) -> SolutionSet {
        let rows = self
            .rows
            .iter()
            .zip(values)
            .map(|(row, value)| {
                let mut row = row.clone();
                if let Some(term) = value {
                    row.insert(var.clone(), term);
                }
                row
            })
            .collect();
        let mut vars = self.vars.clone();
        if !vars.contains(&var) {
            vars.push(var);
        }
        SolutionSet {
            vars,
            rows: Arc::new(rows),
            stamp: next_stamp(),
        }
    }

    /// Projection onto `vars`, which also become the declared variable list
    pub fn project(&self, vars: &[Var]) -> SolutionSet {
        let rows = self.rows.iter().map(|r| r.project(vars)).collect();
        SolutionSet {
            vars: vars.to_vec(),
            rows: Arc::new(rows),
            stamp: next_stamp(),
        }
    }

    /// First occurrence of each distinct row, in order
    pub fn distinct(&self) -> SolutionSet {
        let mut seen = FxHashSet::default();
        let ids: Vec<SolutionId> = self
            .iter()
            .filter(|(_, row)| seen.insert(row.key(&self.vars)))
            .map(|(id, _)| id)
            .collect();
        self.select(&ids)
    }

    fn shared_vars(&self, other: &SolutionSet) -> Vec<Var> {
        self.vars
            .iter()
            .filter(|v| other.vars.contains(v))
            .cloned()
            .collect()
    }

    fn union_vars(&self, other: &SolutionSet) -> Vec<Var> {
        let mut vars = self.vars.clone();
        for v in &other.vars {
            if !vars.contains(v) {
                vars.push(v.clone());
            }
        }
        vars
    }
}

impl PartialEq for SolutionSet {
    fn eq(&self, other: &Self) -> bool {
        self.vars == other.vars && self.rows == other.rows
    }
}

/// A group key plus the ids of its member solutions
#[derive(Clone, Debug, PartialEq)]
pub struct BindingGroup {
    key: Vec<Option<Term>>,
    members: Vec<SolutionId>,
}

impl BindingGroup {
    pub fn new(key: Vec<Option<Term>>, members: Vec<SolutionId>) -> Self {
        Self { key, members }
    }

    pub fn key(&self) -> &[Option<Term>] {
        &self.key
    }

    /// Member ids in ascending order
    pub fn members(&self) -> &[SolutionId] {
        &self.members
    }
}

/// Solutions partitioned into groups
///
/// `contents` are the pre-grouping solutions; `output` holds one row per
/// group (group keys and aggregate values), row `i` belonging to group `i`.
#[derive(Clone, Debug)]
pub struct GroupedSet {
    contents: Arc<SolutionSet>,
    groups: Vec<BindingGroup>,
    output: SolutionSet,
}

impl GroupedSet {
    pub fn new(contents: Arc<SolutionSet>, groups: Vec<BindingGroup>, output: SolutionSet) -> Self {
        debug_assert_eq!(groups.len(), output.len());
        Self {
            contents,
            groups,
            output,
        }
    }

    pub fn contents(&self) -> &SolutionSet {
        &self.contents
    }

    pub fn groups(&self) -> &[BindingGroup] {
        &self.groups
    }

    pub fn group(&self, id: SolutionId) -> Option<&BindingGroup> {
        self.groups.get(id)
    }

    pub fn output(&self) -> &SolutionSet {
        &self.output
    }

    fn select(&self, ids: &[SolutionId]) -> GroupedSet {
        let groups = ids
            .iter()
            .filter_map(|&i| self.groups.get(i).cloned())
            .collect();
        GroupedSet {
            contents: Arc::clone(&self.contents),
            groups,
            output: self.output.select(ids),
        }
    }

    fn extend(&self, var: Var, values: Vec<Option<Term>>) -> GroupedSet {
        GroupedSet {
            contents: Arc::clone(&self.contents),
            groups: self.groups.clone(),
            output: self.output.extend(var, values),
        }
    }
}

/// Result of evaluating one operator
#[derive(Clone, Debug)]
pub enum Multiset {
    /// One empty solution; neutral element of join
    Identity,
    /// No solutions; absorbing element of join
    Null,
    Solutions(SolutionSet),
    Grouped(GroupedSet),
}

impl Multiset {
    pub fn empty(vars: Vec<Var>) -> Self {
        Multiset::Solutions(SolutionSet::new(vars))
    }

    pub fn from_rows(vars: Vec<Var>, rows: Vec<Solution>) -> Self {
        Multiset::Solutions(SolutionSet::from_rows(vars, rows))
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Multiset::Identity)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Multiset::Null)
    }

    pub fn len(&self) -> usize {
        match self {
            Multiset::Identity => 1,
            Multiset::Null => 0,
            Multiset::Solutions(set) => set.len(),
            Multiset::Grouped(g) => g.output.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn vars(&self) -> &[Var] {
        match self {
            Multiset::Identity | Multiset::Null => &[],
            Multiset::Solutions(set) => set.vars(),
            Multiset::Grouped(g) => g.output.vars(),
        }
    }

    pub fn contains_var(&self, var: &Var) -> bool {
        self.vars().contains(var)
    }

    pub fn get(&self, id: SolutionId) -> Option<&Solution> {
        match self {
            Multiset::Identity => (id == 0).then(|| &*EMPTY_SOLUTION),
            Multiset::Null => None,
            Multiset::Solutions(set) => set.get(id),
            Multiset::Grouped(g) => g.output.get(id),
        }
    }

    pub fn ids(&self) -> std::ops::Range<SolutionId> {
        0..self.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SolutionId, &Solution)> {
        self.ids().filter_map(move |id| self.get(id).map(|s| (id, s)))
    }

    /// `(stamp, count)` identifying the contents, used in cache keys
    pub fn identity_key(&self) -> (u64, usize) {
        match self {
            Multiset::Identity => (0, 1),
            Multiset::Null => (0, 0),
            Multiset::Solutions(set) => (set.stamp(), set.len()),
            Multiset::Grouped(g) => (g.output.stamp(), g.output.len()),
        }
    }

    pub fn as_grouped(&self) -> Option<&GroupedSet> {
        match self {
            Multiset::Grouped(g) => Some(g),
            _ => None,
        }
    }

    /// Flatten to an ordinary solution set
    pub fn to_solution_set(&self) -> SolutionSet {
        match self {
            Multiset::Identity => SolutionSet::from_rows(Vec::new(), vec![Solution::new()]),
            Multiset::Null => SolutionSet::new(Vec::new()),
            Multiset::Solutions(set) => set.clone(),
            Multiset::Grouped(g) => g.output.clone(),
        }
    }

    /// Solutions at `ids`, in the order given; groups travel with their rows
    pub fn select(&self, ids: &[SolutionId]) -> Multiset {
        match self {
            Multiset::Identity => {
                if ids.contains(&0) {
                    Multiset::Identity
                } else {
                    Multiset::Null
                }
            }
            Multiset::Null => Multiset::Null,
            Multiset::Solutions(set) => Multiset::Solutions(set.select(ids)),
            Multiset::Grouped(g) => Multiset::Grouped(g.select(ids)),
        }
    }

    /// Bind `var` on every solution (one value per id)
    pub fn extend(&self, var: Var, values: Vec<Option<Term>>) -> Multiset {
        match self {
            Multiset::Null => Multiset::Null,
            Multiset::Grouped(g) => Multiset::Grouped(g.extend(var, values)),
            other => Multiset::Solutions(other.to_solution_set().extend(var, values)),
        }
    }

    pub fn distinct(&self) -> Multiset {
        match self {
            Multiset::Identity | Multiset::Null => self.clone(),
            Multiset::Grouped(g) => Multiset::Solutions(g.output.distinct()),
            Multiset::Solutions(set) => Multiset::Solutions(set.distinct()),
        }
    }

    /// Natural join on shared variables; cross product when none are shared
    pub fn join(&self, other: &Multiset, par: Parallelism) -> Multiset {
        if other.is_identity() {
            return self.clone();
        }
        if self.is_identity() {
            return other.clone();
        }
        if self.is_empty() || other.is_empty() {
            return Multiset::Null;
        }
        let (lhs, rhs) = (self.to_solution_set(), other.to_solution_set());
        let shared = lhs.shared_vars(&rhs);
        if shared.is_empty() {
            return self.product(other, par);
        }
        let index = JoinIndex::build(&rhs, &shared);
        let probe = |row: &Solution| -> Vec<Solution> {
            index
                .candidates(row)
                .into_iter()
                .filter_map(|rid| {
                    let r = &rhs.rows()[rid];
                    row.is_compatible(r).then(|| row.merged(r))
                })
                .collect()
        };
        let rows: Vec<Solution> = if par.applies(lhs.len()) {
            lhs.rows().par_iter().flat_map_iter(probe).collect()
        } else {
            lhs.rows().iter().flat_map(probe).collect()
        };
        Multiset::from_rows(lhs.union_vars(&rhs), rows)
    }

    /// Left outer join
    ///
    /// `filter` is asked about each compatible pairing, given the set of all
    /// joined candidate rows and the candidate's id in it. A left solution
    /// with no accepted pairing survives unmodified.
    pub fn left_join<F>(&self, other: &Multiset, par: Parallelism, mut filter: F) -> Multiset
    where
        F: FnMut(&SolutionSet, SolutionId) -> bool,
    {
        if self.is_empty() {
            return Multiset::Null;
        }
        let lhs = self.to_solution_set();
        if other.is_empty() {
            return Multiset::Solutions(lhs);
        }
        let rhs = other.to_solution_set();
        let shared = lhs.shared_vars(&rhs);
        let index = JoinIndex::build(&rhs, &shared);
        let probe = |row: &Solution| -> Vec<Solution> {
            index
                .candidates(row)
                .into_iter()
                .filter_map(|rid| {
                    let r = &rhs.rows()[rid];
                    row.is_compatible(r).then(|| row.merged(r))
                })
                .collect()
        };
        let matches: Vec<Vec<Solution>> = if par.applies(lhs.len()) {
            lhs.rows().par_iter().map(probe).collect()
        } else {
            lhs.rows().iter().map(probe).collect()
        };

        let vars = lhs.union_vars(&rhs);
        let owners: Vec<usize> = matches
            .iter()
            .enumerate()
            .flat_map(|(i, m)| std::iter::repeat(i).take(m.len()))
            .collect();
        let candidates = SolutionSet::from_rows(vars.clone(), matches.into_iter().flatten().collect());
        let mut accepted: Vec<Vec<SolutionId>> = vec![Vec::new(); lhs.len()];
        for (cid, &owner) in owners.iter().enumerate() {
            if filter(&candidates, cid) {
                accepted[owner].push(cid);
            }
        }

        let mut out = SolutionSet::new(vars);
        for (lid, row) in lhs.iter() {
            if accepted[lid].is_empty() {
                out.push(row.clone());
            } else {
                for &cid in &accepted[lid] {
                    out.push(candidates.rows()[cid].clone());
                }
            }
        }
        Multiset::Solutions(out)
    }

    /// Ids of solutions in `self` compatible with at least one solution in
    /// `other`; unbound values are wildcards
    pub fn compatible_ids(&self, other: &Multiset) -> FxHashSet<SolutionId> {
        if self.is_empty() || other.is_empty() {
            return FxHashSet::default();
        }
        if other.is_identity() {
            return self.ids().collect();
        }
        let (lhs, rhs) = (self.to_solution_set(), other.to_solution_set());
        let shared = lhs.shared_vars(&rhs);
        if shared.is_empty() {
            return self.ids().collect();
        }
        let index = JoinIndex::build(&rhs, &shared);
        lhs.iter()
            .filter(|(_, row)| {
                index
                    .candidates(row)
                    .into_iter()
                    .any(|rid| row.is_compatible(&rhs.rows()[rid]))
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// EXISTS (`must_exist`) or NOT EXISTS semi-join
    pub fn exists_join(&self, other: &Multiset, must_exist: bool) -> Multiset {
        let hits = self.compatible_ids(other);
        let ids: Vec<SolutionId> = self
            .ids()
            .filter(|id| hits.contains(id) == must_exist)
            .collect();
        if ids.is_empty() {
            return Multiset::Null;
        }
        self.select(&ids)
    }

    /// SPARQL MINUS
    pub fn minus_join(&self, other: &Multiset) -> Multiset {
        if other.is_identity() || other.is_empty() || self.is_empty() {
            return self.clone();
        }
        let (lhs, rhs) = (self.to_solution_set(), other.to_solution_set());
        let shared = lhs.shared_vars(&rhs);
        if shared.is_empty() {
            return self.clone();
        }
        let index = JoinIndex::build(&rhs, &shared);
        let ids: Vec<SolutionId> = lhs
            .iter()
            .filter(|(_, row)| {
                !index
                    .exact_candidates(row)
                    .into_iter()
                    .any(|rid| row.is_minus_compatible(&rhs.rows()[rid]))
            })
            .map(|(id, _)| id)
            .collect();
        if ids.is_empty() {
            return Multiset::Null;
        }
        self.select(&ids)
    }

    /// Cartesian product
    pub fn product(&self, other: &Multiset, par: Parallelism) -> Multiset {
        if other.is_identity() {
            return self.clone();
        }
        if self.is_identity() {
            return other.clone();
        }
        if self.is_empty() || other.is_empty() {
            return Multiset::Null;
        }
        let (lhs, rhs) = (self.to_solution_set(), other.to_solution_set());
        let pair = |row: &Solution| -> Vec<Solution> {
            rhs.rows().iter().map(|r| row.merged(r)).collect()
        };
        let rows: Vec<Solution> = if par.applies(lhs.len()) {
            lhs.rows().par_iter().flat_map_iter(pair).collect()
        } else {
            lhs.rows().iter().flat_map(pair).collect()
        };
        Multiset::from_rows(lhs.union_vars(&rhs), rows)
    }

    /// Bag union; solutions of `self` come first
    pub fn union(&self, other: &Multiset) -> Multiset {
        if other.is_null() {
            return self.clone();
        }
        if self.is_null() {
            return other.clone();
        }
        let (lhs, rhs) = (self.to_solution_set(), other.to_solution_set());
        let rows = lhs.rows().iter().chain(rhs.rows()).cloned().collect();
        Multiset::from_rows(lhs.union_vars(&rhs), rows)
    }
}

impl From<SolutionSet> for Multiset {
    fn from(set: SolutionSet) -> Self {
        Multiset::Solutions(set)
    }
}

/// Per-variable value index over one side of a join
///
/// Solutions with the variable unbound go to `nulls` and match any value.
struct JoinIndex<'a> {
    vars: Vec<Var>,
    values: Vec<FxHashMap<&'a Term, Vec<SolutionId>>>,
    nulls: Vec<Vec<SolutionId>>,
    len: usize,
}

impl<'a> JoinIndex<'a> {
    fn build(set: &'a SolutionSet, vars: &[Var]) -> Self {
        let mut values = vec![FxHashMap::default(); vars.len()];
        let mut nulls = vec![Vec::new(); vars.len()];
        for (id, row) in set.iter() {
            for (i, var) in vars.iter().enumerate() {
                match row.get(var) {
                    Some(term) => values[i].entry(term).or_insert_with(Vec::new).push(id),
                    None => nulls[i].push(id),
                }
            }
        }
        Self {
            vars: vars.to_vec(),
            values,
            nulls,
            len: set.len(),
        }
    }

    /// Ids that may be compatible with `row`, ascending
    fn candidates(&self, row: &Solution) -> Vec<SolutionId> {
        const EMPTY: &[SolutionId] = &[];
        let best = self
            .vars
            .iter()
            .enumerate()
            .filter_map(|(i, var)| {
                row.get(var).map(|term| {
                    let hits = self.values[i].get(term).map_or(EMPTY, Vec::as_slice);
                    (hits, self.nulls[i].as_slice())
                })
            })
            .min_by_key(|(hits, nulls)| hits.len() + nulls.len());
        match best {
            Some((hits, nulls)) => merge_sorted(hits, nulls),
            None => (0..self.len).collect(),
        }
    }

    /// Ids sharing at least one bound value with `row`, ascending
    fn exact_candidates(&self, row: &Solution) -> Vec<SolutionId> {
        let mut ids: Vec<SolutionId> = self
            .vars
            .iter()
            .enumerate()
            .filter_map(|(i, var)| row.get(var).and_then(|term| self.values[i].get(term)))
            .flatten()
            .copied()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

fn merge_sorted(a: &[SolutionId], b: &[SolutionId]) -> Vec<SolutionId> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] <= b[j] {
            out.push(a[i]);
            i += 1;
        } else {
            out.push(b[j]);
            j += 1;
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(name: &str) -> Var {
        Var::new(name)
    }

    fn iri(s: &str) -> Term {
        Term::iri(format!("http://example.org/{}", s))
    }

    fn set(vars: &[&str], rows: Vec<Solution>) -> Multiset {
        Multiset::from_rows(vars.iter().map(|n| v(n)).collect(), rows)
    }

    #[test]
    fn test_identity_is_neutral_for_join() {
        let m = set(&["x"], vec![Solution::new().with("x", iri("a"))]);
        let joined = m.join(&Multiset::Identity, Parallelism::sequential());
        assert_eq!(joined.len(), 1);
        let joined = Multiset::Identity.join(&m, Parallelism::sequential());
        assert_eq!(joined.len(), 1);
        assert!(m.join(&Multiset::Null, Parallelism::sequential()).is_null());
    }

    #[test]
    fn test_join_on_shared_variable() {
        let lhs = set(
            &["x", "y"],
            vec![
                Solution::new().with("x", iri("a")).with("y", Term::integer(1)),
                Solution::new().with("x", iri("b")).with("y", Term::integer(2)),
            ],
        );
        let rhs = set(
            &["x", "z"],
            vec![
                Solution::new().with("x", iri("a")).with("z", Term::integer(10)),
                Solution::new().with("x", iri("c")).with("z", Term::integer(30)),
            ],
        );
        let joined = lhs.join(&rhs, Parallelism::sequential());
        assert_eq!(joined.len(), 1);
        let row = joined.get(0).unwrap();
        assert_eq!(row.get(&v("z")), Some(&Term::integer(10)));
        assert_eq!(joined.vars(), &[v("x"), v("y"), v("z")]);
    }

    #[test]
    fn test_join_treats_unbound_as_wildcard() {
        let lhs = set(&["x"], vec![Solution::new().with("x", iri("a")), Solution::new()]);
        let rhs = set(&["x"], vec![Solution::new().with("x", iri("b"))]);
        let joined = lhs.join(&rhs, Parallelism::sequential());
        assert_eq!(joined.len(), 1);
        assert_eq!(joined.get(0).unwrap().get(&v("x")), Some(&iri("b")));
    }

    #[test]
    fn test_parallel_join_matches_sequential() {
        let lhs = set(
            &["x"],
            (0..50).map(|i| Solution::new().with("x", Term::integer(i % 5))).collect(),
        );
        let rhs = set(
            &["x", "y"],
            (0..5)
                .map(|i| Solution::new().with("x", Term::integer(i)).with("y", Term::integer(i * 2)))
                .collect(),
        );
        let seq = lhs.join(&rhs, Parallelism::sequential());
        let par = lhs.join(
            &rhs,
            Parallelism {
                enabled: true,
                threshold: 1,
            },
        );
        assert_eq!(seq.to_solution_set(), par.to_solution_set());
    }

    #[test]
    fn test_disjoint_join_is_product() {
        let lhs = set(&["x"], vec![Solution::new().with("x", iri("a")), Solution::new().with("x", iri("b"))]);
        let rhs = set(&["y"], vec![Solution::new().with("y", iri("c")), Solution::new().with("y", iri("d"))]);
        assert_eq!(lhs.join(&rhs, Parallelism::sequential()).len(), 4);
    }

    #[test]
    fn test_left_join_keeps_unmatched() {
        let lhs = set(&["x"], vec![Solution::new().with("x", iri("a")), Solution::new().with("x", iri("b"))]);
        let rhs = set(
            &["x", "y"],
            vec![Solution::new().with("x", iri("a")).with("y", Term::integer(1))],
        );
        let out = lhs.left_join(&rhs, Parallelism::sequential(), |_, _| true);
        assert_eq!(out.len(), 2);
        assert_eq!(out.get(0).unwrap().get(&v("y")), Some(&Term::integer(1)));
        assert_eq!(out.get(1).unwrap().get(&v("y")), None);

        let rejected = lhs.left_join(&rhs, Parallelism::sequential(), |_, _| false);
        assert_eq!(rejected.len(), 2);
        assert!(rejected.iter().all(|(_, s)| s.get(&v("y")).is_none()));
    }

    #[test]
    fn test_minus_requires_shared_binding() {
        let lhs = set(&["x"], vec![Solution::new().with("x", iri("a")), Solution::new().with("x", iri("b"))]);
        let rhs = set(&["x"], vec![Solution::new().with("x", iri("a"))]);
        let out = lhs.minus_join(&rhs);
        assert_eq!(out.len(), 1);
        assert_eq!(out.get(0).unwrap().get(&v("x")), Some(&iri("b")));

        let disjoint = set(&["y"], vec![Solution::new().with("y", iri("a"))]);
        assert_eq!(lhs.minus_join(&disjoint).len(), 2);
    }

    #[test]
    fn test_minus_removing_everything_is_null() {
        let lhs = set(&["x"], vec![Solution::new().with("x", iri("a"))]);
        assert!(lhs.minus_join(&lhs).is_null());
    }

    #[test]
    fn test_exists_join() {
        let lhs = set(&["x"], vec![Solution::new().with("x", iri("a")), Solution::new().with("x", iri("b"))]);
        let rhs = set(&["x"], vec![Solution::new().with("x", iri("b"))]);
        assert_eq!(lhs.exists_join(&rhs, true).len(), 1);
        assert_eq!(lhs.exists_join(&rhs, false).len(), 1);
        assert!(lhs.exists_join(&Multiset::Null, true).is_null());
        assert_eq!(lhs.exists_join(&Multiset::Null, false).len(), 2);
    }

    #[test]
    fn test_union_and_distinct() {
        let a = set(&["x"], vec![Solution::new().with("x", iri("a"))]);
        let b = set(&["y"], vec![Solution::new().with("y", iri("a"))]);
        let u = a.union(&b);
        assert_eq!(u.len(), 2);
        assert_eq!(u.vars(), &[v("x"), v("y")]);
        assert_eq!(a.union(&a).distinct().len(), 1);
        assert_eq!(Multiset::Null.union(&a).len(), 1);
    }

    #[test]
    fn test_identity_key_changes_on_growth() {
        let mut s = SolutionSet::new(vec![v("x")]);
        let before = Multiset::Solutions(s.clone()).identity_key();
        s.push(Solution::new().with("x", iri("a")));
        let after = Multiset::Solutions(s.clone()).identity_key();
        assert_ne!(before, after);
    }

    #[test]
    fn test_grouped_select_keeps_groups_aligned() {
        let contents = SolutionSet::from_rows(
            vec![v("x")],
            vec![
                Solution::new().with("x", iri("a")),
                Solution::new().with("x", iri("b")),
            ],
        );
        let output = SolutionSet::from_rows(
            vec![v("x")],
            vec![
                Solution::new().with("x", iri("a")),
                Solution::new().with("x", iri("b")),
            ],
        );
        let groups = vec![
            BindingGroup::new(vec![Some(iri("a"))], vec![0]),
            BindingGroup::new(vec![Some(iri("b"))], vec![1]),
        ];
        let grouped = Multiset::Grouped(GroupedSet::new(Arc::new(contents), groups, output));
        let picked = grouped.select(&[1]);
        let g = picked.as_grouped().unwrap();
        assert_eq!(g.group(0).unwrap().members(), &[1]);
        assert_eq!(picked.get(0).unwrap().get(&v("x")), Some(&iri("b")));
    }
}
