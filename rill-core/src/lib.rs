//! # Rill Core
//!
//! Shared data model for the Rill SPARQL evaluation engine.
//!
//! This crate provides:
//! - RDF terms: `Term`, `Literal`, `Triple` (also used for triple terms)
//! - XSD temporal values with timezone-aware partial ordering
//! - The read-only `Dataset` seam and an indexed `MemoryDataset`
//!
//! ## Design Principles
//!
//! 1. **Immutable terms**: terms are cheap to clone (`Arc<str>` payloads)
//! 2. **Read-only datasets**: the engine never mutates the data it queries
//! 3. **Raw node order**: `Ord` on `Term` is total and consistent with term equality
//!
//! ## Example
//!
//! ```
//! use rill_core::{Dataset, GraphName, MemoryDataset, Term, Triple};
//!
//! let mut ds = MemoryDataset::new();
//! let s = Term::iri("http://example.org/a");
//! let p = Term::iri("http://example.org/p");
//! ds.insert(Triple::new(s.clone(), p, Term::integer(1)));
//! assert_eq!(ds.find(&GraphName::Default, Some(&s), None, None).unwrap().count(), 1);
//! ```

pub mod dataset;
pub mod error;
pub mod temporal;
pub mod term;

pub use dataset::{Dataset, GraphName, MemoryDataset, TripleIter};
pub use error::{Error, Result};
pub use temporal::{Date, DateTime};
pub use term::{canonical_double, Literal, NodeKind, Term, Triple};
