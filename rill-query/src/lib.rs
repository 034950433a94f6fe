//! # Rill Query
//!
//! SPARQL 1.1 evaluation engine: takes a parsed algebra tree and a read-only
//! dataset and computes the solution multiset (or boolean) that satisfies it.
//!
//! This crate provides:
//! - The multiset model: `Solution`, `SolutionSet`, `GroupedSet`, `Multiset`
//! - `ValuedNode`: RDF terms with a memoized typed view and numeric ladder
//! - Relational and ordering comparers with configurable string collation
//! - Expression and aggregate evaluation
//! - The recursive algebra processor, property paths and SERVICE fan-out
//! - Results handlers and an optimiser pass hook
//!
//! ## Design Principles
//!
//! 1. **Closed operator set**: exhaustive matching, with one extension seam
//!    each for operators and functions
//! 2. **Row-level errors stay local**: FILTER drops the row, BIND leaves the
//!    variable unbound, aggregates apply their own policy
//! 3. **Cooperative timeout**: checked at every operator boundary and every
//!    triple scanned
//!
//! ## Example
//!
//! ```
//! use rill_core::{MemoryDataset, Term, Triple};
//! use rill_query::{execute_query, Algebra, PatternTerm, PreparedQuery, QueryOptions, TriplePattern};
//!
//! let mut ds = MemoryDataset::new();
//! ds.insert(Triple::new(
//!     Term::iri("http://example.org/a"),
//!     Term::iri("http://example.org/p"),
//!     Term::integer(1),
//! ));
//! let bgp = Algebra::bgp(vec![TriplePattern::new(
//!     PatternTerm::var("s"),
//!     Term::iri("http://example.org/p"),
//!     PatternTerm::var("o"),
//! )]);
//! let result = execute_query(&ds, &PreparedQuery::select(bgp), &QueryOptions::default()).unwrap();
//! assert_eq!(result.as_solutions().map(|s| s.len()), Some(1));
//! ```

pub mod aggregate;
pub mod algebra;
pub mod compare;
pub mod context;
pub mod error;
pub mod execute;
pub mod expression;
pub mod multiset;
pub mod optimise;
pub mod options;
pub mod processor;
mod property_path;
pub mod results;
pub mod service;
pub mod value;
pub mod var;

pub use algebra::{
    Aggregate, AggregateArg, AggregateFunction, Algebra, ArithmeticOp, CastTarget, CompareOp,
    ExprId, Expression, ExtensionFunction, ExtensionOperator, Function, GroupKey, OrderCondition,
    PatternTerm, PropertyPath, Trig, TriplePattern,
};
pub use compare::{Collation, OrderingComparer, RelationalComparer, StringComparer};
pub use context::{EvaluationContext, QueryTimer};
pub use error::{ComparisonError, ExprResult, ExpressionError, QueryError, Result, TimeoutError};
pub use execute::{execute_query, PreparedQuery, QueryExecutor, QueryForm};
pub use multiset::{BindingGroup, GroupedSet, Multiset, Parallelism, Solution, SolutionId, SolutionSet};
pub use optimise::{optimise, AlgebraOptimiser, JoinIdentityElimination};
pub use options::{DatasetScope, FederationOptions, QueryOptions};
pub use results::{CollectingHandler, Flow, QueryResult, ResultsHandler};
pub use service::{ServiceClient, ServiceError, ServicePool, ServiceRequest};
pub use value::{NumericType, TypedValue, ValuedNode};
pub use var::Var;
