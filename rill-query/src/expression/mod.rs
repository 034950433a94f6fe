//! Expression evaluation
//!
//! Evaluates [`Expression`] trees against one solution of a multiset,
//! producing a [`ValuedNode`] or a row-level [`ExpressionError`].
//!
//! # Module Structure
//!
//! - `eval`: core recursive evaluation
//! - `dispatch`: built-in function dispatcher
//! - `helpers`: arity checks, string argument rules, regex caching
//! - `exists`: cached EXISTS / NOT EXISTS
//! - Category submodules: `arithmetic`, `logical`, `compare`, `conditional`,
//!   `rdf`, `string`, `numeric`, `math`, `datetime`, `hash`, `uuid`, `cast`
//!
//! [`ExpressionError`]: crate::error::ExpressionError

mod arithmetic;
mod cast;
mod compare;
mod conditional;
mod datetime;
mod dispatch;
mod eval;
mod exists;
mod hash;
mod helpers;
mod logical;
mod math;
mod numeric;
mod rdf;
mod string;
mod uuid;

pub use arithmetic::{add, divide, multiply, negate, subtract};

use crate::algebra::Expression;
use crate::context::EvaluationContext;
use crate::error::ExprResult;
use crate::multiset::{Multiset, SolutionId};
use crate::value::ValuedNode;

impl Expression {
    /// Evaluate against solution `id` of the context's current input
    pub fn evaluate(&self, ctx: &EvaluationContext<'_>, id: SolutionId) -> ExprResult<ValuedNode> {
        eval::eval(self, ctx, ctx.input(), id)
    }

    /// Evaluate against solution `id` of `source`
    pub fn evaluate_in(
        &self,
        ctx: &EvaluationContext<'_>,
        source: &Multiset,
        id: SolutionId,
    ) -> ExprResult<ValuedNode> {
        eval::eval(self, ctx, source, id)
    }

    /// Effective boolean value of the expression for solution `id`
    pub fn evaluate_bool(
        &self,
        ctx: &EvaluationContext<'_>,
        source: &Multiset,
        id: SolutionId,
    ) -> ExprResult<bool> {
        eval::eval(self, ctx, source, id)?.effective_boolean_value()
    }
}
