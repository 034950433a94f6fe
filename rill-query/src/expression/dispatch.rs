//! Function dispatch - routes Function to specialized implementations
//!
//! BOUND, IF and COALESCE see their unevaluated arguments; every other
//! function receives values, and the first argument error is the result.

use super::eval::eval_args;
use super::helpers::{check_arity, check_arity_range};
use super::{cast, conditional, datetime, hash, math, numeric, rdf, string, uuid};
use crate::algebra::{Expression, Function};
use crate::context::EvaluationContext;
use crate::error::{ExprResult, ExpressionError};
use crate::multiset::{Multiset, SolutionId};
use crate::value::ValuedNode;

pub(super) fn call(
    function: Function,
    args: &[Expression],
    ctx: &EvaluationContext<'_>,
    source: &Multiset,
    id: SolutionId,
) -> ExprResult<ValuedNode> {
    match function {
        Function::Bound => return conditional::bound(args, source, id),
        Function::If => return conditional::if_then_else(args, ctx, source, id),
        Function::Coalesce => return conditional::coalesce(args, ctx, source, id),
        _ => {}
    }

    check_function_arity(function, args)?;
    let v = eval_args(args, ctx, source, id)?;
    let opt = |i: usize| v.get(i);

    match function {
        Function::SameTerm => Ok(rdf::same_term(&v[0], &v[1])),
        Function::IsIri => Ok(rdf::is_iri(&v[0])),
        Function::IsBlank => Ok(rdf::is_blank(&v[0])),
        Function::IsLiteral => Ok(rdf::is_literal(&v[0])),
        Function::IsNumeric => Ok(rdf::is_numeric(&v[0])),
        Function::IsTriple => Ok(rdf::is_triple(&v[0])),

        Function::Str => rdf::str(&v[0]),
        Function::Lang => rdf::lang(&v[0]),
        Function::LangMatches => rdf::lang_matches(&v[0], &v[1]),
        Function::Datatype => rdf::datatype(&v[0]),
        Function::Iri => rdf::iri(&v[0]),
        Function::Bnode => rdf::bnode(opt(0), ctx, source.identity_key().0, id),
        Function::StrDt => rdf::strdt(&v[0], &v[1]),
        Function::StrLang => rdf::strlang(&v[0], &v[1]),
        Function::Uuid => Ok(uuid::uuid()),
        Function::StrUuid => Ok(uuid::struuid()),

        Function::StrLen => string::strlen(&v[0]),
        Function::SubStr => string::substr(&v[0], &v[1], opt(2)),
        Function::UCase => string::ucase(&v[0]),
        Function::LCase => string::lcase(&v[0]),
        Function::StrStarts => string::strstarts(&v[0], &v[1]),
        Function::StrEnds => string::strends(&v[0], &v[1]),
        Function::Contains => string::contains(&v[0], &v[1]),
        Function::StrBefore => string::strbefore(&v[0], &v[1]),
        Function::StrAfter => string::strafter(&v[0], &v[1]),
        Function::EncodeForUri => string::encode_for_uri(&v[0]),
        Function::Concat => string::concat(&v),
        Function::Replace => string::replace(&v[0], &v[1], &v[2], opt(3)),
        Function::Regex => string::regex(&v[0], &v[1], opt(2)),

        Function::Abs => numeric::abs(&v[0]),
        Function::Round => numeric::round(&v[0]),
        Function::Ceil => numeric::ceil(&v[0]),
        Function::Floor => numeric::floor(&v[0]),

        Function::Now => Ok(datetime::now(ctx)),
        Function::Year => datetime::year(&v[0]),
        Function::Month => datetime::month(&v[0]),
        Function::Day => datetime::day(&v[0]),
        Function::Hours => datetime::hours(&v[0]),
        Function::Minutes => datetime::minutes(&v[0]),
        Function::Seconds => datetime::seconds(&v[0]),
        Function::Timezone => datetime::timezone(&v[0]),
        Function::Tz => datetime::tz(&v[0]),

        Function::Md5 => hash::md5(&v[0]),
        Function::Sha1 => hash::sha1(&v[0]),
        Function::Sha256 => hash::sha256(&v[0]),
        Function::Sha384 => hash::sha384(&v[0]),
        Function::Sha512 => hash::sha512(&v[0]),

        Function::Triple => rdf::triple(&v[0], &v[1], &v[2]),
        Function::Subject => rdf::triple_component(&v[0], 0, "SUBJECT"),
        Function::Predicate => rdf::triple_component(&v[0], 1, "PREDICATE"),
        Function::Object => rdf::triple_component(&v[0], 2, "OBJECT"),

        Function::Trig(trig, inverse) => math::trig(&v[0], trig, inverse, function.name()),
        Function::DegreesToRadians => math::degrees_to_radians(&v[0]),
        Function::RadiansToDegrees => math::radians_to_degrees(&v[0]),
        Function::Log => math::log(&v[0], opt(1)),
        Function::Ln => math::ln(&v[0]),
        Function::Exp => math::exp(&v[0]),
        Function::Ten => math::ten(&v[0]),
        Function::Pow => math::pow(&v[0], opt(1)),
        Function::Square => math::square(&v[0]),
        Function::Cube => math::cube(&v[0]),
        Function::Sqrt => math::sqrt(&v[0]),
        Function::Root => math::root(&v[0], opt(1)),
        Function::Pythagoras => math::pythagoras(&v[0], &v[1]),
        Function::Cartesian => math::cartesian(&v),
        Function::Factorial => math::factorial(&v[0]),
        Function::Reciprocal => math::reciprocal(&v[0]),
        Function::RandomIn => math::random_in(&v),

        Function::Cast(target) => cast::cast(&v[0], target),

        Function::Bound | Function::If | Function::Coalesce => unreachable!("handled above"),
    }
}

fn check_function_arity(function: Function, args: &[Expression]) -> ExprResult<()> {
    let name = function.name();
    match function {
        Function::Uuid | Function::StrUuid | Function::Now => check_arity(args, 0, name),
        Function::Bnode => check_arity_range(args, 0, 1, name),
        Function::Log | Function::Pow | Function::Root => check_arity_range(args, 1, 2, name),
        Function::RandomIn => check_arity_range(args, 0, 2, name),
        Function::Cartesian => match args.len() {
            4 | 6 => Ok(()),
            _ => Err(ExpressionError::invalid_argument(name, "requires 4 or 6 arguments")),
        },
        Function::Concat => Ok(()),
        Function::SubStr | Function::Regex => check_arity_range(args, 2, 3, name),
        Function::Replace => check_arity_range(args, 3, 4, name),
        Function::SameTerm
        | Function::LangMatches
        | Function::StrDt
        | Function::StrLang
        | Function::StrStarts
        | Function::StrEnds
        | Function::Contains
        | Function::StrBefore
        | Function::StrAfter
        | Function::Pythagoras => check_arity(args, 2, name),
        Function::Triple => check_arity(args, 3, name),
        _ => check_arity(args, 1, name),
    }
}
