//! String function implementations
//!
//! Implements STRLEN, SUBSTR, UCASE, LCASE, STRSTARTS, STRENDS, CONTAINS,
//! STRBEFORE, STRAFTER, ENCODE_FOR_URI, CONCAT, REPLACE and REGEX.
//! Results keep the language tag or datatype of the first argument where
//! SPARQL says so.

use super::helpers::{build_regex_with_flags, check_compatible, literal_like, numeric_arg, plain_string, string_literal};
use crate::error::{ExprResult, ExpressionError};
use crate::value::ValuedNode;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rill_core::Term;
use rill_vocab::xsd;

/// Characters ENCODE_FOR_URI leaves alone (RFC 3986 unreserved)
const URI_UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub fn strlen(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    let lit = string_literal(arg, "STRLEN")?;
    Ok(ValuedNode::integer(lit.lexical().chars().count() as i64))
}

/// SUBSTR with 1-based, rounded start and optional length
pub fn substr(
    source: &ValuedNode,
    start: &ValuedNode,
    length: Option<&ValuedNode>,
) -> ExprResult<ValuedNode> {
    let lit = string_literal(source, "SUBSTR")?;
    let start = round_half_up(numeric_arg(start, "SUBSTR")?);
    let end = match length {
        Some(len) => start + round_half_up(numeric_arg(len, "SUBSTR")?),
        None => f64::INFINITY,
    };
    if start.is_nan() || end.is_nan() {
        return Ok(ValuedNode::new(literal_like(lit, "")));
    }
    let out: String = lit
        .lexical()
        .chars()
        .enumerate()
        .filter(|(i, _)| {
            let pos = (*i + 1) as f64;
            pos >= start && pos < end
        })
        .map(|(_, c)| c)
        .collect();
    Ok(ValuedNode::new(literal_like(lit, out)))
}

fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

pub fn ucase(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    let lit = string_literal(arg, "UCASE")?;
    Ok(ValuedNode::new(literal_like(lit, lit.lexical().to_uppercase())))
}

pub fn lcase(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    let lit = string_literal(arg, "LCASE")?;
    Ok(ValuedNode::new(literal_like(lit, lit.lexical().to_lowercase())))
}

fn string_pair<'n>(
    a: &'n ValuedNode,
    b: &'n ValuedNode,
    function: &'static str,
) -> ExprResult<(&'n rill_core::Literal, &'n rill_core::Literal)> {
    let (x, y) = (string_literal(a, function)?, string_literal(b, function)?);
    check_compatible(x, y, function)?;
    Ok((x, y))
}

pub fn strstarts(a: &ValuedNode, b: &ValuedNode) -> ExprResult<ValuedNode> {
    let (x, y) = string_pair(a, b, "STRSTARTS")?;
    Ok(ValuedNode::boolean(x.lexical().starts_with(y.lexical())))
}

pub fn strends(a: &ValuedNode, b: &ValuedNode) -> ExprResult<ValuedNode> {
    let (x, y) = string_pair(a, b, "STRENDS")?;
    Ok(ValuedNode::boolean(x.lexical().ends_with(y.lexical())))
}

pub fn contains(a: &ValuedNode, b: &ValuedNode) -> ExprResult<ValuedNode> {
    let (x, y) = string_pair(a, b, "CONTAINS")?;
    Ok(ValuedNode::boolean(x.lexical().contains(y.lexical())))
}

/// No match gives the empty simple literal; otherwise the result keeps the
/// first argument's tag or datatype
pub fn strbefore(a: &ValuedNode, b: &ValuedNode) -> ExprResult<ValuedNode> {
    let (x, y) = string_pair(a, b, "STRBEFORE")?;
    match x.lexical().find(y.lexical()) {
        Some(pos) => Ok(ValuedNode::new(literal_like(x, &x.lexical()[..pos]))),
        None => Ok(ValuedNode::string("")),
    }
}

pub fn strafter(a: &ValuedNode, b: &ValuedNode) -> ExprResult<ValuedNode> {
    let (x, y) = string_pair(a, b, "STRAFTER")?;
    match x.lexical().find(y.lexical()) {
        Some(pos) => Ok(ValuedNode::new(literal_like(
            x,
            &x.lexical()[pos + y.lexical().len()..],
        ))),
        None => Ok(ValuedNode::string("")),
    }
}

pub fn encode_for_uri(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    let lit = string_literal(arg, "ENCODE_FOR_URI")?;
    let encoded = utf8_percent_encode(lit.lexical(), URI_UNRESERVED).to_string();
    Ok(ValuedNode::string(encoded))
}

/// CONCAT keeps a shared language tag, or `xsd:string` when every argument
/// is typed; otherwise the result is a simple literal
pub fn concat(args: &[ValuedNode]) -> ExprResult<ValuedNode> {
    let lits = args
        .iter()
        .map(|a| string_literal(a, "CONCAT"))
        .collect::<ExprResult<Vec<_>>>()?;
    let text: String = lits.iter().map(|l| l.lexical()).collect();
    let shared_lang = lits
        .first()
        .and_then(|first| first.language())
        .filter(|lang| lits.iter().all(|l| l.language() == Some(*lang)));
    Ok(match shared_lang {
        Some(lang) => ValuedNode::new(Term::lang_string(text, lang)),
        None => ValuedNode::new(Term::typed(text, xsd::STRING)),
    })
}

pub fn replace(
    source: &ValuedNode,
    pattern: &ValuedNode,
    replacement: &ValuedNode,
    flags: Option<&ValuedNode>,
) -> ExprResult<ValuedNode> {
    let lit = string_literal(source, "REPLACE")?;
    let pattern = plain_string(pattern, "REPLACE")?;
    let replacement = plain_string(replacement, "REPLACE")?;
    let flags = match flags {
        Some(f) => plain_string(f, "REPLACE")?,
        None => "",
    };
    let re = build_regex_with_flags(pattern, flags)?;
    if re.is_match("") {
        return Err(ExpressionError::invalid_argument(
            "REPLACE",
            "pattern matches the empty string",
        ));
    }
    let out = re.replace_all(lit.lexical(), replacement).into_owned();
    Ok(ValuedNode::new(literal_like(lit, out)))
}

pub fn regex(text: &ValuedNode, pattern: &ValuedNode, flags: Option<&ValuedNode>) -> ExprResult<ValuedNode> {
    let lit = string_literal(text, "REGEX")?;
    let pattern = plain_string(pattern, "REGEX")?;
    let flags = match flags {
        Some(f) => plain_string(f, "REGEX")?,
        None => "",
    };
    let re = build_regex_with_flags(pattern, flags)?;
    Ok(ValuedNode::boolean(re.is_match(lit.lexical())))
}
