//! Shared helpers for function evaluation
//!
//! Contains arity checks, SPARQL string-argument rules and regex caching.

use crate::algebra::Expression;
use crate::error::{ExprResult, ExpressionError};
use crate::value::ValuedNode;
use lru::LruCache;
use regex::{Regex, RegexBuilder};
use rill_core::{Literal, Term};
use std::cell::RefCell;
use std::num::NonZeroUsize;

// Compiled regexes keyed by (pattern, flags). Patterns are usually constant
// across a query, so this avoids recompiling per row.
thread_local! {
    static REGEX_CACHE: RefCell<LruCache<(String, String), Regex>> =
        RefCell::new(LruCache::new(NonZeroUsize::new(32).unwrap_or(NonZeroUsize::MIN)));
}

/// Build a regex with XPath flags (cached)
///
/// Supported flags: i, m, s, x. Unknown flags are an error.
pub fn build_regex_with_flags(pattern: &str, flags: &str) -> ExprResult<Regex> {
    let cache_key = (pattern.to_string(), flags.to_string());
    let cached = REGEX_CACHE.with(|cache| cache.borrow_mut().get(&cache_key).cloned());
    if let Some(re) = cached {
        return Ok(re);
    }

    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'x' => {
                builder.ignore_whitespace(true);
            }
            c => {
                return Err(ExpressionError::invalid_argument(
                    "REGEX",
                    format!("unknown regex flag '{}'", c),
                ))
            }
        }
    }
    let re = builder
        .build()
        .map_err(|e| ExpressionError::invalid_argument("REGEX", format!("invalid regex: {}", e)))?;

    REGEX_CACHE.with(|cache| {
        cache.borrow_mut().put(cache_key, re.clone());
    });
    Ok(re)
}

#[inline]
pub fn check_arity(args: &[Expression], expected: usize, function: &'static str) -> ExprResult<()> {
    if args.len() != expected {
        Err(ExpressionError::invalid_argument(
            function,
            format!(
                "requires exactly {} argument{}",
                expected,
                if expected == 1 { "" } else { "s" }
            ),
        ))
    } else {
        Ok(())
    }
}

#[inline]
pub fn check_arity_range(
    args: &[Expression],
    min: usize,
    max: usize,
    function: &'static str,
) -> ExprResult<()> {
    if args.len() < min || args.len() > max {
        Err(ExpressionError::invalid_argument(
            function,
            format!("requires {} to {} arguments", min, max),
        ))
    } else {
        Ok(())
    }
}

/// String literal argument: simple, `xsd:string` or language-tagged
pub fn string_literal<'n>(node: &'n ValuedNode, function: &'static str) -> ExprResult<&'n Literal> {
    match node.as_literal() {
        Some(lit) if lit.is_string() => Ok(lit),
        _ => Err(ExpressionError::type_mismatch(
            function,
            format!("{} is not a string literal", node.term()),
        )),
    }
}

/// Simple literal or `xsd:string` (no language tag)
pub fn plain_string<'n>(node: &'n ValuedNode, function: &'static str) -> ExprResult<&'n str> {
    match node.as_literal() {
        Some(lit) if lit.is_string() && lit.language().is_none() => Ok(lit.lexical()),
        _ => Err(ExpressionError::type_mismatch(
            function,
            format!("{} is not a simple literal", node.term()),
        )),
    }
}

/// Argument compatibility for two-argument string functions: the second
/// argument must be plain or carry the same language tag as the first
pub fn check_compatible(a: &Literal, b: &Literal, function: &'static str) -> ExprResult<()> {
    match (a.language(), b.language()) {
        (_, None) => Ok(()),
        (Some(x), Some(y)) if x == y => Ok(()),
        _ => Err(ExpressionError::type_mismatch(
            function,
            "incompatible language tags",
        )),
    }
}

/// New literal carrying the language tag or datatype of `like`
pub fn literal_like(like: &Literal, lexical: impl Into<std::sync::Arc<str>>) -> Term {
    match like.language() {
        Some(lang) => Term::lang_string(lexical, lang),
        None => Term::typed(lexical, like.datatype()),
    }
}

/// Numeric argument as f64 (SUBSTR positions)
pub fn numeric_arg(node: &ValuedNode, function: &'static str) -> ExprResult<f64> {
    if !node.is_numeric() {
        return Err(ExpressionError::type_mismatch(
            function,
            format!("{} is not numeric", node.term()),
        ));
    }
    node.as_double()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_flags() {
        let re = build_regex_with_flags("^abc$", "i").unwrap();
        assert!(re.is_match("ABC"));
        assert!(build_regex_with_flags("a", "q").is_err());
        assert!(build_regex_with_flags("(", "").is_err());
    }

    #[test]
    fn test_language_compatibility() {
        let en = Literal::lang_string("a", "en");
        let fr = Literal::lang_string("a", "fr");
        let plain = Literal::string("a");
        assert!(check_compatible(&en, &plain, "CONTAINS").is_ok());
        assert!(check_compatible(&en, &en.clone(), "CONTAINS").is_ok());
        assert!(check_compatible(&en, &fr, "CONTAINS").is_err());
        assert!(check_compatible(&plain, &en, "CONTAINS").is_err());
    }
}
