//! Value comparison for SPARQL operators and ORDER BY
//!
//! Two services share numeric promotion and date/time normalization but
//! differ in failure policy:
//!
//! - [`RelationalComparer`] backs `<`, `<=`, `>`, `>=` and `=`. It declines
//!   (`None`) whenever SPARQL defines no ordering between its operands.
//! - [`OrderingComparer`] backs ORDER BY, MIN and MAX. It is total and never
//!   fails: unbound sorts lowest, then blank nodes, IRIs, literals and triple
//!   terms. Literals order as strings, then numerics, then everything else
//!   grouped by datatype.
//!
//! String comparison goes through a [`StringComparer`] built from the
//! configured [`Collation`] and case and accent sensitivity.

use crate::error::{ExprResult, ExpressionError};
use crate::value::{NumericType, ValuedNode};
use rill_core::{NodeKind, Term};
use rill_vocab::xsd;
use serde::Deserialize;
use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// String collation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Collation {
    /// Code point order
    #[default]
    Ordinal,
    /// Case-insensitive primary order; lowercase before uppercase on ties
    Invariant,
}

/// Configured string comparison
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StringComparer {
    pub collation: Collation,
    pub ignore_case: bool,
    /// Compare base characters only: NFD with combining marks removed
    pub ignore_accents: bool,
}

impl StringComparer {
    pub fn new(collation: Collation, ignore_case: bool) -> Self {
        Self {
            collation,
            ignore_case,
            ignore_accents: false,
        }
    }

    pub fn with_ignore_accents(mut self, ignore_accents: bool) -> Self {
        self.ignore_accents = ignore_accents;
        self
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        if self.ignore_accents {
            self.compare_folded(&strip_accents(a), &strip_accents(b))
        } else {
            self.compare_folded(a, b)
        }
    }

    fn compare_folded(&self, a: &str, b: &str) -> Ordering {
        match (self.collation, self.ignore_case) {
            (Collation::Ordinal, false) => a.cmp(b),
            (_, true) => a.to_lowercase().cmp(&b.to_lowercase()),
            (Collation::Invariant, false) => a
                .to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| b.cmp(a)),
        }
    }
}

fn strip_accents(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Comparer for the relational operators
#[derive(Clone, Copy, Debug, Default)]
pub struct RelationalComparer {
    strings: StringComparer,
}

impl RelationalComparer {
    pub fn new(strings: StringComparer) -> Self {
        Self { strings }
    }

    /// Semantic comparison, `None` when the operands have no defined order
    pub fn try_compare(&self, x: &ValuedNode, y: &ValuedNode) -> Option<Ordering> {
        let (tx, ty) = (x.term(), y.term());
        if tx.kind() != ty.kind() {
            return None;
        }
        match (tx, ty) {
            (Term::Iri(_), Term::Iri(_)) | (Term::BlankNode(_), Term::BlankNode(_)) => {
                (tx == ty).then_some(Ordering::Equal)
            }
            (Term::Triple(a), Term::Triple(b)) => {
                let pairs = [
                    (&a.subject, &b.subject),
                    (&a.predicate, &b.predicate),
                    (&a.object, &b.object),
                ];
                for (l, r) in pairs {
                    let ord = self.try_compare(&ValuedNode::new(l.clone()), &ValuedNode::new(r.clone()))?;
                    if ord != Ordering::Equal {
                        return Some(ord);
                    }
                }
                Some(Ordering::Equal)
            }
            (Term::Literal(lx), Term::Literal(ly)) => {
                let same_term = || (tx == ty).then_some(Ordering::Equal);
                let (Some(dx), Some(dy)) = (
                    xsd::supported_datatype(lx.datatype()),
                    xsd::supported_datatype(ly.datatype()),
                ) else {
                    return same_term();
                };

                match (dx == xsd::STRING, dy == xsd::STRING) {
                    (true, true) => {
                        if lx.language() != ly.language() {
                            return None;
                        }
                        return Some(self.strings.compare(lx.lexical(), ly.lexical()));
                    }
                    (true, false) | (false, true) => return None,
                    (false, false) => {}
                }

                match (xsd::is_numeric_datatype(dx), xsd::is_numeric_datatype(dy)) {
                    (true, true) => {
                        return compare_numeric(x, y).or_else(same_term);
                    }
                    (true, false) | (false, true) => return None,
                    (false, false) => {}
                }

                match xsd::compatible_datatype(dx, dy)? {
                    xsd::DATE_TIME => match (x.as_datetime(), y.as_datetime()) {
                        (Ok(a), Ok(b)) => a.compare(&b),
                        _ => same_term(),
                    },
                    xsd::DATE => match (x.as_date(), y.as_date()) {
                        (Ok(a), Ok(b)) => Some(a.compare(&b)),
                        _ => same_term(),
                    },
                    xsd::BOOLEAN => match (x.as_boolean(), y.as_boolean()) {
                        (Ok(a), Ok(b)) => Some(a.cmp(&b)),
                        _ => same_term(),
                    },
                    _ => same_term(),
                }
            }
            _ => None,
        }
    }

    /// `try_compare` surfacing a type error for `operator`
    pub fn compare(&self, operator: &'static str, x: &ValuedNode, y: &ValuedNode) -> ExprResult<Ordering> {
        self.try_compare(x, y).ok_or_else(|| {
            crate::error::ComparisonError::incomparable(operator, x.term(), y.term()).into()
        })
    }

    /// SPARQL `=`
    ///
    /// Equal terms are always equal. Otherwise a decided comparison wins;
    /// undecidable pairs of known, compatible datatypes (such as dateTimes
    /// with and without timezone) and literals of unknown datatype are errors;
    /// everything else is simply unequal.
    pub fn equals(&self, x: &ValuedNode, y: &ValuedNode) -> ExprResult<bool> {
        if let Some(ord) = self.try_compare(x, y) {
            return Ok(ord == Ordering::Equal);
        }
        if x.term() == y.term() {
            return Ok(true);
        }
        if let (Some(lx), Some(ly)) = (x.as_literal(), y.as_literal()) {
            let (dx, dy) = (
                xsd::supported_datatype(lx.datatype()),
                xsd::supported_datatype(ly.datatype()),
            );
            let undecidable = match (dx, dy) {
                (None, _) | (_, None) => true,
                (Some(a), Some(b)) => {
                    xsd::compatible_datatype(a, b).is_some()
                        && a != xsd::STRING
                        && x.typed().is_ok()
                        && y.typed().is_ok()
                }
            };
            if undecidable {
                return Err(ExpressionError::type_mismatch(
                    "=",
                    format!("cannot decide equality of {} and {}", x.term(), y.term()),
                ));
            }
        }
        Ok(false)
    }
}

/// Numeric comparison at the least common type
fn compare_numeric(x: &ValuedNode, y: &ValuedNode) -> Option<Ordering> {
    let (nx, ny) = (x.numeric_type(), y.numeric_type());
    if !nx.is_numeric() || !ny.is_numeric() {
        return None;
    }
    match nx.promote(ny) {
        NumericType::Integer => Some(x.as_integer().ok()?.cmp(&y.as_integer().ok()?)),
        NumericType::Decimal => Some(x.as_decimal().ok()?.cmp(&y.as_decimal().ok()?)),
        NumericType::Float => x.as_float().ok()?.partial_cmp(&y.as_float().ok()?),
        NumericType::Double => x.as_double().ok()?.partial_cmp(&y.as_double().ok()?),
        NumericType::NaN => None,
    }
}

/// Total order for ORDER BY, MIN and MAX
#[derive(Clone, Copy, Debug, Default)]
pub struct OrderingComparer {
    relational: RelationalComparer,
    strings: StringComparer,
}

/// Literal categories in sort order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum LiteralClass {
    String,
    Numeric,
    Other,
}

impl OrderingComparer {
    pub fn new(strings: StringComparer) -> Self {
        Self {
            relational: RelationalComparer::new(strings),
            strings,
        }
    }

    /// Compare two possibly-unbound values; never fails
    pub fn compare(&self, x: Option<&ValuedNode>, y: Option<&ValuedNode>) -> Ordering {
        match (x, y) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => self.compare_nodes(x, y),
        }
    }

    pub fn compare_nodes(&self, x: &ValuedNode, y: &ValuedNode) -> Ordering {
        let (tx, ty) = (x.term(), y.term());
        if tx.kind() != ty.kind() {
            return tx.kind().cmp(&ty.kind());
        }
        match tx.kind() {
            NodeKind::Literal => self.compare_literals(x, y),
            NodeKind::Triple => match (tx.as_triple(), ty.as_triple()) {
                (Some(a), Some(b)) => self
                    .compare_terms(&a.subject, &b.subject)
                    .then_with(|| self.compare_terms(&a.predicate, &b.predicate))
                    .then_with(|| self.compare_terms(&a.object, &b.object)),
                _ => tx.cmp(ty),
            },
            NodeKind::Iri | NodeKind::BlankNode => tx.cmp(ty),
        }
    }

    pub fn compare_terms(&self, x: &Term, y: &Term) -> Ordering {
        self.compare_nodes(&ValuedNode::new(x.clone()), &ValuedNode::new(y.clone()))
    }

    fn compare_literals(&self, x: &ValuedNode, y: &ValuedNode) -> Ordering {
        let (Some(lx), Some(ly)) = (x.as_literal(), y.as_literal()) else {
            return x.term().cmp(y.term());
        };
        let (cx, cy) = (classify(lx.datatype()), classify(ly.datatype()));
        if cx != cy {
            return cx.cmp(&cy);
        }
        let primary = match cx {
            LiteralClass::String => self.strings.compare(lx.lexical(), ly.lexical()),
            LiteralClass::Numeric => {
                valued_first(has_numeric_value(x), has_numeric_value(y), || {
                    compare_numeric(x, y).unwrap_or(Ordering::Equal)
                })
            }
            LiteralClass::Other => lx.datatype().cmp(ly.datatype()).then_with(|| {
                valued_first(x.typed().is_ok(), y.typed().is_ok(), || {
                    match (x.as_datetime(), y.as_datetime()) {
                        (Ok(a), Ok(b)) => a.total_cmp(&b),
                        _ => self.relational.try_compare(x, y).unwrap_or(Ordering::Equal),
                    }
                })
            }),
        };
        primary.then_with(|| x.term().cmp(y.term()))
    }
}

/// Values with a usable typed view sort by value ahead of ill-typed ones
fn valued_first(x: bool, y: bool, by_value: impl FnOnce() -> Ordering) -> Ordering {
    match (x, y) {
        (true, true) => by_value(),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => Ordering::Equal,
    }
}

/// Numeric literal with an orderable value: parses and is not NaN
fn has_numeric_value(x: &ValuedNode) -> bool {
    match x.numeric_type() {
        NumericType::Integer | NumericType::Decimal => true,
        NumericType::Float => x.as_float().map_or(false, |f| !f.is_nan()),
        NumericType::Double => x.as_double().map_or(false, |d| !d.is_nan()),
        NumericType::NaN => false,
    }
}

fn classify(datatype: &str) -> LiteralClass {
    if xsd::is_string_like(datatype) {
        LiteralClass::String
    } else if xsd::is_numeric_datatype(datatype) {
        LiteralClass::Numeric
    } else {
        LiteralClass::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_core::Literal;

    fn node(term: Term) -> ValuedNode {
        ValuedNode::new(term)
    }

    fn rel() -> RelationalComparer {
        RelationalComparer::default()
    }

    #[test]
    fn test_numeric_promotion() {
        let a = node(Term::integer(1));
        let b = node(Term::typed("1.5", xsd::DECIMAL));
        assert_eq!(rel().try_compare(&a, &b), Some(Ordering::Less));
        let c = node(Term::double(1.0));
        assert_eq!(rel().try_compare(&a, &c), Some(Ordering::Equal));
    }

    #[test]
    fn test_incompatible_datatypes_decline() {
        let s = node(Term::string("true"));
        let b = node(Term::boolean(true));
        assert_eq!(rel().try_compare(&s, &b), None);
        let i = node(Term::iri("http://example.org/a"));
        assert_eq!(rel().try_compare(&i, &s), None);
    }

    #[test]
    fn test_iris_compare_for_equality_only() {
        let a = node(Term::iri("http://example.org/a"));
        let b = node(Term::iri("http://example.org/b"));
        assert_eq!(rel().try_compare(&a, &a.clone()), Some(Ordering::Equal));
        assert_eq!(rel().try_compare(&a, &b), None);
    }

    #[test]
    fn test_datetime_timezone_mismatch_is_incomparable() {
        let a = node(Term::typed("2024-01-01T00:00:00Z", xsd::DATE_TIME));
        let b = node(Term::typed("2024-01-01T00:00:00", xsd::DATE_TIME));
        assert_eq!(rel().try_compare(&a, &b), None);
        assert!(rel().equals(&a, &b).is_err());

        let c = node(Term::typed("2024-01-01T01:00:00+01:00", xsd::DATE_TIME));
        assert_eq!(rel().try_compare(&a, &c), Some(Ordering::Equal));
    }

    #[test]
    fn test_date_against_datetime() {
        let d = node(Term::typed("2024-01-02", xsd::DATE));
        let dt = node(Term::typed("2024-01-01T12:00:00", xsd::DATE_TIME));
        assert_eq!(rel().try_compare(&d, &dt), Some(Ordering::Greater));
    }

    #[test]
    fn test_triple_terms_short_circuit() {
        let s = Term::iri("http://example.org/s");
        let p = Term::iri("http://example.org/p");
        let a = node(Term::triple(s.clone(), p.clone(), Term::integer(1)));
        let b = node(Term::triple(s, p, Term::integer(2)));
        assert_eq!(rel().try_compare(&a, &b), Some(Ordering::Less));
    }

    #[test]
    fn test_equality_across_types() {
        let one = node(Term::integer(1));
        let s = node(Term::string("1"));
        assert_eq!(rel().equals(&one, &s), Ok(false));
        let unknown = node(Term::typed("x", "http://example.org/dt"));
        let other = node(Term::typed("y", "http://example.org/dt"));
        assert!(rel().equals(&unknown, &other).is_err());
        assert_eq!(rel().equals(&unknown, &unknown.clone()), Ok(true));
    }

    #[test]
    fn test_ordering_is_total() {
        let cmp = OrderingComparer::default();
        let iri = node(Term::iri("http://example.org/a"));
        let lit = node(Term::string("a"));
        assert_eq!(cmp.compare(None, Some(&iri)), Ordering::Less);
        assert_eq!(cmp.compare(Some(&iri), Some(&lit)), Ordering::Less);
        assert_eq!(cmp.compare(Some(&lit), Some(&iri)), Ordering::Greater);
        assert_eq!(cmp.compare(None, None), Ordering::Equal);
    }

    #[test]
    fn test_ordering_strings_before_numbers() {
        let cmp = OrderingComparer::default();
        let s = node(Term::string("z"));
        let n = node(Term::integer(1));
        let b = node(Term::boolean(false));
        assert_eq!(cmp.compare_nodes(&s, &n), Ordering::Less);
        assert_eq!(cmp.compare_nodes(&n, &b), Ordering::Less);
    }

    #[test]
    fn test_ordering_ill_typed_numerics_is_transitive() {
        let cmp = OrderingComparer::default();
        let nodes = vec![
            node(Term::integer(10)),
            node(Term::typed("5x", xsd::INTEGER)),
            node(Term::integer(9)),
            node(Term::double(f64::NAN)),
            node(Term::typed("1.5", xsd::DECIMAL)),
            node(Term::typed("abc", xsd::DOUBLE)),
            node(Term::typed("2024-01-01", xsd::DATE)),
            node(Term::typed("not-a-date", xsd::DATE)),
            node(Term::typed("2023-06-30", xsd::DATE)),
        ];
        assert_eq!(cmp.compare_nodes(&nodes[0], &nodes[1]), Ordering::Less);
        assert_eq!(cmp.compare_nodes(&nodes[2], &nodes[1]), Ordering::Less);
        assert_eq!(cmp.compare_nodes(&nodes[2], &nodes[0]), Ordering::Less);
        assert_eq!(cmp.compare_nodes(&nodes[3], &nodes[0]), Ordering::Greater);
        assert_eq!(cmp.compare_nodes(&nodes[7], &nodes[8]), Ordering::Greater);

        for a in &nodes {
            for b in &nodes {
                assert_eq!(cmp.compare_nodes(a, b), cmp.compare_nodes(b, a).reverse());
                for c in &nodes {
                    if cmp.compare_nodes(a, b) == Ordering::Less
                        && cmp.compare_nodes(b, c) == Ordering::Less
                    {
                        assert_eq!(
                            cmp.compare_nodes(a, c),
                            Ordering::Less,
                            "{} < {} < {}",
                            a.term(),
                            b.term(),
                            c.term()
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_ordering_mixed_timezones_is_defined() {
        let cmp = OrderingComparer::default();
        let a = node(Term::typed("2024-01-01T00:00:00Z", xsd::DATE_TIME));
        let b = node(Term::typed("2024-01-01T00:00:00", xsd::DATE_TIME));
        let first = cmp.compare_nodes(&a, &b);
        assert_eq!(first, cmp.compare_nodes(&a, &b));
        assert_eq!(first.reverse(), cmp.compare_nodes(&b, &a));
    }

    #[test]
    fn test_invariant_collation() {
        let strings = StringComparer::new(Collation::Invariant, false);
        assert_eq!(strings.compare("a", "B"), Ordering::Less);
        assert_eq!(strings.compare("a", "A"), Ordering::Less);
        assert_eq!(StringComparer::default().compare("a", "B"), Ordering::Greater);
        let folded = StringComparer::new(Collation::Ordinal, true);
        assert_eq!(folded.compare("abc", "ABC"), Ordering::Equal);
    }

    #[test]
    fn test_accent_insensitive() {
        let strict = StringComparer::default();
        assert_ne!(strict.compare("é", "e"), Ordering::Equal);

        let loose = StringComparer::default().with_ignore_accents(true);
        assert_eq!(loose.compare("é", "e"), Ordering::Equal);
        assert_eq!(loose.compare("Ångström", "Angstrom"), Ordering::Equal);
        assert_eq!(loose.compare("café", "cafe\u{301}"), Ordering::Equal);
        assert_eq!(loose.compare("é", "E"), Ordering::Greater);

        let both = StringComparer::new(Collation::Invariant, true).with_ignore_accents(true);
        assert_eq!(both.compare("É", "e"), Ordering::Equal);
        assert_eq!(both.compare("élan", "Elbe"), Ordering::Less);

        let rel = RelationalComparer::new(loose);
        let a = node(Term::string("naïve"));
        let b = node(Term::string("naive"));
        assert_eq!(rel.equals(&a, &b), Ok(true));
    }

    #[test]
    fn test_language_strings() {
        let en = node(Term::Literal(Literal::lang_string("chat", "en")));
        let fr = node(Term::Literal(Literal::lang_string("chat", "fr")));
        assert_eq!(rel().try_compare(&en, &fr), None);
        assert_eq!(rel().equals(&en, &fr), Ok(false));
    }
}
