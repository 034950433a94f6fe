//! Valued nodes: RDF terms with a memoized typed interpretation
//!
//! A [`ValuedNode`] pairs a [`Term`] with its typed view (integer, decimal,
//! float, double, boolean, dateTime, date) and the derived [`NumericType`]
//! tag. The typed view is parsed on first use and cached; nodes built from
//! native values carry it from construction.
//!
//! # Invariants
//!
//! - A literal whose lexical form is invalid for its datatype has numeric
//!   type `NaN` and fails every typed accessor with `InvalidLexicalForm`.
//! - `numeric_type()` never narrows: promotion takes the maximum on the ladder
//!   `NaN < Integer < Decimal < Float < Double`.

use crate::error::{ExprResult, ExpressionError};
use bigdecimal::BigDecimal;
use num_traits::{FromPrimitive, ToPrimitive, Zero};
use once_cell::sync::OnceCell;
use rill_core::{Date, DateTime, Literal, Term};
use rill_vocab::xsd;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// SPARQL numeric type ladder
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum NumericType {
    #[default]
    NaN,
    Integer,
    Decimal,
    Float,
    Double,
}

impl NumericType {
    /// Numeric type implied by a datatype IRI
    pub fn from_datatype(datatype: &str) -> Self {
        if xsd::is_integer_family(datatype) {
            NumericType::Integer
        } else {
            match datatype {
                xsd::DECIMAL => NumericType::Decimal,
                xsd::FLOAT => NumericType::Float,
                xsd::DOUBLE => NumericType::Double,
                _ => NumericType::NaN,
            }
        }
    }

    /// Least common type of two operands
    #[inline]
    pub fn promote(self, other: NumericType) -> NumericType {
        self.max(other)
    }

    pub fn is_numeric(self) -> bool {
        self != NumericType::NaN
    }

    pub fn datatype(self) -> Option<&'static str> {
        match self {
            NumericType::NaN => None,
            NumericType::Integer => Some(xsd::INTEGER),
            NumericType::Decimal => Some(xsd::DECIMAL),
            NumericType::Float => Some(xsd::FLOAT),
            NumericType::Double => Some(xsd::DOUBLE),
        }
    }
}

/// Parsed value behind a literal
#[derive(Clone, Debug)]
pub enum TypedValue {
    Integer(i64),
    Decimal(BigDecimal),
    Float(f32),
    Double(f64),
    Boolean(bool),
    DateTime(DateTime),
    Date(Date),
    /// Strings, IRIs, blank nodes, triple terms and unrecognized datatypes
    Plain,
}

/// RDF term plus memoized typed view
#[derive(Clone)]
pub struct ValuedNode {
    term: Term,
    typed: OnceCell<ExprResult<TypedValue>>,
}

impl ValuedNode {
    pub fn new(term: Term) -> Self {
        Self {
            term,
            typed: OnceCell::new(),
        }
    }

    fn with_value(term: Term, value: TypedValue) -> Self {
        Self {
            term,
            typed: OnceCell::with_value(Ok(value)),
        }
    }

    pub fn integer(value: i64) -> Self {
        Self::with_value(Term::integer(value), TypedValue::Integer(value))
    }

    pub fn decimal(value: BigDecimal) -> Self {
        let term = Term::Literal(Literal::decimal(decimal_lexical(&value)));
        Self::with_value(term, TypedValue::Decimal(value))
    }

    pub fn float(value: f32) -> Self {
        Self::with_value(Term::Literal(Literal::float(value)), TypedValue::Float(value))
    }

    pub fn double(value: f64) -> Self {
        Self::with_value(Term::double(value), TypedValue::Double(value))
    }

    pub fn boolean(value: bool) -> Self {
        Self::with_value(Term::boolean(value), TypedValue::Boolean(value))
    }

    pub fn string(value: impl Into<std::sync::Arc<str>>) -> Self {
        Self::with_value(Term::string(value), TypedValue::Plain)
    }

    pub fn datetime(value: DateTime) -> Self {
        let term = Term::typed(value.original().to_string(), xsd::DATE_TIME);
        Self::with_value(term, TypedValue::DateTime(value))
    }

    pub fn term(&self) -> &Term {
        &self.term
    }

    pub fn into_term(self) -> Term {
        self.term
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        self.term.as_literal()
    }

    /// Typed view, parsed on first access
    pub fn typed(&self) -> ExprResult<&TypedValue> {
        self.typed
            .get_or_init(|| parse_typed(&self.term))
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn numeric_type(&self) -> NumericType {
        match self.typed() {
            Ok(TypedValue::Integer(_)) => NumericType::Integer,
            Ok(TypedValue::Decimal(_)) => NumericType::Decimal,
            Ok(TypedValue::Float(_)) => NumericType::Float,
            Ok(TypedValue::Double(_)) => NumericType::Double,
            _ => NumericType::NaN,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric_type().is_numeric()
    }

    pub fn as_integer(&self) -> ExprResult<i64> {
        match self.typed()? {
            TypedValue::Integer(i) => Ok(*i),
            _ => Err(self.mismatch("integer")),
        }
    }

    pub fn as_decimal(&self) -> ExprResult<BigDecimal> {
        match self.typed()? {
            TypedValue::Integer(i) => Ok(BigDecimal::from(*i)),
            TypedValue::Decimal(d) => Ok(d.clone()),
            TypedValue::Float(f) => {
                BigDecimal::from_f32(*f).ok_or_else(|| self.mismatch("decimal"))
            }
            TypedValue::Double(d) => {
                BigDecimal::from_f64(*d).ok_or_else(|| self.mismatch("decimal"))
            }
            _ => Err(self.mismatch("decimal")),
        }
    }

    pub fn as_float(&self) -> ExprResult<f32> {
        match self.typed()? {
            TypedValue::Integer(i) => Ok(*i as f32),
            TypedValue::Decimal(d) => d.to_f32().ok_or_else(|| self.mismatch("float")),
            TypedValue::Float(f) => Ok(*f),
            TypedValue::Double(d) => Ok(*d as f32),
            _ => Err(self.mismatch("float")),
        }
    }

    pub fn as_double(&self) -> ExprResult<f64> {
        match self.typed()? {
            TypedValue::Integer(i) => Ok(*i as f64),
            TypedValue::Decimal(d) => d.to_f64().ok_or_else(|| self.mismatch("double")),
            TypedValue::Float(f) => Ok(*f as f64),
            TypedValue::Double(d) => Ok(*d),
            _ => Err(self.mismatch("double")),
        }
    }

    pub fn as_boolean(&self) -> ExprResult<bool> {
        match self.typed()? {
            TypedValue::Boolean(b) => Ok(*b),
            _ => Err(self.mismatch("boolean")),
        }
    }

    /// dateTime view; dates are read as midnight
    pub fn as_datetime(&self) -> ExprResult<DateTime> {
        match self.typed()? {
            TypedValue::DateTime(dt) => Ok(dt.clone()),
            TypedValue::Date(d) => Ok(DateTime::from_date(d)),
            _ => Err(self.mismatch("dateTime")),
        }
    }

    pub fn as_date(&self) -> ExprResult<Date> {
        match self.typed()? {
            TypedValue::Date(d) => Ok(d.clone()),
            _ => Err(self.mismatch("date")),
        }
    }

    /// Effective boolean value (SPARQL 17.2.2)
    ///
    /// Booleans and numerics with an invalid lexical form are `false`;
    /// IRIs, blank nodes and other datatypes are a type error.
    pub fn effective_boolean_value(&self) -> ExprResult<bool> {
        let Some(lit) = self.term.as_literal() else {
            return Err(ExpressionError::type_mismatch(
                "effective boolean value",
                format!("{} has no boolean value", self.term),
            ));
        };
        if lit.is_string() {
            return Ok(!lit.lexical().is_empty());
        }
        match self.typed() {
            Ok(TypedValue::Boolean(b)) => Ok(*b),
            Ok(TypedValue::Integer(i)) => Ok(*i != 0),
            Ok(TypedValue::Decimal(d)) => Ok(!d.is_zero()),
            Ok(TypedValue::Float(f)) => Ok(!(f.is_nan() || *f == 0.0)),
            Ok(TypedValue::Double(d)) => Ok(!(d.is_nan() || *d == 0.0)),
            Err(ExpressionError::InvalidLexicalForm { .. }) => Ok(false),
            _ => Err(ExpressionError::type_mismatch(
                "effective boolean value",
                format!("{} has no boolean value", self.term),
            )),
        }
    }

    fn mismatch(&self, wanted: &str) -> ExpressionError {
        ExpressionError::type_mismatch("typed value", format!("{} is not a {}", self.term, wanted))
    }
}

impl PartialEq for ValuedNode {
    fn eq(&self, other: &Self) -> bool {
        self.term == other.term
    }
}

impl Eq for ValuedNode {}

impl Hash for ValuedNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.term.hash(state);
    }
}

impl fmt::Debug for ValuedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValuedNode({})", self.term)
    }
}

impl fmt::Display for ValuedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.term)
    }
}

impl From<Term> for ValuedNode {
    fn from(term: Term) -> Self {
        ValuedNode::new(term)
    }
}

/// Canonical xsd:decimal lexical form (always has a fractional part)
pub fn decimal_lexical(value: &BigDecimal) -> String {
    let normalized = value.normalized();
    if normalized.fractional_digit_count() <= 0 {
        format!("{}.0", normalized.with_scale(0))
    } else {
        normalized.to_string()
    }
}

fn parse_typed(term: &Term) -> ExprResult<TypedValue> {
    let Some(lit) = term.as_literal() else {
        return Ok(TypedValue::Plain);
    };
    let lexical = lit.lexical().trim();
    let datatype = lit.datatype();
    let invalid = || ExpressionError::invalid_lexical(lit.lexical(), datatype);

    match NumericType::from_datatype(datatype) {
        NumericType::Integer => {
            let digits = lexical.strip_prefix('+').unwrap_or(lexical);
            return digits
                .parse::<i64>()
                .map(TypedValue::Integer)
                .map_err(|_| invalid());
        }
        NumericType::Decimal => {
            if lexical.contains(['e', 'E']) {
                return Err(invalid());
            }
            return BigDecimal::from_str(lexical)
                .map(TypedValue::Decimal)
                .map_err(|_| invalid());
        }
        NumericType::Float => return parse_xsd_double(lexical)
            .map(|d| TypedValue::Float(d as f32))
            .ok_or_else(invalid),
        NumericType::Double => return parse_xsd_double(lexical)
            .map(TypedValue::Double)
            .ok_or_else(invalid),
        NumericType::NaN => {}
    }

    match datatype {
        xsd::BOOLEAN => match lexical {
            "true" | "1" => Ok(TypedValue::Boolean(true)),
            "false" | "0" => Ok(TypedValue::Boolean(false)),
            _ => Err(invalid()),
        },
        xsd::DATE_TIME => DateTime::parse(lexical)
            .map(TypedValue::DateTime)
            .map_err(|_| invalid()),
        xsd::DATE => Date::parse(lexical)
            .map(TypedValue::Date)
            .map_err(|_| invalid()),
        _ => Ok(TypedValue::Plain),
    }
}

/// XSD float/double lexical space (`INF`, `-INF`, `NaN`, decimal or exponent)
pub(crate) fn parse_xsd_double(lexical: &str) -> Option<f64> {
    match lexical {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        s if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => None,
        s => s.parse::<f64>().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_type_from_literal() {
        assert_eq!(
            ValuedNode::new(Term::typed("5", xsd::INT)).numeric_type(),
            NumericType::Integer
        );
        assert_eq!(
            ValuedNode::new(Term::typed("1.5", xsd::DECIMAL)).numeric_type(),
            NumericType::Decimal
        );
        assert_eq!(ValuedNode::new(Term::string("5")).numeric_type(), NumericType::NaN);
    }

    #[test]
    fn test_invalid_lexical_is_nan() {
        let node = ValuedNode::new(Term::typed("abc", xsd::INTEGER));
        assert_eq!(node.numeric_type(), NumericType::NaN);
        assert!(matches!(
            node.as_integer(),
            Err(ExpressionError::InvalidLexicalForm { .. })
        ));
        assert_eq!(node.effective_boolean_value(), Ok(false));
    }

    #[test]
    fn test_promotion_is_monotonic() {
        assert_eq!(NumericType::Integer.promote(NumericType::Decimal), NumericType::Decimal);
        assert_eq!(NumericType::Double.promote(NumericType::Integer), NumericType::Double);
        assert_eq!(NumericType::Float.promote(NumericType::Decimal), NumericType::Float);
    }

    #[test]
    fn test_widening_accessors() {
        let node = ValuedNode::integer(3);
        assert_eq!(node.as_decimal().unwrap(), BigDecimal::from(3));
        assert_eq!(node.as_double().unwrap(), 3.0);
        assert!(ValuedNode::double(1.5).as_integer().is_err());
    }

    #[test]
    fn test_effective_boolean_value() {
        assert_eq!(ValuedNode::string("").effective_boolean_value(), Ok(false));
        assert_eq!(ValuedNode::string("x").effective_boolean_value(), Ok(true));
        assert_eq!(ValuedNode::integer(0).effective_boolean_value(), Ok(false));
        assert_eq!(ValuedNode::double(f64::NAN).effective_boolean_value(), Ok(false));
        assert!(ValuedNode::new(Term::iri("http://x")).effective_boolean_value().is_err());
    }

    #[test]
    fn test_decimal_lexical() {
        assert_eq!(decimal_lexical(&BigDecimal::from(3)), "3.0");
        assert_eq!(decimal_lexical(&BigDecimal::from_str("1.50").unwrap()), "1.5");
    }

    #[test]
    fn test_typed_view_is_memoized() {
        let node = ValuedNode::new(Term::typed("2024-01-01T00:00:00Z", xsd::DATE_TIME));
        let first = node.typed().unwrap() as *const TypedValue;
        let second = node.typed().unwrap() as *const TypedValue;
        assert_eq!(first, second);
    }
}
