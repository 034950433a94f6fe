//! XSD constructor casts
//!
//! `xsd:string`, `xsd:integer`, `xsd:decimal`, `xsd:float`, `xsd:double`,
//! `xsd:boolean` and `xsd:dateTime` used as functions. Source literals with
//! an invalid lexical form fail; IRIs only cast to `xsd:string`.

use crate::algebra::CastTarget;
use crate::error::{ExprResult, ExpressionError};
use crate::value::{decimal_lexical, parse_xsd_double, TypedValue, ValuedNode};
use bigdecimal::{BigDecimal, RoundingMode};
use num_traits::{FromPrimitive, ToPrimitive, Zero};
use rill_core::{canonical_double, DateTime, Term};
use std::str::FromStr;

pub fn cast(arg: &ValuedNode, target: CastTarget) -> ExprResult<ValuedNode> {
    if target == CastTarget::String {
        return to_string(arg);
    }
    let Some(lit) = arg.as_literal() else {
        return Err(unsupported(arg, target));
    };
    if lit.language().is_some() {
        return Err(unsupported(arg, target));
    }
    let typed = arg.typed()?;
    if matches!(typed, TypedValue::Plain) && !lit.is_simple() {
        return Err(unsupported(arg, target));
    }
    match target {
        CastTarget::String => to_string(arg),
        CastTarget::Integer => to_integer(arg, typed),
        CastTarget::Decimal => to_decimal(arg, typed),
        CastTarget::Float => to_double(arg, typed).map(|d| ValuedNode::float(d as f32)),
        CastTarget::Double => to_double(arg, typed).map(ValuedNode::double),
        CastTarget::Boolean => to_boolean(arg, typed),
        CastTarget::DateTime => to_datetime(arg, typed),
    }
}

fn unsupported(arg: &ValuedNode, target: CastTarget) -> ExpressionError {
    ExpressionError::UnsupportedCast {
        from: arg.term().to_string(),
        to: target.datatype().to_string(),
    }
}

fn invalid(lexical: &str, target: CastTarget) -> ExpressionError {
    ExpressionError::invalid_lexical(lexical, target.datatype())
}

fn to_string(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    match arg.term() {
        Term::Iri(iri) => Ok(ValuedNode::string(iri.clone())),
        Term::Literal(_) => {
            let lexical = match arg.typed()? {
                TypedValue::Integer(i) => i.to_string(),
                TypedValue::Decimal(d) => decimal_lexical(d),
                TypedValue::Float(f) => canonical_double(f64::from(*f)),
                TypedValue::Double(d) => canonical_double(*d),
                TypedValue::Boolean(b) => b.to_string(),
                _ => arg.term().lexical(),
            };
            Ok(ValuedNode::string(lexical))
        }
        _ => Err(unsupported(arg, CastTarget::String)),
    }
}

fn to_integer(arg: &ValuedNode, typed: &TypedValue) -> ExprResult<ValuedNode> {
    let target = CastTarget::Integer;
    let value = match typed {
        TypedValue::Integer(i) => *i,
        TypedValue::Decimal(d) => d
            .with_scale_round(0, RoundingMode::Down)
            .to_i64()
            .ok_or(ExpressionError::Overflow)?,
        TypedValue::Float(_) | TypedValue::Double(_) => {
            let d = arg.as_double()?;
            if !d.is_finite() {
                return Err(unsupported(arg, target));
            }
            let t = d.trunc();
            if t < i64::MIN as f64 || t >= i64::MAX as f64 {
                return Err(ExpressionError::Overflow);
            }
            t as i64
        }
        TypedValue::Boolean(b) => i64::from(*b),
        TypedValue::Plain => {
            let lexical = arg.term().lexical();
            let trimmed = lexical.trim();
            trimmed
                .strip_prefix('+')
                .unwrap_or(trimmed)
                .parse::<i64>()
                .map_err(|_| invalid(&lexical, target))?
        }
        TypedValue::DateTime(_) | TypedValue::Date(_) => return Err(unsupported(arg, target)),
    };
    Ok(ValuedNode::integer(value))
}

fn to_decimal(arg: &ValuedNode, typed: &TypedValue) -> ExprResult<ValuedNode> {
    let target = CastTarget::Decimal;
    let value = match typed {
        TypedValue::Integer(i) => BigDecimal::from(*i),
        TypedValue::Decimal(d) => d.clone(),
        TypedValue::Float(_) | TypedValue::Double(_) => {
            let d = arg.as_double()?;
            BigDecimal::from_f64(d).ok_or_else(|| unsupported(arg, target))?
        }
        TypedValue::Boolean(b) => BigDecimal::from(i64::from(*b)),
        TypedValue::Plain => {
            let lexical = arg.term().lexical();
            let trimmed = lexical.trim();
            if trimmed.contains(['e', 'E']) {
                return Err(invalid(&lexical, target));
            }
            BigDecimal::from_str(trimmed).map_err(|_| invalid(&lexical, target))?
        }
        TypedValue::DateTime(_) | TypedValue::Date(_) => return Err(unsupported(arg, target)),
    };
    Ok(ValuedNode::decimal(value))
}

fn to_double(arg: &ValuedNode, typed: &TypedValue) -> ExprResult<f64> {
    match typed {
        TypedValue::Integer(_)
        | TypedValue::Decimal(_)
        | TypedValue::Float(_)
        | TypedValue::Double(_) => arg.as_double(),
        TypedValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        TypedValue::Plain => {
            let lexical = arg.term().lexical();
            parse_xsd_double(lexical.trim()).ok_or_else(|| invalid(&lexical, CastTarget::Double))
        }
        TypedValue::DateTime(_) | TypedValue::Date(_) => Err(unsupported(arg, CastTarget::Double)),
    }
}

fn to_boolean(arg: &ValuedNode, typed: &TypedValue) -> ExprResult<ValuedNode> {
    let target = CastTarget::Boolean;
    let value = match typed {
        TypedValue::Boolean(b) => *b,
        TypedValue::Integer(i) => *i != 0,
        TypedValue::Decimal(d) => !d.is_zero(),
        TypedValue::Float(_) | TypedValue::Double(_) => {
            let d = arg.as_double()?;
            !(d.is_nan() || d == 0.0)
        }
        TypedValue::Plain => {
            let lexical = arg.term().lexical();
            match lexical.trim() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => return Err(invalid(&lexical, target)),
            }
        }
        TypedValue::DateTime(_) | TypedValue::Date(_) => return Err(unsupported(arg, target)),
    };
    Ok(ValuedNode::boolean(value))
}

fn to_datetime(arg: &ValuedNode, typed: &TypedValue) -> ExprResult<ValuedNode> {
    let target = CastTarget::DateTime;
    match typed {
        TypedValue::DateTime(dt) => Ok(ValuedNode::datetime(dt.clone())),
        TypedValue::Date(d) => Ok(ValuedNode::datetime(DateTime::from_date(d))),
        TypedValue::Plain => {
            let lexical = arg.term().lexical();
            DateTime::parse(lexical.trim())
                .map(ValuedNode::datetime)
                .map_err(|_| invalid(&lexical, target))
        }
        _ => Err(unsupported(arg, target)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::NumericType;
    use rill_vocab::xsd;

    #[test]
    fn test_to_integer() {
        let r = cast(&ValuedNode::double(-2.7), CastTarget::Integer).unwrap();
        assert_eq!(r, ValuedNode::integer(-2));
        let r = cast(&ValuedNode::string(" 42 "), CastTarget::Integer).unwrap();
        assert_eq!(r, ValuedNode::integer(42));
        assert!(cast(&ValuedNode::string("4.2"), CastTarget::Integer).is_err());
        assert!(cast(&ValuedNode::double(f64::NAN), CastTarget::Integer).is_err());
        assert_eq!(
            cast(&ValuedNode::boolean(true), CastTarget::Integer).unwrap(),
            ValuedNode::integer(1)
        );
    }

    #[test]
    fn test_to_decimal_and_double() {
        let r = cast(&ValuedNode::string("1.50"), CastTarget::Decimal).unwrap();
        assert_eq!(r.numeric_type(), NumericType::Decimal);
        assert_eq!(r.as_decimal().unwrap(), BigDecimal::from_str("1.5").unwrap());
        assert!(cast(&ValuedNode::string("1e3"), CastTarget::Decimal).is_err());
        let r = cast(&ValuedNode::string("1e3"), CastTarget::Double).unwrap();
        assert_eq!(r.as_double().unwrap(), 1000.0);
        let r = cast(&ValuedNode::integer(2), CastTarget::Float).unwrap();
        assert_eq!(r.numeric_type(), NumericType::Float);
    }

    #[test]
    fn test_to_boolean() {
        assert_eq!(
            cast(&ValuedNode::string("0"), CastTarget::Boolean).unwrap(),
            ValuedNode::boolean(false)
        );
        assert_eq!(
            cast(&ValuedNode::double(f64::NAN), CastTarget::Boolean).unwrap(),
            ValuedNode::boolean(false)
        );
        assert!(cast(&ValuedNode::string("yes"), CastTarget::Boolean).is_err());
    }

    #[test]
    fn test_to_string() {
        let iri = ValuedNode::new(Term::iri("http://example.org/a"));
        assert_eq!(
            cast(&iri, CastTarget::String).unwrap().term(),
            &Term::string("http://example.org/a")
        );
        let dec = ValuedNode::new(Term::typed("01.50", xsd::DECIMAL));
        assert_eq!(cast(&dec, CastTarget::String).unwrap().term(), &Term::string("1.5"));
        assert!(cast(&ValuedNode::new(Term::blank("b0")), CastTarget::String).is_err());
    }

    #[test]
    fn test_unsupported_sources() {
        let iri = ValuedNode::new(Term::iri("http://example.org/a"));
        assert!(matches!(
            cast(&iri, CastTarget::Integer),
            Err(ExpressionError::UnsupportedCast { .. })
        ));
        let tagged = ValuedNode::new(Term::lang_string("1", "en"));
        assert!(cast(&tagged, CastTarget::Integer).is_err());
        let bad = ValuedNode::new(Term::typed("abc", xsd::INTEGER));
        assert!(matches!(
            cast(&bad, CastTarget::Double),
            Err(ExpressionError::InvalidLexicalForm { .. })
        ));
    }

    #[test]
    fn test_to_datetime() {
        let d = ValuedNode::new(Term::typed("2020-01-02", xsd::DATE));
        let r = cast(&d, CastTarget::DateTime).unwrap();
        assert_eq!(r.as_datetime().unwrap().day(), 2);
        let s = ValuedNode::string("2020-01-02T03:04:05Z");
        assert_eq!(cast(&s, CastTarget::DateTime).unwrap().as_datetime().unwrap().hours(), 3);
    }
}
