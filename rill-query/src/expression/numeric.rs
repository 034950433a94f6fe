//! Numeric function implementations: ABS, ROUND, CEIL, FLOOR
//!
//! Results keep the numeric type of the argument.

use crate::error::{ExprResult, ExpressionError};
use crate::value::{NumericType, ValuedNode};
use bigdecimal::{BigDecimal, RoundingMode};

#[derive(Clone, Copy)]
enum Rounding {
    HalfUp,
    Ceil,
    Floor,
}

impl Rounding {
    fn mode(self) -> RoundingMode {
        match self {
            Rounding::HalfUp => RoundingMode::HalfUp,
            Rounding::Ceil => RoundingMode::Ceiling,
            Rounding::Floor => RoundingMode::Floor,
        }
    }

    fn apply(self, v: f64) -> f64 {
        match self {
            // XPath fn:round rounds halves toward positive infinity
            Rounding::HalfUp => (v + 0.5).floor(),
            Rounding::Ceil => v.ceil(),
            Rounding::Floor => v.floor(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Rounding::HalfUp => "ROUND",
            Rounding::Ceil => "CEIL",
            Rounding::Floor => "FLOOR",
        }
    }
}

fn numeric_type(arg: &ValuedNode, function: &'static str) -> ExprResult<NumericType> {
    let t = arg.numeric_type();
    if t.is_numeric() {
        Ok(t)
    } else {
        Err(ExpressionError::type_mismatch(
            function,
            format!("{} is not numeric", arg.term()),
        ))
    }
}

pub fn abs(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    match numeric_type(arg, "ABS")? {
        NumericType::Integer => arg
            .as_integer()?
            .checked_abs()
            .map(ValuedNode::integer)
            .ok_or(ExpressionError::Overflow),
        NumericType::Decimal => Ok(ValuedNode::decimal(arg.as_decimal()?.abs())),
        NumericType::Float => Ok(ValuedNode::float(arg.as_float()?.abs())),
        _ => Ok(ValuedNode::double(arg.as_double()?.abs())),
    }
}

pub fn round(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    round_with(arg, Rounding::HalfUp)
}

pub fn ceil(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    round_with(arg, Rounding::Ceil)
}

pub fn floor(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    round_with(arg, Rounding::Floor)
}

fn round_with(arg: &ValuedNode, rounding: Rounding) -> ExprResult<ValuedNode> {
    match numeric_type(arg, rounding.name())? {
        NumericType::Integer => Ok(ValuedNode::integer(arg.as_integer()?)),
        NumericType::Decimal => Ok(ValuedNode::decimal(round_decimal(
            &arg.as_decimal()?,
            rounding,
        ))),
        NumericType::Float => Ok(ValuedNode::float(rounding.apply(f64::from(arg.as_float()?)) as f32)),
        _ => Ok(ValuedNode::double(rounding.apply(arg.as_double()?))),
    }
}

fn round_decimal(value: &BigDecimal, rounding: Rounding) -> BigDecimal {
    // HalfUp in bigdecimal rounds away from zero; -2.5 must become -2
    let mode = match rounding {
        Rounding::HalfUp if value < &BigDecimal::from(0) => RoundingMode::HalfDown,
        other => other.mode(),
    };
    value.with_scale_round(0, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_core::Term;
    use rill_vocab::xsd;
    use std::str::FromStr;

    fn dec(s: &str) -> ValuedNode {
        ValuedNode::decimal(BigDecimal::from_str(s).unwrap())
    }

    #[test]
    fn test_round_halves_toward_positive_infinity() {
        assert_eq!(round(&ValuedNode::double(2.5)).unwrap().as_double().unwrap(), 3.0);
        assert_eq!(round(&ValuedNode::double(-2.5)).unwrap().as_double().unwrap(), -2.0);
        assert_eq!(round(&dec("2.5")).unwrap().as_decimal().unwrap(), BigDecimal::from(3));
        assert_eq!(round(&dec("-2.5")).unwrap().as_decimal().unwrap(), BigDecimal::from(-2));
        assert_eq!(round(&dec("-2.6")).unwrap().as_decimal().unwrap(), BigDecimal::from(-3));
    }

    #[test]
    fn test_ceil_floor_keep_type() {
        let c = ceil(&dec("1.2")).unwrap();
        assert_eq!(c.numeric_type(), NumericType::Decimal);
        assert_eq!(c.as_decimal().unwrap(), BigDecimal::from(2));
        let f = floor(&ValuedNode::float(-1.5)).unwrap();
        assert_eq!(f.numeric_type(), NumericType::Float);
        assert_eq!(f.as_float().unwrap(), -2.0);
        assert_eq!(floor(&ValuedNode::integer(7)).unwrap(), ValuedNode::integer(7));
    }

    #[test]
    fn test_abs() {
        assert_eq!(abs(&ValuedNode::integer(-4)).unwrap(), ValuedNode::integer(4));
        assert_eq!(abs(&ValuedNode::integer(i64::MIN)), Err(ExpressionError::Overflow));
        let int = ValuedNode::new(Term::typed("-3", xsd::INT));
        assert_eq!(abs(&int).unwrap(), ValuedNode::integer(3));
        assert!(abs(&ValuedNode::string("3")).is_err());
    }
}
