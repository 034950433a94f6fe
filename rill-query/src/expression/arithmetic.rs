//! Arithmetic operator implementations
//!
//! Operands are promoted to their least common numeric type before the
//! operator runs. Integer division yields a decimal; integer overflow is an
//! error rather than a silent wrap.

use crate::error::{ExprResult, ExpressionError};
use crate::value::{NumericType, ValuedNode};
use bigdecimal::BigDecimal;
use num_traits::Zero;

#[derive(Clone, Copy)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
        }
    }
}

pub fn add(a: &ValuedNode, b: &ValuedNode) -> ExprResult<ValuedNode> {
    binary(Op::Add, a, b)
}

pub fn subtract(a: &ValuedNode, b: &ValuedNode) -> ExprResult<ValuedNode> {
    binary(Op::Sub, a, b)
}

pub fn multiply(a: &ValuedNode, b: &ValuedNode) -> ExprResult<ValuedNode> {
    binary(Op::Mul, a, b)
}

pub fn divide(a: &ValuedNode, b: &ValuedNode) -> ExprResult<ValuedNode> {
    binary(Op::Div, a, b)
}

fn operand_type(node: &ValuedNode, op: Op) -> ExprResult<NumericType> {
    let t = node.numeric_type();
    if t.is_numeric() {
        Ok(t)
    } else {
        Err(ExpressionError::type_mismatch(
            "arithmetic",
            format!("{} {} requires numeric operands", node.term(), op.symbol()),
        ))
    }
}

fn binary(op: Op, a: &ValuedNode, b: &ValuedNode) -> ExprResult<ValuedNode> {
    let mut target = operand_type(a, op)?.promote(operand_type(b, op)?);
    if matches!(op, Op::Div) && target == NumericType::Integer {
        target = NumericType::Decimal;
    }
    match target {
        NumericType::Integer => {
            let (x, y) = (a.as_integer()?, b.as_integer()?);
            let r = match op {
                Op::Add => x.checked_add(y),
                Op::Sub => x.checked_sub(y),
                Op::Mul => x.checked_mul(y),
                Op::Div => unreachable!("integer division promotes to decimal"),
            };
            r.map(ValuedNode::integer).ok_or(ExpressionError::Overflow)
        }
        NumericType::Decimal => {
            let (x, y) = (a.as_decimal()?, b.as_decimal()?);
            let r = match op {
                Op::Add => x + y,
                Op::Sub => x - y,
                Op::Mul => x * y,
                Op::Div => {
                    if y.is_zero() {
                        return Err(ExpressionError::DivideByZero);
                    }
                    x / y
                }
            };
            Ok(ValuedNode::decimal(r))
        }
        NumericType::Float => {
            let (x, y) = (a.as_float()?, b.as_float()?);
            Ok(ValuedNode::float(match op {
                Op::Add => x + y,
                Op::Sub => x - y,
                Op::Mul => x * y,
                Op::Div => x / y,
            }))
        }
        NumericType::Double => {
            let (x, y) = (a.as_double()?, b.as_double()?);
            Ok(ValuedNode::double(match op {
                Op::Add => x + y,
                Op::Sub => x - y,
                Op::Mul => x * y,
                Op::Div => x / y,
            }))
        }
        NumericType::NaN => Err(ExpressionError::type_mismatch(
            "arithmetic",
            "non-numeric operand",
        )),
    }
}

pub fn negate(a: &ValuedNode) -> ExprResult<ValuedNode> {
    match a.numeric_type() {
        NumericType::Integer => a
            .as_integer()?
            .checked_neg()
            .map(ValuedNode::integer)
            .ok_or(ExpressionError::Overflow),
        NumericType::Decimal => Ok(ValuedNode::decimal(-a.as_decimal()?)),
        NumericType::Float => Ok(ValuedNode::float(-a.as_float()?)),
        NumericType::Double => Ok(ValuedNode::double(-a.as_double()?)),
        NumericType::NaN => Err(ExpressionError::type_mismatch(
            "unary minus",
            format!("{} is not numeric", a.term()),
        )),
    }
}

pub fn unary_plus(a: ValuedNode) -> ExprResult<ValuedNode> {
    if a.is_numeric() {
        Ok(a)
    } else {
        Err(ExpressionError::type_mismatch(
            "unary plus",
            format!("{} is not numeric", a.term()),
        ))
    }
}

/// Zero of the given numeric type
pub(crate) fn zero(t: NumericType) -> ValuedNode {
    match t {
        NumericType::Decimal => ValuedNode::decimal(BigDecimal::zero()),
        NumericType::Float => ValuedNode::float(0.0),
        NumericType::Double => ValuedNode::double(0.0),
        NumericType::Integer | NumericType::NaN => ValuedNode::integer(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_core::Term;
    use rill_vocab::xsd;
    use std::str::FromStr;

    #[test]
    fn test_integer_arithmetic() {
        let r = add(&ValuedNode::integer(2), &ValuedNode::integer(3)).unwrap();
        assert_eq!(r.term(), &Term::integer(5));
        assert_eq!(
            multiply(&ValuedNode::integer(i64::MAX), &ValuedNode::integer(2)),
            Err(ExpressionError::Overflow)
        );
    }

    #[test]
    fn test_integer_division_is_decimal() {
        let r = divide(&ValuedNode::integer(3), &ValuedNode::integer(2)).unwrap();
        assert_eq!(r.numeric_type(), NumericType::Decimal);
        assert_eq!(r.as_decimal().unwrap(), BigDecimal::from_str("1.5").unwrap());
        assert_eq!(
            divide(&ValuedNode::integer(1), &ValuedNode::integer(0)),
            Err(ExpressionError::DivideByZero)
        );
    }

    #[test]
    fn test_promotion() {
        let dec = ValuedNode::new(Term::typed("1.5", xsd::DECIMAL));
        let r = add(&ValuedNode::integer(1), &dec).unwrap();
        assert_eq!(r.numeric_type(), NumericType::Decimal);
        let r = add(&r, &ValuedNode::double(0.5)).unwrap();
        assert_eq!(r.numeric_type(), NumericType::Double);
        assert_eq!(r.as_double().unwrap(), 3.0);
    }

    #[test]
    fn test_double_division_by_zero_is_infinite() {
        let r = divide(&ValuedNode::double(1.0), &ValuedNode::integer(0)).unwrap();
        assert_eq!(r.as_double().unwrap(), f64::INFINITY);
    }

    #[test]
    fn test_non_numeric_operand() {
        assert!(add(&ValuedNode::string("1"), &ValuedNode::integer(1)).is_err());
        assert!(negate(&ValuedNode::boolean(true)).is_err());
    }
}
