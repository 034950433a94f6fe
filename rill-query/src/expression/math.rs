//! Extended math functions
//!
//! Trigonometry, logarithms, powers, roots, distances, factorial and ranged
//! random numbers, addressed by IRI in the `lfn:` function namespace.
//! Square and cube keep the argument's numeric type; factorial returns an
//! integer; everything else is computed and returned as `xsd:double`.

use super::arithmetic::multiply;
use crate::algebra::Trig;
use crate::error::{ExprResult, ExpressionError};
use crate::value::{NumericType, ValuedNode};

fn apply_trig(function: Trig, x: f64, inverse: bool) -> f64 {
    match (function, inverse) {
        (Trig::Sin, false) => x.sin(),
        (Trig::Sin, true) => x.asin(),
        (Trig::Cos, false) => x.cos(),
        (Trig::Cos, true) => x.acos(),
        (Trig::Tan, false) => x.tan(),
        (Trig::Tan, true) => x.atan(),
        (Trig::Sec, false) => 1.0 / x.cos(),
        (Trig::Sec, true) => (1.0 / x).acos(),
        (Trig::Cosec, false) => 1.0 / x.sin(),
        (Trig::Cosec, true) => (1.0 / x).asin(),
        (Trig::Cotan, false) => x.cos() / x.sin(),
        (Trig::Cotan, true) => (1.0 / x).atan(),
    }
}

fn double_arg(arg: &ValuedNode, function: &'static str) -> ExprResult<f64> {
    if !arg.numeric_type().is_numeric() {
        return Err(ExpressionError::type_mismatch(
            function,
            format!("{} is not numeric", arg.term()),
        ));
    }
    arg.as_double()
}

pub fn trig(arg: &ValuedNode, function: Trig, inverse: bool, name: &'static str) -> ExprResult<ValuedNode> {
    let x = double_arg(arg, name)?;
    Ok(ValuedNode::double(apply_trig(function, x, inverse)))
}

pub fn degrees_to_radians(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    Ok(ValuedNode::double(double_arg(arg, "degrees-to-radians")?.to_radians()))
}

pub fn radians_to_degrees(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    Ok(ValuedNode::double(double_arg(arg, "radians-to-degrees")?.to_degrees()))
}

/// `log(x)` in base 10, or `log(x, base)`
pub fn log(arg: &ValuedNode, base: Option<&ValuedNode>) -> ExprResult<ValuedNode> {
    let x = double_arg(arg, "log")?;
    let result = match base {
        Some(b) => x.log(double_arg(b, "log")?),
        None => x.log10(),
    };
    Ok(ValuedNode::double(result))
}

pub fn ln(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    Ok(ValuedNode::double(double_arg(arg, "ln")?.ln()))
}

/// e raised to the argument
pub fn exp(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    Ok(ValuedNode::double(double_arg(arg, "e")?.exp()))
}

/// 10 raised to the argument
pub fn ten(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    Ok(ValuedNode::double(10f64.powf(double_arg(arg, "ten")?)))
}

/// `pow(x, y)`; with one argument the square of `x`
pub fn pow(arg: &ValuedNode, exponent: Option<&ValuedNode>) -> ExprResult<ValuedNode> {
    match exponent {
        None => square(arg),
        Some(e) => {
            let x = double_arg(arg, "pow")?;
            Ok(ValuedNode::double(x.powf(double_arg(e, "pow")?)))
        }
    }
}

pub fn square(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    double_arg(arg, "sq")?;
    multiply(arg, arg)
}

pub fn cube(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    double_arg(arg, "cube")?;
    multiply(&multiply(arg, arg)?, arg)
}

pub fn sqrt(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    Ok(ValuedNode::double(double_arg(arg, "sqrt")?.sqrt()))
}

/// `root(x, n)`, the n-th root; with one argument the square root
pub fn root(arg: &ValuedNode, degree: Option<&ValuedNode>) -> ExprResult<ValuedNode> {
    match degree {
        None => sqrt(arg),
        Some(n) => {
            let x = double_arg(arg, "root")?;
            Ok(ValuedNode::double(x.powf(1.0 / double_arg(n, "root")?)))
        }
    }
}

/// Length of the hypotenuse with sides `x` and `y`
pub fn pythagoras(x: &ValuedNode, y: &ValuedNode) -> ExprResult<ValuedNode> {
    let (x, y) = (double_arg(x, "pythagoras")?, double_arg(y, "pythagoras")?);
    Ok(ValuedNode::double(x.hypot(y)))
}

/// Euclidean distance: `(x1, y1, x2, y2)` or `(x1, y1, z1, x2, y2, z2)`
pub fn cartesian(args: &[ValuedNode]) -> ExprResult<ValuedNode> {
    let coords = args
        .iter()
        .map(|a| double_arg(a, "cartesian"))
        .collect::<ExprResult<Vec<f64>>>()?;
    let (from, to) = coords.split_at(coords.len() / 2);
    let sum: f64 = from.iter().zip(to).map(|(a, b)| (b - a).powi(2)).sum();
    Ok(ValuedNode::double(sum.sqrt()))
}

/// Integer factorial; non-integers are rounded first
///
/// Negative `n` gives the product `n * (n + 1) * ... * -2`.
pub fn factorial(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    let n = match arg.numeric_type() {
        NumericType::Integer => arg.as_integer()?,
        NumericType::NaN => {
            return Err(ExpressionError::type_mismatch(
                "factorial",
                format!("{} is not numeric", arg.term()),
            ))
        }
        _ => {
            let d = arg.as_double()?.round();
            if !d.is_finite() || d.abs() > i64::MAX as f64 {
                return Err(ExpressionError::Overflow);
            }
            d as i64
        }
    };
    let (low, high) = if n >= 0 { (2, n) } else { (n, -2) };
    (low..=high)
        .try_fold(1i64, |acc, i| acc.checked_mul(i))
        .map(ValuedNode::integer)
        .ok_or(ExpressionError::Overflow)
}

pub fn reciprocal(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    let d = double_arg(arg, "reciprocal")?;
    if d == 0.0 {
        return Err(ExpressionError::DivideByZero);
    }
    Ok(ValuedNode::double(1.0 / d))
}

/// Uniform random double in `[0, 1)`, `[0, max)` or `[min, max)`
pub fn random_in(args: &[ValuedNode]) -> ExprResult<ValuedNode> {
    let (min, max) = match args {
        [] => (0.0, 1.0),
        [max] => (0.0, double_arg(max, "rnd")?),
        [min, max, ..] => (double_arg(min, "rnd")?, double_arg(max, "rnd")?),
    };
    if min > max {
        return Err(ExpressionError::invalid_argument(
            "rnd",
            format!("minimum {} is greater than maximum {}", min, max),
        ));
    }
    Ok(ValuedNode::double(min + rand::random::<f64>() * (max - min)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use rill_core::Term;
    use std::str::FromStr;

    fn int(i: i64) -> ValuedNode {
        ValuedNode::integer(i)
    }

    fn dbl(d: f64) -> ValuedNode {
        ValuedNode::double(d)
    }

    fn value(node: ExprResult<ValuedNode>) -> f64 {
        node.unwrap().as_double().unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_trig_and_inverse() {
        let half_pi = dbl(std::f64::consts::FRAC_PI_2);
        assert!(close(value(trig(&half_pi, Trig::Sin, false, "sin")), 1.0));
        assert!(close(
            value(trig(&int(1), Trig::Sin, true, "sin-1")),
            std::f64::consts::FRAC_PI_2
        ));
        assert!(close(value(trig(&int(0), Trig::Sec, false, "sec")), 1.0));
        assert!(close(
            value(trig(&int(1), Trig::Cotan, true, "cotan-1")),
            std::f64::consts::FRAC_PI_4
        ));
        assert!(trig(&ValuedNode::string("x"), Trig::Cos, false, "cos").is_err());
    }

    #[test]
    fn test_angle_conversion() {
        assert!(close(value(degrees_to_radians(&int(180))), std::f64::consts::PI));
        assert!(close(value(radians_to_degrees(&dbl(std::f64::consts::PI))), 180.0));
    }

    #[test]
    fn test_logs_and_exponents() {
        assert!(close(value(log(&int(1000), None)), 3.0));
        assert!(close(value(log(&int(8), Some(&int(2)))), 3.0));
        assert!(close(value(ln(&exp(&int(2)).unwrap())), 2.0));
        assert!(close(value(ten(&int(3))), 1000.0));
        assert!(close(value(pow(&int(2), Some(&int(10)))), 1024.0));
    }

    #[test]
    fn test_square_and_cube_keep_type() {
        assert_eq!(square(&int(7)).unwrap().term(), &Term::integer(49));
        assert_eq!(pow(&int(7), None).unwrap().term(), &Term::integer(49));
        assert_eq!(cube(&int(-3)).unwrap().term(), &Term::integer(-27));
        let d = ValuedNode::decimal(BigDecimal::from_str("1.5").unwrap());
        assert_eq!(
            square(&d).unwrap().as_decimal().unwrap(),
            BigDecimal::from_str("2.25").unwrap()
        );
        assert!(matches!(cube(&int(i64::MAX)), Err(ExpressionError::Overflow)));
    }

    #[test]
    fn test_roots_and_distances() {
        assert!(close(value(sqrt(&int(16))), 4.0));
        assert!(close(value(root(&int(27), Some(&int(3)))), 3.0));
        assert!(close(value(root(&int(9), None)), 3.0));
        assert!(close(value(pythagoras(&int(3), &int(4))), 5.0));
        assert!(close(value(cartesian(&[int(0), int(0), int(3), int(4)])), 5.0));
        assert!(close(
            value(cartesian(&[int(1), int(1), int(1), int(3), int(3), int(2)])),
            3.0
        ));
    }

    #[test]
    fn test_factorial() {
        assert_eq!(factorial(&int(5)).unwrap().term(), &Term::integer(120));
        assert_eq!(factorial(&int(0)).unwrap().term(), &Term::integer(1));
        assert_eq!(factorial(&int(-3)).unwrap().term(), &Term::integer(6));
        assert_eq!(factorial(&dbl(4.2)).unwrap().term(), &Term::integer(24));
        assert!(matches!(factorial(&int(30)), Err(ExpressionError::Overflow)));
    }

    #[test]
    fn test_reciprocal() {
        assert!(close(value(reciprocal(&int(4))), 0.25));
        assert!(matches!(reciprocal(&int(0)), Err(ExpressionError::DivideByZero)));
    }

    #[test]
    fn test_random_in_range() {
        for _ in 0..50 {
            let r = value(random_in(&[int(5), int(6)]));
            assert!((5.0..6.0).contains(&r));
        }
        assert!(random_in(&[int(6), int(5)]).is_err());
        let unit = value(random_in(&[]));
        assert!((0.0..1.0).contains(&unit));
    }
}
