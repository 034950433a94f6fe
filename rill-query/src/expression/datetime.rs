//! Date/time function implementations
//!
//! YEAR, MONTH and DAY accept `xsd:date` or `xsd:dateTime`. HOURS, MINUTES
//! and SECONDS need a time component. NOW is fixed for the whole query.

use crate::context::EvaluationContext;
use crate::error::{ExprResult, ExpressionError};
use crate::value::{TypedValue, ValuedNode};
use bigdecimal::BigDecimal;
use rill_core::{DateTime, Term};
use rill_vocab::xsd;
use std::str::FromStr;

pub fn now(ctx: &EvaluationContext<'_>) -> ValuedNode {
    ValuedNode::datetime(ctx.now().clone())
}

pub fn year(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    Ok(ValuedNode::integer(i64::from(arg.as_datetime()?.year())))
}

pub fn month(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    Ok(ValuedNode::integer(i64::from(arg.as_datetime()?.month())))
}

pub fn day(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    Ok(ValuedNode::integer(i64::from(arg.as_datetime()?.day())))
}

fn strict_datetime<'n>(arg: &'n ValuedNode, function: &'static str) -> ExprResult<&'n DateTime> {
    match arg.typed()? {
        TypedValue::DateTime(dt) => Ok(dt),
        _ => Err(ExpressionError::type_mismatch(
            function,
            format!("{} is not an xsd:dateTime", arg.term()),
        )),
    }
}

pub fn hours(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    let dt = strict_datetime(arg, "HOURS")?;
    Ok(ValuedNode::integer(i64::from(dt.hours())))
}

pub fn minutes(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    let dt = strict_datetime(arg, "MINUTES")?;
    Ok(ValuedNode::integer(i64::from(dt.minutes())))
}

/// Seconds with fractional part, as `xsd:decimal`
pub fn seconds(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    let dt = strict_datetime(arg, "SECONDS")?;
    let lexical = dt.seconds_lexical();
    BigDecimal::from_str(&lexical)
        .map(ValuedNode::decimal)
        .map_err(|_| ExpressionError::invalid_lexical(&lexical, xsd::DECIMAL))
}

/// Timezone as `xsd:dayTimeDuration`; an error when there is none
pub fn timezone(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    let dt = arg.as_datetime()?;
    let offset = dt.offset_seconds().ok_or_else(|| {
        ExpressionError::invalid_argument("TIMEZONE", format!("{} has no timezone", arg.term()))
    })?;
    Ok(ValuedNode::new(Term::typed(
        day_time_duration(offset),
        xsd::DAY_TIME_DURATION,
    )))
}

/// Timezone as a simple literal; empty when there is none
pub fn tz(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    let dt = arg.as_datetime()?;
    Ok(ValuedNode::string(dt.timezone().unwrap_or_default()))
}

/// `-PT5H`, `PT5H30M`, `PT0S`
fn day_time_duration(offset_seconds: i32) -> String {
    if offset_seconds == 0 {
        return "PT0S".to_string();
    }
    let sign = if offset_seconds < 0 { "-" } else { "" };
    let total = offset_seconds.unsigned_abs();
    let (h, m) = (total / 3600, (total % 3600) / 60);
    let mut out = format!("{}PT", sign);
    if h > 0 {
        out.push_str(&format!("{}H", h));
    }
    if m > 0 {
        out.push_str(&format!("{}M", m));
    }
    out
}
