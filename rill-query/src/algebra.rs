//! Query algebra
//!
//! The closed operator set ([`Algebra`]), scalar expressions
//! ([`Expression`]), aggregates and property paths, as produced by an
//! external parser and consumed by the processor. Two open seams remain:
//! [`ExtensionOperator`] behind `Algebra::Unknown` and [`ExtensionFunction`]
//! behind `Expression::Extension`.

use crate::context::EvaluationContext;
use crate::error::{ExprResult, QueryError, Result};
use crate::multiset::Multiset;
use crate::value::ValuedNode;
use crate::var::Var;
use rill_core::Term;
use rill_vocab::{lfn, xsd};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identity of an expression node, used to key per-expression caches
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u64);

static NEXT_EXPR_ID: AtomicU64 = AtomicU64::new(1);

impl ExprId {
    pub fn fresh() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Subject/predicate/object position: a variable or a fixed term
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PatternTerm {
    Var(Var),
    Term(Term),
}

impl PatternTerm {
    pub fn var(name: &str) -> Self {
        PatternTerm::Var(Var::new(name))
    }

    pub fn as_var(&self) -> Option<&Var> {
        match self {
            PatternTerm::Var(v) => Some(v),
            PatternTerm::Term(_) => None,
        }
    }

    pub fn as_term(&self) -> Option<&Term> {
        match self {
            PatternTerm::Term(t) => Some(t),
            PatternTerm::Var(_) => None,
        }
    }
}

impl From<Var> for PatternTerm {
    fn from(var: Var) -> Self {
        PatternTerm::Var(var)
    }
}

impl From<Term> for PatternTerm {
    fn from(term: Term) -> Self {
        PatternTerm::Term(term)
    }
}

/// One triple pattern of a BGP
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TriplePattern {
    pub subject: PatternTerm,
    pub predicate: PatternTerm,
    pub object: PatternTerm,
}

impl TriplePattern {
    pub fn new(
        subject: impl Into<PatternTerm>,
        predicate: impl Into<PatternTerm>,
        object: impl Into<PatternTerm>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// Variables in subject, predicate, object order (duplicates removed)
    pub fn vars(&self) -> Vec<Var> {
        let mut vars = Vec::new();
        for pos in [&self.subject, &self.predicate, &self.object] {
            if let Some(v) = pos.as_var() {
                if !vars.contains(v) {
                    vars.push(v.clone());
                }
            }
        }
        vars
    }
}

/// SPARQL property path
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyPath {
    Predicate(Term),
    Inverse(Box<PropertyPath>),
    Sequence(Box<PropertyPath>, Box<PropertyPath>),
    Alternative(Box<PropertyPath>, Box<PropertyPath>),
    ZeroOrOne(Box<PropertyPath>),
    ZeroOrMore(Box<PropertyPath>),
    OneOrMore(Box<PropertyPath>),
    /// `!(p1|^p2|...)`
    NegatedSet { forward: Vec<Term>, inverse: Vec<Term> },
}

/// Relational operators
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// Binary arithmetic operators
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// Target datatype of an XSD cast
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CastTarget {
    String,
    Integer,
    Decimal,
    Float,
    Double,
    Boolean,
    DateTime,
}

impl CastTarget {
    pub fn datatype(self) -> &'static str {
        match self {
            CastTarget::String => xsd::STRING,
            CastTarget::Integer => xsd::INTEGER,
            CastTarget::Decimal => xsd::DECIMAL,
            CastTarget::Float => xsd::FLOAT,
            CastTarget::Double => xsd::DOUBLE,
            CastTarget::Boolean => xsd::BOOLEAN,
            CastTarget::DateTime => xsd::DATE_TIME,
        }
    }

    pub fn from_datatype(iri: &str) -> Option<Self> {
        match iri {
            xsd::STRING => Some(CastTarget::String),
            xsd::INTEGER => Some(CastTarget::Integer),
            xsd::DECIMAL => Some(CastTarget::Decimal),
            xsd::FLOAT => Some(CastTarget::Float),
            xsd::DOUBLE => Some(CastTarget::Double),
            xsd::BOOLEAN => Some(CastTarget::Boolean),
            xsd::DATE_TIME => Some(CastTarget::DateTime),
            _ => None,
        }
    }
}

/// Trigonometric functions of the `lfn:` namespace
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trig {
    Sin,
    Cos,
    Tan,
    Sec,
    Cosec,
    Cotan,
}

/// Built-in scalar functions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Function {
    // Conditionals and term tests
    Bound,
    If,
    Coalesce,
    SameTerm,
    IsIri,
    IsBlank,
    IsLiteral,
    IsNumeric,
    IsTriple,

    // Term accessors and constructors
    Str,
    Lang,
    LangMatches,
    Datatype,
    Iri,
    Bnode,
    StrDt,
    StrLang,
    Uuid,
    StrUuid,

    // Strings
    StrLen,
    SubStr,
    UCase,
    LCase,
    StrStarts,
    StrEnds,
    Contains,
    StrBefore,
    StrAfter,
    EncodeForUri,
    Concat,
    Replace,
    Regex,

    // Numerics
    Abs,
    Round,
    Ceil,
    Floor,

    // Date/time
    Now,
    Year,
    Month,
    Day,
    Hours,
    Minutes,
    Seconds,
    Timezone,
    Tz,

    // Hashes
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,

    // RDF-star
    Triple,
    Subject,
    Predicate,
    Object,

    // Extended math (`lfn:` namespace)
    /// Trigonometric function; `true` selects the inverse
    Trig(Trig, bool),
    DegreesToRadians,
    RadiansToDegrees,
    Log,
    Ln,
    Exp,
    Ten,
    Pow,
    Square,
    Cube,
    Sqrt,
    Root,
    Pythagoras,
    Cartesian,
    Factorial,
    Reciprocal,
    RandomIn,

    Cast(CastTarget),
}

impl Function {
    /// Look up a function by its SPARQL keyword (case-insensitive) or, for
    /// casts, by XSD datatype IRI
    pub fn from_name(name: &str) -> Option<Function> {
        if let Some(target) = CastTarget::from_datatype(name) {
            return Some(Function::Cast(target));
        }
        if let Some(local) = name.strip_prefix(lfn::NS) {
            return Function::from_lfn_name(local);
        }
        let f = match name.to_ascii_uppercase().as_str() {
            "BOUND" => Function::Bound,
            "IF" => Function::If,
            "COALESCE" => Function::Coalesce,
            "SAMETERM" => Function::SameTerm,
            "ISIRI" | "ISURI" => Function::IsIri,
            "ISBLANK" => Function::IsBlank,
            "ISLITERAL" => Function::IsLiteral,
            "ISNUMERIC" => Function::IsNumeric,
            "ISTRIPLE" => Function::IsTriple,
            "STR" => Function::Str,
            "LANG" => Function::Lang,
            "LANGMATCHES" => Function::LangMatches,
            "DATATYPE" => Function::Datatype,
            "IRI" | "URI" => Function::Iri,
            "BNODE" => Function::Bnode,
            "STRDT" => Function::StrDt,
            "STRLANG" => Function::StrLang,
            "UUID" => Function::Uuid,
            "STRUUID" => Function::StrUuid,
            "STRLEN" => Function::StrLen,
            "SUBSTR" => Function::SubStr,
            "UCASE" => Function::UCase,
            "LCASE" => Function::LCase,
            "STRSTARTS" => Function::StrStarts,
            "STRENDS" => Function::StrEnds,
            "CONTAINS" => Function::Contains,
            "STRBEFORE" => Function::StrBefore,
            "STRAFTER" => Function::StrAfter,
            "ENCODE_FOR_URI" => Function::EncodeForUri,
            "CONCAT" => Function::Concat,
            "REPLACE" => Function::Replace,
            "REGEX" => Function::Regex,
            "ABS" => Function::Abs,
            "ROUND" => Function::Round,
            "CEIL" => Function::Ceil,
            "FLOOR" => Function::Floor,
            "NOW" => Function::Now,
            "YEAR" => Function::Year,
            "MONTH" => Function::Month,
            "DAY" => Function::Day,
            "HOURS" => Function::Hours,
            "MINUTES" => Function::Minutes,
            "SECONDS" => Function::Seconds,
            "TIMEZONE" => Function::Timezone,
            "TZ" => Function::Tz,
            "MD5" => Function::Md5,
            "SHA1" => Function::Sha1,
            "SHA256" => Function::Sha256,
            "SHA384" => Function::Sha384,
            "SHA512" => Function::Sha512,
            "TRIPLE" => Function::Triple,
            "SUBJECT" => Function::Subject,
            "PREDICATE" => Function::Predicate,
            "OBJECT" => Function::Object,
            _ => return None,
        };
        Some(f)
    }

    /// Look up an `lfn:` function by local name
    fn from_lfn_name(local: &str) -> Option<Function> {
        let (base, inverse) = match local.strip_suffix("-1") {
            Some(base) => (base, true),
            None => (local, false),
        };
        let trig = match base {
            "sin" => Some(Trig::Sin),
            "cos" => Some(Trig::Cos),
            "tan" => Some(Trig::Tan),
            "sec" => Some(Trig::Sec),
            "cosec" => Some(Trig::Cosec),
            "cotan" => Some(Trig::Cotan),
            _ => None,
        };
        if let Some(trig) = trig {
            return Some(Function::Trig(trig, inverse));
        }
        let f = match local {
            "degrees-to-radians" => Function::DegreesToRadians,
            "radians-to-degrees" => Function::RadiansToDegrees,
            "log" => Function::Log,
            "ln" => Function::Ln,
            "e" => Function::Exp,
            "ten" => Function::Ten,
            "pow" => Function::Pow,
            "sq" => Function::Square,
            "cube" => Function::Cube,
            "sqrt" => Function::Sqrt,
            "root" => Function::Root,
            "pythagoras" => Function::Pythagoras,
            "cartesian" => Function::Cartesian,
            "factorial" => Function::Factorial,
            "reciprocal" => Function::Reciprocal,
            "rnd" => Function::RandomIn,
            "md5hash" => Function::Md5,
            "sha256hash" => Function::Sha256,
            _ => return None,
        };
        Some(f)
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Bound => "BOUND",
            Function::If => "IF",
            Function::Coalesce => "COALESCE",
            Function::SameTerm => "SAMETERM",
            Function::IsIri => "isIRI",
            Function::IsBlank => "isBLANK",
            Function::IsLiteral => "isLITERAL",
            Function::IsNumeric => "isNUMERIC",
            Function::IsTriple => "isTRIPLE",
            Function::Str => "STR",
            Function::Lang => "LANG",
            Function::LangMatches => "LANGMATCHES",
            Function::Datatype => "DATATYPE",
            Function::Iri => "IRI",
            Function::Bnode => "BNODE",
            Function::StrDt => "STRDT",
            Function::StrLang => "STRLANG",
            Function::Uuid => "UUID",
            Function::StrUuid => "STRUUID",
            Function::StrLen => "STRLEN",
            Function::SubStr => "SUBSTR",
            Function::UCase => "UCASE",
            Function::LCase => "LCASE",
            Function::StrStarts => "STRSTARTS",
            Function::StrEnds => "STRENDS",
            Function::Contains => "CONTAINS",
            Function::StrBefore => "STRBEFORE",
            Function::StrAfter => "STRAFTER",
            Function::EncodeForUri => "ENCODE_FOR_URI",
            Function::Concat => "CONCAT",
            Function::Replace => "REPLACE",
            Function::Regex => "REGEX",
            Function::Abs => "ABS",
            Function::Round => "ROUND",
            Function::Ceil => "CEIL",
            Function::Floor => "FLOOR",
            Function::Now => "NOW",
            Function::Year => "YEAR",
            Function::Month => "MONTH",
            Function::Day => "DAY",
            Function::Hours => "HOURS",
            Function::Minutes => "MINUTES",
            Function::Seconds => "SECONDS",
            Function::Timezone => "TIMEZONE",
            Function::Tz => "TZ",
            Function::Md5 => "MD5",
            Function::Sha1 => "SHA1",
            Function::Sha256 => "SHA256",
            Function::Sha384 => "SHA384",
            Function::Sha512 => "SHA512",
            Function::Triple => "TRIPLE",
            Function::Subject => "SUBJECT",
            Function::Predicate => "PREDICATE",
            Function::Object => "OBJECT",
            Function::Trig(trig, inverse) => match (trig, inverse) {
                (Trig::Sin, false) => "sin",
                (Trig::Sin, true) => "sin-1",
                (Trig::Cos, false) => "cos",
                (Trig::Cos, true) => "cos-1",
                (Trig::Tan, false) => "tan",
                (Trig::Tan, true) => "tan-1",
                (Trig::Sec, false) => "sec",
                (Trig::Sec, true) => "sec-1",
                (Trig::Cosec, false) => "cosec",
                (Trig::Cosec, true) => "cosec-1",
                (Trig::Cotan, false) => "cotan",
                (Trig::Cotan, true) => "cotan-1",
            },
            Function::DegreesToRadians => "degrees-to-radians",
            Function::RadiansToDegrees => "radians-to-degrees",
            Function::Log => "log",
            Function::Ln => "ln",
            Function::Exp => "e",
            Function::Ten => "ten",
            Function::Pow => "pow",
            Function::Square => "sq",
            Function::Cube => "cube",
            Function::Sqrt => "sqrt",
            Function::Root => "root",
            Function::Pythagoras => "pythagoras",
            Function::Cartesian => "cartesian",
            Function::Factorial => "factorial",
            Function::Reciprocal => "reciprocal",
            Function::RandomIn => "rnd",
            Function::Cast(_) => "CAST",
        }
    }
}

/// Custom scalar function
///
/// Arguments are evaluated before the call; an error in any argument is the
/// error of the call.
pub trait ExtensionFunction: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn call(&self, args: &[ValuedNode]) -> ExprResult<ValuedNode>;
}

/// Custom algebra operator
///
/// Operators the engine has no strategy for surface as
/// `QueryError::UnsupportedOperator` unless they override `evaluate`.
pub trait ExtensionOperator: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>) -> Result<Multiset> {
        Err(QueryError::UnsupportedOperator(self.name().to_string()))
    }
}

/// Scalar expression
#[derive(Clone, Debug)]
pub enum Expression {
    Var(Var),
    Const(Term),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),
    Compare(CompareOp, Box<Expression>, Box<Expression>),
    Arithmetic(ArithmeticOp, Box<Expression>, Box<Expression>),
    Negate(Box<Expression>),
    UnaryPlus(Box<Expression>),
    In {
        expr: Box<Expression>,
        list: Vec<Expression>,
        negated: bool,
    },
    Call(Function, Vec<Expression>),
    /// `EXISTS { pattern }` / `NOT EXISTS { pattern }`
    Exists {
        id: ExprId,
        pattern: Box<Algebra>,
        negated: bool,
    },
    Rand {
        id: ExprId,
    },
    Aggregate(Box<Aggregate>),
    Extension {
        function: Arc<dyn ExtensionFunction>,
        args: Vec<Expression>,
    },
}

impl Expression {
    pub fn var(name: &str) -> Self {
        Expression::Var(Var::new(name))
    }

    pub fn constant(term: Term) -> Self {
        Expression::Const(term)
    }

    pub fn and(a: Expression, b: Expression) -> Self {
        Expression::And(Box::new(a), Box::new(b))
    }

    pub fn or(a: Expression, b: Expression) -> Self {
        Expression::Or(Box::new(a), Box::new(b))
    }

    pub fn not(e: Expression) -> Self {
        Expression::Not(Box::new(e))
    }

    pub fn compare(op: CompareOp, a: Expression, b: Expression) -> Self {
        Expression::Compare(op, Box::new(a), Box::new(b))
    }

    pub fn arithmetic(op: ArithmeticOp, a: Expression, b: Expression) -> Self {
        Expression::Arithmetic(op, Box::new(a), Box::new(b))
    }

    pub fn call(function: Function, args: Vec<Expression>) -> Self {
        Expression::Call(function, args)
    }

    pub fn exists(pattern: Algebra) -> Self {
        Expression::Exists {
            id: ExprId::fresh(),
            pattern: Box::new(pattern),
            negated: false,
        }
    }

    pub fn not_exists(pattern: Algebra) -> Self {
        Expression::Exists {
            id: ExprId::fresh(),
            pattern: Box::new(pattern),
            negated: true,
        }
    }

    pub fn rand() -> Self {
        Expression::Rand { id: ExprId::fresh() }
    }

    pub fn aggregate(aggregate: Aggregate) -> Self {
        Expression::Aggregate(Box::new(aggregate))
    }

    /// Variables referenced outside of EXISTS patterns and aggregates
    pub fn vars(&self) -> Vec<Var> {
        let mut out = Vec::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut Vec<Var>) {
        match self {
            Expression::Var(v) => {
                if !out.contains(v) {
                    out.push(v.clone());
                }
            }
            Expression::And(a, b)
            | Expression::Or(a, b)
            | Expression::Compare(_, a, b)
            | Expression::Arithmetic(_, a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
            Expression::Not(e) | Expression::Negate(e) | Expression::UnaryPlus(e) => {
                e.collect_vars(out)
            }
            Expression::In { expr, list, .. } => {
                expr.collect_vars(out);
                list.iter().for_each(|e| e.collect_vars(out));
            }
            Expression::Call(_, args) | Expression::Extension { args, .. } => {
                args.iter().for_each(|e| e.collect_vars(out));
            }
            Expression::Const(_)
            | Expression::Exists { .. }
            | Expression::Rand { .. }
            | Expression::Aggregate(_) => {}
        }
    }
}

/// Aggregate function kinds
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Sample,
    GroupConcat { separator: String },
    /// GROUP_CONCAT restricted to string literals
    StringJoin { separator: String },
    Median,
    Mode,
    NumericMin,
    NumericMax,
    /// True when the argument is true for every row
    All,
    /// True when the argument is true for some row
    Any,
    /// True when the argument is true for no row
    NoneOf,
}

impl AggregateFunction {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::Sample => "SAMPLE",
            AggregateFunction::GroupConcat { .. } => "GROUP_CONCAT",
            AggregateFunction::StringJoin { .. } => "STRING_JOIN",
            AggregateFunction::Median => "MEDIAN",
            AggregateFunction::Mode => "MODE",
            AggregateFunction::NumericMin => "NMIN",
            AggregateFunction::NumericMax => "NMAX",
            AggregateFunction::All => "ALL",
            AggregateFunction::Any => "ANY",
            AggregateFunction::NoneOf => "NONE",
        }
    }
}

/// Aggregate argument
#[derive(Clone, Debug)]
pub enum AggregateArg {
    /// `*`, only meaningful for COUNT
    Star,
    Expr(Expression),
}

/// One aggregate call
#[derive(Clone, Debug)]
pub struct Aggregate {
    pub function: AggregateFunction,
    pub arg: AggregateArg,
    pub distinct: bool,
}

impl Aggregate {
    pub fn new(function: AggregateFunction, arg: Expression) -> Self {
        Self {
            function,
            arg: AggregateArg::Expr(arg),
            distinct: false,
        }
    }

    pub fn count_star() -> Self {
        Self {
            function: AggregateFunction::Count,
            arg: AggregateArg::Star,
            distinct: false,
        }
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}

/// GROUP BY key, optionally bound to a variable (`GROUP BY (?x + 1 AS ?y)`)
#[derive(Clone, Debug)]
pub struct GroupKey {
    pub expr: Expression,
    pub alias: Option<Var>,
}

impl GroupKey {
    pub fn var(name: &str) -> Self {
        Self {
            expr: Expression::var(name),
            alias: None,
        }
    }

    /// Variable the key value is bound to in the grouped output
    pub fn output_var(&self) -> Option<&Var> {
        match (&self.alias, &self.expr) {
            (Some(v), _) => Some(v),
            (None, Expression::Var(v)) => Some(v),
            _ => None,
        }
    }
}

/// ORDER BY condition
#[derive(Clone, Debug)]
pub struct OrderCondition {
    pub expr: Expression,
    pub descending: bool,
}

impl OrderCondition {
    pub fn asc(expr: Expression) -> Self {
        Self {
            expr,
            descending: false,
        }
    }

    pub fn desc(expr: Expression) -> Self {
        Self {
            expr,
            descending: true,
        }
    }
}

/// Algebra operator tree
#[derive(Clone, Debug)]
pub enum Algebra {
    /// Basic graph pattern; empty is the identity pattern
    Bgp(Vec<TriplePattern>),
    Join(Box<Algebra>, Box<Algebra>),
    LeftJoin {
        left: Box<Algebra>,
        right: Box<Algebra>,
        filter: Option<Expression>,
    },
    Minus(Box<Algebra>, Box<Algebra>),
    Union(Box<Algebra>, Box<Algebra>),
    Filter {
        inner: Box<Algebra>,
        expr: Expression,
    },
    Extend {
        inner: Box<Algebra>,
        var: Var,
        expr: Expression,
    },
    Graph {
        graph: PatternTerm,
        inner: Box<Algebra>,
    },
    GroupBy {
        inner: Box<Algebra>,
        keys: Vec<GroupKey>,
        aggregates: Vec<(Var, Aggregate)>,
    },
    Having {
        inner: Box<Algebra>,
        expr: Expression,
    },
    OrderBy {
        inner: Box<Algebra>,
        conditions: Vec<OrderCondition>,
    },
    Distinct(Box<Algebra>),
    Reduced(Box<Algebra>),
    /// `offset <= 0` and `limit < 0` mean unset
    Slice {
        inner: Box<Algebra>,
        offset: i64,
        limit: i64,
    },
    /// `vars: None` is `SELECT *`
    Select {
        inner: Box<Algebra>,
        vars: Option<Vec<Var>>,
    },
    Service {
        endpoint: PatternTerm,
        inner: Box<Algebra>,
        silent: bool,
    },
    /// Inline data; `None` cells are UNDEF
    Values {
        vars: Vec<Var>,
        rows: Vec<Vec<Option<Term>>>,
    },
    Path {
        subject: PatternTerm,
        path: PropertyPath,
        object: PatternTerm,
    },
    /// Identity when the inner pattern has a solution, else Null
    Ask(Box<Algebra>),
    /// Identity when the active graph holds any triple, else Null
    AskAnyTriples,
    /// Union that skips the right side once the left has a solution
    AskUnion(Box<Algebra>, Box<Algebra>),
    /// Nested query evaluated in a fresh context
    SubQuery(Box<Algebra>),
    /// One solution per named graph, bound to `var`
    SelectDistinctGraphs {
        var: Var,
    },
    Unknown(Arc<dyn ExtensionOperator>),
}

impl Algebra {
    /// The empty BGP
    pub fn identity() -> Self {
        Algebra::Bgp(Vec::new())
    }

    pub fn bgp(patterns: Vec<TriplePattern>) -> Self {
        Algebra::Bgp(patterns)
    }

    pub fn join(left: Algebra, right: Algebra) -> Self {
        Algebra::Join(Box::new(left), Box::new(right))
    }

    pub fn left_join(left: Algebra, right: Algebra, filter: Option<Expression>) -> Self {
        Algebra::LeftJoin {
            left: Box::new(left),
            right: Box::new(right),
            filter,
        }
    }

    pub fn minus(left: Algebra, right: Algebra) -> Self {
        Algebra::Minus(Box::new(left), Box::new(right))
    }

    pub fn union(left: Algebra, right: Algebra) -> Self {
        Algebra::Union(Box::new(left), Box::new(right))
    }

    pub fn filter(inner: Algebra, expr: Expression) -> Self {
        Algebra::Filter {
            inner: Box::new(inner),
            expr,
        }
    }

    pub fn extend(inner: Algebra, var: &str, expr: Expression) -> Self {
        Algebra::Extend {
            inner: Box::new(inner),
            var: Var::new(var),
            expr,
        }
    }

    pub fn graph(graph: impl Into<PatternTerm>, inner: Algebra) -> Self {
        Algebra::Graph {
            graph: graph.into(),
            inner: Box::new(inner),
        }
    }

    pub fn group_by(inner: Algebra, keys: Vec<GroupKey>, aggregates: Vec<(Var, Aggregate)>) -> Self {
        Algebra::GroupBy {
            inner: Box::new(inner),
            keys,
            aggregates,
        }
    }

    pub fn having(inner: Algebra, expr: Expression) -> Self {
        Algebra::Having {
            inner: Box::new(inner),
            expr,
        }
    }

    pub fn order_by(inner: Algebra, conditions: Vec<OrderCondition>) -> Self {
        Algebra::OrderBy {
            inner: Box::new(inner),
            conditions,
        }
    }

    pub fn distinct(inner: Algebra) -> Self {
        Algebra::Distinct(Box::new(inner))
    }

    pub fn slice(inner: Algebra, offset: i64, limit: i64) -> Self {
        Algebra::Slice {
            inner: Box::new(inner),
            offset,
            limit,
        }
    }

    pub fn select(inner: Algebra, vars: Option<Vec<Var>>) -> Self {
        Algebra::Select {
            inner: Box::new(inner),
            vars,
        }
    }

    pub fn service(endpoint: impl Into<PatternTerm>, inner: Algebra, silent: bool) -> Self {
        Algebra::Service {
            endpoint: endpoint.into(),
            inner: Box::new(inner),
            silent,
        }
    }

    pub fn ask(inner: Algebra) -> Self {
        Algebra::Ask(Box::new(inner))
    }

    /// Operator name for logs and spans
    pub fn name(&self) -> &'static str {
        match self {
            Algebra::Bgp(_) => "bgp",
            Algebra::Join(..) => "join",
            Algebra::LeftJoin { .. } => "left_join",
            Algebra::Minus(..) => "minus",
            Algebra::Union(..) => "union",
            Algebra::Filter { .. } => "filter",
            Algebra::Extend { .. } => "extend",
            Algebra::Graph { .. } => "graph",
            Algebra::GroupBy { .. } => "group_by",
            Algebra::Having { .. } => "having",
            Algebra::OrderBy { .. } => "order_by",
            Algebra::Distinct(_) => "distinct",
            Algebra::Reduced(_) => "reduced",
            Algebra::Slice { .. } => "slice",
            Algebra::Select { .. } => "select",
            Algebra::Service { .. } => "service",
            Algebra::Values { .. } => "values",
            Algebra::Path { .. } => "path",
            Algebra::Ask(_) => "ask",
            Algebra::AskAnyTriples => "ask_any_triples",
            Algebra::AskUnion(..) => "ask_union",
            Algebra::SubQuery(_) => "subquery",
            Algebra::SelectDistinctGraphs { .. } => "select_distinct_graphs",
            Algebra::Unknown(_) => "unknown",
        }
    }

    /// Whether this is the empty BGP
    pub fn is_identity(&self) -> bool {
        matches!(self, Algebra::Bgp(patterns) if patterns.is_empty())
    }

    /// Variables that may be bound by solutions of this operator
    pub fn variables(&self) -> Vec<Var> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut Vec<Var>) {
        let add = |v: &Var, out: &mut Vec<Var>| {
            if !out.contains(v) {
                out.push(v.clone());
            }
        };
        match self {
            Algebra::Bgp(patterns) => {
                for v in patterns.iter().flat_map(|p| p.vars()) {
                    add(&v, out);
                }
            }
            Algebra::Join(a, b)
            | Algebra::Union(a, b)
            | Algebra::AskUnion(a, b)
            | Algebra::LeftJoin { left: a, right: b, .. } => {
                a.collect_variables(out);
                b.collect_variables(out);
            }
            Algebra::Minus(a, _) => a.collect_variables(out),
            Algebra::Filter { inner, .. }
            | Algebra::Having { inner, .. }
            | Algebra::OrderBy { inner, .. }
            | Algebra::Distinct(inner)
            | Algebra::Reduced(inner)
            | Algebra::Slice { inner, .. }
            | Algebra::Service { inner, .. }
            | Algebra::SubQuery(inner) => inner.collect_variables(out),
            Algebra::Extend { inner, var, .. } => {
                inner.collect_variables(out);
                add(var, out);
            }
            Algebra::Graph { graph, inner } => {
                if let Some(v) = graph.as_var() {
                    add(v, out);
                }
                inner.collect_variables(out);
            }
            Algebra::GroupBy {
                keys, aggregates, ..
            } => {
                for v in keys.iter().filter_map(GroupKey::output_var) {
                    add(v, out);
                }
                for (v, _) in aggregates {
                    add(v, out);
                }
            }
            Algebra::Select { inner, vars } => match vars {
                Some(vars) => vars.iter().for_each(|v| add(v, out)),
                None => inner.collect_variables(out),
            },
            Algebra::Values { vars, .. } => vars.iter().for_each(|v| add(v, out)),
            Algebra::Path {
                subject, object, ..
            } => {
                for v in [subject, object].into_iter().filter_map(PatternTerm::as_var) {
                    add(v, out);
                }
            }
            Algebra::SelectDistinctGraphs { var } => add(var, out),
            Algebra::Ask(_) | Algebra::AskAnyTriples | Algebra::Unknown(_) => {}
        }
    }
}
