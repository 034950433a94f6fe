//! RDF terms
//!
//! `Term` is the immutable value type flowing through the engine: solutions map
//! variables to terms, datasets return triples of terms, and expressions
//! produce terms wrapped in a typed view.
//!
//! ## Node ordering
//!
//! `Ord` on `Term` is the raw node ordering: blank nodes < IRIs < literals <
//! triple terms, then lexical comparison within a kind. It is consistent with
//! RDF term equality and is the fallback when no value ordering is defined.

use rill_vocab::{rdf, xsd};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Kind of RDF node, in raw node order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    BlankNode,
    Iri,
    Literal,
    Triple,
}

/// An RDF literal
///
/// Language-tagged literals carry `rdf:langString` as their datatype; simple
/// literals carry `xsd:string`. Language tags are stored lowercased.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    lexical: Arc<str>,
    datatype: Arc<str>,
    language: Option<Arc<str>>,
}

impl Literal {
    /// Simple literal (`xsd:string`)
    pub fn string(lexical: impl Into<Arc<str>>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: Arc::from(xsd::STRING),
            language: None,
        }
    }

    /// Typed literal
    pub fn typed(lexical: impl Into<Arc<str>>, datatype: impl Into<Arc<str>>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: datatype.into(),
            language: None,
        }
    }

    /// Language-tagged literal (`rdf:langString`)
    pub fn lang_string(lexical: impl Into<Arc<str>>, language: &str) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: Arc::from(rdf::LANG_STRING),
            language: Some(Arc::from(language.to_ascii_lowercase())),
        }
    }

    pub fn integer(value: i64) -> Self {
        Self::typed(value.to_string(), xsd::INTEGER)
    }

    pub fn boolean(value: bool) -> Self {
        Self::typed(if value { "true" } else { "false" }, xsd::BOOLEAN)
    }

    pub fn double(value: f64) -> Self {
        Self::typed(canonical_double(value), xsd::DOUBLE)
    }

    pub fn float(value: f32) -> Self {
        Self::typed(canonical_double(value as f64), xsd::FLOAT)
    }

    /// Decimal literal from an already canonical lexical form
    pub fn decimal(lexical: impl Into<Arc<str>>) -> Self {
        Self::typed(lexical, xsd::DECIMAL)
    }

    pub fn lexical(&self) -> &str {
        &self.lexical
    }

    pub fn datatype(&self) -> &str {
        &self.datatype
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// `xsd:string` with no language tag
    pub fn is_simple(&self) -> bool {
        self.language.is_none() && &*self.datatype == xsd::STRING
    }

    /// Simple literal or language-tagged string
    pub fn is_string(&self) -> bool {
        self.is_simple() || self.language.is_some()
    }
}

/// Canonical XSD double lexical form (`1.5E0`, `INF`, `-INF`, `NaN`)
pub fn canonical_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "INF".to_string()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        format!("{:E}", value)
    }
}

/// An RDF triple; also the payload of a triple term
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

/// An RDF node
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    Iri(Arc<str>),
    BlankNode(Arc<str>),
    Literal(Literal),
    Triple(Arc<Triple>),
}

impl Term {
    pub fn iri(iri: impl Into<Arc<str>>) -> Self {
        Term::Iri(iri.into())
    }

    pub fn blank(label: impl Into<Arc<str>>) -> Self {
        Term::BlankNode(label.into())
    }

    pub fn string(lexical: impl Into<Arc<str>>) -> Self {
        Term::Literal(Literal::string(lexical))
    }

    pub fn typed(lexical: impl Into<Arc<str>>, datatype: impl Into<Arc<str>>) -> Self {
        Term::Literal(Literal::typed(lexical, datatype))
    }

    pub fn lang_string(lexical: impl Into<Arc<str>>, language: &str) -> Self {
        Term::Literal(Literal::lang_string(lexical, language))
    }

    pub fn integer(value: i64) -> Self {
        Term::Literal(Literal::integer(value))
    }

    pub fn boolean(value: bool) -> Self {
        Term::Literal(Literal::boolean(value))
    }

    pub fn double(value: f64) -> Self {
        Term::Literal(Literal::double(value))
    }

    pub fn triple(subject: Term, predicate: Term, object: Term) -> Self {
        Term::Triple(Arc::new(Triple::new(subject, predicate, object)))
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Term::Iri(_) => NodeKind::Iri,
            Term::BlankNode(_) => NodeKind::BlankNode,
            Term::Literal(_) => NodeKind::Literal,
            Term::Triple(_) => NodeKind::Triple,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    pub fn as_triple(&self) -> Option<&Triple> {
        match self {
            Term::Triple(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri(_))
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Term::BlankNode(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }

    /// Lexical form: IRI text, blank label, literal lexical form, or the
    /// N-Triples rendering of a triple term.
    pub fn lexical(&self) -> String {
        match self {
            Term::Iri(iri) => iri.to_string(),
            Term::BlankNode(label) => label.to_string(),
            Term::Literal(lit) => lit.lexical().to_string(),
            Term::Triple(t) => t.to_string(),
        }
    }
}

impl Ord for Term {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Term::Iri(a), Term::Iri(b)) => a.cmp(b),
            (Term::BlankNode(a), Term::BlankNode(b)) => a.cmp(b),
            (Term::Literal(a), Term::Literal(b)) => a
                .lexical()
                .cmp(b.lexical())
                .then_with(|| a.language().cmp(&b.language()))
                .then_with(|| a.datatype().cmp(b.datatype())),
            (Term::Triple(a), Term::Triple(b)) => a
                .subject
                .cmp(&b.subject)
                .then_with(|| a.predicate.cmp(&b.predicate))
                .then_with(|| a.object.cmp(&b.object)),
            _ => self.kind().cmp(&other.kind()),
        }
    }
}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::BlankNode(label) => write!(f, "_:{}", label),
            Term::Literal(lit) => {
                write!(f, "\"{}\"", lit.lexical().escape_default())?;
                if let Some(lang) = lit.language() {
                    write!(f, "@{}", lang)
                } else if lit.datatype() != xsd::STRING {
                    write!(f, "^^<{}>", lit.datatype())
                } else {
                    Ok(())
                }
            }
            Term::Triple(t) => write!(f, "<< {} >>", t),
        }
    }
}

impl From<Literal> for Term {
    fn from(lit: Literal) -> Self {
        Term::Literal(lit)
    }
}
