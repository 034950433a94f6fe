//! RDF Vocabulary Constants for Rill
//!
//! This crate provides a centralized location for the RDF vocabulary IRIs used
//! by the Rill SPARQL evaluation engine.
//!
//! # Organization
//!
//! Constants are organized by vocabulary:
//! - `rdf` - RDF vocabulary (http://www.w3.org/1999/02/22-rdf-syntax-ns#)
//! - `xsd` - XSD vocabulary (http://www.w3.org/2001/XMLSchema#)
//! - `lfn` - extended math function namespace (http://www.dotnetrdf.org/leviathan#)
//! - `blank` - blank node label conventions

/// RDF vocabulary constants
pub mod rdf {
    /// rdf:langString IRI
    pub const LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
}

/// XSD vocabulary constants
pub mod xsd {
    /// xsd:string IRI
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

    /// xsd:integer IRI
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";

    /// xsd:long IRI
    pub const LONG: &str = "http://www.w3.org/2001/XMLSchema#long";

    /// xsd:int IRI
    pub const INT: &str = "http://www.w3.org/2001/XMLSchema#int";

    /// xsd:short IRI
    pub const SHORT: &str = "http://www.w3.org/2001/XMLSchema#short";

    /// xsd:byte IRI
    pub const BYTE: &str = "http://www.w3.org/2001/XMLSchema#byte";

    /// xsd:unsignedLong IRI
    pub const UNSIGNED_LONG: &str = "http://www.w3.org/2001/XMLSchema#unsignedLong";

    /// xsd:unsignedInt IRI
    pub const UNSIGNED_INT: &str = "http://www.w3.org/2001/XMLSchema#unsignedInt";

    /// xsd:unsignedShort IRI
    pub const UNSIGNED_SHORT: &str = "http://www.w3.org/2001/XMLSchema#unsignedShort";

    /// xsd:unsignedByte IRI
    pub const UNSIGNED_BYTE: &str = "http://www.w3.org/2001/XMLSchema#unsignedByte";

    /// xsd:nonNegativeInteger IRI
    pub const NON_NEGATIVE_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#nonNegativeInteger";

    /// xsd:positiveInteger IRI
    pub const POSITIVE_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#positiveInteger";

    /// xsd:nonPositiveInteger IRI
    pub const NON_POSITIVE_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#nonPositiveInteger";

    /// xsd:negativeInteger IRI
    pub const NEGATIVE_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#negativeInteger";

    /// xsd:decimal IRI
    pub const DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";

    /// xsd:float IRI
    pub const FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";

    /// xsd:double IRI
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";

    /// xsd:boolean IRI
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";

    /// xsd:dateTime IRI
    pub const DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

    /// xsd:date IRI
    pub const DATE: &str = "http://www.w3.org/2001/XMLSchema#date";

    /// xsd:time IRI
    pub const TIME: &str = "http://www.w3.org/2001/XMLSchema#time";

    /// xsd:dayTimeDuration IRI
    pub const DAY_TIME_DURATION: &str = "http://www.w3.org/2001/XMLSchema#dayTimeDuration";

    /// xsd:anyURI IRI
    pub const ANY_URI: &str = "http://www.w3.org/2001/XMLSchema#anyURI";

    /// xsd:normalizedString IRI
    pub const NORMALIZED_STRING: &str = "http://www.w3.org/2001/XMLSchema#normalizedString";

    /// xsd:token IRI
    pub const TOKEN: &str = "http://www.w3.org/2001/XMLSchema#token";

    /// xsd:language IRI
    pub const LANGUAGE: &str = "http://www.w3.org/2001/XMLSchema#language";

    // ========================================================================
    // Datatype Family Helpers
    // ========================================================================

    /// Check if a datatype IRI is an integer-family type
    #[inline]
    pub fn is_integer_family(datatype_iri: &str) -> bool {
        matches!(
            datatype_iri,
            INTEGER
                | LONG
                | INT
                | SHORT
                | BYTE
                | UNSIGNED_LONG
                | UNSIGNED_INT
                | UNSIGNED_SHORT
                | UNSIGNED_BYTE
                | NON_NEGATIVE_INTEGER
                | POSITIVE_INTEGER
                | NON_POSITIVE_INTEGER
                | NEGATIVE_INTEGER
        )
    }

    /// Check if a datatype IRI is a numeric type
    #[inline]
    pub fn is_numeric_datatype(datatype_iri: &str) -> bool {
        is_integer_family(datatype_iri) || matches!(datatype_iri, DECIMAL | FLOAT | DOUBLE)
    }

    /// Check if a datatype IRI is a string-like type
    ///
    /// `rdf:langString` is included: language-tagged literals compare on their
    /// lexical value like plain strings.
    #[inline]
    pub fn is_string_like(datatype_iri: &str) -> bool {
        matches!(
            datatype_iri,
            STRING | NORMALIZED_STRING | TOKEN | LANGUAGE | super::rdf::LANG_STRING
        )
    }

    /// Canonical datatype used for value comparison, or `None` when the
    /// datatype has no defined SPARQL operator mapping.
    ///
    /// Integer subtypes collapse to `xsd:integer` and string-like types to
    /// `xsd:string`.
    pub fn supported_datatype(datatype_iri: &str) -> Option<&'static str> {
        if is_integer_family(datatype_iri) {
            return Some(INTEGER);
        }
        if is_string_like(datatype_iri) {
            return Some(STRING);
        }
        match datatype_iri {
            DECIMAL => Some(DECIMAL),
            FLOAT => Some(FLOAT),
            DOUBLE => Some(DOUBLE),
            BOOLEAN => Some(BOOLEAN),
            DATE_TIME => Some(DATE_TIME),
            DATE => Some(DATE),
            TIME => Some(TIME),
            ANY_URI => Some(ANY_URI),
            _ => None,
        }
    }

    /// Common comparison datatype for two distinct supported datatypes.
    ///
    /// Only `xsd:date` and `xsd:dateTime` are mutually compatible; they
    /// compare as dateTime.
    pub fn compatible_datatype(x: &str, y: &str) -> Option<&'static str> {
        match (supported_datatype(x)?, supported_datatype(y)?) {
            (a, b) if a == b => Some(a),
            (DATE, DATE_TIME) | (DATE_TIME, DATE) => Some(DATE_TIME),
            _ => None,
        }
    }
}

/// Extended function namespace
///
/// Trigonometric, logarithmic and other numeric functions are called by IRI
/// in this namespace, e.g. `lfn:sin` or `lfn:cos-1` for the inverse.
pub mod lfn {
    pub const NS: &str = "http://www.dotnetrdf.org/leviathan#";
}

/// Blank node label conventions
pub mod blank {
    /// Prefix for labels minted by the evaluation engine's allocator
    pub const GENERATED_PREFIX: &str = "rillb";
}
