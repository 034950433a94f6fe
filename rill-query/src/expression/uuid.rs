//! UUID function implementations
//!
//! Implements SPARQL UUID functions: UUID, STRUUID

use crate::value::ValuedNode;
use rill_core::Term;
use ::uuid::Uuid;

/// Fresh `urn:uuid:` IRI
pub fn uuid() -> ValuedNode {
    ValuedNode::new(Term::iri(format!("urn:uuid:{}", Uuid::new_v4())))
}

pub fn struuid() -> ValuedNode {
    ValuedNode::string(Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_is_iri() {
        let v = uuid();
        let iri = v.term().as_iri().unwrap();
        assert!(iri.starts_with("urn:uuid:"));
        assert_eq!(iri.len(), "urn:uuid:".len() + 36);
        assert_ne!(uuid(), uuid());
    }

    #[test]
    fn test_struuid_is_simple_literal() {
        let v = struuid();
        let lit = v.as_literal().unwrap();
        assert!(lit.is_simple());
        assert!(Uuid::parse_str(lit.lexical()).is_ok());
    }
}
