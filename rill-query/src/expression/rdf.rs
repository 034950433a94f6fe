//! RDF term functions
//!
//! Term tests (isIRI, isBLANK, isLITERAL, isNUMERIC, isTRIPLE), accessors
//! (STR, LANG, DATATYPE, LANGMATCHES), constructors (IRI, BNODE, STRDT,
//! STRLANG) and the RDF-star triple functions.

use super::helpers::plain_string;
use crate::context::EvaluationContext;
use crate::error::{ExprResult, ExpressionError};
use crate::value::ValuedNode;
use rill_core::Term;
use rill_vocab::rdf;

pub fn is_iri(arg: &ValuedNode) -> ValuedNode {
    ValuedNode::boolean(arg.term().is_iri())
}

pub fn is_blank(arg: &ValuedNode) -> ValuedNode {
    ValuedNode::boolean(arg.term().is_blank())
}

pub fn is_literal(arg: &ValuedNode) -> ValuedNode {
    ValuedNode::boolean(arg.term().is_literal())
}

pub fn is_numeric(arg: &ValuedNode) -> ValuedNode {
    ValuedNode::boolean(arg.is_numeric())
}

pub fn is_triple(arg: &ValuedNode) -> ValuedNode {
    ValuedNode::boolean(arg.term().as_triple().is_some())
}

pub fn same_term(a: &ValuedNode, b: &ValuedNode) -> ValuedNode {
    ValuedNode::boolean(a.term() == b.term())
}

pub fn str(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    match arg.term() {
        Term::Iri(iri) => Ok(ValuedNode::string(iri.clone())),
        Term::Literal(lit) => Ok(ValuedNode::string(lit.lexical())),
        other => Err(ExpressionError::type_mismatch(
            "STR",
            format!("{} has no string form", other),
        )),
    }
}

pub fn lang(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    match arg.as_literal() {
        Some(lit) => Ok(ValuedNode::string(lit.language().unwrap_or(""))),
        None => Err(ExpressionError::type_mismatch(
            "LANG",
            format!("{} is not a literal", arg.term()),
        )),
    }
}

/// Basic language range matching (RFC 4647 §3.3.1)
pub fn lang_matches(tag: &ValuedNode, range: &ValuedNode) -> ExprResult<ValuedNode> {
    let tag = plain_string(tag, "LANGMATCHES")?.to_ascii_lowercase();
    let range = plain_string(range, "LANGMATCHES")?.to_ascii_lowercase();
    let matches = if range == "*" {
        !tag.is_empty()
    } else {
        tag == range
            || (tag.len() > range.len()
                && tag.starts_with(&range)
                && tag.as_bytes()[range.len()] == b'-')
    };
    Ok(ValuedNode::boolean(matches))
}

pub fn datatype(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    match arg.as_literal() {
        Some(lit) if lit.language().is_some() => Ok(ValuedNode::new(Term::iri(rdf::LANG_STRING))),
        Some(lit) => Ok(ValuedNode::new(Term::iri(lit.datatype()))),
        None => Err(ExpressionError::type_mismatch(
            "DATATYPE",
            format!("{} is not a literal", arg.term()),
        )),
    }
}

pub fn iri(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    match arg.term() {
        Term::Iri(_) => Ok(arg.clone()),
        _ => {
            let lexical = plain_string(arg, "IRI")?;
            Ok(ValuedNode::new(Term::iri(lexical)))
        }
    }
}

/// `BNODE()` or `BNODE(key)`
///
/// With a key the same blank node comes back for the same solution and key
/// within one input multiset.
pub fn bnode(
    arg: Option<&ValuedNode>,
    ctx: &EvaluationContext<'_>,
    stamp: u64,
    id: usize,
) -> ExprResult<ValuedNode> {
    match arg {
        None => Ok(ValuedNode::new(ctx.fresh_blank_node())),
        Some(key) => {
            let key = plain_string(key, "BNODE")?;
            Ok(ValuedNode::new(ctx.keyed_blank_node(stamp, id, key)))
        }
    }
}

pub fn strdt(lexical: &ValuedNode, datatype: &ValuedNode) -> ExprResult<ValuedNode> {
    let lexical = plain_string(lexical, "STRDT")?;
    let Some(dt) = datatype.term().as_iri() else {
        return Err(ExpressionError::type_mismatch(
            "STRDT",
            format!("{} is not an IRI", datatype.term()),
        ));
    };
    if dt == rdf::LANG_STRING {
        return Err(ExpressionError::invalid_argument(
            "STRDT",
            "rdf:langString requires a language tag",
        ));
    }
    Ok(ValuedNode::new(Term::typed(lexical, dt)))
}

pub fn strlang(lexical: &ValuedNode, language: &ValuedNode) -> ExprResult<ValuedNode> {
    let lexical = plain_string(lexical, "STRLANG")?;
    let language = plain_string(language, "STRLANG")?;
    if language.is_empty() {
        return Err(ExpressionError::invalid_argument(
            "STRLANG",
            "language tag must not be empty",
        ));
    }
    Ok(ValuedNode::new(Term::lang_string(lexical, language)))
}

pub fn triple(s: &ValuedNode, p: &ValuedNode, o: &ValuedNode) -> ExprResult<ValuedNode> {
    if s.term().is_literal() {
        return Err(ExpressionError::type_mismatch(
            "TRIPLE",
            "subject must not be a literal",
        ));
    }
    if !p.term().is_iri() {
        return Err(ExpressionError::type_mismatch(
            "TRIPLE",
            "predicate must be an IRI",
        ));
    }
    Ok(ValuedNode::new(Term::triple(
        s.term().clone(),
        p.term().clone(),
        o.term().clone(),
    )))
}

/// Component of a triple term: 0 subject, 1 predicate, 2 object
pub fn triple_component(arg: &ValuedNode, index: usize, function: &'static str) -> ExprResult<ValuedNode> {
    let Some(t) = arg.term().as_triple() else {
        return Err(ExpressionError::type_mismatch(
            function,
            format!("{} is not a triple term", arg.term()),
        ));
    };
    let term = match index {
        0 => &t.subject,
        1 => &t.predicate,
        _ => &t.object,
    };
    Ok(ValuedNode::new(term.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_vocab::xsd;

    #[test]
    fn test_lang_matches() {
        let tag = ValuedNode::string("en-US");
        assert_eq!(
            lang_matches(&tag, &ValuedNode::string("en")).unwrap(),
            ValuedNode::boolean(true)
        );
        assert_eq!(
            lang_matches(&tag, &ValuedNode::string("*")).unwrap(),
            ValuedNode::boolean(true)
        );
        assert_eq!(
            lang_matches(&ValuedNode::string("eng"), &ValuedNode::string("en")).unwrap(),
            ValuedNode::boolean(false)
        );
        assert_eq!(
            lang_matches(&ValuedNode::string(""), &ValuedNode::string("*")).unwrap(),
            ValuedNode::boolean(false)
        );
    }

    #[test]
    fn test_datatype() {
        let lang = ValuedNode::new(Term::lang_string("chat", "fr"));
        assert_eq!(datatype(&lang).unwrap().term(), &Term::iri(rdf::LANG_STRING));
        assert_eq!(
            datatype(&ValuedNode::string("x")).unwrap().term(),
            &Term::iri(xsd::STRING)
        );
        assert!(datatype(&ValuedNode::new(Term::iri("http://x"))).is_err());
    }

    #[test]
    fn test_strdt_and_strlang() {
        let r = strdt(&ValuedNode::string("5"), &ValuedNode::new(Term::iri(xsd::INTEGER))).unwrap();
        assert_eq!(r.as_integer().unwrap(), 5);
        assert!(strlang(&ValuedNode::string("x"), &ValuedNode::string("")).is_err());
        let tagged = ValuedNode::new(Term::lang_string("x", "en"));
        assert!(strdt(&tagged, &ValuedNode::new(Term::iri(xsd::STRING))).is_err());
    }

    #[test]
    fn test_triple_functions() {
        let s = ValuedNode::new(Term::iri("http://example.org/s"));
        let p = ValuedNode::new(Term::iri("http://example.org/p"));
        let o = ValuedNode::integer(1);
        let t = triple(&s, &p, &o).unwrap();
        assert_eq!(triple_component(&t, 2, "OBJECT").unwrap(), o);
        assert!(triple(&o, &p, &s).is_err());
    }
}
