//! Hash function implementations
//!
//! Implements SPARQL hash functions: MD5, SHA1, SHA256, SHA384, SHA512.
//! The argument must be a simple literal or `xsd:string`; the result is the
//! lowercase hex digest as a simple literal.

use super::helpers::plain_string;
use crate::error::ExprResult;
use crate::value::ValuedNode;
use md5::{Digest, Md5};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};

pub fn md5(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    hash(arg, "MD5", |s| {
        let mut hasher = Md5::new();
        hasher.update(s.as_bytes());
        format!("{:x}", hasher.finalize())
    })
}

pub fn sha1(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    hash(arg, "SHA1", |s| {
        let mut hasher = Sha1::new();
        hasher.update(s.as_bytes());
        format!("{:x}", hasher.finalize())
    })
}

pub fn sha256(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    hash(arg, "SHA256", |s| {
        let mut hasher = Sha256::new();
        hasher.update(s.as_bytes());
        format!("{:x}", hasher.finalize())
    })
}

pub fn sha384(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    hash(arg, "SHA384", |s| {
        let mut hasher = Sha384::new();
        hasher.update(s.as_bytes());
        format!("{:x}", hasher.finalize())
    })
}

pub fn sha512(arg: &ValuedNode) -> ExprResult<ValuedNode> {
    hash(arg, "SHA512", |s| {
        let mut hasher = Sha512::new();
        hasher.update(s.as_bytes());
        format!("{:x}", hasher.finalize())
    })
}

/// Hash the plain string argument with `digest`
fn hash<F>(arg: &ValuedNode, function: &'static str, digest: F) -> ExprResult<ValuedNode>
where
    F: FnOnce(&str) -> String,
{
    let s = plain_string(arg, function)?;
    Ok(ValuedNode::string(digest(s)))
}
