//! Query variables

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A SPARQL variable, stored without its `?`/`$` sigil
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Var(Arc<str>);

impl Var {
    /// Create a variable; a leading `?` or `$` is stripped
    pub fn new(name: &str) -> Self {
        let name = name
            .strip_prefix('?')
            .or_else(|| name.strip_prefix('$'))
            .unwrap_or(name);
        Var(Arc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

impl From<&str> for Var {
    fn from(name: &str) -> Self {
        Var::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigil_stripped() {
        assert_eq!(Var::new("?x"), Var::new("x"));
        assert_eq!(Var::new("$x"), Var::new("x"));
        assert_eq!(Var::new("x").to_string(), "?x");
    }
}
