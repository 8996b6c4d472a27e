//! Space-delimited OAuth 2.0 scope values (RFC 6749 §3.3).

use std::fmt;

use serde::{Deserialize, Serialize};

/// An ordered, duplicate-free set of scope tokens.
///
/// Order is the order of first appearance, so a granted scope serializes the
/// way the client asked for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct Scope(Vec<String>);

impl Scope {
    /// Parses a space-delimited scope string.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        Self::from_iter(value.split_whitespace().map(str::to_string))
    }

    /// Returns `true` when no scope tokens are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if the token is part of this scope.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.0.iter().any(|s| s == token)
    }

    /// Returns `true` if every token of `self` is in `other`.
    #[must_use]
    pub fn is_subset_of(&self, other: &Scope) -> bool {
        self.0.iter().all(|s| other.contains(s))
    }

    /// Returns the tokens of `self` that are also in `other`, in `self`'s order.
    #[must_use]
    pub fn intersection(&self, other: &Scope) -> Scope {
        Scope(
            self.0
                .iter()
                .filter(|s| other.contains(s))
                .cloned()
                .collect(),
        )
    }

    /// Iterates over the scope tokens.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromIterator<String> for Scope {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut tokens: Vec<String> = Vec::new();
        for token in iter {
            if !token.is_empty() && !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        Scope(tokens)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.to_string()
    }
}

impl From<String> for Scope {
    fn from(value: String) -> Self {
        Scope::parse(&value)
    }
}
