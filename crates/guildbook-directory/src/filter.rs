//! Search filter composition.
//!
//! Filters are built as a tree of predicate nodes and only serialized to
//! wire syntax at the point of use, inside the client. Values are stored
//! raw, so the tree stays inspectable; metacharacters are hex-escaped
//! (RFC 4515) during serialization, so a submitted value can never alter
//! filter semantics.

use std::fmt;
use std::ops;

/// An immutable search filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// The attribute is present, whatever its value.
    Present(String),
    /// The attribute equals the given literal value.
    Equals(String, String),
    /// Both sub-filters hold.
    And(Box<Filter>, Box<Filter>),
    /// The sub-filter does not hold.
    Not(Box<Filter>),
}

impl Filter {
    /// Matches entries carrying the attribute.
    #[must_use]
    pub fn present(attribute: impl Into<String>) -> Self {
        Self::Present(attribute.into())
    }

    /// Matches entries whose attribute equals `value` as a literal.
    #[must_use]
    pub fn equals(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals(attribute.into(), value.into())
    }

    /// Conjunction of this filter with another; also available as `a & b`.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }
}

impl ops::BitAnd for Filter {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.and(rhs)
    }
}

impl ops::Not for Filter {
    type Output = Self;

    fn not(self) -> Self {
        Self::Not(Box::new(self))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present(attribute) => write!(f, "({attribute}=*)"),
            Self::Equals(attribute, value) => {
                write!(f, "({attribute}={})", escape_value(value))
            }
            Self::And(left, right) => write!(f, "(&{left}{right})"),
            Self::Not(inner) => write!(f, "(!{inner})"),
        }
    }
}

fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
