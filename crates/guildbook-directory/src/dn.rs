//! Distinguished name handling for directory entries.
//!
//! The writer derives the target DN for a record from its `uid` key and the
//! configured search base; it never searches the directory to locate it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use guildbook_core::error::Error as CoreError;

/// Errors that can occur when parsing a distinguished name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnError {
    /// The distinguished name was empty.
    #[error("distinguished name cannot be empty")]
    Empty,
    /// A component in the distinguished name was invalid.
    #[error("invalid distinguished name component: {0}")]
    InvalidComponent(String),
    /// A component was missing the value to the right of the `=`.
    #[error("distinguished name component missing value for attribute {0}")]
    MissingValue(String),
    /// The distinguished name ended with an escape character.
    #[error("distinguished name contains an unterminated escape sequence")]
    UnterminatedEscape,
}

impl From<DnError> for CoreError {
    fn from(err: DnError) -> Self {
        CoreError::Config(err.to_string())
    }
}

/// One relative distinguished name: a single attribute/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rdn {
    attribute: String,
    value: String,
}

impl Rdn {
    /// Creates a relative distinguished name from an attribute and a value.
    ///
    /// The value is stored raw; escaping happens when the DN is rendered.
    #[must_use]
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Attribute portion of the RDN (e.g. `uid`).
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Attribute value portion of the RDN.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns true if this RDN's attribute matches (case-insensitive).
    #[must_use]
    pub fn matches_attribute(&self, attribute: &str) -> bool {
        self.attribute.eq_ignore_ascii_case(attribute)
    }
}

/// Strongly-typed distinguished name.
///
/// Keeps a canonical escaped string representation alongside the parsed
/// attribute/value pairs. Parsing is strict so malformed DNs surface early,
/// at configuration time rather than mid-request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistinguishedName {
    raw: String,
    rdns: Vec<Rdn>,
}

impl DistinguishedName {
    /// Parses a distinguished name from a string.
    ///
    /// # Errors
    ///
    /// Returns [`DnError`] if the input is empty or contains a malformed
    /// component.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, DnError> {
        let raw = input.as_ref().trim();
        if raw.is_empty() {
            return Err(DnError::Empty);
        }

        let mut rdns = Vec::new();
        for component in split_components(raw)? {
            if component.is_empty() {
                return Err(DnError::InvalidComponent(raw.to_string()));
            }
            rdns.push(parse_component(&component)?);
        }

        Ok(Self {
            raw: render(&rdns),
            rdns,
        })
    }

    /// Computes the entry DN for a record key: `uid=<key>,<base>`.
    ///
    /// This is a pure computation; the key is escaped, never interpolated.
    /// A key that does not correspond to any real entry yields a DN the
    /// directory will refuse to bind as, not an error here.
    #[must_use]
    pub fn for_uid(key: &str, base: &DistinguishedName) -> Self {
        let mut rdns = Vec::with_capacity(base.rdns.len() + 1);
        rdns.push(Rdn::new("uid", key));
        rdns.extend(base.rdns.iter().cloned());
        Self {
            raw: render(&rdns),
            rdns,
        }
    }

    /// Borrows the canonical distinguished name string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the relative distinguished names in order, most-specific first.
    #[must_use]
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// Looks up the value of the first RDN matching `attribute`
    /// (case-insensitive).
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.rdns
            .iter()
            .find(|rdn| rdn.matches_attribute(attribute))
            .map(Rdn::value)
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for DistinguishedName {
    type Err = DnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<DistinguishedName> for String {
    fn from(value: DistinguishedName) -> Self {
        value.raw
    }
}

fn split_components(input: &str) -> Result<Vec<String>, DnError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escape = false;

    for ch in input.chars() {
        if escape {
            current.push('\\');
            current.push(ch);
            escape = false;
            continue;
        }
        match ch {
            '\\' => escape = true,
            ',' => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if escape {
        return Err(DnError::UnterminatedEscape);
    }

    parts.push(current.trim().to_string());
    Ok(parts)
}

fn parse_component(component: &str) -> Result<Rdn, DnError> {
    let mut escape = false;
    let mut split_at = None;

    for (i, ch) in component.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' => escape = true,
            '=' => {
                split_at = Some(i);
                break;
            }
            _ => {}
        }
    }

    let idx = split_at.ok_or_else(|| DnError::InvalidComponent(component.to_string()))?;
    let attribute = component[..idx].trim();
    let value = component[idx + 1..].trim_start();

    if attribute.is_empty() {
        return Err(DnError::InvalidComponent(component.to_string()));
    }
    if value.is_empty() {
        return Err(DnError::MissingValue(attribute.to_string()));
    }

    Ok(Rdn::new(attribute, unescape(value)?))
}

fn unescape(value: &str) -> Result<String, DnError> {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            let next = chars.next().ok_or(DnError::UnterminatedEscape)?;
            result.push(next);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

// RFC 4514 string representation: specials are escaped, as are a leading
// space or `#` and a trailing space.
fn escape(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut escaped = String::with_capacity(value.len());

    for (idx, ch) in chars.iter().enumerate() {
        let is_first = idx == 0;
        let is_last = idx == chars.len() - 1;
        let needs_escape = matches!(ch, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=')
            || (is_first && (*ch == ' ' || *ch == '#'))
            || (is_last && *ch == ' ');

        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(*ch);
    }

    escaped
}

fn render(rdns: &[Rdn]) -> String {
    rdns.iter()
        .map(|rdn| format!("{}={}", rdn.attribute(), escape(rdn.value())))
        .collect::<Vec<_>>()
        .join(",")
}
