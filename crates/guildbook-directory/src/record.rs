//! Directory entry normalization.
//!
//! Directories routinely hold legacy-encoded values; failing a whole page
//! for one mangled attribute is worse than rendering it lossily. Raw entries
//! are therefore repaired into UTF-8 once, here, and nothing downstream ever
//! sees transport bytes.

use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

/// A directory entry as it arrives from the transport: textual values plus
/// any values that were not valid UTF-8 on the wire.
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute values that decoded cleanly.
    pub attrs: HashMap<String, Vec<String>>,
    /// Attribute values that did not decode as UTF-8.
    pub bin_attrs: HashMap<String, Vec<Vec<u8>>>,
}

/// A normalized, read-only directory record.
///
/// Attribute names are case-insensitive and every attribute is a sequence of
/// values, single-valued ones included, so callers never special-case
/// cardinality. Records are snapshots of one search; they are never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    dn: String,
    attributes: HashMap<String, Vec<String>>,
}

impl Record {
    /// Normalizes a raw entry into a record.
    ///
    /// Values that were not valid UTF-8 are decoded lossily and kept; a
    /// warning is emitted so the bad data is observable, but normalization
    /// never fails a record.
    #[must_use]
    pub fn normalize(raw: RawEntry) -> Self {
        let mut attributes: HashMap<String, Vec<String>> = HashMap::new();

        for (attribute, values) in raw.attrs {
            attributes
                .entry(attribute.to_ascii_lowercase())
                .or_default()
                .extend(values);
        }

        for (attribute, values) in raw.bin_attrs {
            let entry = attributes
                .entry(attribute.to_ascii_lowercase())
                .or_default();
            for bytes in values {
                match String::from_utf8(bytes) {
                    Ok(text) => entry.push(text),
                    Err(err) => {
                        warn!(
                            dn = %raw.dn,
                            %attribute,
                            "attribute value is not valid UTF-8, decoding lossily"
                        );
                        entry.push(String::from_utf8_lossy(err.as_bytes()).into_owned());
                    }
                }
            }
        }

        Self {
            dn: raw.dn,
            attributes,
        }
    }

    /// Distinguished name of the entry this record was built from.
    #[must_use]
    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// Returns all values for the attribute (case-insensitive), in server
    /// order.
    #[must_use]
    pub fn values(&self, attribute: &str) -> Option<&[String]> {
        self.attributes
            .get(&attribute.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.values(attribute)
            .and_then(|values| values.first().map(String::as_str))
    }

    /// The record's unique key (`uid` attribute).
    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.first("uid")
    }

    /// Iterates over all attributes and their values.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &[String])> + '_ {
        self.attributes
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }
}
