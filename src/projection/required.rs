//! Pushed-down required fields

use serde::{Deserialize, Serialize};

/// A field the host needs, by position in the current projection schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredField {
    /// Position in the current projection schema
    pub index: usize,
    /// Name the host knows the field by, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Requested map keys, in request order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subfields: Vec<String>,
}

impl RequiredField {
    /// Requires a whole field
    pub fn new(index: usize) -> Self {
        Self {
            index,
            alias: None,
            subfields: Vec::new(),
        }
    }

    /// Requires some keys of a map field
    pub fn with_subfields<S: Into<String>>(index: usize, keys: impl IntoIterator<Item = S>) -> Self {
        Self {
            index,
            alias: None,
            subfields: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Parses the `index[#key|key...]` shorthand used on the command line
    pub fn parse_shorthand(text: &str) -> Option<Self> {
        let (index, keys) = match text.split_once('#') {
            Some((index, keys)) => (index, Some(keys)),
            None => (text, None),
        };
        let index = index.trim().parse().ok()?;
        let subfields = keys
            .map(|k| k.split('|').map(|s| s.trim().to_string()).collect::<Vec<_>>())
            .unwrap_or_default();
        if subfields.iter().any(String::is_empty) {
            return None;
        }
        Some(Self::with_subfields(index, subfields))
    }
}

/// Host-facing acknowledgement of a projection push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredFieldResponse {
    /// Whether the loader will honour the requested projection
    pub accepted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shorthand() {
        assert_eq!(RequiredField::parse_shorthand("3"), Some(RequiredField::new(3)));
        assert_eq!(
            RequiredField::parse_shorthand("1#x|y"),
            Some(RequiredField::with_subfields(1, ["x", "y"]))
        );
        assert_eq!(RequiredField::parse_shorthand("a"), None);
        assert_eq!(RequiredField::parse_shorthand("1#x||y"), None);
    }

    #[test]
    fn test_serde_skips_empty_parts() {
        let json = serde_json::to_string(&RequiredField::new(0)).unwrap();
        assert_eq!(json, r#"{"index":0}"#);
    }
}
