//! Tagged-union JSON tree used by the key-based document index.
//!
//! Machine-generated page JSON has no stable schema, so extraction does not
//! deserialize into typed structs. Instead the text is parsed into a
//! [`JsonNode`] tree (mapping key order preserved) and searched by key with
//! [`index::first`] and [`index::all`].
//!
//! # Example
//!
//! ```rust
//! use glean::json::JsonNode;
//!
//! let tree = JsonNode::parse(r#"{"a": [{"name": "x"}], "b": {"name": "y"}}"#).unwrap();
//! assert_eq!(tree.first("name").and_then(JsonNode::as_str), Some("x"));
//! assert_eq!(tree.all("name").len(), 2);
//! ```

pub mod index;

use std::fmt;

use serde_json::{Number, Value};

pub use index::{all, enumerate_nodes, first, Nodes};

/// A leaf value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// One node of a parsed JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonNode {
    /// Ordered mapping, keys in document order.
    Map(Vec<(String, JsonNode)>),
    Seq(Vec<JsonNode>),
    Scalar(Scalar),
}

impl JsonNode {
    /// Parse JSON text into a tree.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<Value>(text).map(Self::from)
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    pub fn is_seq(&self) -> bool {
        matches!(self, Self::Seq(_))
    }

    pub fn as_map(&self) -> Option<&[(String, JsonNode)]> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[JsonNode]> {
        match self {
            Self::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Integer value, accepting numeric strings as emitted by some payloads.
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Scalar(Scalar::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64)),
            Self::Scalar(Scalar::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Scalar::Null))
    }

    /// Empty mappings, empty sequences and null count as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Map(entries) => entries.is_empty(),
            Self::Seq(items) => items.is_empty(),
            Self::Scalar(s) => *s == Scalar::Null,
        }
    }

    /// Direct child of a mapping.
    pub fn get(&self, key: &str) -> Option<&JsonNode> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Follow a fixed chain of mapping keys.
    pub fn path(&self, keys: &[&str]) -> Option<&JsonNode> {
        keys.iter().try_fold(self, |node, key| node.get(key))
    }

    /// Item of a sequence.
    pub fn at(&self, index: usize) -> Option<&JsonNode> {
        self.as_seq()?.get(index)
    }

    /// Mapping nodes reachable from this node, in index order.
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes::new(self)
    }

    /// See [`index::first`].
    pub fn first(&self, key: &str) -> Option<&JsonNode> {
        index::first(self, key)
    }

    /// See [`index::all`].
    pub fn all(&self, key: &str) -> Vec<&JsonNode> {
        index::all(self, key)
    }
}

impl From<Value> for JsonNode {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Scalar(Scalar::Null),
            Value::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Self::Scalar(Scalar::Number(n)),
            Value::String(s) => Self::Scalar(Scalar::String(s)),
            Value::Array(items) => Self::Seq(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_preserves_key_order() {
        let node = JsonNode::parse(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        let keys: Vec<&str> = node
            .as_map()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn path_follows_nested_keys() {
        let node = JsonNode::parse(r#"{"a": {"b": {"c": "deep"}}}"#).unwrap();
        assert_eq!(node.path(&["a", "b", "c"]).and_then(JsonNode::as_str), Some("deep"));
        assert!(node.path(&["a", "x"]).is_none());
        assert!(node.path(&["a", "b", "c", "d"]).is_none());
    }

    #[test]
    fn as_i64_accepts_numbers_and_numeric_strings() {
        let node = JsonNode::parse(r#"{"n": 1700000000, "s": "42", "f": 3.0, "x": "abc"}"#).unwrap();
        assert_eq!(node.get("n").and_then(JsonNode::as_i64), Some(1_700_000_000));
        assert_eq!(node.get("s").and_then(JsonNode::as_i64), Some(42));
        assert_eq!(node.get("f").and_then(JsonNode::as_i64), Some(3));
        assert_eq!(node.get("x").and_then(JsonNode::as_i64), None);
    }

    #[test]
    fn scalar_display_matches_json_text() {
        assert_eq!(Scalar::Null.to_string(), "null");
        assert_eq!(Scalar::Bool(true).to_string(), "true");
        assert_eq!(Scalar::String("1.2K".into()).to_string(), "1.2K");
        let node = JsonNode::parse("17").unwrap();
        assert_eq!(node.as_scalar().unwrap().to_string(), "17");
    }

    #[test]
    fn emptiness() {
        assert!(JsonNode::parse("{}").unwrap().is_empty());
        assert!(JsonNode::parse("[]").unwrap().is_empty());
        assert!(JsonNode::parse("null").unwrap().is_empty());
        assert!(!JsonNode::parse("0").unwrap().is_empty());
        assert!(!JsonNode::parse(r#"{"a": null}"#).unwrap().is_empty());
    }

    #[test]
    fn at_indexes_sequences_only() {
        let node = JsonNode::parse(r#"[{"name": "first"}, 2]"#).unwrap();
        assert_eq!(node.at(0).and_then(|n| n.get("name")).and_then(JsonNode::as_str), Some("first"));
        assert!(node.at(5).is_none());
        assert!(JsonNode::parse("{}").unwrap().at(0).is_none());
    }
}
