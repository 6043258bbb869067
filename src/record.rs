//! Raw Cricsheet match record and path-aware JSON navigation.
//!
//! A [`RawMatchRecord`] owns the parsed JSON document for one match and
//! never changes after loading. All reads go through [`Node`], a borrowed
//! cursor that remembers the path it was reached by, so every failure can
//! name the exact field (`innings[1].overs[0].deliveries[3].runs.batter`).
//!
//! Required and optional reads are separate methods:
//! - [`Node::field`] / [`Node::index`] fail with `MissingField` when absent.
//! - [`Node::get`] / [`Node::get_index`] return `None` when absent.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{ParseError, ParseResult};

/// One loaded match record.
#[derive(Debug, Clone)]
pub struct RawMatchRecord {
    root: Value,
}

impl RawMatchRecord {
    /// Read and parse a record from disk.
    pub fn load(path: &Path) -> ParseResult<Self> {
        let locator = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData => ParseError::malformed(&locator, e.to_string()),
            _ => ParseError::NotFound {
                locator: locator.clone(),
            },
        })?;
        Self::from_json_str(&locator, &text)
    }

    /// Parse a record from JSON text. `locator` is only used in errors.
    pub fn from_json_str(locator: &str, text: &str) -> ParseResult<Self> {
        let root: Value =
            serde_json::from_str(text).map_err(|e| ParseError::malformed(locator, e.to_string()))?;
        Self::from_value(locator, root)
    }

    /// Wrap an already-parsed JSON value. The top level must be an object.
    pub fn from_value(locator: &str, root: Value) -> ParseResult<Self> {
        if !root.is_object() {
            return Err(ParseError::malformed(
                locator,
                "top-level value is not an object",
            ));
        }
        Ok(Self { root })
    }

    /// Cursor at the document root.
    pub fn root(&self) -> Node<'_> {
        Node::new(&self.root, String::new())
    }

    /// Cursor at the `info` block.
    pub fn info(&self) -> ParseResult<Node<'_>> {
        self.root().field("info")
    }
}

/// A borrowed position inside a JSON document, tagged with its path.
#[derive(Debug, Clone)]
pub struct Node<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> Node<'a> {
    /// Start a cursor at `value`. `path` is the prefix used in error
    /// messages (empty for a document root).
    pub fn new(value: &'a Value, path: String) -> Self {
        Self { value, path }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn value(&self) -> &'a Value {
        self.value
    }

    fn child_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    fn object(&self) -> ParseResult<&'a Map<String, Value>> {
        self.value
            .as_object()
            .ok_or_else(|| self.wrong_type("object"))
    }

    fn array(&self) -> ParseResult<&'a Vec<Value>> {
        self.value.as_array().ok_or_else(|| self.wrong_type("array"))
    }

    fn wrong_type(&self, expected: &str) -> ParseError {
        let locator = if self.path.is_empty() {
            "<root>"
        } else {
            self.path.as_str()
        };
        ParseError::malformed(
            locator,
            format!("expected {}, found {}", expected, type_name(self.value)),
        )
    }

    /// Optional key lookup. Absent keys and explicit `null` both yield `None`.
    pub fn get(&self, key: &str) -> ParseResult<Option<Node<'a>>> {
        let obj = self.object()?;
        Ok(obj
            .get(key)
            .filter(|v| !v.is_null())
            .map(|v| Node::new(v, self.child_path(key))))
    }

    /// Required key lookup.
    pub fn field(&self, key: &str) -> ParseResult<Node<'a>> {
        self.get(key)?
            .ok_or_else(|| ParseError::missing(self.child_path(key)))
    }

    /// Optional list element.
    pub fn get_index(&self, index: usize) -> ParseResult<Option<Node<'a>>> {
        let items = self.array()?;
        Ok(items
            .get(index)
            .map(|v| Node::new(v, format!("{}[{}]", self.path, index))))
    }

    /// Required list element.
    pub fn index(&self, index: usize) -> ParseResult<Node<'a>> {
        self.get_index(index)?
            .ok_or_else(|| ParseError::missing(format!("{}[{}]", self.path, index)))
    }

    /// All elements of a list, in source order.
    pub fn items(&self) -> ParseResult<Vec<Node<'a>>> {
        Ok(self
            .array()?
            .iter()
            .enumerate()
            .map(|(i, v)| Node::new(v, format!("{}[{}]", self.path, i)))
            .collect())
    }

    /// Number of elements in a list.
    pub fn len(&self) -> ParseResult<usize> {
        Ok(self.array()?.len())
    }

    /// Keys of an object, in source order.
    pub fn keys(&self) -> ParseResult<Vec<&'a str>> {
        Ok(self.object()?.keys().map(String::as_str).collect())
    }

    pub fn as_str(&self) -> ParseResult<&'a str> {
        self.value.as_str().ok_or_else(|| self.wrong_type("string"))
    }

    pub fn to_string_value(&self) -> ParseResult<String> {
        self.as_str().map(str::to_string)
    }

    pub fn as_u32(&self) -> ParseResult<u32> {
        self.value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| self.wrong_type("non-negative integer"))
    }

    /// A string, or an integer rendered as a string.
    pub fn as_text(&self) -> ParseResult<String> {
        match self.value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
            _ => Err(self.wrong_type("string or integer")),
        }
    }

    /// A list of strings.
    pub fn as_string_list(&self) -> ParseResult<Vec<String>> {
        self.items()?
            .iter()
            .map(|item| item.to_string_value())
            .collect()
    }

    /// Required string at a dotted key path relative to this node.
    pub fn str_at(&self, dotted: &str) -> ParseResult<String> {
        self.descend(dotted)?.to_string_value()
    }

    /// Required node at a dotted key path relative to this node.
    pub fn descend(&self, dotted: &str) -> ParseResult<Node<'a>> {
        let mut node = self.clone();
        for key in dotted.split('.') {
            node = node.field(key)?;
        }
        Ok(node)
    }

    /// Optional node at a dotted key path. Any absent segment yields `None`.
    pub fn descend_opt(&self, dotted: &str) -> ParseResult<Option<Node<'a>>> {
        let mut node = self.clone();
        for key in dotted.split('.') {
            match node.get(key)? {
                Some(next) => node = next,
                None => return Ok(None),
            }
        }
        Ok(Some(node))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawMatchRecord {
        RawMatchRecord::from_value("test", value).unwrap()
    }

    #[test]
    fn test_rejects_non_object_root() {
        let err = RawMatchRecord::from_json_str("x.json", "[1, 2]").unwrap_err();
        assert!(matches!(err, ParseError::MalformedInput { .. }));
    }

    #[test]
    fn test_rejects_invalid_json() {
        let err = RawMatchRecord::from_json_str("x.json", "{ not json").unwrap_err();
        match err {
            ParseError::MalformedInput { locator, .. } => assert_eq!(locator, "x.json"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let err = RawMatchRecord::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ParseError::NotFound { .. }));
    }

    #[test]
    fn test_missing_field_names_full_path() {
        let rec = record(json!({"info": {"officials": {"umpires": ["A"]}}}));
        let umpires = rec.info().unwrap().descend("officials.umpires").unwrap();
        let err = umpires.index(1).unwrap_err();
        assert_eq!(
            err,
            ParseError::missing("info.officials.umpires[1]".to_string())
        );
    }

    #[test]
    fn test_null_is_treated_as_absent() {
        let rec = record(json!({"info": {"city": null}}));
        assert!(rec.info().unwrap().get("city").unwrap().is_none());
        assert!(matches!(
            rec.info().unwrap().field("city"),
            Err(ParseError::MissingField { .. })
        ));
    }

    #[test]
    fn test_wrong_type_is_malformed() {
        let rec = record(json!({"info": {"venue": 12}}));
        let err = rec.info().unwrap().str_at("venue").unwrap_err();
        match err {
            ParseError::MalformedInput { locator, reason } => {
                assert_eq!(locator, "info.venue");
                assert!(reason.contains("expected string"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_as_text_accepts_integers() {
        let rec = record(json!({"info": {"season": 2010}}));
        let season = rec.info().unwrap().field("season").unwrap();
        assert_eq!(season.as_text().unwrap(), "2010");
    }

    #[test]
    fn test_descend_opt_stops_at_first_gap() {
        let rec = record(json!({"info": {"outcome": {"winner": "Kenya"}}}));
        let info = rec.info().unwrap();
        assert!(info.descend_opt("outcome.by.runs").unwrap().is_none());
        assert!(info.descend_opt("outcome.winner").unwrap().is_some());
    }

    #[test]
    fn test_keys_preserve_source_order() {
        let rec = record(json!({"extras": {"wides": 1, "noballs": 1}}));
        let extras = rec.root().field("extras").unwrap();
        assert_eq!(extras.keys().unwrap(), vec!["wides", "noballs"]);
    }
}
