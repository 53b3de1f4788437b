//! Dotted-path flattening of JSON documents
//!
//! Converts nested objects into `path -> value` pairs and back. Arrays,
//! scalars and empty objects are opaque leaves; only non-empty objects are
//! descended into.
//!
//! ```rust
//! use cretoai_guard::flatten::Flattener;
//! use serde_json::json;
//!
//! let flattener = Flattener::new();
//! let flat = flattener.flatten(&json!({ "address": { "city": "Berlin" }, "tags": [1, 2] }));
//!
//! assert_eq!(flat["address.city"], json!("Berlin"));
//! assert_eq!(flat["tags"], json!([1, 2]));
//! assert_eq!(
//!     flattener.unflatten(flat),
//!     json!({ "address": { "city": "Berlin" }, "tags": [1, 2] })
//! );
//! ```

use serde_json::{Map, Value};

/// Default path delimiter
pub const DEFAULT_DELIMITER: char = '.';

/// Flattens and unflattens JSON objects along delimited paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flattener {
    delimiter: char,
    max_depth: Option<usize>,
}

impl Default for Flattener {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            max_depth: None,
        }
    }
}

impl Flattener {
    /// Flattener with `.` as delimiter and unlimited depth
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different path delimiter
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Stop descending after `depth` levels; deeper objects become leaves
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Path delimiter
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Flatten `value` into an owned path map.
    ///
    /// Anything other than an object flattens to an empty map.
    pub fn flatten(&self, value: &Value) -> Map<String, Value> {
        self.leaves(value)
            .into_iter()
            .map(|(path, leaf)| (path, leaf.clone()))
            .collect()
    }

    /// Borrowing variant of [`flatten`](Self::flatten), in document order
    pub fn leaves<'a>(&self, value: &'a Value) -> Vec<(String, &'a Value)> {
        let mut out = Vec::new();
        if let Value::Object(map) = value {
            self.walk(map, None, 1, &mut out);
        }
        out
    }

    fn walk<'a>(
        &self,
        map: &'a Map<String, Value>,
        prefix: Option<&str>,
        depth: usize,
        out: &mut Vec<(String, &'a Value)>,
    ) {
        for (key, value) in map {
            let path = match prefix {
                Some(prefix) => format!("{}{}{}", prefix, self.delimiter, key),
                None => key.clone(),
            };

            match value {
                Value::Object(child) if !child.is_empty() && self.descends(depth) => {
                    self.walk(child, Some(path.as_str()), depth + 1, out);
                }
                _ => out.push((path, value)),
            }
        }
    }

    fn descends(&self, depth: usize) -> bool {
        self.max_depth.map_or(true, |max| depth < max)
    }

    /// Rebuild a nested object from `path -> value` entries.
    ///
    /// A path running through an existing non-object value is skipped.
    ///
    /// Numeric segments become object keys, never array indices: unlike
    /// the JavaScript `flat` package, `items.0` rebuilds as
    /// `{"items": {"0": ...}}`, not `{"items": [...]}`. Arrays survive a
    /// round trip only because [`flatten`](Self::flatten) keeps them whole.
    pub fn unflatten<I>(&self, entries: I) -> Value
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut root = Map::new();
        for (path, value) in entries {
            self.insert(&mut root, &path, value);
        }
        Value::Object(root)
    }

    fn insert(&self, root: &mut Map<String, Value>, path: &str, value: Value) {
        let mut segments = path.split(self.delimiter).peekable();
        let mut node = root;

        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                node.insert(segment.to_string(), value);
                return;
            }

            let child = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));

            match child {
                Value::Object(map) => node = map,
                _ => return,
            }
        }
    }
}

/// Flatten with the default delimiter
pub fn flatten(value: &Value) -> Map<String, Value> {
    Flattener::new().flatten(value)
}

/// Unflatten with the default delimiter
pub fn unflatten(flat: Map<String, Value>) -> Value {
    Flattener::new().unflatten(flat)
}
