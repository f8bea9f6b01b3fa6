//! Flattening of nested job item data into translatable fields and back

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

use crate::core::models::{FieldShape, TranslatableField};

/// Separator between path segments in a flattened key
pub const KEY_DELIMITER: &str = "][";

/// Property holding a leaf's text
pub const TEXT_PROPERTY: &str = "#text";

/// Property marking a leaf as (not) translatable
pub const TRANSLATE_PROPERTY: &str = "#translate";

/// Escape character for path segments; `]` and itself are escaped so a
/// segment can never contain [`KEY_DELIMITER`]
const ESCAPE: char = '%';

/// Flattened data: path key to leaf value
pub type FlatData = BTreeMap<String, Value>;

/// Data-shaping utility used by the job processor
pub trait DataShaper: Send + Sync {
    /// Flatten nested data into path keys and leaf values
    fn flatten(&self, data: &Value) -> FlatData;

    /// Translatable leaves of nested data, in key order
    fn filter_translatable(&self, data: &Value) -> Vec<TranslatableField>;

    /// Rebuild nested data from path keys
    fn unflatten(&self, flat: &FlatData) -> Value;
}

/// Shaper for `#`-annotated nested data
///
/// A leaf is any non-object value, an empty object, or an object carrying
/// `#text`. Other objects are branches. Keys starting with `#` are
/// properties: kept whole by [`flatten`](DataShaper::flatten), never
/// descended into and never translated. Segments are escaped, so keys that
/// contain the delimiter get their own flat key.
#[derive(Debug, Clone, Copy, Default)]
pub struct NestedDataShaper;

impl NestedDataShaper {
    /// Create a shaper
    pub fn new() -> Self {
        Self
    }

    fn flatten_into(map: &Map<String, Value>, prefix: Option<&str>, out: &mut FlatData) {
        for (segment, value) in map {
            let escaped = escape_segment(segment);
            let key = match prefix {
                Some(prefix) => format!("{}{}{}", prefix, KEY_DELIMITER, escaped),
                None => escaped,
            };

            match value {
                Value::Object(child)
                    if !segment.starts_with('#')
                        && !child.is_empty()
                        && !child.contains_key(TEXT_PROPERTY) =>
                {
                    Self::flatten_into(child, Some(&key), out);
                }
                _ => {
                    out.insert(key, value.clone());
                }
            }
        }
    }

    fn translatable_leaf(key: &str, value: &Value) -> Option<TranslatableField> {
        if key.split(KEY_DELIMITER).any(|segment| segment.starts_with('#')) {
            return None;
        }

        match value {
            Value::String(text) => Some(TranslatableField {
                key: key.to_string(),
                text: text.clone(),
                shape: FieldShape::Plain,
            }),
            Value::Object(leaf) => {
                if leaf.get(TRANSLATE_PROPERTY) == Some(&Value::Bool(false)) {
                    return None;
                }
                leaf.get(TEXT_PROPERTY)
                    .and_then(Value::as_str)
                    .map(|text| TranslatableField {
                        key: key.to_string(),
                        text: text.to_string(),
                        shape: FieldShape::Annotated,
                    })
            }
            _ => None,
        }
    }
}

impl DataShaper for NestedDataShaper {
    fn flatten(&self, data: &Value) -> FlatData {
        let mut flat = FlatData::new();
        match data {
            Value::Object(map) => Self::flatten_into(map, None, &mut flat),
            Value::Null => {}
            other => warn!("Ignoring non-object item data: {}", other),
        }
        flat
    }

    fn filter_translatable(&self, data: &Value) -> Vec<TranslatableField> {
        self.flatten(data)
            .iter()
            .filter_map(|(key, value)| Self::translatable_leaf(key, value))
            .collect()
    }

    fn unflatten(&self, flat: &FlatData) -> Value {
        let mut root = Map::new();

        'entries: for (key, value) in flat {
            let mut segments: Vec<String> = key.split(KEY_DELIMITER).map(unescape_segment).collect();
            let last = segments.pop().unwrap_or_default();

            let mut node = &mut root;
            for segment in segments {
                let entry = node
                    .entry(segment.as_str())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !entry.is_object() {
                    warn!("Key {} overwrites leaf at segment {}", key, segment);
                    *entry = Value::Object(Map::new());
                }
                let Some(child) = entry.as_object_mut() else {
                    continue 'entries;
                };
                node = child;
            }

            node.insert(last, value.clone());
        }

        Value::Object(root)
    }
}

fn escape_segment(segment: &str) -> String {
    if !segment.contains(|c: char| c == ESCAPE || c == ']') {
        return segment.to_string();
    }

    let mut escaped = String::with_capacity(segment.len() + 4);
    for c in segment.chars() {
        match c {
            ESCAPE => escaped.push_str("%25"),
            ']' => escaped.push_str("%5D"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn unescape_segment(segment: &str) -> String {
    if !segment.contains(ESCAPE) {
        return segment.to_string();
    }

    let mut unescaped = String::with_capacity(segment.len());
    let mut rest = segment;
    while let Some(pos) = rest.find(ESCAPE) {
        unescaped.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with("%25") {
            unescaped.push(ESCAPE);
            rest = &tail[3..];
        } else if tail.starts_with("%5D") {
            unescaped.push(']');
            rest = &tail[3..];
        } else {
            unescaped.push(ESCAPE);
            rest = &tail[1..];
        }
    }
    unescaped.push_str(rest);
    unescaped
}

/// Leaf value carrying a translation, in the source field's shape
pub fn translated_value(field: &TranslatableField, text: &str) -> Value {
    match field.shape {
        FieldShape::Plain => Value::String(text.to_string()),
        FieldShape::Annotated => {
            let mut leaf = Map::new();
            leaf.insert(TEXT_PROPERTY.to_string(), Value::String(text.to_string()));
            Value::Object(leaf)
        }
    }
}

/// Recursively merge `update` into `target`; objects merge, anything else replaces
pub fn merge_data(target: &mut Value, update: Value) {
    match (target, update) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match existing.get_mut(&key) {
                    Some(slot) => merge_data(slot, value),
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
