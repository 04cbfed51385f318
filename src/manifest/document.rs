// src/manifest/document.rs

use serde_json::{Map, Value};
use thiserror::Error;

use super::permissions::is_host_pattern;

/// UTF-8 byte order mark
const BOM: &str = "\u{feff}";

/// Errors raised while parsing or serializing a manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("manifest.json is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("Failed to parse manifest.json: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("manifest.json must contain a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("Failed to serialize manifest.json: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// A parsed `manifest.json`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ManifestDocument {
    fields: Map<String, Value>,
}

impl ManifestDocument {
    /// Parse manifest bytes
    ///
    /// A leading BOM is ignored. Chrome accepts `//` and `/* */` comments in
    /// manifests, so strict JSON parsing falls back to a comment-stripped copy.
    pub fn parse(bytes: &[u8]) -> Result<Self, ManifestError> {
        let text = std::str::from_utf8(bytes)?;
        let text = text.strip_prefix(BOM).unwrap_or(text);

        let value = match serde_json::from_str::<Value>(text) {
            Ok(value) => value,
            Err(strict_err) => serde_json::from_str::<Value>(&strip_comments(text))
                .map_err(|_| ManifestError::Parse(strict_err))?,
        };
        Self::from_value(value)
    }

    /// Wrap a JSON value, which must be an object
    pub fn from_value(value: Value) -> Result<Self, ManifestError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(ManifestError::NotAnObject(json_type_name(&other))),
        }
    }

    /// Serialize as pretty-printed JSON with a trailing newline
    pub fn to_bytes(&self) -> Result<Vec<u8>, ManifestError> {
        let mut out = serde_json::to_vec_pretty(&self.fields).map_err(ManifestError::Serialize)?;
        out.push(b'\n');
        Ok(out)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields.get_mut(key)
    }

    /// String value of a top-level key
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Insert or replace a top-level key, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(key.into(), value)
    }

    /// Remove a top-level key, keeping the order of the others
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `manifest_version`, if present and numeric
    pub fn manifest_version(&self) -> Option<u64> {
        self.fields.get("manifest_version").and_then(Value::as_u64)
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    pub fn version(&self) -> Option<&str> {
        self.get_str("version")
    }

    pub fn description(&self) -> Option<&str> {
        self.get_str("description")
    }

    /// String entries of a permission-style array (`permissions`, `host_permissions`, ...)
    pub fn string_list(&self, key: &str) -> Vec<String> {
        self.fields
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Host match patterns from `host_permissions` and `permissions`
    pub fn host_patterns(&self) -> Vec<String> {
        let mut hosts = self.string_list("host_permissions");
        for permission in self.string_list("permissions") {
            if is_host_pattern(&permission) && !hosts.contains(&permission) {
                hosts.push(permission);
            }
        }
        hosts
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Remove `//` and `/* */` comments outside of string literals
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}
