//! Coercion from the JSON-dynamic tool arguments into typed values.
//!
//! Arguments arrive as an untyped JSON map; numbers show up as floats and
//! must round-trip to integers, arrays must be non-empty, and every mismatch
//! becomes a validation error the agent can read and correct.

use iteratr_core::error::{Result, StoreError};
use serde_json::{Map, Value};

/// Borrowed view over a tool call's `arguments` object.
pub struct Args<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Args<'a> {
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Self { map }
    }

    /// Required string argument.
    pub fn str(&self, key: &str) -> Result<&'a str> {
        match self.opt_str(key)? {
            Some(value) => Ok(value),
            None => Err(missing(key)),
        }
    }

    /// Optional string argument; present but non-string is an error.
    pub fn opt_str(&self, key: &str) -> Result<Option<&'a str>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.as_str())),
            Some(_) => Err(type_mismatch(key, "a string")),
        }
    }

    /// Optional integer argument within an inclusive range. JSON numbers
    /// arrive as floating point; fractional values are rejected rather than
    /// truncated.
    pub fn opt_int(&self, key: &str, min: i64, max: i64) -> Result<Option<i64>> {
        let value = match self.map.get(key) {
            None | Some(Value::Null) => return Ok(None),
            Some(value) => value,
        };
        let number = match (value.as_i64(), value.as_f64()) {
            (Some(int), _) => int,
            (None, Some(float)) if float.fract() == 0.0 => float as i64,
            (None, Some(_)) => return Err(type_mismatch(key, "an integer")),
            _ => return Err(type_mismatch(key, "a number")),
        };
        if number < min || number > max {
            return Err(StoreError::Validation(format!(
                "Field '{key}' must be between {min} and {max}, got {number}"
            )));
        }
        Ok(Some(number))
    }

    /// Required non-empty array of objects.
    pub fn objects(&self, key: &str) -> Result<Vec<Args<'a>>> {
        let items = match self.map.get(key) {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(type_mismatch(key, "an array")),
            None => return Err(missing(key)),
        };
        if items.is_empty() {
            return Err(StoreError::Validation(format!(
                "Field '{key}' must not be empty"
            )));
        }
        items
            .iter()
            .map(|item| match item {
                Value::Object(map) => Ok(Args::new(map)),
                _ => Err(StoreError::Validation(format!(
                    "Each element of '{key}' must be an object"
                ))),
            })
            .collect()
    }

    /// Optional array of strings; defaults to empty.
    pub fn str_list(&self, key: &str) -> Result<Vec<String>> {
        let items = match self.map.get(key) {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(_) => return Err(type_mismatch(key, "an array")),
        };
        items
            .iter()
            .map(|item| match item {
                Value::String(value) => Ok(value.clone()),
                _ => Err(StoreError::Validation(format!(
                    "Each element of '{key}' must be a string"
                ))),
            })
            .collect()
    }

    /// Whether the argument is present at all (including null).
    pub fn has(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }
}

fn missing(key: &str) -> StoreError {
    StoreError::Validation(format!("Field '{key}' is required"))
}

fn type_mismatch(key: &str, expected: &str) -> StoreError {
    StoreError::Validation(format!("Field '{key}' must be {expected}"))
}
