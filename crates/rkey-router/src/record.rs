// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Decoded and normalized log records.
//!
//! The host runtime hands over records as loosely typed trees ([`RawValue`]):
//! map keys may be byte strings or numbers and text often arrives as raw
//! bytes. [`normalize_record`] turns such a tree into a [`Record`] whose keys
//! are printable field names and whose byte strings are plain text.

use serde_json::{Map, Number, Value};

/// A normalized record: printable field names mapped to JSON values.
pub type Record = Map<String, Value>;

/// A value as produced by the inbound record decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Nil,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Array(Vec<RawValue>),
    /// Map entries in decode order. Keys are not restricted to text.
    Map(Vec<(RawValue, RawValue)>),
}

impl RawValue {
    /// Build a map value from `(key, value)` pairs with text keys.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, RawValue)>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (Self::Str(k.into()), v))
                .collect(),
        )
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Nil,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Self::Str(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (Self::Str(k), Self::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Normalize the top-level entries of a decoded record.
///
/// Later duplicates of the same field name overwrite earlier ones.
pub fn normalize_record(entries: Vec<(RawValue, RawValue)>) -> Record {
    let mut record = Record::new();
    for (key, value) in entries {
        record.insert(field_name(key), normalize_value(value));
    }
    record
}

/// Normalize a single decoded value.
///
/// Byte strings become text (lossy UTF-8, never base64). Maps and arrays are
/// normalized recursively. Non-finite floats have no JSON number form and are
/// kept as their text rendering (`+Inf`, `-Inf`, `NaN`).
pub fn normalize_value(value: RawValue) -> Value {
    match value {
        RawValue::Nil => Value::Null,
        RawValue::Bool(b) => Value::Bool(b),
        RawValue::Int(i) => Value::Number(i.into()),
        RawValue::UInt(u) => Value::Number(u.into()),
        RawValue::Float(f) => Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(float_text(f))),
        RawValue::Str(s) => Value::String(s),
        RawValue::Bytes(bytes) => Value::String(bytes_to_text(bytes)),
        RawValue::Array(items) => Value::Array(items.into_iter().map(normalize_value).collect()),
        RawValue::Map(entries) => Value::Object(normalize_record(entries)),
    }
}

/// Printable field name for a decoded map key.
fn field_name(key: RawValue) -> String {
    match key {
        RawValue::Str(s) => s,
        RawValue::Bytes(bytes) => bytes_to_text(bytes),
        other => printable(&normalize_value(other)),
    }
}

fn bytes_to_text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Uniform scalar-to-text conversion used for routing-key values.
///
/// Text is rendered without quotes, numbers and booleans in their natural
/// form and `null` as `null`. Containers render as compact JSON.
pub fn printable(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => float_text(f),
            _ => n.to_string(),
        },
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Shortest text for a float: whole values drop the fraction, and very small
/// or very large magnitudes switch to exponent form (`1e+21`, `1e-05`).
fn float_text(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }

    let magnitude = f.abs();
    if magnitude != 0.0 && !(1e-4..1e21).contains(&magnitude) {
        // Rust prints "1e21" / "1.5e-7"; sign the exponent and pad to two digits
        let shortest = format!("{:e}", f);
        if let Some((mantissa, exponent)) = shortest.split_once('e') {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            return format!("{}e{}{:0>2}", mantissa, sign, digits);
        }
        return shortest;
    }

    format!("{}", f)
}
