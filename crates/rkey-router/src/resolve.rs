// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Accessor resolution against normalized records.
//!
//! Resolution walks the record one token at a time. Field tokens are only
//! legal on records and index tokens only on arrays; every mismatch or miss
//! is reported with the token that caused it.
//!
//! With `consume` set, the resolved entry is removed from its parent once
//! the leaf is reached: the key is deleted from a record, or the element is
//! removed from an array with later elements shifting left.

use crate::accessor::Token;
use crate::record::{printable, Record};
use serde_json::Value;
use thiserror::Error;

/// Resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Record accessor has no tokens")]
    EmptyAccessor,

    #[error("Field '{0}' not found in record")]
    FieldNotFound(String),

    #[error("Index {index} exceeds the array size {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Array accessor '{0}' is not a valid index")]
    InvalidIndex(String),

    #[error("Array accessor '[{0}]' used on a record, a field accessor is required")]
    ArrayAccessorOnRecord(String),

    #[error("Field accessor '{0}' used on an array, an array accessor is required")]
    RecordAccessorOnArray(String),

    #[error("Value at '{0}' is a scalar but the accessor continues")]
    PathTooDeep(String),
}

/// Resolve `tokens` starting at a record.
pub fn resolve(record: &mut Record, tokens: &[Token], consume: bool) -> Result<String, ResolveError> {
    let (token, rest) = tokens.split_first().ok_or(ResolveError::EmptyAccessor)?;

    let name = match token {
        Token::Field { name, .. } => name,
        Token::Index(digits) => return Err(ResolveError::ArrayAccessorOnRecord(digits.clone())),
    };

    if rest.is_empty() {
        let text = record
            .get(name)
            .map(printable)
            .ok_or_else(|| ResolveError::FieldNotFound(name.clone()))?;
        if consume {
            record.remove(name);
        }
        return Ok(text);
    }

    match record.get_mut(name) {
        None => Err(ResolveError::FieldNotFound(name.clone())),
        Some(value) => descend(value, name, rest, consume),
    }
}

/// Resolve `tokens` starting at an array.
pub fn resolve_from_sequence(
    items: &mut Vec<Value>,
    tokens: &[Token],
    consume: bool,
) -> Result<String, ResolveError> {
    let (token, rest) = tokens.split_first().ok_or(ResolveError::EmptyAccessor)?;

    let digits = match token {
        Token::Index(digits) => digits,
        Token::Field { name, .. } => return Err(ResolveError::RecordAccessorOnArray(name.clone())),
    };
    let index: usize = digits
        .parse()
        .map_err(|_| ResolveError::InvalidIndex(digits.clone()))?;

    if index >= items.len() {
        return Err(ResolveError::IndexOutOfRange {
            index,
            len: items.len(),
        });
    }

    if rest.is_empty() {
        let text = printable(&items[index]);
        if consume {
            items.remove(index);
        }
        return Ok(text);
    }

    descend(&mut items[index], digits, rest, consume)
}

fn descend(
    value: &mut Value,
    key: &str,
    rest: &[Token],
    consume: bool,
) -> Result<String, ResolveError> {
    match value {
        Value::Object(record) => resolve(record, rest, consume),
        Value::Array(items) => resolve_from_sequence(items, rest, consume),
        _ => Err(ResolveError::PathTooDeep(key.to_string())),
    }
}
