// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record accessor grammar and routing-key template validation.
//!
//! An accessor starts with `$` followed by one or more bracketed tokens:
//!
//! - `["field"]` or `['field']` selects a field of a record,
//! - `[0]`, `[12]` selects an element of an array.
//!
//! Field names may not contain whitespace or their own quote character.
//! Indices are written without leading zeros.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Anchored grammar for a whole accessor expression.
const ACCESSOR_PATTERN: &str = r#"^\$((\["[^\s"]+"\])|(\['[^\s']+'\])|(\[[1-9][0-9]*\])|(\[0\]))+$"#;

/// Unanchored pattern picking the individual tokens out of an accessor.
const TOKEN_PATTERN: &str = r#""([^\s"]+)"|'([^\s']+)'|\[(0|[1-9][0-9]*)\]"#;

fn accessor_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Constant pattern, covered by the tests below.
    RE.get_or_init(|| Regex::new(ACCESSOR_PATTERN).expect("accessor pattern compiles"))
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TOKEN_PATTERN).expect("token pattern compiles"))
}

/// Template validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Routing key template is empty")]
    EmptyTemplate,

    #[error("Routing key template contains an empty segment at position {position}")]
    EmptySegment { position: usize },

    #[error("Record accessor '{0}' is invalid")]
    InvalidAccessor(String),
}

/// Quote style of a field token, kept so the token can be printed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Double,
    Single,
}

/// One step of an accessor path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Named-field access on a record.
    Field { name: String, quote: Quote },

    /// Positional access on an array. The digits are kept as written and
    /// converted at resolution time.
    Index(String),
}

impl Token {
    /// Double-quoted field token.
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field {
            name: name.into(),
            quote: Quote::Double,
        }
    }

    /// Index token.
    pub fn index(position: usize) -> Self {
        Self::Index(position.to_string())
    }

    /// Field name or index text, without brackets or quotes.
    pub fn key(&self) -> &str {
        match self {
            Self::Field { name, .. } => name,
            Self::Index(digits) => digits,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field {
                name,
                quote: Quote::Double,
            } => write!(f, "[\"{}\"]", name),
            Self::Field {
                name,
                quote: Quote::Single,
            } => write!(f, "['{}']", name),
            Self::Index(digits) => write!(f, "[{}]", digits),
        }
    }
}

/// A parsed accessor expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    raw: String,
    tokens: Vec<Token>,
}

impl Accessor {
    /// Validate and tokenize an accessor expression.
    pub fn parse(expr: &str) -> Result<Self, TemplateError> {
        if !is_valid_accessor(expr) {
            return Err(TemplateError::InvalidAccessor(expr.to_string()));
        }
        Ok(Self::from_validated(expr))
    }

    /// Tokenize without validating.
    ///
    /// Text that is not a token is skipped, so an expression like `$` yields
    /// no tokens at all. Used for segments already checked by
    /// [`validate_template`].
    pub fn from_validated(expr: &str) -> Self {
        Self {
            raw: expr.to_string(),
            tokens: tokenize(expr),
        }
    }

    /// The expression as written in the template.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Path tokens from the record root to the leaf.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Check an accessor expression against the grammar.
pub fn is_valid_accessor(expr: &str) -> bool {
    accessor_regex().is_match(expr)
}

/// Split an accessor expression into its tokens.
pub fn tokenize(expr: &str) -> Vec<Token> {
    token_regex()
        .captures_iter(expr)
        .filter_map(|caps| {
            if let Some(name) = caps.get(1) {
                Some(Token::Field {
                    name: name.as_str().to_string(),
                    quote: Quote::Double,
                })
            } else if let Some(name) = caps.get(2) {
                Some(Token::Field {
                    name: name.as_str().to_string(),
                    quote: Quote::Single,
                })
            } else {
                caps.get(3).map(|digits| Token::Index(digits.as_str().to_string()))
            }
        })
        .collect()
}

/// Validate a routing-key template for the given delimiter.
///
/// Segments starting with `$` must be complete accessors; every other
/// segment is literal text.
pub fn validate_template(template: &str, delimiter: &str) -> Result<(), TemplateError> {
    if template.is_empty() {
        return Err(TemplateError::EmptyTemplate);
    }

    for (position, segment) in split_template(template, delimiter).enumerate() {
        if segment.is_empty() {
            return Err(TemplateError::EmptySegment { position });
        }
        if segment.starts_with('$') && !is_valid_accessor(segment) {
            return Err(TemplateError::InvalidAccessor(segment.to_string()));
        }
    }

    Ok(())
}

/// Split a template on the delimiter. An empty delimiter leaves the template
/// in one piece.
pub(crate) fn split_template<'a>(
    template: &'a str,
    delimiter: &'a str,
) -> Box<dyn Iterator<Item = &'a str> + 'a> {
    if delimiter.is_empty() {
        Box::new(std::iter::once(template))
    } else {
        Box::new(template.split(delimiter))
    }
}
