// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Routing-key assembly.
//!
//! A template is split on the delimiter into literal segments and accessor
//! segments. Accessors are resolved against the record and the results are
//! joined back together with the delimiter.
//!
//! Each build owns a fresh [`ResolutionCache`], so an accessor appearing
//! several times in one template is resolved once per record.
//!
//! # Consume mode
//!
//! Segments are resolved left to right. When consume mode removes an array
//! element, later elements move down one index, and a later segment indexing
//! the same array sees the shifted array. Templates that take several
//! elements of one array should list them in descending index order.

use crate::accessor::{split_template, validate_template, Accessor, TemplateError};
use crate::record::Record;
use crate::resolve::{resolve, ResolveError};
use std::collections::HashMap;
use thiserror::Error;

/// Default segment delimiter.
pub const DEFAULT_DELIMITER: &str = ".";

/// Routing-key errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingKeyError {
    #[error("Invalid routing key template: {0}")]
    Template(#[from] TemplateError),

    #[error("Couldn't resolve '{segment}': {source}")]
    Resolve {
        segment: String,
        #[source]
        source: ResolveError,
    },
}

/// One piece of a split template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Copied verbatim.
    Literal(String),

    /// Resolved against the record.
    Accessor(Accessor),
}

impl Segment {
    fn classify(raw: &str) -> Self {
        if raw.starts_with('$') {
            Self::Accessor(Accessor::from_validated(raw))
        } else {
            Self::Literal(raw.to_string())
        }
    }
}

/// Resolved accessor text for a single build, keyed by the raw accessor.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<String, String>,
}

impl ResolutionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached text for an accessor.
    pub fn get(&self, raw: &str) -> Option<&str> {
        self.entries.get(raw).map(String::as_str)
    }

    /// Store the text resolved for an accessor.
    pub fn insert(&mut self, raw: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(raw.into(), text.into());
    }

    /// Number of distinct accessors resolved.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A validated routing-key template.
#[derive(Debug, Clone)]
pub struct RoutingKey {
    template: String,
    delimiter: String,
    segments: Vec<Segment>,
    consume: bool,
}

impl RoutingKey {
    /// Validate `template` for `delimiter` and split it into segments.
    pub fn new(
        template: impl Into<String>,
        delimiter: impl Into<String>,
    ) -> Result<Self, RoutingKeyError> {
        let template = template.into();
        let delimiter = delimiter.into();
        validate_template(&template, &delimiter)?;

        let segments = split_template(&template, &delimiter)
            .map(Segment::classify)
            .collect();

        Ok(Self {
            template,
            delimiter,
            segments,
            consume: false,
        })
    }

    /// Remove resolved values from the record while building.
    pub fn consume(mut self, enabled: bool) -> Self {
        self.consume = enabled;
        self
    }

    /// The template as configured.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The segment delimiter.
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Whether resolved values are removed from the record.
    pub fn is_consuming(&self) -> bool {
        self.consume
    }

    /// Template segments in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Build the routing key for one record.
    pub fn build(&self, record: &mut Record) -> Result<String, RoutingKeyError> {
        assemble(&self.segments, record, &self.delimiter, self.consume)
    }
}

/// Build a routing key from an unparsed template.
///
/// The template must already have passed [`validate_template`] with the same
/// delimiter.
pub fn build_routing_key(
    template: &str,
    record: &mut Record,
    delimiter: &str,
    consume: bool,
) -> Result<String, RoutingKeyError> {
    let segments: Vec<Segment> = split_template(template, delimiter)
        .map(Segment::classify)
        .collect();
    assemble(&segments, record, delimiter, consume)
}

fn assemble(
    segments: &[Segment],
    record: &mut Record,
    delimiter: &str,
    consume: bool,
) -> Result<String, RoutingKeyError> {
    let mut cache = ResolutionCache::new();
    let mut key = String::new();

    for (idx, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Literal(text) => key.push_str(text),
            Segment::Accessor(accessor) => {
                if let Some(text) = cache.get(accessor.raw()) {
                    key.push_str(text);
                } else {
                    let text = resolve(record, accessor.tokens(), consume).map_err(|source| {
                        RoutingKeyError::Resolve {
                            segment: accessor.raw().to_string(),
                            source,
                        }
                    })?;
                    key.push_str(&text);
                    cache.insert(accessor.raw(), text);
                }
            }
        }

        if idx + 1 != segments.len() {
            key.push_str(delimiter);
        }
    }

    tracing::trace!(resolved = cache.len(), key = %key, "Built routing key");
    Ok(key)
}
