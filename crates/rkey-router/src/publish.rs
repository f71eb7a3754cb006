// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Publications and the publisher seam.
//!
//! The broker client lives outside this crate. Anything that can deliver a
//! [`Publication`] implements [`Publisher`].

use std::io::Write;
use thiserror::Error;

/// Content type of published bodies.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Publish errors.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Broker rejected publication: {0}")]
    Rejected(String),
}

/// A routed record ready for the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Exchange name.
    pub exchange: String,

    /// Routing key built from the record.
    pub routing_key: String,

    /// Body content type.
    pub content_type: &'static str,

    /// Serialized record.
    pub body: Vec<u8>,
}

impl Publication {
    /// Body as text.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// Delivers publications to a destination.
pub trait Publisher {
    /// Publish one record.
    fn publish(&mut self, publication: &Publication) -> Result<(), PublishError>;
}

impl<P: Publisher + ?Sized> Publisher for &mut P {
    fn publish(&mut self, publication: &Publication) -> Result<(), PublishError> {
        (**self).publish(publication)
    }
}

/// Collects publications in memory.
impl Publisher for Vec<Publication> {
    fn publish(&mut self, publication: &Publication) -> Result<(), PublishError> {
        self.push(publication.clone());
        Ok(())
    }
}

/// Writes `routing_key<TAB>body` lines to a writer.
#[derive(Debug)]
pub struct JsonLinesPublisher<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesPublisher<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<(), PublishError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Publisher for JsonLinesPublisher<W> {
    fn publish(&mut self, publication: &Publication) -> Result<(), PublishError> {
        self.writer.write_all(publication.routing_key.as_bytes())?;
        self.writer.write_all(b"\t")?;
        self.writer.write_all(&publication.body)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publication(key: &str, body: &str) -> Publication {
        Publication {
            exchange: "logs".into(),
            routing_key: key.into(),
            content_type: CONTENT_TYPE_JSON,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_json_lines_publisher() {
        let mut publisher = JsonLinesPublisher::new(Vec::new());
        publisher
            .publish(&publication("app.info", r#"{"a":1}"#))
            .expect("publish");
        publisher
            .publish(&publication("app.warn", r#"{"a":2}"#))
            .expect("publish");

        let out = String::from_utf8(publisher.into_inner()).expect("utf8");
        assert_eq!(out, "app.info\t{\"a\":1}\napp.warn\t{\"a\":2}\n");
    }

    #[test]
    fn test_vec_publisher() {
        let mut sink: Vec<Publication> = Vec::new();
        sink.publish(&publication("k", "{}")).expect("publish");
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].body_str(), Some("{}"));
    }
}
