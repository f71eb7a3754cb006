// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Core output router.
//!
//! The router turns decoded log events into publications: it normalizes the
//! record, tags it with `@timestamp` and `@tag`, builds the routing key and
//! serializes what is left of the record as the body.

use crate::config::{ConfigError, OutputConfig};
use crate::publish::{Publication, Publisher, CONTENT_TYPE_JSON};
use crate::record::{normalize_record, RawValue, Record};
use crate::routing_key::{RoutingKey, RoutingKeyError};
use crate::stats::{OutputStats, OutputStatsSnapshot};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;

/// Field holding the event time in published records.
pub const TIMESTAMP_FIELD: &str = "@timestamp";

/// Field holding the event tag in published records.
pub const TAG_FIELD: &str = "@tag";

/// Router errors.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Routing key error: {0}")]
    RoutingKey(#[from] RoutingKeyError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A decoded event as delivered by the host runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    /// Tag the event was matched with.
    pub tag: String,

    /// Event time.
    pub timestamp: DateTime<Utc>,

    /// Decoded record entries.
    pub record: Vec<(RawValue, RawValue)>,
}

impl LogEvent {
    /// Create an event.
    pub fn new(
        tag: impl Into<String>,
        timestamp: DateTime<Utc>,
        record: Vec<(RawValue, RawValue)>,
    ) -> Self {
        Self {
            tag: tag.into(),
            timestamp,
            record,
        }
    }

    /// Create an event from a JSON object. Non-object values are stored
    /// under a `log` field.
    pub fn from_json(tag: impl Into<String>, timestamp: DateTime<Utc>, value: Value) -> Self {
        let record = match RawValue::from(value) {
            RawValue::Map(entries) => entries,
            other => vec![(RawValue::from("log"), other)],
        };
        Self::new(tag, timestamp, record)
    }
}

/// Outcome of one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
    pub published: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Routes log events to the configured exchange.
#[derive(Debug)]
pub struct OutputRouter {
    config: OutputConfig,
    routing_key: RoutingKey,
    stats: OutputStats,
}

impl OutputRouter {
    /// Create a router from configuration.
    ///
    /// Fails when the routing key template does not validate, before any
    /// record is processed.
    pub fn new(config: OutputConfig) -> Result<Self, RouterError> {
        config.validate()?;
        let routing_key = config.compile_routing_key()?;

        tracing::info!(
            output = %config.name,
            exchange = %config.exchange.name,
            template = %routing_key.template(),
            delimiter = %routing_key.delimiter(),
            consume = routing_key.is_consuming(),
            "Output router ready"
        );

        Ok(Self {
            config,
            routing_key,
            stats: OutputStats::new(),
        })
    }

    /// Get the router configuration.
    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// Get the compiled routing key.
    pub fn routing_key(&self) -> &RoutingKey {
        &self.routing_key
    }

    /// Get statistics snapshot.
    pub fn stats_snapshot(&self) -> OutputStatsSnapshot {
        self.stats.snapshot()
    }

    /// Normalize an event into the record that will be routed.
    pub fn prepare_record(&self, event: LogEvent) -> Record {
        let mut record = normalize_record(event.record);
        record.insert(
            TIMESTAMP_FIELD.to_string(),
            Value::String(event.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)),
        );
        record.insert(TAG_FIELD.to_string(), Value::String(event.tag));
        record
    }

    /// Route a single event.
    pub fn route_event(&self, event: LogEvent) -> Result<Publication, RouterError> {
        let mut record = self.prepare_record(event);
        let routing_key = self.routing_key.build(&mut record)?;
        let body = serde_json::to_vec(&record)?;

        Ok(Publication {
            exchange: self.config.exchange.name.clone(),
            routing_key,
            content_type: CONTENT_TYPE_JSON,
            body,
        })
    }

    /// Route and publish a batch of events.
    ///
    /// Events whose routing key cannot be built are skipped and publish
    /// failures are counted; neither stops the batch.
    pub fn flush<I, P>(&self, events: I, mut publisher: P) -> FlushSummary
    where
        I: IntoIterator<Item = LogEvent>,
        P: Publisher,
    {
        let mut summary = FlushSummary::default();

        for event in events {
            self.stats.record_received();
            let tag = event.tag.clone();

            let publication = match self.route_event(event) {
                Ok(publication) => publication,
                Err(err) => {
                    self.stats.record_skipped();
                    summary.skipped += 1;
                    tracing::warn!(tag = %tag, error = %err, "Couldn't create the routing key, skipping record");
                    continue;
                }
            };

            match publisher.publish(&publication) {
                Ok(()) => {
                    self.stats.record_published(publication.body.len() as u64);
                    summary.published += 1;
                    tracing::debug!(
                        tag = %tag,
                        routing_key = %publication.routing_key,
                        bytes = publication.body.len(),
                        "Published record"
                    );
                }
                Err(err) => {
                    self.stats.record_publish_error();
                    summary.failed += 1;
                    tracing::warn!(tag = %tag, error = %err, "Couldn't publish record");
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::TemplateError;
    use crate::publish::PublishError;
    use crate::resolve::ResolveError;
    use chrono::TimeZone;
    use serde_json::json;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    fn event(value: Value) -> LogEvent {
        LogEvent::from_json("kube.var.log", ts(), value)
    }

    struct RejectingPublisher;

    impl Publisher for RejectingPublisher {
        fn publish(&mut self, _publication: &Publication) -> Result<(), PublishError> {
            Err(PublishError::Rejected("channel closed".into()))
        }
    }

    #[test]
    fn test_router_rejects_invalid_template() {
        let err = OutputRouter::new(OutputConfig::new("logs", "a..b")).expect_err("invalid");
        assert!(matches!(
            err,
            RouterError::Config(ConfigError::Template(TemplateError::EmptySegment { position: 1 }))
        ));

        let err = OutputRouter::new(OutputConfig::new("logs", r#"$["a"]x"#)).expect_err("invalid");
        assert!(matches!(
            err,
            RouterError::Config(ConfigError::Template(TemplateError::InvalidAccessor(ref s)))
                if s == r#"$["a"]x"#
        ));

        let err = OutputRouter::new(OutputConfig::new("logs", "a").delimiter(""))
            .expect_err("empty delimiter");
        assert!(matches!(err, RouterError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_route_event() {
        let router = OutputRouter::new(OutputConfig::new("logs", r#"app.$["level"]"#))
            .expect("create router");

        let publication = router
            .route_event(event(json!({"level": "info", "msg": "hi"})))
            .expect("route");

        assert_eq!(publication.exchange, "logs");
        assert_eq!(publication.routing_key, "app.info");
        assert_eq!(publication.content_type, "application/json");

        let body: Value = serde_json::from_slice(&publication.body).expect("json body");
        assert_eq!(body["level"], "info");
        assert_eq!(body["msg"], "hi");
        assert_eq!(body["@tag"], "kube.var.log");
        assert_eq!(body["@timestamp"], "2024-05-01T12:30:00.000000000Z");
    }

    #[test]
    fn test_template_can_use_tag() {
        let router = OutputRouter::new(OutputConfig::new("logs", r#"$["@tag"]"#).delimiter("|"))
            .expect("create router");
        let publication = router.route_event(event(json!({}))).expect("route");
        assert_eq!(publication.routing_key, "kube.var.log");
    }

    #[test]
    fn test_consumed_fields_are_not_published() {
        let router = OutputRouter::new(
            OutputConfig::new("logs", r#"$["kubernetes"]["namespace"].$["tags"][0]"#).consume(true),
        )
        .expect("create router");

        let publication = router
            .route_event(event(json!({
                "kubernetes": {"namespace": "prod", "pod": "web-1"},
                "tags": ["blue", "green"],
                "msg": "hello"
            })))
            .expect("route");

        assert_eq!(publication.routing_key, "prod.blue");
        let body: Value = serde_json::from_slice(&publication.body).expect("json body");
        assert_eq!(body["kubernetes"], json!({"pod": "web-1"}));
        assert_eq!(body["tags"], json!(["green"]));
        assert_eq!(body["msg"], "hello");
    }

    #[test]
    fn test_route_event_failure() {
        let router = OutputRouter::new(OutputConfig::new("logs", r#"$["missing"]"#))
            .expect("create router");
        let err = router.route_event(event(json!({"a": 1}))).expect_err("missing field");
        assert!(matches!(
            err,
            RouterError::RoutingKey(RoutingKeyError::Resolve {
                source: ResolveError::FieldNotFound(_),
                ..
            })
        ));
    }

    #[test]
    fn test_flush_skips_unroutable_records() {
        let router = OutputRouter::new(OutputConfig::new("logs", r#"$["level"]"#))
            .expect("create router");
        let mut sink: Vec<Publication> = Vec::new();

        let summary = router.flush(
            vec![
                event(json!({"level": "info"})),
                event(json!({"msg": "no level"})),
                event(json!({"level": "error"})),
            ],
            &mut sink,
        );

        assert_eq!(
            summary,
            FlushSummary {
                published: 2,
                skipped: 1,
                failed: 0
            }
        );
        let keys: Vec<_> = sink.iter().map(|p| p.routing_key.as_str()).collect();
        assert_eq!(keys, vec!["info", "error"]);

        let stats = router.stats_snapshot();
        assert_eq!(stats.records_received, 3);
        assert_eq!(stats.records_published, 2);
        assert_eq!(stats.records_skipped, 1);
    }

    #[test]
    fn test_flush_counts_publish_errors() {
        let router =
            OutputRouter::new(OutputConfig::new("logs", "static")).expect("create router");
        let summary = router.flush(vec![event(json!({})), event(json!({}))], RejectingPublisher);

        assert_eq!(summary.failed, 2);
        assert_eq!(router.stats_snapshot().publish_errors, 2);
        assert_eq!(router.stats_snapshot().records_published, 0);
    }

    #[test]
    fn test_binary_fields_published_as_text() {
        let router = OutputRouter::new(OutputConfig::new("logs", r#"$["host"]"#))
            .expect("create router");
        let record = vec![
            (RawValue::from("host"), RawValue::Bytes(b"node-7".to_vec())),
            (RawValue::from("log"), RawValue::Bytes(b"started".to_vec())),
        ];
        let publication = router
            .route_event(LogEvent::new("app", ts(), record))
            .expect("route");

        assert_eq!(publication.routing_key, "node-7");
        let body: Value = serde_json::from_slice(&publication.body).expect("json body");
        assert_eq!(body["log"], "started");
    }

    #[test]
    fn test_event_from_non_object_json() {
        let e = event(json!("plain line"));
        assert_eq!(e.record, vec![(RawValue::from("log"), RawValue::from("plain line"))]);
    }
}
