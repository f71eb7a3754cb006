// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Routing-key engine for log forwarding.
//!
//! Builds message-broker routing keys from fields nested anywhere inside a
//! log record, using record accessors such as `$["kubernetes"]["labels"][0]`.
//!
//! # Features
//!
//! - **Record Accessors**: Named-field (`["name"]`, `['name']`) and
//!   positional (`[0]`) tokens over nested records and arrays
//! - **Template Validation**: Templates are checked once at startup
//! - **Key Assembly**: Literal text and accessors joined by a delimiter,
//!   with per-record memoization
//! - **Consume Mode**: Optionally remove the values used in the key from the
//!   published record
//!
//! # Quick Start
//!
//! ```rust
//! use rkey_router::{Record, RoutingKey};
//! use serde_json::json;
//!
//! let key = RoutingKey::new(r#"logs.$["user"]["roles"][1]"#, ".").unwrap();
//! let mut record: Record = json!({"user": {"roles": ["admin", "ops"]}})
//!     .as_object()
//!     .cloned()
//!     .unwrap();
//!
//! assert_eq!(key.build(&mut record).unwrap(), "logs.ops");
//! ```
//!
//! # Configuration File
//!
//! ```toml
//! name = "k8s-logs"
//!
//! [broker]
//! host = "rabbitmq"
//! port = 5672
//!
//! [exchange]
//! name = "logs"
//! kind = "topic"
//!
//! [routing_key]
//! template = '$["kubernetes"]["namespace_name"].$["level"]'
//! delimiter = "."
//! consume = false
//! ```

pub mod accessor;
pub mod config;
pub mod publish;
pub mod record;
pub mod resolve;
pub mod router;
pub mod routing_key;
pub mod stats;

pub use accessor::{validate_template, Accessor, TemplateError, Token};
pub use config::{ConfigError, OutputConfig, RoutingKeyConfig};
pub use publish::{JsonLinesPublisher, Publication, PublishError, Publisher};
pub use record::{normalize_record, normalize_value, RawValue, Record};
pub use resolve::{resolve, resolve_from_sequence, ResolveError};
pub use router::{FlushSummary, LogEvent, OutputRouter, RouterError};
pub use routing_key::{build_routing_key, ResolutionCache, RoutingKey, RoutingKeyError};
pub use stats::{OutputStats, OutputStatsSnapshot};
