// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use rkey_router::{normalize_record, RawValue, RoutingKey};

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    let entries = match RawValue::from(value) {
        RawValue::Map(entries) => entries,
        other => vec![(RawValue::Bytes(b"log".to_vec()), other)],
    };
    let mut record = normalize_record(entries);

    for template in [
        r#"$["a"]"#,
        r#"$["a"][0]"#,
        r#"$["a"]["b"][1]"#,
        r#"lit.$["log"].$["a"][0][0]"#,
    ] {
        if let Ok(key) = RoutingKey::new(template, ".") {
            let _ = key.consume(true).build(&mut record);
        }
    }
});
