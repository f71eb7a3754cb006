// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use rkey_router::{build_routing_key, validate_template, RoutingKey};
use serde_json::json;

fuzz_target!(|data: &[u8]| {
    let Ok(template) = std::str::from_utf8(data) else {
        return;
    };

    let mut record = json!({
        "a": "x",
        "arr": ["x", {"b": [1, 2, 3]}, null],
        "user": {"roles": ["admin", "ops"], "id": 7}
    })
    .as_object()
    .cloned()
    .unwrap_or_default();

    // Validated templates through the compiled path, consuming
    if validate_template(template, ".").is_ok() {
        if let Ok(key) = RoutingKey::new(template, ".") {
            let _ = key.consume(true).build(&mut record.clone());
        }
    }

    // Unvalidated templates must fail cleanly, never panic
    let _ = build_routing_key(template, &mut record, ".", true);
});
