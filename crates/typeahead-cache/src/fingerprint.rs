//! Request fingerprinting
//!
//! The fingerprint keys both the cache and the request coalescer, so it
//! must be identical for equal inputs across calls and processes:
//! provider types are sorted, metadata objects are canonicalized with
//! sorted keys, and the digest is a stable MD5 hex string.

/// Render a JSON value to a canonical compact string with sorted object
/// keys at every level
pub fn canonical_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| {
                    format!(
                        "{}:{}",
                        serde_json::Value::String(k.clone()),
                        canonical_json(&map[k])
                    )
                })
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        serde_json::Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", rendered.join(","))
        }
        other => other.to_string(),
    }
}

/// Compute the fingerprint for a request
///
/// Inputs are the ones that change what the server would answer: the
/// query, the app context and page, the allowed provider types, the
/// result bound, and any widget-supplied metadata. `max_results` is part
/// of the key on purpose: requests differing only in it never share a
/// cache slot or a network call.
pub fn fingerprint(
    query: &str,
    app_context: &str,
    current_page: &str,
    provider_types: &[String],
    max_results: usize,
    metadata: &serde_json::Value,
) -> String {
    let mut providers: Vec<&str> = provider_types.iter().map(String::as_str).collect();
    providers.sort_unstable();

    let payload = format!(
        "q={query}\u{1f}app={app_context}\u{1f}page={current_page}\u{1f}providers={}\u{1f}max={max_results}\u{1f}meta={}",
        providers.join(","),
        canonical_json(metadata),
    );

    format!("{:x}", md5::compute(payload.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn providers(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_identical_inputs_give_identical_digests() {
        let a = fingerprint("agent", "dashboard", "/home", &providers(&["ai"]), 8, &json!({}));
        let b = fingerprint("agent", "dashboard", "/home", &providers(&["ai"]), 8, &json!({}));
        assert_eq!(a, b);
    }

    #[test]
    fn test_provider_order_does_not_matter() {
        let a = fingerprint(
            "agent",
            "storefront",
            "/",
            &providers(&["product", "category"]),
            8,
            &json!({}),
        );
        let b = fingerprint(
            "agent",
            "storefront",
            "/",
            &providers(&["category", "product"]),
            8,
            &json!({}),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_metadata_key_order_does_not_matter() {
        let a = fingerprint(
            "q",
            "storefront",
            "/",
            &providers(&["product"]),
            5,
            &json!({"cart_total": 10.0, "view_count": 3}),
        );
        let b = fingerprint(
            "q",
            "storefront",
            "/",
            &providers(&["product"]),
            5,
            &json!({"view_count": 3, "cart_total": 10.0}),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_max_results_is_part_of_the_key() {
        let a = fingerprint("q", "dashboard", "/", &providers(&["ai"]), 5, &json!({}));
        let b = fingerprint("q", "dashboard", "/", &providers(&["ai"]), 10, &json!({}));
        assert_ne!(a, b);
    }

    #[test]
    fn test_query_is_part_of_the_key() {
        let a = fingerprint("ag", "dashboard", "/", &providers(&["ai"]), 5, &json!({}));
        let b = fingerprint("agen", "dashboard", "/", &providers(&["ai"]), 5, &json!({}));
        assert_ne!(a, b);
    }

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        let value = json!({"b": {"d": 1, "c": [1, 2]}, "a": null});
        assert_eq!(canonical_json(&value), r#"{"a":null,"b":{"c":[1,2],"d":1}}"#);
    }
}
