//! k6 script generation.
//!
//! `generate` turns a validated [`RunConfig`] into a self-contained k6 script:
//! an `options` block with `vus`/`duration` and a default function issuing one
//! request per iteration followed by `sleep(1)`. String values are embedded as
//! JSON literals, which are also valid JavaScript string literals.

mod comments;

pub use comments::strip_comments;

use serde_json::{json, Map, Value};

use crate::error::PanelError;
use crate::run_config::RunConfig;

/// Render the k6 script for `config`. Pure; fails before any I/O on invalid input.
pub fn generate(config: &RunConfig) -> Result<String, PanelError> {
    config.validate()?;

    let payload = config.payload()?;
    let url = config.effective_url();

    let mut headers: Map<String, Value> = config
        .headers
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    if payload.is_some() {
        headers.retain(|k, _| !k.eq_ignore_ascii_case("content-type"));
        headers.insert("Content-Type".into(), json!("application/json"));
    }
    let params = json!({ "headers": headers });

    let payload_expr = match &payload {
        Some(value) => format!("JSON.stringify({})", value),
        None => "null".to_string(),
    };

    Ok(format!(
        r#"import http from 'k6/http';
import {{ sleep }} from 'k6';

export const options = {{
    vus: {vus},
    duration: {duration},
}};

export default function () {{
    const url = {url};
    const payload = {payload};
    const params = {params};
    http.request({method}, url, payload, params);
    sleep(1);
}}
"#,
        vus = config.virtual_users,
        duration = js_string(&config.duration),
        url = js_string(&url),
        payload = payload_expr,
        params = params,
        method = js_string(config.method.as_str()),
    ))
}

fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_config::HttpMethod;
    use std::collections::BTreeMap;

    fn ping_config() -> RunConfig {
        RunConfig {
            target_url: "https://example.test/ping".into(),
            method: HttpMethod::Get,
            virtual_users: 5,
            duration: "10s".into(),
            headers: BTreeMap::new(),
            query_params: BTreeMap::new(),
            request_body: None,
        }
    }

    #[test]
    fn test_simple_get_script() {
        let script = generate(&ping_config()).unwrap();
        assert!(script.contains("vus: 5,"));
        assert!(script.contains("duration: \"10s\","));
        assert!(script.contains("const url = \"https://example.test/ping\";"));
        assert!(script.contains("const payload = null;"));
        assert!(script.contains("http.request(\"GET\", url, payload, params);"));
        assert!(script.contains("sleep(1);"));
        assert!(script.contains("const params = {\"headers\":{}};"));
    }

    #[test]
    fn test_script_is_deterministic() {
        let mut cfg = ping_config();
        cfg.headers.insert("B".into(), "2".into());
        cfg.headers.insert("A".into(), "1".into());
        assert_eq!(generate(&cfg).unwrap(), generate(&cfg).unwrap());
    }

    #[test]
    fn test_query_params_in_url() {
        let mut cfg = ping_config();
        cfg.target_url = "https://example.test/items?q=x".into();
        cfg.query_params.insert("sort".into(), "asc".into());
        let script = generate(&cfg).unwrap();
        assert!(script.contains("const url = \"https://example.test/items?q=x&sort=asc\";"));
    }

    #[test]
    fn test_body_forces_json_content_type() {
        let mut cfg = ping_config();
        cfg.method = HttpMethod::Post;
        cfg.headers.insert("content-type".into(), "text/plain".into());
        cfg.headers.insert("X-Trace".into(), "on".into());
        cfg.request_body = Some("{\"name\": \"k6\" // who\n}".into());

        let script = generate(&cfg).unwrap();
        assert!(script.contains(r#"const payload = JSON.stringify({"name":"k6"});"#));
        assert!(script.contains(r#""Content-Type":"application/json""#));
        assert!(script.contains(r#""X-Trace":"on""#));
        assert!(!script.contains("text/plain"));
        assert!(script.contains("http.request(\"POST\""));
    }

    #[test]
    fn test_headers_kept_without_body() {
        let mut cfg = ping_config();
        cfg.headers.insert("Authorization".into(), "Bearer t".into());
        let script = generate(&cfg).unwrap();
        assert!(script.contains(r#"{"headers":{"Authorization":"Bearer t"}}"#));
        assert!(!script.contains("application/json"));
    }

    #[test]
    fn test_quotes_in_url_are_escaped() {
        let mut cfg = ping_config();
        cfg.query_params.insert("q".into(), "it's".into());
        let script = generate(&cfg).unwrap();
        assert!(script.contains("const url = \"https://example.test/ping?q=it%27s\";"));
    }

    #[test]
    fn test_invalid_duration_fails() {
        let mut cfg = ping_config();
        cfg.duration = "ten seconds".into();
        assert!(matches!(generate(&cfg), Err(PanelError::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_vus_fails() {
        let mut cfg = ping_config();
        cfg.virtual_users = 0;
        assert!(matches!(generate(&cfg), Err(PanelError::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_body_fails() {
        let mut cfg = ping_config();
        cfg.method = HttpMethod::Post;
        cfg.request_body = Some("{broken".into());
        assert!(matches!(generate(&cfg), Err(PanelError::InvalidConfig(_))));
    }
}
