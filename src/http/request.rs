//! Request metadata extraction.
//!
//! # Responsibilities
//! - Derive the trace identifier (configured header, then `cf-ray`)
//! - Select request headers per the configured policy
//! - Select platform (`cf`) properties per the configured allow-list
//!
//! # Design Decisions
//! - Header lookup is case-insensitive; allow-listed names are reported lower-cased
//! - Non-UTF-8 header values are skipped
//! - An empty selection is reported as absent, never as an empty object

use axum::http::{HeaderMap, Request};
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::config::{HeaderPolicy, LoggerConfig};
use crate::logging::RequestMetadata;

/// Correlation header used when the configured trace header is missing.
pub const FALLBACK_TRACE_HEADER: &str = "cf-ray";

/// Platform-supplied request properties (geo, network, ...).
///
/// Edge integrations insert this as a request extension; the middleware
/// copies the allow-listed keys into `req.cf`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CfProperties(pub Map<String, Value>);

impl From<Map<String, Value>> for CfProperties {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Reads the trace identifier.
///
/// Falls back to `cf-ray` only when the configured header is absent; an empty
/// configured header yields no identifier.
pub fn trace_id(headers: &HeaderMap, trace_header: &str) -> Option<String> {
    let value = headers
        .get(trace_header)
        .or_else(|| headers.get(FALLBACK_TRACE_HEADER))?;
    value
        .to_str()
        .ok()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Selects the headers to log under `req.headers`.
pub fn pick_headers(headers: &HeaderMap, policy: &HeaderPolicy) -> Option<IndexMap<String, String>> {
    let mut picked = IndexMap::new();

    match policy {
        HeaderPolicy::Omit => return None,
        HeaderPolicy::All => {
            for (name, value) in headers {
                let Ok(value) = value.to_str() else {
                    continue;
                };
                picked
                    .entry(name.as_str().to_string())
                    .and_modify(|joined: &mut String| {
                        joined.push_str(", ");
                        joined.push_str(value);
                    })
                    .or_insert_with(|| value.to_string());
            }
        }
        HeaderPolicy::Allow(names) => {
            for name in names {
                let values: Vec<&str> = headers
                    .get_all(name.as_str())
                    .iter()
                    .filter_map(|v| v.to_str().ok())
                    .collect();
                if !values.is_empty() {
                    picked.insert(name.to_lowercase(), values.join(", "));
                }
            }
        }
    }

    (!picked.is_empty()).then_some(picked)
}

/// Selects the allow-listed platform properties.
pub fn pick_cf_properties(cf: Option<&CfProperties>, include: &[String]) -> Option<Map<String, Value>> {
    let cf = cf?;
    let picked: Map<String, Value> = include
        .iter()
        .filter_map(|key| cf.0.get(key).map(|value| (key.clone(), value.clone())))
        .collect();
    (!picked.is_empty()).then_some(picked)
}

/// Builds the `req` block for a request.
pub fn request_metadata<B>(req: &Request<B>, config: &LoggerConfig) -> RequestMetadata {
    RequestMetadata {
        method: req.method().to_string(),
        url: req.uri().path().to_string(),
        headers: pick_headers(req.headers(), &config.header),
        cf: pick_cf_properties(
            req.extensions().get::<CfProperties>(),
            &config.include_cf_properties,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde_json::json;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, value.parse().unwrap());
        }
        map
    }

    #[test]
    fn test_trace_header_wins_over_cf_ray() {
        let h = headers(&[("x-request-id", "custom"), ("cf-ray", "ray")]);
        assert_eq!(trace_id(&h, "X-Request-Id").as_deref(), Some("custom"));
    }

    #[test]
    fn test_falls_back_to_cf_ray() {
        let h = headers(&[("cf-ray", "ray-123")]);
        assert_eq!(trace_id(&h, "x-trace-id").as_deref(), Some("ray-123"));
        assert_eq!(trace_id(&HeaderMap::new(), "x-trace-id"), None);
    }

    #[test]
    fn test_empty_trace_header_is_absent() {
        let h = headers(&[("x-request-id", ""), ("cf-ray", "ray")]);
        assert_eq!(trace_id(&h, "x-request-id"), None);
    }

    #[test]
    fn test_header_policies() {
        let h = headers(&[
            ("x-request-id", "trace-1"),
            ("authorization", "Bearer secret"),
            ("x-ignored", "ignored"),
        ]);

        assert_eq!(pick_headers(&h, &HeaderPolicy::Omit), None);
        assert_eq!(pick_headers(&h, &HeaderPolicy::All).unwrap().len(), 3);

        let allow = HeaderPolicy::Allow(vec!["X-Request-Id".into(), "Authorization".into(), "x-missing".into()]);
        let picked = pick_headers(&h, &allow).unwrap();
        assert_eq!(
            picked.into_iter().collect::<Vec<_>>(),
            vec![
                ("x-request-id".to_string(), "trace-1".to_string()),
                ("authorization".to_string(), "Bearer secret".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_header_selection_is_absent() {
        let allow = HeaderPolicy::Allow(vec!["x-missing".into()]);
        assert_eq!(pick_headers(&HeaderMap::new(), &allow), None);
        assert_eq!(pick_headers(&HeaderMap::new(), &HeaderPolicy::All), None);
    }

    #[test]
    fn test_repeated_headers_are_joined() {
        let h = headers(&[("accept", "text/html"), ("accept", "application/json")]);
        let picked = pick_headers(&h, &HeaderPolicy::All).unwrap();
        assert_eq!(picked["accept"], "text/html, application/json");
    }

    #[test]
    fn test_cf_properties_selection() {
        let cf = CfProperties::from(
            json!({"colo": "SJC", "country": "US", "city": "San Jose"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        let include = vec!["colo".to_string(), "country".to_string(), "asn".to_string()];

        let picked = pick_cf_properties(Some(&cf), &include).unwrap();
        assert_eq!(Value::Object(picked), json!({"colo": "SJC", "country": "US"}));

        assert_eq!(pick_cf_properties(Some(&cf), &[]), None);
        assert_eq!(pick_cf_properties(Some(&cf), &["asn".to_string()]), None);
        assert_eq!(pick_cf_properties(None, &include), None);
    }

    #[test]
    fn test_request_metadata_uses_path_only() {
        let req = Request::builder()
            .method("POST")
            .uri("http://localhost/login?next=/home")
            .body(Body::empty())
            .unwrap();
        let meta = request_metadata(&req, &LoggerConfig::default());
        assert_eq!(meta, RequestMetadata::new("POST", "/login"));
    }
}
