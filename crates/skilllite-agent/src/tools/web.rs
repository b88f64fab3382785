//! webfetch and websearch: network-facing tools, gated by the sandbox's
//! `allow_network` flag and a shared TTL cache.
//!
//! Grounded on `skilllite-agent::extensions::builtin`'s HTTP client idiom
//! (ureq, fixed timeout, user-agent string), with the HTML reduction step
//! delegated to [`crate::html_md`].

use crate::registry::ToolRegistry;
use crate::types::ToolResult;
use serde_json::{json, Value};
use skilllite_core::config::schema::WebSearchConfig;
use skilllite_core::{params, truncate_head, TtlCache};
use std::io::Read;
use std::sync::OnceLock;
use std::time::Duration;

const CACHE_CAPACITY: usize = 100;
const CACHE_TTL_SECS: u64 = 15 * 60;
const MAX_BODY_BYTES: u64 = 5 * 1024 * 1024;
const HEAD_TRUNCATE_BYTES: usize = 100 * 1024;
const USER_AGENT: &str = "skilllite/1.0";
const DEFAULT_SEARCH_COUNT: i64 = 10;
const MAX_SEARCH_COUNT: i64 = 20;

fn cache() -> &'static TtlCache {
    static CACHE: OnceLock<TtlCache> = OnceLock::new();
    CACHE.get_or_init(|| TtlCache::new(CACHE_CAPACITY, Duration::from_secs(CACHE_TTL_SECS)))
}

fn upgrade_scheme(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("http://") {
        let host = rest.split('/').next().unwrap_or("");
        let hostname = host.split(':').next().unwrap_or(host);
        if hostname == "localhost" || hostname == "127.0.0.1" || hostname == "::1" {
            return url.to_string();
        }
        return format!("https://{rest}");
    }
    url.to_string()
}

fn do_webfetch(params: &Value) -> anyhow::Result<ToolResult> {
    let url = params::require_string(params, "url").map_err(anyhow::Error::msg)?;
    let url = upgrade_scheme(&url);

    if let Some(cached) = cache().get(&url) {
        return Ok(ToolResult::ok(cached));
    }

    let response = ureq::get(&url)
        .set("User-Agent", USER_AGENT)
        .timeout(Duration::from_secs(30))
        .call();

    let response = match response {
        Ok(r) => r,
        Err(ureq::Error::Status(code, _)) => {
            return Ok(ToolResult::error(format!("webfetch: server returned status {code}")));
        }
        Err(e) => return Ok(ToolResult::error(format!("webfetch: {e}"))),
    };

    if response.status() != 200 {
        return Ok(ToolResult::error(format!(
            "webfetch: non-200 status {}",
            response.status()
        )));
    }

    let content_type = response.header("content-type").unwrap_or("").to_string();
    let mut body = Vec::new();
    Read::take(response.into_reader(), MAX_BODY_BYTES).read_to_end(&mut body)?;
    let text = String::from_utf8_lossy(&body).to_string();

    let rendered = if content_type.contains("html") {
        crate::html_md::reduce(&text)
    } else {
        text
    };

    let truncated = truncate_head(&rendered, usize::MAX, HEAD_TRUNCATE_BYTES);
    cache().set(url, truncated.content.clone());
    Ok(ToolResult::ok(truncated.content))
}

fn do_websearch(params: &Value) -> anyhow::Result<ToolResult> {
    let config = WebSearchConfig::from_env();
    let Some(api_key) = config.api_key else {
        return Ok(ToolResult::error(
            "websearch: no API key configured (set SKILLLITE_WEBSEARCH_API_KEY)".to_string(),
        ));
    };

    let query = params::require_string(params, "query").map_err(anyhow::Error::msg)?;
    let count = params::int(params, "count", DEFAULT_SEARCH_COUNT).clamp(1, MAX_SEARCH_COUNT);

    let response = ureq::get("https://api.search.brave.com/res/v1/web/search")
        .query("q", &query)
        .query("count", &count.to_string())
        .set("User-Agent", USER_AGENT)
        .set("X-Subscription-Token", &api_key)
        .timeout(Duration::from_secs(15))
        .call();

    let response = match response {
        Ok(r) => r,
        Err(e) => return Ok(ToolResult::error(format!("websearch: {e}"))),
    };

    let body: Value = response.into_json::<Value>()?;
    let results = body
        .get("web")
        .and_then(|w| w.get("results"))
        .and_then(|r| r.as_array())
        .cloned()
        .unwrap_or_default();

    let mut out = String::new();
    for (i, r) in results.iter().take(count as usize).enumerate() {
        let title = r.get("title").and_then(|v| v.as_str()).unwrap_or("");
        let url = r.get("url").and_then(|v| v.as_str()).unwrap_or("");
        let desc = r.get("description").and_then(|v| v.as_str()).unwrap_or("");
        out.push_str(&format!("{}. [{title}]({url})\n   {desc}\n", i + 1));
    }
    Ok(ToolResult::ok(out))
}

pub fn register(registry: &mut ToolRegistry) {
    registry.register(super::descriptor(
        "webfetch",
        "Fetch URL",
        "Fetch a URL over HTTPS (upgrading plain HTTP except to loopback), reducing HTML to Markdown.",
        json!({"type": "object", "properties": {"url": {"type": "string"}}, "required": ["url"]}),
        true,
        move |_cancel, _id, params, _updates| {
            Box::pin(async move { tokio::task::spawn_blocking(move || do_webfetch(&params)).await? })
        },
    ));

    registry.register(super::descriptor(
        "websearch",
        "Web search",
        "Search the web via a configured search API, returning numbered Markdown results.",
        json!({
            "type": "object",
            "properties": {"query": {"type": "string"}, "count": {"type": "integer", "description": "default 10, max 20"}},
            "required": ["query"]
        }),
        true,
        move |_cancel, _id, params, _updates| {
            Box::pin(async move { tokio::task::spawn_blocking(move || do_websearch(&params)).await? })
        },
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upgrade_scheme_leaves_loopback_alone() {
        assert_eq!(upgrade_scheme("http://localhost:8080/x"), "http://localhost:8080/x");
        assert_eq!(upgrade_scheme("http://127.0.0.1/x"), "http://127.0.0.1/x");
    }

    #[test]
    fn upgrade_scheme_promotes_remote_hosts() {
        assert_eq!(upgrade_scheme("http://example.com/x"), "https://example.com/x");
    }

    #[test]
    fn websearch_without_api_key_errors_cleanly() {
        std::env::remove_var("SKILLLITE_WEBSEARCH_API_KEY");
        let result = do_websearch(&json!({"query": "rust"})).unwrap();
        assert!(result.is_error);
    }
}
