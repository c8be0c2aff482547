//! HTTP client for the dashboard-service backend.
//!
//! `base_url()` honours a `window.YN_API_BASE` override, otherwise the
//! service is assumed on port 8080 of the page's host.

use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, RequestMode, Response};

use crate::dom;

pub fn base_url() -> Result<String, String> {
    if let Some(base) = dom::global_string("YN_API_BASE") {
        return Ok(base.trim_end_matches('/').to_owned());
    }

    let loc = dom::window()?.location();
    let host = loc.hostname().unwrap_or_default();
    let protocol = loc.protocol().unwrap_or_else(|_| "http:".into());
    Ok(format!("{}//{}:8080", protocol, host))
}

/// Path plus query string from the non-empty pairs.
pub fn with_query(path: &str, params: &[(&str, Option<String>)]) -> String {
    let query: Vec<String> = params
        .iter()
        .filter_map(|(name, value)| {
            let value = value.as_deref().filter(|v| !v.is_empty())?;
            Some(format!("{}={}", name, js_sys::encode_uri_component(value)))
        })
        .collect();
    if query.is_empty() {
        path.to_owned()
    } else {
        format!("{}?{}", path, query.join("&"))
    }
}

/// GET `path` and parse the JSON body. Non-2xx answers carry the
/// service's `error` field when present.
pub async fn get_json(path: &str) -> Result<serde_json::Value, String> {
    let url = format!("{}{}", base_url()?, path);

    let opts = RequestInit::new();
    opts.set_method("GET");
    opts.set_mode(RequestMode::Cors);
    let headers = Headers::new().map_err(|e| dom::describe(&e))?;
    headers
        .set("Accept", "application/json")
        .map_err(|e| dom::describe(&e))?;
    opts.set_headers(&headers);

    let request = Request::new_with_str_and_init(&url, &opts).map_err(|e| dom::describe(&e))?;
    let resp_value = JsFuture::from(dom::window()?.fetch_with_request(&request))
        .await
        .map_err(|e| format!("fetch error: {}", dom::describe(&e)))?;
    let resp: Response = resp_value
        .dyn_into()
        .map_err(|_| "response is not a Response".to_owned())?;

    let text = JsFuture::from(resp.text().map_err(|e| dom::describe(&e))?)
        .await
        .map_err(|e| format!("text error: {}", dom::describe(&e)))?
        .as_string()
        .unwrap_or_default();

    if !resp.ok() {
        let message = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|body| body.get("error")?.as_str().map(ToOwned::to_owned))
            .unwrap_or(text);
        return Err(format!("{} {}: {}", resp.status(), resp.status_text(), message));
    }
    serde_json::from_str(&text).map_err(|e| format!("JSON parse error: {}: {}", e, text))
}
