//! Blocking transport for the Brawl Stars API: one shared client plus the
//! request and status handling every endpoint goes through.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const USER_AGENT: &str = concat!("brawl_pipeline/", env!("CARGO_PKG_VERSION"));
/// Error bodies are cut to this many characters in messages.
const MAX_ERROR_BODY: usize = 200;

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Process-wide blocking client, built on first use. Every request asks for
/// JSON.
pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .context("failed to build http client")
    })
}

/// `Authorization: Bearer {key}`, marked sensitive so it never shows up in
/// debug output.
pub fn bearer(api_key: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {api_key}"))
        .context("api key contains characters not allowed in a header")?;
    value.set_sensitive(true);
    Ok(value)
}

fn status_error(status: StatusCode, url: &str, body: &str) -> anyhow::Error {
    let hint = match status {
        StatusCode::FORBIDDEN => " (key rejected or caller ip not allowed for this key)",
        StatusCode::NOT_FOUND => " (unknown tag)",
        StatusCode::TOO_MANY_REQUESTS => " (rate limited, raise the request delay)",
        StatusCode::SERVICE_UNAVAILABLE => " (api under maintenance)",
        _ => "",
    };
    let body = body.chars().take(MAX_ERROR_BODY).collect::<String>();
    anyhow!("http {status}{hint} for {url}: {body}")
}

/// GETs `url` with `auth` and parses the JSON body. Non-success statuses are
/// errors carrying the status and the start of the body.
pub fn get_json(client: &Client, url: &str, auth: &HeaderValue) -> Result<Value> {
    debug!(url, "GET");
    let resp = client
        .get(url)
        .header(AUTHORIZATION, auth.clone())
        .send()
        .with_context(|| format!("request failed: {url}"))?;
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(status_error(status, url, &body));
    }
    serde_json::from_str(&body).with_context(|| format!("invalid json from {url}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_is_sensitive() {
        let value = bearer("abc.def").expect("valid key");
        assert!(value.is_sensitive());
        assert_eq!(value.to_str().expect("ascii"), "Bearer abc.def");
        assert!(bearer("line\nbreak").is_err());
    }

    #[test]
    fn status_errors_explain_common_api_failures() {
        let err = status_error(StatusCode::FORBIDDEN, "https://api/players/%23X", "{}");
        assert!(err.to_string().starts_with("http 403 Forbidden (key rejected"), "{err}");

        let long = "x".repeat(MAX_ERROR_BODY * 2);
        let err = status_error(StatusCode::INTERNAL_SERVER_ERROR, "u", &long).to_string();
        assert!(err.ends_with(&"x".repeat(MAX_ERROR_BODY)));
        assert!(!err.contains(&"x".repeat(MAX_ERROR_BODY + 1)));
    }
}
