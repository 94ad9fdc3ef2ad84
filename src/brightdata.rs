//! Client for the Brightdata dataset API.
//!
//! Responses are relayed as opaque JSON. Only the trigger body is built here;
//! snapshot lists, progress objects and cancel acknowledgements are never
//! interpreted.

use std::time::Duration;

use log::{debug, info, warn};
use reqwest::{Client, Proxy, RequestBuilder, Response};
use serde_json::Value;
use url::Url;

use crate::error::{ApiError, SetupError};
use crate::models::{SnapshotStatus, TriggerGroup};
use crate::token::ApiToken;

pub const DEFAULT_BASE_URL: &str = "https://api.brightdata.com/datasets/v3";

#[derive(Clone)]
pub struct BrightdataClient {
    client: Client,
    base_url: Url,
    // Deadline for JSON calls only; downloads stream for as long as they need
    timeout: Duration,
}

impl BrightdataClient {
    pub fn new(base_url: &str, timeout: Duration, proxy: Option<&str>) -> Result<Self, SetupError> {
        let base_url = Url::parse(base_url).map_err(|e| SetupError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(SetupError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "not a base url".to_string(),
            });
        }

        // Connect timeout only; JSON calls set their own deadline in send_json
        let mut client_builder = Client::builder().connect_timeout(timeout);

        // Route every upstream call through the proxy if one is configured
        if let Some(proxy_addr) = proxy {
            let proxy = Proxy::all(proxy_addr).map_err(|source| SetupError::InvalidProxy {
                proxy: proxy_addr.to_string(),
                source,
            })?;
            info!("Using upstream proxy: {}", proxy_addr);
            client_builder = client_builder.proxy(proxy);
        }

        // Build the HTTP client
        Ok(Self {
            client: client_builder.build()?,
            base_url,
            timeout,
        })
    }

    /// Start a collection job for the given groups.
    pub async fn trigger(
        &self,
        token: &ApiToken,
        dataset_id: &str,
        notify: Option<&str>,
        groups: &[TriggerGroup],
    ) -> Result<Value, ApiError> {
        let mut query = vec![("dataset_id", dataset_id), ("include_errors", "true")];
        if let Some(notify) = notify {
            query.push(("notify", notify));
        }

        info!(
            "Triggering collection for {} group(s) on dataset {} (notify: {})",
            groups.len(),
            dataset_id,
            notify.is_some()
        );
        for group in groups {
            debug!(
                "  {} [{} .. {}]",
                group.url,
                group.start_date.as_deref().unwrap_or("-"),
                group.end_date.as_deref().unwrap_or("-")
            );
        }

        let request = self
            .client
            .post(self.endpoint(&["trigger"])?)
            .header(reqwest::header::AUTHORIZATION, token.authorization())
            .query(&query)
            .json(groups);
        let response = self.send_json(request).await?;

        info!("Brightdata trigger response: {}", response);
        Ok(response)
    }

    pub async fn progress(&self, token: &ApiToken, snapshot_id: &str) -> Result<Value, ApiError> {
        let request = self
            .client
            .get(self.endpoint(&["progress", snapshot_id])?)
            .header(reqwest::header::AUTHORIZATION, token.authorization());
        self.send_json(request).await
    }

    pub async fn snapshots(
        &self,
        token: &ApiToken,
        dataset_id: &str,
        status: SnapshotStatus,
    ) -> Result<Value, ApiError> {
        info!("Fetching {} snapshots for dataset {}", status, dataset_id);

        let request = self
            .client
            .get(self.endpoint(&["snapshots"])?)
            .header(reqwest::header::AUTHORIZATION, token.authorization())
            .query(&[("dataset_id", dataset_id), ("status", status.as_str())]);
        self.send_json(request).await
    }

    pub async fn cancel(&self, token: &ApiToken, snapshot_id: &str) -> Result<Value, ApiError> {
        info!("Cancelling snapshot {}", snapshot_id);

        let request = self
            .client
            .post(self.endpoint(&["snapshot", snapshot_id, "cancel"])?)
            .header(reqwest::header::AUTHORIZATION, token.authorization())
            .json(&serde_json::json!({}));
        self.send_json(request).await
    }

    /// Open a snapshot download. The body is left unread so the caller can
    /// stream it.
    pub async fn download(
        &self,
        token: &ApiToken,
        snapshot_id: &str,
        format: &str,
    ) -> Result<Response, ApiError> {
        info!("Downloading snapshot {} as {}", snapshot_id, format);

        // No per-request timeout here, the body is relayed while it arrives
        let response = self
            .client
            .get(self.endpoint(&["snapshot", snapshot_id])?)
            .header(reqwest::header::AUTHORIZATION, token.authorization())
            .query(&[("format", format)])
            .send()
            .await?;
        check_status(response).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Internal(format!("cannot extend base url {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send_json(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = check_status(request.timeout(self.timeout).send().await?).await?;
        let text = response.text().await?;
        // Some endpoints (cancel) answer with plain text rather than JSON
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    let message = upstream_message(status.as_u16(), &body);
    warn!(
        "Brightdata request to {} failed with status {}: {}",
        url.path(),
        status,
        message
    );
    Err(ApiError::Upstream {
        status: status.as_u16(),
        message,
    })
}

/// Pick the most useful message out of an upstream error body.
pub fn upstream_message(status: u16, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        ["message", "error"]
            .iter()
            .find_map(|key| value.get(key).and_then(Value::as_str).map(str::to_string))
    });
    if let Some(message) = from_json {
        return message;
    }

    let text = body.trim();
    if text.is_empty() {
        format!("Request failed with status code {}", status)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> BrightdataClient {
        BrightdataClient::new(base, Duration::from_secs(5), None).unwrap()
    }

    #[test]
    fn endpoints_extend_the_base_path() {
        let c = client(DEFAULT_BASE_URL);
        assert_eq!(
            c.endpoint(&["snapshot", "s_123", "cancel"]).unwrap().as_str(),
            "https://api.brightdata.com/datasets/v3/snapshot/s_123/cancel"
        );

        let c = client("http://127.0.0.1:9000/");
        assert_eq!(
            c.endpoint(&["trigger"]).unwrap().as_str(),
            "http://127.0.0.1:9000/trigger"
        );
    }

    #[test]
    fn snapshot_ids_are_escaped() {
        let c = client(DEFAULT_BASE_URL);
        assert_eq!(
            c.endpoint(&["progress", "../../admin"]).unwrap().as_str(),
            "https://api.brightdata.com/datasets/v3/progress/..%2F..%2Fadmin"
        );
    }

    #[test]
    fn rejects_bad_setup() {
        assert!(matches!(
            BrightdataClient::new("not a url", Duration::from_secs(1), None),
            Err(SetupError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            BrightdataClient::new("mailto:ops@example.com", Duration::from_secs(1), None),
            Err(SetupError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            BrightdataClient::new(DEFAULT_BASE_URL, Duration::from_secs(1), Some("ftp://proxy.example.com:21")),
            Err(SetupError::InvalidProxy { .. })
        ));
    }

    #[test]
    fn accepts_socks_proxy() {
        assert!(BrightdataClient::new(
            DEFAULT_BASE_URL,
            Duration::from_secs(1),
            Some("socks5://127.0.0.1:9050")
        )
        .is_ok());
    }

    #[test]
    fn upstream_messages() {
        assert_eq!(
            upstream_message(400, r#"{"message":"dataset_id is required"}"#),
            "dataset_id is required"
        );
        assert_eq!(upstream_message(401, r#"{"error":"Unauthorized"}"#), "Unauthorized");
        assert_eq!(upstream_message(502, "Bad Gateway\n"), "Bad Gateway");
        assert_eq!(upstream_message(404, ""), "Request failed with status code 404");
    }
}
