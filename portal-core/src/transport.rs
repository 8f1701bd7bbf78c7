use crate::error::{PortalError, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// JSON-over-HTTP seam. Views and the polling client only talk to the
/// backend through this trait, so tests can script responses.
pub trait Transport: Send + Sync + 'static {
    fn get_json<'a>(
        &'a self,
        endpoint: &'a str,
        bearer: Option<&'a str>,
    ) -> BoxFuture<'a, Result<serde_json::Value>>;

    fn post_json<'a>(
        &'a self,
        endpoint: &'a str,
        bearer: Option<&'a str>,
        body: serde_json::Value,
    ) -> BoxFuture<'a, Result<serde_json::Value>>;
}

pub fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(PortalError::from)
}

#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}

impl Transport for HttpTransport {
    fn get_json<'a>(
        &'a self,
        endpoint: &'a str,
        bearer: Option<&'a str>,
    ) -> BoxFuture<'a, Result<serde_json::Value>> {
        let request = self.client.get(self.url(endpoint));
        send(request, bearer).boxed()
    }

    fn post_json<'a>(
        &'a self,
        endpoint: &'a str,
        bearer: Option<&'a str>,
        body: serde_json::Value,
    ) -> BoxFuture<'a, Result<serde_json::Value>> {
        let request = self.client.post(self.url(endpoint)).json(&body);
        send(request, bearer).boxed()
    }
}

async fn send(request: reqwest::RequestBuilder, bearer: Option<&str>) -> Result<serde_json::Value> {
    let request = match bearer {
        Some(token) => request.bearer_auth(token),
        None => request,
    };

    let response = request.send().await?;
    let status = response.status();
    debug!(status = status.as_u16(), url = %response.url(), "response");

    if status == StatusCode::UNAUTHORIZED {
        return Err(PortalError::Unauthorized);
    }
    if !status.is_success() {
        return Err(PortalError::Status(status.as_u16()));
    }

    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(serde_json::Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}
