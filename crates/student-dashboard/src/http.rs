use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{AdapterError, AdapterResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".into(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: "POST".into(),
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Single-attempt HTTP transport. No retries or timeouts are applied here.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: HttpRequest) -> AdapterResult<HttpResponse>;
}

/// Sends `request`, resolving to [`AdapterError::Cancelled`] as soon as `cancel` fires.
pub async fn send_cancellable(
    client: &dyn HttpClient,
    request: HttpRequest,
    cancel: &CancellationToken,
) -> AdapterResult<HttpResponse> {
    if cancel.is_cancelled() {
        return Err(AdapterError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AdapterError::Cancelled),
        resp = client.send(request) => resp,
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> AdapterResult<HttpResponse> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|err| AdapterError::InvalidInput(format!("http method: {err}")))?;
        let mut builder = self.inner.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let resp = builder
            .send()
            .await
            .map_err(|err| AdapterError::Transport(err.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|err| AdapterError::Transport(format!("read body: {err}")))?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverResponds;

    #[async_trait]
    impl HttpClient for NeverResponds {
        async fn send(&self, _request: HttpRequest) -> AdapterResult<HttpResponse> {
            std::future::pending().await
        }
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = HttpRequest::get("https://example.invalid").header("Authorization", "Bearer t");
        assert_eq!(req.header_value("authorization"), Some("Bearer t"));
        assert_eq!(req.header_value("accept"), None);
    }

    #[test]
    fn success_range_is_2xx() {
        let ok = HttpResponse {
            status: 204,
            body: Vec::new(),
        };
        let redirect = HttpResponse {
            status: 302,
            body: Vec::new(),
        };
        assert!(ok.is_success());
        assert!(!redirect.is_success());
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = send_cancellable(&NeverResponds, HttpRequest::get("x"), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, AdapterError::Cancelled);
    }

    #[tokio::test]
    async fn cancel_aborts_in_flight_request() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move { trigger.cancel() });
        let err = send_cancellable(&NeverResponds, HttpRequest::get("x"), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, AdapterError::Cancelled);
    }
}
