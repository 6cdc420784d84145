//! Production transport backed by `reqwest`
//!
//! Every request carries `Content-Type`/`Accept: application/json`, the
//! `AuditClient/{service}/{version}` user agent and, when configured, an
//! `X-API-Key` header.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use tracing::instrument;
use url::Url;

use super::{HttpRequest, HttpResponse, Method, RetryPolicy, Transport};
use crate::config::AuditClientConfig;
use crate::error::{AuditError, Result};

const API_KEY_HEADER: &str = "x-api-key";

pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl ReqwestTransport {
    /// Build the HTTP client from configuration
    ///
    /// Fails only if a header value is unrepresentable or the TLS backend
    /// can't be initialised; an unreachable or malformed base URL surfaces
    /// later as a send error.
    pub fn new(config: &AuditClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .default_headers(default_headers(config)?)
            .danger_accept_invalid_certs(!config.verify_ssl);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            retry: RetryPolicy::from(&config.retry),
        })
    }

    /// `{base_url}{path}`, base URL trailing slash trimmed
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let raw = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|e| AuditError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })
    }

    async fn send_once(&self, url: &Url, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(url.clone()),
            Method::Post => self.client.post(url.clone()),
        };

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = request.method.as_str(), path = %request.path))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = self.endpoint(&request.path)?;
        self.retry
            .execute(|| self.send_once(&url, &request))
            .await
    }
}

fn default_headers(config: &AuditClientConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, header_value(&config.user_agent())?);

    if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
        let mut value = header_value(key)?;
        value.set_sensitive(true);
        headers.insert(HeaderName::from_static(API_KEY_HEADER), value);
    }

    Ok(headers)
}

fn header_value(raw: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(raw).map_err(|e| AuditError::Config {
        reason: format!("invalid header value: {}", e),
    })
}
