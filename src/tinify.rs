//! # Remote Compression Module
//!
//! Client per il servizio di compressione remoto (API Tinify).
//!
//! ## Protocollo:
//! 1. `POST {endpoint}/shrink` con basic auth `api:<key>` e i byte dell'immagine
//! 2. `201 Created` con JSON `{"output": {"size": .., "url": ..}}` e header `Location`
//! 3. `GET` dell'URL di output con le stesse credenziali per scaricare il risultato
//!
//! ## Esiti:
//! - `Success(bytes)`: immagine compressa
//! - `QuotaExceeded`: HTTP 401/429, la key corrente va ruotata
//! - `Failure`: qualsiasi altro errore (formato, rete, 5xx), il file viene saltato
//!
//! Il trait `Compressor` isola il servizio così che l'invoker possa essere
//! esercitato con implementazioni in-memory.

use crate::error::CompressError;
use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

/// Result of one call to the compression service
#[derive(Debug, Clone, PartialEq)]
pub enum CompressOutcome {
    Success(Vec<u8>),
    QuotaExceeded(String),
    Failure(String),
}

/// Opaque remote compression capability
#[async_trait]
pub trait Compressor: Send + Sync {
    async fn compress(&self, data: &[u8], credential: &str) -> CompressOutcome;
}

#[derive(Debug, Deserialize)]
struct ShrinkResponse {
    output: ShrinkOutput,
}

#[derive(Debug, Deserialize)]
struct ShrinkOutput {
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServiceError {
    error: Option<String>,
    message: Option<String>,
}

/// HTTP client for the Tinify API
pub struct TinifyClient {
    client: reqwest::Client,
    endpoint: String,
}

impl TinifyClient {
    pub fn new(endpoint: &str) -> Result<Self, CompressError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("space-image-compressor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn shrink_url(&self) -> String {
        format!("{}/shrink", self.endpoint)
    }

    async fn download(&self, url: &str, credential: &str) -> CompressOutcome {
        let response = match self
            .client
            .get(url)
            .basic_auth("api", Some(credential))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return CompressOutcome::Failure(format!("Download error: {}", e)),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return classify_failure(status, &body);
        }

        match response.bytes().await {
            Ok(bytes) => CompressOutcome::Success(bytes.to_vec()),
            Err(e) => CompressOutcome::Failure(format!("Read error: {}", e)),
        }
    }
}

#[async_trait]
impl Compressor for TinifyClient {
    async fn compress(&self, data: &[u8], credential: &str) -> CompressOutcome {
        let response = match self
            .client
            .post(self.shrink_url())
            .basic_auth("api", Some(credential))
            .body(data.to_vec())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return CompressOutcome::Failure(format!("Connection error: {}", e)),
        };

        if let Some(count) = response
            .headers()
            .get("Compression-Count")
            .and_then(|v| v.to_str().ok())
        {
            debug!("Compressions used this month: {}", count);
        }

        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return CompressOutcome::Failure(format!("Read error: {}", e)),
        };

        if !status.is_success() {
            return classify_failure(status, &body);
        }

        let Some(url) = output_url(&body).or(location) else {
            return CompressOutcome::Failure("Response without output location".to_string());
        };

        self.download(&url, credential).await
    }
}

/// Output URL from a shrink response body
fn output_url(body: &str) -> Option<String> {
    let response: ShrinkResponse = serde_json::from_str(body).ok()?;
    if let Some(size) = response.output.size {
        debug!("Service reports output size {}", size);
    }
    response.output.url
}

/// Map an error response to the outcome the invoker acts on
fn classify_failure(status: StatusCode, body: &str) -> CompressOutcome {
    let detail: ServiceError = serde_json::from_str(body).unwrap_or_default();
    let reason = match (detail.error, detail.message) {
        (Some(error), Some(message)) => format!("{}: {}", error, message),
        (Some(error), None) => error,
        (None, Some(message)) => message,
        (None, None) => status.to_string(),
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::TOO_MANY_REQUESTS => CompressOutcome::QuotaExceeded(reason),
        _ => CompressOutcome::Failure(format!("HTTP {}: {}", status.as_u16(), reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_statuses() {
        let body = r#"{"error":"TooManyRequests","message":"Your monthly limit has been exceeded"}"#;
        assert_eq!(
            classify_failure(StatusCode::TOO_MANY_REQUESTS, body),
            CompressOutcome::QuotaExceeded(
                "TooManyRequests: Your monthly limit has been exceeded".to_string()
            )
        );
        assert!(matches!(
            classify_failure(StatusCode::UNAUTHORIZED, "{}"),
            CompressOutcome::QuotaExceeded(_)
        ));
    }

    #[test]
    fn test_other_statuses_are_failures() {
        let body = r#"{"error":"Unsupported media type","message":"File type is not supported"}"#;
        assert_eq!(
            classify_failure(StatusCode::UNSUPPORTED_MEDIA_TYPE, body),
            CompressOutcome::Failure(
                "HTTP 415: Unsupported media type: File type is not supported".to_string()
            )
        );
        assert!(matches!(
            classify_failure(StatusCode::SERVICE_UNAVAILABLE, "<html>"),
            CompressOutcome::Failure(_)
        ));
    }

    #[test]
    fn test_output_url() {
        let body = r#"{"input":{"size":30720,"type":"image/png"},
                       "output":{"size":10240,"type":"image/png","ratio":0.33,
                                 "url":"https://api.tinify.com/output/abc"}}"#;
        assert_eq!(output_url(body).as_deref(), Some("https://api.tinify.com/output/abc"));
        assert_eq!(output_url(r#"{"output":{}}"#), None);
        assert_eq!(output_url("not json"), None);
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let client = TinifyClient::new("https://api.tinify.com/").unwrap();
        assert_eq!(client.shrink_url(), "https://api.tinify.com/shrink");
    }
}
