//! Retrieval of service description documents.
use std::time::Duration;

use async_trait::async_trait;
use axum::http::header;

use super::error::FetchError;
use super::source::ServiceSource;

/// Fetches the raw description document of one downstream service.
///
/// The registry bounds every call with its own timeout, so implementations
/// only need to fail on transport errors and non-2xx responses.
#[async_trait]
pub trait SpecFetcher: Send + Sync + 'static {
    async fn fetch(&self, source: &ServiceSource) -> Result<Vec<u8>, FetchError>;
}

/// `GET <spec_url>` over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpSpecFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
}

impl HttpSpecFetcher {
    /// Bodies larger than `max_bytes` are rejected with [`FetchError::TooLarge`].
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            timeout,
            max_bytes,
        })
    }
}

#[async_trait]
impl SpecFetcher for HttpSpecFetcher {
    async fn fetch(&self, source: &ServiceSource) -> Result<Vec<u8>, FetchError> {
        let mut resp = self
            .client
            .get(source.spec_url().as_str())
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(self.timeout)
                } else {
                    FetchError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if resp
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(FetchError::TooLarge(self.max_bytes));
        }

        // Content-Length may be absent or wrong: bound the read itself too.
        let mut body = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?
        {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(FetchError::TooLarge(self.max_bytes));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::get};
    use serde_json::json;

    async fn serve(router: Router) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn source(addr: std::net::SocketAddr, path: &str) -> ServiceSource {
        ServiceSource::new("metadata-service", &format!("http://{addr}{path}")).unwrap()
    }

    #[tokio::test]
    async fn fetches_document_body() {
        let addr = serve(Router::new().route(
            "/v3/api-docs",
            get(|| async { Json(json!({ "paths": {} })) }),
        ))
        .await;

        let fetcher = HttpSpecFetcher::new(Duration::from_secs(5), 1024 * 1024).unwrap();
        let body = fetcher.fetch(&source(addr, "/v3/api-docs")).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "paths": {} }));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let addr = serve(Router::new().route(
            "/v3/api-docs",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;

        let fetcher = HttpSpecFetcher::new(Duration::from_secs(5), 1024 * 1024).unwrap();
        let err = fetcher
            .fetch(&source(addr, "/v3/api-docs"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status(503)));
    }

    #[tokio::test]
    async fn oversized_document_is_rejected() {
        let addr = serve(
            Router::new()
                .route("/big", get(|| async { "x".repeat(4096) }))
                .route(
                    "/chunked",
                    get(|| async {
                        let chunks = (0..8).map(|_| Ok::<_, std::io::Error>("y".repeat(512)));
                        axum::body::Body::from_stream(futures_util::stream::iter(chunks))
                    }),
                ),
        )
        .await;

        let fetcher = HttpSpecFetcher::new(Duration::from_secs(5), 1024).unwrap();
        for path in ["/big", "/chunked"] {
            let err = fetcher.fetch(&source(addr, path)).await.unwrap_err();
            assert!(matches!(err, FetchError::TooLarge(1024)), "{path}: {err:?}");
        }

        let roomy = HttpSpecFetcher::new(Duration::from_secs(5), 8192).unwrap();
        assert_eq!(roomy.fetch(&source(addr, "/big")).await.unwrap().len(), 4096);
    }

    #[tokio::test]
    async fn connection_refused_is_a_transport_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpSpecFetcher::new(Duration::from_secs(5), 1024 * 1024).unwrap();
        let err = fetcher
            .fetch(&source(addr, "/v3/api-docs"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
