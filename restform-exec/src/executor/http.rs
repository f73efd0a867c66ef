use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct HttpRequestParts {
    pub method: String,
    pub url: url::Url,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct HttpResponseParts {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponseParts {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        crate::retry::header(&self.headers, name)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum HttpError {
    #[error("timeout")]
    Timeout,
    #[error("connect/dns/tls error: {0}")]
    Network(String),
    #[error("response too large (>{max_bytes} bytes)")]
    ResponseTooLarge { max_bytes: usize },
    #[error("http error: {0}")]
    Other(String),
}

impl HttpError {
    /// Failures where the request may not have reached the server, or the
    /// answer was lost on the way back.
    pub fn is_transient(&self) -> bool {
        matches!(self, HttpError::Timeout | HttpError::Network(_))
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(
        &self,
        req: HttpRequestParts,
        timeout: Duration,
        max_response_bytes: usize,
    ) -> Result<HttpResponseParts, HttpError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(concat!("restform/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::Other(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn send(
        &self,
        req: HttpRequestParts,
        timeout: Duration,
        max_response_bytes: usize,
    ) -> Result<HttpResponseParts, HttpError> {
        let method = reqwest::Method::from_bytes(req.method.as_bytes())
            .map_err(|e| HttpError::Other(e.to_string()))?;
        let mut rb = self.client.request(method, req.url).timeout(timeout);
        for (k, v) in req.headers {
            rb = rb.header(k, v);
        }
        if !req.body.is_empty() {
            rb = rb.body(req.body);
        }

        let mut resp = rb.send().await.map_err(map_reqwest_error)?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.to_string(), v.to_str().ok()?.to_string())))
            .collect();

        // Stream with a cap instead of buffering an unbounded body.
        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(map_reqwest_error)? {
            if body.len() + chunk.len() > max_response_bytes {
                return Err(HttpError::ResponseTooLarge {
                    max_bytes: max_response_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(HttpResponseParts {
            status,
            headers,
            body,
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> HttpError {
    if e.is_timeout() {
        return HttpError::Timeout;
    }
    // No compression features are enabled, so body and decode errors mean
    // the stream was cut short.
    if e.is_connect() || e.is_request() || e.is_body() || e.is_decode() || connection_lost(&e) {
        return HttpError::Network(e.to_string());
    }
    HttpError::Other(e.to_string())
}

fn connection_lost(e: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(e);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = err.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answers one request with headers promising more body than is sent,
    /// then closes the connection.
    async fn truncating_server() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 64\r\n\r\n{\"id\":")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn truncated_body_is_a_transient_network_error() {
        let addr = truncating_server().await;
        let client = ReqwestHttpClient::with_client(reqwest::Client::builder().no_proxy().build().unwrap());
        let req = HttpRequestParts {
            method: "GET".to_string(),
            url: url::Url::parse(&format!("http://{addr}/widgets/1")).unwrap(),
            headers: BTreeMap::new(),
            body: Vec::new(),
        };

        let err = client.send(req, Duration::from_secs(5), 1024).await.unwrap_err();
        assert!(matches!(err, HttpError::Network(_)), "{err:?}");
        assert!(err.is_transient());
    }

    #[test]
    fn only_connection_failures_are_transient() {
        assert!(HttpError::Timeout.is_transient());
        assert!(HttpError::Network("connection reset by peer".to_string()).is_transient());
        assert!(!HttpError::ResponseTooLarge { max_bytes: 1 }.is_transient());
        assert!(!HttpError::Other("bad method".to_string()).is_transient());
    }
}
