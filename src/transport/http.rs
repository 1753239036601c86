//! Direct HTTPS transport built on reqwest

use crate::config::Credentials;
use crate::logging::Logger;
use crate::transport::{
    API_ACCEPT, API_VERSION, Method, RequestBody, Transport, TransportError, TransportRequest,
    TransportResponse, USER_AGENT, deadline_for,
};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_LENGTH, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Body, Client, redirect};
use std::time::Duration;
use tokio_util::io::ReaderStream;
use url::Url;

const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

pub struct HttpTransport {
    client: Client,
    api_base: Url,
    credentials: Credentials,
    timeout: Duration,
    upload_timeout: Option<Duration>,
    logger: Logger,
}

impl HttpTransport {
    pub fn new(
        api_base: &str,
        credentials: Credentials,
        timeout: Duration,
        logger: Logger,
    ) -> Result<Self, TransportError> {
        let api_base = Url::parse(api_base)
            .map_err(|e| TransportError::Protocol(format!("invalid API base URL '{}': {}", api_base, e)))?;

        // Redirects are surfaced to the caller as plain non-success statuses.
        // `timeout` bounds idle reads here; total deadlines are set per request.
        let client = Client::builder()
            .read_timeout(timeout)
            .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
            .redirect(redirect::Policy::none())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base,
            credentials,
            timeout,
            upload_timeout: None,
            logger,
        })
    }

    /// Total deadline for streamed uploads; `None` leaves only the idle bound
    pub fn with_upload_timeout(mut self, upload_timeout: Option<Duration>) -> Self {
        self.upload_timeout = upload_timeout;
        self
    }

    fn resolve(&self, request: &TransportRequest) -> Result<Url, TransportError> {
        let raw = if request.is_absolute() {
            request.target.clone()
        } else {
            format!(
                "{}/{}",
                self.api_base.as_str().trim_end_matches('/'),
                request.target.trim_start_matches('/')
            )
        };
        Url::parse(&raw).map_err(|e| TransportError::Protocol(format!("invalid request URL '{}': {}", raw, e)))
    }

    fn headers(&self, token: &str, request: &TransportRequest) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(API_ACCEPT));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| TransportError::Protocol("API token contains invalid header characters".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::Protocol(format!("invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::Protocol(format!("invalid header value for '{}': {}", name, e)))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    fn network_error(&self, error: reqwest::Error, context: &str, deadline: Option<Duration>) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout(deadline.unwrap_or(self.timeout))
        } else if error.is_connect() {
            TransportError::Network(format!("connection failed during {}: {}", context, error))
        } else {
            TransportError::Network(format!("{} network error: {}", context, error))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let token = self.credentials.token().ok_or(TransportError::AuthMissing)?;
        let url = self.resolve(&request)?;
        let headers = self.headers(token, &request)?;

        self.logger.detail(&format!("{} {}", request.method, url));

        let deadline = deadline_for(&request.body, self.timeout, self.upload_timeout);
        let mut builder = self
            .client
            .request(request.method.into(), url)
            .headers(headers);
        if let Some(deadline) = deadline {
            builder = builder.timeout(deadline);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Bytes(bytes) => builder.body(bytes),
            RequestBody::File { path, len } => {
                let file = tokio::fs::File::open(&path).await?;
                let stream = ReaderStream::new(file);
                builder
                    .header(CONTENT_LENGTH, len)
                    .body(Body::wrap_stream(stream))
            }
        };

        let context = request.method.as_str();
        let response = builder
            .send()
            .await
            .map_err(|e| self.network_error(e, context, deadline))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.network_error(e, "response read", deadline))?
            .to_vec();

        self.logger.detail(&format!("-> status {} ({} bytes)", status, body.len()));
        Ok(TransportResponse { status, body })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::{RepoCoordinates, encode_segment};

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(
            base,
            Credentials::with_token("t0ken"),
            Duration::from_secs(5),
            Logger::new_quiet(),
        )
        .unwrap()
    }

    #[test]
    fn relative_paths_resolve_against_api_base() {
        let transport = transport("https://ghe.example.com/api/v3/");
        let url = transport
            .resolve(&TransportRequest::get("/repos/o/r/releases/tags/v1"))
            .unwrap();
        assert_eq!(url.as_str(), "https://ghe.example.com/api/v3/repos/o/r/releases/tags/v1");
    }

    #[test]
    fn encoded_tag_is_not_split_into_a_fragment() {
        let transport = transport("https://api.github.com");
        let path = RepoCoordinates::new("o", "r").path(&format!("releases/tags/{}", encode_segment("v1.0#hotfix")));
        let url = transport.resolve(&TransportRequest::get(path)).unwrap();
        assert_eq!(url.path(), "/repos/o/r/releases/tags/v1.0%23hotfix");
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn absolute_urls_are_used_verbatim() {
        let transport = transport("https://api.github.com");
        let url = transport
            .resolve(&TransportRequest::post("https://uploads.github.com/repos/o/r/releases/1/assets?name=a.zip"))
            .unwrap();
        assert_eq!(url.host_str(), Some("uploads.github.com"));
    }

    #[test]
    fn request_headers_override_defaults() {
        let transport = transport("https://api.github.com");
        let request = TransportRequest::post("/x").with_header("Accept", "application/octet-stream");
        let headers = transport.headers("t0ken", &request).unwrap();
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/octet-stream");
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[tokio::test]
    async fn missing_token_fails_before_network() {
        let transport = HttpTransport::new(
            "https://api.github.com",
            Credentials::none(),
            Duration::from_secs(5),
            Logger::new_quiet(),
        )
        .unwrap();
        let err = transport
            .request(TransportRequest::get("/repos/o/r/releases/tags/v1"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::AuthMissing));
    }
}
