//! Transport adapter over the `gh api` command
//!
//! Each request becomes one `gh api` invocation built from a parameterized
//! argument list. The token travels through the child's `GH_TOKEN`
//! environment variable. `--include` makes `gh` print the status line and
//! headers ahead of the body, which is how the raw status is recovered.

use crate::config::Credentials;
use crate::logging::Logger;
use crate::transport::{
    API_ACCEPT, API_VERSION, RequestBody, Transport, TransportError, TransportRequest,
    TransportResponse, deadline_for,
};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub struct GhCliTransport {
    program: PathBuf,
    credentials: Credentials,
    timeout: Duration,
    upload_timeout: Option<Duration>,
    logger: Logger,
}

impl GhCliTransport {
    pub fn new(program: PathBuf, credentials: Credentials, timeout: Duration, logger: Logger) -> Self {
        Self {
            program,
            credentials,
            timeout,
            upload_timeout: None,
            logger,
        }
    }

    pub fn with_upload_timeout(mut self, upload_timeout: Option<Duration>) -> Self {
        self.upload_timeout = upload_timeout;
        self
    }

    /// Build the argument list for one request
    pub fn build_args(request: &TransportRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "api".into(),
            "--method".into(),
            request.method.as_str().into(),
            "--include".into(),
        ];

        let mut headers = request.headers.clone();
        headers.entry("Accept".to_string()).or_insert_with(|| API_ACCEPT.to_string());
        headers
            .entry("X-GitHub-Api-Version".to_string())
            .or_insert_with(|| API_VERSION.to_string());
        for (name, value) in &headers {
            args.push("-H".into());
            args.push(format!("{}: {}", name, value).into());
        }

        match &request.body {
            RequestBody::Empty => {}
            RequestBody::Json(_) | RequestBody::Bytes(_) => {
                args.push("--input".into());
                args.push("-".into());
            }
            RequestBody::File { path, .. } => {
                args.push("--input".into());
                args.push(path.as_os_str().to_owned());
            }
        }

        // gh takes API paths without the leading slash
        let endpoint = if request.is_absolute() {
            request.target.as_str()
        } else {
            request.target.trim_start_matches('/')
        };
        args.push(endpoint.into());
        args
    }

    fn stdin_payload(body: &RequestBody) -> Result<Option<Vec<u8>>, TransportError> {
        match body {
            RequestBody::Json(value) => serde_json::to_vec(value)
                .map(Some)
                .map_err(|e| TransportError::Protocol(format!("failed to encode JSON body: {}", e))),
            RequestBody::Bytes(bytes) => Ok(Some(bytes.clone())),
            RequestBody::Empty | RequestBody::File { .. } => Ok(None),
        }
    }
}

#[async_trait]
impl Transport for GhCliTransport {
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let token = self.credentials.token().ok_or(TransportError::AuthMissing)?;
        let args = Self::build_args(&request);
        let stdin_payload = Self::stdin_payload(&request.body)?;

        self.logger.detail(&format!(
            "{} api {} {}",
            self.program.display(),
            request.method,
            request.target
        ));

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .env("GH_TOKEN", token)
            .env("GH_PROMPT_DISABLED", "1")
            .stdin(if stdin_payload.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| TransportError::Spawn(format!("{}: {}", self.program.display(), e)))?;

        if let Some(payload) = stdin_payload {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| TransportError::Protocol("child stdin unavailable".to_string()))?;
            stdin.write_all(&payload).await?;
            stdin.shutdown().await?;
        }

        // Dropping the future on timeout kills the child
        let wait = child.wait_with_output();
        let output = match deadline_for(&request.body, self.timeout, self.upload_timeout) {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| TransportError::Timeout(limit))??,
            None => wait.await?,
        };

        match parse_included_response(&output.stdout) {
            Some(response) => {
                self.logger.detail(&format!("-> status {} ({} bytes)", response.status, response.body.len()));
                Ok(response)
            }
            None => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                Err(TransportError::Network(if stderr.is_empty() {
                    format!("gh exited with {} without an HTTP response", output.status)
                } else {
                    stderr
                }))
            }
        }
    }

    fn name(&self) -> &'static str {
        "gh"
    }
}

/// Parse `gh api --include` output into a status and body
///
/// Returns `None` when stdout does not start with an HTTP status line, which
/// means the request never reached the service.
pub fn parse_included_response(stdout: &[u8]) -> Option<TransportResponse> {
    let (head, body) = split_head(stdout);
    let head = std::str::from_utf8(head).ok()?;
    let status_line = head.lines().next()?.trim();
    if !status_line.starts_with("HTTP/") {
        return None;
    }
    let status = status_line.split_whitespace().nth(1)?.parse::<u16>().ok()?;
    Some(TransportResponse::new(status, body.to_vec()))
}

fn split_head(stdout: &[u8]) -> (&[u8], &[u8]) {
    if let Some(pos) = find(stdout, b"\r\n\r\n") {
        (&stdout[..pos], &stdout[pos + 4..])
    } else if let Some(pos) = find(stdout, b"\n\n") {
        (&stdout[..pos], &stdout[pos + 2..])
    } else {
        (stdout, &[])
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
