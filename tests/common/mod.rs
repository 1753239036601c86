//! In-memory release service used by the integration tests
//!
//! Speaks the same paths and payloads as the real API for one repository
//! (`acme/mixer`) and one release (`v1.0.0`), records every call, and lets a
//! test inject delete/upload failures.

#![allow(dead_code)]

use async_trait::async_trait;
use release_asset_pusher::config::{DesiredFile, PublishConfig};
use release_asset_pusher::digest::sha256_bytes;
use release_asset_pusher::release::RemoteAsset;
use release_asset_pusher::transport::{
    Method, RequestBody, Transport, TransportError, TransportRequest, TransportResponse,
};
use percent_encoding::percent_decode_str;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use url::Url;

pub const OWNER: &str = "acme";
pub const REPO: &str = "mixer";
pub const TAG: &str = "v1.0.0";
pub const RELEASE_ID: u64 = 223797539;
pub const UPLOAD_BASE: &str = "https://uploads.fake.test";

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub target: String,
    pub content_type: Option<String>,
    /// Asset the call touched, for deletes and uploads
    pub asset_name: Option<String>,
}

struct State {
    release_exists: bool,
    release_tag: String,
    reject_auth: bool,
    assets: Vec<RemoteAsset>,
    next_id: u64,
    calls: Vec<RecordedCall>,
    delete_status: Option<u16>,
    upload_status: HashMap<String, u16>,
    network_down_for: HashSet<String>,
    omit_download_url: bool,
    report_digests: bool,
    corrupt_digests: bool,
}

pub struct FakeReleaseService {
    state: Mutex<State>,
}

impl FakeReleaseService {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                release_exists: true,
                release_tag: TAG.to_string(),
                reject_auth: false,
                assets: Vec::new(),
                next_id: 1000,
                calls: Vec::new(),
                delete_status: None,
                upload_status: HashMap::new(),
                network_down_for: HashSet::new(),
                omit_download_url: false,
                report_digests: false,
                corrupt_digests: false,
            }),
        }
    }

    pub fn without_release(self) -> Self {
        self.state.lock().unwrap().release_exists = false;
        self
    }

    pub fn with_release_tag(self, tag: &str) -> Self {
        self.state.lock().unwrap().release_tag = tag.to_string();
        self
    }

    pub fn rejecting_credentials(self) -> Self {
        self.state.lock().unwrap().reject_auth = true;
        self
    }

    pub fn with_existing_asset(self, name: &str, size: u64) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let id = state.next_id;
            state.next_id += 1;
            state.assets.push(asset(id, name, size, None));
        }
        self
    }

    /// Deletes answer with `status` and leave the asset in place
    pub fn failing_deletes_with(self, status: u16) -> Self {
        self.state.lock().unwrap().delete_status = Some(status);
        self
    }

    pub fn rejecting_upload(self, name: &str, status: u16) -> Self {
        self.state
            .lock()
            .unwrap()
            .upload_status
            .insert(name.to_string(), status);
        self
    }

    pub fn dropping_connection_for(self, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .network_down_for
            .insert(name.to_string());
        self
    }

    pub fn omitting_download_url(self) -> Self {
        self.state.lock().unwrap().omit_download_url = true;
        self
    }

    pub fn reporting_digests(self) -> Self {
        self.state.lock().unwrap().report_digests = true;
        self
    }

    pub fn corrupting_digests(self) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.report_digests = true;
            state.corrupt_digests = true;
        }
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub fn calls_with(&self, method: Method) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == method)
            .collect()
    }

    pub fn assets(&self) -> Vec<RemoteAsset> {
        self.state.lock().unwrap().assets.clone()
    }

    pub fn assets_named(&self, name: &str) -> Vec<RemoteAsset> {
        self.assets()
            .into_iter()
            .filter(|asset| asset.name == name)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn handle(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut state = self.state.lock().unwrap();
        let mut call = RecordedCall {
            method: request.method,
            target: request.target.clone(),
            content_type: request.headers.get("Content-Type").cloned(),
            asset_name: None,
        };

        if request.target.starts_with(UPLOAD_BASE) {
            let result = Self::upload(&mut state, &request, &mut call);
            state.calls.push(call);
            return result;
        }

        let (path, query) = request
            .target
            .split_once('?')
            .unwrap_or((request.target.as_str(), ""));
        let prefix = format!("/repos/{}/{}/releases/", OWNER, REPO);
        let segments: Vec<&str> = path
            .strip_prefix(&prefix)
            .map(|rest| rest.split('/').collect())
            .unwrap_or_default();

        let response = match (request.method, segments.as_slice()) {
            (Method::Get, ["tags", tag]) => {
                let tag = percent_decode_str(tag).decode_utf8_lossy();
                if state.reject_auth {
                    TransportResponse::new(401, r#"{"message":"Bad credentials"}"#)
                } else if state.release_exists && tag == state.release_tag {
                    TransportResponse::new(200, release_json(&state.release_tag).to_string())
                } else {
                    TransportResponse::new(404, r#"{"message":"Not Found"}"#)
                }
            }
            (Method::Get, [id, "assets"]) if *id == RELEASE_ID.to_string() => {
                let params = query_params(query);
                let per_page: usize = params.get("per_page").and_then(|v| v.parse().ok()).unwrap_or(30);
                let page: usize = params.get("page").and_then(|v| v.parse().ok()).unwrap_or(1);
                let listed: Vec<&RemoteAsset> = state
                    .assets
                    .iter()
                    .skip((page - 1) * per_page)
                    .take(per_page)
                    .collect();
                TransportResponse::new(200, serde_json::to_vec(&listed).unwrap())
            }
            (Method::Delete, ["assets", id]) => {
                let id: u64 = id.parse().unwrap_or_default();
                let position = state.assets.iter().position(|asset| asset.id == id);
                call.asset_name = position.map(|p| state.assets[p].name.clone());
                match (state.delete_status, position) {
                    (Some(status), _) => TransportResponse::new(status, r#"{"message":"injected failure"}"#),
                    (None, Some(position)) => {
                        state.assets.remove(position);
                        TransportResponse::new(204, Vec::new())
                    }
                    (None, None) => TransportResponse::new(404, r#"{"message":"Not Found"}"#),
                }
            }
            _ => TransportResponse::new(404, r#"{"message":"Not Found"}"#),
        };

        state.calls.push(call);
        Ok(response)
    }

    fn upload(
        state: &mut State,
        request: &TransportRequest,
        call: &mut RecordedCall,
    ) -> Result<TransportResponse, TransportError> {
        let url = Url::parse(&request.target).expect("upload URL");
        let name = url
            .query_pairs()
            .find(|(key, _)| key == "name")
            .map(|(_, value)| value.into_owned())
            .expect("upload without name");
        call.asset_name = Some(name.clone());

        if state.network_down_for.contains(&name) {
            return Err(TransportError::Network("connection reset by peer".to_string()));
        }
        if let Some(status) = state.upload_status.get(&name) {
            return Ok(TransportResponse::new(*status, r#"{"message":"injected rejection"}"#));
        }
        if state.assets.iter().any(|asset| asset.name == name) {
            return Ok(TransportResponse::new(
                422,
                r#"{"message":"Validation Failed","errors":[{"resource":"ReleaseAsset","code":"already_exists","field":"name"}]}"#,
            ));
        }

        let data = match &request.body {
            RequestBody::File { path, .. } => std::fs::read(path)?,
            RequestBody::Bytes(bytes) => bytes.clone(),
            _ => Vec::new(),
        };

        let id = state.next_id;
        state.next_id += 1;
        let digest = if state.corrupt_digests {
            Some(format!("sha256:{}", sha256_bytes(b"something else")))
        } else if state.report_digests {
            Some(format!("sha256:{}", sha256_bytes(&data)))
        } else {
            None
        };
        let created = asset(id, &name, data.len() as u64, digest);
        state.assets.push(created.clone());

        let mut body = serde_json::to_value(&created).unwrap();
        if state.omit_download_url {
            body.as_object_mut().unwrap().remove("browser_download_url");
        }
        Ok(TransportResponse::new(201, body.to_string()))
    }
}

#[async_trait]
impl Transport for FakeReleaseService {
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.handle(request)
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

fn asset(id: u64, name: &str, size: u64, digest: Option<String>) -> RemoteAsset {
    RemoteAsset {
        id,
        name: name.to_string(),
        size,
        download_url: format!(
            "https://github.com/{}/{}/releases/download/{}/{}",
            OWNER, REPO, TAG, name
        ),
        digest,
    }
}

fn release_json(tag: &str) -> serde_json::Value {
    json!({
        "id": RELEASE_ID,
        "tag_name": tag,
        "name": "Mixer 1.0.0",
        "html_url": format!("https://github.com/{}/{}/releases/tag/{}", OWNER, REPO, tag),
        "upload_url": format!("{}/repos/{}/{}/releases/{}/assets{{?name,label}}", UPLOAD_BASE, OWNER, REPO, RELEASE_ID),
    })
}

fn query_params(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// Write artifacts into `dir` and build a config publishing them in order
pub fn config_with_artifacts(dir: &Path, artifacts: &[(&str, &str)]) -> PublishConfig {
    let mut config = PublishConfig::new(OWNER, REPO, TAG).with_release_dir(dir);
    for (name, contents) in artifacts {
        std::fs::write(dir.join(name), contents).unwrap();
        config = config.with_asset(DesiredFile::new(*name, *name));
    }
    config
}
