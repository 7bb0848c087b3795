use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Json, Response};
use chrono::{DateTime, Utc};
use depot_catalog::{ArtifactRecord, ReleaseRecord, SCHEMA_VERSION};
use depot_ingest::{ClientUpdateInfo, IngestKind, IngestOutcome, IngestRequest};
use depot_types::{CollectionId, ContentHash, RelativePath, Version};
use futures::TryStreamExt;
use http_body_util::LengthLimitError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::io::{ReaderStream, StreamReader, SyncIoBridge};

use crate::auth::{require, Action};
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Header carrying the uploader's modification time of the source file.
pub const SOURCE_MODIFIED_HEADER: &str = "x-source-modified";

/// Release file name used when the uploader does not name one.
pub const DEFAULT_RELEASE_FILE: &str = "client.bin";

const DOWNLOAD_BUFFER: usize = 64 * 1024;

type SharedState = State<Arc<AppState>>;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

pub async fn info_handler() -> Json<serde_json::Value> {
    Json(json!({
        "name": "depot-server",
        "version": env!("CARGO_PKG_VERSION"),
        "catalog_schema_version": SCHEMA_VERSION,
    }))
}

// ---- Game files ----

#[derive(Debug, Serialize, Deserialize)]
pub struct ManifestResponse {
    pub collection: CollectionId,
    pub files: Vec<ArtifactRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub outcome: IngestKind,
    pub record: ArtifactRecord,
    /// Where the superseded file was moved, for `updated` outcomes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_to: Option<PathBuf>,
}

pub async fn list_files(
    State(state): SharedState,
    headers: HeaderMap,
    Path(collection): Path<String>,
) -> ServerResult<Json<ManifestResponse>> {
    require(state.auth.as_ref(), &headers, Action::Read { resource: collection.clone() }).await?;
    let collection = CollectionId::new(collection)?;
    let files = state.engine.manifest(&collection)?;
    Ok(Json(ManifestResponse { collection, files }))
}

pub async fn upload_file(
    State(state): SharedState,
    headers: HeaderMap,
    Path((collection, path)): Path<(String, String)>,
    body: Body,
) -> ServerResult<Json<IngestResponse>> {
    let identity = require(
        state.auth.as_ref(),
        &headers,
        Action::Write { resource: format!("{collection}/{path}") },
    )
    .await?;
    let mut request = IngestRequest::new(CollectionId::new(collection)?, RelativePath::new(path)?);
    check_content_length(&headers, state.config.max_upload_bytes)?;
    if let Some(modified) = source_modified(&headers)? {
        request = request.modified_at(modified);
    }

    tracing::debug!(uploader = %identity.name, key = %request.key(), "receiving upload");
    let upload = UploadBody::new(body);
    let exceeded = upload.limit_flag();
    let engine = Arc::clone(&state.engine);
    let outcome = blocking(move || {
        let mut reader = upload.into_reader();
        Ok(engine.ingest(&request, &mut reader)?)
    })
    .await
    .map_err(|e| over_limit(e, &exceeded, state.config.max_upload_bytes))?;

    let kind = outcome.kind();
    let (record, archived_to) = match outcome {
        IngestOutcome::Updated { record, archived } => (record, Some(archived.path)),
        IngestOutcome::Created(record) | IngestOutcome::Unchanged(record) => (record, None),
    };
    Ok(Json(IngestResponse { outcome: kind, record, archived_to }))
}

pub async fn download_file(
    State(state): SharedState,
    headers: HeaderMap,
    Path((collection, path)): Path<(String, String)>,
) -> ServerResult<Response> {
    require(
        state.auth.as_ref(),
        &headers,
        Action::Read { resource: format!("{collection}/{path}") },
    )
    .await?;
    let collection = CollectionId::new(collection)?;
    let path = RelativePath::new(path)?;
    let engine = Arc::clone(&state.engine);
    let (record, reader) = blocking(move || Ok(engine.open(&collection, &path)?)).await?;
    stream_download(reader, record.size, &record.name, &record.hash)
}

// ---- Releases ----

#[derive(Debug, Deserialize)]
pub struct PublishQuery {
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReleaseNotesResponse {
    pub version: Version,
    pub release_notes: String,
    pub hash: ContentHash,
}

#[derive(Debug, Deserialize)]
pub struct SetNotesRequest {
    pub release_notes: String,
}

pub async fn list_releases(
    State(state): SharedState,
    headers: HeaderMap,
) -> ServerResult<Json<Vec<ReleaseRecord>>> {
    require(state.auth.as_ref(), &headers, Action::Read { resource: "releases".into() }).await?;
    Ok(Json(state.registry.releases()?))
}

pub async fn latest_release(
    State(state): SharedState,
    headers: HeaderMap,
) -> ServerResult<Json<ReleaseRecord>> {
    require(state.auth.as_ref(), &headers, Action::Read { resource: "releases".into() }).await?;
    Ok(Json(state.registry.latest()?))
}

pub async fn publish_release(
    State(state): SharedState,
    headers: HeaderMap,
    Path(version): Path<String>,
    Query(query): Query<PublishQuery>,
    body: Body,
) -> ServerResult<(StatusCode, Json<ReleaseRecord>)> {
    require(
        state.auth.as_ref(),
        &headers,
        Action::Write { resource: format!("releases/{version}") },
    )
    .await?;
    let version = Version::new(version)?;
    let file_name =
        RelativePath::new(query.file_name.unwrap_or_else(|| DEFAULT_RELEASE_FILE.to_string()))?;
    check_content_length(&headers, state.config.max_upload_bytes)?;

    let upload = UploadBody::new(body);
    let exceeded = upload.limit_flag();
    let registry = Arc::clone(&state.registry);
    let record = blocking(move || {
        let mut reader = upload.into_reader();
        Ok(registry.publish(&version, &file_name, &mut reader)?)
    })
    .await
    .map_err(|e| over_limit(e, &exceeded, state.config.max_upload_bytes))?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_release_notes(
    State(state): SharedState,
    headers: HeaderMap,
    Path(version): Path<String>,
) -> ServerResult<Json<ReleaseNotesResponse>> {
    require(
        state.auth.as_ref(),
        &headers,
        Action::Read { resource: format!("releases/{version}") },
    )
    .await?;
    let version = Version::new(version)?;
    let (release_notes, hash) = state.registry.release_notes_and_hash(&version)?;
    Ok(Json(ReleaseNotesResponse { version, release_notes, hash }))
}

pub async fn set_release_notes(
    State(state): SharedState,
    headers: HeaderMap,
    Path(version): Path<String>,
    Json(body): Json<SetNotesRequest>,
) -> ServerResult<StatusCode> {
    require(
        state.auth.as_ref(),
        &headers,
        Action::Write { resource: format!("releases/{version}") },
    )
    .await?;
    let version = Version::new(version)?;
    let registry = Arc::clone(&state.registry);
    let label = version.to_string();
    let updated =
        blocking(move || Ok(registry.set_release_notes(&version, &body.release_notes)?)).await?;
    if updated {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::NotFound(format!("release {label}")))
    }
}

pub async fn download_release(
    State(state): SharedState,
    headers: HeaderMap,
    Path(version): Path<String>,
) -> ServerResult<Response> {
    require(
        state.auth.as_ref(),
        &headers,
        Action::Read { resource: format!("releases/{version}") },
    )
    .await?;
    let version = Version::new(version)?;
    let registry = Arc::clone(&state.registry);
    let (record, reader) = blocking(move || Ok(registry.open_release(&version)?)).await?;
    stream_download(reader, record.size, &record.name, &record.hash)
}

// ---- Update check ----

#[derive(Debug, Deserialize)]
pub struct UpdateQuery {
    #[serde(default)]
    pub current: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    #[serde(flatten)]
    pub info: ClientUpdateInfo,
    pub download_url: Option<String>,
}

pub async fn check_update(
    State(state): SharedState,
    headers: HeaderMap,
    Query(query): Query<UpdateQuery>,
) -> ServerResult<Json<UpdateResponse>> {
    require(state.auth.as_ref(), &headers, Action::Read { resource: "updates".into() }).await?;
    let info = state.registry.client_update_info(&query.current);
    let download_url = info
        .latest_version
        .as_ref()
        .map(|v| state.config.release_download_url(v.as_str()));
    Ok(Json(UpdateResponse { info, download_url }))
}

// ---- Plumbing ----

/// Run synchronous engine work off the async executor.
async fn blocking<T, F>(f: F) -> ServerResult<T>
where
    F: FnOnce() -> ServerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServerError::Internal(format!("blocking task failed: {e}")))?
}

/// A streaming request body on its way to a blocking reader. Remembers
/// whether the stream was cut off by the upload size limit.
struct UploadBody {
    body: Body,
    exceeded: Arc<AtomicBool>,
    runtime: tokio::runtime::Handle,
}

impl UploadBody {
    /// Must be called from within the runtime.
    fn new(body: Body) -> Self {
        Self {
            body,
            exceeded: Arc::new(AtomicBool::new(false)),
            runtime: tokio::runtime::Handle::current(),
        }
    }

    fn limit_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.exceeded)
    }

    /// Blocking reader over the body, for use on a blocking thread.
    fn into_reader(self) -> impl Read {
        let exceeded = self.exceeded;
        let stream = self.body.into_data_stream().map_err(move |e| {
            if is_length_limit(&e) {
                exceeded.store(true, Ordering::SeqCst);
            }
            io::Error::other(e)
        });
        SyncIoBridge::new_with_handle(StreamReader::new(stream), self.runtime)
    }
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

/// An upload that failed because its body crossed the size limit mid-stream
/// is reported as too large rather than as a storage failure.
fn over_limit(err: ServerError, exceeded: &AtomicBool, limit: u64) -> ServerError {
    if exceeded.load(Ordering::SeqCst) {
        tracing::warn!(limit, "upload exceeded size limit while streaming");
        ServerError::PayloadTooLarge { limit }
    } else {
        err
    }
}

fn check_content_length(headers: &HeaderMap, limit: u64) -> ServerResult<()> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    match declared {
        Some(len) if len > limit => Err(ServerError::PayloadTooLarge { limit }),
        _ => Ok(()),
    }
}

fn source_modified(headers: &HeaderMap) -> ServerResult<Option<DateTime<Utc>>> {
    let Some(value) = headers.get(SOURCE_MODIFIED_HEADER) else {
        return Ok(None);
    };
    let text = value
        .to_str()
        .map_err(|_| ServerError::InvalidInput(format!("{SOURCE_MODIFIED_HEADER} is not text")))?;
    DateTime::parse_from_rfc3339(text)
        .map(|t| Some(t.with_timezone(&Utc)))
        .map_err(|e| ServerError::InvalidInput(format!("{SOURCE_MODIFIED_HEADER}: {e}")))
}

/// Stream a blocking reader to the client as `application/octet-stream`.
fn stream_download(
    reader: Box<dyn Read + Send>,
    size: u64,
    file_name: &str,
    hash: &ContentHash,
) -> ServerResult<Response> {
    let (tx, rx) = tokio::io::duplex(DOWNLOAD_BUFFER);
    let mut writer = SyncIoBridge::new(tx);
    tokio::task::spawn_blocking(move || {
        let mut reader = reader;
        if let Err(e) = io::copy(&mut reader, &mut writer) {
            tracing::warn!(error = %e, "download interrupted");
        }
    });

    Response::builder()
        .header(CONTENT_TYPE, "application/octet-stream")
        .header(CONTENT_LENGTH, size)
        .header(
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name.replace('"', "")),
        )
        .header("x-content-hash", hash.to_hex())
        .body(Body::from_stream(ReaderStream::new(rx)))
        .map_err(|e| ServerError::Internal(e.to_string()))
}
