use actix_web::http::{header, Method};
use actix_web::{web, HttpRequest, HttpResponse, Resource};
use futures::TryStreamExt;
use log::{info, warn};
use serde_json::Value;

use crate::brightdata::BrightdataClient;
use crate::config::Config;
use crate::error::{ApiError, SetupError};
use crate::models::{
    DownloadQuery, ErrorResponse, MessageResponse, SnapshotStatus, SnapshotsQuery, TriggerQuery,
};
use crate::token::{ApiToken, API_TOKEN_HEADER};
use crate::transform;
use crate::validation::{self, ValidationError};

const DEFAULT_DOWNLOAD_FORMAT: &str = "csv";

/// Shared, read-only state handed to every handler.
pub struct AppState {
    pub brightdata: BrightdataClient,
    pub default_dataset_id: String,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, SetupError> {
        Ok(Self {
            brightdata: BrightdataClient::new(
                &config.brightdata_api_url,
                config.upstream_timeout(),
                config.upstream_proxy.as_deref(),
            )?,
            default_dataset_id: config.dataset_id.clone(),
        })
    }

    fn dataset_id<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(&self.default_dataset_id)
    }
}

/// Register every route on an app or scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .service(resource("/api/trigger").route(web::post().to(trigger)))
        .service(resource("/api/progress/{snapshot_id}").route(web::get().to(progress)))
        .service(resource("/api/snapshots").route(web::get().to(snapshots)))
        .service(resource("/api/snapshot/{snapshot_id}/cancel").route(web::post().to(cancel)))
        .service(resource("/api/snapshot/{snapshot_id}").route(web::get().to(download)))
        .service(resource("/webhook").route(web::post().to(webhook)))
        .service(resource("/healthz").route(web::get().to(healthz)));
}

/// App-wide default service: answers preflight on any path, 404 otherwise.
pub async fn fallback(req: HttpRequest) -> HttpResponse {
    if req.method() == Method::OPTIONS {
        return preflight().await;
    }
    HttpResponse::NotFound().json(ErrorResponse {
        error: "Not found".to_string(),
    })
}

/// Headers added to every response so the browser UI can call the relay
/// from another origin.
pub fn cors_headers() -> actix_web::middleware::DefaultHeaders {
    actix_web::middleware::DefaultHeaders::new()
        .add((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .add((header::ACCESS_CONTROL_EXPOSE_HEADERS, "Content-Disposition"))
}

fn resource(path: &str) -> Resource {
    web::resource(path).route(web::route().method(Method::OPTIONS).to(preflight))
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::BadRequest(format!("Invalid JSON body: {}", err)).into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        ApiError::BadRequest(format!("Invalid query string: {}", err)).into()
    })
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(format!("Invalid path: {}", err)).into())
}

async fn preflight() -> HttpResponse {
    HttpResponse::NoContent()
        .insert_header((header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"))
        .insert_header((
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            format!("Content-Type, {}", API_TOKEN_HEADER),
        ))
        .finish()
}

/// Validates the group batch, reshapes it, and starts a collection job.
async fn trigger(
    token: ApiToken,
    query: web::Query<TriggerQuery>,
    body: web::Json<Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let groups = validation::validate_batch(body.into_inner())?;
    let payload = transform::to_trigger_payload(&groups);

    let dataset_id = state.dataset_id(query.dataset_id.as_deref());
    let notify = query.notify.as_deref().filter(|n| !n.trim().is_empty());

    let response = state
        .brightdata
        .trigger(&token, dataset_id, notify, &payload)
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

async fn progress(
    token: ApiToken,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let snapshot_id = path.into_inner();
    let response = state.brightdata.progress(&token, &snapshot_id).await?;
    Ok(HttpResponse::Ok().json(response))
}

async fn snapshots(
    token: ApiToken,
    query: web::Query<SnapshotsQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let status: SnapshotStatus = query
        .status
        .as_deref()
        .ok_or(ValidationError::InvalidStatus)?
        .parse()?;
    let dataset_id = state.dataset_id(query.dataset_id.as_deref());

    let response = state
        .brightdata
        .snapshots(&token, dataset_id, status)
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

async fn cancel(
    token: ApiToken,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let snapshot_id = path.into_inner();
    let response = state.brightdata.cancel(&token, &snapshot_id).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Streams the snapshot file straight from the upstream to the caller.
async fn download(
    token: ApiToken,
    path: web::Path<String>,
    query: web::Query<DownloadQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let snapshot_id = path.into_inner();

    // Default to CSV when no format is requested
    let format = query
        .format
        .as_deref()
        .filter(|f| !f.trim().is_empty())
        .unwrap_or(DEFAULT_DOWNLOAD_FORMAT);

    let upstream = state
        .brightdata
        .download(&token, &snapshot_id, format)
        .await?;

    // Relay the upstream body chunk by chunk, logging if it breaks off
    let id_for_log = snapshot_id.clone();
    let body = upstream.bytes_stream().inspect_err(move |e| {
        warn!("Snapshot {} download interrupted: {}", id_for_log, e);
    });

    // Always served as a CSV attachment
    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=snapshot-{}.csv",
                attachment_name(&snapshot_id)
            ),
        ))
        .streaming(body))
}

/// Keep only characters that are safe inside an unquoted filename.
fn attachment_name(snapshot_id: &str) -> String {
    snapshot_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect()
}

/// Receives completion notifications from the upstream.
///
/// Always acknowledged: a body that is empty or not JSON is logged as if it
/// were `{}`.
async fn webhook(req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let body: Value =
        serde_json::from_slice(&body).unwrap_or_else(|_| Value::Object(Default::default()));
    let field = |name: &str| match body.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "-".to_string(),
    };

    info!(
        "Received webhook notification: snapshot_id={} status={} timestamp={} from={}",
        field("snapshot_id"),
        field("status"),
        chrono::Utc::now().to_rfc3339(),
        req.connection_info().realip_remote_addr().unwrap_or("unknown")
    );

    HttpResponse::Ok().json(MessageResponse {
        message: "Webhook received".to_string(),
    })
}

async fn healthz() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}
