//
// web.rs
// XNAT-RTStruct-rs
//
// Axum HTTP service: upload a structure set, read its validation report, derive ROI subsets and fetch per-ROI XML.
//

use std::collections::BTreeSet;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::{Path as FsPath, PathBuf};

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::{
    config::XnatArgs,
    error::RtStructError,
    models::{StructureSetSummary, ValidationReport},
    rtstruct::RtStruct,
    storage::FileStore,
    upload,
};

#[derive(Clone)]
struct AppState {
    store: FileStore,
    xnat: XnatArgs,
}

type ApiError = (StatusCode, Json<Value>);
type ApiResult<T> = Result<T, ApiError>;

pub async fn start_server(host: &str, port: u16, storage: &FsPath, xnat: XnatArgs) -> anyhow::Result<()> {
    let state = AppState {
        store: FileStore::new(storage)?,
        xnat,
    };

    let app = Router::new()
        .route("/api/upload", post(upload_handler))
        .route("/api/rtstruct/:filename", get(report_handler))
        .route("/api/rtstruct/:filename/subset", post(subset_handler))
        .route("/api/rtstruct/:filename/rois/:roi/xml", get(roi_xml_handler))
        .route("/api/download/:filename", get(download_handler))
        .with_state(state)
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("server running at http://{addr}");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Parse a stored file on a blocking worker; validation failures come back as 422 with every diagnostic.
async fn load(state: &AppState, filename: &str) -> ApiResult<RtStruct> {
    let path = state.store.resolve(filename).map_err(not_found)?;
    let xnat = state.xnat.clone();
    let outcome = tokio::task::spawn_blocking(move || xnat.parse_file(&path))
        .await
        .map_err(internal_error)?
        .map_err(internal_error)?;
    outcome.map_err(|e| unprocessable(filename, &e))
}

async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut original_name = None;
    let mut data = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        if field.name() == Some("file") {
            original_name = field.file_name().map(|s| s.to_string());
            data = Some(field.bytes().await.map_err(internal_error)?);
            break;
        }
    }

    let data = data.ok_or_else(|| bad_request("No file uploaded"))?;
    let saved_name = state
        .store
        .save(original_name.as_deref(), &data)
        .map_err(internal_error)?;

    let rtstruct = load(&state, &saved_name).await?;
    Ok(Json(json!({
        "success": true,
        "filename": saved_name,
        "structure_set": rtstruct.report(),
    })))
}

async fn report_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Json<StructureSetSummary>> {
    let rtstruct = load(&state, &filename).await?;
    Ok(Json(rtstruct.report()))
}

#[derive(Debug, Deserialize)]
struct SubsetRequest {
    rois: Vec<i32>,
}

async fn subset_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Json(request): Json<SubsetRequest>,
) -> ApiResult<Json<Value>> {
    if request.rois.is_empty() {
        return Err(bad_request("at least one ROI number is required"));
    }
    let rtstruct = load(&state, &filename).await?;
    let wanted: BTreeSet<i32> = request.rois.into_iter().collect();
    let missing: Vec<i32> = wanted
        .iter()
        .copied()
        .filter(|n| rtstruct.roi(*n).is_none())
        .collect();
    let subset = rtstruct.derive_subset(&wanted).map_err(bad_request)?;
    let encoded = subset.to_dicom().map_err(|e| unprocessable(&filename, &e))?;
    let (subset_name, subset_path) = state
        .store
        .derived_path(&filename, "subset", &encoded.sop_instance_uid);
    upload::write_encoded(&encoded, &subset_path).map_err(internal_error)?;

    Ok(Json(json!({
        "success": true,
        "filename": subset_name,
        "sop_instance_uid": encoded.sop_instance_uid,
        "ignored_rois": missing,
        "structure_set": subset.report(),
    })))
}

async fn roi_xml_handler(
    State(state): State<AppState>,
    Path((filename, roi)): Path<(String, i32)>,
) -> ApiResult<impl IntoResponse> {
    let rtstruct = load(&state, &filename).await?;
    let entry = rtstruct
        .roi(roi)
        .ok_or_else(|| not_found(format!("ROI {roi} is not in {filename}")))?;
    let xml = upload::roi_xml(&rtstruct, entry, &rtstruct.structure_set.sop_instance_uid)
        .map_err(internal_error)?;
    Ok(([(header::CONTENT_TYPE, "application/xml")], xml))
}

async fn download_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let path: PathBuf = state.store.resolve(&filename).map_err(not_found)?;
    let bytes = tokio::fs::read(&path).await.map_err(internal_error)?;
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(internal_error)?;
    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/dicom"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

fn unprocessable(filename: &str, err: &RtStructError) -> ApiError {
    let report = ValidationReport::failed(filename, err);
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(serde_json::to_value(report).unwrap_or_else(|e| json!({ "error": e.to_string() }))),
    )
}

fn error_body<E: Display>(status: StatusCode, err: E) -> ApiError {
    (status, Json(json!({ "error": err.to_string() })))
}

fn bad_request<E: Display>(err: E) -> ApiError {
    error_body(StatusCode::BAD_REQUEST, err)
}

fn internal_error<E: Display>(err: E) -> ApiError {
    error_body(StatusCode::INTERNAL_SERVER_ERROR, err)
}

fn not_found<E: Display>(err: E) -> ApiError {
    error_body(StatusCode::NOT_FOUND, err)
}
