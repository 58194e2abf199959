use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::detector::{ImageDetector, ThresholdDetector};
use crate::pdf::{PdfConverter, RasterPdfConverter};
use crate::processor::{DocumentProcessor, ImageUpload};
use crate::settings::Settings;

use super::models::{ErrorResponse, ScanResponse};
use super::state::ServerState;

pub async fn run_server(settings: Settings, addr: String) -> Result<()> {
    let processor = DocumentProcessor::new(
        ThresholdDetector::default(),
        RasterPdfConverter,
        settings.upload_folder.clone(),
    );
    let state = Arc::new(ServerState {
        settings,
        processor,
    });
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| "failed to bind server address")?;
    info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router<D, C>(state: Arc<ServerState<D, C>>) -> Router
where
    D: ImageDetector + Send + Sync + 'static,
    C: PdfConverter + Send + Sync + 'static,
{
    Router::new()
        .route("/scan", post(scan::<D, C>))
        .route("/health", get(health))
        .with_state(state)
        .layer(axum::middleware::from_fn(cors_middleware))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "healthy" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type,authorization"),
    );
}

struct ReceivedImage {
    bytes: Vec<u8>,
    file_name: String,
}

async fn scan<D, C>(
    State(state): State<Arc<ServerState<D, C>>>,
    multipart: Multipart,
) -> Response
where
    D: ImageDetector + Send + Sync + 'static,
    C: PdfConverter + Send + Sync + 'static,
{
    let received = match read_image_field(multipart).await {
        Ok(Some(received)) => received,
        Ok(None) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "No image file provided".to_string(),
                }),
            )
                .into_response();
        }
        Err(err) => {
            return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
        }
    };

    let digest = format!("{:x}", md5::compute(&received.bytes));
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    let upload = ImageUpload {
        bytes: received.bytes,
        stem: format!("{}_{}", now, &digest[..12]),
    };

    if let Err(err) = archive_upload(&state.settings, &upload, &received.file_name) {
        warn!("failed to archive upload: {}", err);
    }

    let task_state = state.clone();
    let result =
        tokio::task::spawn_blocking(move || task_state.processor.process_image(&upload)).await;

    match result {
        Ok(Ok(Some(pdf_file))) => (
            StatusCode::OK,
            Json(ScanResponse {
                message: "Document scanned successfully".to_string(),
                pdf_file: pdf_file.display().to_string(),
            }),
        )
            .into_response(),
        Ok(Ok(None)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to process image".to_string(),
            }),
        )
            .into_response(),
        Ok(Err(err)) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", err)).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("server task failed: {}", err),
        )
            .into_response(),
    }
}

async fn read_image_field(mut multipart: Multipart) -> Result<Option<ReceivedImage>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .with_context(|| "failed to read multipart form")?
    {
        if field.name() != Some("image") {
            continue;
        }
        // Text parts named "image" do not count as an uploaded file.
        let Some(file_name) = field.file_name().map(|name| name.to_string()) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .with_context(|| "failed to read image field")?;
        return Ok(Some(ReceivedImage {
            bytes: bytes.to_vec(),
            file_name,
        }));
    }
    Ok(None)
}

// Keeps the raw upload around under the configured upload folder. Failure is
// logged, not surfaced: the scan itself does not depend on the archive.
fn archive_upload(settings: &Settings, upload: &ImageUpload, client_name: &str) -> Result<()> {
    let extension = Path::new(client_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .or_else(|| infer::get(&upload.bytes).map(|kind| kind.extension().to_string()))
        .unwrap_or_else(|| "bin".to_string());
    fs::create_dir_all(&settings.upload_folder).with_context(|| {
        format!(
            "failed to create upload folder: {}",
            settings.upload_folder.display()
        )
    })?;
    let path = settings
        .upload_folder
        .join(format!("{}.{}", upload.stem, extension));
    fs::write(&path, &upload.bytes)
        .with_context(|| format!("failed to write upload: {}", path.display()))?;
    Ok(())
}
