use std::io::Cursor;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use doc_scanner_rust::detector::{DocumentRegion, ImageDetector};
use doc_scanner_rust::pdf::{PdfConverter, RasterPdfConverter};
use doc_scanner_rust::processor::DocumentProcessor;
use doc_scanner_rust::server::{router, ServerState};
use doc_scanner_rust::settings::Settings;

struct FixedDetector {
    region: Option<DocumentRegion>,
}

impl ImageDetector for FixedDetector {
    fn detect_document(&self, _image: &DynamicImage) -> Option<DocumentRegion> {
        self.region.clone()
    }
}

struct FailingConverter;

impl PdfConverter for FailingConverter {
    fn convert(&self, _image_path: &Path, _output_pdf_path: &Path) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("converter exploded"))
    }
}

async fn spawn_server<D, C>(detector: D, converter: C, dir: &Path) -> String
where
    D: ImageDetector + Send + Sync + 'static,
    C: PdfConverter + Send + Sync + 'static,
{
    let mut settings = Settings::default();
    settings.upload_folder = dir.join("uploads");
    let processor = DocumentProcessor::new(detector, converter, dir.join("output"));
    let state = Arc::new(ServerState {
        settings,
        processor,
    });
    let app = router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr: SocketAddr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{}", addr)
}

fn png_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    let image = RgbImage::from_pixel(64, 64, Rgb([235, 235, 235]));
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode png");
    bytes
}

fn image_form() -> reqwest::multipart::Form {
    reqwest::multipart::Form::new().part(
        "image",
        reqwest::multipart::Part::bytes(png_bytes()).file_name("doc.png"),
    )
}

fn inner_region() -> DocumentRegion {
    DocumentRegion {
        x: 8,
        y: 8,
        width: 48,
        height: 48,
    }
}

#[tokio::test]
async fn scan_without_image_field_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = spawn_server(
        FixedDetector {
            region: Some(inner_region()),
        },
        RasterPdfConverter,
        dir.path(),
    )
    .await;

    let form = reqwest::multipart::Form::new().text("note", "no file here");
    let response = reqwest::Client::new()
        .post(format!("{}/scan", base))
        .multipart(form)
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body, serde_json::json!({ "error": "No image file provided" }));
}

#[tokio::test]
async fn text_field_named_image_is_not_a_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = spawn_server(
        FixedDetector {
            region: Some(inner_region()),
        },
        RasterPdfConverter,
        dir.path(),
    )
    .await;

    let form = reqwest::multipart::Form::new().text("image", "not a file");
    let response = reqwest::Client::new()
        .post(format!("{}/scan", base))
        .multipart(form)
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body, serde_json::json!({ "error": "No image file provided" }));
}

#[tokio::test]
async fn detection_miss_maps_to_processing_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = spawn_server(
        FixedDetector { region: None },
        RasterPdfConverter,
        dir.path(),
    )
    .await;

    let response = reqwest::Client::new()
        .post(format!("{}/scan", base))
        .multipart(image_form())
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body, serde_json::json!({ "error": "Failed to process image" }));
}

#[tokio::test]
async fn detected_document_returns_pdf_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = spawn_server(
        FixedDetector {
            region: Some(inner_region()),
        },
        RasterPdfConverter,
        dir.path(),
    )
    .await;

    let response = reqwest::Client::new()
        .post(format!("{}/scan", base))
        .multipart(image_form())
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["message"], "Document scanned successfully");
    let pdf_file = body["pdf_file"].as_str().expect("pdf_file string");
    assert!(!pdf_file.is_empty());
    assert!(Path::new(pdf_file).exists());
}

#[tokio::test]
async fn scan_archives_the_raw_upload() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = spawn_server(
        FixedDetector {
            region: Some(inner_region()),
        },
        RasterPdfConverter,
        dir.path(),
    )
    .await;

    reqwest::Client::new()
        .post(format!("{}/scan", base))
        .multipart(image_form())
        .send()
        .await
        .expect("request");

    let uploads: Vec<_> = std::fs::read_dir(dir.path().join("uploads"))
        .expect("upload folder")
        .filter_map(|entry| entry.ok())
        .collect();
    assert_eq!(uploads.len(), 1);
    assert_eq!(
        uploads[0].path().extension().and_then(|ext| ext.to_str()),
        Some("png")
    );
}

#[tokio::test]
async fn pipeline_error_is_not_a_crafted_json_body() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = spawn_server(
        FixedDetector {
            region: Some(inner_region()),
        },
        FailingConverter,
        dir.path(),
    )
    .await;

    let response = reqwest::Client::new()
        .post(format!("{}/scan", base))
        .multipart(image_form())
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(!content_type.contains("application/json"), "{}", content_type);
    let body = response.text().await.expect("body");
    assert!(body.contains("converter exploded"), "{}", body);
}

#[tokio::test]
async fn health_always_reports_healthy() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = spawn_server(
        FixedDetector { region: None },
        RasterPdfConverter,
        dir.path(),
    )
    .await;

    let response = reqwest::Client::new()
        .get(format!("{}/health", base))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body, serde_json::json!({ "status": "healthy" }));
}
