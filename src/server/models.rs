use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct ScanResponse {
    pub(crate) message: String,
    pub(crate) pdf_file: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}
