pub mod detector;
pub mod document;
pub mod logging;
pub mod pdf;
pub mod processor;
pub mod server;
pub mod settings;

pub use detector::{DocumentRegion, ImageDetector, ThresholdDetector};
pub use pdf::{convert_to_pdf, PdfConverter, RasterPdfConverter};
pub use processor::{DocumentProcessor, ImageUpload};
