use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::detector::ImageDetector;
use crate::pdf::PdfConverter;

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub stem: String,
}

impl ImageUpload {
    pub fn from_file(path: &Path, stem: impl Into<String>) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("failed to read image: {}", path.display()))?;
        Ok(Self {
            bytes,
            stem: stem.into(),
        })
    }
}

pub struct DocumentProcessor<D, C> {
    detector: D,
    converter: C,
    output_dir: PathBuf,
}

impl<D: ImageDetector, C: PdfConverter> DocumentProcessor<D, C> {
    pub fn new(detector: D, converter: C, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            detector,
            converter,
            output_dir: output_dir.into(),
        }
    }

    /// Runs detect, crop and convert for one image. A detection miss is not
    /// an error: it yields `Ok(None)` and no PDF. Detector, decoder and
    /// converter failures propagate untranslated.
    pub fn process_image(&self, upload: &ImageUpload) -> Result<Option<PathBuf>> {
        let image = image::load_from_memory(&upload.bytes)
            .with_context(|| format!("failed to decode image '{}'", upload.stem))?;

        let Some(region) = self.detector.detect_document(&image) else {
            debug!("no document region found in '{}'", upload.stem);
            return Ok(None);
        };
        debug!(
            "document region in '{}': {}x{} at ({}, {})",
            upload.stem, region.width, region.height, region.x, region.y
        );

        let cropped = self.detector.crop_document(&image, &region);
        let scratch = tempfile::tempdir().with_context(|| "failed to create scratch dir")?;
        let cropped_path = scratch.path().join(format!("{}.png", upload.stem));
        cropped
            .save(&cropped_path)
            .with_context(|| format!("failed to write cropped image '{}'", upload.stem))?;

        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("failed to create output dir: {}", self.output_dir.display())
        })?;
        let pdf_path = self.output_dir.join(format!("{}.pdf", upload.stem));
        self.converter.convert(&cropped_path, &pdf_path)?;
        Ok(Some(pdf_path))
    }

    /// Best-effort batch: images without a detectable document are skipped,
    /// any raised error aborts the remaining batch.
    pub fn process_images(&self, uploads: &[ImageUpload]) -> Result<Vec<PathBuf>> {
        let mut pdf_files = Vec::new();
        for upload in uploads {
            if let Some(pdf_file) = self.process_image(upload)? {
                pdf_files.push(pdf_file);
            }
        }
        Ok(pdf_files)
    }
}
