use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::BufWriter;
use std::path::Path;

use printpdf::{Image, ImageTransform, Mm, PdfDocument};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;

// Fixed placement policy: 10mm offset from the top-left corner, 190mm wide.
const MARGIN_LEFT_MM: f32 = 10.0;
const MARGIN_TOP_MM: f32 = 10.0;
const IMAGE_WIDTH_MM: f32 = 190.0;

pub trait PdfConverter {
    fn convert(&self, image_path: &Path, output_pdf_path: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RasterPdfConverter;

impl PdfConverter for RasterPdfConverter {
    fn convert(&self, image_path: &Path, output_pdf_path: &Path) -> Result<()> {
        convert_to_pdf(image_path, output_pdf_path)
    }
}

/// Wraps one image file into a single-page A4 PDF at `output_pdf_path`,
/// overwriting any existing file. The input path must exist before any
/// conversion work starts.
pub fn convert_to_pdf(image_path: &Path, output_pdf_path: &Path) -> Result<()> {
    if !image_path.exists() {
        return Err(anyhow!("image file not found: {}", image_path.display()));
    }

    let bytes = fs::read(image_path)
        .with_context(|| format!("failed to read image: {}", image_path.display()))?;
    let image = printpdf::image_crate::load_from_memory(&bytes)
        .with_context(|| format!("failed to decode image: {}", image_path.display()))?;
    let width_mm = px_to_mm(image.width());
    let height_mm = px_to_mm(image.height());
    if width_mm <= 0.0 {
        return Err(anyhow!("image has no width: {}", image_path.display()));
    }

    let (doc, page, layer) = PdfDocument::new(
        "scanned document",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let scale = IMAGE_WIDTH_MM / width_mm;
    let rendered_height_mm = height_mm * scale;

    let current_layer = doc.get_page(page).get_layer(layer);
    let pdf_image = Image::from_dynamic_image(&image);
    let transform = ImageTransform {
        translate_x: Some(Mm(MARGIN_LEFT_MM)),
        translate_y: Some(Mm(PAGE_HEIGHT_MM - MARGIN_TOP_MM - rendered_height_mm)),
        rotate: None,
        scale_x: Some(scale),
        scale_y: Some(scale),
        dpi: Some(72.0),
    };
    pdf_image.add_to_layer(current_layer, transform);

    let file = fs::File::create(output_pdf_path)
        .with_context(|| format!("failed to create pdf: {}", output_pdf_path.display()))?;
    let mut writer = BufWriter::new(file);
    doc.save(&mut writer)
        .with_context(|| format!("failed to write pdf: {}", output_pdf_path.display()))?;
    Ok(())
}

fn px_to_mm(px: u32) -> f32 {
    let inches = px as f32 / 72.0;
    inches * 25.4
}
