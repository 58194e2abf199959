use image::DynamicImage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

pub trait ImageDetector {
    fn detect_document(&self, image: &DynamicImage) -> Option<DocumentRegion>;

    fn crop_document(&self, image: &DynamicImage, region: &DocumentRegion) -> DynamicImage {
        image.crop_imm(region.x, region.y, region.width, region.height)
    }
}

/// Locates the document as the bright ("paper") area of the frame: the image
/// is flattened to luma, contrast-stretched, and the bounding box of pixels
/// above `luma_threshold` is taken as the document region. Frames whose
/// bright area stays under `min_area_ratio` of the total are treated as
/// having no document.
#[derive(Debug, Clone)]
pub struct ThresholdDetector {
    pub luma_threshold: u8,
    pub min_area_ratio: f32,
}

impl Default for ThresholdDetector {
    fn default() -> Self {
        Self {
            luma_threshold: (0.65 * 255.0) as u8,
            min_area_ratio: 0.05,
        }
    }
}

impl ImageDetector for ThresholdDetector {
    fn detect_document(&self, image: &DynamicImage) -> Option<DocumentRegion> {
        let luma = composite_luma(image);
        let stretched = contrast_stretch(&luma);
        let (width, height) = stretched.dimensions();

        let mut min_x = width;
        let mut min_y = height;
        let mut max_x = 0u32;
        let mut max_y = 0u32;
        let mut bright = 0u64;
        for (x, y, pixel) in stretched.enumerate_pixels() {
            if pixel[0] > self.luma_threshold {
                bright += 1;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }

        if bright == 0 {
            return None;
        }
        let total = width as u64 * height as u64;
        if total == 0 || (bright as f32) < self.min_area_ratio * total as f32 {
            return None;
        }

        Some(DocumentRegion {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        })
    }
}

fn composite_luma(image: &DynamicImage) -> image::GrayImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut luma = image::GrayImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let r = (r as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        let g = (g as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        let b = (b as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        let value = (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u8;
        luma.put_pixel(x, y, image::Luma([value]));
    }

    luma
}

fn contrast_stretch(image: &image::GrayImage) -> image::GrayImage {
    let mut min = 255u8;
    let mut max = 0u8;
    for pixel in image.pixels() {
        let value = pixel[0];
        min = min.min(value);
        max = max.max(value);
    }

    if max <= min {
        return image.clone();
    }

    let scale = 255.0 / (max as f32 - min as f32);
    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        let value = pixel[0];
        pixel[0] = ((value.saturating_sub(min)) as f32 * scale).round() as u8;
    }
    output
}
