//! PDF conversion: page 1 rendered to PNG with PDFium, text pulled with pdf-extract.
//!
//! Both libraries are blocking, so the work runs on tokio's blocking pool.
//! A fresh `Pdfium` handle is bound per conversion because the upstream type is
//! `!Send`; the OS caches the library load.

use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use image::ImageOutputFormat;
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use super::{preview_image_name, ConversionError, ConvertedDocument, DocumentConverter, UploadedDocument};

/// Page 1 is rendered at 4x the 72pt PDF unit.
pub const DEFAULT_RENDER_DPI: u32 = 288;

/// Long-edge cap for the rendered preview.
const MAX_DIMENSION_PX: u32 = 4096;

const POINTS_PER_INCH: f32 = 72.0;

pub struct PdfConverter {
    dpi: u32,
    library_path: Option<String>,
}

impl PdfConverter {
    pub fn new(dpi: u32, library_path: Option<String>) -> Self {
        Self { dpi, library_path }
    }

    /// Fails fast at startup when PDFium cannot be loaded.
    pub fn verify(&self) -> Result<(), ConversionError> {
        load_pdfium(self.library_path.as_deref()).map(|_| ())
    }
}

#[async_trait]
impl DocumentConverter for PdfConverter {
    async fn convert(&self, document: &UploadedDocument) -> Result<ConvertedDocument, ConversionError> {
        let bytes = document.bytes.clone();
        let dpi = self.dpi;
        let library_path = self.library_path.clone();

        let (image_bytes, extracted_text) = tokio::task::spawn_blocking(move || {
            let image = render_first_page(&bytes, dpi, library_path.as_deref())?;
            let text = pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| ConversionError::TextExtraction(e.to_string()))?;
            Ok::<_, ConversionError>((image, text))
        })
        .await
        .map_err(|e| ConversionError::Task(e.to_string()))??;

        debug!(
            "Converted {}: {} byte preview, {} chars of text",
            document.file_name,
            image_bytes.len(),
            extracted_text.len()
        );

        Ok(ConvertedDocument {
            image_name: preview_image_name(&document.file_name),
            image_bytes: Bytes::from(image_bytes),
            extracted_text,
        })
    }
}

fn load_pdfium(library_path: Option<&str>) -> Result<Pdfium, ConversionError> {
    let bindings = match library_path {
        Some(path) => Pdfium::bind_to_library(path)
            .map_err(|e| ConversionError::Library(format!("{path}: {e}")))?,
        None => Pdfium::bind_to_system_library().map_err(|e| {
            ConversionError::Library(format!(
                "not found on the system library path, set PDFIUM_DYNAMIC_LIB_PATH: {e}"
            ))
        })?,
    };
    Ok(Pdfium::new(bindings))
}

fn render_first_page(
    pdf_bytes: &[u8],
    dpi: u32,
    library_path: Option<&str>,
) -> Result<Vec<u8>, ConversionError> {
    let pdfium = load_pdfium(library_path)?;
    let document = pdfium
        .load_pdf_from_byte_slice(pdf_bytes, None)
        .map_err(|e| ConversionError::Load(e.to_string()))?;

    let pages = document.pages();
    let page = pages.get(0).map_err(|_| ConversionError::Render {
        page: 1,
        reason: "document has no pages".to_string(),
    })?;

    let (width, height) = render_dimensions(page.width().value, page.height().value, dpi);
    let config = PdfRenderConfig::new()
        .set_target_width(width as i32)
        .set_maximum_height(height as i32);

    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| ConversionError::Render {
            page: 1,
            reason: e.to_string(),
        })?;

    let mut cursor = Cursor::new(Vec::new());
    bitmap
        .as_image()
        .write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| ConversionError::Encode(e.to_string()))?;

    Ok(cursor.into_inner())
}

/// Pixel size for a page of the given point size, long edge capped at `MAX_DIMENSION_PX`.
fn render_dimensions(width_points: f32, height_points: f32, dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let raw_w = (width_points * scale).max(1.0);
    let raw_h = (height_points * scale).max(1.0);

    let longest = raw_w.max(raw_h);
    if longest <= MAX_DIMENSION_PX as f32 {
        return (raw_w as u32, raw_h as u32);
    }

    warn!(
        "Page 1 is {}x{}px at {} dpi, capping to {}px",
        raw_w as u32, raw_h as u32, dpi, MAX_DIMENSION_PX
    );
    let ratio = MAX_DIMENSION_PX as f32 / longest;
    let shorter = |side: f32| ((side * ratio) as u32).clamp(1, MAX_DIMENSION_PX);
    if raw_w >= raw_h {
        (MAX_DIMENSION_PX, shorter(raw_h))
    } else {
        (shorter(raw_w), MAX_DIMENSION_PX)
    }
}
