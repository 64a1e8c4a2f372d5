//! # Motor de Redimensionado
//! src/resize/engine.rs
//!
//! Transformación pura: bytes de entrada + modo → bytes de salida. El formato
//! de salida se deduce de la extensión del archivo (sin importar mayúsculas).

use super::params::ResizeMode;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ResizeError {
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("decode failed: {0}")]
    Decode(#[source] image::ImageError),

    #[error("encode failed: {0}")]
    Encode(#[source] image::ImageError),
}

/// Calcula las dimensiones de salida para un modo dado
///
/// - `Width`/`Height`: la otra dimensión se redondea al entero más cercano
/// - `Scale`: ambas dimensiones se truncan
///
/// Nunca retorna una dimensión menor a 1.
pub fn target_dimensions(width: u32, height: u32, mode: ResizeMode) -> (u32, u32) {
    let (w, h) = (width as u64, height as u64);

    let (new_w, new_h) = match mode {
        ResizeMode::Exact { width, height } => (width as u64, height as u64),
        ResizeMode::Width(target) => {
            let target = target as u64;
            (target, round_div(h * target, w))
        }
        ResizeMode::Height(target) => {
            let target = target as u64;
            (round_div(w * target, h), target)
        }
        ResizeMode::Scale(scale) => {
            let scale = scale.max(1) as u64;
            (w / scale, h / scale)
        }
    };

    (clamp_dimension(new_w), clamp_dimension(new_h))
}

/// División entera redondeando mitades hacia arriba
fn round_div(num: u64, den: u64) -> u64 {
    if den == 0 {
        return 0;
    }
    (2 * num + den) / (2 * den)
}

fn clamp_dimension(value: u64) -> u32 {
    value.clamp(1, u32::MAX as u64) as u32
}

/// Formato de salida según la extensión de `file_name`
pub fn output_format(file_name: &str) -> Result<ImageFormat, ResizeError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    ImageFormat::from_extension(ext)
        .filter(|format| format.reading_enabled() && format.writing_enabled())
        .ok_or_else(|| ResizeError::UnsupportedFormat(file_name.to_string()))
}

/// Convierte al layout de pixeles que acepta el encoder de `format`
///
/// JPEG no tiene canal alfa; GIF, WebP y BMP solo aceptan 8 bits.
fn encodable(img: DynamicImage, format: ImageFormat) -> DynamicImage {
    match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        ImageFormat::Gif => DynamicImage::ImageRgba8(img.to_rgba8()),
        ImageFormat::WebP | ImageFormat::Bmp => {
            if img.color().has_alpha() {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            }
        }
        _ => img,
    }
}

/// Redimensiona una imagen codificada y la re-codifica en el formato de su
/// extensión
pub fn resize_bytes(bytes: &[u8], file_name: &str, mode: ResizeMode) -> Result<Vec<u8>, ResizeError> {
    let format = output_format(file_name)?;
    let img = image::load_from_memory(bytes).map_err(ResizeError::Decode)?;

    let (new_w, new_h) = target_dimensions(img.width(), img.height(), mode);
    let resized = img.resize_exact(new_w, new_h, FilterType::Lanczos3);

    let resized = encodable(resized, format);

    let mut out = Cursor::new(Vec::new());
    resized.write_to(&mut out, format).map_err(ResizeError::Encode)?;
    Ok(out.into_inner())
}
