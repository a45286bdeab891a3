// src/services/image_decoder.rs
use crate::errors::AnalysisError;
use crate::models::PixelBuffer;
use base64::{Engine as _, engine::general_purpose};
use image::{ColorType, DynamicImage, GenericImageView};

pub struct ImageDecoder {
    max_dimension: u32,
}

impl ImageDecoder {
    pub fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }

    /// Strips an optional `data:<mime>;base64,` prefix and decodes the rest.
    /// Line breaks from MIME-wrapped payloads are ignored.
    pub fn decode_base64_payload(&self, payload: &str) -> Result<Vec<u8>, AnalysisError> {
        let encoded = match payload.split_once(',') {
            Some((_, rest)) => rest,
            None => payload,
        };
        let compact: String = encoded
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();

        general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| AnalysisError::Decode(format!("Invalid base64 payload: {}", e)))
    }

    pub fn decode_image(&self, data: &[u8]) -> Result<PixelBuffer, AnalysisError> {
        let img = image::load_from_memory(data)
            .map_err(|e| AnalysisError::Decode(format!("Invalid image format: {}", e)))?;

        let (width, height) = img.dimensions();

        if width == 0 || height == 0 {
            return Err(AnalysisError::Decode(
                "Image has zero-sized dimensions".to_string(),
            ));
        }

        if width > self.max_dimension || height > self.max_dimension {
            return Err(AnalysisError::Decode(format!(
                "Image dimensions exceed {}x{}",
                self.max_dimension, self.max_dimension
            )));
        }

        Ok(normalize(img, width, height))
    }
}

/// Luma images keep one channel; everything else is flattened to 8-bit RGB.
fn normalize(img: DynamicImage, width: u32, height: u32) -> PixelBuffer {
    let grayscale = matches!(
        img.color(),
        ColorType::L8 | ColorType::L16 | ColorType::La8 | ColorType::La16
    );

    if grayscale {
        PixelBuffer {
            width,
            height,
            channels: 1,
            data: img.to_luma8().into_raw(),
        }
    } else {
        PixelBuffer {
            width,
            height,
            channels: 3,
            data: img.to_rgb8().into_raw(),
        }
    }
}
