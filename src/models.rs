// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Product being inspected. Unlisted names are carried through as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProductCategory {
    Apple,
    Orange,
    Tomato,
    Potato,
    Other(String),
}

impl ProductCategory {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "apple" => ProductCategory::Apple,
            "orange" => ProductCategory::Orange,
            "tomato" => ProductCategory::Tomato,
            "potato" => ProductCategory::Potato,
            _ => ProductCategory::Other(name.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProductCategory::Apple => "Apple",
            ProductCategory::Orange => "Orange",
            ProductCategory::Tomato => "Tomato",
            ProductCategory::Potato => "Potato",
            ProductCategory::Other(name) => name,
        }
    }
}

impl From<String> for ProductCategory {
    fn from(name: String) -> Self {
        ProductCategory::from_name(&name)
    }
}

impl From<ProductCategory> for String {
    fn from(category: ProductCategory) -> Self {
        category.as_str().to_string()
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /analyze-image`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeImageBody {
    pub image_data: String,
    pub product_type: String,
    pub analysis_id: String,
}

/// One unit of work for the analyzer. `image_data` holds encoded image bytes
/// (PNG, JPEG, ...), already stripped of any transport encoding.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image_data: Vec<u8>,
    pub product_type: ProductCategory,
    pub analysis_id: String,
}

/// Decoded image with interleaved 8-bit samples. Color buffers are always RGB.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn is_grayscale(&self) -> bool {
        self.channels == 1
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }

    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&v| v as f64).sum::<f64>() / self.data.len() as f64
    }

    /// Population variance over every sample of every channel.
    pub fn variance(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        self.data
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / self.data.len() as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defect {
    #[serde(rename = "type")]
    pub defect_type: String,
    pub bbox: BoundingBox,
    pub area: u64,
    pub confidence: f64,
    pub severity: Severity,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeMeasurement {
    pub diameter_pixels: f64,
    pub diameter_mm: f64,
    pub width_pixels: u32,
    pub height_pixels: u32,
    pub total_area_pixels: u64,
    pub product_area_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaturityIndicator {
    Ripe,
    Unripe,
    Variable,
    Undetermined,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorProfile {
    pub dominant_hue: u32,
    pub average_saturation: f64,
    pub average_value: f64,
    pub color_uniformity: f64,
    pub color_variance: f64,
    pub maturity_indicator: MaturityIndicator,
    pub is_grayscale: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureClass {
    Smooth,
    Medium,
    Rough,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureProfile {
    pub texture_type: TextureClass,
    pub smoothness_score: f64,
    pub laplacian_variance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis_id: String,
    pub defects: Vec<Defect>,
    pub size_measurements: SizeMeasurement,
    pub color_analysis: ColorProfile,
    pub texture_analysis: TextureProfile,
    pub confidence_score: f64,
    /// Milliseconds.
    pub processing_time: f64,
    pub total_area: u64,
    pub image_dimensions: ImageDimensions,
    pub product_type: ProductCategory,
    pub analysis_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_defects: usize,
    pub average_confidence: f64,
    pub processing_time_total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: String,
    pub total_images: usize,
    pub results: Vec<AnalysisResult>,
    pub summary: BatchSummary,
}
