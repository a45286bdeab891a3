// src/services/defect_sampler.rs
// Stochastic stand-in for a defect detection model.

use crate::catalog::{MAX_DEFECT_CONFIDENCE, ProductCatalog};
use crate::errors::AnalysisError;
use crate::models::{BoundingBox, Defect, PixelBuffer, ProductCategory, Severity};
use rand::seq::IndexedRandom;
use rand::{Rng, RngCore};
use std::sync::Arc;

pub const EDGE_MARGIN: u32 = 50;
pub const MIN_DEFECT_SIDE: u32 = 20;
pub const MAX_DEFECT_SIDE: u32 = 100;
pub const MAX_COLOR_DEFECTS: usize = 5;
pub const MAX_GRAYSCALE_DEFECTS: usize = 2;

/// Anything that can turn a decoded image into a list of defects.
pub trait DefectDetector: Send + Sync {
    fn detect(
        &self,
        buffer: &PixelBuffer,
        category: &ProductCategory,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Defect>, AnalysisError>;

    fn name(&self) -> &str;
}

pub struct DefectSampler {
    catalog: Arc<ProductCatalog>,
}

impl DefectSampler {
    pub fn new(catalog: Arc<ProductCatalog>) -> Self {
        Self { catalog }
    }

    pub fn defect_count<R: Rng + ?Sized>(&self, buffer: &PixelBuffer, rng: &mut R) -> usize {
        if buffer.is_grayscale() {
            rng.random_range(0..=MAX_GRAYSCALE_DEFECTS)
        } else {
            let complexity = (buffer.std_dev() / 10.0).floor();
            if complexity.is_finite() && complexity > 0.0 {
                (complexity as usize).min(MAX_COLOR_DEFECTS)
            } else {
                0
            }
        }
    }

    fn sample_one<R: Rng + ?Sized>(
        &self,
        buffer: &PixelBuffer,
        vocabulary: &[String],
        rng: &mut R,
    ) -> Option<Defect> {
        let defect_type = vocabulary.choose(rng)?.clone();
        let (x, width) = place_span(buffer.width, rng)?;
        let (y, height) = place_span(buffer.height, rng)?;

        let area = width as u64 * height as u64;
        let area_percentage = area as f64 / buffer.pixel_count() as f64 * 100.0;

        let threshold = self.catalog.confidence_threshold(&defect_type);
        let confidence = rng.random_range(threshold..=MAX_DEFECT_CONFIDENCE);
        let severity = classify_severity(area_percentage, &defect_type, &self.catalog);

        Some(Defect {
            description: format!(
                "{} detected at ({}, {}) covering {:.1}% of the image",
                defect_type, x, y, area_percentage
            ),
            defect_type,
            bbox: BoundingBox {
                x,
                y,
                width,
                height,
            },
            area,
            confidence,
            severity,
        })
    }
}

impl DefectDetector for DefectSampler {
    fn detect(
        &self,
        buffer: &PixelBuffer,
        category: &ProductCategory,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Defect>, AnalysisError> {
        let vocabulary = self.catalog.defect_types(category);
        let count = self.defect_count(buffer, rng);

        if last_start(buffer.width).is_none() || last_start(buffer.height).is_none() {
            log::debug!(
                "{}x{} image leaves no room for a defect box inside the {}px margin",
                buffer.width,
                buffer.height,
                EDGE_MARGIN
            );
            return Ok(Vec::new());
        }

        Ok((0..count)
            .filter_map(|_| self.sample_one(buffer, vocabulary, rng))
            .collect())
    }

    fn name(&self) -> &str {
        "stochastic-sampler"
    }
}

/// Furthest start that still leaves room for a minimum box before the far margin.
fn last_start(extent: u32) -> Option<u32> {
    extent
        .checked_sub(EDGE_MARGIN + MIN_DEFECT_SIDE)
        .filter(|&last| last >= EDGE_MARGIN)
}

/// Start and length of a box side inside `[EDGE_MARGIN, extent - EDGE_MARGIN]`.
fn place_span<R: Rng + ?Sized>(extent: u32, rng: &mut R) -> Option<(u32, u32)> {
    let last = last_start(extent)?;
    let start = rng.random_range(EDGE_MARGIN..=last);
    let room = extent - EDGE_MARGIN - start;
    let length = rng.random_range(MIN_DEFECT_SIDE..=room.min(MAX_DEFECT_SIDE));
    Some((start, length))
}

pub fn classify_severity(
    area_percentage: f64,
    defect_type: &str,
    catalog: &ProductCatalog,
) -> Severity {
    if area_percentage > 5.0 || catalog.is_severe_type(defect_type) {
        Severity::Severe
    } else if area_percentage > 2.0 {
        Severity::Moderate
    } else {
        Severity::Minor
    }
}
