// src/services/size_estimator.rs
use crate::catalog::ProductCatalog;
use crate::models::{PixelBuffer, ProductCategory, SizeMeasurement};
use rand::Rng;
use std::sync::Arc;

/// Fraction of the frame the product is assumed to cover. No segmentation is done,
/// so the ratio is drawn per measurement.
pub const MIN_OCCUPANCY: f64 = 0.6;
pub const MAX_OCCUPANCY: f64 = 0.8;

pub struct SizeEstimator {
    catalog: Arc<ProductCatalog>,
}

impl SizeEstimator {
    pub fn new(catalog: Arc<ProductCatalog>) -> Self {
        Self { catalog }
    }

    pub fn estimate<R: Rng + ?Sized>(
        &self,
        buffer: &PixelBuffer,
        category: &ProductCategory,
        rng: &mut R,
    ) -> SizeMeasurement {
        let occupancy = rng.random_range(MIN_OCCUPANCY..=MAX_OCCUPANCY);
        let diameter_pixels = buffer.width.min(buffer.height) as f64 * occupancy;

        SizeMeasurement {
            diameter_pixels,
            diameter_mm: diameter_pixels * self.catalog.mm_per_pixel(category),
            width_pixels: buffer.width,
            height_pixels: buffer.height,
            total_area_pixels: buffer.pixel_count(),
            product_area_ratio: occupancy,
        }
    }
}
