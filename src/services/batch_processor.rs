// src/services/batch_processor.rs
use crate::errors::AnalysisError;
use crate::models::*;
use crate::services::quality_analyzer::QualityAnalyzer;
use rand::RngCore;
use std::sync::Arc;
use uuid::Uuid;

/// One uploaded image. Items without a category use the batch default.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub image_data: Vec<u8>,
    pub product_type: Option<ProductCategory>,
}

impl BatchItem {
    pub fn new(image_data: Vec<u8>) -> Self {
        Self {
            image_data,
            product_type: None,
        }
    }
}

pub struct BatchProcessor {
    analyzer: Arc<QualityAnalyzer>,
    default_product: ProductCategory,
}

impl BatchProcessor {
    pub fn new(analyzer: Arc<QualityAnalyzer>, default_product: ProductCategory) -> Self {
        Self {
            analyzer,
            default_product,
        }
    }

    pub fn default_product(&self) -> &ProductCategory {
        &self.default_product
    }

    /// Analyzes every item in order. The first failing item aborts the batch.
    pub fn process(&self, items: Vec<BatchItem>) -> Result<BatchResult, AnalysisError> {
        let mut rng = rand::rng();
        self.process_with_rng(items, &mut rng)
    }

    pub fn process_with_rng(
        &self,
        items: Vec<BatchItem>,
        rng: &mut dyn RngCore,
    ) -> Result<BatchResult, AnalysisError> {
        if items.is_empty() {
            return Err(AnalysisError::Validation(
                "Batch contains no images".to_string(),
            ));
        }

        let batch_id = format!("batch_{}", Uuid::new_v4());
        let total = items.len();
        let mut results = Vec::with_capacity(total);

        for (index, item) in items.into_iter().enumerate() {
            log::info!("Processing image {}/{} of {}", index + 1, total, batch_id);

            let request = AnalysisRequest {
                image_data: item.image_data,
                product_type: item
                    .product_type
                    .unwrap_or_else(|| self.default_product.clone()),
                analysis_id: format!("{}_{}", batch_id, index),
            };

            let result = self.analyzer.analyze_with_rng(&request, rng).map_err(|e| {
                log::error!("Batch {} aborted at image {}: {}", batch_id, index + 1, e);
                e
            })?;
            results.push(result);
        }

        Ok(BatchResult {
            summary: summarize(&results),
            batch_id,
            total_images: total,
            results,
        })
    }
}

pub fn summarize(results: &[AnalysisResult]) -> BatchSummary {
    let total_defects = results.iter().map(|r| r.defects.len()).sum();
    let average_confidence = if results.is_empty() {
        0.0
    } else {
        results.iter().map(|r| r.confidence_score).sum::<f64>() / results.len() as f64
    };
    let processing_time_total = results.iter().map(|r| r.processing_time).sum();

    BatchSummary {
        total_defects,
        average_confidence,
        processing_time_total,
    }
}
