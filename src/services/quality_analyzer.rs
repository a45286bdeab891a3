// src/services/quality_analyzer.rs
use crate::catalog::ProductCatalog;
use crate::errors::AnalysisError;
use crate::models::*;
use crate::services::color_profiler::{ColorOutcome, ColorProfiler};
use crate::services::defect_sampler::{DefectDetector, DefectSampler};
use crate::services::image_decoder::ImageDecoder;
use crate::services::size_estimator::SizeEstimator;
use crate::services::texture_profiler::TextureProfiler;
use rand::RngCore;
use std::sync::Arc;
use std::time::Instant;

pub const BASELINE_CONFIDENCE: f64 = 0.85;

/// Runs the full single-image pipeline and assembles the report.
pub struct QualityAnalyzer {
    decoder: ImageDecoder,
    size_estimator: SizeEstimator,
    color_profiler: ColorProfiler,
    texture_profiler: TextureProfiler,
    detector: Box<dyn DefectDetector>,
}

impl QualityAnalyzer {
    pub fn new(catalog: Arc<ProductCatalog>, max_image_dimension: u32) -> Self {
        Self {
            decoder: ImageDecoder::new(max_image_dimension),
            size_estimator: SizeEstimator::new(catalog.clone()),
            color_profiler: ColorProfiler::new(),
            texture_profiler: TextureProfiler::new(),
            detector: Box::new(DefectSampler::new(catalog)),
        }
    }

    /// Swaps the defect detector, e.g. for a real inference backend.
    pub fn with_detector(mut self, detector: Box<dyn DefectDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn decoder(&self) -> &ImageDecoder {
        &self.decoder
    }

    pub fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        self.analyze_since(request, Instant::now())
    }

    /// Like `analyze`, but `processing_time` counts from `started`, so work done before
    /// the call (payload decoding) is included.
    pub fn analyze_since(
        &self,
        request: &AnalysisRequest,
        started: Instant,
    ) -> Result<AnalysisResult, AnalysisError> {
        let mut rng = rand::rng();
        self.run(request, started, &mut rng)
    }

    pub fn analyze_with_rng(
        &self,
        request: &AnalysisRequest,
        rng: &mut dyn RngCore,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.run(request, Instant::now(), rng)
    }

    fn run(
        &self,
        request: &AnalysisRequest,
        start: Instant,
        rng: &mut dyn RngCore,
    ) -> Result<AnalysisResult, AnalysisError> {
        log::info!(
            "Starting analysis {} for {}",
            request.analysis_id,
            request.product_type
        );

        let buffer = self.decoder.decode_image(&request.image_data)?;

        let defects = self
            .detector
            .detect(&buffer, &request.product_type, rng)
            .map_err(|e| match e {
                AnalysisError::Pipeline(_) => e,
                other => AnalysisError::Pipeline(format!(
                    "Defect detector {} failed: {}",
                    self.detector.name(),
                    other
                )),
            })?;
        let size_measurements = self
            .size_estimator
            .estimate(&buffer, &request.product_type, rng);
        let color_analysis = match self.color_profiler.profile(&buffer) {
            ColorOutcome::Measured(profile) => profile,
            ColorOutcome::Degraded { profile, cause } => {
                log::warn!(
                    "Analysis {} continues with fallback color profile: {}",
                    request.analysis_id,
                    cause
                );
                profile
            }
        };
        let texture_analysis = self.texture_profiler.profile(&buffer);

        let confidence_score = overall_confidence(&defects);
        let processing_time = start.elapsed().as_secs_f64() * 1000.0;

        log::info!(
            "Analysis {} completed: {} defects found in {:.1} ms",
            request.analysis_id,
            defects.len(),
            processing_time
        );

        Ok(AnalysisResult {
            analysis_id: request.analysis_id.clone(),
            defects,
            total_area: size_measurements.total_area_pixels,
            image_dimensions: ImageDimensions {
                width: buffer.width,
                height: buffer.height,
            },
            size_measurements,
            color_analysis,
            texture_analysis,
            confidence_score,
            processing_time,
            product_type: request.product_type.clone(),
            analysis_timestamp: chrono::Utc::now(),
        })
    }
}

/// Baseline confidence, averaged with the mean defect confidence when defects exist.
pub fn overall_confidence(defects: &[Defect]) -> f64 {
    if defects.is_empty() {
        return BASELINE_CONFIDENCE;
    }
    let mean = defects.iter().map(|d| d.confidence).sum::<f64>() / defects.len() as f64;
    (BASELINE_CONFIDENCE + mean) / 2.0
}
