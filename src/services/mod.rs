// src/services/mod.rs
pub mod batch_processor;
pub mod color_profiler;
pub mod defect_sampler;
pub mod image_decoder;
pub mod quality_analyzer;
pub mod size_estimator;
pub mod texture_profiler;

pub use batch_processor::{BatchItem, BatchProcessor};
pub use defect_sampler::{DefectDetector, DefectSampler};
pub use image_decoder::ImageDecoder;
pub use quality_analyzer::QualityAnalyzer;
