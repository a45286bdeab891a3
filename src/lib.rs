// src/lib.rs
use std::sync::Arc;

pub mod catalog;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
#[cfg(test)]
mod test_support;

use crate::catalog::ProductCatalog;
use crate::config::Settings;
use crate::services::{BatchProcessor, QualityAnalyzer};

#[derive(Clone)]
pub struct AppState {
    settings: Arc<Settings>,
    catalog: Arc<ProductCatalog>,
    analyzer: Arc<QualityAnalyzer>,
    batch_processor: Arc<BatchProcessor>,
}

impl AppState {
    pub fn new(settings: Arc<Settings>, catalog: Arc<ProductCatalog>) -> Self {
        let analyzer = Arc::new(QualityAnalyzer::new(
            catalog.clone(),
            settings.max_image_dimension,
        ));
        let batch_processor = Arc::new(BatchProcessor::new(
            analyzer.clone(),
            settings.batch_default_product.clone(),
        ));

        Self {
            settings,
            catalog,
            analyzer,
            batch_processor,
        }
    }
}
