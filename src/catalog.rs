// src/catalog.rs
use crate::models::ProductCategory;
use anyhow::{Context, bail};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::path::Path;

pub const GENERIC_DEFECT: &str = "Generic Defect";
pub const DEFAULT_MM_PER_PIXEL: f64 = 0.15;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.6;
pub const MAX_DEFECT_CONFIDENCE: f64 = 0.95;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSpec {
    pub category: ProductCategory,
    pub defect_types: Vec<String>,
    pub mm_per_pixel: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCatalog {
    products: Vec<ProductSpec>,
    defect_thresholds: HashMap<String, f64>,
    severe_defect_types: Vec<String>,
    #[serde(skip, default = "generic_vocabulary")]
    generic_vocabulary: Vec<String>,
}

fn generic_vocabulary() -> Vec<String> {
    vec![GENERIC_DEFECT.to_string()]
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ProductCatalog {
    fn default() -> Self {
        let products = vec![
            ProductSpec {
                category: ProductCategory::Apple,
                defect_types: names(&["Black Spot", "Bruise", "Rot", "Cut", "Stain"]),
                mm_per_pixel: 0.15,
            },
            ProductSpec {
                category: ProductCategory::Orange,
                defect_types: names(&["Stain", "Damaged Skin", "Rot", "Bruise"]),
                mm_per_pixel: 0.18,
            },
            ProductSpec {
                category: ProductCategory::Tomato,
                defect_types: names(&["Crack", "Bruise", "Rot", "Stain"]),
                mm_per_pixel: 0.12,
            },
            ProductSpec {
                category: ProductCategory::Potato,
                defect_types: names(&["Deep Eye", "Greening", "Mechanical Damage", "Stain"]),
                mm_per_pixel: 0.20,
            },
        ];

        let defect_thresholds = [
            ("Black Spot", 0.7),
            ("Bruise", 0.75),
            ("Rot", 0.8),
            ("Cut", 0.85),
            ("Stain", 0.7),
            ("Damaged Skin", 0.75),
            ("Crack", 0.8),
            ("Deep Eye", 0.7),
            ("Greening", 0.85),
            ("Mechanical Damage", 0.8),
            (GENERIC_DEFECT, DEFAULT_CONFIDENCE_THRESHOLD),
        ]
        .into_iter()
        .map(|(name, threshold)| (name.to_string(), threshold))
        .collect();

        Self {
            products,
            defect_thresholds,
            severe_defect_types: names(&["Rot", "Severe Damage"]),
            generic_vocabulary: generic_vocabulary(),
        }
    }
}

impl ProductCatalog {
    /// Loads a catalog from a JSON file, or falls back to the built-in tables.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read product catalog {}", path.display()))?;
        let catalog: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse product catalog {}", path.display()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.products.is_empty() {
            bail!("Product catalog lists no products");
        }
        for product in &self.products {
            if product.defect_types.is_empty() {
                bail!("Product {} has an empty defect vocabulary", product.category);
            }
            if !(product.mm_per_pixel.is_finite() && product.mm_per_pixel > 0.0) {
                bail!(
                    "Product {} has an invalid mm_per_pixel factor {}",
                    product.category,
                    product.mm_per_pixel
                );
            }
        }
        for (name, threshold) in &self.defect_thresholds {
            if !(0.0..=MAX_DEFECT_CONFIDENCE).contains(threshold) {
                bail!(
                    "Confidence threshold for {} must lie in [0, {}], got {}",
                    name,
                    MAX_DEFECT_CONFIDENCE,
                    threshold
                );
            }
        }
        Ok(())
    }

    fn product(&self, category: &ProductCategory) -> Option<&ProductSpec> {
        self.products.iter().find(|p| &p.category == category)
    }

    /// Defect vocabulary for a category; unknown categories get the generic one.
    pub fn defect_types(&self, category: &ProductCategory) -> &[String] {
        self.product(category)
            .map(|p| p.defect_types.as_slice())
            .unwrap_or(self.generic_vocabulary.as_slice())
    }

    pub fn mm_per_pixel(&self, category: &ProductCategory) -> f64 {
        self.product(category)
            .map(|p| p.mm_per_pixel)
            .unwrap_or(DEFAULT_MM_PER_PIXEL)
    }

    pub fn confidence_threshold(&self, defect_type: &str) -> f64 {
        self.defect_thresholds
            .get(defect_type)
            .copied()
            .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD)
    }

    pub fn is_severe_type(&self, defect_type: &str) -> bool {
        self.severe_defect_types.iter().any(|t| t == defect_type)
    }

    pub fn supported_products(&self) -> Vec<&str> {
        self.products.iter().map(|p| p.category.as_str()).collect()
    }

    pub fn defect_categories(&self) -> DefectCategories<'_> {
        DefectCategories(
            self.products
                .iter()
                .map(|p| (p.category.as_str(), p.defect_types.as_slice()))
                .collect(),
        )
    }
}

/// Defect vocabulary per product, serialized as a JSON object in catalog order.
#[derive(Debug)]
pub struct DefectCategories<'a>(Vec<(&'a str, &'a [String])>);

impl Serialize for DefectCategories<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().copied())
    }
}
