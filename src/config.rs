// src/config.rs
use crate::models::ProductCategory;
use anyhow::Context;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub max_payload_bytes: usize,
    pub max_image_dimension: u32,
    pub batch_default_product: ProductCategory,
    pub catalog_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8004,
            request_timeout: Duration::from_secs(30),
            max_payload_bytes: 20 * 1024 * 1024,
            max_image_dimension: 4096,
            batch_default_product: ProductCategory::Apple,
            catalog_path: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Missing keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let timeout_secs = parse_or("AGROVISION_REQUEST_TIMEOUT_SECS", &lookup, 30u64)?;
        if timeout_secs == 0 {
            anyhow::bail!("AGROVISION_REQUEST_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Self {
            host: lookup("AGROVISION_HOST").unwrap_or(defaults.host),
            port: parse_or("AGROVISION_PORT", &lookup, defaults.port)?,
            request_timeout: Duration::from_secs(timeout_secs),
            max_payload_bytes: parse_or(
                "AGROVISION_MAX_PAYLOAD_BYTES",
                &lookup,
                defaults.max_payload_bytes,
            )?,
            max_image_dimension: parse_or(
                "AGROVISION_MAX_IMAGE_DIMENSION",
                &lookup,
                defaults.max_image_dimension,
            )?,
            batch_default_product: lookup("AGROVISION_BATCH_DEFAULT_PRODUCT")
                .map(|name| ProductCategory::from_name(&name))
                .unwrap_or(defaults.batch_default_product),
            catalog_path: lookup("AGROVISION_CATALOG_PATH").map(PathBuf::from),
        })
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
