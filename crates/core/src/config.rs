//! Pipeline configuration, loaded from TOML.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::PipelineError;

pub const DEFAULT_PRICE_YEAR_TOKEN: &str = "2024-25";
pub const DEFAULT_BUYERS_PER_PAGE: usize = 5;
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Where raw input copies land before processing.
    pub upload_dir: PathBuf,
    /// Default destination for generated workbooks.
    pub processed_dir: PathBuf,
    /// Session store directory.
    pub cache_dir: PathBuf,
    pub max_upload_bytes: u64,
    /// Accepted input extensions, lowercase, no leading dot.
    pub allowed_extensions: Vec<String>,
    /// Fiscal-year token that picks the reference price column.
    pub price_year_token: String,
    pub buyers_per_page: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            processed_dir: PathBuf::from("processed"),
            cache_dir: PathBuf::from("cache"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_extensions: vec!["xlsx".into(), "xls".into(), "csv".into()],
            price_year_token: DEFAULT_PRICE_YEAR_TOKEN.into(),
            buyers_per_page: DEFAULT_BUYERS_PER_PAGE,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml(text: &str) -> Result<Self, PipelineError> {
        let config: Self =
            toml::from_str(text).map_err(|e| PipelineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_upload_bytes == 0 {
            return Err(PipelineError::ConfigValidation(
                "max_upload_bytes must be greater than zero".into(),
            ));
        }
        if self.allowed_extensions.is_empty() {
            return Err(PipelineError::ConfigValidation(
                "allowed_extensions must not be empty".into(),
            ));
        }
        if self.price_year_token.trim().is_empty() {
            return Err(PipelineError::ConfigValidation(
                "price_year_token must not be empty".into(),
            ));
        }
        if self.buyers_per_page == 0 {
            return Err(PipelineError::ConfigValidation(
                "buyers_per_page must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn allows_extension(&self, ext: &str) -> bool {
        let ext = ext.to_lowercase();
        self.allowed_extensions.iter().any(|e| *e == ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config.price_year_token, DEFAULT_PRICE_YEAR_TOKEN);
        assert_eq!(config.buyers_per_page, DEFAULT_BUYERS_PER_PAGE);
        assert!(config.allows_extension("XLSX"));
        assert!(!config.allows_extension("exe"));
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config = PipelineConfig::from_toml(
            "price_year_token = \"2025-26\"\nbuyers_per_page = 10\n",
        )
        .unwrap();
        assert_eq!(config.price_year_token, "2025-26");
        assert_eq!(config.buyers_per_page, 10);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn validation_rejects_zero_limits_and_unknown_keys() {
        assert!(PipelineConfig::from_toml("max_upload_bytes = 0").is_err());
        assert!(PipelineConfig::from_toml("buyers_per_page = 0").is_err());
        assert!(PipelineConfig::from_toml("allowed_extensions = []").is_err());
        assert!(PipelineConfig::from_toml("no_such_key = 1").is_err());
    }
}
