//! Generator configuration, loadable from TOML

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub template_path: PathBuf,
    pub output_dir: PathBuf,
    /// Photos per grid row
    pub photo_columns: usize,
    /// Physical width of each grid photo
    pub photo_width_mm: f64,
    /// Physical width of each appendix page image
    pub appendix_width_mm: f64,
    pub object_photos_empty_message: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from("templates/report_template.docx"),
            output_dir: PathBuf::from("generated"),
            photo_columns: 2,
            photo_width_mm: 80.0,
            appendix_width_mm: 160.0,
            object_photos_empty_message: "Фотографии объекта оценки не загружены".to_string(),
        }
    }
}

impl GeneratorConfig {
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text, path)?;
        info!("Loaded generator config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.photo_columns == 0 {
            return Err(ConfigError::Invalid("photo_columns must be at least 1".into()));
        }
        for (name, width) in [
            ("photo_width_mm", self.photo_width_mm),
            ("appendix_width_mm", self.appendix_width_mm),
        ] {
            if !(width.is_finite() && width > 0.0) {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }
        Ok(())
    }
}
