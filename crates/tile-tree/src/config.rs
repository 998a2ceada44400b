//! Tiler configuration, loadable from TOML or RON.

use std::path::Path;

use octree_locator::LocatorConfig;
use serde::{Deserialize, Serialize};

use crate::ContentKind;

/// Loading and saving of serde configs, with the format picked by the file
/// extension.
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from a `.toml` or `.ron` file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = Format::of(path)?;
        let contents = std::fs::read_to_string(path)?;
        format.parse(&contents)
    }

    /// Save configuration to a `.toml` or `.ron` file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = Format::of(path)?.render(self)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The file parsed but holds unusable values.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Ron,
}

impl Format {
    fn of(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(Format::Toml),
            Some("ron") => Ok(Format::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    fn parse<T: for<'de> Deserialize<'de>>(self, contents: &str) -> Result<T, ConfigError> {
        match self {
            Format::Toml => toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Format::Ron => ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    fn render<T: Serialize + ?Sized>(self, value: &T) -> Result<String, ConfigError> {
        match self {
            Format::Toml => {
                toml::to_string_pretty(value).map_err(|e| ConfigError::Serialize(e.to_string()))
            }
            Format::Ron => ron::ser::to_string_pretty(value, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string())),
        }
    }
}

/// Settings for building a [`TileTree`](crate::TileTree).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TilerConfig {
    pub content: ContentKind,

    /// Content file extension without the dot; the content kind's default
    /// when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,

    pub locator: LocatorConfig,
}

impl Config for TilerConfig {}

impl TilerConfig {
    pub fn new(content: ContentKind) -> Self {
        Self {
            content,
            ..Self::default()
        }
    }

    /// Content file extension, falling back to the content kind's default.
    pub fn extension(&self) -> String {
        match &self.extension {
            Some(ext) => ext.clone(),
            None => self.content.policy().default_extension().to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.locator
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if let Some(ext) = &self.extension {
            if ext.is_empty() || ext.starts_with('.') || ext.contains(['/', '\\']) {
                return Err(ConfigError::Invalid(format!("bad content extension {ext:?}")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("tile-tree-{}-{name}", std::process::id()))
    }

    fn sample() -> TilerConfig {
        TilerConfig {
            content: ContentKind::Points,
            extension: Some("bin".to_string()),
            locator: LocatorConfig {
                max_points_per_leaf: 64,
                build_cubic_octree: true,
                ..LocatorConfig::default()
            },
        }
    }

    #[test]
    fn extension_defaults_to_content_kind() {
        assert_eq!(TilerConfig::new(ContentKind::Mesh).extension(), "glb");
        assert_eq!(sample().extension(), "bin");
    }

    #[test]
    fn toml_round_trip() {
        let path = temp_path("config.toml");
        sample().save_to_file(&path).unwrap();
        let loaded = TilerConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn ron_round_trip() {
        let path = temp_path("config.ron");
        sample().save_to_file(&path).unwrap();
        let loaded = TilerConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: TilerConfig = toml::from_str(
            r#"
            content = "mesh"

            [locator]
            max_points_per_leaf = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.content, ContentKind::Mesh);
        assert_eq!(config.extension, None);
        assert_eq!(config.locator.max_points_per_leaf, 16);
        assert!(config.locator.pad_root_bounds);
    }

    #[test]
    fn unsupported_extension() {
        let err = TilerConfig::default().save_to_file("tiler.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = sample();
        assert!(config.validate().is_ok());

        config.extension = Some(".pnts".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.extension = None;
        config.locator.max_points_per_leaf = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
