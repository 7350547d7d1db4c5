//! Generic loader for YAML configuration files.

use std::{fs, path::PathBuf};

use config::{Config, File, FileFormat};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// A generic loader that deserializes a whole YAML file into `T`.
pub struct ConfigLoader {
    path: PathBuf,
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The file could not be read.
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// The file contents could not be parsed or deserialized.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] config::ConfigError),

    /// The file does not have a YAML extension.
    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),
}

impl ConfigLoader {
    /// Creates a new `ConfigLoader` for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads and deserializes the YAML file.
    pub fn load<T: DeserializeOwned>(&self) -> Result<T, LoaderError> {
        if !self.is_yaml_file() {
            return Err(LoaderError::UnsupportedFormat(self.path.display().to_string()));
        }

        let contents = fs::read_to_string(&self.path)?;
        let config = Config::builder()
            .add_source(File::from_str(&contents, FileFormat::Yaml))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    fn is_yaml_file(&self) -> bool {
        matches!(self.path.extension().and_then(|ext| ext.to_str()), Some("yaml") | Some("yml"))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde::Deserialize;
    use tempfile::TempDir;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct TestFile {
        items: Vec<TestItem>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct TestItem {
        name: String,
        value: i32,
    }

    fn create_test_file(dir: &TempDir, filename: &str, content: &str) -> PathBuf {
        let path = dir.path().join(filename);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", content).unwrap();
        path
    }

    #[test]
    fn test_load_success() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(
            &dir,
            "items.yaml",
            "items:\n  - name: one\n    value: 1\n  - name: two\n    value: 2",
        );

        let loaded: TestFile = ConfigLoader::new(path).load().unwrap();
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.items[0], TestItem { name: "one".into(), value: 1 });
    }

    #[test]
    fn test_load_rejects_non_yaml_extension() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(&dir, "items.json", "{}");

        let result = ConfigLoader::new(path).load::<TestFile>();
        assert!(matches!(result, Err(LoaderError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = ConfigLoader::new(PathBuf::from("does-not-exist.yaml")).load::<TestFile>();
        assert!(matches!(result, Err(LoaderError::Io(_))));
    }
}
