//! Text serialization formats selected by file extension.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum SerdeFormatError {
    #[error("Failed to get file extension for '{0}'")]
    MissingFileExtension(PathBuf),
    #[error("Unsupported file extension for file: {0}")]
    UnsupportedFileExtension(PathBuf),
    #[error("Failed to read '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML serialization failed")]
    Yaml(#[from] serde_yml::Error),
    #[error("JSON serialization failed")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SerdeFormatError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerdeFormat {
    Yaml,
    Json,
}

impl SerdeFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|os_str| os_str.to_str())
            .ok_or_else(|| SerdeFormatError::MissingFileExtension(path.to_path_buf()))?;

        if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") {
            Ok(Self::Yaml)
        } else if ext.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else {
            Err(SerdeFormatError::UnsupportedFileExtension(
                path.to_path_buf(),
            ))
        }
    }
}

pub fn serialize<T: Serialize>(value: &T, format: SerdeFormat) -> Result<String> {
    match format {
        SerdeFormat::Yaml => Ok(serde_yml::to_string(value)?),
        SerdeFormat::Json => Ok(serde_json::to_string_pretty(value)?),
    }
}

pub fn deserialize<T: DeserializeOwned>(text: &str, format: SerdeFormat) -> Result<T> {
    match format {
        SerdeFormat::Yaml => Ok(serde_yml::from_str(text)?),
        SerdeFormat::Json => Ok(serde_json::from_str(text)?),
    }
}

/// Reads and deserializes `path`, picking the format from its extension.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = SerdeFormat::from_path(path)?;
    let text = std::fs::read_to_string(path).map_err(|source| SerdeFormatError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    deserialize(&text, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
        ratio: Option<f64>,
    }

    fn sample() -> Sample {
        Sample {
            name: "sample".to_string(),
            count: 3,
            ratio: Some(0.25),
        }
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            SerdeFormat::from_path(Path::new("a/b.yaml")).unwrap(),
            SerdeFormat::Yaml
        );
        assert_eq!(
            SerdeFormat::from_path(Path::new("b.YML")).unwrap(),
            SerdeFormat::Yaml
        );
        assert_eq!(
            SerdeFormat::from_path(Path::new("c.json")).unwrap(),
            SerdeFormat::Json
        );
    }

    #[test]
    fn test_format_from_path_errors() {
        assert!(matches!(
            SerdeFormat::from_path(Path::new("noext")),
            Err(SerdeFormatError::MissingFileExtension(_))
        ));
        let err = SerdeFormat::from_path(Path::new("conf.toml")).unwrap_err();
        assert!(err.to_string().contains("conf.toml"));
    }

    #[test]
    fn test_yaml_and_json_roundtrip() {
        for format in [SerdeFormat::Yaml, SerdeFormat::Json] {
            let text = serialize(&sample(), format).unwrap();
            let back: Sample = deserialize(&text, format).unwrap();
            assert_eq!(back, sample(), "format {format:?}");
        }
    }

    #[test]
    fn test_deserialize_reports_yaml_error() {
        let result: Result<Sample> = deserialize("name: [unclosed", SerdeFormat::Yaml);
        assert!(matches!(result, Err(SerdeFormatError::Yaml(_))));
    }

    #[test]
    fn test_load_file_missing() {
        let result: Result<Sample> = load_file(Path::new("/definitely/not/here.json"));
        match result {
            Err(SerdeFormatError::Io { path, .. }) => {
                assert_eq!(path, PathBuf::from("/definitely/not/here.json"))
            }
            other => panic!("expected Io error, got {other:?}"),
        }
    }
}
