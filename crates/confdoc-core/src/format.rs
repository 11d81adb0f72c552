//! File formats for documents and rules
//!
//! JSON, YAML and TOML are recognised by file extension.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Errors reading or writing formatted files
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// Extension not recognised
    #[error("unsupported file format: '{}'", .0.display())]
    Unsupported(PathBuf),

    /// IO error during file read or write
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON syntax or shape error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML syntax or shape error
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML syntax or shape error
    #[error("toml error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// Value cannot be written as TOML
    #[error("toml error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl FormatError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Supported file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// `.json`
    Json,
    /// `.yaml`, `.yml`
    Yaml,
    /// `.toml`
    Toml,
}

impl Format {
    /// Supported file extensions (without dot)
    #[must_use]
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Json => &["json"],
            Self::Yaml => &["yaml", "yml"],
            Self::Toml => &["toml"],
        }
    }

    /// Format for a file path, by extension
    #[must_use]
    pub fn for_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        [Self::Json, Self::Yaml, Self::Toml]
            .into_iter()
            .find(|format| format.extensions().contains(&extension.as_str()))
    }

    /// Deserialize content in this format
    ///
    /// # Errors
    /// Returns [`FormatError`] on syntax or shape errors
    pub fn parse<T: DeserializeOwned>(self, content: &str) -> Result<T, FormatError> {
        Ok(match self {
            Self::Json => serde_json::from_str(content)?,
            Self::Yaml => serde_yaml::from_str(content)?,
            Self::Toml => toml::from_str(content)?,
        })
    }

    /// Serialize a value in this format
    ///
    /// # Errors
    /// Returns [`FormatError`] if the value cannot be represented
    pub fn render<T: Serialize>(self, value: &T) -> Result<String, FormatError> {
        Ok(match self {
            Self::Json => serde_json::to_string_pretty(value)?,
            Self::Yaml => serde_yaml::to_string(value)?,
            Self::Toml => toml::to_string_pretty(value)?,
        })
    }
}

/// Read and deserialize a file, picking the format from its extension
///
/// # Errors
/// Returns [`FormatError`] if the extension is unknown, the file cannot be
/// read or its content does not parse
pub fn load<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, FormatError> {
    let path = path.as_ref();
    let format = Format::for_path(path).ok_or_else(|| FormatError::Unsupported(path.into()))?;
    let content = std::fs::read_to_string(path).map_err(|e| FormatError::io_error(path, e))?;
    format.parse(&content)
}

/// Serialize a value and write it to a file in the format of its extension
///
/// # Errors
/// Returns [`FormatError`] if the extension is unknown, the value cannot be
/// rendered or the file cannot be written
pub fn store<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<(), FormatError> {
    let path = path.as_ref();
    let format = Format::for_path(path).ok_or_else(|| FormatError::Unsupported(path.into()))?;
    let mut content = format.render(value)?;
    if !content.ends_with('\n') {
        content.push('\n');
    }
    std::fs::write(path, content).map_err(|e| FormatError::io_error(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn format_by_extension() {
        assert_eq!(Format::for_path(Path::new("a.json")), Some(Format::Json));
        assert_eq!(Format::for_path(Path::new("a.YML")), Some(Format::Yaml));
        assert_eq!(Format::for_path(Path::new("dir/rules.toml")), Some(Format::Toml));
        assert_eq!(Format::for_path(Path::new("a.txt")), None);
        assert_eq!(Format::for_path(Path::new("noext")), None);
    }

    #[test]
    fn parses_each_format_to_the_same_value() {
        let expected = json!({"server": {"port": 80, "hosts": ["a", "b"]}});
        let from_json: Value = Format::Json
            .parse(r#"{"server": {"port": 80, "hosts": ["a", "b"]}}"#)
            .unwrap();
        let from_yaml: Value = Format::Yaml
            .parse("server:\n  port: 80\n  hosts: [a, b]\n")
            .unwrap();
        let from_toml: Value = Format::Toml
            .parse("[server]\nport = 80\nhosts = [\"a\", \"b\"]\n")
            .unwrap();
        assert_eq!(from_json, expected);
        assert_eq!(from_yaml, expected);
        assert_eq!(from_toml, expected);
    }

    #[test]
    fn render_then_parse_yaml() {
        let value = json!({"a": [1, 2], "b": {"c": "d"}});
        let text = Format::Yaml.render(&value).unwrap();
        let back: Value = Format::Yaml.parse(&text).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn load_unknown_extension_fails() {
        let err = load::<Value>("document.ini").unwrap_err();
        assert!(matches!(err, FormatError::Unsupported(_)));
    }
}
