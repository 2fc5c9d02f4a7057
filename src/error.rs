//! Error enum
use std::path::PathBuf;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Serde(serde_json::Error),
    Yaml(serde_yaml::Error),
    Glob(glob::GlobError),
    GlobPattern(glob::PatternError),
    /// Errors coming from the tokenizer library.
    Tokenizer(String),
    /// Errors coming from the phonemization backend.
    Phonemizer(String),
    /// Invalid configuration value.
    Config(String),
    /// A dataset directory whose manifest does not match its content.
    Manifest(PathBuf, String),
    /// No shard could be loaded from the shard root.
    NoShards(PathBuf),
    Custom(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::Serde(e) => write!(f, "json error: {}", e),
            Error::Yaml(e) => write!(f, "yaml error: {}", e),
            Error::Glob(e) => write!(f, "glob error: {}", e),
            Error::GlobPattern(e) => write!(f, "glob pattern error: {}", e),
            Error::Tokenizer(e) => write!(f, "tokenizer error: {}", e),
            Error::Phonemizer(e) => write!(f, "phonemizer error: {}", e),
            Error::Config(e) => write!(f, "configuration error: {}", e),
            Error::Manifest(path, e) => write!(f, "bad manifest in {:?}: {}", path, e),
            Error::NoShards(root) => write!(
                f,
                "no dataset shards were loaded from {:?}. Please ensure that shards are processed.",
                root
            ),
            Error::Custom(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::Serde(e)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Error {
        Error::Yaml(e)
    }
}

impl From<glob::GlobError> for Error {
    fn from(e: glob::GlobError) -> Error {
        Error::Glob(e)
    }
}

impl From<glob::PatternError> for Error {
    fn from(e: glob::PatternError) -> Error {
        Error::GlobPattern(e)
    }
}

impl From<String> for Error {
    fn from(s: String) -> Error {
        Error::Custom(s)
    }
}
