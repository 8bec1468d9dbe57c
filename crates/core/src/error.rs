use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A required request field is absent or blank. Carries the wire name.
    #[error("Missing required field: {0}")]
    MissingField(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
