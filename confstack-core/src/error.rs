use thiserror::Error;

use crate::schema::ValidationError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("schema provider '{0}' is not registered")]
    AdapterNotRegistered(String),

    #[error("loader '{loader}' failed: {source}")]
    Loader {
        loader: String,
        #[source]
        source: Box<Error>,
    },

    #[error("source error: {0}")]
    Source(String),

    #[error(transparent)]
    Validation(ValidationError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    TomlParse(#[from] toml::de::Error),
}
