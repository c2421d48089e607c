use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load engine configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to build lexical index: {0}")]
    Index(#[source] anyhow::Error),

    #[error("Failed to initialize SQL gateway: {0}")]
    Sql(#[source] anyhow::Error),
}
