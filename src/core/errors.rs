use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("index build failed: {0}")]
    IndexBuild(String),
    #[error("collaborator failed: {0}")]
    Collaborator(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("timed out after {0}s")]
    Timeout(u64),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        EngineError::Internal(err.to_string())
    }

    pub fn collaborator<E: std::fmt::Display>(err: E) -> Self {
        EngineError::Collaborator(err.to_string())
    }

    pub fn database<E: std::fmt::Display>(err: E) -> Self {
        EngineError::Database(err.to_string())
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Database(err.to_string())
    }
}
