pub mod defaults;
pub mod paths;
pub mod service;
pub mod validation;

pub use defaults::{EngineConfig, EnhancerConfig, LexicalConfig, RetrievalConfig, SqlConfig};
pub use paths::AppPaths;
pub use service::ConfigService;
