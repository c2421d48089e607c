pub mod prompt;
pub mod provider;

pub use provider::TextGenerator;
