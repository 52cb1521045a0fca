pub mod cli;
pub mod inspect;
pub mod model;
pub mod report;

// Re-export common types for convenience
pub use inspect::*;
pub use model::*;
