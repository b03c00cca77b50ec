pub mod application;
pub mod cli;
pub mod config;
pub mod driver;
pub mod reducer;
pub mod tickets;
pub mod types;
pub mod worker;
pub mod workflows;

// Re-export main types
pub use types::*;

// Re-export init API for convenience
pub use application::{initialize, Application, InitBuilder, InitOptions};
