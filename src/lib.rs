#[cfg(feature = "cli")]
pub mod cli;
pub mod classify;
pub mod engine;
pub mod error;
pub mod model;
pub mod output;
pub mod probe;
pub mod targets;
