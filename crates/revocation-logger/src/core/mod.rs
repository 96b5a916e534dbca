//! Core logic for the revocation logger

mod engine;
mod error;

pub use engine::Engine;
pub use error::LoggerError;
