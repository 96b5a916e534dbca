//! Key material: the CA registry and the logger's own identity

mod identity;
mod registry;

pub use identity::LoggerIdentity;
pub use registry::{CaEntity, CaRegistry, SelectionPolicy};
