//! API request handlers

pub mod publish;
pub mod relay;
pub mod submit;

pub use publish::get_log_srd_with_rev_data;
pub use relay::revoke_and_produce_srd;
pub use submit::post_log_srd_with_rev_data;

use crate::core::Engine;
use crate::publisher::Publisher;
use crate::relay::CaRelay;

/// Shared state behind every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: Engine,
    pub publisher: Publisher,
    pub relay: CaRelay,
}
