//! Error types for the cogbridge protocol layer.

mod engine;
mod protocol;
mod transport;

pub use engine::*;
pub use protocol::*;
pub use transport::*;
