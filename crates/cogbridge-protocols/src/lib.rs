//! # cogbridge Protocols
//!
//! Shared vocabulary between the reasoning engine, the kernel event layer
//! and the client connections. Contains only types and interface
//! definitions - no dispatch or scheduling logic.
//!
//! ## Core Types
//!
//! - [`EventId`] - Closed set of kernel events, grouped by [`EventCategory`]
//! - [`EventMessage`] - Event name plus ordered string parameters
//! - [`Connection`] - Blocking round-trip transport to one client
//! - [`Engine`] - Stepping primitive and agent list of the reasoning engine
//! - [`EventSourceControl`] - Engine hooks toggled on first/last subscriber

pub mod connection;
pub mod engine;
pub mod error;
pub mod event;
pub mod message;

pub use connection::{Connection, ConnectionId};
pub use engine::{AgentId, Engine, EventSourceControl, NoopSourceControl, StepReport, StepUnit};
pub use error::{EngineError, ProtocolError, TransportError};
pub use event::{
    AgentEvent, EventCategory, EventId, Phase, ProductionEvent, RhsEvent, RunEvent, StringEvent,
    SystemEvent, UpdateEvent,
};
pub use message::{params, EventMessage};
