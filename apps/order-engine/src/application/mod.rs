//! Application Layer
//!
//! The application layer orchestrates domain logic through use cases.
//! It defines:
//!
//! - **Ports**: Interfaces for interacting with external systems
//! - **Use Cases**: Placement, cancellation, status updates, queries and
//!   the outbox relay
//! - **DTOs**: Data transfer objects for API boundaries
//! - **Errors**: The [`EngineError`] taxonomy every use case returns

pub mod context;
pub mod dto;
pub mod errors;
pub mod ports;
pub mod services;
pub mod use_cases;
pub mod validation;

pub use context::RequestContext;
pub use dto::*;
pub use errors::{EngineError, ErrorKind, Resource};
pub use ports::*;
pub use use_cases::*;
