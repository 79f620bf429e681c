//! Infrastructure Layer
//!
//! This module contains all adapters (implementations) for the ports defined
//! in the application layer. Following hexagonal architecture:
//!
//! - **Driven Adapters (Outbound)**: Implement ports for external systems
//!   - `persistence/`: Turso and in-memory storage
//!   - `messaging/`: NATS and in-process dispatch queues
//!
//! - **Driver Adapters (Inbound)**: Expose application to external world
//!   - `http/`: REST API controllers
//!
//! - `config/`: wires adapters selected by configuration into use cases

pub mod config;
pub mod http;
pub mod messaging;
pub mod persistence;
