//! Persistence Adapters
//!
//! Implementations of the order and reference-data repository traits.

pub mod in_memory;
pub mod turso;

pub use in_memory::{InMemoryOrderRepository, InMemoryReferenceData};
pub use self::turso::{PersistenceError, TursoOrderRepository, TursoReferenceRepository, TursoStore};
