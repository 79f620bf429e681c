//! Adapter wiring.

mod container;

pub use container::{
    ConfiguredState, Container, ContainerError, DispatchQueue, OrderStore, ReferenceStore,
};
