// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Order Engine - Rust Core Library
//!
//! Accepts trade orders, checks them against account balances and
//! instruments, stores them and hands them to a dispatch queue.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic (aggregates, value objects)
//!   - `shared`: `Amount` exact decimal and the id types
//!   - `order_management`: Order aggregate, status lifecycle, dispatch state
//!   - `reference`: accounts, instruments and balances
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: Interfaces for external systems (`OrderQueuePort`, repositories)
//!   - `use_cases`: `PlaceOrder`, `CancelOrder`, `UpdateOrderStatus`,
//!     `QueryOrders`, `RelayOutbox`
//!   - `services`: balance check, dispatcher, funds reservation
//!   - `dto`: Data transfer objects for API boundaries
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `persistence`: Turso and in-memory repositories
//!   - `messaging`: NATS and in-process queues
//!   - `http`: axum REST API
//!   - `config`: Dependency injection container
//!
//! Cross-cutting: `config` (YAML loading), `resilience` (retry),
//! `observability` (metrics) and `telemetry` (logging, tracing).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// YAML configuration loading and validation.
pub mod config;

/// Prometheus metrics.
pub mod observability;

/// Retry with backoff.
pub mod resilience;

/// Logging and span export setup.
pub mod telemetry;

// =============================================================================
// Re-exports from Clean Architecture
// =============================================================================

// Domain re-exports
pub use domain::order_management::{Order, OrderSide, OrderStatus};
pub use domain::shared::{AccountId, Amount, Asset, InstrumentId, Notional, OrderId, Timestamp};

// Application re-exports
pub use application::dto::{OrderDto, PlaceOrderRequest, UpdateOrderStatusRequest};
pub use application::{EngineError, ErrorKind, RequestContext};
pub use application::use_cases::{
    CancelOrderUseCase, PlaceOrderConfig, PlaceOrderUseCase, QueryOrdersUseCase,
    RelayOutboxUseCase, UpdateOrderStatusUseCase,
};

// Infrastructure re-exports
pub use infrastructure::config::Container;
pub use infrastructure::http::{AppState, create_router};
pub use infrastructure::persistence::{InMemoryOrderRepository, InMemoryReferenceData};
