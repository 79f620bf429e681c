//! HTTP request DTOs.
//!
//! Order bodies reuse the application DTOs; this module holds the
//! query-string types.

use serde::Deserialize;

/// Query string of `GET /v1/orders/undispatched`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UndispatchedQuery {
    /// Maximum number of orders returned.
    #[serde(default)]
    pub limit: Option<usize>,
}
