//! HTTP Controller (Driver Adapter)
//!
//! Axum-based REST API that delegates to application use cases.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::application::context::RequestContext;
use crate::application::dto::{OrderDto, PlaceOrderRequest, UpdateOrderStatusRequest};
use crate::application::errors::EngineError;
use crate::application::ports::{
    AccountRepository, BalanceRepository, InstrumentRepository, OrderQueuePort, OrderRepository,
};
use crate::application::use_cases::{
    CancelOrderUseCase, DEFAULT_UNDISPATCHED_LIMIT, PlaceOrderUseCase, QueryOrdersUseCase,
    UpdateOrderStatusUseCase,
};
use crate::domain::shared::{InstrumentId, OrderId};

use super::error::ApiError;
use super::request::UndispatchedQuery;
use super::response::{HealthResponse, PlaceOrderResponse};

/// Application state shared across handlers.
pub struct AppState<A, I, B, O, Q>
where
    A: AccountRepository,
    I: InstrumentRepository,
    B: BalanceRepository,
    O: OrderRepository + 'static,
    Q: OrderQueuePort + 'static,
{
    /// Use case for placing orders.
    pub place_order: Arc<PlaceOrderUseCase<A, I, B, O, Q>>,
    /// Use case for cancelling orders.
    pub cancel_order: Arc<CancelOrderUseCase<O>>,
    /// Use case for execution status updates.
    pub update_status: Arc<UpdateOrderStatusUseCase<O>>,
    /// Use case for lookups and listings.
    pub query_orders: Arc<QueryOrdersUseCase<O>>,
    /// Deadline applied to each placement before its order is stored.
    pub request_timeout: Duration,
    /// Application version.
    pub version: String,
}

impl<A, I, B, O, Q> Clone for AppState<A, I, B, O, Q>
where
    A: AccountRepository,
    I: InstrumentRepository,
    B: BalanceRepository,
    O: OrderRepository + 'static,
    Q: OrderQueuePort + 'static,
{
    fn clone(&self) -> Self {
        Self {
            place_order: Arc::clone(&self.place_order),
            cancel_order: Arc::clone(&self.cancel_order),
            update_status: Arc::clone(&self.update_status),
            query_orders: Arc::clone(&self.query_orders),
            request_timeout: self.request_timeout,
            version: self.version.clone(),
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<A, I, B, O, Q>(state: AppState<A, I, B, O, Q>) -> Router
where
    A: AccountRepository + 'static,
    I: InstrumentRepository + 'static,
    B: BalanceRepository + 'static,
    O: OrderRepository + 'static,
    Q: OrderQueuePort + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/orders", post(place_order).get(list_orders))
        .route("/v1/orders/undispatched", get(list_undispatched))
        .route(
            "/v1/orders/instrument/{instrument_id}",
            get(list_by_instrument),
        )
        .route("/v1/orders/{id}", get(get_order).put(update_order_status))
        .route("/v1/orders/{id}/cancel", post(cancel_order))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check<A, I, B, O, Q>(
    State(state): State<AppState<A, I, B, O, Q>>,
) -> impl IntoResponse
where
    A: AccountRepository,
    I: InstrumentRepository,
    B: BalanceRepository,
    O: OrderRepository + 'static,
    Q: OrderQueuePort + 'static,
{
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
    })
}

/// Place one order.
///
/// 201 with the id when dispatched; 202 with `dispatch: PENDING` when the
/// order is stored but still waiting for the queue.
async fn place_order<A, I, B, O, Q>(
    State(state): State<AppState<A, I, B, O, Q>>,
    payload: Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> Result<Response, ApiError>
where
    A: AccountRepository,
    I: InstrumentRepository,
    B: BalanceRepository,
    O: OrderRepository + 'static,
    Q: OrderQueuePort + 'static,
{
    let Json(request) = payload?;
    let ctx = RequestContext::with_timeout(state.request_timeout);

    match state.place_order.execute(&ctx, request).await {
        Ok(order_id) => Ok((
            StatusCode::CREATED,
            Json(PlaceOrderResponse {
                id: order_id.to_string(),
                dispatch: None,
            }),
        )
            .into_response()),
        Err(EngineError::DispatchFailed { order_id, .. }) => Ok((
            StatusCode::ACCEPTED,
            Json(PlaceOrderResponse {
                id: order_id.to_string(),
                dispatch: Some("PENDING".to_string()),
            }),
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}

async fn list_orders<A, I, B, O, Q>(
    State(state): State<AppState<A, I, B, O, Q>>,
) -> Result<Json<Vec<OrderDto>>, ApiError>
where
    A: AccountRepository,
    I: InstrumentRepository,
    B: BalanceRepository,
    O: OrderRepository + 'static,
    Q: OrderQueuePort + 'static,
{
    Ok(Json(state.query_orders.list_all().await?))
}

async fn get_order<A, I, B, O, Q>(
    State(state): State<AppState<A, I, B, O, Q>>,
    Path(id): Path<String>,
) -> Result<Json<OrderDto>, ApiError>
where
    A: AccountRepository,
    I: InstrumentRepository,
    B: BalanceRepository,
    O: OrderRepository + 'static,
    Q: OrderQueuePort + 'static,
{
    Ok(Json(state.query_orders.find_by_id(&OrderId::new(id)).await?))
}

async fn list_by_instrument<A, I, B, O, Q>(
    State(state): State<AppState<A, I, B, O, Q>>,
    Path(instrument_id): Path<String>,
) -> Result<Json<Vec<OrderDto>>, ApiError>
where
    A: AccountRepository,
    I: InstrumentRepository,
    B: BalanceRepository,
    O: OrderRepository + 'static,
    Q: OrderQueuePort + 'static,
{
    let orders = state
        .query_orders
        .list_by_instrument(&InstrumentId::new(instrument_id))
        .await?;
    Ok(Json(orders))
}

async fn list_undispatched<A, I, B, O, Q>(
    State(state): State<AppState<A, I, B, O, Q>>,
    Query(query): Query<UndispatchedQuery>,
) -> Result<Json<Vec<OrderDto>>, ApiError>
where
    A: AccountRepository,
    I: InstrumentRepository,
    B: BalanceRepository,
    O: OrderRepository + 'static,
    Q: OrderQueuePort + 'static,
{
    let limit = query.limit.unwrap_or(DEFAULT_UNDISPATCHED_LIMIT);
    Ok(Json(state.query_orders.list_undispatched(limit).await?))
}

async fn update_order_status<A, I, B, O, Q>(
    State(state): State<AppState<A, I, B, O, Q>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateOrderStatusRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError>
where
    A: AccountRepository,
    I: InstrumentRepository,
    B: BalanceRepository,
    O: OrderRepository + 'static,
    Q: OrderQueuePort + 'static,
{
    let Json(request) = payload?;
    state
        .update_status
        .execute(&OrderId::new(id), &request)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn cancel_order<A, I, B, O, Q>(
    State(state): State<AppState<A, I, B, O, Q>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
    A: AccountRepository,
    I: InstrumentRepository,
    B: BalanceRepository,
    O: OrderRepository + 'static,
    Q: OrderQueuePort + 'static,
{
    state.cancel_order.execute(&OrderId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::PlaceOrderConfig;
    use crate::domain::reference::{Account, Instrument};
    use crate::domain::shared::{AccountId, Amount, Asset};
    use crate::infrastructure::messaging::FlakyOrderQueue;
    use crate::infrastructure::persistence::{InMemoryOrderRepository, InMemoryReferenceData};
    use crate::resilience::RetryPolicy;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    type TestState = AppState<
        InMemoryReferenceData,
        InMemoryReferenceData,
        InMemoryReferenceData,
        InMemoryOrderRepository,
        FlakyOrderQueue,
    >;

    fn create_test_state(queue: FlakyOrderQueue) -> TestState {
        let data = Arc::new(InMemoryReferenceData::new());
        data.add_account(Account {
            id: AccountId::new("A1"),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
        });
        data.add_instrument(Instrument {
            id: InstrumentId::new("I1"),
            base_asset: Asset::new("BTC"),
            quote_asset: Asset::new("USD"),
        });
        data.set_balance(AccountId::new("A1"), Asset::new("USD"), Amount::from(1000u32));

        let orders = Arc::new(InMemoryOrderRepository::new());
        let config = PlaceOrderConfig {
            dispatch_retry: RetryPolicy::once(),
            ..PlaceOrderConfig::default()
        };

        AppState {
            place_order: Arc::new(PlaceOrderUseCase::new(
                Arc::clone(&data),
                Arc::clone(&data),
                data,
                Arc::clone(&orders),
                Arc::new(queue),
                config,
            )),
            cancel_order: Arc::new(CancelOrderUseCase::new(Arc::clone(&orders))),
            update_status: Arc::new(UpdateOrderStatusUseCase::new(Arc::clone(&orders))),
            query_orders: Arc::new(QueryOrdersUseCase::new(orders)),
            request_timeout: Duration::from_secs(5),
            version: "1.0.0-test".to_string(),
        }
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_check_returns_ok() {
        let app = create_router(create_test_state(FlakyOrderQueue::default()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn place_order_returns_created() {
        let app = create_router(create_test_state(FlakyOrderQueue::default()));
        let body = serde_json::json!({
            "account_id": "A1",
            "instrument_id": "I1",
            "type": "BUY",
            "price": "100",
            "quantity": 5
        });

        let response = app.oneshot(post_json("/v1/orders", &body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body: PlaceOrderResponse = json_body(response).await;
        assert!(!body.id.is_empty());
        assert!(body.dispatch.is_none());
    }

    #[tokio::test]
    async fn insufficient_funds_is_unprocessable() {
        let app = create_router(create_test_state(FlakyOrderQueue::default()));
        let body = serde_json::json!({
            "account_id": "A1",
            "instrument_id": "I1",
            "type": "BUY",
            "price": "300",
            "quantity": "5"
        });

        let response = app.oneshot(post_json("/v1/orders", &body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: crate::infrastructure::http::ErrorResponse = json_body(response).await;
        assert_eq!(body.error, "INSUFFICIENT_FUNDS");
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let app = create_router(create_test_state(FlakyOrderQueue::default()));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/orders")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn dispatch_failure_is_accepted_with_pending_flag() {
        let state = create_test_state(FlakyOrderQueue::always_failing());
        let app = create_router(state.clone());
        let body = serde_json::json!({
            "account_id": "A1",
            "instrument_id": "I1",
            "type": "BUY",
            "price": "100",
            "quantity": "5"
        });

        let response = app
            .clone()
            .oneshot(post_json("/v1/orders", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let placed: PlaceOrderResponse = json_body(response).await;
        assert_eq!(placed.dispatch.as_deref(), Some("PENDING"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/orders/undispatched")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let pending: Vec<OrderDto> = json_body(response).await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, placed.id);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let app = create_router(create_test_state(FlakyOrderQueue::default()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/orders/does-not-exist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
