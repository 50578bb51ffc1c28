//! Bounty Ledger Server
//!
//! HTTP surface over the ledger. Callers are identified by the
//! `x-caller-address` header.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::auth::{resolve_caller, Address};
use crate::bounty::{Bounty, PayoutReceipt};
use crate::error::{ErrorKind, LedgerError};
use crate::ledger::BountyLedger;

pub struct AppState {
    pub ledger: Arc<BountyLedger>,
    pub started_at: std::time::Instant,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/bounties/:id", get(get_bounty_handler))
        .route("/bounties/:id/fund", post(fund_handler))
        .route("/bounties/:id/work", post(work_handler))
        .route("/bounties/:id/payout", post(payout_handler))
        .route("/bounties/:id/payouts", get(payouts_handler))
        .route("/admins", get(list_admins_handler))
        .route(
            "/admins/:address",
            get(check_admin_handler)
                .put(add_admin_handler)
                .delete(remove_admin_handler),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    MissingCaller,
    /// Request body missing, malformed or of the wrong shape
    BadBody(String),
    Ledger(LedgerError),
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        ApiError::Ledger(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadBody(rejection.body_text())
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::TransferFailed => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::MissingCaller => (
                StatusCode::UNAUTHORIZED,
                json!("unauthenticated"),
                "missing x-caller-address header".to_string(),
            ),
            ApiError::BadBody(message) => (
                StatusCode::BAD_REQUEST,
                json!(ErrorKind::InvalidArgument),
                message,
            ),
            ApiError::Ledger(e) => {
                let kind = e.kind();
                if kind == ErrorKind::Internal {
                    error!("Ledger error: {}", e);
                }
                (status_for(kind), json!(kind), e.to_string())
            }
        };
        (status, Json(json!({ "error": kind, "message": message }))).into_response()
    }
}

fn caller(headers: &HeaderMap) -> Result<Address, ApiError> {
    resolve_caller(headers)?.ok_or(ApiError::MissingCaller)
}

// ============================================================================
// REQUESTS
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct FundRequest {
    #[serde(default)]
    pub deadline: String,
    #[serde(with = "crate::bounty::amount_string")]
    pub value: u128,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub worker: Address,
    pub percentage: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminStatus {
    pub address: Address,
    pub is_admin: bool,
}

// ============================================================================
// HANDLERS
// ============================================================================

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let bounties = state.ledger.count_bounties().ok();
    Json(json!({
        "healthy": bounties.is_some(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
        "bounties": bounties,
        "active_locks": state.ledger.active_locks(),
    }))
}

async fn get_bounty_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Bounty>, ApiError> {
    Ok(Json(state.ledger.get_bounty_by_id(&id)?))
}

async fn fund_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<FundRequest>, JsonRejection>,
) -> Result<Json<Bounty>, ApiError> {
    let caller = caller(&headers)?;
    let Json(request) = body?;
    let bounty = state
        .ledger
        .fund_bounty(&id, &request.deadline, request.value, &caller)
        .await?;
    Ok(Json(bounty))
}

async fn work_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Bounty>, ApiError> {
    let caller = caller(&headers)?;
    Ok(Json(state.ledger.start_work(&id, &caller).await?))
}

async fn payout_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<PayoutRequest>, JsonRejection>,
) -> Result<Json<PayoutReceipt>, ApiError> {
    let caller = caller(&headers)?;
    let Json(request) = body?;
    let receipt = state
        .ledger
        .payout_bounty(&id, &request.worker, request.percentage, &caller)
        .await?;
    Ok(Json(receipt))
}

async fn payouts_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PayoutReceipt>>, ApiError> {
    Ok(Json(state.ledger.list_payouts(&id)?))
}

async fn list_admins_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Address>>, ApiError> {
    Ok(Json(state.ledger.admins().list_admins()?))
}

async fn check_admin_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<AdminStatus>, ApiError> {
    let address = Address::parse(&address)?;
    let is_admin = state.ledger.admins().is_admin(&address)?;
    Ok(Json(AdminStatus { address, is_admin }))
}

async fn add_admin_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    headers: HeaderMap,
) -> Result<Json<AdminStatus>, ApiError> {
    let caller = caller(&headers)?;
    let address = Address::parse(&address)?;
    state.ledger.admins().add_admin(&address, &caller)?;
    Ok(Json(AdminStatus {
        address,
        is_admin: true,
    }))
}

async fn remove_admin_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    headers: HeaderMap,
) -> Result<Json<AdminStatus>, ApiError> {
    let caller = caller(&headers)?;
    let address = Address::parse(&address)?;
    state.ledger.admins().remove_admin(&address, &caller)?;
    Ok(Json(AdminStatus {
        address,
        is_admin: false,
    }))
}

/// Run the server
pub async fn run_server(host: &str, port: u16, ledger: Arc<BountyLedger>) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        ledger,
        started_at: std::time::Instant::now(),
    });

    let app = create_router(state);
    let addr = format!("{}:{}", host, port);

    info!("Starting Bounty Ledger server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
