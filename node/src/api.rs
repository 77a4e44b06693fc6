//! # REST API
//!
//! Builds the axum router that exposes the service over HTTP. All endpoints
//! share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path         | Description                                |
//! |--------|--------------|--------------------------------------------|
//! | GET    | `/health`    | Liveness probe                             |
//! | POST   | `/claim`     | Transfer reward tokens to a receiver       |
//! | POST   | `/register`  | Register a student at the script UTxO      |
//! | GET    | `/addresses` | Script address of every blueprint validator |
//!
//! Boundary rejections answer 400. A pipeline that ran and failed answers
//! 500 with the diagnostic text in `error`.

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use ayllu_protocol::{PipelineOutcome, RegistrationRequest, TransactionService, TransferRequest};

use crate::metrics::SharedMetrics;
use crate::validation::{self, Rejection};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Service running the ledger pipelines.
    pub service: Arc<dyn TransactionService>,
    /// Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
    /// Largest token amount a single claim may request.
    pub max_claim_amount: u64,
    pub started_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/claim", post(claim_handler))
        .route("/register", post(register_handler))
        .route("/addresses", get(addresses_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Body of a successful pipeline run.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub started_at: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn reject(state: &AppState, rejection: Rejection) -> Response {
    state.metrics.rejected_requests_total.inc();
    tracing::info!(%rejection, "request rejected");
    error_response(StatusCode::BAD_REQUEST, rejection.to_string())
}

fn outcome_response(outcome: PipelineOutcome) -> Response {
    if outcome.succeeded {
        (
            StatusCode::OK,
            Json(MessageResponse {
                message: outcome.message,
            }),
        )
            .into_response()
    } else {
        error_response(StatusCode::INTERNAL_SERVER_ERROR, outcome.message)
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 while the process is serving.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".into(),
        version: state.version.clone(),
        started_at: state.started_at.to_rfc3339(),
    })
}

/// `POST /claim` — transfer `amount` reward tokens to `receiverAddress`.
async fn claim_handler(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Response {
    if let Err(rejection) = validation::check_claim(&request, state.max_claim_amount) {
        return reject(&state, rejection);
    }

    state.metrics.transfers_total.inc();
    let outcome = {
        let _timer = state.metrics.start_run("transfer");
        state.service.transfer_tokens(request).await
    };
    if !outcome.succeeded {
        state.metrics.transfer_failures_total.inc();
        tracing::warn!(error = %outcome.message, "token transfer failed");
    }
    outcome_response(outcome)
}

/// `POST /register` — spend the script UTxO to register a student.
async fn register_handler(
    State(state): State<AppState>,
    Json(request): Json<RegistrationRequest>,
) -> Response {
    if let Err(rejection) = validation::check_registration(&request) {
        return reject(&state, rejection);
    }

    state.metrics.registrations_total.inc();
    let outcome = {
        let _timer = state.metrics.start_run("registration");
        state.service.register_student(request).await
    };
    if !outcome.succeeded {
        state.metrics.registration_failures_total.inc();
        tracing::warn!(error = %outcome.message, "student registration failed");
    }
    outcome_response(outcome)
}

/// `GET /addresses` — validator title to script address.
async fn addresses_handler(State(state): State<AppState>) -> Response {
    match state.service.validator_addresses().await {
        Ok(addresses) => (StatusCode::OK, Json(addresses)).into_response(),
        Err(failure) => {
            tracing::warn!(error = %failure, "address derivation failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, failure.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::tests::testnet_address;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use ayllu_contracts::RegistrationAction;
    use ayllu_protocol::error::PipelineError;
    use ayllu_protocol::pipeline::Stage;
    use ayllu_protocol::StageFailure;
    use http_body_util::BodyExt;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use tower::ServiceExt;

    /// In-memory service that records requests and answers with canned
    /// outcomes.
    #[derive(Default)]
    struct FakeService {
        fail_with: Option<String>,
        transfers: Mutex<Vec<TransferRequest>>,
        registrations: Mutex<Vec<RegistrationRequest>>,
    }

    #[async_trait]
    impl TransactionService for FakeService {
        async fn transfer_tokens(&self, request: TransferRequest) -> PipelineOutcome {
            self.transfers.lock().push(request);
            match &self.fail_with {
                Some(message) => PipelineOutcome::failure(message.clone()),
                None => PipelineOutcome::success("transaction submitted"),
            }
        }

        async fn register_student(&self, request: RegistrationRequest) -> PipelineOutcome {
            self.registrations.lock().push(request);
            match &self.fail_with {
                Some(message) => PipelineOutcome::failure(message.clone()),
                None => PipelineOutcome::success("student registered and transaction submitted"),
            }
        }

        async fn validator_addresses(&self) -> Result<BTreeMap<String, String>, StageFailure> {
            match &self.fail_with {
                Some(_) => Err(StageFailure::new(
                    Stage::ResolveValidator,
                    PipelineError::BlueprintLookup {
                        title: "registration".into(),
                    },
                )),
                None => Ok(BTreeMap::from([(
                    "registration.spend".to_string(),
                    "addr_test1wregistration".to_string(),
                )])),
            }
        }
    }

    fn test_app_state(service: Arc<FakeService>) -> AppState {
        AppState {
            version: "0.1.0-test".into(),
            service,
            metrics: Arc::new(crate::metrics::NodeMetrics::new()),
            max_claim_amount: 10,
            started_at: Utc::now(),
        }
    }

    fn registration_body() -> serde_json::Value {
        serde_json::json!({
            "studentAddress": testnet_address(),
            "studentPKH": "ab".repeat(28),
            "txHash": "cd".repeat(32),
            "outputIndex": 1
        })
    }

    /// Sends a GET request and returns the (status, body_bytes).
    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    /// Sends a POST request with JSON body and returns (status, body_bytes).
    async fn post_json(
        router: &Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    // -- 1. Health endpoint --------------------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state(Arc::default()));
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let resp: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.status, "ok");
        assert_eq!(resp.version, "0.1.0-test");
    }

    // -- 2. Claim success passes the request through -------------------------

    #[tokio::test]
    async fn claim_success_returns_message() {
        let service = Arc::new(FakeService::default());
        let state = test_app_state(Arc::clone(&service));
        let metrics = Arc::clone(&state.metrics);
        let router = create_router(state);

        let (status, body) = post_json(
            &router,
            "/claim",
            serde_json::json!({ "receiverAddress": testnet_address(), "amount": 3 }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let resp: MessageResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.message, "transaction submitted");

        let transfers = service.transfers.lock();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].amount, 3);
        assert_eq!(transfers[0].receiver_address, testnet_address());
        assert_eq!(metrics.transfers_total.get(), 1);
        assert_eq!(metrics.transfer_failures_total.get(), 0);
        assert_eq!(metrics.pipelines_in_flight.get(), 0);
    }

    // -- 3. Claim amount outside 1..=max is a 400 ----------------------------

    #[tokio::test]
    async fn claim_amount_out_of_range_is_rejected() {
        let service = Arc::new(FakeService::default());
        let router = create_router(test_app_state(Arc::clone(&service)));

        for amount in [0u64, 11] {
            let (status, body) = post_json(
                &router,
                "/claim",
                serde_json::json!({ "receiverAddress": testnet_address(), "amount": amount }),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
            assert!(err.error.contains("between 1 and 10"));
        }
        assert!(service.transfers.lock().is_empty());
    }

    // -- 4. Claim with a malformed address is a 400 --------------------------

    #[tokio::test]
    async fn claim_malformed_address_is_rejected() {
        let service = Arc::new(FakeService::default());
        let state = test_app_state(Arc::clone(&service));
        let metrics = Arc::clone(&state.metrics);
        let router = create_router(state);

        let (status, body) = post_json(
            &router,
            "/claim",
            serde_json::json!({ "receiverAddress": "addr_test1short", "amount": 2 }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.error, "malformed receiver address");
        assert!(service.transfers.lock().is_empty());
        assert_eq!(metrics.rejected_requests_total.get(), 1);
        assert_eq!(metrics.transfers_total.get(), 0);
    }

    // -- 5. Pipeline failure is a 500 with the diagnostic verbatim -----------

    #[tokio::test]
    async fn claim_pipeline_failure_returns_500() {
        let service = Arc::new(FakeService {
            fail_with: Some("select failed: insufficient tokens: required 5, available 2".into()),
            ..FakeService::default()
        });
        let state = test_app_state(service);
        let metrics = Arc::clone(&state.metrics);
        let router = create_router(state);

        let (status, body) = post_json(
            &router,
            "/claim",
            serde_json::json!({ "receiverAddress": testnet_address(), "amount": 5 }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            err.error,
            "select failed: insufficient tokens: required 5, available 2"
        );
        assert_eq!(metrics.transfer_failures_total.get(), 1);
    }

    // -- 6. Register success and default action ------------------------------

    #[tokio::test]
    async fn register_success_returns_message() {
        let service = Arc::new(FakeService::default());
        let router = create_router(test_app_state(Arc::clone(&service)));

        let (status, body) = post_json(&router, "/register", registration_body()).await;

        assert_eq!(status, StatusCode::OK);
        let resp: MessageResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.message, "student registered and transaction submitted");

        let registrations = service.registrations.lock();
        assert_eq!(registrations.len(), 1);
        assert_eq!(registrations[0].output_index, 1);
        assert_eq!(registrations[0].action, RegistrationAction::Register);
    }

    // -- 7. Register with blank fields is a 400 ------------------------------

    #[tokio::test]
    async fn register_blank_field_is_rejected() {
        let service = Arc::new(FakeService::default());
        let router = create_router(test_app_state(Arc::clone(&service)));

        let mut body = registration_body();
        body["studentPKH"] = serde_json::json!("  ");
        let (status, body) = post_json(&router, "/register", body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.error, "incomplete registration data");
        assert!(service.registrations.lock().is_empty());
    }

    // -- 8. Register pipeline failure is a 500 -------------------------------

    #[tokio::test]
    async fn register_pipeline_failure_returns_500() {
        let service = Arc::new(FakeService {
            fail_with: Some("submit failed: submit command exited with status 1".into()),
            ..FakeService::default()
        });
        let state = test_app_state(service);
        let metrics = Arc::clone(&state.metrics);
        let router = create_router(state);

        let (status, _) = post_json(&router, "/register", registration_body()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(metrics.registrations_total.get(), 1);
        assert_eq!(metrics.registration_failures_total.get(), 1);
    }

    // -- 9. Addresses map and failure ----------------------------------------

    #[tokio::test]
    async fn addresses_returns_title_map() {
        let router = create_router(test_app_state(Arc::default()));
        let (status, body) = get(&router, "/addresses").await;

        assert_eq!(status, StatusCode::OK);
        let map: BTreeMap<String, String> = serde_json::from_slice(&body).unwrap();
        assert_eq!(map["registration.spend"], "addr_test1wregistration");
    }

    #[tokio::test]
    async fn addresses_failure_returns_500() {
        let service = Arc::new(FakeService {
            fail_with: Some("boom".into()),
            ..FakeService::default()
        });
        let router = create_router(test_app_state(service));
        let (status, body) = get(&router, "/addresses").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            err.error,
            "resolve-validator failed: validator not found in blueprint: registration"
        );
    }

    // -- 10. Unparseable body never reaches the service ----------------------

    #[tokio::test]
    async fn claim_with_wrong_shape_is_client_error() {
        let service = Arc::new(FakeService::default());
        let router = create_router(test_app_state(Arc::clone(&service)));

        let (status, _) = post_json(
            &router,
            "/claim",
            serde_json::json!({ "receiverAddress": testnet_address(), "amount": "three" }),
        )
        .await;

        assert!(status.is_client_error());
        assert!(service.transfers.lock().is_empty());
    }
}
