//! REST API shell for the payments session
//!
//! Exposes the current screen as a view model and accepts user actions.
//! The analysis call runs on a spawned task and writes back through the
//! session lock.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::analysis::TransactionAnalyzer;
use crate::error::AppError;
use crate::models::Step;
use crate::sequencer::{phase_at, TERMINAL_PHASE};
use crate::session::{AnalysisRequest, Effect, Intent, Session};
use crate::views::{render, RenderContext, ScreenView, TransactionForm};

/// =============================
/// Request Models
/// =============================

/// Amount as typed; numbers are accepted for convenience
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(f64),
}

impl AmountInput {
    fn into_text(self) -> String {
        match self {
            AmountInput::Text(text) => text,
            AmountInput::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UserAction {
    Send,
    ViewHistory,
    Submit { amount: AmountInput, recipient: String },
    Cancel,
    Back,
    Confirm,
    Done,
}

#[derive(Debug, Deserialize)]
pub struct ReceiptRequest {
    pub amount: f64,
    pub recipient: String,
}

#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    pub image: Option<String>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Failure that still carries the re-rendered screen
    pub fn rejected<T: Serialize>(message: String, data: T) -> Self {
        Self {
            data: serde_json::to_value(data).ok(),
            ..Self::error(message)
        }
    }
}

/// =============================
/// API State
/// =============================

/// Everything one user session owns, behind a single lock
pub struct Shell {
    session: Session,
    form: TransactionForm,
    status_started: Option<Instant>,
}

impl Shell {
    fn status_elapsed(&self) -> std::time::Duration {
        self.status_started
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    /// Done is offered only once the settlement sequence reaches its last phase
    fn settlement_finished(&self) -> bool {
        self.session.step() == Step::Status && phase_at(self.status_elapsed()) == TERMINAL_PHASE
    }

    fn reject(&self, e: AppError) -> (StatusCode, Json<ApiResponse>) {
        (
            rejection_status(&e),
            Json(ApiResponse::rejected(e.to_string(), self.render())),
        )
    }

    fn render(&self) -> ScreenView {
        let ctx = RenderContext {
            form: Some(&self.form),
            status_elapsed: self.status_elapsed(),
        };
        render(&self.session, &ctx)
    }
}

#[derive(Clone)]
pub struct ApiState {
    shell: Arc<Mutex<Shell>>,
    analyzer: Arc<dyn TransactionAnalyzer>,
}

impl ApiState {
    pub fn new(session: Session, analyzer: Arc<dyn TransactionAnalyzer>) -> Self {
        Self {
            shell: Arc::new(Mutex::new(Shell {
                session,
                form: TransactionForm::default(),
                status_started: None,
            })),
            analyzer,
        }
    }
}

fn rejection_status(error: &AppError) -> StatusCode {
    match error {
        AppError::InvalidTransition { .. } | AppError::AnalysisPending => StatusCode::CONFLICT,
        AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Run the analyzer off the request path and attach its outcome
fn spawn_analysis(state: ApiState, request: AnalysisRequest) {
    tokio::spawn(async move {
        let analysis = state
            .analyzer
            .analyze(request.amount, &request.recipient, request.balance)
            .await;

        let mut shell = state.shell.lock().await;
        shell.session.resolve_analysis(request.review_id, analysis);
    });
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Screen Endpoints
/// =============================

async fn current_screen(State(state): State<ApiState>) -> Json<ApiResponse> {
    let shell = state.shell.lock().await;
    Json(ApiResponse::success(shell.render()))
}

async fn apply_action(
    State(state): State<ApiState>,
    Json(action): Json<UserAction>,
) -> (StatusCode, Json<ApiResponse>) {
    let mut guard = state.shell.lock().await;
    let shell = &mut *guard;

    let intent = match action {
        UserAction::Send => Intent::Send,
        UserAction::ViewHistory => Intent::ViewHistory,
        UserAction::Cancel => Intent::Cancel,
        UserAction::Back => Intent::Back,
        UserAction::Confirm => Intent::Confirm,
        UserAction::Done => {
            let from = shell.session.step();
            if from == Step::Status && !shell.settlement_finished() {
                info!(elapsed_ms = shell.status_elapsed().as_millis() as u64, "Settlement still running");
                return shell.reject(AppError::InvalidTransition { from, action: "done" });
            }
            Intent::Done
        }
        UserAction::Submit { amount, recipient } => {
            let from = shell.session.step();
            if from != Step::Input {
                return shell.reject(AppError::InvalidTransition { from, action: "submit" });
            }

            shell.form.amount = amount.into_text();
            shell.form.recipient = recipient;

            match shell.form.submit(shell.session.balance()) {
                Ok(intent) => intent,
                Err(e) => {
                    info!(error = %e, "Transfer form rejected");
                    return shell.reject(e.into());
                }
            }
        }
    };

    let previous = shell.session.step();

    match shell.session.apply(intent) {
        Ok(effect) => {
            match effect {
                Effect::Analyze(request) => spawn_analysis(state.clone(), request),
                Effect::Settled(_) => shell.status_started = Some(Instant::now()),
                Effect::None => {}
            }

            // Form buffers belong to the input screen and die with it
            if previous == Step::Input && shell.session.step() != Step::Input {
                shell.form = TransactionForm::default();
            }
            if shell.session.step() != Step::Status {
                shell.status_started = None;
            }

            (StatusCode::OK, Json(ApiResponse::success(shell.render())))
        }
        Err(e) => {
            warn!(error = %e, step = %previous, "Action rejected");
            shell.reject(e)
        }
    }
}

async fn list_transactions(State(state): State<ApiState>) -> Json<ApiResponse> {
    let shell = state.shell.lock().await;
    Json(ApiResponse::success(shell.session.ledger()))
}

async fn receipt_image(
    State(state): State<ApiState>,
    Json(req): Json<ReceiptRequest>,
) -> Json<ApiResponse> {
    let image = state
        .analyzer
        .generate_receipt_image(req.amount, &req.recipient)
        .await
        .map(|image| image.to_data_uri());

    Json(ApiResponse::success(ReceiptResponse { image }))
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/screen", get(current_screen))
        .route("/api/actions", post(apply_action))
        .route("/api/transactions", get(list_transactions))
        .route("/api/receipt-image", post(receipt_image))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(state: ApiState, port: u16) -> crate::Result<()> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{GeminiAnalyzer, MockAnalyzer};
    use crate::config::AppConfig;
    use crate::sequencer::time_to_terminal;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    fn mock_state() -> ApiState {
        ApiState::new(Session::default(), Arc::new(MockAnalyzer))
    }

    async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn act(router: &Router, action: Value) -> (StatusCode, Value) {
        call(router, "POST", "/api/actions", Some(action)).await
    }

    /// Poll until the review screen holds a result
    async fn wait_for_review(router: &Router) -> Value {
        for _ in 0..200 {
            let (_, body) = call(router, "GET", "/api/screen", None).await;
            if body["data"]["state"] == "ready" {
                return body["data"].clone();
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("analysis never arrived");
    }

    #[tokio::test]
    async fn test_health() {
        let router = create_router(mock_state());
        let (status, body) = call(&router, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_transfer_flow() {
        let router = create_router(mock_state());

        let (status, body) = act(&router, json!({"type": "send"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["screen"], "input");

        let (status, body) = act(
            &router,
            json!({"type": "submit", "amount": "45.00", "recipient": "Starlight Coffee"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["screen"], "smart-check");

        let review = wait_for_review(&router).await;
        assert_eq!(review["canConfirm"], true);
        assert_eq!(review["verifiedContact"], true);

        let (status, body) = act(&router, json!({"type": "confirm"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["screen"], "status");
        assert_eq!(body["data"]["currentPhase"], 0);

        let (_, body) = call(&router, "GET", "/api/transactions", None).await;
        let ledger = body["data"].as_array().unwrap();
        assert_eq!(ledger.len(), 4);
        assert_eq!(ledger[0]["recipient"], "Starlight Coffee");
        assert_eq!(ledger[0]["status"], "settled");
        assert_eq!(ledger[1]["id"], "tx_88291");

        tokio::time::advance(time_to_terminal()).await;
        let (_, body) = call(&router, "GET", "/api/screen", None).await;
        assert_eq!(body["data"]["doneAvailable"], true);

        let (status, body) = act(&router, json!({"type": "done"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["screen"], "dashboard");
        let balance = body["data"]["balance"].as_f64().unwrap();
        assert!((balance - 24805.32).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_waits_for_settlement() {
        let router = create_router(mock_state());
        act(&router, json!({"type": "send"})).await;
        act(&router, json!({"type": "submit", "amount": 10, "recipient": "Bob"})).await;
        wait_for_review(&router).await;

        let (status, body) = act(&router, json!({"type": "confirm"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["doneAvailable"], false);

        let (status, body) = act(&router, json!({"type": "done"})).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["data"]["screen"], "status");

        tokio::time::advance(time_to_terminal() - Duration::from_millis(1)).await;
        let (status, _) = act(&router, json!({"type": "done"})).await;
        assert_eq!(status, StatusCode::CONFLICT);

        tokio::time::advance(Duration::from_millis(1)).await;
        let (status, body) = act(&router, json!({"type": "done"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["screen"], "dashboard");
        let balance = body["data"]["balance"].as_f64().unwrap();
        assert!((balance - 24840.32).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_validation_errors_stay_on_input() {
        let router = create_router(mock_state());
        act(&router, json!({"type": "send"})).await;

        let (status, body) =
            act(&router, json!({"type": "submit", "amount": 0, "recipient": "Bob"})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Invalid amount");
        assert_eq!(body["data"]["screen"], "input");
        assert_eq!(body["data"]["error"], "Invalid amount");

        let (status, body) =
            act(&router, json!({"type": "submit", "amount": "999999", "recipient": "Bob"})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Exceeds available balance");
    }

    #[tokio::test]
    async fn test_invalid_transition_is_conflict() {
        let router = create_router(mock_state());
        let (status, body) = act(&router, json!({"type": "confirm"})).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert_eq!(body["data"]["screen"], "dashboard");
    }

    #[tokio::test]
    async fn test_failing_analyzer_falls_back() {
        // No API key configured: every call fails and must fall back
        let analyzer = GeminiAnalyzer::new(&AppConfig::default()).unwrap();
        let router = create_router(ApiState::new(Session::default(), Arc::new(analyzer)));

        act(&router, json!({"type": "send"})).await;
        act(&router, json!({"type": "submit", "amount": 20, "recipient": "Bob"})).await;

        let review = wait_for_review(&router).await;
        assert_eq!(review["fallback"], true);
        assert_eq!(review["safetyScore"], 90.0);
        assert_eq!(review["budgetImpact"], "Minimal");

        let (status, _) = act(&router, json!({"type": "confirm"})).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&router, "GET", "/api/transactions", None).await;
        assert_eq!(body["data"][0]["category"], "General");
    }

    #[tokio::test]
    async fn test_receipt_image_absent_is_success() {
        let router = create_router(mock_state());
        let (status, body) = call(
            &router,
            "POST",
            "/api/receipt-image",
            Some(json!({"amount": 45.0, "recipient": "Starlight Coffee"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(body["data"]["image"].is_null());
    }
}
