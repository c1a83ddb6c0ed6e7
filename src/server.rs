use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context as AnyhowContext;
use axum::{
    debug_handler,
    extract::{rejection::JsonRejection, State},
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post, MethodRouter},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    cli::CliArgs,
    curve::{CurveResolver, LabelMatching, RngJitter},
    error::LensError,
    extract,
    fallback::ModelFallbackClient,
    gemini::GeminiBackend,
    model::CurvePoint,
    prompts,
    util::current_unix_time,
};

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";

/// Upper bound for `max_input_size` on `/api/graph-data`.
pub const MAX_INPUT_SIZE: u32 = 500;

const DEFAULT_INPUT_SIZE: u32 = 50;

const ENDPOINTS: &[&str] = &[
    "POST /api/complexity - Analyze code complexity",
    "POST /api/debug - Debug code issues",
    "POST /api/create - Generate code solutions",
    "POST /api/graph-data - Generate complexity graphs",
];

#[derive(Clone)]
pub struct AppState {
    client: Arc<ModelFallbackClient<GeminiBackend>>,
    resolver: CurveResolver<GeminiBackend>,
}

impl AppState {
    pub fn new(client: ModelFallbackClient<GeminiBackend>) -> Self {
        let client = Arc::new(client);
        let resolver = CurveResolver::new(Arc::clone(&client));
        Self { client, resolver }
    }
}

pub async fn run_server(args: &CliArgs) -> anyhow::Result<()> {
    let listen = args.listen.as_str();
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("parsing listen address `{listen}`"))?;

    let client = args.fallback_client()?;
    if let Err(err) = client.ensure_ready() {
        tracing::warn!("{err}; model-backed endpoints will answer 500");
    }
    tracing::info!("fallback models: {}", client.models().join(", "));

    let router = build_router(AppState::new(client));

    let listener = TcpListener::bind(addr)
        .await
        .context("binding API server address")?;
    tracing::info!(
        "API server listening on http://{}",
        listener.local_addr().unwrap_or(addr)
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(err) = signal::ctrl_c().await {
                tracing::warn!("failed to listen for shutdown signal: {err:?}");
            }
            tracing::info!("shutdown signal received; stopping server");
        })
        .await
        .context("running API server")?;

    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(86_400));

    Router::new()
        .route("/api", api_route(get(status)))
        .route("/api/complexity", api_route(post(analyze_complexity)))
        .route("/api/debug", api_route(post(debug_code)))
        .route("/api/create", api_route(post(create_solution)))
        .route("/api/graph-data", api_route(post(graph_data)))
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Answers bare `OPTIONS` with an empty 200 and any method `route` does not
/// handle with a JSON 405.
fn api_route(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.options(preflight).fallback(method_not_allowed)
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    body: ApiErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status,
            body: ApiErrorBody {
                error: error.into(),
                details,
            },
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!("rejected request: {message}");
        Self::new(StatusCode::BAD_REQUEST, message, None)
    }

    /// Malformed or mistyped JSON body.
    fn rejected(rejection: JsonRejection) -> Self {
        let details = rejection.body_text();
        tracing::warn!("rejected request body: {details}");
        Self::new(StatusCode::BAD_REQUEST, "Invalid request body", Some(details))
    }

    /// Maps a component failure for the operation named by `failed`.
    /// Input errors carry their message as `error` and no `details`.
    fn from_lens(failed: &str, err: LensError) -> Self {
        match err {
            LensError::InvalidInput(message) => Self::bad_request(message),
            LensError::Configuration(message) => {
                tracing::error!("{failed}: {message}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, None)
            }
            other => {
                let details = other.to_string();
                tracing::error!("{failed}: {details}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, failed, Some(details))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn payload<T>(body: std::result::Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value).map_err(ApiError::rejected)
}

/// Trimmed value of a required text field.
fn required<'a>(value: &'a Option<String>, message: &str) -> ApiResult<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::bad_request(message))
}

async fn status() -> Json<Value> {
    Json(json!({
        "status": "API is running",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ENDPOINTS,
        "timestamp": current_unix_time(),
    }))
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> ApiError {
    ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed", None)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::new(
        StatusCode::NOT_FOUND,
        format!("Endpoint {} not found", uri.path()),
        None,
    )
}

#[derive(Debug, Deserialize)]
struct CodeRequest {
    code: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnalysisResponse {
    success: bool,
    analysis: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    complexities: Option<extract::Complexities>,
}

#[debug_handler]
async fn analyze_complexity(
    State(state): State<AppState>,
    body: std::result::Result<Json<CodeRequest>, JsonRejection>,
) -> ApiResult<Json<AnalysisResponse>> {
    let request = payload(body)?;
    let code = required(&request.code, "Code is required")?;

    let analysis = state
        .client
        .send(&prompts::complexity(code))
        .await
        .map_err(|err| ApiError::from_lens("Complexity analysis failed", err))?;

    let complexities =
        extract::has_complexity_info(&analysis).then(|| extract::extract_complexities(&analysis));

    Ok(Json(AnalysisResponse {
        success: true,
        analysis,
        complexities,
    }))
}

async fn debug_code(
    State(state): State<AppState>,
    body: std::result::Result<Json<CodeRequest>, JsonRejection>,
) -> ApiResult<Json<AnalysisResponse>> {
    let request = payload(body)?;
    let code = required(&request.code, "Code is required")?;

    let analysis = state
        .client
        .send(&prompts::debug(code))
        .await
        .map_err(|err| ApiError::from_lens("Debug analysis failed", err))?;

    Ok(Json(AnalysisResponse {
        success: true,
        analysis,
        complexities: None,
    }))
}

#[derive(Debug, Deserialize)]
struct CreateRequest {
    problem_statement: Option<String>,
    language: Option<String>,
}

#[derive(Debug, Serialize)]
struct SolutionResponse {
    success: bool,
    solution: String,
}

async fn create_solution(
    State(state): State<AppState>,
    body: std::result::Result<Json<CreateRequest>, JsonRejection>,
) -> ApiResult<Json<SolutionResponse>> {
    let request = payload(body)?;
    let problem = required(&request.problem_statement, "Problem statement is required")?;
    let language = required(&request.language, "Language is required")?;

    let solution = state
        .client
        .send(&prompts::create(problem, language))
        .await
        .map_err(|err| ApiError::from_lens("Code generation failed", err))?;

    Ok(Json(SolutionResponse {
        success: true,
        solution,
    }))
}

fn default_input_size() -> u32 {
    DEFAULT_INPUT_SIZE
}

#[derive(Debug, Deserialize)]
struct GraphDataRequest {
    complexity_type: Option<String>,
    #[serde(default = "default_input_size")]
    max_input_size: u32,
    #[serde(default)]
    strict: bool,
}

#[derive(Debug, Serialize)]
struct GraphDataResponse {
    success: bool,
    data: Vec<CurvePoint>,
}

async fn graph_data(
    State(state): State<AppState>,
    body: std::result::Result<Json<GraphDataRequest>, JsonRejection>,
) -> ApiResult<Json<GraphDataResponse>> {
    let request = payload(body)?;
    let label = required(&request.complexity_type, "Complexity type is required")?;
    if !(1..=MAX_INPUT_SIZE).contains(&request.max_input_size) {
        return Err(ApiError::bad_request(format!(
            "max_input_size must be between 1 and {MAX_INPUT_SIZE}"
        )));
    }
    let matching = if request.strict {
        LabelMatching::Strict
    } else {
        LabelMatching::DefaultLinear
    };

    let mut jitter = RngJitter::from_entropy();
    let data = state
        .resolver
        .resolve(label, request.max_input_size, matching, &mut jitter)
        .await
        .map_err(|err| ApiError::from_lens("Graph data generation failed", err))?;

    Ok(Json(GraphDataResponse {
        success: true,
        data,
    }))
}
