use axum::{
    Router,
    extract::{Json, Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::core::{
    CompoundingFrequency, MAX_PROJECTION_YEARS, PlanMetrics, ProjectionResult, SavingsPlan,
    Scenario, SolveError, SolveOutcome, SolveRequest, Unknown, compute_metrics, parse_day,
    project, solve,
};
use crate::history::{History, HistoryEntry};
use crate::plans::{PlanBook, PlanError};
use crate::store::{Store, StoreError};

pub struct AppState {
    store: Arc<dyn Store>,
    plans: Mutex<PlanBook>,
    history: Mutex<History>,
}

impl AppState {
    pub fn load(store: Arc<dyn Store>, today: Date) -> Result<Self, StoreError> {
        let plans = PlanBook::from_plans(store.load_plans()?, today);
        let history = History::from_entries(store.load_history()?);
        Ok(AppState {
            store,
            plans: Mutex::new(plans),
            history: Mutex::new(history),
        })
    }
}

#[derive(Debug, Error)]
enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Solve(#[from] SolveError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl<T> From<PoisonError<T>> for ApiError {
    fn from(_: PoisonError<T>) -> Self {
        ApiError::Store(StoreError::Poisoned)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Solve(SolveError::InvalidInput { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Solve(SolveError::Unreachable(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Plan(PlanError::PlanNotFound(_) | PlanError::AdjustmentNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Plan(PlanError::LastPlan) => StatusCode::CONFLICT,
            ApiError::Store(_) | ApiError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        error_response(status, &self.to_string())
    }
}

/// A numeric form field: a JSON number, or text that is parsed leniently.
/// Text that does not parse, and non-finite numbers, count as zero.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NumberInput {
    Number(f64),
    Text(String),
}

impl NumberInput {
    fn value(&self) -> f64 {
        let value = match self {
            NumberInput::Number(v) => *v,
            NumberInput::Text(text) => text.trim().parse::<f64>().unwrap_or(0.0),
        };
        if value.is_finite() { value } else { 0.0 }
    }
}

fn number_or_zero(input: &Option<NumberInput>) -> f64 {
    input.as_ref().map_or(0.0, NumberInput::value)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ScenarioPayload {
    principal: Option<NumberInput>,
    #[serde(alias = "rate")]
    annual_rate_percent: Option<NumberInput>,
    years: Option<NumberInput>,
    #[serde(alias = "frequency")]
    compounding_frequency: Option<NumberInput>,
    #[serde(alias = "contribution", alias = "annualContribution")]
    periodic_contribution: Option<NumberInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SolvePayload {
    unknown: Unknown,
    #[serde(default, alias = "target")]
    target_final_value: Option<NumberInput>,
    #[serde(flatten)]
    scenario: ScenarioPayload,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PlanPayload {
    name: Option<String>,
    deadline: Option<String>,
    target_amount: Option<NumberInput>,
    current_amount: Option<NumberInput>,
    #[serde(alias = "expectedRate")]
    expected_annual_rate_percent: Option<NumberInput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AdjustmentPayload {
    date: Option<String>,
    amount: Option<NumberInput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct MetricsQuery {
    as_of: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MetricsResponse {
    plan_id: String,
    as_of: Date,
    #[serde(flatten)]
    metrics: PlanMetrics,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Field edits parsed up front so a bad deadline rejects the whole request.
#[derive(Debug, Default)]
struct PlanChanges {
    name: Option<String>,
    deadline: Option<Date>,
    target_amount: Option<f64>,
    current_amount: Option<f64>,
    expected_rate: Option<f64>,
}

impl PlanChanges {
    fn apply(self, mut plan: SavingsPlan) -> SavingsPlan {
        if let Some(v) = self.name {
            plan = plan.with_name(v);
        }
        if let Some(v) = self.deadline {
            plan = plan.with_deadline(v);
        }
        if let Some(v) = self.target_amount {
            plan = plan.with_target_amount(v);
        }
        if let Some(v) = self.current_amount {
            plan = plan.with_current_amount(v);
        }
        if let Some(v) = self.expected_rate {
            plan = plan.with_expected_rate(v);
        }
        plan
    }
}

fn scenario_from_payload(payload: &ScenarioPayload) -> Result<Scenario, String> {
    let frequency = match &payload.compounding_frequency {
        None => CompoundingFrequency::Monthly,
        Some(input) => {
            let periods = input.value();
            let supported = if periods.fract() == 0.0 && periods > 0.0 {
                CompoundingFrequency::from_periods(periods as u32)
            } else {
                None
            };
            supported.ok_or_else(|| {
                format!(
                    "compoundingFrequency must be one of 1, 2, 4, 12, 52 or 365 (got {periods})"
                )
            })?
        }
    };

    let scenario = Scenario {
        principal: number_or_zero(&payload.principal),
        annual_rate_percent: number_or_zero(&payload.annual_rate_percent),
        years: number_or_zero(&payload.years),
        frequency,
        annual_contribution: number_or_zero(&payload.periodic_contribution),
    };

    if scenario.principal < 0.0 {
        return Err("principal must be >= 0".to_string());
    }
    if scenario.years < 0.0 {
        return Err("years must be >= 0".to_string());
    }
    if scenario.years > MAX_PROJECTION_YEARS {
        return Err(format!("years must be <= {MAX_PROJECTION_YEARS}"));
    }
    if scenario.annual_contribution < 0.0 {
        return Err("periodicContribution must be >= 0".to_string());
    }
    Ok(scenario)
}

fn solve_request_from_payload(payload: &SolvePayload) -> Result<SolveRequest, String> {
    Ok(SolveRequest {
        unknown: payload.unknown,
        target_final_value: number_or_zero(&payload.target_final_value),
        scenario: scenario_from_payload(&payload.scenario)?,
    })
}

fn plan_changes_from_payload(payload: &PlanPayload) -> Result<PlanChanges, String> {
    let deadline = match &payload.deadline {
        None => None,
        Some(text) => Some(
            parse_day(text)
                .ok_or_else(|| format!("deadline must be a calendar date, got {text:?}"))?,
        ),
    };

    Ok(PlanChanges {
        name: payload.name.clone(),
        deadline,
        target_amount: payload.target_amount.as_ref().map(NumberInput::value),
        current_amount: payload.current_amount.as_ref().map(NumberInput::value),
        expected_rate: payload
            .expected_annual_rate_percent
            .as_ref()
            .map(NumberInput::value),
    })
}

fn resolve_as_of(query: &MetricsQuery) -> Result<Date, String> {
    match &query.as_of {
        None => Ok(jiff::Zoned::now().date()),
        Some(text) => {
            parse_day(text).ok_or_else(|| format!("asOf must be a calendar date, got {text:?}"))
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/project", get(project_get_handler).post(project_post_handler))
        .route("/api/solve", post(solve_handler))
        .route("/api/history", get(history_handler).delete(clear_history_handler))
        .route("/api/plans", get(list_plans_handler).post(create_plan_handler))
        .route(
            "/api/plans/:id",
            get(get_plan_handler)
                .put(update_plan_handler)
                .delete(delete_plan_handler),
        )
        .route("/api/plans/:id/metrics", get(plan_metrics_handler))
        .route("/api/plans/:id/adjustments", post(add_adjustment_handler))
        .route(
            "/api/plans/:id/adjustments/:adjustment_id",
            delete(remove_adjustment_handler),
        )
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(port: u16, store: Arc<dyn Store>) -> std::io::Result<()> {
    let state =
        AppState::load(store, jiff::Zoned::now().date()).map_err(std::io::Error::other)?;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(Arc::new(state));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("compound interest API listening on http://{addr}");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control("Compound interest calculator API")
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(
    State(state): State<Arc<AppState>>,
    Query(payload): Query<ScenarioPayload>,
) -> Response {
    respond(with_store(state, move |state| run_projection(state, &payload)).await)
}

async fn project_post_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ScenarioPayload>,
) -> Response {
    respond(with_store(state, move |state| run_projection(state, &payload)).await)
}

async fn solve_handler(Json(payload): Json<SolvePayload>) -> Response {
    respond(run_solve(&payload))
}

async fn history_handler(State(state): State<Arc<AppState>>) -> Response {
    respond(list_history(&state))
}

async fn clear_history_handler(State(state): State<Arc<AppState>>) -> Response {
    respond(with_store(state, clear_history).await)
}

async fn list_plans_handler(State(state): State<Arc<AppState>>) -> Response {
    respond(list_plans(&state))
}

async fn create_plan_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PlanPayload>,
) -> Response {
    let today = jiff::Zoned::now().date();
    respond(with_store(state, move |state| create_plan(state, &payload, today)).await)
}

async fn get_plan_handler(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    respond(get_plan(&state, &id))
}

async fn update_plan_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<PlanPayload>,
) -> Response {
    respond(with_store(state, move |state| update_plan(state, &id, &payload)).await)
}

async fn delete_plan_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    respond(with_store(state, move |state| delete_plan(state, &id)).await)
}

async fn plan_metrics_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<MetricsQuery>,
) -> Response {
    respond(plan_metrics(&state, &id, &query))
}

async fn add_adjustment_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<AdjustmentPayload>,
) -> Response {
    respond(with_store(state, move |state| add_adjustment(state, &id, &payload)).await)
}

async fn remove_adjustment_handler(
    State(state): State<Arc<AppState>>,
    Path((id, adjustment_id)): Path<(String, String)>,
) -> Response {
    respond(
        with_store(state, move |state| {
            remove_adjustment(state, &id, &adjustment_id)
        })
        .await,
    )
}

// Store writes block, so handlers that save run on the blocking pool.
async fn with_store<T, F>(state: Arc<AppState>, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || work(state.as_ref())).await?
}

// Changes are made on a copy and only replace the live book once saved.
fn commit_plans<T, F>(state: &AppState, change: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut PlanBook) -> Result<T, ApiError>,
{
    let mut book = state.plans.lock()?;
    let mut next = book.clone();
    let value = change(&mut next)?;
    state.store.save_plans(next.plans())?;
    *book = next;
    Ok(value)
}

fn commit_history<T, F>(state: &AppState, change: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut History) -> T,
{
    let mut history = state.history.lock()?;
    let mut next = history.clone();
    let value = change(&mut next);
    state.store.save_history(next.entries())?;
    *history = next;
    Ok(value)
}

fn run_projection(
    state: &AppState,
    payload: &ScenarioPayload,
) -> Result<ProjectionResult, ApiError> {
    let scenario = scenario_from_payload(payload).map_err(ApiError::BadRequest)?;
    let result = project(&scenario);

    commit_history(state, |history| {
        history.record(scenario, &result, jiff::Timestamp::now());
    })?;
    Ok(result)
}

fn run_solve(payload: &SolvePayload) -> Result<SolveOutcome, ApiError> {
    let request = solve_request_from_payload(payload).map_err(ApiError::BadRequest)?;
    let outcome = solve(&request)?;
    tracing::debug!(
        unknown = ?outcome.unknown,
        method = ?outcome.method,
        value = outcome.value,
        "solved"
    );
    Ok(outcome)
}

fn list_history(state: &AppState) -> Result<Vec<HistoryEntry>, ApiError> {
    Ok(state.history.lock()?.entries().to_vec())
}

fn clear_history(state: &AppState) -> Result<Vec<HistoryEntry>, ApiError> {
    commit_history(state, History::clear)?;
    Ok(Vec::new())
}

fn list_plans(state: &AppState) -> Result<Vec<SavingsPlan>, ApiError> {
    Ok(state.plans.lock()?.plans().to_vec())
}

fn get_plan(state: &AppState, id: &str) -> Result<SavingsPlan, ApiError> {
    let book = state.plans.lock()?;
    let plan = book
        .get(id)
        .cloned()
        .ok_or_else(|| PlanError::PlanNotFound(id.to_string()))?;
    Ok(plan)
}

fn create_plan(
    state: &AppState,
    payload: &PlanPayload,
    today: Date,
) -> Result<SavingsPlan, ApiError> {
    let changes = plan_changes_from_payload(payload).map_err(ApiError::BadRequest)?;
    let plan = commit_plans(state, |book| {
        Ok(book.add(changes.apply(SavingsPlan::with_defaults(today))).clone())
    })?;
    tracing::info!(plan = %plan.id, "plan created");
    Ok(plan)
}

fn update_plan(
    state: &AppState,
    id: &str,
    payload: &PlanPayload,
) -> Result<SavingsPlan, ApiError> {
    let changes = plan_changes_from_payload(payload).map_err(ApiError::BadRequest)?;
    commit_plans(state, |book| {
        Ok(book.update(id, |plan| Ok(changes.apply(plan)))?.clone())
    })
}

fn delete_plan(state: &AppState, id: &str) -> Result<SavingsPlan, ApiError> {
    let removed = commit_plans(state, |book| Ok(book.remove(id)?))?;
    tracing::info!(plan = %removed.id, "plan deleted");
    Ok(removed)
}

fn plan_metrics(
    state: &AppState,
    id: &str,
    query: &MetricsQuery,
) -> Result<MetricsResponse, ApiError> {
    let as_of = resolve_as_of(query).map_err(ApiError::BadRequest)?;
    let plan = get_plan(state, id)?;
    Ok(MetricsResponse {
        metrics: compute_metrics(&plan, as_of),
        plan_id: plan.id,
        as_of,
    })
}

fn add_adjustment(
    state: &AppState,
    id: &str,
    payload: &AdjustmentPayload,
) -> Result<SavingsPlan, ApiError> {
    let date = payload.date.clone().unwrap_or_default();
    let amount = number_or_zero(&payload.amount);
    commit_plans(state, |book| {
        Ok(book
            .update(id, |plan| Ok(plan.with_adjustment(date, amount)))?
            .clone())
    })
}

fn remove_adjustment(
    state: &AppState,
    id: &str,
    adjustment_id: &str,
) -> Result<SavingsPlan, ApiError> {
    commit_plans(state, |book| {
        Ok(book
            .update(id, |plan| plan.without_adjustment(adjustment_id))?
            .clone())
    })
}

fn respond<T: Serialize>(result: Result<T, ApiError>) -> Response {
    match result {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(err) => err.into_response(),
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use axum::http::Uri;
    use jiff::civil::date;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn scenario_from_json(json: &str) -> Result<Scenario, String> {
        let payload = serde_json::from_str::<ScenarioPayload>(json)
            .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
        scenario_from_payload(&payload)
    }

    fn test_state() -> (Arc<MemoryStore>, AppState) {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::load(store.clone(), date(2025, 1, 1)).expect("load state");
        (store, state)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[test]
    fn scenario_payload_parses_web_keys() {
        let scenario = scenario_from_json(
            r#"{
              "principal": 10000,
              "annualRatePercent": "5.5",
              "years": 12,
              "compoundingFrequency": 4,
              "periodicContribution": "1200"
            }"#,
        )
        .expect("json should parse");

        assert_approx(scenario.principal, 10_000.0);
        assert_approx(scenario.annual_rate_percent, 5.5);
        assert_approx(scenario.years, 12.0);
        assert_eq!(scenario.frequency, CompoundingFrequency::Quarterly);
        assert_approx(scenario.annual_contribution, 1_200.0);
    }

    #[test]
    fn unparseable_and_missing_numbers_default_to_zero() {
        let scenario = scenario_from_json(r#"{ "principal": "abc", "rate": "", "years": null }"#)
            .expect("lenient parse");

        assert_approx(scenario.principal, 0.0);
        assert_approx(scenario.annual_rate_percent, 0.0);
        assert_approx(scenario.years, 0.0);
        assert_approx(scenario.annual_contribution, 0.0);
        assert_eq!(scenario.frequency, CompoundingFrequency::Monthly);
    }

    #[test]
    fn unsupported_frequency_is_rejected() {
        let err = scenario_from_json(r#"{ "frequency": 7 }"#).expect_err("7 is not supported");
        assert!(err.contains("compoundingFrequency"));

        let err = scenario_from_json(r#"{ "frequency": "monthly" }"#).expect_err("text is zero");
        assert!(err.contains("compoundingFrequency"));
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let err = scenario_from_json(r#"{ "principal": -5 }"#).expect_err("negative principal");
        assert!(err.contains("principal"));

        let err = scenario_from_json(r#"{ "contribution": "-100" }"#).expect_err("negative");
        assert!(err.contains("periodicContribution"));
    }

    #[test]
    fn query_string_numbers_parse_as_text() {
        let uri: Uri = "/api/project?principal=2500&rate=4&years=3&frequency=365"
            .parse()
            .expect("valid uri");
        let Query(payload) = Query::<ScenarioPayload>::try_from_uri(&uri).expect("query");
        let scenario = scenario_from_payload(&payload).expect("valid scenario");

        assert_approx(scenario.principal, 2_500.0);
        assert_eq!(scenario.frequency, CompoundingFrequency::Daily);
    }

    #[test]
    fn solve_payload_flattens_scenario_fields() {
        let payload = serde_json::from_str::<SolvePayload>(
            r#"{ "unknown": "rate", "target": "20000", "principal": 10000, "years": 10 }"#,
        )
        .expect("json should parse");
        let request = solve_request_from_payload(&payload).expect("valid request");

        assert_eq!(request.unknown, Unknown::Rate);
        assert_approx(request.target_final_value, 20_000.0);
        assert_approx(request.scenario.principal, 10_000.0);
    }

    #[test]
    fn plan_payload_rejects_bad_deadline_but_not_bad_numbers() {
        let payload = serde_json::from_str::<PlanPayload>(
            r#"{ "deadline": "2026-13-01", "targetAmount": "lots" }"#,
        )
        .expect("json should parse");
        let err = plan_changes_from_payload(&payload).expect_err("bad deadline");
        assert!(err.contains("deadline"));

        let payload = serde_json::from_str::<PlanPayload>(r#"{ "targetAmount": "lots" }"#)
            .expect("json should parse");
        let changes = plan_changes_from_payload(&payload).expect("numbers are lenient");
        assert_eq!(changes.target_amount, Some(0.0));
        assert_eq!(changes.name, None);
    }

    #[test]
    fn projection_is_recorded_in_history_and_store() {
        let (store, state) = test_state();
        let payload = serde_json::from_str::<ScenarioPayload>(
            r#"{ "principal": 10000, "rate": 5, "years": 10, "frequency": 12 }"#,
        )
        .expect("json should parse");

        let result = run_projection(&state, &payload).expect("projection");
        assert!((result.final_amount - 16_470.09).abs() < 0.01);
        run_projection(&state, &payload).expect("projection");

        assert_eq!(list_history(&state).expect("history").len(), 1);
        assert_eq!(store.load_history().expect("stored").len(), 1);

        clear_history(&state).expect("clear");
        assert!(store.load_history().expect("stored").is_empty());
    }

    #[test]
    fn solve_errors_map_to_statuses() {
        let invalid = serde_json::from_str::<SolvePayload>(
            r#"{ "unknown": "rate", "target": 20000, "principal": 0, "years": 10 }"#,
        )
        .expect("json should parse");
        let err = run_solve(&invalid).expect_err("zero principal");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let unreachable = serde_json::from_str::<SolvePayload>(
            r#"{ "unknown": "years", "target": 1e12, "principal": 100, "rate": 1,
                 "contribution": 10 }"#,
        )
        .expect("json should parse");
        let err = run_solve(&unreachable).expect_err("beyond horizon cap");
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn plan_lifecycle_persists_each_change() {
        let (store, state) = test_state();
        let seeded = list_plans(&state).expect("plans");
        assert_eq!(seeded.len(), 1);

        let payload = serde_json::from_str::<PlanPayload>(
            r#"{ "name": "Boat", "deadline": "2026-01-01", "targetAmount": 300000,
                 "currentAmount": "10000", "expectedRate": 5 }"#,
        )
        .expect("json should parse");
        let created = create_plan(&state, &payload, date(2025, 1, 1)).expect("create");
        assert_eq!(created.name, "Boat");
        assert_eq!(store.load_plans().expect("stored").len(), 2);

        let adjustment = serde_json::from_str::<AdjustmentPayload>(
            r#"{ "date": "2025-06-01", "amount": "250" }"#,
        )
        .expect("json should parse");
        let with_adj = add_adjustment(&state, &created.id, &adjustment).expect("add");
        assert_eq!(with_adj.adjustments.len(), 1);
        let adjustment_id = with_adj.adjustments[0].id.clone();

        let without = remove_adjustment(&state, &created.id, &adjustment_id).expect("remove");
        assert!(without.adjustments.is_empty());

        let err = remove_adjustment(&state, &created.id, &adjustment_id).expect_err("gone");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let rename = serde_json::from_str::<PlanPayload>(r#"{ "name": "Yacht" }"#)
            .expect("json should parse");
        let renamed = update_plan(&state, &created.id, &rename).expect("update");
        assert_eq!(renamed.name, "Yacht");
        assert_approx(renamed.target_amount, 300_000.0);

        delete_plan(&state, &seeded[0].id).expect("delete");
        let err = delete_plan(&state, &created.id).expect_err("last plan stays");
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(store.load_plans().expect("stored").len(), 1);
    }

    #[test]
    fn metrics_use_explicit_as_of_date() {
        let (_store, state) = test_state();
        let payload = serde_json::from_str::<PlanPayload>(
            r#"{ "deadline": "2026-01-01", "targetAmount": 300000,
                 "currentAmount": 10000, "expectedAnnualRatePercent": 5 }"#,
        )
        .expect("json should parse");
        let plan = create_plan(&state, &payload, date(2025, 1, 1)).expect("create");

        let query = MetricsQuery {
            as_of: Some("2025-01-01".to_string()),
        };
        let response = plan_metrics(&state, &plan.id, &query).expect("metrics");
        assert_eq!(response.metrics.days_remaining, 365);
        assert_approx(response.metrics.funding_gap, 289_500.0);

        let bad = MetricsQuery {
            as_of: Some("yesterday".to_string()),
        };
        let err = plan_metrics(&state, &plan.id, &bad).expect_err("bad date");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn responses_are_camel_case_json_without_caching() {
        let (_store, state) = test_state();
        let payload = serde_json::from_str::<ScenarioPayload>(r#"{ "principal": 100, "years": 2 }"#)
            .expect("json should parse");

        let response = respond(run_projection(&state, &payload));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );
        let json = body_json(response).await;
        assert!(json.get("finalAmount").is_some());
        assert!(json.get("totalInterest").is_some());
        assert_eq!(json["schedule"][0]["principalToDate"], serde_json::json!(100.0));

        let response = respond::<SavingsPlan>(Err(PlanError::LastPlan.into()));
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["error"], "at least one plan must remain");
    }

    #[tokio::test]
    async fn metrics_response_flattens_fields() {
        let (_store, state) = test_state();
        let plan_id = list_plans(&state).expect("plans")[0].id.clone();
        let query = MetricsQuery {
            as_of: Some("2025-01-01".to_string()),
        };

        let json = body_json(respond(plan_metrics(&state, &plan_id, &query))).await;
        assert_eq!(json["planId"], serde_json::json!(plan_id));
        assert_eq!(json["asOf"], "2025-01-01");
        assert!(json.get("requiredMonthlySaving").is_some());
        assert!(json.get("requiredAnnualRatePercent").is_some());
    }

    struct ReadOnlyStore;

    impl Store for ReadOnlyStore {
        fn load_plans(&self) -> Result<Vec<SavingsPlan>, StoreError> {
            Ok(Vec::new())
        }

        fn save_plans(&self, _plans: &[SavingsPlan]) -> Result<(), StoreError> {
            Err(std::io::Error::other("disk full").into())
        }

        fn load_history(&self) -> Result<Vec<HistoryEntry>, StoreError> {
            Ok(Vec::new())
        }

        fn save_history(&self, _entries: &[HistoryEntry]) -> Result<(), StoreError> {
            Err(std::io::Error::other("disk full").into())
        }
    }

    #[test]
    fn horizon_beyond_cap_is_rejected() {
        let err = scenario_from_json(r#"{ "principal": 1, "years": 1e12 }"#)
            .expect_err("absurd horizon");
        assert!(err.contains("years"));

        let scenario = scenario_from_json(r#"{ "principal": 1, "years": 1000 }"#)
            .expect("cap itself is allowed");
        assert_approx(scenario.years, MAX_PROJECTION_YEARS);

        let (_store, state) = test_state();
        let payload = serde_json::from_str::<ScenarioPayload>(r#"{ "years": "5000" }"#)
            .expect("json should parse");
        let err = run_projection(&state, &payload).expect_err("rejected before projecting");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(list_history(&state).expect("history").is_empty());
    }

    #[test]
    fn failed_save_leaves_memory_unchanged() {
        let state = AppState::load(Arc::new(ReadOnlyStore), date(2025, 1, 1)).expect("load");
        let before = list_plans(&state).expect("plans");
        let seeded_id = before[0].id.clone();

        let payload = serde_json::from_str::<PlanPayload>(r#"{ "name": "Boat" }"#)
            .expect("json should parse");
        let err = create_plan(&state, &payload, date(2025, 1, 1)).expect_err("save fails");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(list_plans(&state).expect("plans"), before);

        let err = update_plan(&state, &seeded_id, &payload).expect_err("save fails");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let adjustment = AdjustmentPayload {
            date: Some("2025-06-01".to_string()),
            amount: None,
        };
        add_adjustment(&state, &seeded_id, &adjustment).expect_err("save fails");
        assert_eq!(list_plans(&state).expect("plans"), before);

        let scenario = serde_json::from_str::<ScenarioPayload>(r#"{ "principal": 100 }"#)
            .expect("json should parse");
        let err = run_projection(&state, &scenario).expect_err("save fails");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(list_history(&state).expect("history").is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn store_work_runs_off_the_async_workers() {
        let store = Arc::new(MemoryStore::new());
        let state = Arc::new(AppState::load(store.clone(), date(2025, 1, 1)).expect("load"));
        let payload = serde_json::from_str::<PlanPayload>(r#"{ "name": "Car" }"#)
            .expect("json should parse");

        let plan = with_store(state.clone(), move |state| {
            create_plan(state, &payload, date(2025, 1, 1))
        })
        .await
        .expect("create");

        assert_eq!(plan.name, "Car");
        assert_eq!(store.load_plans().expect("stored").len(), 2);
    }
}
