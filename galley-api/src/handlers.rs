//! API route handlers.
//!
//! Every AI route runs the same pipeline: fingerprint the body, answer from
//! the cache if possible, otherwise ask the model provider and cache only a
//! successful answer.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use galley_cache::make_key;
use galley_core::types::{Completion, PromptContext, ResultEnvelope, Task};

use crate::dto::*;
use crate::error::ApiError;
use crate::extract::Validated;
use crate::state::AppState;

/// Fingerprint, cache lookup, then (on a miss) one upstream call.
async fn run_task(state: Arc<AppState>, task: Task, body: Value) -> Response {
    let key = make_key(task.operation(), &body);

    if let Some(hit) = state.cache.get(&key) {
        debug!(operation = task.operation(), "Cache hit");
        return (StatusCode::OK, Json(hit)).into_response();
    }

    let envelope = if state.config.coalesce_requests {
        let flight_state = state.clone();
        let flight_key = key.clone();
        state
            .flights
            .run(&key, move || execute(flight_state, task, body, flight_key))
            .await
    } else {
        execute(state.clone(), task, body, key).await
    };

    let status = if envelope.is_success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(envelope)).into_response()
}

/// Runs the upstream call on its own task so a fault in it becomes an
/// error envelope instead of tearing down the connection.
async fn execute(state: Arc<AppState>, task: Task, body: Value, key: String) -> ResultEnvelope {
    let worker = tokio::spawn(async move { resolve(&state, task, &body, &key).await });

    match worker.await {
        Ok(envelope) => envelope,
        Err(e) => {
            error!(operation = task.operation(), error = %e, "Handler fault");
            ResultEnvelope::error(task.failure_message())
        }
    }
}

async fn resolve(state: &AppState, task: Task, body: &Value, key: &str) -> ResultEnvelope {
    // Another request may have filled the entry since our lookup. Peek so
    // the miss already counted in run_task is not counted again.
    if let Some(hit) = state.cache.peek(key) {
        if let Ok(envelope) = serde_json::from_value::<ResultEnvelope>(hit) {
            return envelope;
        }
    }

    let context = PromptContext::for_task(task, body);
    let profile = state.config.gateway.profile(task.domain());

    match state.client.complete(&profile, &context).await {
        Completion::Success { text } => {
            let envelope = ResultEnvelope::success(text);
            state
                .cache
                .set(key, envelope.to_value(), Some(task.cache_ttl()));
            info!(
                operation = task.operation(),
                ttl_secs = task.cache_ttl().as_secs(),
                "AI operation completed"
            );
            envelope
        }
        Completion::Failure { error } => {
            warn!(operation = task.operation(), error = %error, "AI operation failed");
            ResultEnvelope::error(error)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Menu
// ═══════════════════════════════════════════════════════════════════════════

/// POST /api/menu/recommendations
pub async fn menu_recommendations(
    State(state): State<Arc<AppState>>,
    Validated { body, raw }: Validated<MenuRecommendationsRequest>,
) -> Response {
    debug!(
        menu_items = body.current_menu.len(),
        seasonal = body.seasonal_ingredients.len(),
        "Menu recommendations requested"
    );
    run_task(state, Task::MenuRecommendations, raw).await
}

/// POST /api/menu/optimize-item
pub async fn optimize_menu_item(
    State(state): State<Arc<AppState>>,
    Validated { body, raw }: Validated<MenuItemRequest>,
) -> Response {
    debug!(item = %body.item.name, "Menu item optimization requested");
    run_task(state, Task::MenuItemOptimization, raw).await
}

/// POST /api/menu/describe-item
pub async fn describe_menu_item(
    State(state): State<Arc<AppState>>,
    Validated { body, raw }: Validated<MenuItemRequest>,
) -> Response {
    debug!(item = %body.item.name, "Menu item description requested");
    run_task(state, Task::MenuItemDescription, raw).await
}

// ═══════════════════════════════════════════════════════════════════════════
// Inventory
// ═══════════════════════════════════════════════════════════════════════════

/// POST /api/inventory/predict
pub async fn predict_inventory(
    State(state): State<Arc<AppState>>,
    Validated { body, raw }: Validated<InventoryPredictionRequest>,
) -> Response {
    debug!(
        items = body.current_inventory.len(),
        transactions = body.historical_transactions.len(),
        events = body.upcoming_events.len(),
        "Inventory prediction requested"
    );
    run_task(state, Task::InventoryPrediction, raw).await
}

/// POST /api/inventory/optimize-reorder-points
pub async fn optimize_reorder_points(
    State(state): State<Arc<AppState>>,
    Validated { body, raw }: Validated<ReorderOptimizationRequest>,
) -> Response {
    debug!(items = body.inventory_items.len(), "Reorder optimization requested");
    run_task(state, Task::ReorderOptimization, raw).await
}

/// POST /api/inventory/analyze-waste
pub async fn analyze_waste(
    State(state): State<Arc<AppState>>,
    Validated { body, raw }: Validated<WasteAnalysisRequest>,
) -> Response {
    let waste = body
        .inventory_transactions
        .iter()
        .filter(|t| t.kind == TransactionKind::Waste)
        .count();
    debug!(
        transactions = body.inventory_transactions.len(),
        waste,
        "Waste analysis requested"
    );
    run_task(state, Task::WasteAnalysis, raw).await
}

// ═══════════════════════════════════════════════════════════════════════════
// Labor
// ═══════════════════════════════════════════════════════════════════════════

/// POST /api/labor/optimize-schedule
pub async fn optimize_schedule(
    State(state): State<Arc<AppState>>,
    Validated { body, raw }: Validated<ScheduleOptimizationRequest>,
) -> Response {
    debug!(
        employees = body.employees.len(),
        open_days = body.business_hours.days.len(),
        events = body.special_events.len(),
        "Schedule optimization requested"
    );
    run_task(state, Task::ScheduleOptimization, raw).await
}

/// POST /api/labor/predict-staffing
pub async fn predict_staffing(
    State(state): State<Arc<AppState>>,
    Validated { body, raw }: Validated<StaffingPredictionRequest>,
) -> Response {
    debug!(
        weeks = body.historical_data.len(),
        events = body.upcoming_events.len(),
        "Staffing prediction requested"
    );
    run_task(state, Task::StaffingPrediction, raw).await
}

/// POST /api/labor/analyze-costs
pub async fn analyze_labor_costs(
    State(state): State<Arc<AppState>>,
    Validated { body, raw }: Validated<LaborCostAnalysisRequest>,
) -> Response {
    debug!(weeks = body.schedules.len(), "Labor cost analysis requested");
    run_task(state, Task::LaborCostAnalysis, raw).await
}

// ═══════════════════════════════════════════════════════════════════════════
// Compliance
// ═══════════════════════════════════════════════════════════════════════════

/// POST /api/compliance/analyze-inspection
pub async fn analyze_inspection(
    State(state): State<Arc<AppState>>,
    Validated { body, raw }: Validated<InspectionAnalysisRequest>,
) -> Response {
    let critical = body
        .inspection
        .findings
        .iter()
        .filter(|f| f.severity == Severity::Critical)
        .count();
    debug!(
        findings = body.inspection.findings.len(),
        critical,
        history = body.historical_inspections.len(),
        "Inspection analysis requested"
    );
    run_task(state, Task::InspectionAnalysis, raw).await
}

/// POST /api/compliance/plan
pub async fn compliance_plan(
    State(state): State<Arc<AppState>>,
    Validated { body, raw }: Validated<CompliancePlanRequest>,
) -> Response {
    debug!(
        violations = body.violations.len(),
        tasks = body.tasks.len(),
        "Compliance plan requested"
    );
    run_task(state, Task::CompliancePlan, raw).await
}

/// POST /api/compliance/assess-risk
pub async fn assess_risk(
    State(state): State<Arc<AppState>>,
    Validated { body, raw }: Validated<RiskAssessmentRequest>,
) -> Response {
    debug!(
        score = ?body.inspection.score,
        violations = body.violations.len(),
        "Risk assessment requested"
    );
    run_task(state, Task::RiskAssessment, raw).await
}

// ═══════════════════════════════════════════════════════════════════════════
// Health
// ═══════════════════════════════════════════════════════════════════════════

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        coalesce_requests: state.config.coalesce_requests,
        in_flight: state.flights.in_flight(),
        cache: state.cache.stats(),
    })
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("Route {} not found", uri.path()))
}
