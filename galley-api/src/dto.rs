//! Request schemas.
//!
//! Each AI route has a typed schema. A body is accepted only if it
//! deserializes into the schema and passes [`Validate`]. Unknown fields are
//! ignored. The schema is used for checking only; the handler forwards and
//! fingerprints the body exactly as received.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Post-deserialization checks that types alone cannot express.
pub trait Validate {
    /// Returns a message naming the offending field on failure.
    fn validate(&self) -> Result<(), String>;
}

fn check_datetime(field: &str, value: &str) -> Result<(), String> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|_| ())
        .map_err(|_| format!("{}: invalid datetime '{}'", field, value))
}

fn check_score(field: &str, score: Option<f64>) -> Result<(), String> {
    match score {
        Some(s) if !(0.0..=100.0).contains(&s) => {
            Err(format!("{}: score must be between 0 and 100, got {}", field, s))
        }
        _ => Ok(()),
    }
}

fn check_each<T: Validate>(field: &str, items: &[T]) -> Result<(), String> {
    for (i, item) in items.iter().enumerate() {
        item.validate().map_err(|e| format!("{}[{}].{}", field, i, e))?;
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// Shared enums
// ═══════════════════════════════════════════════════════════════════════════

/// Kind of stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Delivery received
    Received,
    /// Used in preparation
    Used,
    /// Thrown away
    Waste,
    /// Manual correction
    Adjustment,
}

/// Severity of an inspection finding or violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Minor
    Minor,
    /// Major
    Major,
    /// Critical
    Critical,
}

/// Priority of a compliance task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low
    Low,
    /// Medium
    Medium,
    /// High
    High,
    /// Critical
    Critical,
}

// ═══════════════════════════════════════════════════════════════════════════
// Menu
// ═══════════════════════════════════════════════════════════════════════════

/// Nutrition facts for a menu item.
#[derive(Debug, Deserialize)]
pub struct NutritionDto {
    /// kcal
    pub calories: f64,
    /// grams
    pub protein: f64,
    /// grams
    pub carbs: f64,
    /// grams
    pub fats: f64,
}

/// A menu item.
#[derive(Debug, Deserialize)]
pub struct MenuItemDto {
    /// Display name
    pub name: String,
    /// Menu copy
    pub description: String,
    /// Price
    pub price: f64,
    /// Category
    pub category: String,
    /// Allergens
    pub allergens: Vec<String>,
    /// Nutrition facts
    pub nutritional_info: NutritionDto,
}

/// Price bounds a customer is comfortable with.
#[derive(Debug, Deserialize)]
pub struct PriceRangeDto {
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
}

/// Aggregated customer preferences.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPreferencesDto {
    /// Dietary restrictions
    pub dietary_restrictions: Option<Vec<String>>,
    /// Price range
    pub price_range: Option<PriceRangeDto>,
    /// Favorite categories
    pub favorite_categories: Option<Vec<String>>,
}

/// Body of `POST /api/menu/recommendations`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuRecommendationsRequest {
    /// Current menu
    pub current_menu: Vec<MenuItemDto>,
    /// Customer preferences
    pub customer_preferences: CustomerPreferencesDto,
    /// Ingredients in season
    pub seasonal_ingredients: Vec<String>,
}

impl Validate for MenuRecommendationsRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Body of `POST /api/menu/optimize-item` and `POST /api/menu/describe-item`.
#[derive(Debug, Deserialize)]
pub struct MenuItemRequest {
    /// The item
    pub item: MenuItemDto,
}

impl Validate for MenuItemRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Inventory
// ═══════════════════════════════════════════════════════════════════════════

/// A stocked item.
#[derive(Debug, Deserialize)]
pub struct InventoryItemDto {
    /// Name
    pub name: String,
    /// Stock-keeping unit
    pub sku: String,
    /// On hand
    pub quantity: f64,
    /// Reorder threshold
    pub reorder_point: f64,
    /// Target level
    pub optimal_quantity: f64,
}

/// A stock movement.
#[derive(Debug, Deserialize)]
pub struct TransactionDto {
    /// Movement kind
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Amount moved
    pub quantity: f64,
    /// When it happened (RFC 3339)
    pub transaction_date: String,
}

impl Validate for TransactionDto {
    fn validate(&self) -> Result<(), String> {
        check_datetime("transaction_date", &self.transaction_date)
    }
}

/// An event that may change demand.
#[derive(Debug, Deserialize)]
pub struct UpcomingEventDto {
    /// When (RFC 3339)
    pub date: String,
    /// Event type
    #[serde(rename = "type")]
    pub kind: String,
    /// Expected head count
    pub expected_attendance: Option<f64>,
}

impl Validate for UpcomingEventDto {
    fn validate(&self) -> Result<(), String> {
        check_datetime("date", &self.date)
    }
}

/// Body of `POST /api/inventory/predict`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryPredictionRequest {
    /// Current stock
    pub current_inventory: Vec<InventoryItemDto>,
    /// Past movements
    pub historical_transactions: Vec<TransactionDto>,
    /// Upcoming events
    pub upcoming_events: Vec<UpcomingEventDto>,
}

impl Validate for InventoryPredictionRequest {
    fn validate(&self) -> Result<(), String> {
        check_each("historicalTransactions", &self.historical_transactions)?;
        check_each("upcomingEvents", &self.upcoming_events)
    }
}

/// Body of `POST /api/inventory/optimize-reorder-points`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderOptimizationRequest {
    /// Items to tune
    pub inventory_items: Vec<InventoryItemDto>,
    /// Past usage
    pub historical_usage: Vec<TransactionDto>,
}

impl Validate for ReorderOptimizationRequest {
    fn validate(&self) -> Result<(), String> {
        check_each("historicalUsage", &self.historical_usage)
    }
}

/// Body of `POST /api/inventory/analyze-waste`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteAnalysisRequest {
    /// Movements to analyze
    pub inventory_transactions: Vec<TransactionDto>,
}

impl Validate for WasteAnalysisRequest {
    fn validate(&self) -> Result<(), String> {
        check_each("inventoryTransactions", &self.inventory_transactions)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Labor
// ═══════════════════════════════════════════════════════════════════════════

/// A block of availability.
#[derive(Debug, Deserialize)]
pub struct TimeSlotDto {
    /// Start (HH:mm)
    pub start: String,
    /// End (HH:mm)
    pub end: String,
}

/// An employee.
#[derive(Debug, Deserialize)]
pub struct EmployeeDto {
    /// Employee id (UUID)
    pub id: String,
    /// Name
    pub name: String,
    /// Role
    pub role: String,
    /// Day of week → available slots
    pub availability: HashMap<String, Vec<TimeSlotDto>>,
}

impl Validate for EmployeeDto {
    fn validate(&self) -> Result<(), String> {
        uuid::Uuid::parse_str(&self.id)
            .map(|_| ())
            .map_err(|_| format!("id: invalid uuid '{}'", self.id))
    }
}

/// Summary of one past week.
#[derive(Debug, Deserialize)]
pub struct ScheduleSummaryDto {
    /// Monday of the week (RFC 3339)
    pub week_start_date: String,
    /// Hours worked
    pub total_hours: f64,
    /// Labor cost
    pub total_cost: f64,
}

impl Validate for ScheduleSummaryDto {
    fn validate(&self) -> Result<(), String> {
        check_datetime("week_start_date", &self.week_start_date)
    }
}

/// Opening hours.
#[derive(Debug, Deserialize)]
pub struct BusinessHoursDto {
    /// Opening time
    pub open: String,
    /// Closing time
    pub close: String,
    /// Days open
    pub days: Vec<String>,
}

/// A special event needing extra staff.
#[derive(Debug, Deserialize)]
pub struct SpecialEventDto {
    /// When (RFC 3339)
    pub date: String,
    /// Event type
    #[serde(rename = "type")]
    pub kind: String,
    /// Expected head count
    pub expected_attendance: f64,
}

impl Validate for SpecialEventDto {
    fn validate(&self) -> Result<(), String> {
        check_datetime("date", &self.date)
    }
}

/// Body of `POST /api/labor/optimize-schedule`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOptimizationRequest {
    /// Staff
    pub employees: Vec<EmployeeDto>,
    /// Past weeks
    pub historical_data: Vec<ScheduleSummaryDto>,
    /// Opening hours
    pub business_hours: BusinessHoursDto,
    /// Special events
    pub special_events: Vec<SpecialEventDto>,
}

impl Validate for ScheduleOptimizationRequest {
    fn validate(&self) -> Result<(), String> {
        check_each("employees", &self.employees)?;
        check_each("historicalData", &self.historical_data)?;
        check_each("specialEvents", &self.special_events)
    }
}

/// Body of `POST /api/labor/predict-staffing`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffingPredictionRequest {
    /// Past weeks
    pub historical_data: Vec<ScheduleSummaryDto>,
    /// Upcoming events
    pub upcoming_events: Vec<UpcomingEventDto>,
    /// Free-form business metrics
    pub business_metrics: Map<String, Value>,
}

impl Validate for StaffingPredictionRequest {
    fn validate(&self) -> Result<(), String> {
        check_each("historicalData", &self.historical_data)?;
        check_each("upcomingEvents", &self.upcoming_events)
    }
}

/// Body of `POST /api/labor/analyze-costs`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaborCostAnalysisRequest {
    /// Past weeks
    pub schedules: Vec<ScheduleSummaryDto>,
    /// Free-form performance data
    pub employee_performance: Map<String, Value>,
}

impl Validate for LaborCostAnalysisRequest {
    fn validate(&self) -> Result<(), String> {
        check_each("schedules", &self.schedules)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Compliance
// ═══════════════════════════════════════════════════════════════════════════

/// A finding on the inspection being analyzed.
#[derive(Debug, Deserialize)]
pub struct FindingDto {
    /// Category
    pub category: String,
    /// What was found
    pub description: String,
    /// Severity
    pub severity: Severity,
}

/// The inspection being analyzed.
#[derive(Debug, Deserialize)]
pub struct InspectionDto {
    /// Inspection type
    #[serde(rename = "type")]
    pub kind: String,
    /// When (RFC 3339)
    pub date: String,
    /// Score out of 100
    pub score: Option<f64>,
    /// Findings
    pub findings: Vec<FindingDto>,
}

impl Validate for InspectionDto {
    fn validate(&self) -> Result<(), String> {
        check_datetime("date", &self.date)?;
        check_score("score", self.score)
    }
}

/// A finding on a past inspection.
#[derive(Debug, Deserialize)]
pub struct PastFindingDto {
    /// Category
    pub category: String,
    /// Severity
    pub severity: Severity,
}

/// A past inspection.
#[derive(Debug, Deserialize)]
pub struct PastInspectionDto {
    /// When (RFC 3339)
    pub date: String,
    /// Score out of 100
    pub score: Option<f64>,
    /// Findings
    pub findings: Vec<PastFindingDto>,
}

impl Validate for PastInspectionDto {
    fn validate(&self) -> Result<(), String> {
        check_datetime("date", &self.date)?;
        check_score("score", self.score)
    }
}

/// Body of `POST /api/compliance/analyze-inspection`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionAnalysisRequest {
    /// Inspection to analyze
    pub inspection: InspectionDto,
    /// Earlier inspections
    pub historical_inspections: Vec<PastInspectionDto>,
}

impl Validate for InspectionAnalysisRequest {
    fn validate(&self) -> Result<(), String> {
        self.inspection.validate().map_err(|e| format!("inspection.{}", e))?;
        check_each("historicalInspections", &self.historical_inspections)
    }
}

/// An open violation.
#[derive(Debug, Deserialize)]
pub struct ViolationDto {
    /// Violation type
    #[serde(rename = "type")]
    pub kind: String,
    /// Description
    pub description: String,
    /// Severity
    pub severity: Severity,
    /// Resolution deadline (RFC 3339)
    pub due_date: String,
}

impl Validate for ViolationDto {
    fn validate(&self) -> Result<(), String> {
        check_datetime("due_date", &self.due_date)
    }
}

/// A recurring compliance task.
#[derive(Debug, Deserialize)]
pub struct ComplianceTaskDto {
    /// Title
    pub title: String,
    /// Category
    pub category: String,
    /// Priority
    pub priority: Priority,
    /// Deadline (RFC 3339)
    pub due_date: String,
}

impl Validate for ComplianceTaskDto {
    fn validate(&self) -> Result<(), String> {
        check_datetime("due_date", &self.due_date)
    }
}

/// Body of `POST /api/compliance/plan`.
#[derive(Debug, Deserialize)]
pub struct CompliancePlanRequest {
    /// Open violations
    pub violations: Vec<ViolationDto>,
    /// Existing tasks
    pub tasks: Vec<ComplianceTaskDto>,
}

impl Validate for CompliancePlanRequest {
    fn validate(&self) -> Result<(), String> {
        check_each("violations", &self.violations)?;
        check_each("tasks", &self.tasks)
    }
}

/// Body of `POST /api/compliance/assess-risk`.
#[derive(Debug, Deserialize)]
pub struct RiskAssessmentRequest {
    /// Latest inspection
    pub inspection: InspectionDto,
    /// Open violations
    pub violations: Vec<ViolationDto>,
}

impl Validate for RiskAssessmentRequest {
    fn validate(&self) -> Result<(), String> {
        self.inspection.validate().map_err(|e| format!("inspection.{}", e))?;
        check_each("violations", &self.violations)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Responses
// ═══════════════════════════════════════════════════════════════════════════

/// Response for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "ok"
    pub status: String,
    /// Crate version
    pub version: String,
    /// Seconds since the server state was built
    pub uptime_seconds: u64,
    /// Whether concurrent identical requests are coalesced
    pub coalesce_requests: bool,
    /// Upstream calls currently shared by waiting requests
    pub in_flight: usize,
    /// Cache statistics
    pub cache: galley_cache::CacheStats,
}
