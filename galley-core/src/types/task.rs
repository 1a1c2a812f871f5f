//! Domains and the catalog of AI tasks Galley can run.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::GalleyError;

/// Restaurant domain a task belongs to.
///
/// The domain fixes the sampling temperature and the cache TTL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Menu planning and copy
    Menu,
    /// Stock levels and waste
    Inventory,
    /// Staff scheduling and cost
    Labor,
    /// Health inspections and violations
    Compliance,
}

impl Domain {
    /// All domains, in declaration order.
    pub const ALL: [Domain; 4] = [
        Domain::Menu,
        Domain::Inventory,
        Domain::Labor,
        Domain::Compliance,
    ];

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Menu => "menu",
            Domain::Inventory => "inventory",
            Domain::Labor => "labor",
            Domain::Compliance => "compliance",
        }
    }

    /// Sampling temperature for this domain's model profile.
    pub fn temperature(&self) -> f32 {
        match self {
            Domain::Menu => MENU_TEMPERATURE,
            Domain::Inventory => INVENTORY_TEMPERATURE,
            Domain::Labor => LABOR_TEMPERATURE,
            Domain::Compliance => COMPLIANCE_TEMPERATURE,
        }
    }

    /// How long a successful result for this domain stays cached.
    pub fn cache_ttl(&self) -> Duration {
        let secs = match self {
            Domain::Menu => MENU_CACHE_TTL_SECS,
            Domain::Inventory => INVENTORY_CACHE_TTL_SECS,
            Domain::Labor => LABOR_CACHE_TTL_SECS,
            Domain::Compliance => COMPLIANCE_CACHE_TTL_SECS,
        };
        Duration::from_secs(secs)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An AI operation.
///
/// Each task has a stable operation id (the cache-key prefix), a fixed task
/// description, the payload fields it forwards, and a fixed set of boolean
/// requirement flags sent along with the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    /// Suggest changes to a whole menu.
    MenuRecommendations,
    /// Improve a single menu item.
    MenuItemOptimization,
    /// Write marketing copy for a menu item.
    MenuItemDescription,
    /// Forecast stock needs.
    InventoryPrediction,
    /// Tune reorder points.
    ReorderOptimization,
    /// Find where stock is wasted.
    WasteAnalysis,
    /// Build a staff schedule.
    ScheduleOptimization,
    /// Forecast staffing levels.
    StaffingPrediction,
    /// Break down labor spend.
    LaborCostAnalysis,
    /// Review an inspection against history.
    InspectionAnalysis,
    /// Turn violations into a plan.
    CompliancePlan,
    /// Score compliance risk.
    RiskAssessment,
}

impl Task {
    /// Every task in the catalog.
    pub const ALL: [Task; 12] = [
        Task::MenuRecommendations,
        Task::MenuItemOptimization,
        Task::MenuItemDescription,
        Task::InventoryPrediction,
        Task::ReorderOptimization,
        Task::WasteAnalysis,
        Task::ScheduleOptimization,
        Task::StaffingPrediction,
        Task::LaborCostAnalysis,
        Task::InspectionAnalysis,
        Task::CompliancePlan,
        Task::RiskAssessment,
    ];

    /// Operation id; prefixes every cache key for this task.
    pub fn operation(&self) -> &'static str {
        match self {
            Task::MenuRecommendations => "menu_recommendations",
            Task::MenuItemOptimization => "menu_item_optimization",
            Task::MenuItemDescription => "menu_item_description",
            Task::InventoryPrediction => "inventory_prediction",
            Task::ReorderOptimization => "reorder_optimization",
            Task::WasteAnalysis => "waste_analysis",
            Task::ScheduleOptimization => "schedule_optimization",
            Task::StaffingPrediction => "staffing_prediction",
            Task::LaborCostAnalysis => "labor_cost_analysis",
            Task::InspectionAnalysis => "inspection_analysis",
            Task::CompliancePlan => "compliance_plan",
            Task::RiskAssessment => "risk_assessment",
        }
    }

    /// Domain the task belongs to.
    pub fn domain(&self) -> Domain {
        match self {
            Task::MenuRecommendations | Task::MenuItemOptimization | Task::MenuItemDescription => {
                Domain::Menu
            }
            Task::InventoryPrediction | Task::ReorderOptimization | Task::WasteAnalysis => {
                Domain::Inventory
            }
            Task::ScheduleOptimization | Task::StaffingPrediction | Task::LaborCostAnalysis => {
                Domain::Labor
            }
            Task::InspectionAnalysis | Task::CompliancePlan | Task::RiskAssessment => {
                Domain::Compliance
            }
        }
    }

    /// Task description placed at the top of the prompt.
    pub fn description(&self) -> &'static str {
        match self {
            Task::MenuRecommendations => "Generate menu recommendations",
            Task::MenuItemOptimization => "Optimize menu item",
            Task::MenuItemDescription => "Generate menu item description",
            Task::InventoryPrediction => "Predict inventory needs",
            Task::ReorderOptimization => "Optimize reorder points",
            Task::WasteAnalysis => "Analyze waste patterns",
            Task::ScheduleOptimization => "Optimize employee schedule",
            Task::StaffingPrediction => "Predict staffing needs",
            Task::LaborCostAnalysis => "Analyze labor costs",
            Task::InspectionAnalysis => "Analyze inspection results",
            Task::CompliancePlan => "Generate compliance plan",
            Task::RiskAssessment => "Assess compliance risk level",
        }
    }

    /// Request-body fields forwarded to the model, in prompt order.
    pub fn payload_fields(&self) -> &'static [&'static str] {
        match self {
            Task::MenuRecommendations => &["currentMenu", "customerPreferences", "seasonalIngredients"],
            Task::MenuItemOptimization | Task::MenuItemDescription => &["item"],
            Task::InventoryPrediction => {
                &["currentInventory", "historicalTransactions", "upcomingEvents"]
            }
            Task::ReorderOptimization => &["inventoryItems", "historicalUsage"],
            Task::WasteAnalysis => &["inventoryTransactions"],
            Task::ScheduleOptimization => {
                &["employees", "historicalData", "businessHours", "specialEvents"]
            }
            Task::StaffingPrediction => &["historicalData", "upcomingEvents", "businessMetrics"],
            Task::LaborCostAnalysis => &["schedules", "employeePerformance"],
            Task::InspectionAnalysis => &["inspection", "historicalInspections"],
            Task::CompliancePlan => &["violations", "tasks"],
            Task::RiskAssessment => &["inspection", "violations"],
        }
    }

    /// Requirement flags sent with every prompt for this task (all `true`).
    pub fn requirements(&self) -> &'static [&'static str] {
        match self {
            Task::MenuRecommendations => &[
                "considerSeasonality",
                "maintainPriceRange",
                "balanceNutrition",
                "considerAllergens",
            ],
            Task::MenuItemOptimization => &[
                "improveNutrition",
                "enhanceFlavor",
                "reduceCost",
                "maintainQuality",
            ],
            Task::MenuItemDescription => &[
                "highlightKeyIngredients",
                "emphasizeUniqueFeatures",
                "includeNutritionalBenefits",
                "maintainAppeal",
            ],
            Task::InventoryPrediction => &[
                "considerSeasonality",
                "accountForEvents",
                "optimizeStockLevels",
                "minimizeWaste",
            ],
            Task::ReorderOptimization => &[
                "preventStockouts",
                "minimizeHoldingCosts",
                "considerLeadTimes",
                "accountForVariability",
            ],
            Task::WasteAnalysis => &[
                "identifyWasteCauses",
                "suggestReductionStrategies",
                "optimizeOrdering",
                "improveStorage",
            ],
            Task::ScheduleOptimization => &[
                "minimizeLaborCosts",
                "maintainServiceQuality",
                "respectEmployeePreferences",
                "handleSpecialEvents",
            ],
            Task::StaffingPrediction => &[
                "considerSeasonality",
                "accountForEvents",
                "optimizeCosts",
                "maintainServiceLevels",
            ],
            Task::LaborCostAnalysis => &[
                "identifyCostDrivers",
                "suggestOptimizations",
                "considerProductivity",
                "maintainQuality",
            ],
            Task::InspectionAnalysis => &[
                "identifyTrends",
                "suggestImprovements",
                "prioritizeIssues",
                "recommendActions",
            ],
            Task::CompliancePlan => &[
                "prioritizeViolations",
                "createActionableTasks",
                "setRealisticTimelines",
                "ensureCompliance",
            ],
            Task::RiskAssessment => &[
                "evaluateSeverity",
                "considerFrequency",
                "assessImpact",
                "recommendMitigation",
            ],
        }
    }

    /// Message used when a handler fails in an unexpected way.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Task::MenuRecommendations => "Failed to generate menu recommendations",
            Task::MenuItemOptimization => "Failed to optimize menu item",
            Task::MenuItemDescription => "Failed to generate menu item description",
            Task::InventoryPrediction => "Failed to predict inventory needs",
            Task::ReorderOptimization => "Failed to optimize reorder points",
            Task::WasteAnalysis => "Failed to analyze waste patterns",
            Task::ScheduleOptimization => "Failed to optimize schedule",
            Task::StaffingPrediction => "Failed to predict staffing needs",
            Task::LaborCostAnalysis => "Failed to analyze labor costs",
            Task::InspectionAnalysis => "Failed to analyze inspection results",
            Task::CompliancePlan => "Failed to generate compliance plan",
            Task::RiskAssessment => "Failed to assess compliance risk",
        }
    }

    /// Cache TTL, inherited from the domain.
    pub fn cache_ttl(&self) -> Duration {
        self.domain().cache_ttl()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation())
    }
}

impl FromStr for Task {
    type Err = GalleyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Task::ALL
            .iter()
            .copied()
            .find(|t| t.operation() == wanted)
            .ok_or_else(|| GalleyError::UnknownTask(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use test_case::test_case;

    #[test_case(Domain::Menu, 0.7, 3600 ; "menu")]
    #[test_case(Domain::Inventory, 0.3, 1800 ; "inventory")]
    #[test_case(Domain::Labor, 0.5, 3600 ; "labor")]
    #[test_case(Domain::Compliance, 0.2, 7200 ; "compliance")]
    fn test_domain_policy(domain: Domain, temperature: f32, ttl_secs: u64) {
        assert!((domain.temperature() - temperature).abs() < f32::EPSILON);
        assert_eq!(domain.cache_ttl(), Duration::from_secs(ttl_secs));
    }

    #[test]
    fn test_operation_ids_are_unique() {
        let ids: HashSet<_> = Task::ALL.iter().map(|t| t.operation()).collect();
        assert_eq!(ids.len(), Task::ALL.len());
    }

    #[test]
    fn test_every_task_has_four_requirements() {
        for task in Task::ALL {
            assert_eq!(task.requirements().len(), 4, "{}", task);
            assert!(!task.payload_fields().is_empty(), "{}", task);
        }
    }

    #[test]
    fn test_three_tasks_per_domain() {
        for domain in Domain::ALL {
            let count = Task::ALL.iter().filter(|t| t.domain() == domain).count();
            assert_eq!(count, 3, "{}", domain);
        }
    }

    #[test_case("inventory_prediction", Task::InventoryPrediction ; "exact")]
    #[test_case("Schedule-Optimization", Task::ScheduleOptimization ; "kebab and case")]
    #[test_case(" risk_assessment ", Task::RiskAssessment ; "padded")]
    fn test_parse_task(input: &str, expected: Task) {
        assert_eq!(input.parse::<Task>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_task() {
        let err = "bake_bread".parse::<Task>().unwrap_err();
        assert!(matches!(err, GalleyError::UnknownTask(_)));
    }

    #[test]
    fn test_task_ttl_follows_domain() {
        assert_eq!(Task::InspectionAnalysis.cache_ttl(), Duration::from_secs(7200));
        assert_eq!(Task::InventoryPrediction.cache_ttl(), Duration::from_secs(1800));
    }
}
