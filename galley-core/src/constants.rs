//! Deployment constants for Galley.
//!
//! TTLs and temperatures here are policy, not algorithm. Every one of them can
//! be overridden through configuration except the per-domain temperatures.

// ═══════════════════════════════════════════════════════════════════════════════
// MODEL PROVIDER
// ═══════════════════════════════════════════════════════════════════════════════

/// Chat-completions endpoint used when none is configured.
pub const DEFAULT_AI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Model name shared by every domain profile.
pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";

/// Token cap shared by every domain profile.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Sampling temperature for menu work (creative).
pub const MENU_TEMPERATURE: f32 = 0.7;

/// Sampling temperature for inventory prediction.
pub const INVENTORY_TEMPERATURE: f32 = 0.3;

/// Sampling temperature for labor scheduling.
pub const LABOR_TEMPERATURE: f32 = 0.5;

/// Sampling temperature for compliance analysis (most conservative).
pub const COMPLIANCE_TEMPERATURE: f32 = 0.2;

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE POLICY
// ═══════════════════════════════════════════════════════════════════════════════

/// TTL applied when a write does not name one (1 hour).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Interval between background sweeps of expired entries (10 minutes).
pub const DEFAULT_CACHE_CHECK_PERIOD_SECS: u64 = 600;

/// Upper bound on live cache entries.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;

/// TTL for cached menu results (1 hour).
pub const MENU_CACHE_TTL_SECS: u64 = 3600;

/// TTL for cached inventory results (30 minutes).
pub const INVENTORY_CACHE_TTL_SECS: u64 = 1800;

/// TTL for cached labor results (1 hour).
pub const LABOR_CACHE_TTL_SECS: u64 = 3600;

/// TTL for cached compliance results (2 hours).
pub const COMPLIANCE_CACHE_TTL_SECS: u64 = 7200;

// ═══════════════════════════════════════════════════════════════════════════════
// RATE LIMITING
// ═══════════════════════════════════════════════════════════════════════════════

/// Requests allowed per client address in one window.
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 100;

/// Length of a rate-limit window (15 minutes).
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;

/// Message returned with every rate-limit rejection.
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again later.";
