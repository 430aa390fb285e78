//! Centralized game rules and tuning constants for Wayfare.
//!
//! Defaults for [`crate::config::GameConfig`] live here so a change to the
//! rules shows up in one reviewed place.

// Budget --------------------------------------------------------------------
pub const DEFAULT_BUDGET_LIMIT: f64 = 1_000.0;

// Discovery -----------------------------------------------------------------
pub const DEFAULT_WINDOW_MONTHS: u32 = 3;
pub const DISCOVERY_DESTINATION: &str = "anywhere";
pub const DISCOVERY_TRIP_TYPE: &str = "single";
/// Headings at or beyond this many degrees count as backtracking.
pub const FORWARD_HEMISPHERE_DEGREES: f64 = 180.0;

// Achievements --------------------------------------------------------------
pub const DEFAULT_MILESTONES: [u32; 2] = [5, 10];
pub const DEFAULT_NOTIFICATION_TTL_MS: u64 = 5_000;

// Driver --------------------------------------------------------------------
pub const DEFAULT_STALL_AFTER_MS: u64 = 10_000;

// Map -----------------------------------------------------------------------
pub const DEFAULT_ORIGIN_ZOOM: u8 = 4;

// Leaderboard ---------------------------------------------------------------
pub const LEADERBOARD_WON_PATH: &str = "game/won";
pub const LEADERBOARD_TOP_PATH: &str = "game/top";
pub const STOP_SEPARATOR: &str = ",";

// Query parameters ----------------------------------------------------------
pub(crate) const QUERY_DATE: &str = "date";
pub(crate) const QUERY_REGION: &str = "region";
