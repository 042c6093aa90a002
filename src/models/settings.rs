use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSettings {
    /// Rows per page for the trade listing.
    pub page_size: u32,
    /// Offset applied to `created_at` before taking the hour of day.
    pub utc_offset_minutes: i32,
    pub updated_at: i64,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            utc_offset_minutes: 0,
            updated_at: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSettingsInput {
    pub page_size: Option<u32>,
    pub utc_offset_minutes: Option<i32>,
}
