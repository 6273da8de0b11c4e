use serde::{Deserialize, Serialize};

use crate::models::Category;

/// The static checklist document: four categories, loaded once. Section
/// content and policies are data, not code; only the section set itself
/// is fixed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ChecklistConfig {
    pub daily: Category,
    pub weekly: WeeklyConfig,
    pub monthly: Category,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct WeeklyConfig {
    pub fixed_day: Category,
    pub after_completion: Category,
}

impl ChecklistConfig {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Categories in display order.
    pub fn categories(&self) -> Vec<Category> {
        vec![
            self.daily.clone(),
            self.weekly.fixed_day.clone(),
            self.weekly.after_completion.clone(),
            self.monthly.clone(),
        ]
    }
}
