use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Unix milliseconds, UTC.
pub type Timestamp = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Task {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResetMode {
    /// Every task in the category resets together at the section timestamp.
    Shared,
    /// Each completed task carries its own expiry.
    PerTask,
}

/// When a category's completion state clears. Times are "HH:MM" 24h UTC.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResetPolicy {
    Daily {
        #[serde(default = "default_reset_time")]
        time: String,
    },
    WeeklyFixedDay {
        #[serde(default = "default_reset_time")]
        time: String,
        day_of_week: String,
    },
    WeeklyAfterCompletion,
    Monthly {
        #[serde(default = "default_reset_time")]
        time: String,
        day_of_month: u8,
    },
    /// Unrecognized kinds from older configs keep working as daily resets.
    #[serde(other)]
    Unknown,
}

fn default_reset_time() -> String {
    "00:00".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Category {
    pub title: String,
    pub storage_key: String,
    pub reset: ResetPolicy,
    #[serde(default = "default_reset_mode")]
    pub reset_mode: ResetMode,
    pub tasks: Vec<Task>,
}

fn default_reset_mode() -> ResetMode {
    ResetMode::Shared
}

impl Category {
    pub fn checked_items_key(&self) -> String {
        format!("{}_checkedItems", self.storage_key)
    }

    pub fn reset_time_key(&self) -> String {
        format!("{}_resetTime", self.storage_key)
    }
}

/// Which tasks are currently completed. Shared sections only record
/// membership; per-task sections record when each completion expires.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionRecord {
    Shared(BTreeSet<String>),
    PerTask(BTreeMap<String, Timestamp>),
}

impl CompletionRecord {
    pub fn empty(mode: ResetMode) -> Self {
        match mode {
            ResetMode::Shared => Self::Shared(BTreeSet::new()),
            ResetMode::PerTask => Self::PerTask(BTreeMap::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Shared(ids) => ids.is_empty(),
            Self::PerTask(entries) => entries.is_empty(),
        }
    }

    pub fn is_checked(&self, task_id: &str) -> bool {
        match self {
            Self::Shared(ids) => ids.contains(task_id),
            Self::PerTask(entries) => entries.contains_key(task_id),
        }
    }

    pub fn expiry(&self, task_id: &str) -> Option<Timestamp> {
        match self {
            Self::Shared(_) => None,
            Self::PerTask(entries) => entries.get(task_id).copied(),
        }
    }

    pub fn uncheck(&mut self, task_id: &str) -> bool {
        match self {
            Self::Shared(ids) => ids.remove(task_id),
            Self::PerTask(entries) => entries.remove(task_id).is_some(),
        }
    }

    /// Ids whose recorded expiry is at or before `now`. Shared records
    /// never expire individually.
    pub fn expired_ids(&self, now: Timestamp) -> Vec<String> {
        match self {
            Self::Shared(_) => Vec::new(),
            Self::PerTask(entries) => entries
                .iter()
                .filter(|(_, expiry)| **expiry <= now)
                .map(|(id, _)| id.clone())
                .collect(),
        }
    }

    /// Storage form: shared records serialize as an id array, per-task
    /// records as an id-to-expiry object.
    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            Self::Shared(ids) => serde_json::to_string(ids),
            Self::PerTask(entries) => serde_json::to_string(entries),
        }
    }

    pub fn from_json(mode: ResetMode, raw: &str) -> serde_json::Result<Self> {
        match mode {
            ResetMode::Shared => Ok(Self::Shared(serde_json::from_str(raw)?)),
            ResetMode::PerTask => Ok(Self::PerTask(serde_json::from_str(raw)?)),
        }
    }
}

/// Read-only row handed to the presentation layer.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct TaskView {
    pub id: String,
    pub name: String,
    pub checked: bool,
    /// Milliseconds until this task unchecks itself; per-task sections only.
    pub remaining: Option<Timestamp>,
}
