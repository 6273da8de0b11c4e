use crate::models::{Category, CompletionRecord, ResetMode, TaskView, Timestamp};
use crate::reset::{next_reset_time, ConfigError};
use crate::store::{KvStore, StoreError};

#[derive(Debug)]
pub enum ChecklistError {
    Config(ConfigError),
    Store(StoreError),
}

impl std::fmt::Display for ChecklistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChecklistError::Config(err) => write!(f, "configuration error: {err}"),
            ChecklistError::Store(err) => write!(f, "storage error: {err}"),
        }
    }
}

impl std::error::Error for ChecklistError {}

impl From<ConfigError> for ChecklistError {
    fn from(value: ConfigError) -> Self {
        ChecklistError::Config(value)
    }
}

impl From<StoreError> for ChecklistError {
    fn from(value: StoreError) -> Self {
        ChecklistError::Store(value)
    }
}

impl From<serde_json::Error> for ChecklistError {
    fn from(value: serde_json::Error) -> Self {
        ChecklistError::Store(StoreError::Json(value))
    }
}

/// One category's live state: the completion record plus, for shared
/// sections, the timestamp at which everything unchecks. Every mutation
/// is written to the store before it lands in memory.
#[derive(Debug)]
pub struct SectionState {
    category: Category,
    record: CompletionRecord,
    reset_at: Option<Timestamp>,
}

impl SectionState {
    /// Reads persisted state, degrading unreadable values to empty. A
    /// shared section with no stored reset timestamp computes and
    /// persists one right away; a bad policy fails here, at load.
    pub fn load<S: KvStore>(
        store: &mut S,
        category: Category,
        now: Timestamp,
    ) -> Result<Self, ChecklistError> {
        // Validates the policy even for sections that won't need a
        // timestamp until the first toggle.
        let next = next_reset_time(&category.reset, now)?;

        let record = match store.get(&category.checked_items_key()) {
            None => CompletionRecord::empty(category.reset_mode),
            Some(raw) => CompletionRecord::from_json(category.reset_mode, &raw).unwrap_or_else(
                |err| {
                    log::warn!(
                        "discarding unreadable completion record key={} err={err}",
                        category.storage_key
                    );
                    CompletionRecord::empty(category.reset_mode)
                },
            ),
        };

        let reset_at = match category.reset_mode {
            ResetMode::PerTask => None,
            ResetMode::Shared => {
                let stored = store
                    .get(&category.reset_time_key())
                    .and_then(|raw| raw.trim().parse::<Timestamp>().ok());
                match stored {
                    Some(at) => Some(at),
                    None => {
                        store.set(&category.reset_time_key(), &next.to_string())?;
                        log::debug!(
                            "initialized reset timestamp key={} reset_at={next}",
                            category.storage_key
                        );
                        Some(next)
                    }
                }
            }
        };

        Ok(Self {
            category,
            record,
            reset_at,
        })
    }

    pub fn storage_key(&self) -> &str {
        &self.category.storage_key
    }

    pub fn title(&self) -> &str {
        &self.category.title
    }

    pub fn reset_mode(&self) -> ResetMode {
        self.category.reset_mode
    }

    /// Level-triggered reset check; returns whether anything changed.
    /// Shared sections clear wholesale once `now` reaches the section
    /// timestamp; per-task sections drop entries whose expiry passed.
    pub fn tick<S: KvStore>(&mut self, store: &mut S, now: Timestamp) -> Result<bool, ChecklistError> {
        match self.category.reset_mode {
            ResetMode::Shared => {
                let Some(reset_at) = self.reset_at else {
                    return Ok(false);
                };
                if now < reset_at {
                    return Ok(false);
                }
                let next = next_reset_time(&self.category.reset, now)?;
                let cleared = CompletionRecord::empty(ResetMode::Shared);
                store.set(&self.category.checked_items_key(), &cleared.to_json()?)?;
                store.set(&self.category.reset_time_key(), &next.to_string())?;
                self.record = cleared;
                self.reset_at = Some(next);
                log::info!(
                    "section reset fired key={} next_reset_at={next}",
                    self.category.storage_key
                );
                Ok(true)
            }
            ResetMode::PerTask => {
                let expired = self.record.expired_ids(now);
                if expired.is_empty() {
                    return Ok(false);
                }
                let mut next = self.record.clone();
                for id in &expired {
                    next.uncheck(id);
                }
                store.set(&self.category.checked_items_key(), &next.to_json()?)?;
                self.record = next;
                log::debug!(
                    "expired {} completion(s) key={}",
                    expired.len(),
                    self.category.storage_key
                );
                Ok(true)
            }
        }
    }

    /// Flips one task's completion. Checking a per-task entry stamps a
    /// fresh expiry; unchecking just removes the entry. Unknown ids are
    /// a no-op.
    pub fn toggle<S: KvStore>(
        &mut self,
        store: &mut S,
        task_id: &str,
        now: Timestamp,
    ) -> Result<bool, ChecklistError> {
        if !self.category.tasks.iter().any(|task| task.id == task_id) {
            log::debug!(
                "toggle for unknown task id={task_id} key={}",
                self.category.storage_key
            );
            return Ok(false);
        }

        let mut next = self.record.clone();
        if next.is_checked(task_id) {
            next.uncheck(task_id);
        } else {
            match &mut next {
                CompletionRecord::Shared(ids) => {
                    ids.insert(task_id.to_string());
                }
                CompletionRecord::PerTask(entries) => {
                    let expiry = next_reset_time(&self.category.reset, now)?;
                    entries.insert(task_id.to_string(), expiry);
                }
            }
        }
        store.set(&self.category.checked_items_key(), &next.to_json()?)?;
        self.record = next;
        Ok(true)
    }

    pub fn is_checked(&self, task_id: &str) -> bool {
        self.record.is_checked(task_id)
    }

    /// Milliseconds until the shared reset fires. `None` for per-task
    /// sections or before a timestamp exists; never negative.
    pub fn remaining(&self, now: Timestamp) -> Option<Timestamp> {
        match self.category.reset_mode {
            ResetMode::Shared => self.reset_at.map(|at| (at - now).max(0)),
            ResetMode::PerTask => None,
        }
    }

    /// Milliseconds until one task's completion expires. `None` unless
    /// the section is per-task and the task is checked; never negative.
    pub fn task_remaining(&self, task_id: &str, now: Timestamp) -> Option<Timestamp> {
        self.record.expiry(task_id).map(|at| (at - now).max(0))
    }

    /// Rows for the presentation layer, in configuration order.
    pub fn task_views(&self, now: Timestamp) -> Vec<TaskView> {
        self.category
            .tasks
            .iter()
            .map(|task| TaskView {
                id: task.id.clone(),
                name: task.name.clone(),
                checked: self.record.is_checked(&task.id),
                remaining: self.task_remaining(&task.id, now),
            })
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn record(&self) -> &CompletionRecord {
        &self.record
    }

    #[cfg(test)]
    pub(crate) fn reset_at(&self) -> Option<Timestamp> {
        self.reset_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResetPolicy, Task};
    use crate::store::MemoryStore;

    const HOUR_MS: Timestamp = 60 * 60 * 1000;
    const DAY_MS: Timestamp = 24 * HOUR_MS;

    fn make_category(mode: ResetMode, reset: ResetPolicy) -> Category {
        Category {
            title: "Test Tasks".to_string(),
            storage_key: "testTasks".to_string(),
            reset,
            reset_mode: mode,
            tasks: vec![
                Task {
                    id: "a".to_string(),
                    name: "Task A".to_string(),
                },
                Task {
                    id: "b".to_string(),
                    name: "Task B".to_string(),
                },
            ],
        }
    }

    fn shared_daily() -> Category {
        make_category(
            ResetMode::Shared,
            ResetPolicy::Daily {
                time: "00:00".to_string(),
            },
        )
    }

    fn per_task_weekly() -> Category {
        make_category(ResetMode::PerTask, ResetPolicy::WeeklyAfterCompletion)
    }

    // 2026-03-04 10:00:00 UTC.
    const NOW: Timestamp = 1_772_618_400_000;

    #[test]
    fn fresh_shared_load_computes_and_persists_reset_timestamp() {
        let mut store = MemoryStore::new();
        let section = SectionState::load(&mut store, shared_daily(), NOW).unwrap();

        let reset_at = section.reset_at().expect("shared section has a timestamp");
        assert!(reset_at > NOW);
        assert_eq!(
            store.get("testTasks_resetTime"),
            Some(reset_at.to_string())
        );
        assert!(section.record().is_empty());
    }

    #[test]
    fn load_reuses_persisted_reset_timestamp() {
        let mut store = MemoryStore::new();
        let stored = NOW + 5 * HOUR_MS;
        store.set("testTasks_resetTime", &stored.to_string()).unwrap();

        let section = SectionState::load(&mut store, shared_daily(), NOW).unwrap();
        assert_eq!(section.reset_at(), Some(stored));
    }

    #[test]
    fn load_recovers_from_corrupt_persisted_state() {
        let mut store = MemoryStore::new();
        store.set("testTasks_checkedItems", "{ not json").unwrap();
        store.set("testTasks_resetTime", "eleven").unwrap();

        let section = SectionState::load(&mut store, shared_daily(), NOW).unwrap();
        assert!(section.record().is_empty());
        // A garbage timestamp counts as absent and is recomputed.
        assert!(section.reset_at().unwrap() > NOW);
    }

    #[test]
    fn load_restores_checked_items() {
        let mut store = MemoryStore::new();
        store.set("testTasks_checkedItems", r#"["b"]"#).unwrap();

        let section = SectionState::load(&mut store, shared_daily(), NOW).unwrap();
        assert!(!section.is_checked("a"));
        assert!(section.is_checked("b"));
    }

    #[test]
    fn load_fails_fast_on_malformed_policy() {
        let mut store = MemoryStore::new();
        let category = make_category(
            ResetMode::PerTask,
            ResetPolicy::WeeklyFixedDay {
                time: "00:00".to_string(),
                day_of_week: "Caturday".to_string(),
            },
        );
        let err = SectionState::load(&mut store, category, NOW).unwrap_err();
        assert!(matches!(err, ChecklistError::Config(_)));
    }

    #[test]
    fn toggle_twice_restores_the_exact_prior_record() {
        let mut store = MemoryStore::new();
        let mut section = SectionState::load(&mut store, per_task_weekly(), NOW).unwrap();
        let before = section.record().clone();

        assert!(section.toggle(&mut store, "a", NOW).unwrap());
        assert!(section.is_checked("a"));
        assert!(section.toggle(&mut store, "a", NOW + 1000).unwrap());

        assert_eq!(section.record(), &before);
        assert_eq!(
            store.get("testTasks_checkedItems"),
            Some("{}".to_string())
        );
    }

    #[test]
    fn toggle_unknown_task_is_a_no_op() {
        let mut store = MemoryStore::new();
        let mut section = SectionState::load(&mut store, shared_daily(), NOW).unwrap();
        assert!(!section.toggle(&mut store, "nope", NOW).unwrap());
        assert_eq!(store.get("testTasks_checkedItems"), None);
    }

    #[test]
    fn shared_toggle_records_membership_only() {
        let mut store = MemoryStore::new();
        let mut section = SectionState::load(&mut store, shared_daily(), NOW).unwrap();
        section.toggle(&mut store, "a", NOW).unwrap();

        assert_eq!(
            store.get("testTasks_checkedItems"),
            Some(r#"["a"]"#.to_string())
        );
        // Shared entries carry no per-task expiry.
        assert_eq!(section.task_remaining("a", NOW), None);
    }

    #[test]
    fn per_task_toggle_stamps_a_fresh_expiry() {
        let mut store = MemoryStore::new();
        let mut section = SectionState::load(&mut store, per_task_weekly(), NOW).unwrap();
        section.toggle(&mut store, "a", NOW).unwrap();

        assert_eq!(section.record().expiry("a"), Some(NOW + 7 * DAY_MS));
        assert_eq!(section.task_remaining("a", NOW), Some(7 * DAY_MS));
        assert_eq!(
            store.get("testTasks_checkedItems"),
            Some(format!(r#"{{"a":{}}}"#, NOW + 7 * DAY_MS))
        );
    }

    #[test]
    fn shared_tick_before_the_timestamp_changes_nothing() {
        let mut store = MemoryStore::new();
        let mut section = SectionState::load(&mut store, shared_daily(), NOW).unwrap();
        section.toggle(&mut store, "a", NOW).unwrap();

        assert!(!section.tick(&mut store, NOW + 1000).unwrap());
        assert!(section.is_checked("a"));
    }

    #[test]
    fn shared_tick_at_the_timestamp_clears_and_reschedules() {
        let mut store = MemoryStore::new();
        let mut section = SectionState::load(&mut store, shared_daily(), NOW).unwrap();
        section.toggle(&mut store, "a", NOW).unwrap();
        section.toggle(&mut store, "b", NOW).unwrap();

        let reset_at = section.reset_at().unwrap();
        let late = reset_at + 3 * HOUR_MS; // missed ticks still fire
        assert!(section.tick(&mut store, late).unwrap());

        assert!(section.record().is_empty());
        let next = section.reset_at().unwrap();
        assert!(next > late);
        assert_eq!(store.get("testTasks_resetTime"), Some(next.to_string()));
        assert_eq!(
            store.get("testTasks_checkedItems"),
            Some("[]".to_string())
        );
    }

    #[test]
    fn per_task_tick_removes_only_expired_entries() {
        let mut store = MemoryStore::new();
        let mut section = SectionState::load(&mut store, per_task_weekly(), NOW).unwrap();
        section.toggle(&mut store, "a", NOW - 7 * DAY_MS).unwrap(); // expires exactly at NOW
        section.toggle(&mut store, "b", NOW).unwrap();

        assert!(section.tick(&mut store, NOW).unwrap());
        assert!(!section.is_checked("a"));
        assert!(section.is_checked("b"));
        assert_eq!(section.record().expiry("b"), Some(NOW + 7 * DAY_MS));

        // Nothing left to expire until b's timestamp.
        assert!(!section.tick(&mut store, NOW + 1000).unwrap());
    }

    #[test]
    fn remaining_is_clamped_and_mode_gated() {
        let mut store = MemoryStore::new();
        let shared = SectionState::load(&mut store, shared_daily(), NOW).unwrap();
        let reset_at = shared.reset_at().unwrap();
        assert_eq!(shared.remaining(NOW), Some(reset_at - NOW));
        // Past the timestamp but before the tick lands: zero, not negative.
        assert_eq!(shared.remaining(reset_at + 1000), Some(0));

        let mut per_task = SectionState::load(
            &mut store,
            Category {
                storage_key: "otherTasks".to_string(),
                ..per_task_weekly()
            },
            NOW,
        )
        .unwrap();
        assert_eq!(per_task.remaining(NOW), None);

        per_task.toggle(&mut store, "a", NOW).unwrap();
        assert_eq!(
            per_task.task_remaining("a", NOW + 8 * DAY_MS),
            Some(0)
        );
    }

    #[test]
    fn task_views_follow_configuration_order() {
        let mut store = MemoryStore::new();
        let mut section = SectionState::load(&mut store, per_task_weekly(), NOW).unwrap();
        section.toggle(&mut store, "b", NOW).unwrap();

        let views = section.task_views(NOW);
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].id, "a");
        assert!(!views[0].checked);
        assert_eq!(views[0].remaining, None);
        assert_eq!(views[1].id, "b");
        assert!(views[1].checked);
        assert_eq!(views[1].remaining, Some(7 * DAY_MS));
    }
}
