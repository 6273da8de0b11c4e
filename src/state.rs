use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::config::ChecklistConfig;
use crate::models::{ResetMode, TaskView, Timestamp};
use crate::section::{ChecklistError, SectionState};
use crate::store::KvStore;

pub fn now_millis() -> Timestamp {
    Utc::now().timestamp_millis()
}

/// All sections behind one lock, cheap to clone into tickers and the
/// presentation layer. Sections are independent; the single lock just
/// keeps each section's load/tick/toggle sequence serialized.
pub struct Checklist<S: KvStore> {
    inner: Arc<Mutex<Inner<S>>>,
}

impl<S: KvStore> Clone for Checklist<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<S> {
    store: S,
    sections: Vec<SectionState>,
}

impl<S: KvStore> Checklist<S> {
    /// Loads every configured section from the store at the current
    /// wall-clock time. Malformed policies fail here.
    pub fn new(store: S, config: &ChecklistConfig) -> Result<Self, ChecklistError> {
        Self::load_at(store, config, now_millis())
    }

    pub fn load_at(
        mut store: S,
        config: &ChecklistConfig,
        now: Timestamp,
    ) -> Result<Self, ChecklistError> {
        let mut sections = Vec::new();
        for category in config.categories() {
            sections.push(SectionState::load(&mut store, category, now)?);
        }
        log::debug!("checklist loaded sections={}", sections.len());
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner { store, sections })),
        })
    }

    pub fn category_keys(&self) -> Vec<String> {
        let guard = self.inner.lock().expect("state poisoned");
        guard
            .sections
            .iter()
            .map(|section| section.storage_key().to_string())
            .collect()
    }

    /// Rows for one category, or `None` for an unknown key.
    pub fn tasks(&self, category: &str) -> Option<Vec<TaskView>> {
        self.tasks_at(category, now_millis())
    }

    pub fn tasks_at(&self, category: &str, now: Timestamp) -> Option<Vec<TaskView>> {
        let guard = self.inner.lock().expect("state poisoned");
        guard
            .sections
            .iter()
            .find(|section| section.storage_key() == category)
            .map(|section| section.task_views(now))
    }

    /// Flips one task and persists the result. `Ok(false)` when the
    /// category or task id is unknown.
    pub fn toggle(&self, category: &str, task_id: &str) -> Result<bool, ChecklistError> {
        self.toggle_at(category, task_id, now_millis())
    }

    pub fn toggle_at(
        &self,
        category: &str,
        task_id: &str,
        now: Timestamp,
    ) -> Result<bool, ChecklistError> {
        let mut guard = self.inner.lock().expect("state poisoned");
        let Inner { store, sections } = &mut *guard;
        match sections
            .iter_mut()
            .find(|section| section.storage_key() == category)
        {
            Some(section) => section.toggle(store, task_id, now),
            None => Ok(false),
        }
    }

    /// Milliseconds until a shared category's next reset; `None` for
    /// unknown or per-task categories.
    pub fn category_remaining(&self, category: &str) -> Option<Timestamp> {
        self.category_remaining_at(category, now_millis())
    }

    pub fn category_remaining_at(&self, category: &str, now: Timestamp) -> Option<Timestamp> {
        let guard = self.inner.lock().expect("state poisoned");
        guard
            .sections
            .iter()
            .find(|section| section.storage_key() == category)
            .and_then(|section| section.remaining(now))
    }

    /// Runs one category's reset check. `Ok(false)` when nothing fired
    /// or the key is unknown.
    pub fn tick(&self, category: &str, now: Timestamp) -> Result<bool, ChecklistError> {
        let mut guard = self.inner.lock().expect("state poisoned");
        let Inner { store, sections } = &mut *guard;
        match sections
            .iter_mut()
            .find(|section| section.storage_key() == category)
        {
            Some(section) => section.tick(store, now),
            None => Ok(false),
        }
    }

    pub fn reset_mode(&self, category: &str) -> Option<ResetMode> {
        let guard = self.inner.lock().expect("state poisoned");
        guard
            .sections
            .iter()
            .find(|section| section.storage_key() == category)
            .map(|section| section.reset_mode())
    }
}
