//! Checklist engine for recurring tasks. Categories group tasks under a
//! reset policy (daily, weekly fixed-day, weekly after-completion,
//! monthly); completions persist to a key-value store and clear
//! automatically when their schedule fires. Rendering is the host's
//! concern; this crate computes the state it renders.

pub mod config;
pub mod logging;
pub mod models;
pub mod reset;
pub mod section;
pub mod state;
pub mod store;
pub mod ticker;

pub use config::{ChecklistConfig, WeeklyConfig};
pub use models::{Category, CompletionRecord, ResetMode, ResetPolicy, Task, TaskView, Timestamp};
pub use reset::{format_remaining, next_reset_time, ConfigError};
pub use section::ChecklistError;
pub use state::{now_millis, Checklist};
pub use store::{FileStore, KvStore, MemoryStore, StoreError};
pub use ticker::{start_section_ticker, TickerGuard, TICK_PERIOD};
