use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::state::{now_millis, Checklist};
use crate::store::KvStore;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Handle for one category's tick loop. Dropping it (or calling
/// [`TickerGuard::stop`]) cancels the loop, so a torn-down category
/// never receives another tick.
#[derive(Debug)]
pub struct TickerGuard {
    handle: JoinHandle<()>,
}

impl TickerGuard {
    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_stopped(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TickerGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Drives one category's reset check on a wall-clock interval. Missed
/// ticks are skipped, not replayed; the level-triggered check catches up
/// on the next wakeup regardless.
pub fn start_section_ticker<S>(
    checklist: Checklist<S>,
    category: &str,
    period: Duration,
) -> TickerGuard
where
    S: KvStore + 'static,
{
    let category = category.to_string();
    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let now = now_millis();
            match checklist.tick(&category, now) {
                Ok(true) => log::debug!("tick applied changes category={category}"),
                Ok(false) => {}
                Err(err) => log::error!("tick failed category={category} err={err}"),
            }
        }
    });
    TickerGuard { handle }
}
