use super::agent::InsightAgent;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

/// Runs [`InsightAgent::run_cycle`] immediately on start and then once per
/// period until stopped. Dropping the scheduler stops it.
pub struct InsightScheduler {
    agent: Arc<InsightAgent>,
    period: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl InsightScheduler {
    pub fn new(agent: Arc<InsightAgent>, period: Duration) -> Self {
        Self {
            agent,
            period,
            task: Mutex::new(None),
        }
    }

    /// Spawns the loop on the current runtime. Returns `false` when already
    /// running.
    pub fn start(&self) -> bool {
        let mut guard = self.task.lock().expect("scheduler mutex poisoned");
        if guard.as_ref().is_some_and(|task| !task.is_finished()) {
            return false;
        }

        let agent = Arc::clone(&self.agent);
        let period = self.period;
        *guard = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = agent.run_cycle() {
                    warn!(error = %err, "analysis cycle failed");
                }
            }
        }));
        debug!(period_secs = period.as_secs(), "insight scheduler started");
        true
    }

    /// Cancels the pending timer. Returns `false` when nothing was running.
    pub fn stop(&self) -> bool {
        let task = self.task.lock().expect("scheduler mutex poisoned").take();
        match task {
            Some(task) => {
                task.abort();
                debug!("insight scheduler stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.task
            .lock()
            .expect("scheduler mutex poisoned")
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn agent(&self) -> &Arc<InsightAgent> {
        &self.agent
    }
}

impl Drop for InsightScheduler {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.task.lock() {
            if let Some(task) = guard.take() {
                task.abort();
            }
        }
    }
}
