//! The autofill engine: snapshot → resolve → set, looped by the flow driver,
//! with a mutation watcher retrying what the main loop missed.

pub mod driver;
pub mod dropdown;
pub mod events;
pub mod flow;
pub mod gate;
pub mod hints;
pub mod observer;
pub mod questions;
pub mod resolver;
pub mod sections;
pub mod setter;
pub mod snapshot;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::browser::{manager, BrowserPool};
use crate::core::config::PilotConfig;
use crate::engine::driver::PageDriver;
use crate::engine::flow::{FlowDriver, FlowOutcome};
use crate::engine::observer::{RecheckQueue, RecheckSignal};
use crate::engine::questions::{AttemptTracker, ProcessedQuestions};
use crate::profile::Profile;
use crate::store::KvStore;

/// Classifier state shared between the main flow and observer rechecks:
/// process-lifetime processed-question memory plus the per-question attempt
/// counters.
pub struct QuestionState {
    pub processed: ProcessedQuestions,
    pub attempts: AttemptTracker,
}

#[derive(Debug, Error)]
pub enum AutofillError {
    #[error("no profile saved in the store")]
    ProfileMissing,

    #[error("no application URL given and none configured")]
    NoTargetUrl,

    #[error("no usable browser: {0}")]
    BrowserUnavailable(String),

    #[error("navigation failed: {0}")]
    NavigationFailed(String),
}

/// Outcome of a start request.
#[derive(Debug)]
pub enum StartStatus {
    Completed(FlowOutcome),
    /// Another run holds the guard — a no-op, not an error.
    AlreadyRunning,
}

pub struct Engine {
    config: Arc<PilotConfig>,
    store: Arc<KvStore>,
    pool: Option<Arc<BrowserPool>>,
    flow: FlowDriver,
    questions: Arc<Mutex<QuestionState>>,
    recheck_min_gap: Duration,
}

impl Engine {
    pub fn new(config: Arc<PilotConfig>, store: Arc<KvStore>) -> Self {
        let flow = FlowDriver::new(
            config.flow.resolve_max_iterations(),
            Duration::from_millis(config.flow.resolve_iteration_delay_ms()),
            Duration::from_millis(config.flow.resolve_advance_settle_ms()),
        );
        let questions = Arc::new(Mutex::new(QuestionState {
            processed: ProcessedQuestions::default(),
            attempts: AttemptTracker::new(config.flow.resolve_question_attempt_cap()),
        }));
        let recheck_min_gap = Duration::from_millis(config.flow.resolve_recheck_min_gap_ms());
        Self {
            config,
            store,
            pool: BrowserPool::new_auto(),
            flow,
            questions,
            recheck_min_gap,
        }
    }

    pub fn is_running(&self) -> bool {
        self.flow.is_running()
    }

    pub async fn shutdown(&self) {
        if let Some(pool) = &self.pool {
            pool.shutdown().await;
        }
    }

    /// Run the full bounded autofill flow against `url` (or the configured
    /// target). Responds only once the flow completes or throws; a start
    /// while another run is in flight is answered `AlreadyRunning`.
    pub async fn start(&self, url: Option<String>) -> Result<StartStatus, AutofillError> {
        let Some(_guard) = self.flow.try_begin() else {
            info!("start ignored: a run is already in progress");
            return Ok(StartStatus::AlreadyRunning);
        };

        let profile = self
            .store
            .load_profile()
            .ok_or(AutofillError::ProfileMissing)?
            .canonical();
        let url = url
            .filter(|u| !u.trim().is_empty())
            .or_else(|| self.config.resolve_target_url())
            .ok_or(AutofillError::NoTargetUrl)?;
        let pool = self.pool.as_ref().ok_or_else(|| {
            AutofillError::BrowserUnavailable(
                "no Chromium-family browser found; set CHROME_EXECUTABLE".to_string(),
            )
        })?;

        info!("starting autofill on {}", url);
        let page = pool
            .acquire()
            .await
            .map_err(|e| AutofillError::BrowserUnavailable(e.to_string()))?;
        page.goto(url.as_str())
            .await
            .map_err(|e| AutofillError::NavigationFailed(e.to_string()))?;

        manager::wait_for_form(&page, Duration::from_secs(10)).await;

        let driver = Arc::new(PageDriver::new(page));

        if !observer::install(&driver).await {
            warn!("mutation observer failed to install — continuing without rechecks");
        }
        let (stop_tx, stop_rx) = watch::channel(false);
        let watcher = tokio::spawn(observer_loop(
            Arc::clone(&driver),
            profile.clone(),
            Arc::clone(&self.questions),
            stop_rx,
            self.recheck_min_gap,
        ));

        let outcome = self.flow.run(&driver, &profile, &self.questions).await;

        let _ = stop_tx.send(true);
        let _ = watcher.await;
        // Closing the tab tears down every page-side timer and observer.
        let _ = driver.page().clone().close().await;

        info!(
            "autofill finished: {} iterations, submitted: {}",
            outcome.iterations, outcome.submitted
        );
        Ok(StartStatus::Completed(outcome))
    }
}

/// Watcher task: drains the page-side mutation signals into the bounded
/// recheck queue and re-runs the relevant fillers, throttled by the
/// minimum-gap guard. A few fixed-delay rechecks are queued unconditionally
/// to catch content that mounted before the observer attached.
async fn observer_loop(
    driver: Arc<PageDriver>,
    profile: Profile,
    questions: Arc<Mutex<QuestionState>>,
    mut stop: watch::Receiver<bool>,
    min_gap: Duration,
) {
    let started = tokio::time::Instant::now();
    let mut scheduled: Vec<Duration> = [3u64, 8, 15].iter().map(|s| Duration::from_secs(*s)).collect();
    let mut queue = RecheckQueue::default();
    let mut last_run: Option<tokio::time::Instant> = None;

    loop {
        tokio::select! {
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
            _ = tokio::time::sleep(Duration::from_millis(500)) => {}
        }

        for signal in observer::drain(&driver).await {
            queue.push(signal);
        }
        scheduled.retain(|d| {
            if started.elapsed() >= *d {
                queue.push(RecheckSignal::Marker);
                false
            } else {
                true
            }
        });

        if queue.is_empty() {
            continue;
        }
        if let Some(t) = last_run {
            if t.elapsed() < min_gap {
                continue;
            }
        }

        let mut saw_validation = false;
        while let Some(signal) = queue.pop() {
            if signal == RecheckSignal::Validation {
                saw_validation = true;
            }
        }
        last_run = Some(tokio::time::Instant::now());

        {
            let mut state = questions.lock().await;
            dropdown::resolve_markers(&driver, &profile, &mut state, true).await;
        }
        if saw_validation {
            flow::required_sweep(&driver, &profile).await;
        }
    }
}
