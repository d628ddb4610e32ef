//! The top-level fill/advance loop.
//!
//! One run: a bounded number of iterations, each running every filler over
//! the currently-visible form (generic label-based fields, repeatable
//! sections, policy radio toggles, outstanding-required sweep, pseudo-select
//! audit), then trying to advance. A single run-guard token makes concurrent
//! starts a no-op rather than an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::engine::driver::PageDriver;
use crate::engine::gate::{self, GateResult};
use crate::engine::hints::ADVANCE_TEXTS;
use crate::engine::sections::{self, SectionCategory};
use crate::engine::{dropdown, setter, QuestionState};
use crate::profile::{FieldKey, Profile};

#[derive(Debug, Clone, Copy, Default)]
pub struct FlowOutcome {
    pub iterations: u32,
    pub submitted: bool,
}

/// RAII token for the `Idle ↔ Running` state. Dropping it returns the flow to
/// `Idle`.
pub struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

pub struct FlowDriver {
    running: AtomicBool,
    max_iterations: u32,
    iteration_delay: Duration,
    advance_settle: Duration,
}

impl FlowDriver {
    pub fn new(max_iterations: u32, iteration_delay: Duration, advance_settle: Duration) -> Self {
        Self {
            running: AtomicBool::new(false),
            max_iterations: max_iterations.max(1),
            iteration_delay,
            advance_settle,
        }
    }

    /// Move `Idle → Running`. `None` while another run holds the token.
    pub fn try_begin(&self) -> Option<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RunGuard {
                flag: &self.running,
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The bounded fill/advance loop. The caller must hold the run guard.
    pub async fn run(
        &self,
        driver: &PageDriver,
        profile: &Profile,
        questions: &Mutex<QuestionState>,
    ) -> FlowOutcome {
        let mut outcome = FlowOutcome::default();

        for i in 0..self.max_iterations {
            outcome.iterations = i + 1;
            info!("autofill iteration {}/{}", i + 1, self.max_iterations);

            fill_pass(driver, profile, questions).await;

            match gate::try_submit(driver).await {
                GateResult::Submitted => {
                    outcome.submitted = true;
                    break;
                }
                GateResult::Blocked => {
                    // Unfinished answers on the review page; let the next
                    // iteration clean up.
                    tokio::time::sleep(self.iteration_delay).await;
                    continue;
                }
                GateResult::NotReviewPage => {}
            }

            match driver.click_by_texts(ADVANCE_TEXTS).await {
                Some(text) => {
                    info!("advanced via {:?}", text);
                    tokio::time::sleep(self.advance_settle).await;
                }
                None => {
                    // Nothing to click — nudge lazy-mounted content into view.
                    driver.scroll_bounce().await;
                }
            }
            tokio::time::sleep(self.iteration_delay).await;
        }
        outcome
    }
}

/// One full fill pass, in fixed order.
pub async fn fill_pass(driver: &PageDriver, profile: &Profile, questions: &Mutex<QuestionState>) {
    // 1. Generic label-based fields, from a single document-order snapshot.
    let controls = driver.harvest(None).await;
    if controls.is_empty() {
        debug!("fill pass: no controls visible yet");
    } else {
        let actions = setter::plan_pass(&controls, profile);
        info!("fill pass: {} controls, {} actions", controls.len(), actions.len());
        driver.apply_all(&actions).await;
    }

    // 2. Repeatable sections.
    sections::fill_category(driver, profile, SectionCategory::Work).await;
    sections::fill_category(driver, profile, SectionCategory::Education).await;
    sections::fill_category(driver, profile, SectionCategory::Projects).await;

    // 3. Common policy radio toggles.
    for (keyword, answer_yes) in policy_toggles(profile) {
        toggle_by_question(driver, keyword, answer_yes).await;
    }

    // 4. Outstanding required fields.
    required_sweep(driver, profile).await;

    // 5. Unanswered pseudo-select audit.
    {
        let mut state = questions.lock().await;
        dropdown::resolve_markers(driver, profile, &mut state, false).await;
    }
}

fn policy_toggles(profile: &Profile) -> [(&'static str, bool); 5] {
    let yes = |key: FieldKey, default: bool| {
        profile
            .field(key)
            .map(|v| {
                let v = v.trim().to_lowercase();
                v.starts_with('y') || v == "true" || v == "1"
            })
            .unwrap_or(default)
    };
    [
        ("work authorization", yes(FieldKey::WorkAuthorizedInCountry, true)),
        ("require visa", yes(FieldKey::VisaSponsorship, false)),
        ("disability", yes(FieldKey::Disability, false)),
        ("veteran", yes(FieldKey::Veteran, false)),
        ("relocat", yes(FieldKey::Relocation, true)),
    ]
}

/// Click the yes/no radio inside the first group whose legend/heading
/// contains `keyword`.
async fn toggle_by_question(driver: &PageDriver, keyword: &str, answer_yes: bool) {
    let js = format!(
        r#"(() => {{
            const keyword = {keyword};
            const wantYes = {answer_yes};
            const groups = Array.from(document.querySelectorAll('fieldset, div'));
            for (const g of groups) {{
                const label = g.querySelector("legend, h3, h4, label, [role='heading']");
                const t = label ? (label.textContent || '').trim().toLowerCase() : '';
                if (!t.includes(keyword)) continue;
                const radios = Array.from(g.querySelectorAll("input[type='radio']"));
                const target = radios.find(r => {{
                    if (!r.id) return false;
                    const l = g.querySelector('label[for="' + CSS.escape(r.id) + '"]');
                    const lt = l ? (l.textContent || '').trim().toLowerCase() : '';
                    return wantYes ? lt.includes('yes') : lt.includes('no');
                }});
                if (target) {{ target.click(); return true; }}
            }}
            return false;
        }})()"#,
        keyword = serde_json::to_string(keyword).unwrap(),
        answer_yes = answer_yes,
    );
    if driver.eval_bool(js).await {
        debug!("toggled {:?} → {}", keyword, if answer_yes { "yes" } else { "no" });
    }
}

/// Re-plan controls still flagged required and empty after the main pass.
pub(crate) async fn required_sweep(driver: &PageDriver, profile: &Profile) {
    let controls = driver.harvest(None).await;
    let mut replanned = 0;
    for control in controls
        .iter()
        .filter(|c| c.required && c.value.trim().is_empty() && !c.checked)
    {
        if let Some(action) = setter::plan(control, profile) {
            if driver.apply(&action).await {
                replanned += 1;
            }
        }
    }
    if replanned > 0 {
        info!("required sweep: {} fields revisited", replanned);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_guard_serializes_starts() {
        let flow = FlowDriver::new(3, Duration::from_millis(1), Duration::from_millis(1));
        assert!(!flow.is_running());

        let guard = flow.try_begin().expect("idle flow must begin");
        assert!(flow.is_running());
        // Concurrent start while running is a no-op.
        assert!(flow.try_begin().is_none());

        drop(guard);
        assert!(!flow.is_running());
        assert!(flow.try_begin().is_some());
    }

    #[test]
    fn policy_toggles_respect_profile_and_defaults() {
        let toggles = policy_toggles(&Profile::default());
        let get = |k: &str| toggles.iter().find(|(kw, _)| *kw == k).unwrap().1;
        assert!(get("work authorization"));
        assert!(!get("require visa"));
        assert!(!get("veteran"));
        assert!(get("relocat"));

        let p = Profile {
            work_authorized_in_country: Some("No".into()),
            visa_sponsorship: Some("Yes".into()),
            ..Default::default()
        };
        let toggles = policy_toggles(&p);
        let get = |k: &str| toggles.iter().find(|(kw, _)| *kw == k).unwrap().1;
        assert!(!get("work authorization"));
        assert!(get("require visa"));
    }
}
