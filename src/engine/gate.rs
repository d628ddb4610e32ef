//! The review/submit gate.
//!
//! A final submit is only dispatched from the recognized review page, and
//! only after a whole-document sweep finds no leftover placeholder markers or
//! validation-error text. A blocked gate is a non-fatal abort — the next
//! iteration gets another chance to clean up.

use tracing::{info, warn};

use crate::engine::driver::PageDriver;
use crate::engine::hints::{REVIEW_SECTION_PHRASES, SUBMIT_TEXTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateResult {
    /// Not the review page — the normal advance path applies.
    NotReviewPage,
    /// Review page with unfinished answers; submit withheld.
    Blocked,
    /// Submit control received the full gesture.
    Submitted,
}

/// Stamp the submit control if one exists. Literal text containment, same
/// rule as every other affordance search.
async fn stamp_submit_control(driver: &PageDriver) -> bool {
    let js = format!(
        r#"(() => {{
            const texts = {texts};
            const btns = Array.from(document.querySelectorAll("button, a, [role='button']"));
            const hit = btns.find(b => {{
                const t = (b.textContent || '').trim().toLowerCase();
                return texts.some(x => t.includes(x));
            }});
            if (hit) {{ hit.setAttribute('data-fp-submit', '1'); return true; }}
            return false;
        }})()"#,
        texts = serde_json::to_string(SUBMIT_TEXTS).unwrap(),
    );
    driver.eval_bool(js).await
}

/// The review page is recognized by the joint presence of a submit-labelled
/// control and the three summary-section phrases.
pub async fn is_review_page(driver: &PageDriver) -> bool {
    if !driver.body_text_contains_all(REVIEW_SECTION_PHRASES).await {
        return false;
    }
    stamp_submit_control(driver).await
}

pub async fn try_submit(driver: &PageDriver) -> GateResult {
    if !is_review_page(driver).await {
        return GateResult::NotReviewPage;
    }

    let markers = driver.count_select_one_markers().await;
    let validation = driver.has_validation_errors().await;
    if markers > 0 || validation {
        warn!(
            "submit withheld: {} unanswered markers, validation errors: {}",
            markers, validation
        );
        return GateResult::Blocked;
    }

    driver.scroll_to_bottom().await;
    tokio::time::sleep(std::time::Duration::from_millis(400)).await;
    if driver.gesture_click("[data-fp-submit=\"1\"]").await {
        info!("application submitted");
        GateResult::Submitted
    } else {
        warn!("submit control vanished before the gesture landed");
        GateResult::Blocked
    }
}
