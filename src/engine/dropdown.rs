//! Pseudo-select widgets: the "Select One" placeholder flow.
//!
//! The platform renders most pickers as framework widgets, not native
//! selects. Driving one takes the full gesture to open, polled waiting for
//! option nodes to mount, a typing fallback for autocomplete-style pickers,
//! and an arrow-key fallback when option clicks don't register. Every path is
//! bounded; a widget that never verifies is abandoned for this attempt and
//! retried under the per-question cap.

use std::time::Duration;

use anyhow::anyhow;
use backoff::ExponentialBackoffBuilder;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::engine::driver::PageDriver;
use crate::engine::hints::SELECT_ONE_MARKER;
use crate::engine::questions::{self, Answer};
use crate::engine::QuestionState;
use crate::profile::Profile;

/// Attribute selectors that reveal rendered option nodes across widget
/// generations.
const OPTION_SELECTORS: &str = "[role=\"option\"], [data-automation-id*=\"option\"], [data-automation-id*=\"menuItem\"], li[role=\"option\"], [aria-selected]";

/// Compliance keywords that qualify an ancestor text block as the governing
/// question even without a question mark.
const QUESTION_KEYWORDS: &[&str] = &[
    "visa",
    "sponsorship",
    "authorized",
    "relocat",
    "non-compete",
    "export control",
    "acknowledge",
    "certify",
    "disability",
    "veteran",
    "iran",
    "cuba",
    "north korea",
    "syria",
];

// ── Option matching (pure) ───────────────────────────────────────────────────

/// An option counts as "yes" when it contains "yes" and not "no".
pub fn yes_like(text: &str) -> bool {
    let t = text.to_lowercase();
    t.contains("yes") && !t.contains("no")
}

/// An option counts as "no" when it contains "no", "not", or "do not".
pub fn no_like(text: &str) -> bool {
    let t = text.to_lowercase();
    t.contains("no") || t.contains("not") || t.contains("do not")
}

/// Strength of a non-binary "yes" phrasing, for ranked experience questions.
fn experience_strength(text: &str) -> u32 {
    let t = text.to_lowercase();
    if t.contains("expert") || t.contains("extensive") || t.contains("advanced") {
        4
    } else if t.contains("proficient") || t.contains("moderate") || t.contains("intermediate") {
        3
    } else if t.contains("limited") || t.contains("basic") || t.contains("beginner") || t.contains("some") {
        2
    } else if yes_like(&t) {
        1
    } else {
        0
    }
}

/// Choose the option index for an answer: exact case-insensitive text match,
/// then the yes/no semantic rule, then substring containment either
/// direction. Ranked answers pick the strongest available "yes" phrasing.
pub fn choose_option(options: &[String], answer: &Answer) -> Option<usize> {
    match answer {
        Answer::Yes => {
            exact_index(options, "yes").or_else(|| options.iter().position(|o| yes_like(o)))
        }
        Answer::No => {
            exact_index(options, "no").or_else(|| options.iter().position(|o| no_like(o)))
        }
        Answer::RankedYes => options
            .iter()
            .enumerate()
            .filter(|(_, o)| experience_strength(o) > 0 && !no_like(o))
            .max_by_key(|(_, o)| experience_strength(o))
            .map(|(i, _)| i),
        Answer::Text(target) => {
            let needle = target.trim().to_lowercase();
            if needle.is_empty() {
                return None;
            }
            exact_index(options, &needle).or_else(|| {
                options.iter().position(|o| {
                    let hay = o.trim().to_lowercase();
                    hay.contains(&needle) || needle.contains(&hay)
                })
            })
        }
    }
}

fn exact_index(options: &[String], needle: &str) -> Option<usize> {
    options
        .iter()
        .position(|o| o.trim().to_lowercase() == needle)
}

/// The text to type into an autocomplete input for this answer.
fn answer_typing_text(answer: &Answer) -> String {
    match answer {
        Answer::Yes | Answer::RankedYes => "Yes".to_string(),
        Answer::No => "No".to_string(),
        Answer::Text(t) => t.clone(),
    }
}

// ── Marker discovery ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MarkerInfo {
    idx: u64,
    #[serde(default)]
    question: String,
}

const MARKER_SCAN_TEMPLATE: &str = r#"
(() => {
    const marker = __MARKER__;
    const keywords = __KEYWORDS__;
    const isChrome = (el) => ['NAV', 'HEADER', 'FOOTER'].includes(el.tagName);

    const leaves = Array.from(document.querySelectorAll('div, span, p, button, label'))
        .filter(el => (el.textContent || '').trim() === marker && el.children.length === 0);

    const recover = (el) => {
        let cur = el.parentElement;
        for (let d = 0; d < 6 && cur; d++) {
            if (isChrome(cur)) break;
            const t = (cur.textContent || '').trim();
            if (t.length > 10 && t.length < 600 &&
                (t.includes('?') || keywords.some(k => t.toLowerCase().includes(k)))) {
                return t;
            }
            cur = cur.parentElement;
        }
        let acc = '';
        let sib = el.previousElementSibling || (el.parentElement ? el.parentElement.previousElementSibling : null);
        while (sib && acc.length < 300) {
            acc = (sib.textContent || '').trim() + ' ' + acc;
            sib = sib.previousElementSibling;
        }
        acc = acc.trim();
        if (acc.length > 10) return acc;
        const headings = Array.from(document.querySelectorAll('h1,h2,h3,h4,h5,h6,[role="heading"]'));
        const top = el.getBoundingClientRect().top;
        let best = '';
        for (const h of headings) {
            if (h.getBoundingClientRect().top <= top) best = (h.textContent || '').trim();
        }
        return best;
    };

    return leaves.map((el, i) => {
        el.setAttribute('data-fp-marker', String(i));
        return { idx: i, question: recover(el) };
    });
})()
"#;

async fn scan_markers(driver: &PageDriver) -> Vec<MarkerInfo> {
    let js = MARKER_SCAN_TEMPLATE
        .replace("__MARKER__", &serde_json::to_string(SELECT_ONE_MARKER).unwrap())
        .replace("__KEYWORDS__", &serde_json::to_string(QUESTION_KEYWORDS).unwrap());
    match driver.eval_json(js).await {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect(),
        _ => Vec::new(),
    }
}

/// Stamp the clickable trigger for a marker: nearest ancestor exposing
/// `aria-haspopup` wins, else the closest ancestor with a stable
/// framework-assigned id / button role / focusable tabindex, else the marker
/// node itself.
async fn stamp_trigger(driver: &PageDriver, idx: u64) -> bool {
    let js = format!(
        r#"(() => {{
            const m = document.querySelector('[data-fp-marker="{idx}"]');
            if (!m) return false;
            let cur = m;
            let fallback = null;
            for (let d = 0; d < 6 && cur; d++) {{
                if (cur.getAttribute && cur.getAttribute('aria-haspopup')) {{
                    cur.setAttribute('data-fp-trigger', '{idx}');
                    return true;
                }}
                if (!fallback && cur.hasAttribute &&
                    (cur.hasAttribute('data-automation-id') ||
                     cur.getAttribute('role') === 'button' ||
                     cur.getAttribute('role') === 'combobox' ||
                     cur.hasAttribute('tabindex'))) {{
                    fallback = cur;
                }}
                cur = cur.parentElement;
            }}
            (fallback || m).setAttribute('data-fp-trigger', '{idx}');
            return true;
        }})()"#,
    );
    driver.eval_bool(js).await
}

/// Visible option texts currently rendered, stamped `data-fp-opt` in order.
async fn poll_options(driver: &PageDriver) -> Vec<String> {
    let js = format!(
        r#"(() => {{
            const visible = (el) => {{
                const r = el.getBoundingClientRect();
                return r.width > 1 && r.height > 1;
            }};
            const opts = Array.from(document.querySelectorAll('{OPTION_SELECTORS}')).filter(visible);
            opts.forEach((el, i) => el.setAttribute('data-fp-opt', String(i)));
            return opts.map(el => (el.textContent || '').trim());
        }})()"#,
    );
    match driver.eval_json(js).await {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Poll for options on an increasing backoff until some appear or the
/// schedule is exhausted.
async fn poll_options_with_backoff(driver: &PageDriver) -> Vec<String> {
    let schedule = ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(200))
        .with_multiplier(2.0)
        .with_max_interval(Duration::from_millis(1200))
        .with_max_elapsed_time(Some(Duration::from_secs(4)))
        .build();

    backoff::future::retry(schedule, || async {
        let opts = poll_options(driver).await;
        if opts.is_empty() {
            Err(backoff::Error::transient(anyhow!("no options rendered yet")))
        } else {
            Ok(opts)
        }
    })
    .await
    .unwrap_or_default()
}

async fn click_option(driver: &PageDriver, option_index: usize) -> bool {
    let js = format!(
        r#"(() => {{
            const el = document.querySelector('[data-fp-opt="{option_index}"]');
            if (!el) return false;
            el.click();
            return true;
        }})()"#,
    );
    driver.eval_bool(js).await
}

/// Stamp the text input adjacent to a trigger for the typing fallback.
async fn stamp_type_target(driver: &PageDriver, idx: u64) -> bool {
    let js = format!(
        r#"(() => {{
            const t = document.querySelector('[data-fp-trigger="{idx}"]');
            if (!t) return false;
            const input = t.querySelector('input:not([type="hidden"])')
                || (t.parentElement ? t.parentElement.querySelector('input:not([type="hidden"])') : null);
            if (!input) return false;
            input.setAttribute('data-fp-typein', '{idx}');
            return true;
        }})()"#,
    );
    driver.eval_bool(js).await
}

/// Arrow-key navigation: walk the highlighted option looking for a match,
/// Enter on success. Bounded at ten steps.
async fn arrow_key_pick(
    driver: &PageDriver,
    trigger_selector: &str,
    answer: &Answer,
    option_count: usize,
) -> bool {
    driver.press_key(trigger_selector, "ArrowDown").await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    for _ in 0..option_count.min(10) {
        let active = driver
            .eval_json(
                r#"(() => {
                    const el = document.querySelector('[aria-selected="true"], .highlighted, .selected');
                    return el ? (el.textContent || '').trim() : null;
                })()"#
                    .to_string(),
            )
            .await
            .and_then(|v| v.as_str().map(str::to_string));

        if let Some(text) = active {
            if choose_option(std::slice::from_ref(&text), answer).is_some() {
                driver.press_key(trigger_selector, "Enter").await;
                tokio::time::sleep(Duration::from_millis(100)).await;
                return true;
            }
        }
        driver.press_key(trigger_selector, "ArrowDown").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

/// Post-selection check: the placeholder is gone from the trigger block, or
/// the chosen option text now appears in it.
async fn verify_selection(driver: &PageDriver, idx: u64, chosen: Option<&str>) -> bool {
    let chosen_json = serde_json::to_string(&chosen.unwrap_or("")).unwrap();
    let js = format!(
        r#"(() => {{
            const t = document.querySelector('[data-fp-trigger="{idx}"]');
            if (!t) return true;
            const txt = t.textContent || '';
            if (!txt.includes({marker})) return true;
            const chosen = {chosen_json};
            return chosen.length > 0 && txt.toLowerCase().includes(chosen.toLowerCase());
        }})()"#,
        marker = serde_json::to_string(SELECT_ONE_MARKER).unwrap(),
    );
    driver.eval_bool(js).await
}

// ── Widget flows ─────────────────────────────────────────────────────────────

/// Drive one already-stamped trigger to the answer. Returns the chosen option
/// text when a click/keypress landed.
async fn drive_widget(driver: &PageDriver, idx: u64, answer: &Answer) -> Option<String> {
    let trigger_selector = format!("[data-fp-trigger=\"{idx}\"]");

    driver.gesture_click(&trigger_selector).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let mut options = poll_options_with_backoff(driver).await;

    if options.is_empty() && stamp_type_target(driver, idx).await {
        let typein = format!("[data-fp-typein=\"{idx}\"]");
        driver.type_into(&typein, &answer_typing_text(answer)).await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        options = poll_options(driver).await;
    }

    if options.is_empty() {
        debug!("widget {idx}: no options ever rendered");
        return None;
    }

    if let Some(i) = choose_option(&options, answer) {
        if click_option(driver, i).await {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Some(options[i].clone());
        }
    }

    if arrow_key_pick(driver, &trigger_selector, answer, options.len()).await {
        return Some(answer_typing_text(answer));
    }

    debug!("widget {idx}: no option matched {:?} among {:?}", answer, options);
    None
}

/// Combobox-planned controls (from the generic fill pass): open the stamped
/// control itself and pick `target`.
pub async fn pick_for_control(driver: &PageDriver, sel: &str, target: &str) -> bool {
    let selector = format!("[data-fp-idx=\"{sel}\"]");
    let answer = Answer::from_profile_value(target);

    driver.gesture_click(&selector).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let mut options = poll_options_with_backoff(driver).await;
    if options.is_empty() {
        driver.type_into(&selector, target).await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        options = poll_options(driver).await;
    }
    if options.is_empty() {
        return false;
    }
    match choose_option(&options, &answer) {
        Some(i) => click_option(driver, i).await,
        None => arrow_key_pick(driver, &selector, &answer, options.len()).await,
    }
}

/// One audit pass over every "Select One" marker on the page.
///
/// `forced` is set by observer-triggered rechecks: a question already marked
/// processed is re-evaluated only when the page still shows its marker *and*
/// the recheck forces it, and always under the per-question attempt cap.
pub async fn resolve_markers(
    driver: &PageDriver,
    profile: &Profile,
    state: &mut QuestionState,
    forced: bool,
) -> usize {
    let markers = scan_markers(driver).await;
    if markers.is_empty() {
        return 0;
    }

    let mut answered = 0;
    let mut seen_this_pass: std::collections::HashSet<String> = std::collections::HashSet::new();

    for marker in markers {
        let question = questions::normalize_question(&marker.question);
        if question.is_empty() {
            continue;
        }
        if !seen_this_pass.insert(question.clone()) {
            continue;
        }
        if state.processed.contains(&question) && !forced {
            continue;
        }
        if !state.attempts.begin(&question) {
            debug!("attempt cap reached for question {:?}", question);
            continue;
        }

        let Some(answer) = questions::classify(&question, profile) else {
            debug!("no answer known for question {:?}", question);
            continue;
        };

        if !stamp_trigger(driver, marker.idx).await {
            continue;
        }

        let chosen = drive_widget(driver, marker.idx, &answer).await;
        if verify_selection(driver, marker.idx, chosen.as_deref()).await {
            info!("answered {:?} with {:?}", question, chosen.as_deref().unwrap_or("<keyboard>"));
            state.processed.mark(&question);
            answered += 1;
        } else {
            warn!(
                "unverified selection for {:?} (attempt {})",
                question,
                state.attempts.count(&question)
            );
        }
    }
    answered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn yes_answer_avoids_options_containing_no() {
        let options = opts(&["No, I do not", "Yes, I am authorized"]);
        assert_eq!(choose_option(&options, &Answer::Yes), Some(1));
        // "Yes and no" is ambiguous and must not count as yes.
        assert!(!yes_like("Yes and no"));
    }

    #[test]
    fn no_answer_matches_negated_phrasings() {
        let options = opts(&["I am authorized", "I do not require sponsorship"]);
        assert_eq!(choose_option(&options, &Answer::No), Some(1));
    }

    #[test]
    fn exact_match_beats_substring() {
        let options = opts(&["Yes, previously employed", "Yes"]);
        assert_eq!(choose_option(&options, &Answer::Yes), Some(1));
    }

    #[test]
    fn text_answer_matches_either_direction() {
        let options = opts(&["LinkedIn", "Employee Referral", "Other"]);
        assert_eq!(
            choose_option(&options, &Answer::Text("referral".into())),
            Some(1)
        );
        // Needle longer than the option text.
        assert_eq!(
            choose_option(&options, &Answer::Text("LinkedIn Job Posting".into())),
            Some(0)
        );
    }

    #[test]
    fn ranked_yes_picks_strongest_available_phrasing() {
        let options = opts(&[
            "No experience",
            "Yes, limited exposure",
            "Yes, extensive hands-on use",
        ]);
        assert_eq!(choose_option(&options, &Answer::RankedYes), Some(2));
        // Without the strong option, the weaker yes still wins over no.
        let fewer = opts(&["No experience", "Yes, limited exposure"]);
        assert_eq!(choose_option(&fewer, &Answer::RankedYes), Some(1));
    }

    #[test]
    fn no_match_yields_none() {
        let options = opts(&["Alpha", "Beta"]);
        assert_eq!(choose_option(&options, &Answer::Text("Gamma".into())), None);
        assert_eq!(choose_option(&options, &Answer::Yes), None);
    }
}
