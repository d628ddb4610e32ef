//! Page driving: executes planned actions against the live page.
//!
//! Every mutation goes through an injected script so the value lands via the
//! element's *native* setter (bypassing framework property interception) and
//! the framework still observes it through the synthetic event sequences in
//! [`super::events`]. A failed evaluation is logged and reported as "not
//! applied" — never propagated.

use std::sync::atomic::{AtomicU64, Ordering};

use chromiumoxide::Page;
use tracing::{debug, warn};

use crate::engine::events::{EventProfile, DEFAULT_EVENTS};
use crate::engine::setter::DomAction;
use crate::engine::snapshot::{self, ControlSnapshot};

pub struct PageDriver {
    page: Page,
    events: EventProfile,
    ns_counter: AtomicU64,
}

fn attr_selector(sel: &str) -> String {
    format!("[data-fp-idx=\"{}\"]", sel)
}

fn js_str(s: &str) -> String {
    serde_json::to_string(s).expect("string serializes to JSON")
}

impl PageDriver {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            events: DEFAULT_EVENTS,
            ns_counter: AtomicU64::new(0),
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Evaluate a script, returning its JSON value. Errors are logged and
    /// collapse to `None` — a dropped evaluation is a skipped field, not a
    /// failed run.
    pub async fn eval_json(&self, js: String) -> Option<serde_json::Value> {
        match self.page.evaluate(js).await {
            Ok(v) => v.into_value::<serde_json::Value>().ok(),
            Err(e) => {
                warn!("page evaluation failed: {}", e);
                None
            }
        }
    }

    pub async fn eval_bool(&self, js: String) -> bool {
        self.eval_json(js)
            .await
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Snapshot all current controls (optionally scoped to a section root),
    /// stamping them with a fresh namespace so stale selectors from earlier
    /// passes never alias.
    pub async fn harvest(&self, root_selector: Option<&str>) -> Vec<ControlSnapshot> {
        let ns = format!("g{}", self.ns_counter.fetch_add(1, Ordering::Relaxed));
        let js = snapshot::harvest_script(&ns, root_selector);
        match self.eval_json(js).await {
            Some(v) => snapshot::parse_harvest(v),
            None => Vec::new(),
        }
    }

    /// Apply one planned action. Returns whether the control was found and
    /// acted on. Picker actions run the full widget flow in
    /// [`super::dropdown`].
    pub async fn apply(&self, action: &DomAction) -> bool {
        match action {
            DomAction::SetValue { sel, value } => {
                let js = format!(
                    r#"(() => {{
                        const el = document.querySelector({sel});
                        if (!el) return false;
                        const proto = Object.getPrototypeOf(el);
                        const desc = proto ? Object.getOwnPropertyDescriptor(proto, 'value') : null;
                        if (desc && desc.set) {{ desc.set.call(el, {value}); }} else {{ el.value = {value}; }}
                        for (const ev of {commit}) el.dispatchEvent(new Event(ev, {{ bubbles: true }}));
                        return true;
                    }})()"#,
                    sel = js_str(&attr_selector(sel)),
                    value = js_str(value),
                    commit = self.events.commit_json(),
                );
                self.eval_bool(js).await
            }
            DomAction::SetChecked { sel, checked } => {
                let js = format!(
                    r#"(() => {{
                        const el = document.querySelector({sel});
                        if (!el) return false;
                        el.checked = {checked};
                        for (const ev of {commit}) el.dispatchEvent(new Event(ev, {{ bubbles: true }}));
                        return true;
                    }})()"#,
                    sel = js_str(&attr_selector(sel)),
                    checked = checked,
                    commit = self.events.commit_json(),
                );
                self.eval_bool(js).await
            }
            DomAction::ClickRadio { sel } => {
                let js = format!(
                    r#"(() => {{
                        const el = document.querySelector({sel});
                        if (!el) return false;
                        el.click();
                        return true;
                    }})()"#,
                    sel = js_str(&attr_selector(sel)),
                );
                self.eval_bool(js).await
            }
            DomAction::SelectOption { sel, option_index } => {
                let js = format!(
                    r#"(() => {{
                        const el = document.querySelector({sel});
                        if (!el || !el.options || el.options.length <= {idx}) return false;
                        el.selectedIndex = {idx};
                        for (const ev of {commit}) el.dispatchEvent(new Event(ev, {{ bubbles: true }}));
                        return true;
                    }})()"#,
                    sel = js_str(&attr_selector(sel)),
                    idx = option_index,
                    commit = self.events.commit_json(),
                );
                self.eval_bool(js).await
            }
            DomAction::OpenPicker { sel, target } => {
                crate::engine::dropdown::pick_for_control(self, sel, target).await
            }
        }
    }

    /// Apply a batch, per-field failures logged and swallowed.
    pub async fn apply_all(&self, actions: &[DomAction]) -> usize {
        let mut applied = 0;
        for action in actions {
            if self.apply(action).await {
                applied += 1;
            } else {
                debug!("action not applied: {:?}", action.sel());
            }
        }
        applied
    }

    /// Dispatch the full pointer gesture plus focus on a selector. Single
    /// `click()` calls don't open the platform's widgets.
    pub async fn gesture_click(&self, selector: &str) -> bool {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return false;
                const opts = {{ bubbles: true, cancelable: true, view: window }};
                for (const ev of {gesture}) {{
                    if (ev.startsWith('pointer')) el.dispatchEvent(new PointerEvent(ev, opts));
                    else el.dispatchEvent(new MouseEvent(ev, opts));
                }}
                if (el.focus) el.focus();
                return true;
            }})()"#,
            sel = js_str(selector),
            gesture = self.events.gesture_json(),
        );
        self.eval_bool(js).await
    }

    /// Simulate keystrokes into a selector, character by character, so
    /// autocomplete-style filtering sees each prefix.
    pub async fn type_into(&self, selector: &str, text: &str) -> bool {
        let js = format!(
            r#"(async () => {{
                const el = document.querySelector({sel});
                if (!el) return false;
                if (el.focus) el.focus();
                const proto = Object.getPrototypeOf(el);
                const desc = proto ? Object.getOwnPropertyDescriptor(proto, 'value') : null;
                const setv = (v) => {{ if (desc && desc.set) desc.set.call(el, v); else el.value = v; }};
                setv('');
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                const text = {text};
                for (let i = 0; i < text.length; i++) {{
                    await new Promise(r => setTimeout(r, 50));
                    setv(text.substring(0, i + 1));
                    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                }}
                return true;
            }})()"#,
            sel = js_str(selector),
            text = js_str(text),
        );
        self.eval_bool(js).await
    }

    pub async fn press_key(&self, selector: &str, key: &str) -> bool {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return false;
                el.dispatchEvent(new KeyboardEvent('keydown', {{ key: {key}, bubbles: true }}));
                return true;
            }})()"#,
            sel = js_str(selector),
            key = js_str(key),
        );
        self.eval_bool(js).await
    }

    /// Click the first button/link whose text contains one of `texts`, tried
    /// in priority order. Returns the matched text.
    pub async fn click_by_texts(&self, texts: &[&str]) -> Option<String> {
        let js = format!(
            r#"(() => {{
                const texts = {texts};
                const btns = Array.from(document.querySelectorAll("button, a, [role='button']"));
                for (const t of texts) {{
                    const hit = btns.find(b => (b.textContent || '').trim().toLowerCase().includes(t));
                    if (hit) {{ hit.click(); return t; }}
                }}
                return null;
            }})()"#,
            texts = serde_json::to_string(texts).expect("texts serialize"),
        );
        self.eval_json(js)
            .await
            .and_then(|v| v.as_str().map(str::to_string))
    }

    /// Scroll to the bottom then back to the top, nudging lazy-mounted
    /// content into rendering.
    pub async fn scroll_bounce(&self) {
        let js = r#"(async () => {
            window.scrollTo({ top: document.body.scrollHeight, behavior: 'smooth' });
            await new Promise(r => setTimeout(r, 1000));
            window.scrollTo({ top: 0, behavior: 'smooth' });
            await new Promise(r => setTimeout(r, 1000));
            return true;
        })()"#;
        let _ = self.eval_bool(js.to_string()).await;
    }

    pub async fn scroll_to_bottom(&self) {
        let js = r#"(() => { window.scrollTo({ top: document.body.scrollHeight, behavior: 'smooth' }); return true; })()"#;
        let _ = self.eval_bool(js.to_string()).await;
    }

    /// Whether the page's visible text contains every phrase (lowercased).
    pub async fn body_text_contains_all(&self, phrases: &[&str]) -> bool {
        let js = format!(
            r#"(() => {{
                const t = (document.body && document.body.innerText ? document.body.innerText : '').toLowerCase();
                return {phrases}.every(p => t.includes(p));
            }})()"#,
            phrases = serde_json::to_string(phrases).expect("phrases serialize"),
        );
        self.eval_bool(js).await
    }

    /// Leaf elements whose trimmed text is exactly the placeholder marker.
    pub async fn count_select_one_markers(&self) -> u64 {
        let js = format!(
            r#"(() => Array.from(document.querySelectorAll('div, span, p, button, label'))
                .filter(el => (el.textContent || '').trim() === {marker} && el.children.length === 0)
                .length)()"#,
            marker = js_str(crate::engine::hints::SELECT_ONE_MARKER),
        );
        self.eval_json(js)
            .await
            .and_then(|v| v.as_u64())
            .unwrap_or(0)
    }

    pub async fn has_validation_errors(&self) -> bool {
        let js = format!(
            r#"(() => (document.body && document.body.innerText ? document.body.innerText : '')
                .toLowerCase().includes({text}))()"#,
            text = js_str(crate::engine::hints::REQUIRED_VALIDATION_TEXT),
        );
        self.eval_bool(js).await
    }
}
