//! Mutation watching: react to content the main loop hasn't seen yet.
//!
//! An injected `MutationObserver` buffers signals ("a Select One marker
//! mounted", "a required-validation message appeared") into a page-side
//! queue. The Rust side drains that queue on a fixed cadence and folds the
//! signals into a bounded, deduplicated recheck queue, throttled by a
//! minimum-gap guard so interleaved triggers can't stampede the page.

use std::collections::VecDeque;

use crate::engine::driver::PageDriver;
use crate::engine::hints::{REQUIRED_VALIDATION_TEXT, SELECT_ONE_MARKER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecheckSignal {
    /// A placeholder marker appeared — re-run the question audit.
    Marker,
    /// Validation text appeared — re-run the required-field sweep too.
    Validation,
}

/// Bounded, deduplicated queue of pending rechecks. A signal kind already
/// pending is not enqueued again; the audit it triggers re-reads current DOM
/// state anyway.
#[derive(Debug, Default)]
pub struct RecheckQueue {
    pending: VecDeque<RecheckSignal>,
}

impl RecheckQueue {
    const CAP: usize = 8;

    pub fn push(&mut self, signal: RecheckSignal) -> bool {
        if self.pending.contains(&signal) || self.pending.len() >= Self::CAP {
            return false;
        }
        self.pending.push_back(signal);
        true
    }

    pub fn pop(&mut self) -> Option<RecheckSignal> {
        self.pending.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

const INSTALL_TEMPLATE: &str = r#"
(() => {
    if (window.__fp_observer) return true;
    window.__fp_pending = [];
    const marker = __MARKER__;
    const validation = __VALIDATION__;
    const scan = (node) => {
        if (!node || !node.textContent) return;
        const t = node.textContent;
        if (t.includes(marker)) window.__fp_pending.push('marker');
        if (t.toLowerCase().includes(validation)) window.__fp_pending.push('validation');
        if (window.__fp_pending.length > 64) window.__fp_pending.length = 64;
    };
    const obs = new MutationObserver((muts) => {
        for (const m of muts) for (const n of m.addedNodes) scan(n);
    });
    obs.observe(document.body, { childList: true, subtree: true });
    window.__fp_observer = obs;
    return true;
})()
"#;

/// Install the page-side observer. Idempotent.
pub async fn install(driver: &PageDriver) -> bool {
    let js = INSTALL_TEMPLATE
        .replace("__MARKER__", &serde_json::to_string(SELECT_ONE_MARKER).unwrap())
        .replace(
            "__VALIDATION__",
            &serde_json::to_string(REQUIRED_VALIDATION_TEXT).unwrap(),
        );
    driver.eval_bool(js).await
}

/// Drain the page-side signal buffer.
pub async fn drain(driver: &PageDriver) -> Vec<RecheckSignal> {
    let js = r#"(() => {
        const p = window.__fp_pending || [];
        window.__fp_pending = [];
        return p;
    })()"#;
    match driver.eval_json(js.to_string()).await {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v.as_str() {
                Some("marker") => Some(RecheckSignal::Marker),
                Some("validation") => Some(RecheckSignal::Validation),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_dedupes_pending_signals() {
        let mut q = RecheckQueue::default();
        assert!(q.push(RecheckSignal::Marker));
        assert!(!q.push(RecheckSignal::Marker));
        assert!(q.push(RecheckSignal::Validation));
        assert_eq!(q.pop(), Some(RecheckSignal::Marker));
        // Popped — the kind may be enqueued again.
        assert!(q.push(RecheckSignal::Marker));
    }

    #[test]
    fn queue_is_bounded() {
        let mut q = RecheckQueue::default();
        q.push(RecheckSignal::Marker);
        q.push(RecheckSignal::Validation);
        // Only two kinds exist; dedup keeps the queue far below CAP, and a
        // full queue refuses pushes rather than growing.
        for _ in 0..32 {
            q.push(RecheckSignal::Marker);
        }
        let mut drained = 0;
        while q.pop().is_some() {
            drained += 1;
        }
        assert!(drained <= RecheckQueue::CAP);
    }
}
