//! Synthetic DOM event sequences.
//!
//! The target platform's reactive framework only notices value changes that
//! arrive through events, and its widgets only open on a full pointer
//! gesture. The exact lists are tied to that framework and kept here as
//! configurable constants rather than scattered through the injected scripts.

#[derive(Debug, Clone, Copy)]
pub struct EventProfile {
    /// Dispatched (bubbling) after a value/checked mutation commits.
    pub commit: &'static [&'static str],
    /// Pointer/mouse sequence dispatched to open click-to-open widgets.
    pub gesture: &'static [&'static str],
}

pub const DEFAULT_EVENTS: EventProfile = EventProfile {
    commit: &["input", "change"],
    gesture: &["pointerdown", "mousedown", "mouseup", "click"],
};

impl EventProfile {
    /// JSON array literal for splicing into injected scripts.
    pub fn commit_json(&self) -> String {
        serde_json::to_string(self.commit).expect("static event list serializes")
    }

    pub fn gesture_json(&self) -> String {
        serde_json::to_string(self.gesture).expect("static event list serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_sequence_is_exactly_input_then_change() {
        assert_eq!(DEFAULT_EVENTS.commit, ["input", "change"]);
        assert_eq!(DEFAULT_EVENTS.commit_json(), r#"["input","change"]"#);
    }

    #[test]
    fn gesture_ends_with_click() {
        assert_eq!(DEFAULT_EVENTS.gesture.last(), Some(&"click"));
    }
}
