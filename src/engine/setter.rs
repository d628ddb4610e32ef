//! Value planning: control snapshot + profile → the DOM action to take.
//!
//! Planning is pure so every rule here is testable without a browser; the
//! driver executes the resulting actions with the synthetic event sequences
//! from [`super::events`]. Absence of a match is never fatal — a control that
//! plans to nothing is simply left untouched.

use tracing::debug;

use crate::engine::hints::is_truthy;
use crate::engine::questions;
use crate::engine::resolver;
use crate::engine::snapshot::{ControlKind, ControlSnapshot};
use crate::profile::Profile;

/// One concrete mutation of the live form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomAction {
    /// Commit `value` through the native setter, then the commit events.
    SetValue { sel: String, value: String },
    /// Set checked state, then the commit events.
    SetChecked { sel: String, checked: bool },
    /// Native `.click()` on a radio.
    ClickRadio { sel: String },
    /// `selectedIndex = option_index` on a native select, then commit events.
    SelectOption { sel: String, option_index: usize },
    /// Open a combobox/pseudo-select and pick the option matching `target`.
    OpenPicker { sel: String, target: String },
}

impl DomAction {
    pub fn sel(&self) -> &str {
        match self {
            DomAction::SetValue { sel, .. }
            | DomAction::SetChecked { sel, .. }
            | DomAction::ClickRadio { sel }
            | DomAction::SelectOption { sel, .. }
            | DomAction::OpenPicker { sel, .. } => sel,
        }
    }
}

/// Match a value against native select option texts: exact case-insensitive
/// first, then substring containment.
pub fn match_select_option(options: &[String], value: &str) -> Option<usize> {
    let needle = value.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    if let Some(i) = options
        .iter()
        .position(|o| o.trim().to_lowercase() == needle)
    {
        return Some(i);
    }
    options
        .iter()
        .position(|o| o.trim().to_lowercase().contains(&needle))
}

/// Plan the action for one control. `None` means "leave it alone".
pub fn plan(control: &ControlSnapshot, profile: &Profile) -> Option<DomAction> {
    let hint = control.hint_lower();
    if hint.is_empty() {
        // No hint — never assign a value blind.
        return None;
    }

    let sel = control.sel.clone();
    let resolved = resolver::resolve_value(&hint, profile);

    match control.classify() {
        ControlKind::Checkbox => {
            let checked = resolved.as_deref().map(is_truthy).unwrap_or(false);
            Some(DomAction::SetChecked { sel, checked })
        }
        ControlKind::Radio => {
            let mut value = resolved;
            if value.is_none() && !control.question.is_empty() {
                value =
                    questions::profile_answer_for(&control.question.to_lowercase(), profile);
            }
            let value = value?;
            // Only act when the answer text appears in this radio's own label.
            if hint.contains(&value.trim().to_lowercase()) {
                Some(DomAction::ClickRadio { sel })
            } else {
                None
            }
        }
        ControlKind::Date => resolved.map(|value| DomAction::SetValue { sel, value }),
        ControlKind::Email => {
            let value = resolved.unwrap_or_else(crate::profile::synth::random_email);
            Some(DomAction::SetValue { sel, value })
        }
        ControlKind::Tel => {
            let value = resolved.unwrap_or_else(crate::profile::synth::random_phone);
            Some(DomAction::SetValue { sel, value })
        }
        ControlKind::Text => {
            let value = resolved?;
            if resolver::wants_custom_dropdown(&hint) {
                Some(DomAction::OpenPicker { sel, target: value })
            } else {
                Some(DomAction::SetValue { sel, value })
            }
        }
        ControlKind::TextArea => {
            let value = resolved
                .unwrap_or_else(|| crate::profile::synth::FILLER_SENTENCE.to_string());
            Some(DomAction::SetValue { sel, value })
        }
        ControlKind::Select => {
            let value = resolved?;
            match match_select_option(&control.options, &value) {
                Some(option_index) => Some(DomAction::SelectOption { sel, option_index }),
                None => {
                    debug!(
                        "no option match for {:?} in select {:?} (options: {:?})",
                        value, hint, control.options
                    );
                    None
                }
            }
        }
        ControlKind::Combobox => {
            resolved.map(|target| DomAction::OpenPicker { sel, target })
        }
    }
}

/// Plan actions for a whole snapshot, in document order.
pub fn plan_pass(controls: &[ControlSnapshot], profile: &Profile) -> Vec<DomAction> {
    controls
        .iter()
        .filter_map(|c| plan(c, profile))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_control(sel: &str, hint: &str) -> ControlSnapshot {
        ControlSnapshot {
            sel: sel.into(),
            tag: "input".into(),
            kind: "text".into(),
            hint: hint.into(),
            ..Default::default()
        }
    }

    #[test]
    fn checkbox_checked_only_for_truthy_tokens() {
        let profile = Profile {
            veteran: Some("No".into()),
            ..Default::default()
        };
        let mut c = text_control("g0:0", "Veteran status");
        c.kind = "checkbox".into();
        // Hint "veteran" is not in the keyword table; the checkbox keeps its
        // unchecked state via an explicit SetChecked(false).
        match plan(&c, &profile) {
            Some(DomAction::SetChecked { checked, .. }) => assert!(!checked),
            other => panic!("expected SetChecked, got {other:?}"),
        }
    }

    #[test]
    fn hintless_control_is_skipped_entirely() {
        let profile = Profile::default().canonical();
        let c = text_control("g0:1", "");
        assert_eq!(plan(&c, &profile), None);
    }

    #[test]
    fn select_matches_exact_before_substring() {
        let options = vec![
            "United States of America".to_string(),
            "Canada".to_string(),
            "Mexico".to_string(),
        ];
        assert_eq!(match_select_option(&options, "canada"), Some(1));
        assert_eq!(match_select_option(&options, "United States"), Some(0));
        assert_eq!(match_select_option(&options, "France"), None);
    }

    #[test]
    fn radio_clicks_only_matching_label() {
        let profile = Profile {
            previously_worked_for_company: Some("No".into()),
            ..Default::default()
        };
        let mk = |hint: &str| ControlSnapshot {
            sel: "g0:2".into(),
            tag: "input".into(),
            kind: "radio".into(),
            hint: hint.into(),
            question: "Have you previously worked for this company?".into(),
            ..Default::default()
        };
        assert!(matches!(
            plan(&mk("No"), &profile),
            Some(DomAction::ClickRadio { .. })
        ));
        assert_eq!(plan(&mk("Yes"), &profile), None);
    }

    #[test]
    fn textarea_gets_filler_when_nothing_resolves() {
        let profile = Profile::default();
        let c = ControlSnapshot {
            sel: "g0:3".into(),
            tag: "textarea".into(),
            hint: "Anything else we should know?".into(),
            ..Default::default()
        };
        match plan(&c, &profile) {
            Some(DomAction::SetValue { value, .. }) => {
                assert_eq!(value, crate::profile::synth::FILLER_SENTENCE)
            }
            other => panic!("expected SetValue, got {other:?}"),
        }
    }

    #[test]
    fn email_input_without_profile_value_gets_generated_fallback() {
        let profile = Profile::default();
        let mut c = text_control("g0:4", "Work Email");
        c.kind = "email".into();
        match plan(&c, &profile) {
            Some(DomAction::SetValue { value, .. }) => {
                assert!(value.contains('@'), "generated email expected, got {value:?}")
            }
            other => panic!("expected SetValue, got {other:?}"),
        }
    }
}
