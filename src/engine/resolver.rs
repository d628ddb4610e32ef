//! Field resolution: lowercased hint text → profile value.
//!
//! Priority order: direct email/phone substring rules, then the
//! longest-match-first keyword table, then the fixed heuristic battery, then
//! the phone-field specializations. Resolution is deterministic for a given
//! hint + profile; only genuinely absent email/phone data falls through to a
//! generator, and that happens at planning time, not here.

use std::sync::OnceLock;

use regex::Regex;

use crate::engine::hints;
use crate::profile::{FieldKey, Profile};

/// Hints that look like a text input but are actually the platform's
/// type-to-filter pseudo-selects; their value must go through the picker
/// flow, not a plain commit.
pub fn wants_custom_dropdown(hint: &str) -> bool {
    hint.contains("how did you hear") || hint.contains("device type") || hint.contains("source")
}

fn leading_country_code() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+\d+").expect("valid phone-code pattern"))
}

/// National digits only: strip a leading `+NN` country prefix, then every
/// non-digit.
pub fn national_phone_digits(phone: &str) -> String {
    let stripped = leading_country_code().replace(phone, "");
    stripped.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Resolve a value for a hint. Returns `None` when nothing in the profile
/// applies — the caller decides whether a generated fallback is warranted for
/// this control type.
pub fn resolve_value(hint: &str, profile: &Profile) -> Option<String> {
    let mut value: Option<String> = None;

    // Immediate email/phone rules.
    if hint.contains("email") {
        value = profile.field(FieldKey::Email).map(str::to_string);
    } else if hint.contains("phone") {
        value = profile.field(FieldKey::PhoneNumber).map(str::to_string);
    }

    if value.is_none() {
        value = hints::lookup_keyword(hint, profile);
    }
    if value.is_none() {
        value = hints::lookup_battery(hint, profile);
    }

    // Phone specializations override whatever resolved above.
    if hint.contains("country phone code") || hint.contains("phone code") {
        value = Some(
            profile
                .field(FieldKey::PhoneCode)
                .unwrap_or("+1")
                .to_string(),
        );
    } else if hint.contains("phone number") && !hint.contains("country") {
        let phone = profile
            .field(FieldKey::PhoneNumber)
            .map(str::to_string)
            .unwrap_or_else(crate::profile::synth::random_phone);
        value = Some(national_phone_digits(&phone));
    } else if hint.contains("device type") || hint.contains("phone device") {
        value = Some(
            profile
                .field(FieldKey::PhoneDeviceType)
                .unwrap_or("Mobile")
                .to_string(),
        );
    }

    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile {
            email: Some("ada@lovelace.dev".into()),
            phone_number: Some("+14155550133".into()),
            city: Some("London".into()),
            linkedin_url: Some("https://linkedin.com/in/ada".into()),
            ..Default::default()
        }
    }

    #[test]
    fn email_rule_beats_keyword_table() {
        let got = resolve_value("email address", &profile()).unwrap();
        assert_eq!(got, "ada@lovelace.dev");
    }

    #[test]
    fn resolution_is_deterministic() {
        let p = profile();
        assert_eq!(resolve_value("city", &p), resolve_value("city", &p));
        assert_eq!(resolve_value("linkedin profile", &p).unwrap(), "https://linkedin.com/in/ada");
    }

    #[test]
    fn phone_number_field_gets_national_digits() {
        let got = resolve_value("phone number", &profile()).unwrap();
        assert_eq!(got, "4155550133");
    }

    #[test]
    fn phone_code_defaults_when_absent() {
        assert_eq!(resolve_value("country phone code", &Profile::default()).unwrap(), "+1");
    }

    #[test]
    fn unknown_hint_resolves_to_none() {
        assert_eq!(resolve_value("favorite color", &profile()), None);
    }

    #[test]
    fn custom_dropdown_routing_hints() {
        assert!(wants_custom_dropdown("how did you hear about us?"));
        assert!(wants_custom_dropdown("phone device type"));
        assert!(!wants_custom_dropdown("first name"));
    }
}
