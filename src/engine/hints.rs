//! The heuristic rule tables: label-keyword → candidate profile fields.
//!
//! One ordered table serves label-based filling, section filling, and policy
//! classification alike. Matching is longest-keyword-first so "address line 2"
//! beats "address" on the same hint; within one keyword, the first candidate
//! field with a present non-empty value wins.

use std::sync::OnceLock;

use crate::profile::{FieldKey, Profile};

/// Literal placeholder text marking an unopened pseudo-select widget.
pub const SELECT_ONE_MARKER: &str = "Select One";

/// Validation message the platform renders under unfilled required fields.
pub const REQUIRED_VALIDATION_TEXT: &str = "required and must have a value";

/// Advance affordances tried in priority order each iteration. The final
/// submit is deliberately absent — it only goes through the review gate.
pub const ADVANCE_TEXTS: &[&str] = &["save and continue", "continue", "next", "review", "ok"];

/// Labels that identify the final submit control on the review page.
pub const SUBMIT_TEXTS: &[&str] = &["submit"];

/// Summary-section phrases whose joint presence marks the review page.
pub const REVIEW_SECTION_PHRASES: &[&str] =
    &["my information", "my experience", "application questions"];

/// Tokens treated as an affirmative value for checkboxes. Exact set
/// membership, not substring.
pub const TRUTHY_TOKENS: &[&str] = &["yes", "y", "true", "1"];

pub fn is_truthy(value: &str) -> bool {
    let v = value.trim().to_ascii_lowercase();
    TRUTHY_TOKENS.iter().any(|t| *t == v)
}

/// Keyword → ordered candidate profile fields.
pub const FIELD_HINTS: &[(&str, &[FieldKey])] = &[
    ("first name", &[FieldKey::FirstName, FieldKey::PreferredName]),
    ("given name", &[FieldKey::FirstName]),
    ("middle name", &[FieldKey::MiddleName]),
    ("last name", &[FieldKey::LastName, FieldKey::FamilyName]),
    ("surname", &[FieldKey::LastName]),
    ("family name", &[FieldKey::FamilyName, FieldKey::LastName]),
    ("preferred name", &[FieldKey::PreferredName]),
    ("full name", &[FieldKey::FullName]),
    ("email", &[FieldKey::Email]),
    ("phone", &[FieldKey::PhoneNumber]),
    ("mobile", &[FieldKey::PhoneNumber]),
    ("address", &[FieldKey::Address1]),
    ("address line 1", &[FieldKey::Address1, FieldKey::Street]),
    ("address line 2", &[FieldKey::Address2, FieldKey::Apartment]),
    ("city", &[FieldKey::City]),
    ("state", &[FieldKey::State]),
    ("province", &[FieldKey::State]),
    ("zip", &[FieldKey::Zip]),
    ("postal", &[FieldKey::Zip]),
    ("country", &[FieldKey::Country]),
    ("date of birth", &[FieldKey::Dob]),
    ("dob", &[FieldKey::Dob]),
    ("linkedin", &[FieldKey::LinkedinUrl]),
    ("github", &[FieldKey::GithubUrl]),
    ("twitter", &[FieldKey::TwitterUrl]),
    ("nationality", &[FieldKey::Nationality]),
    ("marital", &[FieldKey::MaritalStatus]),
    ("gender", &[FieldKey::Gender]),
    ("how did you hear", &[FieldKey::HowDidYouHearAboutUs]),
    ("hear about us", &[FieldKey::HowDidYouHearAboutUs]),
    ("referral source", &[FieldKey::HowDidYouHearAboutUs]),
    ("previously worked", &[FieldKey::PreviouslyWorkedForCompany]),
    ("worked for", &[FieldKey::PreviouslyWorkedForCompany]),
    ("employee or contractor", &[FieldKey::PreviouslyWorkedForCompany]),
];

/// Table indices sorted longest-keyword-first, computed once.
fn ordered_indices() -> &'static [usize] {
    static ORDER: OnceLock<Vec<usize>> = OnceLock::new();
    ORDER.get_or_init(|| {
        let mut idx: Vec<usize> = (0..FIELD_HINTS.len()).collect();
        idx.sort_by(|a, b| FIELD_HINTS[*b].0.len().cmp(&FIELD_HINTS[*a].0.len()));
        idx
    })
}

/// Longest-match-first scan of the keyword table. Returns the first candidate
/// field value present in the profile for the first keyword contained in the
/// hint. Deterministic for a fixed hint + profile.
pub fn lookup_keyword(hint: &str, profile: &Profile) -> Option<String> {
    for &i in ordered_indices() {
        let (keyword, candidates) = FIELD_HINTS[i];
        if !hint.contains(keyword) {
            continue;
        }
        for key in candidates {
            if let Some(v) = profile.field(*key) {
                return Some(v.to_string());
            }
        }
    }
    None
}

/// Fixed battery of heuristic substring checks, applied only when the keyword
/// table resolved nothing.
pub fn lookup_battery(hint: &str, profile: &Profile) -> Option<String> {
    let take = |key: FieldKey| profile.field(key).map(str::to_string);

    if hint.contains("first name") || hint.contains("given") {
        return take(FieldKey::FirstName).or_else(|| take(FieldKey::PreferredName));
    }
    if hint.contains("last name") || hint.contains("surname") || hint.contains("family") {
        return take(FieldKey::LastName);
    }
    if hint.contains("middle") {
        return take(FieldKey::MiddleName);
    }
    if hint.contains("address") && hint.contains("line 1") {
        return take(FieldKey::Address1);
    }
    if hint.contains("city") {
        return take(FieldKey::City);
    }
    if hint.contains("state") || hint.contains("province") {
        return take(FieldKey::State);
    }
    if hint.contains("zip") || hint.contains("postal") {
        return take(FieldKey::Zip);
    }
    if hint.contains("country") {
        return take(FieldKey::Country);
    }
    if hint.contains("linkedin") {
        return take(FieldKey::LinkedinUrl);
    }
    if hint.contains("github") {
        return take(FieldKey::GithubUrl);
    }
    if hint.contains("twitter") {
        return take(FieldKey::TwitterUrl);
    }
    if hint.contains("date of birth") || hint.contains("dob") {
        return take(FieldKey::Dob);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile {
            address1: Some("1 Main St".into()),
            address2: Some("Apt 4".into()),
            first_name: Some("Ada".into()),
            preferred_name: Some("Countess".into()),
            ..Default::default()
        }
    }

    #[test]
    fn longest_keyword_wins_over_shorter_prefix() {
        // "address line 2" and "address" both match; the longer key's
        // candidates must be tried first.
        let got = lookup_keyword("home address line 2", &profile()).unwrap();
        assert_eq!(got, "Apt 4");
        // Bare "address" hints still resolve through the short key.
        let got = lookup_keyword("street address", &profile()).unwrap();
        assert_eq!(got, "1 Main St");
    }

    #[test]
    fn first_candidate_with_value_wins() {
        let mut p = profile();
        assert_eq!(lookup_keyword("first name", &p).unwrap(), "Ada");
        p.first_name = None;
        assert_eq!(lookup_keyword("first name", &p).unwrap(), "Countess");
    }

    #[test]
    fn lookup_is_deterministic() {
        let p = profile();
        let a = lookup_keyword("legal first name", &p);
        let b = lookup_keyword("legal first name", &p);
        assert_eq!(a, b);
    }

    #[test]
    fn truthy_is_exact_set_membership() {
        for t in ["yes", "Y", "TRUE", "1", " yes "] {
            assert!(is_truthy(t), "{t:?} should be truthy");
        }
        for t in ["yes!", "yep", "0", "no", ""] {
            assert!(!is_truthy(t), "{t:?} should not be truthy");
        }
    }
}
