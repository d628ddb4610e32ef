//! Policy/compliance question classification.
//!
//! A "Select One" marker has no label of its own; the governing question text
//! is recovered from surrounding DOM (by the injected script in
//! [`super::dropdown`]), normalized here into a stable key, then mapped to an
//! answer: first through the profile-field keyword table, then through a
//! static regex-keyed table of conservative defaults for questions no profile
//! field covers.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use aho_corasick::{AhoCorasick, MatchKind};
use regex::Regex;

use crate::profile::{FieldKey, Profile};

/// A resolved answer for a policy question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    /// A literal option text to look for (e.g. a referral source).
    Text(String),
    /// "Prior experience with this system"-style questions where several
    /// non-binary phrasings of yes exist; pick the strongest available.
    RankedYes,
}

impl Answer {
    pub fn from_profile_value(value: &str) -> Answer {
        let v = value.trim().to_lowercase();
        if v.starts_with('y') || v == "true" || v == "1" {
            Answer::Yes
        } else if v.starts_with('n') || v == "false" || v == "0" {
            Answer::No
        } else {
            Answer::Text(value.trim().to_string())
        }
    }
}

// ── Question text normalization ──────────────────────────────────────────────

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace pattern"))
}

fn trailing_yes_no_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Stray option tokens accidentally concatenated from sibling text.
    RE.get_or_init(|| Regex::new(r"(?i)[\s:]*(yes|no)\s*$").expect("valid trailing pattern"))
}

/// Normalize recovered question text into the dedup/lookup key: placeholder
/// phrase removed, whitespace collapsed, trailing asterisks dropped, content
/// cut at the first `?`, trailing stray yes/no tokens stripped, lowercased.
pub fn normalize_question(raw: &str) -> String {
    let mut s = raw.replace(crate::engine::hints::SELECT_ONE_MARKER, " ");
    s = whitespace_re().replace_all(&s, " ").trim().to_string();
    if let Some(pos) = s.find('?') {
        s.truncate(pos + 1);
    }
    s = s.trim_end_matches(['*', ' ']).to_string();
    loop {
        let stripped = trailing_yes_no_re().replace(&s, "").to_string();
        if stripped == s {
            break;
        }
        s = stripped;
    }
    s.trim().to_lowercase()
}

// ── Profile-field keyword table ──────────────────────────────────────────────

const PROFILE_QUESTION_KEYWORDS: &[(&str, FieldKey)] = &[
    ("authorized to work", FieldKey::WorkAuthorizedInCountry),
    ("work authorization", FieldKey::WorkAuthorizedInCountry),
    ("legally authorized", FieldKey::WorkAuthorizedInCountry),
    ("require visa", FieldKey::VisaSponsorship),
    ("visa sponsorship", FieldKey::VisaSponsorship),
    ("sponsorship", FieldKey::VisaSponsorship),
    ("relocat", FieldKey::Relocation),
    ("disabilit", FieldKey::Disability),
    ("veteran", FieldKey::Veteran),
    ("previously worked", FieldKey::PreviouslyWorkedForCompany),
    ("worked for", FieldKey::PreviouslyWorkedForCompany),
    ("employee or contractor", FieldKey::PreviouslyWorkedForCompany),
    ("hear about", FieldKey::HowDidYouHearAboutUs),
    ("referral source", FieldKey::HowDidYouHearAboutUs),
    ("gender", FieldKey::Gender),
    ("marital", FieldKey::MaritalStatus),
    ("nationality", FieldKey::Nationality),
];

fn profile_keyword_matcher() -> &'static AhoCorasick {
    static AC: OnceLock<AhoCorasick> = OnceLock::new();
    AC.get_or_init(|| {
        AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostLongest)
            .build(PROFILE_QUESTION_KEYWORDS.iter().map(|(k, _)| *k))
            .expect("valid question keyword patterns")
    })
}

/// Profile value for a question, via the keyword table. The question text
/// must already be lowercased.
pub fn profile_answer_for(question: &str, profile: &Profile) -> Option<String> {
    for m in profile_keyword_matcher().find_iter(question) {
        let (_, key) = PROFILE_QUESTION_KEYWORDS[m.pattern().as_usize()];
        if let Some(v) = profile.field(key) {
            return Some(v.to_string());
        }
    }
    None
}

// ── Fallback answers for questions with no profile field ─────────────────────

struct FallbackRule {
    pattern: Regex,
    answer: Answer,
}

fn fallback_rules() -> &'static [FallbackRule] {
    static RULES: OnceLock<Vec<FallbackRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        let rule = |p: &str, answer: Answer| FallbackRule {
            pattern: Regex::new(p).expect("valid fallback pattern"),
            answer,
        };
        vec![
            rule(r"(?i)experience\s+(with|using)|have\s+you\s+used", Answer::RankedYes),
            rule(r"(?i)authoriz\w*\s+to\s+work|work\s+authorization|legally\s+.{0,20}work", Answer::Yes),
            rule(r"(?i)require\s+.{0,20}(visa|sponsorship)|sponsor", Answer::No),
            rule(
                r"(?i)export\s+control|iran|cuba|north\s+korea|syria|sanction",
                Answer::No,
            ),
            rule(r"(?i)relocat", Answer::Yes),
            rule(r"(?i)non-?compete|restrictive\s+covenant", Answer::No),
            rule(
                r"(?i)previously\s+(worked|employed)|former\s+(employee|contractor)|worked\s+for",
                Answer::No,
            ),
            rule(r"(?i)disabilit|veteran", Answer::No),
            rule(r"(?i)18\s+years|age\s+of\s+18|minimum\s+age", Answer::Yes),
            rule(r"(?i)background\s+check|drug\s+(test|screen)", Answer::Yes),
            rule(
                r"(?i)acknowledge|agree|certify|confirm|consent|understand",
                Answer::Yes,
            ),
        ]
    })
}

/// Classify a normalized question into an answer: profile table first, then
/// the fallback table. `None` means we genuinely have no idea — the widget is
/// left untouched.
pub fn classify(question: &str, profile: &Profile) -> Option<Answer> {
    if let Some(v) = profile_answer_for(question, profile) {
        return Some(Answer::from_profile_value(&v));
    }
    fallback_rules()
        .iter()
        .find(|r| r.pattern.is_match(question))
        .map(|r| r.answer.clone())
}

// ── Attempt bookkeeping ──────────────────────────────────────────────────────

/// Per-question retry counter. Attempts strictly increase per call and stop
/// being granted once the cap is reached, so widget interaction terminates
/// even when DOM verification never succeeds.
#[derive(Debug)]
pub struct AttemptTracker {
    attempts: HashMap<String, u32>,
    cap: u32,
}

impl AttemptTracker {
    pub fn new(cap: u32) -> Self {
        Self {
            attempts: HashMap::new(),
            cap: cap.max(1),
        }
    }

    /// Register one attempt for `key`. Returns `false` once the cap is spent.
    pub fn begin(&mut self, key: &str) -> bool {
        let count = self.attempts.entry(key.to_string()).or_insert(0);
        if *count >= self.cap {
            return false;
        }
        *count += 1;
        true
    }

    pub fn count(&self, key: &str) -> u32 {
        self.attempts.get(key).copied().unwrap_or(0)
    }
}

/// Process-lifetime memory of questions already answered, so observer-driven
/// reruns don't re-interact with settled widgets.
#[derive(Debug, Default)]
pub struct ProcessedQuestions {
    seen: HashSet<String>,
}

impl ProcessedQuestions {
    pub fn contains(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    pub fn mark(&mut self, key: &str) {
        self.seen.insert(key.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_placeholder_asterisks_and_stray_tokens() {
        let raw = "Are you legally authorized to work in the United States?* Select One Yes No";
        let n = normalize_question(raw);
        assert_eq!(n, "are you legally authorized to work in the united states?");
        // Stable under repetition — usable as a dedup key.
        assert_eq!(normalize_question(&n), n);
    }

    #[test]
    fn normalization_cuts_at_first_question_mark() {
        let n = normalize_question("Do you require sponsorship? If yes, explain. Yes");
        assert_eq!(n, "do you require sponsorship?");
    }

    #[test]
    fn profile_table_wins_over_fallback() {
        let profile = Profile {
            visa_sponsorship: Some("Yes".into()),
            ..Default::default()
        };
        let q = "will you require visa sponsorship?";
        assert_eq!(classify(q, &profile), Some(Answer::Yes));
        // Same question with no profile field → conservative fallback "No".
        assert_eq!(classify(q, &Profile::default()), Some(Answer::No));
    }

    #[test]
    fn work_authorization_falls_back_to_yes() {
        let q = normalize_question("Are you authorized to work in this country? Select One");
        assert_eq!(classify(&q, &Profile::default()), Some(Answer::Yes));
    }

    #[test]
    fn export_control_falls_back_to_no() {
        let q = "are you a resident of iran, cuba, north korea or syria?";
        assert_eq!(classify(q, &Profile::default()), Some(Answer::No));
    }

    #[test]
    fn experience_questions_rank_yes_phrasings() {
        let q = "do you have experience with workday?";
        assert_eq!(classify(q, &Profile::default()), Some(Answer::RankedYes));
    }

    #[test]
    fn unknown_question_classifies_to_none() {
        assert_eq!(classify("what is your favorite color?", &Profile::default()), None);
    }

    #[test]
    fn attempts_strictly_increase_then_cease_at_cap() {
        let mut tracker = AttemptTracker::new(3);
        let key = "do you require sponsorship?";
        let mut last = 0;
        for _ in 0..3 {
            assert!(tracker.begin(key));
            let now = tracker.count(key);
            assert_eq!(now, last + 1);
            last = now;
        }
        // Cap spent: no more attempts granted, counter frozen.
        assert!(!tracker.begin(key));
        assert!(!tracker.begin(key));
        assert_eq!(tracker.count(key), 3);
    }
}
