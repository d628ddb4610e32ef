//! Policy-question flow: recovered text → normalized key → answer → option
//! choice, plus the bookkeeping that bounds retries across reruns.

use formpilot::engine::dropdown::choose_option;
use formpilot::engine::questions::{
    classify, normalize_question, Answer, AttemptTracker, ProcessedQuestions,
};
use formpilot::profile::Profile;

fn opts(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|s| s.to_string()).collect()
}

#[test]
fn work_authorization_without_profile_field_answers_yes() {
    // The profile has no workAuthorizedInCountry value; the conservative
    // fallback answers Yes, and the chosen option contains "yes" but not "no".
    let raw = "Are you legally authorized to work in the United States? * Select One";
    let question = normalize_question(raw);
    let answer = classify(&question, &Profile::default()).expect("fallback must answer");
    assert_eq!(answer, Answer::Yes);

    let options = opts(&["No, I am not", "Yes, I am"]);
    let picked = choose_option(&options, &answer).unwrap();
    assert_eq!(picked, 1);
    let text = options[picked].to_lowercase();
    assert!(text.contains("yes") && !text.contains("no"));
}

#[test]
fn profile_answer_overrides_fallback_default() {
    let profile = Profile {
        visa_sponsorship: Some("Yes".into()),
        ..Default::default()
    };
    let question = normalize_question("Will you now or in the future require visa sponsorship? Select One");
    assert_eq!(classify(&question, &profile), Some(Answer::Yes));
    assert_eq!(classify(&question, &Profile::default()), Some(Answer::No));
}

#[test]
fn prior_system_experience_ranks_strongest_yes() {
    let question = normalize_question("Do you have experience with Workday? Select One");
    let answer = classify(&question, &Profile::default()).unwrap();
    assert_eq!(answer, Answer::RankedYes);

    let options = opts(&[
        "No prior experience",
        "Yes - some basic exposure",
        "Yes - extensive day-to-day use",
    ]);
    assert_eq!(choose_option(&options, &answer), Some(2));
}

#[test]
fn normalized_question_deduplicates_across_reruns() {
    let mut processed = ProcessedQuestions::default();
    let a = normalize_question("Do you require sponsorship? Select One Yes No");
    let b = normalize_question("  Do you   require sponsorship?");
    assert_eq!(a, b, "whitespace/placeholder variants must share one key");

    assert!(!processed.contains(&a));
    processed.mark(&a);
    assert!(processed.contains(&b));
}

#[test]
fn attempt_cap_bounds_retries_per_question() {
    let mut attempts = AttemptTracker::new(3);
    let question = normalize_question("Are you willing to relocate? Select One");

    let mut granted = 0;
    for _ in 0..10 {
        if attempts.begin(&question) {
            granted += 1;
        }
    }
    assert_eq!(granted, 3, "attempts must cease at the cap");
    assert_eq!(attempts.count(&question), 3);

    // A different question has its own budget.
    assert!(attempts.begin("do you consent to a background check?"));
}
