//! Synthetic filler data for profile fields the user left blank.
//!
//! Generated values are intentionally not reproducible — they are throwaway
//! filler acceptable to the target form, not identity data.

use rand::RngExt;

/// Generic textarea filler used when nothing in the profile resolves.
pub const FILLER_SENTENCE: &str =
    "Filled in automatically. Happy to provide further details upon request.";

pub fn random_string(len: usize) -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::rng();
    (0..len)
        .map(|_| CHARS[rng.random_range(0..CHARS.len())] as char)
        .collect()
}

pub fn random_digits(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

pub fn random_phone() -> String {
    format!("+1{}", random_digits(10))
}

pub fn random_email() -> String {
    format!("{}.{}@example.com", random_string(6), random_string(5))
}

/// `YYYY-MM-DD` within the given year range. Days cap at 28 so every month is
/// valid without calendar math.
pub fn random_date_iso(start_year: i32, end_year: i32) -> String {
    let mut rng = rand::rng();
    let year = rng.random_range(start_year..=end_year);
    let month = rng.random_range(1..=12u32);
    let day = rng.random_range(1..=28u32);
    format!("{year:04}-{month:02}-{day:02}")
}

pub fn random_street_address() -> String {
    let mut rng = rand::rng();
    format!("{} {} St", rng.random_range(1..1000), random_string(6))
}

/// Keep a present, non-empty value; otherwise invoke the generator.
pub fn fallback(value: &Option<String>, generate: impl FnOnce() -> String) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.clone(),
        _ => generate(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_has_user_at_domain_shape() {
        for _ in 0..20 {
            let e = random_email();
            let (user, domain) = e.split_once('@').expect("email must contain @");
            assert!(!user.is_empty());
            assert!(domain.contains('.'));
        }
    }

    #[test]
    fn fallback_keeps_present_values() {
        let v = Some("ada@lovelace.dev".to_string());
        assert_eq!(fallback(&v, random_email), "ada@lovelace.dev");
        assert!(!fallback(&Some("   ".into()), random_email).trim().is_empty());
        assert!(!fallback(&None, random_email).is_empty());
    }

    #[test]
    fn date_is_iso_shaped_and_in_range() {
        for _ in 0..20 {
            let d = random_date_iso(1980, 2004);
            let parts: Vec<&str> = d.split('-').collect();
            assert_eq!(parts.len(), 3);
            let year: i32 = parts[0].parse().unwrap();
            assert!((1980..=2004).contains(&year));
        }
    }
}
