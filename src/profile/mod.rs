//! The user-supplied profile: a flat record of optional fields plus three
//! ordered experience lists. Parsed once from the stored JSON blob,
//! normalized before each run, immutable during a run.
//!
//! Keys are camelCase (plus the literal `DoB`) to match the blob the external
//! UI writes.

pub mod synth;

use serde::{Deserialize, Serialize};

use synth::{fallback, random_date_iso, random_email, random_phone, random_street_address};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Profile {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub family_name: Option<String>,
    pub preferred_name: Option<String>,
    pub full_name: Option<String>,

    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub phone_code: Option<String>,
    pub phone_device_type: Option<String>,
    #[serde(rename = "DoB")]
    pub dob: Option<String>,

    pub address1: Option<String>,
    pub address2: Option<String>,
    pub street: Option<String>,
    pub apartment: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,

    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub twitter_url: Option<String>,

    pub nationality: Option<String>,
    pub marital_status: Option<String>,
    pub gender: Option<String>,
    pub how_did_you_hear_about_us: Option<String>,

    // Policy-question answers ("Yes"/"No" strings as the UI saves them).
    pub work_authorized_in_country: Option<String>,
    pub visa_sponsorship: Option<String>,
    pub relocation: Option<String>,
    pub disability: Option<String>,
    pub veteran: Option<String>,
    pub previously_worked_for_company: Option<String>,

    pub work_experiences: Vec<WorkExperience>,
    pub education_experiences: Vec<EducationExperience>,
    pub project_experiences: Vec<ProjectExperience>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkExperience {
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub work_type: Option<String>,
    pub still_working: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EducationExperience {
    pub college_name: Option<String>,
    pub education_type: Option<String>,
    pub field: Option<String>,
    pub grade: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub still_studying: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectExperience {
    pub project_name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub git_url: Option<String>,
    pub host_url: Option<String>,
}

/// Typed handle for every string-valued profile field, so the heuristic
/// tables can name candidate fields without stringly-typed lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    FirstName,
    MiddleName,
    LastName,
    FamilyName,
    PreferredName,
    FullName,
    Email,
    PhoneNumber,
    PhoneCode,
    PhoneDeviceType,
    Dob,
    Address1,
    Address2,
    Street,
    Apartment,
    City,
    State,
    Zip,
    Country,
    LinkedinUrl,
    GithubUrl,
    TwitterUrl,
    Nationality,
    MaritalStatus,
    Gender,
    HowDidYouHearAboutUs,
    WorkAuthorizedInCountry,
    VisaSponsorship,
    Relocation,
    Disability,
    Veteran,
    PreviouslyWorkedForCompany,
}

impl Profile {
    /// Present, non-empty value for a field — empty strings count as absent.
    pub fn field(&self, key: FieldKey) -> Option<&str> {
        let v = match key {
            FieldKey::FirstName => &self.first_name,
            FieldKey::MiddleName => &self.middle_name,
            FieldKey::LastName => &self.last_name,
            FieldKey::FamilyName => &self.family_name,
            FieldKey::PreferredName => &self.preferred_name,
            FieldKey::FullName => &self.full_name,
            FieldKey::Email => &self.email,
            FieldKey::PhoneNumber => &self.phone_number,
            FieldKey::PhoneCode => &self.phone_code,
            FieldKey::PhoneDeviceType => &self.phone_device_type,
            FieldKey::Dob => &self.dob,
            FieldKey::Address1 => &self.address1,
            FieldKey::Address2 => &self.address2,
            FieldKey::Street => &self.street,
            FieldKey::Apartment => &self.apartment,
            FieldKey::City => &self.city,
            FieldKey::State => &self.state,
            FieldKey::Zip => &self.zip,
            FieldKey::Country => &self.country,
            FieldKey::LinkedinUrl => &self.linkedin_url,
            FieldKey::GithubUrl => &self.github_url,
            FieldKey::TwitterUrl => &self.twitter_url,
            FieldKey::Nationality => &self.nationality,
            FieldKey::MaritalStatus => &self.marital_status,
            FieldKey::Gender => &self.gender,
            FieldKey::HowDidYouHearAboutUs => &self.how_did_you_hear_about_us,
            FieldKey::WorkAuthorizedInCountry => &self.work_authorized_in_country,
            FieldKey::VisaSponsorship => &self.visa_sponsorship,
            FieldKey::Relocation => &self.relocation,
            FieldKey::Disability => &self.disability,
            FieldKey::Veteran => &self.veteran,
            FieldKey::PreviouslyWorkedForCompany => &self.previously_worked_for_company,
        };
        v.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Fill the canonical contact/address fields with safe synthetic defaults
    /// so downstream filling never operates on absent data. Present non-empty
    /// values are never altered.
    pub fn canonical(&self) -> Profile {
        let mut p = self.clone();
        p.email = Some(fallback(&p.email, random_email));
        p.phone_number = Some(fallback(&p.phone_number, random_phone));
        p.dob = Some(fallback(&p.dob, || random_date_iso(1980, 2004)));
        p.first_name = Some(fallback(&p.first_name, || "John".to_string()));
        p.last_name = Some(fallback(&p.last_name, || "Doe".to_string()));
        p.address1 = Some(fallback(&p.address1, random_street_address));
        p.city = Some(fallback(&p.city, || "San Francisco".to_string()));
        p.state = Some(fallback(&p.state, || "CA".to_string()));
        p.zip = Some(fallback(&p.zip, || "94105".to_string()));
        p.country = Some(fallback(&p.country, || "United States".to_string()));
        p
    }

    /// Digest for the settings surface — never echoes the raw blob.
    pub fn summary(&self) -> crate::core::types::ProfileSummary {
        let name = match (&self.full_name, &self.first_name, &self.last_name) {
            (Some(full), _, _) if !full.trim().is_empty() => Some(full.trim().to_string()),
            (_, first, last) => {
                let joined: Vec<&str> = [first, last]
                    .iter()
                    .filter_map(|v| v.as_deref())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect();
                if joined.is_empty() {
                    None
                } else {
                    Some(joined.join(" "))
                }
            }
        };
        crate::core::types::ProfileSummary {
            present: true,
            name,
            email: self.field(FieldKey::Email).map(str::to_string),
            work_entries: self.work_experiences.len(),
            education_entries: self.education_experiences.len(),
            project_entries: self.project_experiences.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_backfills_empty_email_every_time() {
        let p = Profile {
            email: Some(String::new()),
            ..Default::default()
        };
        for _ in 0..5 {
            let c = p.canonical();
            let email = c.email.unwrap();
            assert!(!email.is_empty());
            assert!(email.contains('@'));
        }
    }

    #[test]
    fn canonical_never_alters_present_email() {
        let p = Profile {
            email: Some("ada@lovelace.dev".to_string()),
            ..Default::default()
        };
        assert_eq!(p.canonical().email.as_deref(), Some("ada@lovelace.dev"));
    }

    #[test]
    fn field_treats_blank_as_absent() {
        let p = Profile {
            city: Some("  ".to_string()),
            state: Some("CA".to_string()),
            ..Default::default()
        };
        assert_eq!(p.field(FieldKey::City), None);
        assert_eq!(p.field(FieldKey::State), Some("CA"));
    }

    #[test]
    fn profile_parses_camel_case_blob() {
        let blob = serde_json::json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "DoB": "1815-12-10",
            "workExperiences": [{"jobTitle": "Analyst", "stillWorking": true}]
        });
        let p: Profile = serde_json::from_value(blob).unwrap();
        assert_eq!(p.first_name.as_deref(), Some("Ada"));
        assert_eq!(p.dob.as_deref(), Some("1815-12-10"));
        assert_eq!(p.work_experiences.len(), 1);
        assert_eq!(p.work_experiences[0].still_working, Some(true));
    }
}
