use serde::{Deserialize, Serialize};

/// Literal type tag for the inbound start command.
pub const START_AUTOFILL: &str = "START_AUTOFILL";

/// Inbound command envelope (`POST /command`).
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Must equal [`START_AUTOFILL`]; anything else is rejected.
    #[serde(rename = "type")]
    pub command_type: String,
    /// Application URL to open. Falls back to the configured `target_url`.
    #[serde(default)]
    pub url: Option<String>,
}

/// Asynchronous reply to a start command — sent once the bounded flow has
/// completed or thrown.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    /// `"completed"`, `"already_running"`, or `"failed"`.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Fill/advance iterations actually run.
    #[serde(default)]
    pub iterations: u32,
    /// Whether the review gate let a final submit through.
    #[serde(default)]
    pub submitted: bool,
    pub finished_at: String,
}

/// `POST /profile` — store the raw profile blob (opaque JSON, written by the
/// external UI collaborator).
#[derive(Debug, Serialize, Deserialize)]
pub struct SaveProfileRequest {
    pub profile: serde_json::Value,
}

/// `GET /profile` — a human-readable digest, never the raw blob.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct ProfileSummary {
    pub present: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub work_entries: usize,
    #[serde(default)]
    pub education_entries: usize,
    #[serde(default)]
    pub project_entries: usize,
}

/// `POST /settings` — the autostart flag persisted alongside the profile.
#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsRequest {
    pub autofill_on_load: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub autofill_on_load: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
