use std::path::Path;

// ---------------------------------------------------------------------------
// PilotConfig — file-based config loader (formpilot.json) with env-var fallback
// ---------------------------------------------------------------------------

/// Flow sub-config (mirrors the `flow` key in formpilot.json).
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct PilotFlowConfig {
    /// Max full fill/advance iterations per run. Default: 3.
    pub max_iterations: Option<u32>,
    /// Delay between iterations, ms. Default: 2000.
    pub iteration_delay_ms: Option<u64>,
    /// Extra settle time after a successful advance click, ms. Default: 3000.
    pub advance_settle_ms: Option<u64>,
    /// Per-question retry cap for pseudo-select widgets. Default: 3.
    pub question_attempt_cap: Option<u32>,
    /// Minimum gap between observer-triggered rechecks, ms. Default: 1500.
    pub recheck_min_gap_ms: Option<u64>,
}

impl PilotFlowConfig {
    /// Max iterations: JSON field → `FORMPILOT_MAX_ITERATIONS` env var → 3.
    pub fn resolve_max_iterations(&self) -> u32 {
        if let Some(n) = self.max_iterations {
            return n.max(1);
        }
        std::env::var("FORMPILOT_MAX_ITERATIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3)
    }

    /// Inter-iteration delay: JSON field → `FORMPILOT_ITERATION_DELAY_MS` → 2000.
    pub fn resolve_iteration_delay_ms(&self) -> u64 {
        if let Some(n) = self.iteration_delay_ms {
            return n;
        }
        std::env::var("FORMPILOT_ITERATION_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2000)
    }

    /// Post-advance settle: JSON field → `FORMPILOT_ADVANCE_SETTLE_MS` → 3000.
    pub fn resolve_advance_settle_ms(&self) -> u64 {
        if let Some(n) = self.advance_settle_ms {
            return n;
        }
        std::env::var("FORMPILOT_ADVANCE_SETTLE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000)
    }

    /// Attempt cap per distinct question: JSON field → `FORMPILOT_QUESTION_ATTEMPT_CAP` → 3.
    pub fn resolve_question_attempt_cap(&self) -> u32 {
        if let Some(n) = self.question_attempt_cap {
            return n.max(1);
        }
        std::env::var("FORMPILOT_QUESTION_ATTEMPT_CAP")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3)
    }

    /// Observer recheck throttle: JSON field → `FORMPILOT_RECHECK_MIN_GAP_MS` → 1500.
    pub fn resolve_recheck_min_gap_ms(&self) -> u64 {
        if let Some(n) = self.recheck_min_gap_ms {
            return n;
        }
        std::env::var("FORMPILOT_RECHECK_MIN_GAP_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1500)
    }
}

/// Top-level config loaded from `formpilot.json`.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct PilotConfig {
    /// Application URL to open when a start command carries no URL of its own
    /// (and for autostart-on-launch).
    pub target_url: Option<String>,
    /// Hostname substring that marks a recognized application page. Autostart
    /// only fires when `target_url`'s host contains this. Default: "workday".
    pub host_marker: Option<String>,
    #[serde(default)]
    pub flow: PilotFlowConfig,
}

impl PilotConfig {
    /// Target URL: JSON field → `FORMPILOT_TARGET_URL` env var → `None`.
    pub fn resolve_target_url(&self) -> Option<String> {
        if let Some(u) = &self.target_url {
            if !u.trim().is_empty() {
                return Some(u.clone());
            }
        }
        std::env::var("FORMPILOT_TARGET_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
    }

    /// Host marker: JSON field → `FORMPILOT_HOST_MARKER` env var → "workday".
    pub fn resolve_host_marker(&self) -> String {
        if let Some(m) = &self.host_marker {
            if !m.trim().is_empty() {
                return m.trim().to_ascii_lowercase();
            }
        }
        std::env::var("FORMPILOT_HOST_MARKER")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_else(|| "workday".to_string())
    }

    /// Whether `url`'s hostname carries the recognized marker substring.
    pub fn is_recognized_host(&self, url: &str) -> bool {
        let marker = self.resolve_host_marker();
        url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase().contains(&marker)))
            .unwrap_or(false)
    }
}

/// Load `formpilot.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `FORMPILOT_CONFIG` env var path
/// 2. `./formpilot.json`  (process cwd)
/// 3. `../formpilot.json` (one level up)
///
/// Missing file → `PilotConfig::default()` (silent, all env-var fallbacks apply).
/// Parse error → log a warning, return `PilotConfig::default()`.
pub fn load_pilot_config() -> PilotConfig {
    let candidates: Vec<std::path::PathBuf> = {
        let mut v = vec![
            std::path::PathBuf::from("formpilot.json"),
            std::path::PathBuf::from("../formpilot.json"),
        ];
        if let Ok(env_path) = std::env::var("FORMPILOT_CONFIG") {
            v.insert(0, std::path::PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<PilotConfig>(&contents) {
                Ok(cfg) => {
                    tracing::info!("formpilot.json loaded from {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        "formpilot.json parse error at {}: {} — using defaults",
                        path.display(),
                        e
                    );
                    return PilotConfig::default();
                }
            },
            Err(_) => continue, // file not found at this path — try next
        }
    }

    PilotConfig::default()
}

// ---------------------------------------------------------------------------

pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";

/// Optional override for the Chromium-family browser executable.
///
/// Default behavior is **auto-discovery** (see `browser::manager::find_chrome_executable()`).
/// This function only returns a value when `CHROME_EXECUTABLE` is set to an existing path.
pub fn chrome_executable_override() -> Option<String> {
    let p = std::env::var(ENV_CHROME_EXECUTABLE).ok()?;
    let p = p.trim();
    if p.is_empty() {
        return None;
    }
    if Path::new(p).exists() {
        Some(p.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_marker_defaults_to_workday() {
        let cfg = PilotConfig::default();
        assert_eq!(cfg.resolve_host_marker(), "workday");
        assert!(cfg.is_recognized_host("https://acme.wd5.myworkdayjobs.com/careers"));
        assert!(!cfg.is_recognized_host("https://jobs.example.com/apply"));
    }

    #[test]
    fn unparseable_url_is_not_recognized() {
        let cfg = PilotConfig::default();
        assert!(!cfg.is_recognized_host("not a url"));
    }
}
