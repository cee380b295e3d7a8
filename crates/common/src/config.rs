//! Suite configuration
//!
//! Loaded from an optional TOML file, then overridden by `VETPROBE_*`
//! environment variables. The CLI harness applies its own flags last.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

pub const ENV_BASE_URL: &str = "VETPROBE_BASE_URL";
pub const ENV_EMAIL: &str = "VETPROBE_EMAIL";
pub const ENV_PASSWORD: &str = "VETPROBE_PASSWORD";
pub const ENV_LOCATION: &str = "VETPROBE_LOCATION";
pub const ENV_HEADLESS: &str = "VETPROBE_HEADLESS";

/// Complete suite configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Location (department) picked on the post-login screen
    #[serde(default = "default_location")]
    pub location: String,

    #[serde(default)]
    pub app: AppConfig,

    #[serde(default)]
    pub credentials: Credentials,

    #[serde(default)]
    pub timeouts: Timeouts,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub browser: BrowserSettings,

    #[serde(default)]
    pub runner: RunnerSettings,
}

fn default_location() -> String {
    "Master branch (Database)".to_string()
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            location: default_location(),
            app: AppConfig::default(),
            credentials: Credentials::default(),
            timeouts: Timeouts::default(),
            retry: RetryPolicy::default(),
            browser: BrowserSettings::default(),
            runner: RunnerSettings::default(),
        }
    }
}

/// Where the hosted application lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL without trailing slash
    #[serde(default)]
    pub base_url: String,

    #[serde(default = "default_login_path")]
    pub login_path: String,

    #[serde(default = "default_contacts_path")]
    pub contacts_path: String,

    #[serde(default = "default_patients_path")]
    pub patients_path: String,

    #[serde(default = "default_wellness_path")]
    pub wellness_plans_path: String,
}

fn default_login_path() -> String {
    "/login".to_string()
}
fn default_contacts_path() -> String {
    "/contacts".to_string()
}
fn default_patients_path() -> String {
    "/animals".to_string()
}
fn default_wellness_path() -> String {
    "/wellness-plans".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            login_path: default_login_path(),
            contacts_path: default_contacts_path(),
            patients_path: default_patients_path(),
            wellness_plans_path: default_wellness_path(),
        }
    }
}

impl AppConfig {
    /// Absolute URL for an application path
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }
}

/// Login credentials
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Wait windows, all in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub search_result_ms: u64,
    pub autocomplete_ms: u64,
    pub dropdown_ms: u64,
    pub success_toast_ms: u64,
    pub error_toast_ms: u64,
    pub recheck_ms: u64,
    pub location_prompt_ms: u64,
    pub navigation_ms: u64,
    pub element_ms: u64,
    /// Fixed delay after opening a surface that exposes no readiness signal
    pub settle_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            search_result_ms: 5000,
            autocomplete_ms: 5000,
            dropdown_ms: 5000,
            success_toast_ms: 5000,
            error_toast_ms: 5000,
            recheck_ms: 5000,
            location_prompt_ms: 10000,
            navigation_ms: 15000,
            element_ms: 10000,
            settle_ms: 300,
            poll_interval_ms: 100,
        }
    }
}

impl Timeouts {
    pub fn search_result(&self) -> Duration {
        Duration::from_millis(self.search_result_ms)
    }
    pub fn autocomplete(&self) -> Duration {
        Duration::from_millis(self.autocomplete_ms)
    }
    pub fn dropdown(&self) -> Duration {
        Duration::from_millis(self.dropdown_ms)
    }
    pub fn success_toast(&self) -> Duration {
        Duration::from_millis(self.success_toast_ms)
    }
    pub fn error_toast(&self) -> Duration {
        Duration::from_millis(self.error_toast_ms)
    }
    pub fn recheck(&self) -> Duration {
        Duration::from_millis(self.recheck_ms)
    }
    pub fn location_prompt(&self) -> Duration {
        Duration::from_millis(self.location_prompt_ms)
    }
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }
    pub fn element(&self) -> Duration {
        Duration::from_millis(self.element_ms)
    }
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Bounded retry for the login sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub login_attempts: u32,
    pub login_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            login_attempts: 2,
            login_delay_ms: 2000,
        }
    }
}

impl RetryPolicy {
    pub fn login_delay(&self) -> Duration {
        Duration::from_millis(self.login_delay_ms)
    }
}

/// Browser launch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Chrome/Chromium binary; auto-detected when unset
    pub executable: Option<PathBuf>,
    pub request_timeout_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            executable: None,
            request_timeout_ms: 30000,
        }
    }
}

/// Scenario runner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    /// Isolated browser sessions running at once
    pub parallelism: usize,
    pub output_dir: PathBuf,
    /// Check that the application answers before running scenarios
    pub preflight: bool,
    pub preflight_timeout_ms: u64,
    pub screenshot_on_failure: bool,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            parallelism: 1,
            output_dir: PathBuf::from("test-results"),
            preflight: true,
            preflight_timeout_ms: 30000,
            screenshot_on_failure: true,
        }
    }
}

impl RunnerSettings {
    pub fn preflight_timeout(&self) -> Duration {
        Duration::from_millis(self.preflight_timeout_ms)
    }
}

impl SuiteConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::debug!("Loaded suite config from {}", path.display());
            Ok(config)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `VETPROBE_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.app.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(email) = lookup(ENV_EMAIL) {
            self.credentials.email = email;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.credentials.password = password;
        }
        if let Some(location) = lookup(ENV_LOCATION) {
            self.location = location;
        }
        if let Some(headless) = lookup(ENV_HEADLESS) {
            self.browser.headless = parse_bool(ENV_HEADLESS, &headless)?;
        }
        Ok(())
    }

    /// Reject configurations that cannot drive a login
    pub fn validate(&self) -> Result<()> {
        if self.app.base_url.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_BASE_URL.to_string()));
        }
        if !self.app.base_url.starts_with("http://") && !self.app.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: "app.base_url".to_string(),
                reason: format!("expected an http(s) URL, got '{}'", self.app.base_url),
            });
        }
        if self.credentials.email.is_empty() {
            return Err(ConfigError::Missing(ENV_EMAIL.to_string()));
        }
        if self.credentials.password.is_empty() {
            return Err(ConfigError::Missing(ENV_PASSWORD.to_string()));
        }
        if self.retry.login_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "retry.login_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.runner.parallelism == 0 {
            return Err(ConfigError::Invalid {
                key: "runner.parallelism".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            key: key.to_string(),
            reason: format!("expected a boolean, got '{}'", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_overrides() {
        let env = vars(&[
            (ENV_BASE_URL, "https://clinic.example.com/"),
            (ENV_EMAIL, "botai@test.com"),
            (ENV_PASSWORD, "Sunshine1"),
            (ENV_HEADLESS, "false"),
        ]);
        let mut config = SuiteConfig::default();
        config.apply_vars(|k| env.get(k).cloned()).unwrap();

        assert_eq!(config.app.base_url, "https://clinic.example.com");
        assert_eq!(config.credentials.email, "botai@test.com");
        assert!(!config.browser.headless);
        assert_eq!(config.location, "Master branch (Database)");
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_requires_base_url() {
        let config = SuiteConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::Missing(k)) if k == ENV_BASE_URL));
    }

    #[test]
    fn test_invalid_bool_rejected() {
        let env = vars(&[(ENV_HEADLESS, "maybe")]);
        let mut config = SuiteConfig::default();
        assert!(config.apply_vars(|k| env.get(k).cloned()).is_err());
    }

    #[test]
    fn test_password_is_redacted() {
        let creds = Credentials::new("botai@test.com", "Sunshine1");
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("Sunshine1"));
        assert!(rendered.contains("botai@test.com"));
    }

    #[test]
    fn test_url_joining() {
        let app = AppConfig {
            base_url: "https://clinic.example.com".to_string(),
            ..Default::default()
        };
        assert_eq!(app.url("/contacts"), "https://clinic.example.com/contacts");
        assert_eq!(app.url("animals"), "https://clinic.example.com/animals");
        assert_eq!(app.url("https://other.example.com/x"), "https://other.example.com/x");
    }

    #[test]
    fn test_toml_round_trip_with_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vetprobe.toml");
        std::fs::write(
            &path,
            r#"
location = "North clinic"

[app]
base_url = "https://clinic.example.com"

[timeouts]
search_result_ms = 8000
"#,
        )
        .unwrap();

        let config = SuiteConfig::load(&path).unwrap();
        assert_eq!(config.location, "North clinic");
        assert_eq!(config.timeouts.search_result_ms, 8000);
        assert_eq!(config.timeouts.settle_ms, 300);
        assert_eq!(config.app.contacts_path, "/contacts");
        assert_eq!(config.retry.login_attempts, 2);

        let saved = dir.path().join("out/vetprobe.toml");
        config.save(&saved).unwrap();
        let reloaded = SuiteConfig::load(&saved).unwrap();
        assert_eq!(reloaded.timeouts.search_result_ms, 8000);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = SuiteConfig::load(Path::new("/nonexistent/vetprobe.toml")).unwrap();
        assert_eq!(config.runner.parallelism, 1);
    }
}
