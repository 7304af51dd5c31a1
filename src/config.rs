use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const CONFIG_PATH_ENV: &str = "PROMPT_STUDY_CONFIG";
pub const API_URL_ENV: &str = "PROMPT_STUDY_API_URL";
pub const REDIRECT_URL_ENV: &str = "PROMPT_STUDY_REDIRECT_URL";
pub const DEBUG_ENV: &str = "PROMPT_STUDY_DEBUG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StudyConfig {
    pub api_base_url: String,
    pub redirect_url: String,
    pub practice_theme: String,
    pub theme_pool: Vec<String>,
    pub practice_duration_secs: u64,
    pub trial_duration_secs: u64,
    pub warning_threshold_secs: u64,
    pub tick_interval_ms: u64,
    pub poll_interval_secs: u64,
    pub max_poll_attempts: u32,
    pub request_timeout_secs: u64,
    pub max_prompt_chars: usize,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".into(),
            redirect_url: "https://app.prolific.com/submissions/complete".into(),
            practice_theme: "a walk in the park".into(),
            theme_pool: vec![
                "an underwater city".into(),
                "a robot's day off".into(),
                "a forgotten library".into(),
                "a festival on Mars".into(),
                "a dragon's breakfast".into(),
                "a winter night market".into(),
            ],
            practice_duration_secs: 60,
            trial_duration_secs: 120,
            warning_threshold_secs: 30,
            tick_interval_ms: 100,
            poll_interval_secs: 5,
            max_poll_attempts: 4,
            request_timeout_secs: 30,
            max_prompt_chars: 500,
        }
    }
}

impl StudyConfig {
    /// Defaults, then the JSON file (explicit path or `PROMPT_STUDY_CONFIG`),
    /// then the URL environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path: Option<PathBuf> = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.api_base_url = config.api_base_url.trim_end_matches('/').to_string();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read study config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse study config at {}", path.display()))
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(url) = lookup(REDIRECT_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.redirect_url = url.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            bail!("apiBaseUrl must not be empty");
        }
        if self.redirect_url.trim().is_empty() {
            bail!("redirectUrl must not be empty");
        }
        if self.theme_pool.is_empty() || self.theme_pool.len() % 2 != 0 {
            bail!(
                "themePool needs an even, non-zero number of themes (got {})",
                self.theme_pool.len()
            );
        }
        let mut seen = HashSet::new();
        for theme in &self.theme_pool {
            if !seen.insert(theme.as_str()) {
                bail!("themePool lists '{theme}' more than once");
            }
        }
        if seen.contains(self.practice_theme.as_str()) {
            bail!("practiceTheme '{}' must not be in themePool", self.practice_theme);
        }
        if self.max_poll_attempts == 0 {
            bail!("maxPollAttempts must be at least 1");
        }
        if self.tick_interval_ms == 0 {
            bail!("tickIntervalMs must be greater than zero");
        }
        Ok(())
    }

    /// Main trials split into two condition blocks of this length.
    pub fn block_len(&self) -> usize {
        self.theme_pool.len() / 2
    }

    pub fn main_trial_count(&self) -> usize {
        self.theme_pool.len()
    }

    pub fn input_duration(&self, is_practice: bool) -> Duration {
        if is_practice {
            Duration::from_secs(self.practice_duration_secs)
        } else {
            Duration::from_secs(self.trial_duration_secs)
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub fn debug_mode() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
