use serde::{Deserialize, Serialize};

use super::Condition;

/// An image the backend produced for one of the participant's trials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    #[serde(rename = "imagePath")]
    pub locator: String,
    pub trial_index: usize,
    pub theme: String,
    pub condition: Condition,
    pub prompt: String,
}

impl GeneratedImage {
    /// Makes a server-relative locator absolute against `base_url`.
    /// URLs and inline `data:` locators are left alone.
    pub fn resolve_locator(&mut self, base_url: &str) {
        let locator = self.locator.trim();
        if locator.starts_with("http://")
            || locator.starts_with("https://")
            || locator.starts_with("data:")
        {
            return;
        }
        self.locator = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            locator.trim_start_matches('/')
        );
    }
}
