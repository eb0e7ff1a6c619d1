use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

pub const DEFAULT_PREFS_PATH: &str = "config/prefs.json";

const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_TOP_P: f32 = 0.9;

/// User preferences, loaded once at process start. A missing file is the
/// expected case and falls back to defaults silently; an unreadable or
/// malformed file logs a warning and falls back as well.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub model_temperature: f32,
    pub model_top_p: f32,
    pub favorite_genre: Option<String>,
    pub home_city: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            model_temperature: DEFAULT_TEMPERATURE,
            model_top_p: DEFAULT_TOP_P,
            favorite_genre: None,
            home_city: None,
        }
    }
}

impl Preferences {
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Preferences file not found; using defaults");
                return Self::default();
            }
            Err(source) => {
                warn!(path = %path.display(), %source, "Failed to read preferences; using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(prefs) => {
                info!(path = %path.display(), "Loaded preferences");
                prefs
            }
            Err(source) => {
                warn!(path = %path.display(), %source, "Failed to parse preferences; using defaults");
                Self::default()
            }
        }
    }

    /// Personalization fragment appended to the system message content.
    pub fn personalization(&self) -> String {
        let mut fragment = String::new();
        if let Some(genre) = self.favorite_genre.as_deref() {
            fragment.push_str(&format!(" User loves {genre} books."));
        }
        if let Some(city) = self.home_city.as_deref() {
            fragment.push_str(&format!(" User lives in {city}."));
        }
        fragment
    }
}
