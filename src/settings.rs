use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::Config;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_URL: &str = "https://api.openai.com";
pub const DEFAULT_API_PATH: &str = "/v1/chat/completions";
pub const DEFAULT_PROMPT: &str = "You are a professional summarization assistant. \
I will give you content to summarize, possibly in any language. Summarize it, \
highlight the key points and difficult parts, and reply in Markdown format.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    Url,
    Text,
}

impl std::fmt::Display for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tab::Url => write!(f, "URL"),
            Tab::Text => write!(f, "Text"),
        }
    }
}

/// The flat settings document persisted to `settings.json`.
///
/// Field names stay camelCase on disk so documents written by earlier
/// versions of the app keep loading.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub default_tab: Tab,
    pub api_key: String,
    pub api_model: String,
    pub api_url: String,
    pub api_path: String,
    #[serde(deserialize_with = "string_or_seq")]
    pub api_script: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            default_tab: Tab::Url,
            api_key: String::new(),
            api_model: DEFAULT_MODEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            api_path: DEFAULT_API_PATH.to_string(),
            api_script: vec![DEFAULT_PROMPT.to_string()],
        }
    }
}

impl Settings {
    /// The default prompt at index 0 must always exist.
    fn normalize(mut self) -> Self {
        if self.api_script.is_empty() {
            self.api_script.push(DEFAULT_PROMPT.to_string());
        }
        self
    }
}

/// Older documents stored `apiScript` as a single string; newer ones store a
/// list. Accept both.
fn string_or_seq<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrSeq {
        One(String),
        Many(Vec<String>),
    }

    Ok(match StringOrSeq::deserialize(deserializer)? {
        StringOrSeq::One(s) => vec![s],
        StringOrSeq::Many(v) => v,
    })
}

/// Handle to the durable settings document. Constructed once at startup and
/// handed to whoever needs it; single-process, single-writer.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn open_default() -> Self {
        SettingsStore {
            path: Config::get_config_dir().join("settings.json"),
        }
    }

    pub fn new(path: PathBuf) -> Self {
        SettingsStore { path }
    }

    /// Read the settings document. A missing file is not an error; it yields
    /// the hardcoded defaults. Read or parse failures are returned so the
    /// caller can surface them and fall back to defaults itself.
    pub fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let settings: Settings = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", self.path.display()))?;

        Ok(settings.normalize())
    }

    /// Write the whole document back. No atomicity across fields; a failed
    /// write is reported and not retried.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, contents)
            .with_context(|| format!("writing {}", self.path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &tempfile::TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join("settings.json"))
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let settings = store_in(&dir).load().unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        let settings = Settings {
            default_tab: Tab::Text,
            api_key: "sk-test".to_string(),
            api_model: "gpt-4o".to_string(),
            api_url: "https://example.invalid".to_string(),
            api_path: "/v2/chat".to_string(),
            api_script: vec![
                DEFAULT_PROMPT.to_string(),
                "Summarize as bullet points.".to_string(),
                "One paragraph only.".to_string(),
            ],
        };

        store.save(&settings).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn corrupt_document_is_an_error() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(dir.path().join("settings.json"), "{not json").unwrap();
        assert!(store.load().is_err());
    }

    #[test]
    fn legacy_single_string_script_still_loads() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(
            dir.path().join("settings.json"),
            r#"{
                "defaultTab": "url",
                "apiKey": "",
                "apiModel": "gpt-4o-mini",
                "apiUrl": "https://api.openai.com",
                "apiPath": "/v1/chat/completions",
                "apiScript": "just one prompt"
            }"#,
        )
        .unwrap();

        let settings = store.load().unwrap();
        assert_eq!(settings.api_script, vec!["just one prompt".to_string()]);
    }

    #[test]
    fn empty_script_list_gains_default_prompt() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(
            dir.path().join("settings.json"),
            r#"{
                "defaultTab": "text",
                "apiKey": "",
                "apiModel": "gpt-4o-mini",
                "apiUrl": "https://api.openai.com",
                "apiPath": "/v1/chat/completions",
                "apiScript": []
            }"#,
        )
        .unwrap();

        let settings = store.load().unwrap();
        assert_eq!(settings.api_script, vec![DEFAULT_PROMPT.to_string()]);
    }

    #[test]
    fn disk_document_uses_camel_case_keys() {
        let json = serde_json::to_string(&Settings::default()).unwrap();
        assert!(json.contains("\"defaultTab\""));
        assert!(json.contains("\"apiScript\""));
    }

    #[test]
    fn save_creates_missing_directories() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("nested/dir/settings.json"));
        store.save(&Settings::default()).unwrap();
        assert_eq!(store.load().unwrap(), Settings::default());
    }
}
