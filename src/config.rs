use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

fn default_prompt_selection() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub window: WindowConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UiConfig {
    #[serde(default = "default_prompt_selection")]
    pub prompt_selection: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            window: WindowConfig {
                width: 900,
                height: 640,
                min_width: 480,
                min_height: 360,
            },
            ui: UiConfig::default(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            prompt_selection: true,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let config_path = Self::get_config_path();

        if config_path.exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("error parsing config.toml: {}. Using defaults.", e)
                    }
                },
                Err(e) => tracing::warn!("error reading config.toml: {}. Using defaults.", e),
            }
        } else if let Some(parent) = config_path.parent() {
            // First run: make sure the config directory exists
            let _ = fs::create_dir_all(parent);
        }

        Config::default()
    }

    pub fn get_config_path() -> PathBuf {
        Self::get_config_dir().join("config.toml")
    }

    pub fn get_config_dir() -> PathBuf {
        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home).join(".config/sumbar")
        } else {
            PathBuf::from(".")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config: Config = toml::from_str(
            r#"
            [window]
            width = 1024
            height = 768
            min_width = 400
            min_height = 300

            [ui]
            prompt_selection = false
            "#,
        )
        .unwrap();

        assert_eq!(config.window.width, 1024);
        assert!(!config.ui.prompt_selection);
    }

    #[test]
    fn ui_section_is_optional() {
        let config: Config = toml::from_str(
            r#"
            [window]
            width = 900
            height = 640
            min_width = 480
            min_height = 360
            "#,
        )
        .unwrap();

        assert!(config.ui.prompt_selection);
    }
}
