use crate::error::Result;
use crate::loader::RouteOptions;
use crate::utils;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub db_path: Option<String>,
    pub log_level: Option<String>,
    pub http_timeout_secs: u64,
    pub browser: Option<String>,
    pub route: RouteOptions,
    pub load_categories: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: None,
            http_timeout_secs: 30,
            browser: None,
            route: RouteOptions::default(),
            load_categories: true,
        }
    }
}

impl Config {
    pub fn from(path: &str) -> Result<Config> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;

        Ok(config)
    }

    /// Reads `config.toml` from the config dir, or the defaults if there is none.
    pub fn load() -> Result<Config> {
        let path = format!("{}/config.toml", utils::get_config_dir());
        if Path::new(&path).exists() {
            Config::from(&path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn db_path(&self) -> String {
        self.db_path
            .clone()
            .unwrap_or_else(|| format!("{}/newsdesk.db", utils::get_config_dir()))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.http_timeout_secs, 30);
        assert!(config.load_categories);
        assert!(config.route.prerender);
        assert!(!config.route.ssr);
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn reads_values_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
db_path = "/tmp/feeds.db"
log_level = "debug"
browser = "firefox"
load_categories = false

[route]
prerender = false
"#
        )
        .unwrap();

        let config = Config::from(&file.path().display().to_string()).unwrap();
        assert_eq!(config.db_path(), "/tmp/feeds.db");
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.browser.as_deref(), Some("firefox"));
        assert!(!config.load_categories);
        assert!(!config.route.prerender);
        assert!(!config.route.ssr);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "http_timeout_secs = \"soon\"").unwrap();
        let err = Config::from(&file.path().display().to_string()).unwrap_err();
        assert!(matches!(err, crate::error::Error::Config(_)));
    }
}
