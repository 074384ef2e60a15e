use crate::error::{Error, Result};
use chrono::{DateTime, Local, TimeZone};
use directories::UserDirs;
use linkify::{LinkFinder, LinkKind};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub fn formatted_pub_date(date: i64) -> String {
    match Local.timestamp_opt(date, 0).single() {
        Some(parsed) => format!("{}", parsed.format("%d/%m/%Y %H:%M")),
        None => String::new(),
    }
}

/// Unix timestamp of an RFC 2822 (RSS) or RFC 3339 (Atom) date.
pub fn parse_pub_date(date: &str) -> Option<i64> {
    DateTime::parse_from_rfc2822(date.trim())
        .or_else(|_| DateTime::parse_from_rfc3339(date.trim()))
        .map(|d| d.timestamp())
        .ok()
}

pub fn extract_links(text: &str) -> Vec<String> {
    let mut finder = LinkFinder::new();
    finder.kinds(&[LinkKind::Url]);
    finder
        .links(text)
        .map(|link| link.as_str().to_string())
        .collect()
}

pub fn get_config_dir() -> String {
    let home = match UserDirs::new() {
        Some(user_dirs) => user_dirs.home_dir().display().to_string(),
        None => String::from("."),
    };
    PathBuf::from(format!("{}/.config/newsdesk", home))
        .display()
        .to_string()
}

/// Logs go to `newsdesk.log` in the config dir; the terminal belongs to the UI.
/// `RUST_LOG` overrides `level`.
pub fn init_logging(level: &str) -> Result<()> {
    let dir = get_config_dir();
    fs::create_dir_all(&dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(format!("{}/newsdesk.log", dir))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| Error::Custom(format!("Failed to init logging: {}", e)))?;

    info!("Logging initialised at {}", level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rss_and_atom_dates() {
        assert_eq!(
            parse_pub_date("Tue, 10 Jun 2003 04:00:00 GMT"),
            Some(1055217600)
        );
        assert_eq!(parse_pub_date("2003-12-13T18:30:02Z"), Some(1071340202));
        assert_eq!(parse_pub_date("yesterday"), None);
    }

    #[test]
    fn finds_links_in_content() {
        let links = extract_links("See https://example.com/a and http://b.org/x here");
        assert_eq!(links, vec!["https://example.com/a", "http://b.org/x"]);
    }

    #[test]
    fn config_dir_ends_with_app_name() {
        assert!(get_config_dir().ends_with(".config/newsdesk"));
    }
}
