//! Runtime configuration
//!
//! `AdapterConfig` describes one listing: how it is paged, which level roots sit
//! at, and the nested-set column names of the backing table. `ServerConfig` adds
//! what the dev server needs and is read from the environment once at startup.

use crate::db::TreeFieldNames;
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Django-style default page size for flat and browsing listings
pub const DEFAULT_LIST_PER_PAGE: usize = 100;

/// Largest result set that may be shown on one page when `all` is requested
pub const DEFAULT_LIST_MAX_SHOW_ALL: usize = 200;

/// Outliner listings show (practically) the whole tree on one page
pub const OUTLINER_PAGE_SIZE: usize = 10_000;

/// Default dev server port
pub const DEFAULT_PORT: u16 = 3001;

/// How a changelist presents the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingMode {
    /// Tree-ordered list with regular paging
    Flat,
    /// Tree-ordered list of the whole tree on one page
    #[default]
    Outliner,
    /// One level at a time, with breadcrumbs
    Browsing,
}

impl FromStr for ListingMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(ListingMode::Flat),
            "outliner" => Ok(ListingMode::Outliner),
            "browsing" | "browser" => Ok(ListingMode::Browsing),
            other => Err(anyhow!(
                "Unknown listing mode '{}' (expected flat, outliner or browsing)",
                other
            )),
        }
    }
}

/// Configuration of one listing adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub mode: ListingMode,
    pub list_per_page: usize,
    pub list_max_show_all: usize,
    /// Level of root nodes (0 or 1 depending on convention)
    pub root_level: i32,
    pub fields: TreeFieldNames,
}

impl AdapterConfig {
    /// Defaults for `mode`
    pub fn for_mode(mode: ListingMode) -> Self {
        let (list_per_page, list_max_show_all) = match mode {
            ListingMode::Outliner => (OUTLINER_PAGE_SIZE, OUTLINER_PAGE_SIZE),
            ListingMode::Flat | ListingMode::Browsing => {
                (DEFAULT_LIST_PER_PAGE, DEFAULT_LIST_MAX_SHOW_ALL)
            }
        };
        Self {
            mode,
            list_per_page,
            list_max_show_all,
            root_level: 0,
            fields: TreeFieldNames::default(),
        }
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self::for_mode(ListingMode::default())
    }
}

/// Dev server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on (`OUTLINER_PORT`, default 3001)
    pub port: u16,

    /// libsql database file (`OUTLINER_DB_PATH`); `None` runs on a seeded
    /// in-memory store
    pub db_path: Option<PathBuf>,

    /// Listing configuration (`OUTLINER_MODE`, `OUTLINER_ROOT_LEVEL`)
    pub adapter: AdapterConfig,
}

impl ServerConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup` (environment-shaped)
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("OUTLINER_PORT")
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let db_path = lookup("OUTLINER_DB_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let mode = match lookup("OUTLINER_MODE") {
            Some(raw) => raw.parse::<ListingMode>()?,
            None => ListingMode::default(),
        };

        let mut adapter = AdapterConfig::for_mode(mode);
        if let Some(raw) = lookup("OUTLINER_ROOT_LEVEL") {
            adapter.root_level = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid OUTLINER_ROOT_LEVEL '{}'", raw))?;
        }

        Ok(Self {
            port,
            db_path,
            adapter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.db_path.is_none());
        assert_eq!(config.adapter.mode, ListingMode::Outliner);
        assert_eq!(config.adapter.list_per_page, OUTLINER_PAGE_SIZE);
        assert_eq!(config.adapter.root_level, 0);
    }

    #[test]
    fn test_reads_mode_port_and_path() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("OUTLINER_PORT", "4010"),
            ("OUTLINER_DB_PATH", "/tmp/outliner.db"),
            ("OUTLINER_MODE", "Browsing"),
            ("OUTLINER_ROOT_LEVEL", "1"),
        ]))
        .unwrap();

        assert_eq!(config.port, 4010);
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/outliner.db")));
        assert_eq!(config.adapter.mode, ListingMode::Browsing);
        assert_eq!(config.adapter.list_per_page, DEFAULT_LIST_PER_PAGE);
        assert_eq!(config.adapter.root_level, 1);
    }

    #[test]
    fn test_unparseable_port_falls_back() {
        let config = ServerConfig::from_lookup(lookup(&[("OUTLINER_PORT", "http")])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_unknown_mode_is_an_error() {
        let err = ServerConfig::from_lookup(lookup(&[("OUTLINER_MODE", "kanban")])).unwrap_err();
        assert!(err.to_string().contains("kanban"));
    }
}
