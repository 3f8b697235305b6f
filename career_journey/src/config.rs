//! Runtime configuration.
//!
//! Resolved from the environment first; CLI flags override individual fields.

use crate::progression::{CareerGraph, GraphError};
use crate::storage::{SqliteStore, StorageError};
use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "CAREER_JOURNEY_DB";
pub const GRAPH_PATH_VAR: &str = "CAREER_JOURNEY_GRAPH";
pub const DEFAULT_DB_FILE: &str = "career_journey.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JourneyConfig {
    pub db_path: PathBuf,
    /// `None` selects the built-in lineworker roadmap
    pub graph_path: Option<PathBuf>,
}

impl Default for JourneyConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE),
            graph_path: None,
        }
    }
}

impl JourneyConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source; empty values are ignored
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Self {
            db_path: var(DB_PATH_VAR).map(PathBuf::from).unwrap_or(defaults.db_path),
            graph_path: var(GRAPH_PATH_VAR).map(PathBuf::from),
        }
    }

    pub fn with_overrides(mut self, db_path: Option<PathBuf>, graph_path: Option<PathBuf>) -> Self {
        if let Some(db_path) = db_path {
            self.db_path = db_path;
        }
        if graph_path.is_some() {
            self.graph_path = graph_path;
        }
        self
    }

    pub fn load_graph(&self) -> Result<CareerGraph, GraphError> {
        match &self.graph_path {
            Some(path) => CareerGraph::load(path),
            None => Ok(CareerGraph::lineworker()),
        }
    }

    pub fn open_store(&self) -> Result<SqliteStore, StorageError> {
        SqliteStore::new(Some(self.db_path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = JourneyConfig::from_lookup(lookup(&[]));
        assert_eq!(config, JourneyConfig::default());
        assert_eq!(config.db_path, PathBuf::from("career_journey.db"));
        assert_eq!(config.load_graph().unwrap().len(), 8);
    }

    #[test]
    fn test_env_values_and_overrides() {
        let config = JourneyConfig::from_lookup(lookup(&[
            (DB_PATH_VAR, "/tmp/journey.db"),
            (GRAPH_PATH_VAR, "  "),
        ]));
        assert_eq!(config.db_path, PathBuf::from("/tmp/journey.db"));
        assert_eq!(config.graph_path, None);

        let config = config.with_overrides(None, Some(PathBuf::from("roadmap.json")));
        assert_eq!(config.db_path, PathBuf::from("/tmp/journey.db"));
        assert_eq!(config.graph_path, Some(PathBuf::from("roadmap.json")));
    }

    #[test]
    fn test_missing_graph_file_is_an_error() {
        let config = JourneyConfig {
            graph_path: Some(PathBuf::from("/nonexistent/roadmap.json")),
            ..Default::default()
        };
        assert!(matches!(config.load_graph(), Err(GraphError::Io(_))));
    }
}
