use crate::{Error, Result};

use serde::Deserialize;

/// Runtime settings of a [`Db`](crate::Db).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Page size used when a cursor is drained with
    /// [`Cursor::collect`](crate::Cursor::collect)
    pub fetch_size: usize,

    /// Log the full SQL text of every executed statement
    pub log_statements: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fetch_size: 100,
            log_statements: true,
        }
    }
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    pub fn fetch_size(mut self, fetch_size: usize) -> Config {
        self.fetch_size = fetch_size;
        self
    }

    pub fn log_statements(mut self, log_statements: bool) -> Config {
        self.log_statements = log_statements;
        self
    }

    /// Loads settings from a JSON object. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Config> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch_size == 0 {
            return Err(Error::invalid_statement("fetch_size must be at least 1"));
        }
        Ok(())
    }
}
