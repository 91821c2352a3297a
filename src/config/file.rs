// src/config/file.rs

use serde::{Serialize, Deserialize};
use std::path::PathBuf;
use crate::error::{Error, Result};
use super::FromIni;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim_matches('"').to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Csv
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub output_format: OutputFormat,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data/features.csv"),
            output_path: PathBuf::from("data/clusters.csv"),
            log_dir: PathBuf::from("logs"),
            log_level: "info".to_string(),
            output_format: OutputFormat::default(),
        }
    }
}

impl FromIni for FileConfig {
    fn from_ini_section(&mut self, _section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        match key {
            "input_path" => {
                self.input_path = PathBuf::from(value.trim_matches('"'));
                Some(Ok(()))
            },
            "output_path" => {
                self.output_path = PathBuf::from(value.trim_matches('"'));
                Some(Ok(()))
            },
            "log_dir" => {
                self.log_dir = PathBuf::from(value.trim_matches('"'));
                Some(Ok(()))
            },
            "log_level" => {
                self.log_level = value.trim_matches('"').to_string();
                Some(Ok(()))
            },
            "output_format" => {
                match OutputFormat::from_str(value) {
                    Some(format) => {
                        self.output_format = format;
                        Some(Ok(()))
                    },
                    None => Some(Err(Error::config(
                        format!("Unknown output format: {}", value)
                    ))),
                }
            },
            _ => None,
        }
    }
}

impl FileConfig {
    pub fn validate(&self) -> Result<()> {
        if self.input_path.as_os_str().is_empty() {
            return Err(Error::config("input_path must not be empty"));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(Error::config("output_path must not be empty"));
        }
        Ok(())
    }
}
