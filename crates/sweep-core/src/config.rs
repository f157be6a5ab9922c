//! Run configuration, loaded from JSON.
//!
//! ```json
//! {
//!   "project_dir": ".",
//!   "options_file": "Options.txt",
//!   "scenarios_file": "Scenarios.txt",
//!   "cells_file": "cells.txt",
//!   "faces_file": "faces.txt",
//!   "face_points_file": "facepts.txt",
//!   "geometry_stem": "BlackCreekModel",
//!   "project_file": "BlackCreekModel.prj",
//!   "results_file": "BlackCreekModel.p07.json",
//!   "min_depth": 0.00508,
//!   "engine": { "program": "ras-run", "args": ["--plan", "p07"] }
//! }
//! ```
//!
//! Relative paths resolve against `project_dir`, which itself resolves
//! against the directory holding the config file.
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::composer::ProjectLayout;
use crate::engine::CommandEngine;
use crate::error::{Result, SweepError};
use crate::metrics::DEFAULT_MIN_DEPTH;

fn default_min_depth() -> f64 {
    DEFAULT_MIN_DEPTH
}

fn default_slot_ext() -> String {
    ".g01".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub project_dir: PathBuf,
    pub options_file: PathBuf,
    pub scenarios_file: PathBuf,
    pub cells_file: PathBuf,
    pub faces_file: PathBuf,
    pub face_points_file: PathBuf,
    pub geometry_stem: String,
    pub project_file: PathBuf,
    pub results_file: PathBuf,
    /// Depth above which a cell counts as wet.
    #[serde(default = "default_min_depth")]
    pub min_depth: f64,
    #[serde(default = "default_slot_ext")]
    pub active_slot_ext: String,
    pub engine: EngineConfig,
}

impl RunConfig {
    pub fn from_json(text: &str, source_name: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| SweepError::parse(source_name, e.line(), e.to_string()))
    }

    /// Load and anchor `project_dir` to the config file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| SweepError::io(path, e))?;
        let mut config = Self::from_json(&text, &path.display().to_string())?;
        if config.project_dir.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            config.project_dir = base.join(&config.project_dir);
        }
        Ok(config)
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }

    pub fn layout(&self) -> ProjectLayout {
        ProjectLayout {
            dir: self.project_dir.clone(),
            geometry_stem: self.geometry_stem.clone(),
            active_slot_ext: self.active_slot_ext.clone(),
        }
    }

    pub fn command_engine(&self) -> CommandEngine {
        CommandEngine {
            program: self.engine.program.clone(),
            args: self.engine.args.clone(),
            results_file: self.resolve(&self.results_file),
        }
    }
}
