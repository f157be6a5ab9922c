//! Simulation engine adapter and the results store it produces.
//!
//! The solver itself is external. All the sweep needs from it is: take the
//! composed geometry plus a project reference, block until the run is done,
//! and hand back five time-indexed result channels.
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};

const DATASET_ROOT: &str =
    "Results/Unsteady/Output/Output Blocks/Base Output/Unsteady Time Series/2D Flow Areas/2D Flow";

/// Named result channels, each indexed [time step, element id].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Water depth per cell.
    Depth,
    /// Velocity magnitude per face.
    FaceVelocity,
    /// Shear stress per face.
    FaceShearStress,
    /// X velocity per face point.
    NodeXVelocity,
    /// Y velocity per face point.
    NodeYVelocity,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Depth,
        Channel::FaceVelocity,
        Channel::FaceShearStress,
        Channel::NodeXVelocity,
        Channel::NodeYVelocity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Depth => "Depth",
            Channel::FaceVelocity => "Face Velocity",
            Channel::FaceShearStress => "Face Shear Stress",
            Channel::NodeXVelocity => "Node X Vel",
            Channel::NodeYVelocity => "Node Y Vel",
        }
    }

    /// Dataset path of this channel inside the engine's results file.
    pub fn dataset_path(self) -> String {
        format!("{DATASET_ROOT}/{}", self.name())
    }
}

/// Row-major [time step × element] array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub data: Vec<f64>,
    pub steps: usize,
    pub elements: usize,
}

impl TimeSeries {
    pub fn new(steps: usize, elements: usize, fill: f64) -> Self {
        Self {
            data: vec![fill; steps * elements],
            steps,
            elements,
        }
    }

    /// Build from one row per time step. Rows must share a length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> std::result::Result<Self, String> {
        let steps = rows.len();
        let elements = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(steps * elements);
        for (t, row) in rows.into_iter().enumerate() {
            if row.len() != elements {
                return Err(format!("time step {t} has {} elements, expected {elements}", row.len()));
            }
            data.extend(row);
        }
        Ok(Self { data, steps, elements })
    }

    #[inline]
    pub fn get(&self, step: usize, element: usize) -> f64 {
        self.data[step * self.elements + element]
    }

    /// Every time step's value for one element. Caller checks `element < elements`.
    pub fn column(&self, element: usize) -> impl Iterator<Item = f64> + '_ {
        (0..self.steps).map(move |t| self.get(t, element))
    }
}

/// Time series for all five channels of one finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsStore {
    pub depth: TimeSeries,
    pub face_velocity: TimeSeries,
    pub face_shear_stress: TimeSeries,
    pub node_x_velocity: TimeSeries,
    pub node_y_velocity: TimeSeries,
}

#[derive(Deserialize)]
struct RawResults {
    depth: Vec<Vec<f64>>,
    face_velocity: Vec<Vec<f64>>,
    face_shear_stress: Vec<Vec<f64>>,
    node_x_velocity: Vec<Vec<f64>>,
    node_y_velocity: Vec<Vec<f64>>,
}

impl ResultsStore {
    pub fn channel(&self, channel: Channel) -> &TimeSeries {
        match channel {
            Channel::Depth => &self.depth,
            Channel::FaceVelocity => &self.face_velocity,
            Channel::FaceShearStress => &self.face_shear_stress,
            Channel::NodeXVelocity => &self.node_x_velocity,
            Channel::NodeYVelocity => &self.node_y_velocity,
        }
    }

    /// Parse the JSON results export: one `[[f64; elements]; steps]` array per
    /// channel, keyed `depth`, `face_velocity`, `face_shear_stress`,
    /// `node_x_velocity`, `node_y_velocity`.
    pub fn from_json(text: &str, source_name: &str) -> Result<Self> {
        let raw: RawResults = serde_json::from_str(text)
            .map_err(|e| SweepError::parse(source_name, e.line(), e.to_string()))?;
        let series = |channel: Channel, rows: Vec<Vec<f64>>| {
            TimeSeries::from_rows(rows)
                .map_err(|msg| SweepError::parse(source_name, 0, format!("{}: {msg}", channel.dataset_path())))
        };
        Ok(Self {
            depth: series(Channel::Depth, raw.depth)?,
            face_velocity: series(Channel::FaceVelocity, raw.face_velocity)?,
            face_shear_stress: series(Channel::FaceShearStress, raw.face_shear_stress)?,
            node_x_velocity: series(Channel::NodeXVelocity, raw.node_x_velocity)?,
            node_y_velocity: series(Channel::NodeYVelocity, raw.node_y_velocity)?,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| SweepError::io(path, e))?;
        Self::from_json(&text, &path.display().to_string())
    }
}

/// Inputs of a single engine run.
#[derive(Debug, Clone)]
pub struct EngineRun {
    pub scenario: String,
    pub geometry: PathBuf,
    pub project: PathBuf,
}

/// Blocking compute against an external solver.
pub trait SimulationEngine {
    /// Run to completion and return the results store. No timeout is applied.
    fn compute(&mut self, run: &EngineRun) -> Result<ResultsStore>;
}

/// Engine driven through an external command.
///
/// The program is invoked as `<program> <args...> <project>` in the project's
/// directory. Any existing results file is removed first; once the program
/// exits successfully the freshly written results file is loaded.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    pub program: String,
    pub args: Vec<String>,
    pub results_file: PathBuf,
}

impl SimulationEngine for CommandEngine {
    fn compute(&mut self, run: &EngineRun) -> Result<ResultsStore> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(&run.project);
        if let Some(dir) = run.project.parent().filter(|d| !d.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }

        // A results file left by the previous scenario must not pass for this run's output.
        if self.results_file.exists() {
            fs::remove_file(&self.results_file).map_err(|e| SweepError::io(&self.results_file, e))?;
        }

        tracing::info!(scenario = %run.scenario, program = %self.program, "computing");
        let status = cmd
            .status()
            .map_err(|e| SweepError::Engine(format!("cannot start {}: {e}", self.program)))?;
        if !status.success() {
            return Err(SweepError::Engine(format!(
                "{} exited with {status} for scenario {:?}",
                self.program, run.scenario
            )));
        }

        if !self.results_file.exists() {
            return Err(SweepError::Engine(format!(
                "run for {:?} produced no results at {}",
                run.scenario,
                self.results_file.display()
            )));
        }
        ResultsStore::from_file(&self.results_file).map_err(|e| {
            SweepError::Engine(format!("unreadable results for {:?}: {e}", run.scenario))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_rejects_ragged_input() {
        let ts = TimeSeries::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!((ts.steps, ts.elements), (2, 2));
        assert_eq!(ts.column(1).collect::<Vec<_>>(), vec![2.0, 4.0]);

        assert!(TimeSeries::from_rows(vec![vec![1.0], vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn parses_results_json() {
        let json = r#"{
            "depth": [[0.0, 1.0], [0.5, 2.0]],
            "face_velocity": [[1.0]],
            "face_shear_stress": [[-2.0]],
            "node_x_velocity": [[3.0]],
            "node_y_velocity": [[4.0]]
        }"#;
        let store = ResultsStore::from_json(json, "results.json").unwrap();
        assert_eq!(store.channel(Channel::Depth).get(1, 1), 2.0);
        assert_eq!(store.channel(Channel::FaceShearStress).get(0, 0), -2.0);
    }

    #[test]
    fn missing_channel_is_parse_error() {
        let err = ResultsStore::from_json(r#"{"depth": [[1.0]]}"#, "r").unwrap_err();
        assert!(matches!(err, SweepError::Parse { .. }), "got {err:?}");
    }

    #[test]
    fn dataset_paths_follow_results_layout() {
        assert!(Channel::NodeYVelocity.dataset_path().ends_with("2D Flow Areas/2D Flow/Node Y Vel"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_is_engine_error() {
        let mut engine = CommandEngine {
            program: "false".to_string(),
            args: vec![],
            results_file: PathBuf::from("never-written.json"),
        };
        let run = EngineRun {
            scenario: "S1".to_string(),
            geometry: PathBuf::from("Model.g01"),
            project: PathBuf::from("Model.prj"),
        };
        let err = engine.compute(&run).unwrap_err();
        assert!(matches!(err, SweepError::Engine(_)), "got {err:?}");
    }

    #[cfg(unix)]
    fn shell_engine(dir: &Path, script: &str) -> (CommandEngine, EngineRun) {
        let engine = CommandEngine {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            results_file: dir.join("r.json"),
        };
        let run = EngineRun {
            scenario: "S1".to_string(),
            geometry: dir.join("Model.g01"),
            project: dir.join("Model.prj"),
        };
        (engine, run)
    }

    #[cfg(unix)]
    #[test]
    fn garbled_results_are_engine_error() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, run) = shell_engine(dir.path(), "echo garbage > r.json");
        let err = engine.compute(&run).unwrap_err();
        assert!(matches!(err, SweepError::Engine(_)), "got {err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn clean_exit_without_results_is_engine_error() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, run) = shell_engine(dir.path(), "true");
        let err = engine.compute(&run).unwrap_err();
        assert!(matches!(err, SweepError::Engine(_)), "got {err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn stale_results_are_removed_before_launch() {
        let dir = tempfile::tempdir().unwrap();
        let valid = r#"{"depth": [[1.0]], "face_velocity": [[1.0]], "face_shear_stress": [[1.0]],
            "node_x_velocity": [[1.0]], "node_y_velocity": [[1.0]]}"#;
        fs::write(dir.path().join("r.json"), valid).unwrap();

        // Run writes nothing, so the previous scenario's file must not be picked up.
        let (mut engine, run) = shell_engine(dir.path(), "true");
        let err = engine.compute(&run).unwrap_err();
        assert!(matches!(err, SweepError::Engine(_)), "got {err:?}");
        assert!(!dir.path().join("r.json").exists());

        let (mut engine, run) = shell_engine(dir.path(), &format!("printf '%s' '{valid}' > r.json"));
        let store = engine.compute(&run).unwrap();
        assert_eq!(store.depth.get(0, 0), 1.0);
    }
}
