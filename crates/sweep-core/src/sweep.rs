//! Batch orchestrator: runs every scenario in declared order.
//!
//! Per scenario:
//!   1. Compose geometry and activate the terrain slot
//!   2. Engine compute (blocking)
//!   3. Metric extraction
//!   4. Terrain slot release
//!
//! Scenarios never overlap: the active terrain slot is a single shared file.
//! Any failure aborts the batch, after the failing scenario's slot has been
//! released.
use std::path::PathBuf;

use crate::composer::{compose_geometry, ProjectLayout};
use crate::config::RunConfig;
use crate::engine::{EngineRun, SimulationEngine};
use crate::error::Result;
use crate::location::LocationRegistry;
use crate::metrics::{extract_metrics, MetricColumn, MetricSet};
use crate::options::OptionCatalog;
use crate::scenario::{Scenario, ScenarioCatalog};

/// Everything a batch needs, parsed and validated before any engine run.
#[derive(Debug, Clone)]
pub struct Sweep {
    pub options: OptionCatalog,
    pub scenarios: ScenarioCatalog,
    pub locations: LocationRegistry,
    pub layout: ProjectLayout,
    pub project: PathBuf,
    pub min_depth: f64,
}

impl Sweep {
    /// Parse all catalogs named by `config`. Fails before touching the project
    /// if any of them is malformed.
    pub fn load(config: &RunConfig) -> Result<Self> {
        let options = OptionCatalog::from_file(&config.resolve(&config.options_file))?;
        let scenarios = ScenarioCatalog::from_file(&config.resolve(&config.scenarios_file), &options)?;
        let locations = LocationRegistry::from_files(
            &config.resolve(&config.cells_file),
            &config.resolve(&config.faces_file),
            &config.resolve(&config.face_points_file),
        )?;

        tracing::info!(
            categories = options.category_count(),
            scenarios = scenarios.len(),
            locations = locations.len(),
            "sweep loaded"
        );

        Ok(Self {
            options,
            scenarios,
            locations,
            layout: config.layout(),
            project: config.resolve(&config.project_file),
            min_depth: config.min_depth,
        })
    }

    pub fn scenario_names(&self) -> Vec<String> {
        self.scenarios.names()
    }

    /// Run every scenario and return the complete metric set.
    pub fn run<E: SimulationEngine + ?Sized>(&self, engine: &mut E) -> Result<MetricSet> {
        let names = self.scenario_names();
        let mut set = MetricSet::new(&names, &self.locations);

        for (i, scenario) in self.scenarios.scenarios().iter().enumerate() {
            tracing::info!(scenario = %scenario.name, "scenario {}/{}", i + 1, names.len());
            let columns = self.run_scenario(scenario, engine)?;
            set.record(&scenario.name, columns);
        }

        Ok(set)
    }

    fn run_scenario<E: SimulationEngine + ?Sized>(&self, scenario: &Scenario, engine: &mut E) -> Result<Vec<MetricColumn>> {
        let composed = compose_geometry(scenario, &self.options, &self.layout)?;
        let run = EngineRun {
            scenario: scenario.name.clone(),
            geometry: composed.geometry_path.clone(),
            project: self.project.clone(),
        };

        let outcome = engine
            .compute(&run)
            .and_then(|store| extract_metrics(&store, &self.locations, self.min_depth));

        match (outcome, composed.slot.release()) {
            (Ok(columns), Ok(())) => {
                tracing::info!(scenario = %scenario.name, "scenario complete");
                Ok(columns)
            }
            (Ok(_), Err(release_err)) => Err(release_err),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(release_err)) => {
                tracing::warn!(error = %release_err, "failed to release terrain slot");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ResultsStore, TimeSeries};
    use crate::error::SweepError;
    use crate::matrix::report_all;
    use crate::metrics::MetricKind;
    use approx::assert_relative_eq;
    use std::fs;
    use tempfile::TempDir;

    const OPTIONS: &str = "\
Terrain Option 1
FileName=Model.g02
Terrain Option 2
FileName=Model.g03
Geometry Structures
Culvert Option 1
Culvert=A
Culvert Option 2
Culvert=B
";

    /// Engine stub: records which terrain sat in the slot and replays depths.
    struct ScriptedEngine {
        peak_depths: Vec<f64>,
        fail_on: Option<usize>,
        calls: usize,
        seen_terrain: Vec<Vec<u8>>,
        active_slot: PathBuf,
    }

    impl SimulationEngine for ScriptedEngine {
        fn compute(&mut self, run: &EngineRun) -> Result<ResultsStore> {
            assert!(run.geometry.exists(), "geometry input must exist during compute");
            self.seen_terrain.push(fs::read(&self.active_slot).unwrap());
            let call = self.calls;
            self.calls += 1;
            if self.fail_on == Some(call) {
                return Err(SweepError::Engine("solver crashed".into()));
            }
            let peak = self.peak_depths[call];
            let depth = TimeSeries::from_rows(vec![vec![0.0, 1.0], vec![peak, 1.0]]).unwrap();
            let faces = TimeSeries::from_rows(vec![vec![2.0], vec![-1.0]]).unwrap();
            let points = TimeSeries::from_rows(vec![vec![1.0], vec![0.0]]).unwrap();
            Ok(ResultsStore {
                depth,
                face_velocity: faces.clone(),
                face_shear_stress: faces,
                node_x_velocity: points.clone(),
                node_y_velocity: points,
            })
        }
    }

    fn fixture(dir: &TempDir, scenarios: &str) -> Sweep {
        let root = dir.path();
        for (name, body) in [
            ("Model.g02", "Geom Title=2\nRating Curve=\n"),
            ("Model.g03", "Geom Title=3\nRating Curve=\n"),
            ("Model.g02.hdf", "terrain-2"),
            ("Model.g03.hdf", "terrain-3"),
            ("Options.txt", OPTIONS),
            ("Scenarios.txt", scenarios),
            ("cells.txt", "L1:0\nL2:1\n"),
            ("faces.txt", "L1:0\n"),
            ("facepts.txt", "L2:0\n"),
        ] {
            fs::write(root.join(name), body).unwrap();
        }
        let config = RunConfig::from_json(
            r#"{
                "options_file": "Options.txt",
                "scenarios_file": "Scenarios.txt",
                "cells_file": "cells.txt",
                "faces_file": "faces.txt",
                "face_points_file": "facepts.txt",
                "geometry_stem": "Model",
                "project_file": "Model.prj",
                "results_file": "Model.p01.json",
                "min_depth": 0.5,
                "engine": { "program": "unused" }
            }"#,
            "sweep.json",
        )
        .map(|mut c| {
            c.project_dir = root.to_path_buf();
            c
        })
        .unwrap();
        Sweep::load(&config).unwrap()
    }

    fn engine(sweep: &Sweep, peak_depths: Vec<f64>, fail_on: Option<usize>) -> ScriptedEngine {
        ScriptedEngine {
            peak_depths,
            fail_on,
            calls: 0,
            seen_terrain: Vec::new(),
            active_slot: sweep.layout.active_terrain(),
        }
    }

    #[test]
    fn runs_scenarios_in_order_and_swaps_terrain() {
        let dir = TempDir::new().unwrap();
        let sweep = fixture(&dir, "Existing:1,1\nRegraded:2,2\n");
        let mut eng = engine(&sweep, vec![2.0, 3.0], None);

        let set = sweep.run(&mut eng).unwrap();
        assert!(set.is_complete());
        assert_eq!(eng.seen_terrain, vec![b"terrain-2".to_vec(), b"terrain-3".to_vec()]);
        assert!(!sweep.layout.active_terrain().exists());
        assert!(dir.path().join("Model.g02.hdf").exists());
        assert!(dir.path().join("Model.g03.hdf").exists());

        let composed = fs::read_to_string(sweep.layout.geometry_input()).unwrap();
        assert_eq!(composed, "Geom Title=3\nCulvert=B\nRating Curve=\n");

        let depth = set.grid(MetricKind::Depth).unwrap();
        assert_eq!(depth.locations, vec!["L1", "L2"]);
        assert_eq!(depth.get("L1", "Regraded"), Some(3.0));

        let reports = report_all(&set).unwrap();
        let depth_report = reports.iter().find(|r| r.kind == MetricKind::Depth).unwrap();
        assert_relative_eq!(depth_report.percent_difference.values[0][0], 50.0);
        assert_eq!(depth_report.percent_difference.rows, vec!["Regraded"]);

        let sp = set.grid(MetricKind::StreamPower).unwrap();
        assert_eq!(sp.locations, vec!["L1"]);
        assert_eq!(sp.get("L1", "Existing"), Some(4.0));
    }

    #[test]
    fn engine_failure_releases_slot_and_aborts() {
        let dir = TempDir::new().unwrap();
        let sweep = fixture(&dir, "Existing:1,1\nRegraded:2,2\nThird:1,2\n");
        let mut eng = engine(&sweep, vec![2.0, 3.0, 4.0], Some(1));

        let err = sweep.run(&mut eng).unwrap_err();
        assert!(matches!(err, SweepError::Engine(_)), "got {err:?}");
        assert_eq!(eng.calls, 2, "batch must stop at the failed scenario");
        assert!(!sweep.layout.active_terrain().exists());
        assert!(dir.path().join("Model.g03.hdf").exists());
    }

    #[test]
    fn metric_failure_releases_slot() {
        let dir = TempDir::new().unwrap();
        let sweep = fixture(&dir, "Existing:1,1\n");
        // Face id beyond the scripted store's single face.
        fs::write(dir.path().join("faces.txt"), "L1:3\n").unwrap();
        let sweep = Sweep {
            locations: LocationRegistry::from_files(
                &dir.path().join("cells.txt"),
                &dir.path().join("faces.txt"),
                &dir.path().join("facepts.txt"),
            )
            .unwrap(),
            ..sweep
        };
        let mut eng = engine(&sweep, vec![2.0], None);

        let err = sweep.run(&mut eng).unwrap_err();
        assert!(matches!(err, SweepError::ElementOutOfRange { element: 3, .. }), "got {err:?}");
        assert!(!sweep.layout.active_terrain().exists());
        assert!(dir.path().join("Model.g02.hdf").exists());
    }

    #[test]
    fn bad_catalog_fails_before_any_run() {
        let dir = TempDir::new().unwrap();
        let _ = fixture(&dir, "Existing:1,1\n");
        fs::write(dir.path().join("Scenarios.txt"), "Existing:1,9\n").unwrap();
        let config = RunConfig {
            project_dir: dir.path().to_path_buf(),
            options_file: "Options.txt".into(),
            scenarios_file: "Scenarios.txt".into(),
            cells_file: "cells.txt".into(),
            faces_file: "faces.txt".into(),
            face_points_file: "facepts.txt".into(),
            geometry_stem: "Model".into(),
            project_file: "Model.prj".into(),
            results_file: "r.json".into(),
            min_depth: 0.5,
            active_slot_ext: ".g01".into(),
            engine: crate::config::EngineConfig { program: "unused".into(), args: vec![] },
        };
        assert!(matches!(Sweep::load(&config), Err(SweepError::Validation(_))));
    }
}
